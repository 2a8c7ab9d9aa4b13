//! Cross-venue odds correlation and arbitrage detection.
//!
//! Ingests price quotes for the same real-world events from independent
//! betting venues, correlates records that reference the same event despite
//! inconsistent naming and side ordering, and flags risk-free profit whenever
//! the combined best prices imply a total probability below 100%.

pub mod alerts;
pub mod aliases;
pub mod api;
pub mod config;
pub mod engine;
pub mod groups;
pub mod matching;
pub mod models;

pub use aliases::AliasTable;
pub use config::Config;
pub use engine::Engine;
pub use matching::NameMatcher;
pub use models::BetOffer;
