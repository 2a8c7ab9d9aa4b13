//! Core data model: a single venue price quote ("bet offer").

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Odds outside this range are treated as feed garbage.
pub const MIN_VALID_ODDS: f64 = 0.01;
pub const MAX_VALID_ODDS: f64 = 100.0;

/// A two-way (optionally three-way with draw) price quote from one venue.
///
/// `id` is unique per venue+market and is the key into the engine's store.
/// Odds are decimal (payout multiplier), never probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetOffer {
    pub id: String,
    pub platform: String,
    pub title: Option<String>,
    pub sport: Option<String>,
    pub league: Option<String>,
    pub event_date: Option<NaiveDate>,

    pub option_a: String,
    pub odds_a: f64,

    pub option_b: String,
    pub odds_b: f64,

    pub odds_draw: Option<f64>,

    /// Wall-clock time this offer was ingested; drives the collection-rate window.
    pub ingested_at: DateTime<Utc>,
}

impl BetOffer {
    pub fn new(
        platform: impl Into<String>,
        id: impl Into<String>,
        option_a: impl Into<String>,
        odds_a: f64,
        option_b: impl Into<String>,
        odds_b: f64,
        odds_draw: Option<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            platform: platform.into(),
            title: None,
            sport: None,
            league: None,
            event_date: None,
            option_a: option_a.into(),
            odds_a,
            option_b: option_b.into(),
            odds_b,
            odds_draw,
            ingested_at: Utc::now(),
        }
    }

    pub fn with_event_date(mut self, date: NaiveDate) -> Self {
        self.event_date = Some(date);
        self
    }

    pub fn with_sport(mut self, sport: impl Into<String>) -> Self {
        self.sport = Some(sport.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Garbage filter applied before anything else in the ingestion pipeline.
    ///
    /// Rejects implausible odds, bare yes/no outcome markets, degenerate
    /// quotes where both sides name the same competitor, and events already
    /// in the past.
    pub fn is_garbage(&self) -> bool {
        if self.odds_a < MIN_VALID_ODDS || self.odds_b < MIN_VALID_ODDS {
            return true;
        }
        if self.odds_a > MAX_VALID_ODDS || self.odds_b > MAX_VALID_ODDS {
            return true;
        }

        let a = self.option_a.to_lowercase();
        let b = self.option_b.to_lowercase();
        if a == "yes" || a == "no" || b == "yes" || b == "no" {
            return true;
        }
        if a == b {
            return true;
        }

        if let Some(date) = self.event_date {
            if date < Utc::now().date_naive() {
                return true;
            }
        }

        false
    }

    /// Display line used by the read-side: `platform: A vs B`.
    pub fn display_line(&self) -> String {
        format!("{}: {} vs {}", self.platform, self.option_a, self.option_b)
    }
}
