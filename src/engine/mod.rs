//! Engine orchestrator.
//!
//! Owns the record store, the co-reference groups, the stats, and the
//! opportunity history. Feed adapters call [`Engine::add_offer`]; the
//! read-side (dashboard API, shutdown summary) only ever calls the query
//! surface.
//!
//! Lock discipline: three independent mutexes (record store, group store,
//! stats). No code path holds more than one at a time; each pipeline step
//! commits its own partial result before the next lock is taken.

pub mod arbitrage;
pub mod correlation;
pub mod stats;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info};

use crate::alerts::{AlertLeg, AlertSink, ArbitrageAlert, LogAlerts, StakeLine};
use crate::config::Config;
use crate::engine::correlation::MatchCandidate;
use crate::engine::stats::{DetailedStats, HistoryEntry, HourlySummary, StatsTracker};
use crate::groups::GroupStore;
use crate::matching::NameMatcher;
use crate::models::BetOffer;

/// Trailing window for the ingestion-rate figure, in seconds.
const RATE_WINDOW_SECS: i64 = 60;

/// Record store plus date patches that arrived before their record did.
#[derive(Debug, Default)]
struct RecordStore {
    records: HashMap<String, BetOffer>,
    /// Event dates delivered out of band, keyed by record id. Applied when
    /// the record shows up (or immediately if it is already stored).
    date_patches: HashMap<String, NaiveDate>,
}

/// An active opportunity as shown on the read-side, profit-descending.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveOpportunity {
    pub match_label: String,
    pub profit_pct: f64,
    pub event_date: Option<NaiveDate>,
    /// One `platform: A vs B` line per participating offer.
    pub offers: Vec<String>,
    pub platforms: Vec<String>,
}

pub struct Engine {
    store: Mutex<RecordStore>,
    groups: Mutex<GroupStore>,
    stats: Mutex<StatsTracker>,
    matcher: NameMatcher,
    alerts: Box<dyn AlertSink>,
    start_time: DateTime<Utc>,
    snapshot_dir: PathBuf,
}

impl Engine {
    pub fn new(config: &Config, matcher: NameMatcher) -> Self {
        Self::with_alerts(config, matcher, Box::new(LogAlerts))
    }

    pub fn with_alerts(config: &Config, matcher: NameMatcher, alerts: Box<dyn AlertSink>) -> Self {
        Self {
            store: Mutex::new(RecordStore::default()),
            groups: Mutex::new(GroupStore::new()),
            stats: Mutex::new(StatsTracker::new(config.max_history)),
            matcher,
            alerts,
            start_time: Utc::now(),
            snapshot_dir: config.snapshot_dir.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Ingestion surface
    // ------------------------------------------------------------------

    /// Primary entry point: run the whole pipeline for one offer.
    ///
    /// Garbage filter → upsert → correlation scan → group merge → arbitrage
    /// test → registration + alert. Runs synchronously on the caller's task.
    pub fn add_offer(&self, mut offer: BetOffer) {
        if offer.is_garbage() {
            debug!(offer = %offer.display_line(), "rejected garbage offer");
            self.stats.lock().record_error("garbage_offer");
            return;
        }

        // Upsert + scan under the store lock, released before grouping.
        let matches: Vec<MatchCandidate>;
        {
            let mut store = self.store.lock();
            if offer.event_date.is_none() {
                offer.event_date = store.date_patches.get(&offer.id).copied();
            }
            let is_new = !store.records.contains_key(&offer.id);
            matches = correlation::find_matches(&store.records, &offer, &self.matcher);
            store.records.insert(offer.id.clone(), offer.clone());
            drop(store);

            if is_new {
                self.stats.lock().record_stored(&offer.platform);
            }
        }

        self.groups.lock().add_singleton(&offer.id);

        if matches.is_empty() {
            return;
        }

        // Matches-found counters tick whether or not an arbitrage falls out.
        self.stats.lock().record_match();
        debug!(
            count = matches.len(),
            offer = %offer.display_line(),
            "found matching offers across platforms"
        );

        let mut ids: Vec<String> = Vec::with_capacity(matches.len() + 1);
        ids.push(offer.id.clone());
        ids.extend(matches.iter().map(|m| m.offer.id.clone()));

        // Provisional merge so the group exists even when no profit follows.
        self.groups.lock().merge_and_set_value(&ids, 0.0);

        let best = arbitrage::best_prices(&offer, &matches);
        info!(
            best_a = best.best_a,
            best_b = best.best_b,
            best_draw = ?best.best_draw,
            "best odds across {} platforms",
            matches.len() + 1
        );

        let Some(opportunity) = arbitrage::evaluate(&best) else {
            return;
        };

        self.register_opportunity(&offer, &matches, &ids, &opportunity, &best);
    }

    /// Patch an event date delivered on a separate channel. Applies to the
    /// stored record immediately when present; otherwise remembered for the
    /// record's eventual arrival.
    pub fn update_event_date(&self, record_id: &str, date: NaiveDate) {
        let mut store = self.store.lock();
        store.date_patches.insert(record_id.to_string(), date);
        if let Some(record) = store.records.get_mut(record_id) {
            record.event_date = Some(date);
            debug!(record_id, %date, "updated event date");
        }
    }

    /// Adapter-reported error categories, surfaced in detailed stats.
    pub fn record_error(&self, error_type: &str) {
        self.stats.lock().record_error(error_type);
    }

    fn register_opportunity(
        &self,
        anchor: &BetOffer,
        matches: &[MatchCandidate],
        ids: &[String],
        opportunity: &arbitrage::Opportunity,
        best: &arbitrage::BestPrices,
    ) {
        let match_label = format!("{} vs {}", anchor.option_a, anchor.option_b);
        let match_hash = match_key_hash(
            std::iter::once(anchor)
                .chain(matches.iter().map(|m| &m.offer))
                .map(|o| (o.platform.as_str(), o.id.as_str())),
        );

        // Last write wins, including downward revisions of this group's
        // previously registered profit.
        self.groups
            .lock()
            .merge_and_set_value(ids, opportunity.profit_pct);

        let mut platforms: Vec<String> = std::iter::once(anchor.platform.clone())
            .chain(matches.iter().map(|m| m.offer.platform.clone()))
            .collect();
        platforms.dedup();

        self.stats.lock().push_history(HistoryEntry {
            timestamp: Utc::now(),
            match_label: match_label.clone(),
            profit_pct: opportunity.profit_pct,
            platforms,
        });

        let mut legs = vec![AlertLeg {
            platform: anchor.platform.clone(),
            option_a: anchor.option_a.clone(),
            option_b: anchor.option_b.clone(),
            reversed: false,
        }];
        legs.extend(matches.iter().map(|m| AlertLeg {
            platform: m.offer.platform.clone(),
            option_a: m.offer.option_a.clone(),
            option_b: m.offer.option_b.clone(),
            reversed: m.reversed,
        }));

        let mut stakes = vec![
            StakeLine {
                outcome: anchor.option_a.clone(),
                odds: best.best_a,
                stake: opportunity.stake_a,
            },
            StakeLine {
                outcome: anchor.option_b.clone(),
                odds: best.best_b,
                stake: opportunity.stake_b,
            },
        ];
        if let (Some(draw_odds), Some(draw_stake)) = (best.best_draw, opportunity.stake_draw) {
            stakes.push(StakeLine {
                outcome: "Draw".to_string(),
                odds: draw_odds,
                stake: draw_stake,
            });
        }

        self.alerts.arbitrage(&ArbitrageAlert {
            match_label,
            profit_pct: opportunity.profit_pct,
            match_hash,
            legs,
            stakes,
            expected_return: opportunity.expected_return,
        });
    }

    // ------------------------------------------------------------------
    // Read-side surface
    // ------------------------------------------------------------------

    /// Total stored records.
    pub fn size(&self) -> usize {
        self.store.lock().records.len()
    }

    pub fn matches_found(&self) -> u64 {
        self.stats.lock().matches_found()
    }

    /// Number of currently active profitable groups.
    pub fn arbitrage_count(&self) -> usize {
        self.groups.lock().profitable_count()
    }

    pub fn runtime(&self) -> String {
        stats::format_runtime(self.start_time)
    }

    /// Active opportunities, sorted by profit % descending.
    pub fn active_opportunities(&self) -> Vec<ActiveOpportunity> {
        let groups: Vec<(Vec<String>, f64)> = self
            .groups
            .lock()
            .profitable_groups()
            .map(|(members, value)| (members.to_vec(), value))
            .collect();

        let store = self.store.lock();
        let mut opportunities: Vec<ActiveOpportunity> = groups
            .into_iter()
            .map(|(members, profit_pct)| {
                let offers: Vec<&BetOffer> = members
                    .iter()
                    .filter_map(|id| store.records.get(id))
                    .collect();
                let match_label = offers
                    .first()
                    .map(|o| format!("{} vs {}", o.option_a, o.option_b))
                    .unwrap_or_else(|| "Unknown Match".to_string());
                ActiveOpportunity {
                    match_label,
                    profit_pct,
                    event_date: stats::earliest_event_date(
                        offers.iter().map(|o| o.event_date),
                    ),
                    offers: offers.iter().map(|o| o.display_line()).collect(),
                    platforms: offers.iter().map(|o| o.platform.clone()).collect(),
                }
            })
            .collect();
        drop(store);

        opportunities.sort_by(|a, b| {
            b.profit_pct
                .partial_cmp(&a.profit_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        opportunities
    }

    /// Most recent offers, newest first.
    pub fn recent_offers(&self, limit: usize) -> Vec<BetOffer> {
        let store = self.store.lock();
        let mut offers: Vec<BetOffer> = store.records.values().cloned().collect();
        drop(store);
        offers.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        offers.truncate(limit);
        offers
    }

    /// Trailing 1-minute ingestion rate, records per minute. Updates the
    /// max/min watermarks as a side effect.
    pub fn collection_rate(&self) -> f64 {
        let rate = {
            let store = self.store.lock();
            stats::collection_rate(
                store.records.values().map(|o| o.ingested_at),
                RATE_WINDOW_SECS,
            )
        };
        self.stats.lock().observe_rate(rate);
        rate
    }

    pub fn detailed_stats(&self) -> DetailedStats {
        let rate = self.collection_rate();
        let total = self.size();
        self.stats.lock().detailed(self.runtime(), total, rate)
    }

    pub fn hourly_summary(&self, hours: i64) -> HourlySummary {
        self.stats.lock().hourly_summary(hours)
    }

    /// Platform counts, most common first.
    pub fn platform_breakdown(&self) -> Vec<(String, u64)> {
        self.stats.lock().platform_breakdown()
    }

    pub fn history_len(&self) -> usize {
        self.stats.lock().history_len()
    }

    /// Group membership for a record id, for diagnostics and tests.
    pub fn group_of(&self, id: &str) -> Option<Vec<String>> {
        self.groups.lock().group_of(id)
    }

    /// Group value by member id.
    pub fn group_value(&self, id: &str) -> Option<f64> {
        self.groups.lock().value_of(id)
    }

    /// Group value by full member set, order independent.
    pub fn group_value_of_set<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<f64> {
        self.groups.lock().value_of_set(ids)
    }

    // ------------------------------------------------------------------
    // Snapshot
    // ------------------------------------------------------------------

    /// Serialize the full record store as JSON keyed by record id.
    ///
    /// `path` defaults to `odds_data_{timestamp}.json` under the configured
    /// snapshot directory. Failures are logged and returned; in-memory state
    /// is never affected.
    pub fn save_snapshot(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let stamp = Utc::now().format("%Y%m%d_%H%M%S");
                self.snapshot_dir.join(format!("odds_data_{stamp}.json"))
            }
        };

        let result = (|| -> Result<()> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating snapshot dir {}", parent.display()))?;
            }
            let json = {
                let store = self.store.lock();
                serde_json::to_string_pretty(&store.records).context("serializing record store")?
            };
            std::fs::write(&path, json)
                .with_context(|| format!("writing snapshot {}", path.display()))?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                info!(path = %path.display(), "saved snapshot");
                Ok(path)
            }
            Err(e) => {
                error!(error = %e, "failed to save snapshot");
                Err(e)
            }
        }
    }

    /// Log the end-of-session summary (shutdown path).
    pub fn log_session_summary(&self) {
        info!("session summary:");
        info!("  total runtime: {}", self.runtime());
        info!("  total offers collected: {}", self.size());
        info!("  matches found: {}", self.matches_found());
        info!("  active arbitrage opportunities: {}", self.arbitrage_count());
        for (platform, count) in self.platform_breakdown() {
            info!("  {platform}: {count} offers");
        }
    }
}

/// Stable identifier for the exact set of records behind one registration:
/// sorted `platform:id` pairs, digested. Independent of enumeration order.
fn match_key_hash<'a>(records: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let mut keys: Vec<String> = records.map(|(p, id)| format!("{p}:{id}")).collect();
    keys.sort();
    keys.dedup();
    let mut hasher = Sha256::new();
    for key in &keys {
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}
