//! Runtime statistics, hourly buckets, and the bounded opportunity history.
//!
//! All state here lives behind the engine's stats mutex, independent of the
//! record-store and group-store locks.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// One registered opportunity, kept FIFO-bounded by `max_history`.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub match_label: String,
    pub profit_pct: f64,
    pub platforms: Vec<String>,
}

/// Per-hour activity, keyed by "YYYY-MM-DD HH:00".
#[derive(Debug, Clone, Default, Serialize)]
pub struct HourlyBucket {
    pub records: u64,
    pub matches: u64,
}

/// Summary of the trailing N hours.
#[derive(Debug, Clone, Serialize)]
pub struct HourlySummary {
    pub hours_analyzed: usize,
    pub total_records: u64,
    pub total_matches: u64,
    pub hourly_breakdown: BTreeMap<String, HourlyBucket>,
}

/// Full stats payload for the read-side.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedStats {
    pub runtime: String,
    pub total_records: usize,
    pub matches_found: u64,
    pub current_rate: f64,
    pub max_rate: f64,
    pub min_rate: f64,
    pub platform_counts: Vec<(String, u64)>,
    pub hourly_buckets: BTreeMap<String, HourlyBucket>,
    pub error_counts: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct StatsTracker {
    matches_found: u64,
    platform_counts: HashMap<String, u64>,
    hourly: BTreeMap<String, HourlyBucket>,
    error_counts: HashMap<String, u64>,
    history: VecDeque<HistoryEntry>,
    max_history: usize,
    max_rate: f64,
    min_rate: Option<f64>,
}

impl StatsTracker {
    pub fn new(max_history: usize) -> Self {
        Self {
            matches_found: 0,
            platform_counts: HashMap::new(),
            hourly: BTreeMap::new(),
            error_counts: HashMap::new(),
            history: VecDeque::new(),
            max_history,
            max_rate: 0.0,
            min_rate: None,
        }
    }

    fn hour_key(now: DateTime<Utc>) -> String {
        now.format("%Y-%m-%d %H:00").to_string()
    }

    /// A new record id was stored for `platform`.
    pub fn record_stored(&mut self, platform: &str) {
        *self.platform_counts.entry(platform.to_string()).or_default() += 1;
        self.hourly.entry(Self::hour_key(Utc::now())).or_default().records += 1;
    }

    /// The scan found at least one cross-platform match.
    pub fn record_match(&mut self) {
        self.matches_found += 1;
        self.hourly.entry(Self::hour_key(Utc::now())).or_default().matches += 1;
    }

    pub fn record_error(&mut self, error_type: &str) {
        *self.error_counts.entry(error_type.to_string()).or_default() += 1;
    }

    pub fn matches_found(&self) -> u64 {
        self.matches_found
    }

    /// Platform counts, most common first.
    pub fn platform_breakdown(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<_> = self
            .platform_counts
            .iter()
            .map(|(p, &c)| (p.clone(), c))
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts
    }

    /// Fold a freshly computed collection rate into the watermarks.
    /// Zero-rate samples do not move the minimum.
    pub fn observe_rate(&mut self, rate: f64) {
        if rate > self.max_rate {
            self.max_rate = rate;
        }
        if rate > 0.0 && self.min_rate.map_or(true, |m| rate < m) {
            self.min_rate = Some(rate);
        }
    }

    pub fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push_back(entry);
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Summary over the trailing `hours` hours of buckets.
    pub fn hourly_summary(&self, hours: i64) -> HourlySummary {
        let cutoff = Utc::now() - Duration::hours(hours);
        let relevant: BTreeMap<String, HourlyBucket> = self
            .hourly
            .iter()
            .filter(|(key, _)| {
                chrono::NaiveDateTime::parse_from_str(key, "%Y-%m-%d %H:%M")
                    .map(|t| t.and_utc() >= cutoff)
                    .unwrap_or(false)
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        HourlySummary {
            hours_analyzed: relevant.len(),
            total_records: relevant.values().map(|b| b.records).sum(),
            total_matches: relevant.values().map(|b| b.matches).sum(),
            hourly_breakdown: relevant,
        }
    }

    pub fn detailed(
        &self,
        runtime: String,
        total_records: usize,
        current_rate: f64,
    ) -> DetailedStats {
        DetailedStats {
            runtime,
            total_records,
            matches_found: self.matches_found,
            current_rate,
            max_rate: self.max_rate,
            min_rate: self.min_rate.unwrap_or(0.0),
            platform_counts: self.platform_breakdown(),
            hourly_buckets: self.hourly.clone(),
            error_counts: self.error_counts.clone(),
        }
    }
}

/// Trailing-window ingestion rate, scaled to records per minute.
pub fn collection_rate(timestamps: impl Iterator<Item = DateTime<Utc>>, window_secs: i64) -> f64 {
    let now = Utc::now();
    let window_start = now - Duration::seconds(window_secs);
    let recent = timestamps.filter(|&t| t > window_start).count();
    recent as f64 * (60.0 / window_secs.max(1) as f64)
}

/// Runtime formatted `HH:MM:SS`.
pub fn format_runtime(start: DateTime<Utc>) -> String {
    let elapsed = (Utc::now() - start).num_seconds().max(0);
    let hours = elapsed / 3600;
    let minutes = (elapsed % 3600) / 60;
    let seconds = elapsed % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Earliest known event date among a group's members.
pub fn earliest_event_date(dates: impl Iterator<Item = Option<NaiveDate>>) -> Option<NaiveDate> {
    dates.flatten().min()
}
