//! Arbitrage alert sink.
//!
//! Every registration emits a human-readable alert. The default sink writes
//! to the tracing log; a dashboard or notifier can plug in its own.

use serde::Serialize;
use tracing::info;

/// One leg of an alert: a venue quote participating in the opportunity.
#[derive(Debug, Clone, Serialize)]
pub struct AlertLeg {
    pub platform: String,
    pub option_a: String,
    pub option_b: String,
    /// Sides are swapped relative to the record that triggered the scan.
    pub reversed: bool,
}

/// Recommended stake for one outcome of a normalized 100-unit bankroll.
#[derive(Debug, Clone, Serialize)]
pub struct StakeLine {
    pub outcome: String,
    pub odds: f64,
    pub stake: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArbitrageAlert {
    pub match_label: String,
    pub profit_pct: f64,
    /// Stable identifier derived from the set of platform:id pairs.
    pub match_hash: String,
    pub legs: Vec<AlertLeg>,
    pub stakes: Vec<StakeLine>,
    /// Guaranteed payout for a 100-unit total stake.
    pub expected_return: f64,
}

pub trait AlertSink: Send + Sync {
    fn arbitrage(&self, alert: &ArbitrageAlert);
}

/// Default sink: structured log lines, one per leg plus the summary.
#[derive(Debug, Default)]
pub struct LogAlerts;

impl AlertSink for LogAlerts {
    fn arbitrage(&self, alert: &ArbitrageAlert) {
        info!(
            profit_pct = alert.profit_pct,
            hash = %alert.match_hash,
            "ARBITRAGE OPPORTUNITY FOUND: {}",
            alert.match_label
        );
        for leg in &alert.legs {
            if leg.reversed {
                info!(
                    platform = %leg.platform,
                    "  {} vs {} (reversed)",
                    leg.option_b,
                    leg.option_a
                );
            } else {
                info!(platform = %leg.platform, "  {} vs {}", leg.option_a, leg.option_b);
            }
        }
        for stake in &alert.stakes {
            info!(
                "  bet {:.2} units on '{}' at odds {:.2}",
                stake.stake, stake.outcome, stake.odds
            );
        }
        info!(
            "  expected return {:.2} units (profit {:.2}%)",
            alert.expected_return, alert.profit_pct
        );
    }
}
