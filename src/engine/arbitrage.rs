//! Arbitrage math over a matched set of offers.
//!
//! Given the anchor offer and its cross-venue matches, take the best decimal
//! odds per side (swapping a leg's sides when it matched in reversed order),
//! sum the implied probabilities, and split a normalized 100-unit stake so
//! the payout is equal on every outcome.

use serde::Serialize;

use crate::engine::correlation::MatchCandidate;
use crate::models::BetOffer;

/// Normalized bankroll used for the stake split.
pub const STAKE_UNITS: f64 = 100.0;

/// Best available decimal odds per side across the matched set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestPrices {
    pub best_a: f64,
    pub best_b: f64,
    pub best_draw: Option<f64>,
}

/// A detected opportunity: implied-probability sum below 1.
#[derive(Debug, Clone, Serialize)]
pub struct Opportunity {
    /// `1/bestA + 1/bestB (+ 1/bestDraw)`.
    pub inverse_sum: f64,
    pub profit_pct: f64,
    pub stake_a: f64,
    pub stake_b: f64,
    pub stake_draw: Option<f64>,
    /// Payout on any outcome for a `STAKE_UNITS` total stake.
    pub expected_return: f64,
}

/// Per-side maxima over the anchor and every matched leg. Reversed legs
/// contribute their A odds to side B and vice versa; draw is orientation
/// independent.
pub fn best_prices(anchor: &BetOffer, matches: &[MatchCandidate]) -> BestPrices {
    let mut best_a = anchor.odds_a;
    let mut best_b = anchor.odds_b;
    let mut best_draw = anchor.odds_draw;

    for candidate in matches {
        let offer = &candidate.offer;
        let (a, b) = if candidate.reversed {
            (offer.odds_b, offer.odds_a)
        } else {
            (offer.odds_a, offer.odds_b)
        };
        best_a = best_a.max(a);
        best_b = best_b.max(b);
        best_draw = match (best_draw, offer.odds_draw) {
            (Some(current), Some(other)) => Some(current.max(other)),
            (current, other) => current.or(other),
        };
    }

    BestPrices {
        best_a,
        best_b,
        best_draw,
    }
}

/// Test for an arbitrage and compute the optimal stake split.
///
/// Returns `None` when the combined best prices do not admit a risk-free
/// profit (`inverse_sum >= 1`).
pub fn evaluate(best: &BestPrices) -> Option<Opportunity> {
    let inverse_sum =
        1.0 / best.best_a + 1.0 / best.best_b + best.best_draw.map_or(0.0, |d| 1.0 / d);

    if inverse_sum >= 1.0 {
        return None;
    }

    // stake_i = (units / odds_i) / sum gives the same payout units/sum on
    // every outcome.
    let profit_pct = (1.0 - inverse_sum) * 100.0;
    Some(Opportunity {
        inverse_sum,
        profit_pct,
        stake_a: (STAKE_UNITS / best.best_a) / inverse_sum,
        stake_b: (STAKE_UNITS / best.best_b) / inverse_sum,
        stake_draw: best.best_draw.map(|d| (STAKE_UNITS / d) / inverse_sum),
        expected_return: STAKE_UNITS / inverse_sum,
    })
}
