//! Cross-venue correlation scan.
//!
//! Finds every stored offer from a different platform that plausibly quotes
//! the same real-world event as the incoming offer, in either side order.
//! Orientation is part of the scan result, never written back into the
//! stored record.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::matching::NameMatcher;
use crate::models::BetOffer;

/// Maximum allowed gap between two offers' event dates, in days.
const MAX_EVENT_DATE_GAP_DAYS: i64 = 1;

/// One correlated offer. `reversed` is true when the candidate matched only
/// with its sides swapped relative to the anchor.
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub offer: BetOffer,
    pub reversed: bool,
}

/// Scan `store` for offers correlated with `anchor`.
///
/// Skips the anchor itself and everything from the anchor's own platform.
/// When both offers carry an event date, dates more than one day apart rule
/// the pair out before any name comparison.
pub fn find_matches(
    store: &HashMap<String, BetOffer>,
    anchor: &BetOffer,
    matcher: &NameMatcher,
) -> Vec<MatchCandidate> {
    let mut matches = Vec::new();

    for other in store.values() {
        if other.id == anchor.id || other.platform == anchor.platform {
            continue;
        }

        if let (Some(ours), Some(theirs)) = (anchor.event_date, other.event_date) {
            let gap = (ours - theirs).num_days().abs();
            if gap > MAX_EVENT_DATE_GAP_DAYS {
                debug!(
                    anchor = %anchor.display_line(),
                    other = %other.display_line(),
                    gap_days = gap,
                    "event dates too far apart, skipping"
                );
                continue;
            }
        }

        let standard = matcher.are_similar(&anchor.option_a, &other.option_a)
            && matcher.are_similar(&anchor.option_b, &other.option_b);
        let reversed = matcher.are_similar(&anchor.option_a, &other.option_b)
            && matcher.are_similar(&anchor.option_b, &other.option_a);

        if standard || reversed {
            if reversed && !standard {
                info!(
                    anchor = %anchor.display_line(),
                    other = %other.display_line(),
                    "reversed match found"
                );
            } else {
                info!(
                    anchor = %anchor.display_line(),
                    other = %other.display_line(),
                    "match found"
                );
            }
            matches.push(MatchCandidate {
                offer: other.clone(),
                reversed: reversed && !standard,
            });
        }
    }

    matches
}
