//! Team name normalization and similarity.
//!
//! Two venues rarely spell a competitor the same way ("Man United" vs
//! "Manchester United", "Michigan St" vs "Michigan State"). Resolution order:
//! alias table direct hit, fuzzy nearest neighbor over the known names, then
//! a plain character-level ratio between the raw strings.
//!
//! Both entry points are pure given the immutable alias table, so results are
//! memoized without bound (the input domain is a few hundred team names).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use strsim::normalized_levenshtein;
use tracing::debug;

use crate::aliases::AliasTable;

/// Minimum fuzzy ratio for a nearest-neighbor hit against the alias table.
pub const NAME_MATCH_RATIO: f64 = 0.95;

/// Default threshold for the raw-string similarity fallback.
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

/// A misconfigured alias table could chain fuzzy hits into a cycle; cap the
/// re-normalization depth instead of trusting the table.
const MAX_NORMALIZE_DEPTH: u8 = 4;

/// Whole-word substitutions tried when a raw name misses the alias table.
const WORD_TRANSFORMS: [(&str, &str); 2] = [("st", "state"), ("st", "saint")];

type NormalizeKey = (String, Option<String>);

/// Alias-backed name matcher with unbounded memoization.
pub struct NameMatcher {
    aliases: Arc<AliasTable>,
    similarity_threshold: f64,
    normalize_cache: RwLock<HashMap<NormalizeKey, (String, bool)>>,
    similar_cache: RwLock<HashMap<(String, String), bool>>,
}

impl NameMatcher {
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self::with_threshold(aliases, SIMILARITY_THRESHOLD)
    }

    pub fn with_threshold(aliases: Arc<AliasTable>, similarity_threshold: f64) -> Self {
        Self {
            aliases,
            similarity_threshold,
            normalize_cache: RwLock::new(HashMap::new()),
            similar_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve `name` to its canonical spelling.
    ///
    /// Returns the canonical name and whether it was confirmed by the alias
    /// table (directly or via a fuzzy hit). On a total miss the lowercased
    /// input comes back with `false`.
    pub fn normalize(&self, name: &str, sport: Option<&str>) -> (String, bool) {
        let name = name.trim().to_lowercase();
        let key = (name.clone(), sport.map(|s| s.to_lowercase()));

        if let Some(hit) = self.normalize_cache.read().get(&key) {
            return hit.clone();
        }

        let sport_scope = key.1.as_deref().filter(|s| self.aliases.has_sport(s));
        let result = self.normalize_uncached(&name, sport_scope, 0);

        self.normalize_cache.write().insert(key, result.clone());
        result
    }

    fn normalize_uncached(&self, name: &str, sport: Option<&str>, depth: u8) -> (String, bool) {
        if let Some(canonical) = self.aliases.canonical_for(name, sport) {
            return (canonical.to_string(), true);
        }

        if depth < MAX_NORMALIZE_DEPTH {
            if let Some(best) = self.nearest_known_name(name, sport) {
                debug!(from = name, to = %best, "fuzzy matched team name");
                // The fuzzy hit is a known name, so the recursion resolves it
                // through the table; the depth cap guards a malformed table.
                return self.normalize_uncached(&best, sport, depth + 1);
            }
        }

        (name.to_string(), false)
    }

    /// Nearest neighbor among the known names, sport-scoped when possible.
    fn nearest_known_name(&self, name: &str, sport: Option<&str>) -> Option<String> {
        let folded = fold(name);
        let mut best: Option<(f64, &str)> = None;
        for candidate in self.aliases.names(sport) {
            let score = normalized_levenshtein(&folded, &fold(candidate));
            if score >= NAME_MATCH_RATIO && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, candidate));
            }
        }
        best.map(|(_, candidate)| candidate.to_string())
    }

    /// Decide whether two raw side names denote the same competitor.
    pub fn are_similar(&self, a: &str, b: &str) -> bool {
        let a = a.trim().to_lowercase();
        let b = b.trim().to_lowercase();
        let key = (a.clone(), b.clone());

        if let Some(&hit) = self.similar_cache.read().get(&key) {
            return hit;
        }

        let result = self.are_similar_uncached(&a, &b, self.similarity_threshold);
        self.similar_cache.write().insert(key, result);
        result
    }

    fn are_similar_uncached(&self, a: &str, b: &str, threshold: f64) -> bool {
        let (mut norm_a, mut fixed_a) = self.normalize(a, None);
        let (mut norm_b, mut fixed_b) = self.normalize(b, None);

        // Abbreviated names like "Michigan St" miss the table as-is; retry
        // each unresolved side with whole-word expansions.
        for (old, new) in WORD_TRANSFORMS {
            if !fixed_a {
                if let Some(transformed) = replace_word(a, old, new) {
                    (norm_a, fixed_a) = self.normalize(&transformed, None);
                }
            }
            if !fixed_b {
                if let Some(transformed) = replace_word(b, old, new) {
                    (norm_b, fixed_b) = self.normalize(&transformed, None);
                }
            }
        }

        if norm_a == norm_b {
            return true;
        }

        normalized_levenshtein(a, b) >= threshold
    }
}

/// Lowercase and strip everything but alphanumerics and single spaces, the
/// way fuzzy scorers preprocess before comparing.
fn fold(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_space = true;
    for c in name.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Replace whole-word occurrences of `old` with `new`. Returns `None` when
/// the word does not appear.
fn replace_word(text: &str, old: &str, new: &str) -> Option<String> {
    if !text.split_whitespace().any(|w| w == old) {
        return None;
    }
    Some(
        text.split_whitespace()
            .map(|w| if w == old { new } else { w })
            .collect::<Vec<_>>()
            .join(" "),
    )
}
