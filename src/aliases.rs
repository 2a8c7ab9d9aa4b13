//! Team alias table.
//!
//! Loaded once at startup from a JSON file mapping sport → canonical team
//! name → list of alias spellings. Everything is lowercased on load. A
//! missing or corrupt file degrades to an empty table (fuzzy-only matching),
//! never a startup failure.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::{error, warn};

/// Read-only after load. Shared via `Arc` with the name matcher.
#[derive(Debug, Default)]
pub struct AliasTable {
    /// sport → canonical name → aliases, all lowercase.
    sports: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Every known name string (canonical and alias), for global fuzzy search.
    all_names: HashSet<String>,
}

impl AliasTable {
    /// Load from `path`. Missing file or bad JSON logs and returns an empty
    /// table; the engine keeps running with fuzzy-only name matching.
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "alias table not found, using empty table");
                return Self::default();
            }
        };

        let parsed: BTreeMap<String, BTreeMap<String, Vec<String>>> =
            match serde_json::from_str(&raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to parse alias table, using empty table");
                    return Self::default();
                }
            };

        Self::from_entries(parsed)
    }

    /// Build from already-parsed entries, lowercasing every name.
    pub fn from_entries(entries: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Self {
        let mut sports: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        let mut all_names = HashSet::new();

        for (sport, teams) in entries {
            let mut lowered: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for (canonical, aliases) in teams {
                let canonical = canonical.to_lowercase();
                let aliases: Vec<String> = aliases.iter().map(|a| a.to_lowercase()).collect();
                all_names.insert(canonical.clone());
                all_names.extend(aliases.iter().cloned());
                lowered.insert(canonical, aliases);
            }
            sports.insert(sport.to_lowercase(), lowered);
        }

        Self { sports, all_names }
    }

    pub fn is_empty(&self) -> bool {
        self.sports.is_empty()
    }

    pub fn has_sport(&self, sport: &str) -> bool {
        self.sports.contains_key(sport)
    }

    /// Direct lookup: is `name` a canonical name or a known alias? Returns the
    /// canonical spelling on a hit. Scoped to one sport when given, otherwise
    /// searched across all sports.
    pub fn canonical_for(&self, name: &str, sport: Option<&str>) -> Option<&str> {
        fn scan<'a>(teams: &'a BTreeMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
            teams.iter().find_map(|(canonical, aliases)| {
                if canonical == name || aliases.iter().any(|a| a == name) {
                    Some(canonical.as_str())
                } else {
                    None
                }
            })
        }

        match sport.and_then(|s| self.sports.get(s)) {
            Some(teams) => scan(teams, name),
            None => self.sports.values().find_map(|teams| scan(teams, name)),
        }
    }

    /// All known names, optionally scoped to one sport's entries.
    pub fn names(&self, sport: Option<&str>) -> Vec<&str> {
        match sport.and_then(|s| self.sports.get(s)) {
            Some(teams) => teams
                .iter()
                .flat_map(|(canonical, aliases)| {
                    std::iter::once(canonical.as_str()).chain(aliases.iter().map(|a| a.as_str()))
                })
                .collect(),
            None => self.all_names.iter().map(|n| n.as_str()).collect(),
        }
    }
}
