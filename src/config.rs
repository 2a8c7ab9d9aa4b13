//! Application configuration, loaded from the environment with defaults.

use std::path::PathBuf;

use anyhow::Result;

/// Defaults mirror the long-running scraper deployment: bounded history,
/// strict fuzzy cutoffs, local dashboard port.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the team alias table JSON.
    pub alias_file: PathBuf,
    /// Dashboard API port.
    pub port: u16,
    /// FIFO bound on the opportunity history.
    pub max_history: usize,
    /// Threshold for the raw-string similarity fallback.
    pub similarity_threshold: f64,
    /// Directory for on-demand snapshots.
    pub snapshot_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alias_file: PathBuf::from("data/teams_aliases.json"),
            port: 8000,
            max_history: 1000,
            similarity_threshold: 0.9,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        let alias_file = std::env::var("ODDSBOT_ALIAS_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.alias_file);

        let port = std::env::var("ODDSBOT_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let max_history = std::env::var("ODDSBOT_MAX_HISTORY")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v: &usize| v > 0)
            .unwrap_or(defaults.max_history);

        let similarity_threshold = std::env::var("ODDSBOT_SIMILARITY_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&v: &f64| (0.0..=1.0).contains(&v))
            .unwrap_or(defaults.similarity_threshold);

        let snapshot_dir = std::env::var("ODDSBOT_SNAPSHOT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.snapshot_dir);

        Ok(Self {
            alias_file,
            port,
            max_history,
            similarity_threshold,
            snapshot_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.max_history, 1000);
        assert_eq!(config.port, 8000);
        assert!((config.similarity_threshold - 0.9).abs() < f64::EPSILON);
    }
}
