//! Configuration for the Keepsake daemon and wake pipeline.
//!
//! Every retrieval limit and decay constant lives here as an immutable
//! value built once at process start and passed explicitly into the
//! pipeline. Nothing in the engine reads ambient global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Weekday names used by the digest presentation, Monday first.
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Month names used by the digest presentation.
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Top-level configuration, loaded from `~/.keepsake/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepsakeConfig {
    /// Directory holding the database and any scratch state.
    pub data_dir: PathBuf,
    /// Address the HTTP API binds to.
    pub listen_addr: String,
    /// Log level filter applied when RUST_LOG is unset.
    pub log_level: String,
    /// Retrieval and decay tuning.
    pub wake: WakeTuning,
}

impl Default for KeepsakeConfig {
    fn default() -> Self {
        Self {
            data_dir: keepsake_home(),
            listen_addr: "127.0.0.1:4203".to_string(),
            log_level: "info".to_string(),
            wake: WakeTuning::default(),
        }
    }
}

impl KeepsakeConfig {
    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("keepsake.db")
    }
}

/// Get the default Keepsake home directory.
pub fn keepsake_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".keepsake")
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    keepsake_home().join("config.toml")
}

/// Load configuration from a TOML file, with defaults.
///
/// A missing, unreadable, or malformed file falls back to defaults with a
/// warning; configuration problems never stop the process from booting.
pub fn load_config(path: Option<&Path>) -> KeepsakeConfig {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if path.exists() {
        match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<KeepsakeConfig>(&raw) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse config, using defaults"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read config file, using defaults"
                );
            }
        }
    } else {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
    }
    KeepsakeConfig::default()
}

/// Tuning constants for retrieval, decay, and reinforcement.
///
/// The defaults are the contract: tests and clients may rely on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeTuning {
    /// Hard cap on the per-tier result limit; also the default limit.
    pub max_tier_limit: usize,
    /// Each tier query over-fetches by this factor to survive dedup losses.
    pub buffer_factor: usize,
    /// Loading more than this many distinct records flags a diagnostic.
    pub loaded_ceiling: usize,
    /// Salience at or above this always surfaces regardless of recency.
    pub critical_salience: i64,
    /// Decayed-salience gap strictly below this counts as a near tie.
    pub near_tie_window: i64,
    /// Days per decay period.
    pub decay_period_days: i64,
    /// Salience lost per full decay period.
    pub decay_step: i64,
    /// Days over which the hot-score freshness term fades to zero.
    pub hot_decay_window_days: f64,
    /// Salience added when retrieval surfaces a record, and on edits.
    pub reinforce_bonus: i64,
    /// Maximum number of lenses honored in one request.
    pub max_lenses: usize,
    /// Emotion-channel sum at or above this satisfies the emotional lens.
    pub emotional_sum_threshold: i64,
}

impl Default for WakeTuning {
    fn default() -> Self {
        Self {
            max_tier_limit: 10,
            buffer_factor: 2,
            loaded_ceiling: 25,
            critical_salience: 80,
            near_tie_window: 10,
            decay_period_days: 30,
            decay_step: 10,
            hot_decay_window_days: 14.0,
            reinforce_bonus: 2,
            max_lenses: 5,
            emotional_sum_threshold: 30,
        }
    }
}

impl WakeTuning {
    /// Clamp a requested tier limit into `1..=max_tier_limit`.
    /// Absent or zero limits fall back to the maximum.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.max_tier_limit,
            Some(n) => n.min(self.max_tier_limit),
        }
    }

    /// How many rows each tier query fetches before dedup and ranking.
    pub fn fetch_size(&self, limit: usize) -> usize {
        limit.saturating_mul(self.buffer_factor)
    }
}
