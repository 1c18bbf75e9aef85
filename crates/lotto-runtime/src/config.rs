//! # Runtime Configuration
//!
//! Process configuration loaded from `LOTTO_*` environment variables on top
//! of the sync defaults.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `LOTTO_WALLET` | Game wallet address | (required) |
//! | `LOTTO_HARD_CHECKPOINT` | Lowest block ever scanned | 4934993 |
//! | `LOTTO_POLL_INTERVAL_SECS` | Delay between passes | 10 |
//! | `LOTTO_QUERY_TIMEOUT_SECS` | Per-query timeout | none |
//! | `LOTTO_RETRY_MAX_DELAY_SECS` | Enables exponential backoff up to this delay | fixed delay |
//! | `LOTTO_LEDGER_SNAPSHOT` | Ledger snapshot replayed through the in-memory adapter | (required) |
//! | `LOTTO_STATE_FILE` | Game state snapshot | `lotto-state.json` |
//! | `LOTTO_LOG_LEVEL` or `RUST_LOG` | Log filter | `info` |
//! | `LOTTO_JSON_LOGS` | JSON log lines | false |

use std::path::PathBuf;
use std::str::FromStr;

use lotto_sync::{RetryPolicy, SyncConfig};
use tracing::warn;

/// Default location of the game state snapshot.
pub const DEFAULT_STATE_FILE: &str = "lotto-state.json";

/// Runtime configuration.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Sync engine configuration.
    pub sync: SyncConfig,
    /// Ledger snapshot to serve queries from.
    pub ledger_snapshot: Option<PathBuf>,
    /// Where the game state is loaded from and saved to.
    pub state_file: PathBuf,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines.
    pub json_logs: bool,
    /// Problems found while loading, reported by [`log_warnings`](Self::log_warnings).
    pub warnings: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            ledger_snapshot: None,
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            log_level: "info".to_string(),
            json_logs: false,
            warnings: Vec::new(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults.
    ///
    /// Unparseable numbers are ignored and recorded in `warnings`; nothing
    /// is logged here because the subscriber is not installed yet.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Some(wallet) = lookup("LOTTO_WALLET") {
            config.sync.game_wallet = wallet;
        }
        if let Some(checkpoint) = parse(&lookup, "LOTTO_HARD_CHECKPOINT", &mut warnings) {
            config.sync.hard_checkpoint = checkpoint;
        }
        if let Some(secs) = parse(&lookup, "LOTTO_POLL_INTERVAL_SECS", &mut warnings) {
            config.sync.poll_interval_secs = secs;
        }
        if let Some(secs) = parse(&lookup, "LOTTO_QUERY_TIMEOUT_SECS", &mut warnings) {
            config.sync.query_timeout_secs = Some(secs);
        }
        if let Some(max_delay_secs) = parse(&lookup, "LOTTO_RETRY_MAX_DELAY_SECS", &mut warnings) {
            config.sync.retry = RetryPolicy::Exponential { max_delay_secs };
        }

        config.ledger_snapshot = lookup("LOTTO_LEDGER_SNAPSHOT").map(PathBuf::from);
        if let Some(path) = lookup("LOTTO_STATE_FILE") {
            config.state_file = PathBuf::from(path);
        }
        if let Some(level) = lookup("LOTTO_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.log_level = level;
        }
        config.json_logs = lookup("LOTTO_JSON_LOGS")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        config.warnings = warnings;
        config
    }

    /// Log the problems found while loading.
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("[lotto] {}", warning);
        }
    }
}

fn parse<F, T>(lookup: &F, key: &str, warnings: &mut Vec<String>) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warnings.push(format!("{} is not a valid number: {}, using default", key, raw));
            None
        }
    }
}
