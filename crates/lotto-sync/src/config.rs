//! # Sync Configuration
//!
//! Configuration for the game sync engine.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{
    LottoError, BLOCK_CRAWL_COUNT, CHECKPOINT_ROUNDS, HARD_CHECKPOINT, HISTORY_CAPACITY,
    WINNING_LOOKAHEAD,
};

/// Delay policy between failed passes.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Every failure waits the poll interval.
    #[default]
    Fixed,
    /// Delay doubles per consecutive failure, capped at `max_delay_secs`.
    Exponential {
        /// Upper bound on the delay
        max_delay_secs: u64,
    },
}

impl RetryPolicy {
    /// Delay before the next pass after `consecutive_failures` failed passes.
    pub fn delay(&self, base: Duration, consecutive_failures: u32) -> Duration {
        match self {
            RetryPolicy::Fixed => base,
            RetryPolicy::Exponential { max_delay_secs } => {
                let factor = 1u32.checked_shl(consecutive_failures.min(16)).unwrap_or(u32::MAX);
                base.saturating_mul(factor)
                    .min(Duration::from_secs(*max_delay_secs).max(base))
            }
        }
    }
}

/// Game sync configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Address of the game wallet (genesis sender, ticket receiver, prize payer).
    pub game_wallet: String,

    /// Ledger height below which no game existed.
    pub hard_checkpoint: u64,

    /// Blocks per forward crawl window.
    pub crawl_window: u64,

    /// Blocks per backward checkpoint scan window.
    pub checkpoint_window: u64,

    /// Completed rounds the checkpoint scan tries to cover.
    pub checkpoint_rounds: u64,

    /// Entries kept in the result and winner histories.
    pub history_capacity: usize,

    /// Candidate blocks inspected when deriving winning numbers.
    pub winning_lookahead: usize,

    /// Delay between passes in seconds.
    pub poll_interval_secs: u64,

    /// Delay policy after a failed pass.
    pub retry: RetryPolicy,

    /// Per-query timeout in seconds. `None` lets a slow query block the pass.
    pub query_timeout_secs: Option<u64>,

    /// Average block production time, for round time estimates.
    pub seconds_per_block: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            game_wallet: String::new(),
            hard_checkpoint: HARD_CHECKPOINT,
            crawl_window: BLOCK_CRAWL_COUNT,
            checkpoint_window: BLOCK_CRAWL_COUNT,
            checkpoint_rounds: CHECKPOINT_ROUNDS,
            history_capacity: HISTORY_CAPACITY,
            winning_lookahead: WINNING_LOOKAHEAD,
            poll_interval_secs: 10,
            retry: RetryPolicy::Fixed,
            query_timeout_secs: None,
            seconds_per_block: 20,
        }
    }
}

impl SyncConfig {
    /// Default configuration for a game wallet.
    pub fn for_wallet(game_wallet: impl Into<String>) -> Self {
        Self {
            game_wallet: game_wallet.into(),
            ..Default::default()
        }
    }

    /// Create a config for testing (low checkpoint, no delays).
    pub fn for_testing() -> Self {
        Self {
            game_wallet: "addr_test_game".to_string(),
            hard_checkpoint: 100,
            poll_interval_secs: 0,
            ..Default::default()
        }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), LottoError> {
        if self.game_wallet.trim().is_empty() {
            return Err(LottoError::InvalidConfig("game wallet is empty".to_string()));
        }
        if self.crawl_window == 0 || self.checkpoint_window == 0 {
            return Err(LottoError::InvalidConfig("scan windows must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(LottoError::InvalidConfig("history capacity must be positive".to_string()));
        }
        if self.winning_lookahead == 0 {
            return Err(LottoError::InvalidConfig("winning lookahead must be positive".to_string()));
        }
        Ok(())
    }

    /// Base delay between passes.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-query timeout, if any.
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.hard_checkpoint, 4_934_993);
        assert_eq!(config.crawl_window, 70);
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.retry, RetryPolicy::Fixed);
        assert!(config.query_timeout().is_none());
    }

    #[test]
    fn test_default_config_needs_wallet() {
        assert!(SyncConfig::default().validate().is_err());
        assert!(SyncConfig::for_wallet("addr1").validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = SyncConfig::for_testing();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::ZERO);
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = SyncConfig {
            crawl_window: 0,
            ..SyncConfig::for_testing()
        };
        assert!(matches!(config.validate(), Err(LottoError::InvalidConfig(_))));
    }

    #[test]
    fn test_fixed_retry() {
        let base = Duration::from_secs(10);
        assert_eq!(RetryPolicy::Fixed.delay(base, 5), base);
    }

    #[test]
    fn test_exponential_retry_capped() {
        let policy = RetryPolicy::Exponential { max_delay_secs: 60 };
        let base = Duration::from_secs(10);
        assert_eq!(policy.delay(base, 0), base);
        assert_eq!(policy.delay(base, 1), Duration::from_secs(20));
        assert_eq!(policy.delay(base, 10), Duration::from_secs(60));
    }

    #[test]
    fn test_config_serde() {
        let config = SyncConfig::for_wallet("addr1");
        let encoded = serde_json::to_string(&config).unwrap();
        let decoded: SyncConfig = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded.game_wallet, "addr1");
    }
}
