//! # Domain Errors
//!
//! Error types for the lottery sync core.
//!
//! A failed ledger query aborts the current crawl pass; the pass is retried
//! after the inter-pass delay. Nothing in this enum is fatal to the process.

use thiserror::Error;

/// Lottery sync error types.
#[derive(Debug, Error)]
pub enum LottoError {
    /// The remote ledger query failed (network or remote error).
    #[error("Ledger query failed: {0}")]
    Ledger(String),

    /// A block the crawler depends on is not present on the ledger.
    #[error("Block not found: {block_no}")]
    BlockNotFound {
        /// Requested block number
        block_no: u64,
    },

    /// Transaction metadata did not parse into the expected payload.
    ///
    /// Treated as the absence of that transaction by the crawler.
    #[error("Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Shutdown was requested while a query was in flight.
    #[error("Sync cancelled")]
    Cancelled,

    /// A ledger query exceeded the configured timeout.
    #[error("Ledger query timed out after {secs}s")]
    QueryTimeout {
        /// Configured timeout
        secs: u64,
    },

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Derived state broke one of its invariants.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl LottoError {
    /// Transient errors are retried on the next scheduled pass.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LottoError::Ledger(_) | LottoError::BlockNotFound { .. } | LottoError::QueryTimeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_not_found_error() {
        let err = LottoError::BlockNotFound { block_no: 4934993 };
        assert!(err.to_string().contains("4934993"));
    }

    #[test]
    fn test_timeout_error() {
        let err = LottoError::QueryTimeout { secs: 30 };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(LottoError::Ledger("connection reset".to_string()).is_transient());
        assert!(LottoError::QueryTimeout { secs: 5 }.is_transient());
        assert!(!LottoError::Cancelled.is_transient());
        assert!(!LottoError::InvalidConfig("empty wallet".to_string()).is_transient());
    }
}
