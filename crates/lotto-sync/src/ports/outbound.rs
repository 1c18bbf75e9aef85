//! # Outbound Ports
//!
//! The ledger query capability the sync core depends on.
//!
//! Block ranges are inclusive block heights. Implementations own request
//! construction, serialization, authentication and transport retries; the
//! core issues one query at a time.

use async_trait::async_trait;

use crate::domain::{Block, LottoError, Transaction};

/// Ledger query capability - outbound port.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Current chain tip.
    async fn latest_block(&self) -> Result<Block, LottoError>;

    /// Block at height `block_no`, if produced.
    async fn block_by_number(&self, block_no: u64) -> Result<Option<Block>, LottoError>;

    /// Most recent genesis transaction sent by `wallet` to itself in the range.
    async fn genesis_tx(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
    ) -> Result<Option<Transaction>, LottoError>;

    /// Number of ticket purchases to `wallet` of at least `min_amount` in the range.
    async fn ticket_tx_count(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<u64, LottoError>;

    /// Ticket purchases in the range whose combination matches `numbers`.
    async fn ticket_txs_matching_numbers(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
        numbers: &[u32],
    ) -> Result<Vec<Transaction>, LottoError>;

    /// Ticket purchases sent by `sender` in the range, oldest first.
    async fn ticket_txs_by_sender(
        &self,
        wallet: &str,
        sender: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
        limit: usize,
    ) -> Result<Vec<Transaction>, LottoError>;

    /// Address that funded transaction `tx_id`, resolved through its spent outputs.
    async fn transaction_sender_address(&self, tx_id: u64) -> Result<String, LottoError>;

    /// Transfer of at least `min_amount` from `from_wallet` to `to_address` in the range.
    async fn reward_tx(
        &self,
        from_wallet: &str,
        to_address: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<Option<Transaction>, LottoError>;

    /// Up to `limit` blocks above `after_block_no` that carry transactions, ascending.
    async fn blocks_with_transactions(
        &self,
        after_block_no: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LottoError>;
}
