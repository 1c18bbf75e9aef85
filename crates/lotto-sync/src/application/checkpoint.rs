//! # Checkpoint Scanner
//!
//! Picks the block the forward crawler resumes from.
//!
//! ## Algorithm
//!
//! Walk backward from the chain tip in fixed windows, looking for genesis
//! transactions. Each genesis found adds the number of whole draw intervals
//! between it and the previously found reference block. Once enough rounds
//! are covered, that genesis block is the resume point; replaying from it
//! rebuilds the result and winner histories.
//!
//! The walk never goes below the hard checkpoint, so the cost is bounded by
//! `(tip - hard_checkpoint) / window` genesis queries.

use tracing::{debug, info, warn};

use crate::domain::{Block, GameGenesisMeta, LottoError};
use crate::ports::LedgerSource;

/// Backward scanner for a safe resume point.
pub struct CheckpointScanner<'a, L: LedgerSource + ?Sized> {
    ledger: &'a L,
    wallet: &'a str,
    window: u64,
    rounds_target: u64,
}

impl<'a, L: LedgerSource + ?Sized> CheckpointScanner<'a, L> {
    /// Create a scanner.
    pub fn new(ledger: &'a L, wallet: &'a str, window: u64, rounds_target: u64) -> Self {
        Self {
            ledger,
            wallet,
            window: window.max(1),
            rounds_target,
        }
    }

    /// Find the block to resume crawling from.
    ///
    /// Never returns a block below `hard_checkpoint`.
    pub async fn find_start_block(
        &self,
        hard_checkpoint: u64,
        latest_tip: &Block,
    ) -> Result<Block, LottoError> {
        let mut reference = latest_tip.block_no;
        let mut current = latest_tip.block_no;
        let mut rounds = 0u64;

        while current >= hard_checkpoint {
            let window_start = current
                .saturating_sub(self.window - 1)
                .max(hard_checkpoint);

            if let Some(tx) = self
                .ledger
                .genesis_tx(self.wallet, window_start, current)
                .await?
            {
                match GameGenesisMeta::from_transaction(&tx) {
                    Ok(meta) => {
                        rounds += reference.saturating_sub(tx.block.block_no) / meta.block_interval;
                        reference = tx.block.block_no;
                        debug!(
                            genesis_block = tx.block.block_no,
                            rounds, "[lotto] Checkpoint scan found genesis"
                        );
                    }
                    Err(e) => {
                        debug!("[lotto] Skipping genesis with bad metadata: {}", e);
                    }
                }

                if rounds >= self.rounds_target {
                    info!(
                        start_block = tx.block.block_no,
                        rounds, "[lotto] Checkpoint found"
                    );
                    return Ok(tx.block);
                }
            }

            if window_start == hard_checkpoint {
                break;
            }
            current = window_start - 1;
        }

        info!(
            hard_checkpoint,
            rounds, "[lotto] Checkpoint scan reached hard checkpoint"
        );
        match self.ledger.block_by_number(hard_checkpoint).await? {
            Some(block) => Ok(block),
            None => {
                warn!(
                    hard_checkpoint,
                    "[lotto] Hard checkpoint block not on ledger yet"
                );
                Ok(Block::at(hard_checkpoint))
            }
        }
    }
}
