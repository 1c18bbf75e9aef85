//! # Game State Store
//!
//! History bookkeeping on the derived [`GameState`]: draw results, winners
//! and reward settlement.

use tracing::{debug, info};

use crate::algorithms::split_prize;
use crate::domain::{Block, GameState, LottoError, Transaction, WinningBlock};
use crate::ports::LedgerSource;

/// History update rules bound to a ledger and the game wallet.
pub struct GameStateStore<'a, L: LedgerSource + ?Sized> {
    ledger: &'a L,
    wallet: &'a str,
    capacity: usize,
}

impl<'a, L: LedgerSource + ?Sized> GameStateStore<'a, L> {
    /// Create a store view.
    pub fn new(ledger: &'a L, wallet: &'a str, capacity: usize) -> Self {
        Self {
            ledger,
            wallet,
            capacity,
        }
    }

    /// Record a draw outcome at the head of the result history.
    pub fn record_result(
        &self,
        state: &mut GameState,
        numbers: Vec<WinningBlock>,
        draw_block: &Block,
        pot: u64,
        winner_count: usize,
    ) {
        debug!(
            draw_block = draw_block.block_no,
            pot, winner_count, "[lotto] Recording draw result"
        );
        state.record_result(numbers, draw_block, pot, winner_count, self.capacity);
    }

    /// Split `pot` evenly across `winning_txs` and credit each sender.
    ///
    /// Returns the prize paid per winning ticket.
    pub async fn record_winners(
        &self,
        state: &mut GameState,
        winning_txs: &[Transaction],
        draw_block: &Block,
        pot: u64,
    ) -> Result<u64, LottoError> {
        let prize = split_prize(pot, winning_txs.len());

        for tx in winning_txs {
            let address = self.ledger.transaction_sender_address(tx.id).await?;
            info!(
                address = %address,
                prize,
                draw_block = draw_block.block_no,
                "[lotto] Crediting winner"
            );
            state.credit_winner(&address, prize, draw_block, self.capacity);
        }

        Ok(prize)
    }

    /// Attach observed payout transactions to unsettled winners.
    ///
    /// Settled winners are never queried again. Returns the number of
    /// winners settled by this call.
    pub async fn settle_rewards(
        &self,
        state: &mut GameState,
        latest_block_no: u64,
    ) -> Result<usize, LottoError> {
        let mut settled = 0;

        for winner in state.previous_winners.iter_mut().filter(|w| !w.is_settled()) {
            let reward = self
                .ledger
                .reward_tx(
                    self.wallet,
                    &winner.address,
                    winner.draw_block.block_no,
                    latest_block_no,
                    winner.prize,
                )
                .await?;

            if let Some(tx) = reward {
                info!(
                    address = %winner.address,
                    reward_tx = %tx.hash_hex(),
                    "[lotto] Reward settled"
                );
                winner.reward_tx = Some(tx);
                settled += 1;
            }
        }

        Ok(settled)
    }
}
