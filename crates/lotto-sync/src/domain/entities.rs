//! # Domain Entities
//!
//! Ledger entities (read-only to this system) and the single mutable
//! aggregate, [`GameState`], owned by the sync engine.

use serde::{Deserialize, Serialize};

use super::errors::LottoError;
use super::value_objects::{DrawResult, GameGenesisMeta, WinningBlock, Winner};

/// A ledger block.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Ledger-internal identifier.
    pub id: u64,
    /// Monotonic block height.
    pub block_no: u64,
    /// Block timestamp (unix seconds).
    pub time: u64,
    /// Epoch the block belongs to.
    pub epoch_no: u64,
    /// Byte length of the block.
    pub size: u64,
    /// Number of transactions in the block.
    pub tx_count: u64,
    /// Block hash.
    pub hash: Vec<u8>,
}

impl Block {
    /// Height-only reference to a block not yet fetched.
    pub fn at(block_no: u64) -> Self {
        Self {
            block_no,
            ..Default::default()
        }
    }

    /// Hex-encoded block hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// A ledger transaction.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Ledger-internal identifier.
    pub id: u64,
    /// Transaction hash.
    pub hash: Vec<u8>,
    /// Owning block.
    pub block: Block,
    /// Zero or more opaque metadata payloads.
    pub metadata: Vec<serde_json::Value>,
}

impl Transaction {
    /// Hex-encoded transaction hash.
    pub fn hash_hex(&self) -> String {
        hex::encode(&self.hash)
    }
}

/// An in-flight lottery round.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveRound {
    /// Transaction that instantiated the round.
    pub genesis_tx: Transaction,
    /// Round configuration parsed from the genesis transaction.
    pub meta: GameGenesisMeta,
    /// Current pot in currency units.
    pub pot: u64,
    /// Lower bound of the ticket window for the next draw.
    pub prev_draw_block: Block,
    /// Block at which the next draw happens.
    pub next_draw_block: Block,
    /// The crawl window has reached `next_draw_block` and the draw is unresolved.
    pub is_drawing: bool,
    /// Tickets bought at or after the draw block while the draw is unresolved.
    pub next_round_ticket_count: u64,
}

impl ActiveRound {
    /// Start a round at its genesis transaction.
    ///
    /// `ticket_revenue` is the revenue already on-ledger between the genesis
    /// block and the end of the window the genesis was found in.
    pub fn start(genesis_tx: Transaction, meta: GameGenesisMeta, ticket_revenue: u64) -> Self {
        let genesis_block = genesis_tx.block.clone();
        let next_draw_block = Block::at(genesis_block.block_no.saturating_add(meta.block_interval));
        Self {
            pot: meta.base_prize.saturating_add(ticket_revenue),
            genesis_tx,
            meta,
            prev_draw_block: genesis_block,
            next_draw_block,
            is_drawing: false,
            next_round_ticket_count: 0,
        }
    }

    /// Advance the schedule by one interval after a draw without winners.
    ///
    /// Tickets accumulated while the draw was resolving are credited to the pot.
    pub fn roll_over(&mut self, draw_block: Block) {
        let next = draw_block.block_no.saturating_add(self.meta.block_interval);
        self.prev_draw_block = draw_block;
        self.next_draw_block = Block::at(next);
        self.pot = self
            .pot
            .saturating_add(self.meta.ticket_revenue(self.next_round_ticket_count));
        self.next_round_ticket_count = 0;
        self.is_drawing = false;
    }
}

/// Round lifecycle: either no game is active or exactly one round is.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Round {
    /// No game is active.
    #[default]
    NoActiveRound,
    /// A round is in flight.
    Active(ActiveRound),
}

/// The derived game state.
///
/// This is the whole externally observable state surface. Feeding a saved
/// copy back into the engine resumes the crawl from `start_block`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    /// Version of the crate that last wrote this state.
    pub version: String,
    /// Crawl cursor.
    pub start_block: Block,
    /// Polling loop run flag.
    pub is_running: bool,
    /// Current round.
    pub round: Round,
    /// Draw outcomes, newest first.
    pub previous_results: Vec<DrawResult>,
    /// Winners, newest first.
    pub previous_winners: Vec<Winner>,
}

impl GameState {
    /// Fresh state with the crawl cursor at `start_block`.
    pub fn new(start_block: Block) -> Self {
        Self {
            start_block,
            ..Default::default()
        }
    }

    /// Is a round active?
    pub fn is_game_running(&self) -> bool {
        matches!(self.round, Round::Active(_))
    }

    /// Active round, if any.
    pub fn active_round(&self) -> Option<&ActiveRound> {
        match &self.round {
            Round::Active(round) => Some(round),
            Round::NoActiveRound => None,
        }
    }

    /// Mutable active round, if any.
    pub fn active_round_mut(&mut self) -> Option<&mut ActiveRound> {
        match &mut self.round {
            Round::Active(round) => Some(round),
            Round::NoActiveRound => None,
        }
    }

    /// Pot of the active round, zero when no game is running.
    pub fn current_pot(&self) -> u64 {
        self.active_round().map_or(0, |round| round.pot)
    }

    /// Is the active round resolving its draw?
    pub fn is_drawing(&self) -> bool {
        self.active_round().is_some_and(|round| round.is_drawing)
    }

    /// Insert a draw outcome at the head of the result history.
    pub fn record_result(
        &mut self,
        numbers: Vec<WinningBlock>,
        draw_block: &Block,
        prize: u64,
        winner_count: usize,
        capacity: usize,
    ) {
        self.previous_results.insert(
            0,
            DrawResult {
                draw_date: draw_block.time,
                numbers,
                prize,
                winner_count,
            },
        );
        self.previous_results.truncate(capacity);
    }

    /// Credit a prize to `address` for the draw at `draw_block`.
    ///
    /// An address that already won this draw has the prize added to its
    /// entry; otherwise a new entry goes to the head. The oldest entry by
    /// insertion is dropped once `capacity` is exceeded.
    pub fn credit_winner(&mut self, address: &str, prize: u64, draw_block: &Block, capacity: usize) {
        let existing = self
            .previous_winners
            .iter_mut()
            .find(|w| w.address == address && w.draw_block.block_no == draw_block.block_no);

        match existing {
            Some(winner) => winner.prize = winner.prize.saturating_add(prize),
            None => {
                self.previous_winners.insert(
                    0,
                    Winner {
                        address: address.to_string(),
                        prize,
                        draw_block: draw_block.clone(),
                        reward_tx: None,
                    },
                );
                self.previous_winners.truncate(capacity);
            }
        }
    }

    /// Check the aggregate's structural invariants.
    pub fn check_invariants(&self, capacity: usize) -> Result<(), LottoError> {
        super::invariants::invariant_history_bounded(self.previous_results.len(), capacity)?;
        super::invariants::invariant_history_bounded(self.previous_winners.len(), capacity)?;
        if let Some(round) = self.active_round() {
            super::invariants::invariant_draw_schedule(
                round.prev_draw_block.block_no,
                round.next_draw_block.block_no,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn meta() -> GameGenesisMeta {
        GameGenesisMeta {
            base_prize: 100_000,
            ticket_price: 2_000_000,
            block_interval: 500,
            digits: 3,
            winner_prize_ratio: 70,
        }
    }

    fn genesis_tx(block_no: u64) -> Transaction {
        Transaction {
            id: 1,
            hash: vec![1],
            block: Block::at(block_no),
            metadata: vec![json!({})],
        }
    }

    #[test]
    fn test_round_start_schedules_draw() {
        let round = ActiveRound::start(genesis_tx(1000), meta(), 1_400_000);
        assert_eq!(round.pot, 1_500_000);
        assert_eq!(round.prev_draw_block.block_no, 1000);
        assert_eq!(round.next_draw_block.block_no, 1500);
        assert!(!round.is_drawing);
    }

    #[test]
    fn test_round_roll_over() {
        let mut round = ActiveRound::start(genesis_tx(1000), meta(), 0);
        round.is_drawing = true;
        round.next_round_ticket_count = 2;
        round.roll_over(Block::at(1500));
        assert_eq!(round.prev_draw_block.block_no, 1500);
        assert_eq!(round.next_draw_block.block_no, 2000);
        assert_eq!(round.pot, 100_000 + 2 * 1_400_000);
        assert_eq!(round.next_round_ticket_count, 0);
        assert!(!round.is_drawing);
    }

    #[test]
    fn test_round_schedule_saturates() {
        let huge = GameGenesisMeta {
            block_interval: u64::MAX - 10,
            ..meta()
        };
        let mut round = ActiveRound::start(genesis_tx(10), huge, 0);
        assert_eq!(round.next_draw_block.block_no, u64::MAX);

        round.roll_over(Block::at(20));
        assert_eq!(round.prev_draw_block.block_no, 20);
        assert_eq!(round.next_draw_block.block_no, u64::MAX);
        assert!(round.prev_draw_block.block_no < round.next_draw_block.block_no);
    }

    #[test]
    fn test_current_pot_without_round() {
        let state = GameState::default();
        assert_eq!(state.current_pot(), 0);
        assert!(!state.is_game_running());
        assert!(!state.is_drawing());
    }

    #[test]
    fn test_record_result_newest_first_and_bounded() {
        let mut state = GameState::default();
        for i in 0..15u64 {
            let block = Block { time: i, ..Block::at(i) };
            state.record_result(vec![], &block, i, 0, 10);
        }
        assert_eq!(state.previous_results.len(), 10);
        assert_eq!(state.previous_results[0].draw_date, 14);
        assert_eq!(state.previous_results[9].draw_date, 5);
    }

    #[test]
    fn test_credit_winner_merges_same_draw() {
        let mut state = GameState::default();
        let draw = Block::at(1500);
        state.credit_winner("addr1", 50, &draw, 10);
        state.credit_winner("addr1", 50, &draw, 10);
        assert_eq!(state.previous_winners.len(), 1);
        assert_eq!(state.previous_winners[0].prize, 100);
    }

    #[test]
    fn test_credit_winner_separate_draws() {
        let mut state = GameState::default();
        state.credit_winner("addr1", 50, &Block::at(1500), 10);
        state.credit_winner("addr1", 70, &Block::at(2000), 10);
        assert_eq!(state.previous_winners.len(), 2);
        assert_eq!(state.previous_winners[0].draw_block.block_no, 2000);
    }

    #[test]
    fn test_credit_winner_drops_oldest_insertion() {
        let mut state = GameState::default();
        let draw = Block::at(1500);
        for i in 0..11 {
            state.credit_winner(&format!("addr{}", i), 1_000 - i, &draw, 10);
        }
        assert_eq!(state.previous_winners.len(), 10);
        assert_eq!(state.previous_winners[0].address, "addr10");
        assert!(state.previous_winners.iter().all(|w| w.address != "addr0"));
    }

    #[test]
    fn test_state_serde_roundtrip_keeps_round() {
        let mut state = GameState::new(Block::at(1000));
        state.round = Round::Active(ActiveRound::start(genesis_tx(1000), meta(), 0));
        let encoded = serde_json::to_string(&state).unwrap();
        let decoded: GameState = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, state);
    }

    #[derive(Clone, Debug)]
    enum HistoryOp {
        Result,
        Credit { address: u8, draw: u64, prize: u64 },
    }

    fn history_op() -> impl Strategy<Value = HistoryOp> {
        prop_oneof![
            Just(HistoryOp::Result),
            (0u8..4, 0u64..5, 1u64..1_000)
                .prop_map(|(address, draw, prize)| HistoryOp::Credit { address, draw, prize }),
        ]
    }

    proptest! {
        #[test]
        fn prop_history_newest_first_and_bounded(
            ops in proptest::collection::vec(history_op(), 0..64),
            capacity in 1usize..8,
        ) {
            let mut state = GameState::default();
            let mut recorded = Vec::new();
            // (address, draw) of live winner entries, newest first
            let mut winners: Vec<(String, u64)> = Vec::new();

            for (i, op) in ops.iter().enumerate() {
                match op {
                    HistoryOp::Result => {
                        let block = Block { time: i as u64, ..Block::at(i as u64) };
                        state.record_result(vec![], &block, 0, 0, capacity);
                        recorded.push(i as u64);
                    }
                    HistoryOp::Credit { address, draw, prize } => {
                        let address = format!("addr{}", address);
                        state.credit_winner(&address, *prize, &Block::at(*draw), capacity);
                        let key = (address, *draw);
                        if !winners.contains(&key) {
                            winners.insert(0, key);
                            winners.truncate(capacity);
                        }
                    }
                }
            }

            prop_assert!(state.previous_results.len() <= capacity);
            prop_assert!(state.previous_winners.len() <= capacity);
            prop_assert!(state.check_invariants(capacity).is_ok());

            let dates: Vec<u64> = state.previous_results.iter().map(|r| r.draw_date).collect();
            let expected: Vec<u64> = recorded.iter().rev().take(capacity).copied().collect();
            prop_assert_eq!(dates, expected);

            let keys: Vec<(String, u64)> = state
                .previous_winners
                .iter()
                .map(|w| (w.address.clone(), w.draw_block.block_no))
                .collect();
            prop_assert_eq!(keys, winners);
        }
    }
}
