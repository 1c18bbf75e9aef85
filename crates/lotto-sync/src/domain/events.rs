//! # Game Events
//!
//! Lifecycle notifications emitted by the sync engine.
//!
//! Events are advisory and delivered at least once; no internal logic
//! depends on them being observed.

use serde::{Deserialize, Serialize};

/// How a draw ended.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Matching tickets were found and the round closed.
    Won {
        /// Number of matching ticket transactions
        winner_count: usize,
    },
    /// No matching ticket; the round continues with the next interval.
    RolledOver,
    /// A new genesis transaction replaced the round before it resolved.
    Replaced,
}

/// Lifecycle notification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameEvent {
    /// A genesis transaction started a round.
    RoundStarted {
        /// Block holding the genesis transaction
        genesis_block_no: u64,
        /// Pot after initialisation
        pot: u64,
    },
    /// The crawl window reached the draw block.
    DrawStart {
        /// Draw block height
        draw_block_no: u64,
    },
    /// The draw resolved or the round was replaced.
    DrawEnd {
        /// Draw block height of the ended draw
        draw_block_no: u64,
        /// Outcome
        outcome: DrawOutcome,
    },
    /// A crawl window was committed.
    Fetch {
        /// Crawl cursor after the window
        start_block_no: u64,
        /// Chain tip the pass is crawling toward
        tip_block_no: u64,
    },
    /// The crawler caught up with the tip for the first time.
    InitialSyncComplete {
        /// Chain tip at catch-up
        tip_block_no: u64,
    },
}

impl GameEvent {
    /// Short label for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::RoundStarted { .. } => "RoundStarted",
            GameEvent::DrawStart { .. } => "DrawStart",
            GameEvent::DrawEnd { .. } => "DrawEnd",
            GameEvent::Fetch { .. } => "Fetch",
            GameEvent::InitialSyncComplete { .. } => "InitialSyncComplete",
        }
    }
}
