//! # Inbound Ports
//!
//! API trait defining what the game sync service offers its callers.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{GameEvent, GameState, LottoError, TicketEntry, WinningBlock};

/// Result of one crawl pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was already in progress; nothing was done.
    Skipped,
    /// The chain tip did not move since the last pass.
    Unchanged,
    /// The crawler reached the tip.
    Synced {
        /// Windows committed in this pass
        windows: u64,
        /// Events of the committed windows, in order
        events: Vec<GameEvent>,
    },
    /// The run flag was cleared between windows.
    Stopped {
        /// Windows committed before stopping
        windows: u64,
        /// Events of the committed windows, in order
        events: Vec<GameEvent>,
    },
}

impl PassOutcome {
    /// Events emitted by the pass.
    pub fn events(&self) -> &[GameEvent] {
        match self {
            PassOutcome::Synced { events, .. } | PassOutcome::Stopped { events, .. } => events,
            PassOutcome::Skipped | PassOutcome::Unchanged => &[],
        }
    }
}

/// Lottery game sync API - inbound port.
#[async_trait]
pub trait LottoGameApi: Send + Sync {
    /// Crawl from the cursor to the current chain tip.
    async fn sync_pass(&mut self) -> Result<PassOutcome, LottoError>;

    /// Tickets bought by `sender` in the active round, at most `limit`.
    async fn tickets_by_address(
        &self,
        sender: &str,
        limit: usize,
    ) -> Result<Vec<TicketEntry>, LottoError>;

    /// Current derived state.
    fn game_state(&self) -> &GameState;

    /// Is a round active?
    fn is_game_running(&self) -> bool;

    /// Pot of the active round.
    fn current_pot(&self) -> u64;

    /// Estimated time until the next draw.
    fn remaining_round_time(&self) -> Duration;

    /// Percent of the current draw interval already elapsed.
    fn round_progress(&self) -> f64;

    /// Most recently derived combination.
    fn combination(&self) -> &[WinningBlock];

    /// Has the crawler caught up with the tip since start or the last failure?
    fn is_initial_sync_finished(&self) -> bool;
}
