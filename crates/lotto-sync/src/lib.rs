//! # Lotto Sync
//!
//! Incremental game-state synchronization for a lottery played through
//! transactions on a public ledger.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! The game has no server-side state of its own. A genesis transaction from
//! the game wallet starts a round, ticket purchases are payments to that
//! wallet carrying a number combination, and winning numbers come from the
//! sizes of blocks produced after the draw block. This crate crawls the
//! ledger forward in bounded windows and derives a single [`GameState`]:
//! the active round and its pot, plus bounded draw and winner histories.
//!
//! ## Guarantees
//!
//! | Property | How |
//! |----------|-----|
//! | Deterministic derivation | Windows are processed strictly in order, one query at a time |
//! | No partial windows | Each window is applied to a scratch copy and committed whole |
//! | Bounded restart cost | Backward checkpoint scan never goes below the hard checkpoint |
//! | Prompt shutdown | Every ledger query races the shutdown signal |
//!
//! ## Module Structure
//!
//! ```text
//! lotto-sync/
//! ├── domain/          # Block, Transaction, GameState, Round, events, errors
//! ├── algorithms/      # Winning number derivation, pot arithmetic
//! ├── ports/           # LottoGameApi (inbound) + LedgerSource (outbound)
//! ├── adapters/        # In-memory ledger, cancellable ledger decorator
//! ├── application/     # SyncEngine, CheckpointScanner, GameStateStore
//! └── config.rs        # SyncConfig, RetryPolicy
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{CancellableLedger, InMemoryLedger, LedgerSnapshot};
pub use algorithms::{derive_winning_numbers, split_prize, ticket_revenue};
pub use application::{CheckpointScanner, GameStateStore, SyncEngine};
pub use config::{RetryPolicy, SyncConfig};
pub use domain::{
    ActiveRound, Block, DrawOutcome, DrawResult, GameEvent, GameGenesisMeta, GameState,
    LottoError, Round, TicketEntry, Transaction, WinningBlock, Winner, HARD_CHECKPOINT,
};
pub use ports::{LedgerSource, LottoGameApi, PassOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
