//! # Adapters Module
//!
//! Port implementations: the in-memory ledger and the cancellation decorator.

pub mod cancellable;
pub mod memory;

pub use cancellable::{shutdown_requested, CancellableLedger};
pub use memory::{EntryKind, InMemoryLedger, LedgerEntry, LedgerSnapshot};
