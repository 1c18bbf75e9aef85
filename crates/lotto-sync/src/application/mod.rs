//! # Application Module
//!
//! Application services orchestrating the domain and the ledger port.

pub mod checkpoint;
pub mod service;
pub mod store;

pub use checkpoint::CheckpointScanner;
pub use service::SyncEngine;
pub use store::GameStateStore;
