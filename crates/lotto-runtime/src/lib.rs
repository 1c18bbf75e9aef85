//! # Lotto Runtime
//!
//! Process wiring around the sync core.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `LOTTO_*` environment variables
//! 2. Install the log subscriber
//! 3. Load the ledger snapshot and the saved game state
//! 4. Run the sync loop, saving the state after every pass
//! 5. On Ctrl+C: signal shutdown, wait for the loop, save the state

#![warn(missing_docs)]

pub mod config;
pub mod events;
pub mod logging;
pub mod snapshot;

pub use config::RuntimeConfig;
pub use events::{log_event, spawn_event_logger};
pub use logging::init_logging;
pub use snapshot::{load_ledger, load_state, save_state};
