//! # Lotto Runtime
//!
//! Entry point: runs the sync loop over a ledger snapshot until Ctrl+C.

use std::sync::Arc;

use anyhow::{Context, Result};
use lotto_runtime::{
    init_logging, load_ledger, load_state, save_state, spawn_event_logger, RuntimeConfig,
};
use lotto_sync::SyncEngine;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();
    init_logging(&config.log_level, config.json_logs)?;
    config.log_warnings();
    info!(version = lotto_sync::VERSION, "[lotto] Starting runtime");

    let ledger_path = config
        .ledger_snapshot
        .as_deref()
        .context("LOTTO_LEDGER_SNAPSHOT is not set")?;
    let ledger = Arc::new(load_ledger(ledger_path)?);
    let state = load_state(&config.state_file)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut engine = SyncEngine::new(config.sync.clone(), ledger, state, shutdown_rx)
        .context("invalid sync configuration")?;
    let event_log = spawn_event_logger(engine.subscribe());

    let state_file = config.state_file.clone();
    let sync = tokio::spawn(async move {
        let result = engine
            .run(|state| {
                if let Err(e) = save_state(&state_file, state) {
                    warn!("[lotto] Failed to save state: {:#}", e);
                }
            })
            .await;
        (engine, result)
    });

    info!("[lotto] Running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    info!("[lotto] Shutdown signal received");
    if let Err(e) = shutdown_tx.send(true) {
        error!("[lotto] Failed to send shutdown signal: {}", e);
    }

    let (engine, result) = sync.await.context("sync task failed")?;
    result.context("sync loop failed")?;

    let state = engine.into_state();
    save_state(&config.state_file, &state)?;
    event_log.await.context("event log task failed")?;

    info!(
        start_block = state.start_block.block_no,
        "[lotto] Shutdown complete"
    );
    Ok(())
}
