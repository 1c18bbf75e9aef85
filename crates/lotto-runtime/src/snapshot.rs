//! # Snapshots
//!
//! JSON persistence for the game state and the ledger replay file.
//!
//! The state is written to a sibling temp file and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use lotto_sync::{GameState, InMemoryLedger, LedgerSnapshot};
use tracing::{debug, info};

/// Load the saved game state, or a fresh one when `path` does not exist.
pub fn load_state(path: &Path) -> Result<GameState> {
    if !path.exists() {
        info!(path = %path.display(), "[lotto] No saved state, starting fresh");
        return Ok(GameState::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let state: GameState = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse state file {}", path.display()))?;

    info!(
        path = %path.display(),
        start_block = state.start_block.block_no,
        version = %state.version,
        "[lotto] Loaded saved state"
    );
    Ok(state)
}

/// Persist `state` to `path`.
pub fn save_state(path: &Path, state: &GameState) -> Result<()> {
    let encoded = serde_json::to_string_pretty(state).context("failed to encode state")?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, encoded)
        .with_context(|| format!("failed to write {}", Path::new(&tmp).display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("failed to move snapshot into {}", path.display()))?;

    debug!(
        path = %path.display(),
        start_block = state.start_block.block_no,
        "[lotto] State saved"
    );
    Ok(())
}

/// Load a ledger snapshot into the in-memory adapter.
pub fn load_ledger(path: &Path) -> Result<InMemoryLedger> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read ledger snapshot {}", path.display()))?;
    let snapshot: LedgerSnapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse ledger snapshot {}", path.display()))?;

    info!(
        path = %path.display(),
        blocks = snapshot.blocks.len(),
        entries = snapshot.entries.len(),
        "[lotto] Loaded ledger snapshot"
    );
    Ok(InMemoryLedger::from_snapshot(snapshot))
}
