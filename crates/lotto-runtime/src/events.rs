//! Event log task.

use lotto_sync::{DrawOutcome, GameEvent};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log one lifecycle event.
pub fn log_event(event: &GameEvent) {
    match event {
        GameEvent::RoundStarted { genesis_block_no, pot } => {
            info!(genesis_block = genesis_block_no, pot, "[lotto] Round started");
        }
        GameEvent::DrawStart { draw_block_no } => {
            info!(draw_block = draw_block_no, "[lotto] Drawing");
        }
        GameEvent::DrawEnd { draw_block_no, outcome } => match outcome {
            DrawOutcome::Won { winner_count } => {
                info!(draw_block = draw_block_no, winner_count, "[lotto] Draw won");
            }
            DrawOutcome::RolledOver => {
                info!(draw_block = draw_block_no, "[lotto] Draw rolled over");
            }
            DrawOutcome::Replaced => {
                info!(draw_block = draw_block_no, "[lotto] Draw replaced");
            }
        },
        GameEvent::Fetch { start_block_no, tip_block_no } => {
            debug!(start_block = start_block_no, tip = tip_block_no, "[lotto] Fetched");
        }
        GameEvent::InitialSyncComplete { tip_block_no } => {
            info!(tip = tip_block_no, "[lotto] Caught up with the ledger");
        }
    }
}

/// Log events until the engine drops its sender.
pub fn spawn_event_logger(mut events: broadcast::Receiver<GameEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "[lotto] Event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_ends_when_sender_dropped() {
        let (tx, rx) = broadcast::channel(4);
        let handle = spawn_event_logger(rx);
        tx.send(GameEvent::DrawStart { draw_block_no: 1 }).unwrap();
        drop(tx);
        handle.await.unwrap();
    }
}
