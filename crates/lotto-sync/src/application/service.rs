//! # Sync Engine
//!
//! Application service that crawls the ledger forward and derives the
//! [`GameState`] from it.
//!
//! ## Pass structure
//!
//! ```text
//! sync_pass
//!   ├── initialize (first pass only): version stamp, checkpoint scan or resume
//!   ├── latest_block: unchanged tip → Unchanged
//!   └── for each window [start, min(start + W, tip)):
//!         clone state → process_window → check invariants → commit → publish
//! ```
//!
//! A window either commits completely or not at all. A failed query aborts
//! the pass and leaves the state as of the last committed window.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::adapters::{shutdown_requested, CancellableLedger};
use crate::algorithms::{combination_values, derive_winning_numbers};
use crate::application::{CheckpointScanner, GameStateStore};
use crate::config::SyncConfig;
use crate::domain::{
    invariant_above_checkpoint, ActiveRound, Block, DrawOutcome, GameEvent, GameGenesisMeta,
    GameState, LottoError, Round, TicketEntry, TicketMeta, WinningBlock,
};
use crate::ports::{LedgerSource, LottoGameApi, PassOutcome};

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Clears the sync-in-progress flag when a pass ends, however it ends.
struct SyncGuard(Arc<AtomicBool>);

impl SyncGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Output of one window, applied on commit.
#[derive(Default)]
struct WindowOutput {
    events: Vec<GameEvent>,
    combination: Option<Vec<WinningBlock>>,
}

/// Forward crawler and owner of the game state.
pub struct SyncEngine<L: LedgerSource + ?Sized> {
    config: SyncConfig,
    ledger: CancellableLedger<L>,
    state: GameState,
    /// Most recently derived winning combination.
    combination: Vec<WinningBlock>,
    latest_block: Block,
    /// Tip reached by the last successful pass.
    previous_tip: Option<u64>,
    initialized: bool,
    initial_sync_finished: bool,
    consecutive_failures: u32,
    stop_requested: bool,
    syncing: Arc<AtomicBool>,
    events: broadcast::Sender<GameEvent>,
}

impl<L: LedgerSource + ?Sized> SyncEngine<L> {
    /// Create an engine over `ledger`, resuming from `state`.
    ///
    /// Every ledger query races `shutdown`; pass `GameState::default()` for
    /// a fresh start.
    pub fn new(
        config: SyncConfig,
        ledger: Arc<L>,
        state: GameState,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self, LottoError> {
        config.validate()?;
        let ledger = CancellableLedger::new(ledger, shutdown, config.query_timeout());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            ledger,
            state,
            combination: Vec::new(),
            latest_block: Block::default(),
            previous_tip: None,
            initialized: false,
            initial_sync_finished: false,
            consecutive_failures: 0,
            stop_requested: false,
            syncing: Arc::new(AtomicBool::new(false)),
            events,
        })
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Is a pass in progress?
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Shared handle to the sync-in-progress flag.
    pub fn sync_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.syncing)
    }

    /// Current state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Consume the engine, returning its state for persistence.
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Engine configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Chain tip observed by the latest pass.
    pub fn latest_block(&self) -> &Block {
        &self.latest_block
    }

    /// Failed passes since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Request the crawl to stop at the next window boundary.
    pub fn stop(&mut self) {
        info!("[lotto] Stop requested");
        self.stop_requested = true;
        self.state.is_running = false;
    }

    /// Forget the last derived combination.
    pub fn clear_combination(&mut self) {
        self.combination.clear();
    }

    fn should_continue(&self) -> bool {
        !self.stop_requested && !self.ledger.is_shutdown()
    }

    fn publish(&self, event: GameEvent) {
        debug!(event = event.name(), "[lotto] Event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Stamp the version and pick the crawl cursor.
    ///
    /// A saved cursor above the hard checkpoint is resumed as is; anything
    /// else goes through the checkpoint scan.
    pub async fn initialize(&mut self) -> Result<(), LottoError> {
        self.state.version = crate::VERSION.to_string();
        let tip = self.ledger.latest_block().await?;

        if self.state.start_block.block_no > self.config.hard_checkpoint {
            info!(
                start_block = self.state.start_block.block_no,
                tip = tip.block_no,
                "[lotto] Resuming from saved state"
            );
        } else {
            let scanner = CheckpointScanner::new(
                &self.ledger,
                &self.config.game_wallet,
                self.config.checkpoint_window,
                self.config.checkpoint_rounds,
            );
            let start = scanner
                .find_start_block(self.config.hard_checkpoint, &tip)
                .await?;
            invariant_above_checkpoint(start.block_no, self.config.hard_checkpoint)?;
            self.state = GameState {
                version: self.state.version.clone(),
                is_running: self.state.is_running,
                ..GameState::new(start)
            };
        }

        self.latest_block = tip;
        self.initialized = true;
        Ok(())
    }

    /// Poll until shutdown or [`stop`](Self::stop).
    ///
    /// `on_pass` sees the state after every successful pass.
    pub async fn run<F>(&mut self, mut on_pass: F) -> Result<(), LottoError>
    where
        F: FnMut(&GameState) + Send,
    {
        let mut shutdown = self.ledger.shutdown_signal();
        self.state.is_running = true;
        info!(
            wallet = %self.config.game_wallet,
            poll_interval_secs = self.config.poll_interval_secs,
            "[lotto] Sync loop started"
        );

        while self.should_continue() {
            let delay = match self.sync_pass().await {
                Ok(outcome) => {
                    debug!(?outcome, "[lotto] Pass finished");
                    on_pass(&self.state);
                    self.config.poll_interval()
                }
                Err(LottoError::Cancelled) => break,
                Err(e) => {
                    let delay = self.config.retry.delay(
                        self.config.poll_interval(),
                        self.consecutive_failures.saturating_sub(1),
                    );
                    warn!(
                        error = %e,
                        failures = self.consecutive_failures,
                        retry_in_secs = delay.as_secs(),
                        "[lotto] Pass failed"
                    );
                    delay
                }
            };

            tokio::select! {
                _ = shutdown_requested(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.state.is_running = false;
        info!(
            start_block = self.state.start_block.block_no,
            "[lotto] Sync loop stopped"
        );
        Ok(())
    }

    /// Crawl from the cursor to the tip, one window at a time.
    ///
    /// The unit of atomicity is the window, not the pass. A failing window
    /// leaves no trace, but windows committed earlier in the same pass stay
    /// committed and their events stay published, so the next pass resumes
    /// from the last good cursor instead of re-crawling them.
    async fn crawl(&mut self) -> Result<PassOutcome, LottoError> {
        if !self.initialized {
            self.initialize().await?;
        }

        let tip = self.ledger.latest_block().await?;
        if self.previous_tip == Some(tip.block_no) {
            debug!(tip = tip.block_no, "[lotto] Tip unchanged");
            return Ok(PassOutcome::Unchanged);
        }
        self.latest_block = tip.clone();

        info!(
            start_block = self.state.start_block.block_no,
            tip = tip.block_no,
            "[lotto] Sync pass started"
        );

        let mut windows = 0;
        let mut events = Vec::new();

        while self.state.start_block.block_no < tip.block_no {
            if !self.should_continue() {
                info!(windows, "[lotto] Sync pass stopped");
                return Ok(PassOutcome::Stopped { windows, events });
            }

            let mut scratch = self.state.clone();
            let output = self.process_window(&mut scratch, &tip).await?;
            scratch.check_invariants(self.config.history_capacity)?;

            self.state = scratch;
            if let Some(combination) = output.combination {
                self.combination = combination;
            }
            windows += 1;
            for event in &output.events {
                self.publish(event.clone());
            }
            events.extend(output.events);
        }

        self.previous_tip = Some(tip.block_no);
        if !self.initial_sync_finished {
            self.initial_sync_finished = true;
            info!(tip = tip.block_no, "[lotto] Initial sync complete");
            let event = GameEvent::InitialSyncComplete {
                tip_block_no: tip.block_no,
            };
            self.publish(event.clone());
            events.push(event);
        }

        info!(
            windows,
            start_block = self.state.start_block.block_no,
            pot = self.state.current_pot(),
            "[lotto] Sync pass finished"
        );
        Ok(PassOutcome::Synced { windows, events })
    }

    /// Apply the window starting at the cursor of `state` to `state`.
    async fn process_window(
        &self,
        state: &mut GameState,
        tip: &Block,
    ) -> Result<WindowOutput, LottoError> {
        let mut output = WindowOutput::default();
        let start = state.start_block.block_no;
        let stride = start.saturating_add(self.config.crawl_window);
        let end = stride.min(tip.block_no);
        let last = end - 1;

        debug!(start, end, "[lotto] Processing window");

        self.advance_round(state, start, end, &mut output).await?;
        self.scan_genesis(state, start, last, &mut output).await?;

        state.start_block = if tip.block_no <= stride {
            tip.clone()
        } else {
            self.ledger
                .block_by_number(stride)
                .await?
                .ok_or(LottoError::BlockNotFound { block_no: stride })?
        };

        let store = GameStateStore::new(
            &self.ledger,
            &self.config.game_wallet,
            self.config.history_capacity,
        );
        store.settle_rewards(state, tip.block_no).await?;

        output.events.push(GameEvent::Fetch {
            start_block_no: state.start_block.block_no,
            tip_block_no: tip.block_no,
        });
        Ok(output)
    }

    /// Accumulate tickets and resolve the draw of the active round.
    async fn advance_round(
        &self,
        state: &mut GameState,
        start: u64,
        end: u64,
        output: &mut WindowOutput,
    ) -> Result<(), LottoError> {
        let last = end - 1;
        let Some(round) = state.active_round_mut() else {
            return Ok(());
        };
        let next = round.next_draw_block.block_no;
        let price = round.meta.ticket_price;

        let tickets = if round.is_drawing {
            0
        } else if next <= end {
            round.is_drawing = true;
            info!(draw_block = next, "[lotto] Draw started");
            output.events.push(GameEvent::DrawStart {
                draw_block_no: next,
            });
            self.ticket_count(price, start, next.saturating_sub(1)).await?
        } else {
            self.ticket_count(price, start, last).await?
        };
        round.pot = round.pot.saturating_add(round.meta.ticket_revenue(tickets));

        if !round.is_drawing {
            return Ok(());
        }

        let late = self.ticket_count(price, start.max(next), last).await?;
        round.next_round_ticket_count += late;

        let digits = round.meta.digits as usize;
        let candidates = self
            .ledger
            .blocks_with_transactions(next, self.config.winning_lookahead)
            .await?;
        let numbers = derive_winning_numbers(&candidates, digits);
        output.combination = Some(numbers.clone());

        if numbers.len() < digits {
            debug!(
                draw_block = next,
                found = numbers.len(),
                digits,
                "[lotto] Winning numbers not resolvable yet"
            );
            return Ok(());
        }

        let Some(draw_block) = self.ledger.block_by_number(next).await? else {
            warn!(draw_block = next, "[lotto] Draw block missing, draw stays open");
            return Ok(());
        };

        let prev = round.prev_draw_block.block_no;
        let pot = round.pot;
        let winning = self
            .ledger
            .ticket_txs_matching_numbers(
                &self.config.game_wallet,
                prev,
                next.saturating_sub(1),
                price,
                &combination_values(&numbers),
            )
            .await?;

        let store = GameStateStore::new(
            &self.ledger,
            &self.config.game_wallet,
            self.config.history_capacity,
        );
        store.record_result(state, numbers, &draw_block, pot, winning.len());

        if winning.is_empty() {
            if let Some(round) = state.active_round_mut() {
                round.roll_over(draw_block);
                info!(
                    draw_block = next,
                    next_draw_block = round.next_draw_block.block_no,
                    pot = round.pot,
                    "[lotto] No winners, round rolled over"
                );
            }
            output.events.push(GameEvent::DrawEnd {
                draw_block_no: next,
                outcome: DrawOutcome::RolledOver,
            });
        } else {
            let prize = store
                .record_winners(state, &winning, &draw_block, pot)
                .await?;
            state.round = Round::NoActiveRound;
            info!(
                draw_block = next,
                winner_count = winning.len(),
                prize,
                "[lotto] Round closed with winners"
            );
            output.events.push(GameEvent::DrawEnd {
                draw_block_no: next,
                outcome: DrawOutcome::Won {
                    winner_count: winning.len(),
                },
            });
        }

        Ok(())
    }

    /// Start a round for a genesis transaction in `[start, last]`.
    ///
    /// A genesis found while a round is active replaces that round.
    async fn scan_genesis(
        &self,
        state: &mut GameState,
        start: u64,
        last: u64,
        output: &mut WindowOutput,
    ) -> Result<(), LottoError> {
        let Some(tx) = self
            .ledger
            .genesis_tx(&self.config.game_wallet, start, last)
            .await?
        else {
            return Ok(());
        };

        let meta = match GameGenesisMeta::from_transaction(&tx) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(tx = %tx.hash_hex(), error = %e, "[lotto] Ignoring genesis transaction");
                return Ok(());
            }
        };

        if let Some(current) = state.active_round() {
            if current.genesis_tx.id == tx.id {
                return Ok(());
            }
            let draw_block_no = current.next_draw_block.block_no;
            info!(
                draw_block = draw_block_no,
                new_genesis_block = tx.block.block_no,
                "[lotto] Round replaced by new genesis"
            );
            output.events.push(GameEvent::DrawEnd {
                draw_block_no,
                outcome: DrawOutcome::Replaced,
            });
        }

        let tickets = self
            .ticket_count(meta.ticket_price, tx.block.block_no, last)
            .await?;
        let revenue = meta.ticket_revenue(tickets);
        let round = ActiveRound::start(tx, meta, revenue);

        info!(
            genesis_block = round.genesis_tx.block.block_no,
            next_draw_block = round.next_draw_block.block_no,
            pot = round.pot,
            "[lotto] Round started"
        );
        output.events.push(GameEvent::RoundStarted {
            genesis_block_no: round.genesis_tx.block.block_no,
            pot: round.pot,
        });
        state.round = Round::Active(round);
        Ok(())
    }

    async fn ticket_count(&self, price: u64, start: u64, end: u64) -> Result<u64, LottoError> {
        if start > end {
            return Ok(0);
        }
        self.ledger
            .ticket_tx_count(&self.config.game_wallet, start, end, price)
            .await
    }
}

#[async_trait]
impl<L: LedgerSource + ?Sized> LottoGameApi for SyncEngine<L> {
    async fn sync_pass(&mut self) -> Result<PassOutcome, LottoError> {
        let Some(_guard) = SyncGuard::acquire(&self.syncing) else {
            debug!("[lotto] Pass already in progress, skipping");
            return Ok(PassOutcome::Skipped);
        };

        match self.crawl().await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                Ok(outcome)
            }
            Err(e) => {
                self.initial_sync_finished = false;
                if !matches!(e, LottoError::Cancelled) {
                    self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                }
                Err(e)
            }
        }
    }

    async fn tickets_by_address(
        &self,
        sender: &str,
        limit: usize,
    ) -> Result<Vec<TicketEntry>, LottoError> {
        let Some(round) = self.state.active_round() else {
            return Ok(Vec::new());
        };
        let prev = round.prev_draw_block.block_no;
        let end = round
            .next_draw_block
            .block_no
            .min(self.latest_block.block_no.max(prev));

        let txs = self
            .ledger
            .ticket_txs_by_sender(
                &self.config.game_wallet,
                sender,
                prev,
                end,
                round.meta.ticket_price,
                limit,
            )
            .await?;

        Ok(txs
            .iter()
            .filter_map(|tx| match TicketMeta::from_transaction(tx) {
                Ok(meta) => Some(TicketEntry {
                    tx_hash: tx.hash_hex(),
                    combination: meta.combination.to_string(),
                }),
                Err(e) => {
                    debug!(tx = %tx.hash_hex(), error = %e, "[lotto] Skipping ticket");
                    None
                }
            })
            .collect())
    }

    fn game_state(&self) -> &GameState {
        &self.state
    }

    fn is_game_running(&self) -> bool {
        self.state.is_game_running()
    }

    fn current_pot(&self) -> u64 {
        self.state.current_pot()
    }

    fn remaining_round_time(&self) -> Duration {
        let Some(round) = self.state.active_round() else {
            return Duration::ZERO;
        };
        let blocks = round
            .next_draw_block
            .block_no
            .saturating_sub(self.state.start_block.block_no);
        Duration::from_secs(blocks.saturating_mul(self.config.seconds_per_block))
    }

    fn round_progress(&self) -> f64 {
        let Some(round) = self.state.active_round() else {
            return 0.0;
        };
        let interval = round.meta.block_interval as f64;
        let remaining = round
            .next_draw_block
            .block_no
            .saturating_sub(self.state.start_block.block_no) as f64;
        ((interval - remaining) / interval * 100.0).clamp(0.0, 100.0)
    }

    fn combination(&self) -> &[WinningBlock] {
        &self.combination
    }

    fn is_initial_sync_finished(&self) -> bool {
        self.initial_sync_finished
    }
}
