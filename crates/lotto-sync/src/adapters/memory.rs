//! In-Memory Ledger Adapter
//!
//! Implements `LedgerSource` over an in-process block/transaction set.
//! Used by the test suites and by the runtime to replay a ledger snapshot.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::domain::{Block, LottoError, TicketMeta, Transaction};
use crate::ports::outbound::LedgerSource;

/// Seconds between synthetic blocks.
const BLOCK_TIME_SECS: u64 = 20;

/// Timestamp of synthetic block zero.
const CHAIN_START_TIME: u64 = 1_596_491_091;

/// Role of a ledger entry in the game.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryKind {
    /// Round genesis, sent by the game wallet to itself.
    Genesis,
    /// Ticket purchase sent to the game wallet.
    TicketPurchase,
    /// Plain value transfer (prize payouts).
    Transfer,
}

/// A transaction with the transfer details the queries filter on.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Entry role.
    pub kind: EntryKind,
    /// The transaction itself.
    pub tx: Transaction,
    /// Funding address.
    pub sender: String,
    /// Receiving address.
    pub receiver: String,
    /// Transferred amount.
    pub amount: u64,
}

/// Serializable ledger contents.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Blocks in any order.
    pub blocks: Vec<Block>,
    /// Transactions with transfer details.
    pub entries: Vec<LedgerEntry>,
}

#[derive(Default)]
struct LedgerData {
    blocks: BTreeMap<u64, Block>,
    entries: Vec<LedgerEntry>,
    next_tx_id: u64,
}

impl LedgerData {
    fn ensure_block(&mut self, block_no: u64) -> &mut Block {
        self.blocks
            .entry(block_no)
            .or_insert_with(|| synthetic_block(block_no))
    }

    fn in_range(entry: &LedgerEntry, start_block: u64, end_block: u64) -> bool {
        (start_block..=end_block).contains(&entry.tx.block.block_no)
    }

    fn tickets<'a>(
        &'a self,
        wallet: &'a str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> impl Iterator<Item = &'a LedgerEntry> + 'a {
        self.entries.iter().filter(move |e| {
            e.kind == EntryKind::TicketPurchase
                && e.receiver == wallet
                && e.amount >= min_amount
                && Self::in_range(e, start_block, end_block)
        })
    }
}

fn synthetic_block(block_no: u64) -> Block {
    Block {
        id: block_no,
        block_no,
        time: CHAIN_START_TIME + block_no * BLOCK_TIME_SECS,
        epoch_no: block_no / 21_600,
        size: 200 + (block_no.wrapping_mul(7_919) % 90_000),
        tx_count: 0,
        hash: block_no.to_be_bytes().to_vec(),
    }
}

/// In-memory ledger.
///
/// Interior mutability lets tests grow the chain while the engine holds it.
#[derive(Default)]
pub struct InMemoryLedger {
    data: RwLock<LedgerData>,
    pending_failures: AtomicUsize,
    queries: AtomicUsize,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger with synthetic blocks `0..=tip`.
    pub fn with_chain(tip: u64) -> Self {
        let ledger = Self::new();
        ledger.extend_chain(tip);
        ledger
    }

    /// Load a ledger from a snapshot.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        let ledger = Self::new();
        {
            let mut data = ledger.data.write();
            for block in snapshot.blocks {
                data.blocks.insert(block.block_no, block);
            }
            data.next_tx_id = snapshot.entries.iter().map(|e| e.tx.id + 1).max().unwrap_or(0);
            data.entries = snapshot.entries;
        }
        ledger
    }

    /// Export the ledger contents.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let data = self.data.read();
        LedgerSnapshot {
            blocks: data.blocks.values().cloned().collect(),
            entries: data.entries.clone(),
        }
    }

    /// Append synthetic blocks up to and including `tip`.
    pub fn extend_chain(&self, tip: u64) {
        let mut data = self.data.write();
        let from = data.blocks.keys().next_back().map_or(0, |last| last + 1);
        for block_no in from..=tip {
            data.ensure_block(block_no);
        }
    }

    /// Give a block a specific size and mark it as carrying transactions.
    pub fn set_block_size(&self, block_no: u64, size: u64) {
        let mut data = self.data.write();
        let block = data.ensure_block(block_no);
        block.size = size;
        block.tx_count = block.tx_count.max(1);
    }

    /// Block at `block_no`, creating a synthetic one if missing.
    pub fn block(&self, block_no: u64) -> Block {
        self.data.write().ensure_block(block_no).clone()
    }

    /// Record a genesis transaction carrying `metadata`.
    pub fn add_genesis(&self, block_no: u64, wallet: &str, metadata: serde_json::Value) -> Transaction {
        self.add_entry(EntryKind::Genesis, block_no, wallet, wallet, 0, metadata)
    }

    /// Record a ticket purchase with the chosen `combination`.
    pub fn add_ticket(
        &self,
        block_no: u64,
        wallet: &str,
        sender: &str,
        amount: u64,
        combination: &[u32],
    ) -> Transaction {
        let metadata = serde_json::json!({ "Combination": combination });
        self.add_entry(EntryKind::TicketPurchase, block_no, sender, wallet, amount, metadata)
    }

    /// Record a plain transfer.
    pub fn add_transfer(&self, block_no: u64, from: &str, to: &str, amount: u64) -> Transaction {
        self.add_entry(EntryKind::Transfer, block_no, from, to, amount, serde_json::Value::Null)
    }

    fn add_entry(
        &self,
        kind: EntryKind,
        block_no: u64,
        sender: &str,
        receiver: &str,
        amount: u64,
        metadata: serde_json::Value,
    ) -> Transaction {
        let mut data = self.data.write();
        let id = data.next_tx_id;
        data.next_tx_id += 1;

        let block = data.ensure_block(block_no);
        block.tx_count += 1;
        let block = block.clone();

        let tx = Transaction {
            id,
            hash: id.to_be_bytes().to_vec(),
            block,
            metadata: if metadata.is_null() { vec![] } else { vec![metadata] },
        };
        data.entries.push(LedgerEntry {
            kind,
            tx: tx.clone(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
        });
        tx
    }

    /// Make the next `count` queries fail with a ledger error.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// Number of queries served or failed so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn begin_query(&self, name: &str) -> Result<(), LottoError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            debug!("[lotto] In-memory ledger injecting failure into {}", name);
            return Err(LottoError::Ledger(format!("injected failure: {}", name)));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerSource for InMemoryLedger {
    async fn latest_block(&self) -> Result<Block, LottoError> {
        self.begin_query("latest_block")?;
        self.data
            .read()
            .blocks
            .values()
            .next_back()
            .cloned()
            .ok_or_else(|| LottoError::Ledger("ledger has no blocks".to_string()))
    }

    async fn block_by_number(&self, block_no: u64) -> Result<Option<Block>, LottoError> {
        self.begin_query("block_by_number")?;
        Ok(self.data.read().blocks.get(&block_no).cloned())
    }

    async fn genesis_tx(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
    ) -> Result<Option<Transaction>, LottoError> {
        self.begin_query("genesis_tx")?;
        let data = self.data.read();
        Ok(data
            .entries
            .iter()
            .filter(|e| {
                e.kind == EntryKind::Genesis
                    && e.sender == wallet
                    && e.receiver == wallet
                    && LedgerData::in_range(e, start_block, end_block)
            })
            .max_by_key(|e| (e.tx.block.block_no, e.tx.id))
            .map(|e| e.tx.clone()))
    }

    async fn ticket_tx_count(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<u64, LottoError> {
        self.begin_query("ticket_tx_count")?;
        let data = self.data.read();
        Ok(data.tickets(wallet, start_block, end_block, min_amount).count() as u64)
    }

    async fn ticket_txs_matching_numbers(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
        numbers: &[u32],
    ) -> Result<Vec<Transaction>, LottoError> {
        self.begin_query("ticket_txs_matching_numbers")?;
        let mut wanted = numbers.to_vec();
        wanted.sort_unstable();

        let data = self.data.read();
        Ok(data
            .tickets(wallet, start_block, end_block, min_amount)
            .filter(|e| {
                TicketMeta::from_transaction(&e.tx)
                    .ok()
                    .and_then(|meta| meta.combination.numbers())
                    .is_some_and(|mut chosen| {
                        chosen.sort_unstable();
                        chosen == wanted
                    })
            })
            .map(|e| e.tx.clone())
            .collect())
    }

    async fn ticket_txs_by_sender(
        &self,
        wallet: &str,
        sender: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
        limit: usize,
    ) -> Result<Vec<Transaction>, LottoError> {
        self.begin_query("ticket_txs_by_sender")?;
        let data = self.data.read();
        Ok(data
            .tickets(wallet, start_block, end_block, min_amount)
            .filter(|e| e.sender == sender)
            .take(limit)
            .map(|e| e.tx.clone())
            .collect())
    }

    async fn transaction_sender_address(&self, tx_id: u64) -> Result<String, LottoError> {
        self.begin_query("transaction_sender_address")?;
        self.data
            .read()
            .entries
            .iter()
            .find(|e| e.tx.id == tx_id)
            .map(|e| e.sender.clone())
            .ok_or_else(|| LottoError::Ledger(format!("unknown transaction {}", tx_id)))
    }

    async fn reward_tx(
        &self,
        from_wallet: &str,
        to_address: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<Option<Transaction>, LottoError> {
        self.begin_query("reward_tx")?;
        let data = self.data.read();
        Ok(data
            .entries
            .iter()
            .find(|e| {
                e.kind == EntryKind::Transfer
                    && e.sender == from_wallet
                    && e.receiver == to_address
                    && e.amount >= min_amount
                    && LedgerData::in_range(e, start_block, end_block)
            })
            .map(|e| e.tx.clone()))
    }

    async fn blocks_with_transactions(
        &self,
        after_block_no: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LottoError> {
        self.begin_query("blocks_with_transactions")?;
        let data = self.data.read();
        Ok(data
            .blocks
            .range(after_block_no.saturating_add(1)..)
            .map(|(_, block)| block)
            .filter(|block| block.tx_count > 0)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "addr_game";

    #[tokio::test]
    async fn test_latest_block_empty_ledger_fails() {
        let ledger = InMemoryLedger::new();
        assert!(ledger.latest_block().await.is_err());
    }

    #[tokio::test]
    async fn test_with_chain_tip() {
        let ledger = InMemoryLedger::with_chain(100);
        assert_eq!(ledger.latest_block().await.unwrap().block_no, 100);
        assert!(ledger.block_by_number(101).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_genesis_most_recent_in_range() {
        let ledger = InMemoryLedger::with_chain(100);
        ledger.add_genesis(10, WALLET, serde_json::json!({ "n": 1 }));
        ledger.add_genesis(20, WALLET, serde_json::json!({ "n": 2 }));
        ledger.add_genesis(30, "someone_else", serde_json::json!({ "n": 3 }));

        let tx = ledger.genesis_tx(WALLET, 0, 50).await.unwrap().unwrap();
        assert_eq!(tx.block.block_no, 20);
        assert!(ledger.genesis_tx(WALLET, 21, 50).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ticket_count_respects_price_and_range() {
        let ledger = InMemoryLedger::with_chain(100);
        ledger.add_ticket(10, WALLET, "alice", 2_000, &[1, 2, 3]);
        ledger.add_ticket(11, WALLET, "bob", 1_999, &[1, 2, 3]);
        ledger.add_ticket(60, WALLET, "carol", 2_000, &[1, 2, 3]);

        assert_eq!(ledger.ticket_tx_count(WALLET, 0, 50, 2_000).await.unwrap(), 1);
        assert_eq!(ledger.ticket_tx_count(WALLET, 0, 100, 1_000).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_matching_is_order_insensitive() {
        let ledger = InMemoryLedger::with_chain(100);
        ledger.add_ticket(10, WALLET, "alice", 2_000, &[12, 5, 99]);
        ledger.add_ticket(11, WALLET, "bob", 2_000, &[12, 5, 98]);

        let winners = ledger
            .ticket_txs_matching_numbers(WALLET, 0, 100, 2_000, &[5, 99, 12])
            .await
            .unwrap();
        assert_eq!(winners.len(), 1);
        assert_eq!(ledger.transaction_sender_address(winners[0].id).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_blocks_with_transactions_after() {
        let ledger = InMemoryLedger::with_chain(100);
        ledger.set_block_size(50, 1_234);
        ledger.set_block_size(52, 4_321);
        ledger.set_block_size(40, 999);

        let blocks = ledger.blocks_with_transactions(50, 10).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_no, 52);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let ledger = InMemoryLedger::with_chain(10);
        ledger.fail_next(2);
        tokio_test::assert_err!(ledger.latest_block().await);
        tokio_test::assert_err!(ledger.latest_block().await);
        tokio_test::assert_ok!(ledger.latest_block().await);
        assert_eq!(ledger.query_count(), 3);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let ledger = InMemoryLedger::with_chain(20);
        ledger.add_transfer(5, WALLET, "alice", 10);
        let copy = InMemoryLedger::from_snapshot(ledger.snapshot());
        assert_eq!(copy.latest_block().await.unwrap().block_no, 20);
        let reward = copy.reward_tx(WALLET, "alice", 0, 20, 10).await.unwrap();
        assert!(reward.is_some());
        let next = copy.add_transfer(6, WALLET, "bob", 1);
        assert_eq!(next.id, 1);
    }
}
