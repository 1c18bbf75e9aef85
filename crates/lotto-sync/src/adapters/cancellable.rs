//! Cancellable Ledger Adapter
//!
//! Wraps any `LedgerSource` so every query races the shutdown signal and,
//! when configured, a per-query timeout. A shutdown request aborts a stalled
//! pass at the query it is waiting on.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::domain::{Block, LottoError, Transaction};
use crate::ports::outbound::LedgerSource;

/// Resolve once shutdown is signalled. Never resolves if the sender is gone.
pub async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Ledger decorator adding cancellation and an optional timeout.
pub struct CancellableLedger<L: ?Sized> {
    inner: Arc<L>,
    shutdown: watch::Receiver<bool>,
    timeout: Option<Duration>,
}

impl<L: LedgerSource + ?Sized> CancellableLedger<L> {
    /// Wrap `inner`, aborting queries when `shutdown` becomes true.
    pub fn new(inner: Arc<L>, shutdown: watch::Receiver<bool>, timeout: Option<Duration>) -> Self {
        Self {
            inner,
            shutdown,
            timeout,
        }
    }

    /// Has shutdown been requested?
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// A fresh receiver for the shutdown signal.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.clone()
    }

    async fn guard<T, F>(&self, query: F) -> Result<T, LottoError>
    where
        F: Future<Output = Result<T, LottoError>> + Send,
        T: Send,
    {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(LottoError::Cancelled);
        }

        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, query).await {
                    Ok(result) => result,
                    Err(_) => Err(LottoError::QueryTimeout {
                        secs: limit.as_secs(),
                    }),
                },
                None => query.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            () = shutdown_requested(&mut shutdown) => Err(LottoError::Cancelled),
        }
    }
}

#[async_trait]
impl<L: LedgerSource + ?Sized> LedgerSource for CancellableLedger<L> {
    async fn latest_block(&self) -> Result<Block, LottoError> {
        self.guard(self.inner.latest_block()).await
    }

    async fn block_by_number(&self, block_no: u64) -> Result<Option<Block>, LottoError> {
        self.guard(self.inner.block_by_number(block_no)).await
    }

    async fn genesis_tx(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
    ) -> Result<Option<Transaction>, LottoError> {
        self.guard(self.inner.genesis_tx(wallet, start_block, end_block))
            .await
    }

    async fn ticket_tx_count(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<u64, LottoError> {
        self.guard(
            self.inner
                .ticket_tx_count(wallet, start_block, end_block, min_amount),
        )
        .await
    }

    async fn ticket_txs_matching_numbers(
        &self,
        wallet: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
        numbers: &[u32],
    ) -> Result<Vec<Transaction>, LottoError> {
        self.guard(self.inner.ticket_txs_matching_numbers(
            wallet,
            start_block,
            end_block,
            min_amount,
            numbers,
        ))
        .await
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
        self.guard(self.inner.ticket_txs_by_sender(
            wallet,
            sender,
            start_block,
            end_block,
            min_amount,
            limit,
        ))
        .await
    }

    async fn transaction_sender_address(&self, tx_id: u64) -> Result<String, LottoError> {
        self.guard(self.inner.transaction_sender_address(tx_id))
            .await
    }

    async fn reward_tx(
        &self,
        from_wallet: &str,
        to_address: &str,
        start_block: u64,
        end_block: u64,
        min_amount: u64,
    ) -> Result<Option<Transaction>, LottoError> {
        self.guard(self.inner.reward_tx(
            from_wallet,
            to_address,
            start_block,
            end_block,
            min_amount,
        ))
        .await
    }

    async fn blocks_with_transactions(
        &self,
        after_block_no: u64,
        limit: usize,
    ) -> Result<Vec<Block>, LottoError> {
        self.guard(self.inner.blocks_with_transactions(after_block_no, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryLedger;

    /// Ledger whose tip query never completes.
    struct StalledLedger;

    #[async_trait]
    impl LedgerSource for StalledLedger {
        async fn latest_block(&self) -> Result<Block, LottoError> {
            std::future::pending().await
        }
        async fn block_by_number(&self, _: u64) -> Result<Option<Block>, LottoError> {
            Ok(None)
        }
        async fn genesis_tx(&self, _: &str, _: u64, _: u64) -> Result<Option<Transaction>, LottoError> {
            Ok(None)
        }
        async fn ticket_tx_count(&self, _: &str, _: u64, _: u64, _: u64) -> Result<u64, LottoError> {
            Ok(0)
        }
        async fn ticket_txs_matching_numbers(
            &self,
            _: &str,
            _: u64,
            _: u64,
            _: u64,
            _: &[u32],
        ) -> Result<Vec<Transaction>, LottoError> {
            Ok(vec![])
        }
        async fn ticket_txs_by_sender(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: u64,
            _: u64,
            _: usize,
        ) -> Result<Vec<Transaction>, LottoError> {
            Ok(vec![])
        }
        async fn transaction_sender_address(&self, _: u64) -> Result<String, LottoError> {
            Ok(String::new())
        }
        async fn reward_tx(
            &self,
            _: &str,
            _: &str,
            _: u64,
            _: u64,
            _: u64,
        ) -> Result<Option<Transaction>, LottoError> {
            Ok(None)
        }
        async fn blocks_with_transactions(&self, _: u64, _: usize) -> Result<Vec<Block>, LottoError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_passes_through() {
        let (_tx, rx) = watch::channel(false);
        let ledger = CancellableLedger::new(Arc::new(InMemoryLedger::with_chain(5)), rx, None);
        assert_eq!(ledger.latest_block().await.unwrap().block_no, 5);
    }

    #[tokio::test]
    async fn test_already_shut_down() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let ledger = CancellableLedger::new(Arc::new(InMemoryLedger::with_chain(5)), rx, None);
        assert!(ledger.is_shutdown());
        assert!(matches!(ledger.latest_block().await, Err(LottoError::Cancelled)));
    }

    #[tokio::test]
    async fn test_shutdown_aborts_stalled_query() {
        let (tx, rx) = watch::channel(false);
        let ledger = CancellableLedger::new(Arc::new(StalledLedger), rx, None);

        let pending = tokio::spawn(async move { ledger.latest_block().await });
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(LottoError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let (_tx, rx) = watch::channel(false);
        let ledger = CancellableLedger::new(Arc::new(StalledLedger), rx, Some(Duration::from_secs(3)));
        assert!(matches!(
            ledger.latest_block().await,
            Err(LottoError::QueryTimeout { secs: 3 })
        ));
    }
}
