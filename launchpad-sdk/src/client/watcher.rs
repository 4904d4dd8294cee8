use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    time::{sleep_until, Instant},
};
use tracing::{debug, info, warn};

use crate::{
    chain::ChainReader,
    core::{
        constants::{RECEIPT_MAX_ATTEMPTS, RECEIPT_POLL_INTERVAL, REQUIRED_CONFIRMATIONS},
        PendingTransaction, TxReceipt,
    },
};

/// Lifecycle of one submitted transaction. Every state but `Submitted` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Submitted { attempts: u32 },
    Confirmed(TxReceipt),
    Reverted(TxReceipt),
    /// Budget exhausted without a usable receipt. The transaction may still land.
    TimedOut { attempts: u32 },
    Cancelled,
}

impl WatchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WatchState::Submitted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Blocks counted from the receipt's block, inclusive
    pub confirmations: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: RECEIPT_POLL_INTERVAL,
            max_attempts: RECEIPT_MAX_ATTEMPTS,
            confirmations: REQUIRED_CONFIRMATIONS,
        }
    }
}

/// Handle that stops a running watcher
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Follows a single [`PendingTransaction`] until it reaches a terminal state.
///
/// [`step`](Self::step) performs exactly one poll so tests can drive the
/// machine attempt by attempt; [`run`](Self::run) loops it with the
/// configured backoff, also listening to an optional push channel of
/// receipts. If that channel closes, polling carries on alone.
pub struct ConfirmationWatcher {
    chain: Arc<dyn ChainReader>,
    pending: PendingTransaction,
    config: WatchConfig,
    state: WatchState,
    subscription: Option<mpsc::Receiver<TxReceipt>>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl ConfirmationWatcher {
    pub fn new(chain: Arc<dyn ChainReader>, pending: PendingTransaction, config: WatchConfig) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            chain,
            pending,
            config,
            state: WatchState::Submitted { attempts: 0 },
            subscription: None,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        }
    }

    /// Attach a push source of receipts
    pub fn with_subscription(mut self, receipts: mpsc::Receiver<TxReceipt>) -> Self {
        self.subscription = Some(receipts);
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn pending(&self) -> PendingTransaction {
        self.pending
    }

    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            info!(hash = %self.pending.hash, "Watcher cancelled");
            self.state = WatchState::Cancelled;
        }
    }

    /// One poll attempt
    pub async fn step(&mut self) -> WatchState {
        let attempts = match self.state {
            WatchState::Submitted { attempts } => attempts + 1,
            terminal => return terminal,
        };
        let hash = self.pending.hash;

        match self.chain.transaction_receipt(hash).await {
            Ok(Some(receipt)) => {
                if let Some(terminal) = self.classify(receipt).await {
                    return self.finish(terminal);
                }
            }
            Ok(None) => debug!(%hash, attempts, "Receipt not available yet"),
            Err(e) => warn!(%hash, attempts, error = %e, "Error fetching receipt, will retry"),
        }

        self.state = if attempts >= self.config.max_attempts {
            warn!(%hash, attempts, "Transaction confirmation timeout");
            WatchState::TimedOut { attempts }
        } else {
            WatchState::Submitted { attempts }
        };
        self.state
    }

    /// Poll until terminal, honouring the cancel handle
    pub async fn run(mut self) -> WatchState {
        let hash = self.pending.hash;
        let mut subscription = self.subscription.take();
        let mut cancel_rx = self.cancel_rx.clone();

        loop {
            if *cancel_rx.borrow() {
                self.cancel();
                return self.state;
            }

            let state = self.step().await;
            if state.is_terminal() {
                return state;
            }

            let deadline = Instant::now() + self.config.poll_interval;
            loop {
                tokio::select! {
                    _ = sleep_until(deadline) => break,
                    pushed = next_pushed(&mut subscription) => match pushed {
                        Some(receipt) if receipt.hash == hash => {
                            if let Some(terminal) = self.classify(receipt).await {
                                return self.finish(terminal);
                            }
                        }
                        Some(_) => {}
                        None => {
                            debug!(%hash, "Receipt subscription closed, polling only");
                            subscription = None;
                        }
                    },
                    _ = cancelled(&mut cancel_rx) => {
                        self.cancel();
                        return self.state;
                    }
                }
            }
        }
    }

    /// Decide whether a receipt settles the transaction
    async fn classify(&self, receipt: TxReceipt) -> Option<WatchState> {
        if !receipt.success {
            return Some(WatchState::Reverted(receipt));
        }
        match self.chain.block_number().await {
            Ok(head) => {
                let seen = head.saturating_add(1).saturating_sub(receipt.block_number);
                if seen >= self.config.confirmations {
                    Some(WatchState::Confirmed(receipt))
                } else {
                    debug!(hash = %receipt.hash, seen, "Waiting for confirmations");
                    None
                }
            }
            Err(e) => {
                warn!(hash = %receipt.hash, error = %e, "Could not read block number");
                None
            }
        }
    }

    fn finish(&mut self, terminal: WatchState) -> WatchState {
        match terminal {
            WatchState::Confirmed(r) => info!(hash = %r.hash, block = r.block_number, "Transaction confirmed"),
            WatchState::Reverted(r) => warn!(hash = %r.hash, block = r.block_number, "Transaction reverted"),
            _ => {}
        }
        self.state = terminal;
        terminal
    }
}

async fn next_pushed(subscription: &mut Option<mpsc::Receiver<TxReceipt>>) -> Option<TxReceipt> {
    match subscription {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Resolves once cancellation is requested; never resolves if the handle is gone
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
