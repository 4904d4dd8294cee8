//! Token launches through the bonding-curve manager

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{info, warn};

use super::{
    trade::{TradeExecutor, TradeRequest},
    watcher::{ConfirmationWatcher, WatchConfig, WatchState},
};
use crate::{
    chain::ChainReader,
    core::{PendingTransaction, SdkError, SdkResult},
    protocol::contracts::{find_token_created, CreatedToken},
};

/// Creates tokens through the shared executor, so a launch and a trade are
/// never open in the wallet at the same time.
pub struct TokenLauncher {
    chain: Arc<dyn ChainReader>,
    executor: Arc<TradeExecutor>,
    manager: Address,
    watch: WatchConfig,
}

impl TokenLauncher {
    pub fn new(chain: Arc<dyn ChainReader>, executor: Arc<TradeExecutor>, manager: Address, watch: WatchConfig) -> Self {
        Self {
            chain,
            executor,
            manager,
            watch,
        }
    }

    pub fn manager(&self) -> Address {
        self.manager
    }

    /// Present the launch to the wallet. `initial_purchase` is spent on the
    /// new token on top of the creation fee.
    pub async fn submit(&self, name: &str, symbol: &str, initial_purchase: U256) -> SdkResult<PendingTransaction> {
        let request = TradeRequest::create(self.manager, name, symbol, initial_purchase);
        self.executor.submit(request).await
    }

    /// Wait for the launch to confirm and read the new token from the
    /// manager's `TokenCreated` event
    pub async fn confirm(&self, pending: PendingTransaction) -> SdkResult<CreatedToken> {
        let watcher = ConfirmationWatcher::new(self.chain.clone(), pending, self.watch);
        let executor = self.executor.clone();
        let state = tokio::spawn(async move {
            let state = watcher.run().await;
            executor.release(pending.hash);
            state
        })
        .await
        .unwrap_or(WatchState::Cancelled);

        match state {
            WatchState::Confirmed(_) => {
                let logs = self.chain.transaction_logs(pending.hash).await?;
                let created = find_token_created(&logs, self.manager)
                    .ok_or_else(|| SdkError::Decode(format!("no TokenCreated event in {}", pending.hash)))?;
                info!(token = %created.token, pool = %created.pool, "Token created");
                Ok(created)
            }
            WatchState::Reverted(_) => Err(SdkError::Reverted(pending.hash)),
            other => {
                warn!(hash = %pending.hash, state = ?other, "Token creation not confirmed");
                Err(SdkError::TimedOut(pending.hash))
            }
        }
    }

    /// Submit and confirm in one go
    pub async fn create_token(&self, name: &str, symbol: &str, initial_purchase: U256) -> SdkResult<CreatedToken> {
        let pending = self.submit(name, symbol, initial_purchase).await?;
        self.confirm(pending).await
    }
}
