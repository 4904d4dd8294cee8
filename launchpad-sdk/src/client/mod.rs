pub mod balances;
pub mod launch;
pub mod market;
pub mod pools;
pub mod quote;
pub mod session;
pub mod trade;
pub mod watcher;

use std::sync::Arc;

use alloy_primitives::Address;

use crate::{
    api::{ExplorerClient, IndexerClient, MetadataClient, TokenDetail},
    cache::SystemClock,
    chain::{ChainReader, JsonRpcChain, JsonRpcWallet, RpcTransport, WalletSigner},
    config::LaunchpadConfig,
    core::{SdkError, SdkResult},
};

pub use balances::BalanceRefresher;
pub use launch::TokenLauncher;
pub use market::{MarketService, MarketSnapshot};
pub use pools::{PoolDirectory, PoolLookup};
pub use quote::{QuoteOutcome, QuoteResolver};
pub use session::{NextAction, QuoteState, SessionConfig, TradeNotice, TradeSession};
pub use trade::{TradeExecutor, TradeRequest};
pub use watcher::{CancelHandle, ConfirmationWatcher, WatchConfig, WatchState};

/// Entry point composing the chain, wallet and backend services
pub struct LaunchpadClient {
    config: LaunchpadConfig,
    /// Read access to pools and tokens
    pub chain: Arc<dyn ChainReader>,
    /// Pool price, reserves and progress
    pub market: MarketService,
    /// Balances and allowance
    pub balances: BalanceRefresher,
    /// Token to pool resolution, cached
    pub pools: PoolDirectory,
    pub indexer: Arc<IndexerClient>,
    pub metadata: MetadataClient,
    pub explorer: ExplorerClient,
    /// Present once a wallet is connected; shared by every session
    executor: Option<Arc<TradeExecutor>>,
}

impl LaunchpadClient {
    /// Read-only client
    pub fn new(config: LaunchpadConfig) -> SdkResult<Self> {
        let transport = Arc::new(RpcTransport::new(
            config.endpoints.rpc_url.clone(),
            config.request_timeout(),
        )?);
        Self::from_parts(config, Arc::new(JsonRpcChain::new(transport)), None)
    }

    /// Client that trades as `account` through the configured wallet endpoint
    pub fn with_wallet(config: LaunchpadConfig, account: Address) -> SdkResult<Self> {
        let wallet_transport = Arc::new(RpcTransport::new(
            config.endpoints.wallet_url.clone(),
            config.request_timeout(),
        )?);
        let wallet = Arc::new(JsonRpcWallet::new(wallet_transport, account));

        let mut client = Self::new(config)?;
        client.executor = Some(Arc::new(TradeExecutor::new(wallet)));
        Ok(client)
    }

    /// Assemble from an existing chain reader and optional wallet
    pub fn from_parts(
        config: LaunchpadConfig,
        chain: Arc<dyn ChainReader>,
        wallet: Option<Arc<dyn WalletSigner>>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let timeout = config.request_timeout();

        let indexer = Arc::new(IndexerClient::new(config.endpoints.indexer_url.clone(), timeout)?);
        let metadata = MetadataClient::with_price_cache(
            config.endpoints.metadata_url.clone(),
            timeout,
            config.price_cache_ttl(),
            Arc::new(SystemClock),
        )?;
        let explorer = ExplorerClient::new(config.endpoints.explorer_url.clone(), timeout)?;

        Ok(Self {
            market: MarketService::new(chain.clone()),
            balances: BalanceRefresher::new(chain.clone()),
            pools: PoolDirectory::new(indexer.clone()),
            executor: wallet.map(|w| Arc::new(TradeExecutor::new(w))),
            chain,
            indexer,
            metadata,
            explorer,
            config,
        })
    }

    /// Swap the pool resolver, e.g. for a fixed mapping
    pub fn with_pool_lookup(mut self, lookup: Arc<dyn PoolLookup>) -> Self {
        self.pools = PoolDirectory::new(lookup);
        self
    }

    pub fn config(&self) -> &LaunchpadConfig {
        &self.config
    }

    pub fn executor(&self) -> SdkResult<Arc<TradeExecutor>> {
        self.executor
            .clone()
            .ok_or_else(|| SdkError::Config("no wallet connected".into()))
    }

    /// Open a trade panel for `token`
    pub async fn session(&self, token: Address) -> SdkResult<TradeSession> {
        let executor = self.executor()?;
        let pool = self.pools.pool_for(token).await?;
        let mut session = TradeSession::new(token, pool, self.chain.clone(), executor, self.config.session_config());
        session.refresh_balances().await;
        Ok(session)
    }

    /// Token creation through the configured manager contract
    pub fn launcher(&self) -> SdkResult<TokenLauncher> {
        Ok(TokenLauncher::new(
            self.chain.clone(),
            self.executor()?,
            self.config.contracts.bonding_curve_manager,
            self.config.watch_config(),
        ))
    }

    /// Indexed token record with one page of its trades
    pub async fn token_detail(&self, token: Address, page: u32, page_size: u32) -> SdkResult<TokenDetail> {
        let (summary, transactions) = self.indexer.token_with_transactions(token, page, page_size).await?;
        if let Some(pool) = summary.pool {
            self.pools.insert(token, pool);
        }
        Ok(TokenDetail {
            token: summary,
            transactions,
        })
    }
}
