use std::sync::Arc;

use alloy_primitives::{Address, U256};
use futures::future::join_all;
use tracing::warn;

use crate::{
    chain::ChainReader,
    core::{PoolReference, Reserves, SdkResult},
    protocol::bonding_progress_percent,
};

/// On-chain state of one pool, as shown next to the chart
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarketSnapshot {
    pub current_price: Option<U256>,
    pub reserves: Option<Reserves>,
    pub total_supply: Option<U256>,
    /// Percent of the migration target reached
    pub progress: Option<f64>,
}

/// Read-only pool data
pub struct MarketService {
    chain: Arc<dyn ChainReader>,
}

impl MarketService {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }

    pub async fn current_price(&self, pool: PoolReference) -> SdkResult<U256> {
        self.chain.current_price(pool).await
    }

    pub async fn reserves(&self, pool: PoolReference) -> SdkResult<Reserves> {
        self.chain.reserves(pool).await
    }

    pub async fn total_supply(&self, token: Address) -> SdkResult<U256> {
        self.chain.total_supply(token).await
    }

    /// Fetch price, reserves and supply together; each may be unknown
    pub async fn snapshot(&self, pool: PoolReference, token: Address) -> MarketSnapshot {
        let (price, reserves, supply) = tokio::join!(
            self.chain.current_price(pool),
            self.chain.reserves(pool),
            self.chain.total_supply(token),
        );

        let reserves = reserves
            .map_err(|e| warn!(%pool, error = %e, "Failed to read reserves"))
            .ok();
        let progress = reserves.and_then(|r| bonding_progress_percent(r.native).ok());

        MarketSnapshot {
            current_price: price.map_err(|e| warn!(%pool, error = %e, "Failed to read price")).ok(),
            reserves,
            total_supply: supply
                .map_err(|e| warn!(%token, error = %e, "Failed to read total supply"))
                .ok(),
            progress,
        }
    }

    /// Snapshots for a listing, fetched concurrently and returned in input order
    pub async fn snapshots(&self, pools: &[(PoolReference, Address)]) -> Vec<MarketSnapshot> {
        join_all(pools.iter().map(|&(pool, token)| self.snapshot(pool, token))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::constants::MIGRATION_TARGET_WEI,
        testing::{MockChain, Read},
    };

    #[tokio::test]
    async fn test_snapshot_progress_from_native_reserve() {
        let chain = Arc::new(MockChain::new());
        chain.set_reserves(Reserves {
            token: U256::from(1_000u64),
            native: U256::from(MIGRATION_TARGET_WEI / 4),
        });
        chain.set_total_supply(U256::from(1_000_000u64));
        chain.fail(Read::Price);

        let market = MarketService::new(chain.clone());
        let snapshot = market
            .snapshot(PoolReference(Address::repeat_byte(1)), Address::repeat_byte(2))
            .await;

        assert_eq!(snapshot.current_price, None);
        assert_eq!(snapshot.total_supply, Some(U256::from(1_000_000u64)));
        assert!((snapshot.progress.unwrap() - 25.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_snapshots_keep_order_and_cap_progress() {
        let chain = Arc::new(MockChain::new());
        chain.set_reserves(Reserves {
            token: U256::ZERO,
            native: U256::from(MIGRATION_TARGET_WEI * 2),
        });

        let market = MarketService::new(chain.clone());
        let items = [
            (PoolReference(Address::repeat_byte(1)), Address::repeat_byte(2)),
            (PoolReference(Address::repeat_byte(3)), Address::repeat_byte(4)),
        ];
        let snapshots = market.snapshots(&items).await;

        assert_eq!(snapshots.len(), 2);
        assert!(snapshots.iter().all(|s| s.progress == Some(100.0)));
        assert_eq!(chain.calls(Read::Reserves), 2);
    }
}
