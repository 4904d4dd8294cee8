use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::U256;
use tracing::{debug, warn};

use crate::{
    chain::ChainReader,
    core::{PoolReference, Quote, QuoteKey, SdkError, SdkResult, TradeDirection},
};

/// Result of a debounced quote request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOutcome {
    /// Zero amount, nothing to quote
    Empty,
    Ready(Quote),
    /// A newer request was issued or the resolver was cancelled
    Superseded,
    /// The read failed; show "unavailable" instead of a number
    Unavailable(SdkError),
}

/// Estimates trade output from the pool contract.
///
/// Requests are debounced and last-request-wins: every call to
/// [`resolve`](Self::resolve) takes a ticket, and only the holder of the
/// newest ticket gets a usable answer.
pub struct QuoteResolver {
    chain: Arc<dyn ChainReader>,
    debounce: Duration,
    generation: AtomicU64,
}

impl QuoteResolver {
    pub fn new(chain: Arc<dyn ChainReader>, debounce: Duration) -> Self {
        Self {
            chain,
            debounce,
            generation: AtomicU64::new(0),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Undebounced contract read. Zero input never reaches the node.
    pub async fn get_quote(&self, pool: PoolReference, direction: TradeDirection, amount: U256) -> SdkResult<U256> {
        if amount.is_zero() {
            return Ok(U256::ZERO);
        }
        match direction {
            TradeDirection::Buy => self.chain.buy_return(pool, amount).await,
            TradeDirection::Sell => self.chain.sell_return(pool, amount).await,
        }
    }

    /// Debounced, last-request-wins quote for `key`
    pub async fn resolve(&self, pool: PoolReference, key: QuoteKey) -> QuoteOutcome {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        if key.amount.is_zero() {
            return QuoteOutcome::Empty;
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(ticket) {
            debug!(ticket, "Quote request superseded during debounce");
            return QuoteOutcome::Superseded;
        }

        let result = self.get_quote(pool, key.direction, key.amount).await;
        if !self.is_current(ticket) {
            debug!(ticket, "Discarding quote for superseded request");
            return QuoteOutcome::Superseded;
        }

        match result {
            Ok(estimated) => QuoteOutcome::Ready(Quote::new(key, estimated)),
            Err(e) => {
                warn!(%pool, error = %e, "Quote unavailable");
                QuoteOutcome::Unavailable(e)
            }
        }
    }

    /// Drop pending debounce timers and in-flight answers
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, Read};
    use alloy_primitives::Address;

    fn pool() -> PoolReference {
        PoolReference(Address::repeat_byte(0xaa))
    }

    fn key(amount: u64) -> QuoteKey {
        QuoteKey {
            direction: TradeDirection::Buy,
            amount: U256::from(amount),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_amount_short_circuits() {
        let chain = Arc::new(MockChain::new());
        let resolver = QuoteResolver::new(chain.clone(), Duration::from_millis(300));

        assert_eq!(resolver.resolve(pool(), key(0)).await, QuoteOutcome::Empty);
        assert_eq!(
            resolver.get_quote(pool(), TradeDirection::Sell, U256::ZERO).await.unwrap(),
            U256::ZERO
        );
        assert_eq!(chain.calls(Read::BuyReturn), 0);
        assert_eq!(chain.calls(Read::SellReturn), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direction_selects_contract_read() {
        let chain = Arc::new(MockChain::new());
        chain.set_buy_rate(3, 1);
        chain.set_sell_rate(1, 2);
        let resolver = QuoteResolver::new(chain.clone(), Duration::from_millis(300));

        let buy = resolver.get_quote(pool(), TradeDirection::Buy, U256::from(10u64)).await.unwrap();
        let sell = resolver.get_quote(pool(), TradeDirection::Sell, U256::from(10u64)).await.unwrap();

        assert_eq!(buy, U256::from(30u64));
        assert_eq!(sell, U256::from(5u64));
        assert_eq!(chain.calls(Read::BuyReturn), 1);
        assert_eq!(chain.calls(Read::SellReturn), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_only_reads_last_amount() {
        let chain = Arc::new(MockChain::new());
        let resolver = Arc::new(QuoteResolver::new(chain.clone(), Duration::from_millis(300)));

        let mut handles = Vec::new();
        for amount in [1u64, 12, 123] {
            let resolver = resolver.clone();
            handles.push(tokio::spawn(async move { resolver.resolve(pool(), key(amount)).await }));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert_eq!(outcomes[0], QuoteOutcome::Superseded);
        assert_eq!(outcomes[1], QuoteOutcome::Superseded);
        assert!(matches!(outcomes[2], QuoteOutcome::Ready(q) if q.key == key(123)));
        assert_eq!(chain.calls(Read::BuyReturn), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_failure_is_unavailable() {
        let chain = Arc::new(MockChain::new());
        chain.fail(Read::BuyReturn);
        let resolver = QuoteResolver::new(chain.clone(), Duration::from_millis(300));

        let outcome = resolver.resolve(pool(), key(5)).await;
        assert!(matches!(outcome, QuoteOutcome::Unavailable(SdkError::Network(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_pending_request() {
        let chain = Arc::new(MockChain::new());
        let resolver = Arc::new(QuoteResolver::new(chain.clone(), Duration::from_millis(300)));

        let handle = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(pool(), key(7)).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        resolver.cancel();

        assert_eq!(handle.await.unwrap(), QuoteOutcome::Superseded);
        assert_eq!(chain.calls(Read::BuyReturn), 0);
    }
}
