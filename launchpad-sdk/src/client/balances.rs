use std::sync::Arc;

use alloy_primitives::{Address, U256};
use tracing::{debug, warn};

use crate::{
    chain::ChainReader,
    core::{Balances, SdkResult},
};

/// Re-reads wallet balances and the pool allowance
pub struct BalanceRefresher {
    chain: Arc<dyn ChainReader>,
}

impl BalanceRefresher {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }

    /// Read the three values concurrently. A failed read leaves its field
    /// `None` without affecting the others.
    pub async fn refresh(&self, user: Address, token: Address, spender: Address) -> Balances {
        let (eth, tokens, allowance) = tokio::join!(
            self.chain.eth_balance(user),
            self.chain.token_balance(token, user),
            self.chain.allowance(token, user, spender),
        );

        let balances = Balances {
            eth_balance: known("eth balance", eth),
            token_balance: known("token balance", tokens),
            allowance: known("allowance", allowance),
        };
        debug!(%user, %token, ?balances, "Balances refreshed");
        balances
    }
}

fn known(what: &str, read: SdkResult<U256>) -> Option<U256> {
    match read {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Failed to refresh {}", what);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, Read};
    use std::time::Duration;

    #[tokio::test]
    async fn test_refresh_reads_all_three() {
        let chain = Arc::new(MockChain::new());
        chain.set_balances(U256::from(1u64), U256::from(2u64), U256::from(3u64));
        let refresher = BalanceRefresher::new(chain.clone());

        let balances = refresher
            .refresh(Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3))
            .await;

        assert_eq!(
            balances,
            Balances {
                eth_balance: Some(U256::from(1u64)),
                token_balance: Some(U256::from(2u64)),
                allowance: Some(U256::from(3u64)),
            }
        );
    }

    #[tokio::test]
    async fn test_failed_read_does_not_block_others() {
        let chain = Arc::new(MockChain::new());
        chain.set_balances(U256::from(1u64), U256::from(2u64), U256::from(3u64));
        chain.fail(Read::TokenBalance);
        let refresher = BalanceRefresher::new(chain.clone());

        let balances = refresher
            .refresh(Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3))
            .await;

        assert_eq!(balances.eth_balance, Some(U256::from(1u64)));
        assert_eq!(balances.token_balance, None);
        assert_eq!(balances.allowance, Some(U256::from(3u64)));
        assert_eq!(chain.calls(Read::TokenBalance), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_run_concurrently() {
        let chain = Arc::new(MockChain::new());
        for read in [Read::EthBalance, Read::TokenBalance, Read::Allowance] {
            chain.delay_read(read, Duration::from_secs(1));
        }
        let refresher = BalanceRefresher::new(chain.clone());

        let started = tokio::time::Instant::now();
        let balances = refresher
            .refresh(Address::repeat_byte(1), Address::repeat_byte(2), Address::repeat_byte(3))
            .await;

        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(balances.allowance, Some(U256::ZERO));
    }
}
