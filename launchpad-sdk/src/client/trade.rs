use std::sync::{Arc, Mutex, MutexGuard};

use alloy_primitives::{Address, TxHash, U256};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::{
    chain::WalletSigner,
    core::{
        constants::CREATION_FEE_WEI, PendingTransaction, PoolReference, SdkError, SdkResult, TradeKind,
        TransactionRequest,
    },
    protocol::contracts,
};

/// A write the executor can present to the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeRequest {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    Buy {
        pool: PoolReference,
        eth_amount: U256,
        min_return: U256,
        deadline: U256,
    },
    Sell {
        pool: PoolReference,
        amount: U256,
        min_return: U256,
        deadline: U256,
    },
    /// Launch a token; `value` pays the creation fee and the initial purchase
    Create {
        manager: Address,
        name: String,
        symbol: String,
        value: U256,
    },
}

impl TradeRequest {
    /// Unlimited approval of `token` for the pool
    pub fn approve(token: Address, pool: PoolReference) -> Self {
        TradeRequest::Approve {
            token,
            spender: pool.address(),
            amount: U256::MAX,
        }
    }

    /// Buy with no expiry
    pub fn buy(pool: PoolReference, eth_amount: U256, min_return: U256) -> Self {
        TradeRequest::Buy {
            pool,
            eth_amount,
            min_return,
            deadline: U256::MAX,
        }
    }

    /// Sell with no expiry
    pub fn sell(pool: PoolReference, amount: U256, min_return: U256) -> Self {
        TradeRequest::Sell {
            pool,
            amount,
            min_return,
            deadline: U256::MAX,
        }
    }

    /// Launch `name`/`symbol`, buying `initial_purchase` worth of it in the same call
    pub fn create(manager: Address, name: impl Into<String>, symbol: impl Into<String>, initial_purchase: U256) -> Self {
        TradeRequest::Create {
            manager,
            name: name.into(),
            symbol: symbol.into(),
            value: U256::from(CREATION_FEE_WEI).saturating_add(initial_purchase),
        }
    }

    /// Replace the deadline with an explicit block-timestamp bound
    pub fn with_deadline(mut self, bound: U256) -> Self {
        match &mut self {
            TradeRequest::Buy { deadline, .. } | TradeRequest::Sell { deadline, .. } => *deadline = bound,
            TradeRequest::Approve { .. } | TradeRequest::Create { .. } => {}
        }
        self
    }

    pub fn kind(&self) -> TradeKind {
        match self {
            TradeRequest::Approve { .. } => TradeKind::Approve,
            TradeRequest::Buy { .. } => TradeKind::Buy,
            TradeRequest::Sell { .. } => TradeKind::Sell,
            TradeRequest::Create { .. } => TradeKind::Create,
        }
    }

    fn validate(&self) -> SdkResult<()> {
        match self {
            TradeRequest::Buy { eth_amount, .. } if eth_amount.is_zero() => {
                Err(SdkError::Validation("buy amount must be greater than zero".into()))
            }
            TradeRequest::Sell { amount, .. } if amount.is_zero() => {
                Err(SdkError::Validation("sell amount must be greater than zero".into()))
            }
            TradeRequest::Create { name, symbol, .. } if name.trim().is_empty() || symbol.trim().is_empty() => {
                Err(SdkError::Validation("token name and symbol are required".into()))
            }
            _ => Ok(()),
        }
    }

    fn into_transaction(self) -> TransactionRequest {
        match self {
            TradeRequest::Approve { token, spender, amount } => contracts::approve(token, spender, amount),
            TradeRequest::Buy {
                pool,
                eth_amount,
                min_return,
                deadline,
            } => contracts::buy_token(pool, eth_amount, min_return, deadline),
            TradeRequest::Sell {
                pool,
                amount,
                min_return,
                deadline,
            } => contracts::sell_token(pool, amount, min_return, deadline),
            TradeRequest::Create {
                manager,
                name,
                symbol,
                value,
            } => contracts::create_token(manager, &name, &symbol, value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Idle,
    /// Request is open in the wallet
    Signing(TradeKind),
    Pending(PendingTransaction),
}

/// Submits trades, one at a time.
///
/// The single-slot guard lives here rather than in any caller: while a
/// request is open in the wallet or a transaction is unresolved, further
/// submissions fail with [`SdkError::TransactionInProgress`] without
/// touching the wallet.
pub struct TradeExecutor {
    wallet: Arc<dyn WalletSigner>,
    slot: Mutex<Slot>,
}

impl TradeExecutor {
    pub fn new(wallet: Arc<dyn WalletSigner>) -> Self {
        Self {
            wallet,
            slot: Mutex::new(Slot::Idle),
        }
    }

    pub fn wallet_address(&self) -> Address {
        self.wallet.address()
    }

    /// Sign and broadcast. Returns as soon as the wallet hands back a hash.
    pub async fn submit(&self, request: TradeRequest) -> SdkResult<PendingTransaction> {
        request.validate()?;
        let kind = request.kind();

        let guard = {
            let mut slot = self.lock_slot();
            if *slot != Slot::Idle {
                warn!(%kind, "Rejecting submission, another transaction is in progress");
                return Err(SdkError::TransactionInProgress);
            }
            *slot = Slot::Signing(kind);
            SigningGuard { slot: &self.slot }
        };

        match self.wallet.send_transaction(request.into_transaction()).await {
            Ok(hash) => {
                let pending = PendingTransaction {
                    hash,
                    kind,
                    submitted_at: Utc::now(),
                };
                guard.commit(pending);
                info!(%kind, %hash, "Transaction submitted");
                Ok(pending)
            }
            Err(e) => {
                drop(guard);
                if e == SdkError::UserRejected {
                    info!(%kind, "Transaction rejected in wallet");
                } else {
                    warn!(%kind, error = %e, "Transaction failed to initiate");
                }
                Err(e)
            }
        }
    }

    /// The unresolved transaction, if any
    pub fn pending(&self) -> Option<PendingTransaction> {
        match *self.lock_slot() {
            Slot::Pending(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        *self.lock_slot() != Slot::Idle
    }

    /// Free the slot once the watcher for `hash` reached a terminal state.
    /// Returns false if `hash` is not the pending transaction.
    pub fn release(&self, hash: TxHash) -> bool {
        let mut slot = self.lock_slot();
        match *slot {
            Slot::Pending(pending) if pending.hash == hash => {
                *slot = Slot::Idle;
                true
            }
            _ => false,
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        lock(&self.slot)
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Holds the slot in `Signing` while the wallet prompt is open. Dropping it
/// without a hash, including when the submit future itself is dropped,
/// frees the slot.
struct SigningGuard<'a> {
    slot: &'a Mutex<Slot>,
}

impl SigningGuard<'_> {
    fn commit(self, pending: PendingTransaction) {
        *lock(self.slot) = Slot::Pending(pending);
        std::mem::forget(self);
    }
}

impl Drop for SigningGuard<'_> {
    fn drop(&mut self) {
        let mut slot = lock(self.slot);
        if matches!(*slot, Slot::Signing(_)) {
            debug!("Wallet request abandoned, freeing the executor");
            *slot = Slot::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWallet;
    use std::time::Duration;

    fn pool() -> PoolReference {
        PoolReference(Address::repeat_byte(0x01))
    }

    fn executor() -> (Arc<MockWallet>, TradeExecutor) {
        let wallet = Arc::new(MockWallet::new(Address::repeat_byte(0x02)));
        let executor = TradeExecutor::new(wallet.clone());
        (wallet, executor)
    }

    #[tokio::test]
    async fn test_submit_returns_pending_without_waiting() {
        let (wallet, executor) = executor();

        let pending = executor
            .submit(TradeRequest::buy(pool(), U256::from(10u64), U256::from(9u64)))
            .await
            .unwrap();

        assert_eq!(pending.kind, TradeKind::Buy);
        assert_eq!(pending.hash, MockWallet::hash_for(1));
        assert_eq!(executor.pending(), Some(pending));
        assert_eq!(wallet.sent()[0].value, U256::from(10u64));
    }

    #[tokio::test]
    async fn test_second_submit_rejected_without_wallet_call() {
        let (wallet, executor) = executor();

        let first = executor
            .submit(TradeRequest::sell(pool(), U256::from(10u64), U256::ZERO))
            .await
            .unwrap();
        let second = executor
            .submit(TradeRequest::buy(pool(), U256::from(1u64), U256::ZERO))
            .await;

        assert_eq!(second, Err(SdkError::TransactionInProgress));
        assert_eq!(wallet.calls(), 1);

        assert!(executor.release(first.hash));
        assert!(!executor.is_busy());
        executor
            .submit(TradeRequest::buy(pool(), U256::from(1u64), U256::ZERO))
            .await
            .unwrap();
        assert_eq!(wallet.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_rejected_while_wallet_prompt_open() {
        let (wallet, executor) = executor();
        wallet.set_sign_delay(Duration::from_secs(5));
        let executor = Arc::new(executor);

        let first = {
            let executor = executor.clone();
            tokio::spawn(async move {
                executor
                    .submit(TradeRequest::buy(pool(), U256::from(1u64), U256::ZERO))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;

        let second = executor
            .submit(TradeRequest::buy(pool(), U256::from(2u64), U256::ZERO))
            .await;
        assert_eq!(second, Err(SdkError::TransactionInProgress));

        assert!(first.await.unwrap().is_ok());
        assert_eq!(wallet.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_wallet_prompt_frees_slot() {
        let (wallet, executor) = executor();
        wallet.set_sign_delay(Duration::from_secs(5));

        let abandoned = tokio::time::timeout(
            Duration::from_secs(1),
            executor.submit(TradeRequest::buy(pool(), U256::from(1u64), U256::ZERO)),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!executor.is_busy());

        wallet.set_sign_delay(Duration::ZERO);
        let pending = executor
            .submit(TradeRequest::buy(pool(), U256::from(2u64), U256::ZERO))
            .await
            .unwrap();
        assert_eq!(executor.pending(), Some(pending));
        assert_eq!(wallet.calls(), 2);
    }

    #[tokio::test]
    async fn test_user_rejection_clears_slot() {
        let (wallet, executor) = executor();
        wallet.reject_next();

        let result = executor
            .submit(TradeRequest::buy(pool(), U256::from(10u64), U256::ZERO))
            .await;

        assert_eq!(result, Err(SdkError::UserRejected));
        assert!(!executor.is_busy());
        assert_eq!(executor.pending(), None);
    }

    #[tokio::test]
    async fn test_zero_amount_is_validation_error() {
        let (wallet, executor) = executor();

        let result = executor
            .submit(TradeRequest::sell(pool(), U256::ZERO, U256::ZERO))
            .await;

        assert!(matches!(result, Err(SdkError::Validation(_))));
        assert_eq!(wallet.calls(), 0);
        assert!(!executor.is_busy());
    }

    #[test]
    fn test_deadline_defaults_to_no_expiry() {
        let buy = TradeRequest::buy(pool(), U256::from(1u64), U256::ZERO);
        assert!(matches!(buy, TradeRequest::Buy { deadline, .. } if deadline == U256::MAX));

        let bounded = buy.with_deadline(U256::from(1_700_000_000u64));
        assert!(matches!(bounded, TradeRequest::Buy { deadline, .. } if deadline == U256::from(1_700_000_000u64)));

        let approval = TradeRequest::approve(Address::repeat_byte(0x03), pool());
        assert!(matches!(approval, TradeRequest::Approve { amount, spender, .. }
            if amount == U256::MAX && spender == pool().address()));
    }

    #[tokio::test]
    async fn test_create_adds_fee_and_needs_a_name() {
        let (wallet, executor) = executor();
        let manager = Address::repeat_byte(0x04);

        let blank = executor
            .submit(TradeRequest::create(manager, " ", "CAT", U256::ZERO))
            .await;
        assert!(matches!(blank, Err(SdkError::Validation(_))));
        assert_eq!(wallet.calls(), 0);

        let pending = executor
            .submit(TradeRequest::create(manager, "Cat", "CAT", U256::from(5u64)))
            .await
            .unwrap();
        assert_eq!(pending.kind, TradeKind::Create);
        assert_eq!(wallet.sent()[0].to, manager);
        assert_eq!(wallet.sent()[0].value, U256::from(CREATION_FEE_WEI + 5));
    }
}
