//! Trade panel state for one token
//!
//! A [`TradeSession`] ties the quote resolver, executor, watcher and
//! balance refresher together: it owns the user's [`TradeIntent`], keeps
//! the quote honest for that intent, decides whether the next click is a
//! buy, an approval or a sell, and turns watcher outcomes into notices.

use std::{fmt, sync::Arc, time::Duration};

use alloy_primitives::{Address, TxHash, U256};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{
    balances::BalanceRefresher,
    quote::{QuoteOutcome, QuoteResolver},
    trade::{TradeExecutor, TradeRequest},
    watcher::{ConfirmationWatcher, WatchConfig, WatchState},
};
use crate::{
    chain::ChainReader,
    core::{
        constants::DEFAULT_SLIPPAGE_BPS, AllowanceState, Balances, PendingTransaction, PoolReference, Quote,
        QuoteKey, SdkError, SdkResult, TradeDirection, TradeIntent, TradeKind,
    },
    protocol::{min_return, parse_slippage_percent},
};

/// What the panel shows in the output field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    Empty,
    /// A read is in flight; `previous` is the last answer, marked stale
    Loading { previous: Option<Quote> },
    Ready(Quote),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Buy,
    Approve,
    Sell,
}

impl From<NextAction> for TradeKind {
    fn from(action: NextAction) -> Self {
        match action {
            NextAction::Buy => TradeKind::Buy,
            NextAction::Approve => TradeKind::Approve,
            NextAction::Sell => TradeKind::Sell,
        }
    }
}

/// User-facing outcome of a trade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeNotice {
    Succeeded { kind: TradeKind, hash: TxHash },
    Failed { kind: TradeKind, hash: TxHash },
    /// Watcher gave up; the transaction may still land
    Unknown { kind: TradeKind, hash: TxHash },
    NotInitiated(String),
}

impl TradeNotice {
    /// Notice for a submission that never produced a hash. A declined
    /// wallet prompt is not reported.
    pub fn from_submit_error(error: &SdkError) -> Option<Self> {
        match error {
            SdkError::UserRejected => None,
            other => Some(TradeNotice::NotInitiated(other.to_string())),
        }
    }

    /// Failures only. An unknown outcome is a warning; the trade may still land.
    pub fn is_error(&self) -> bool {
        matches!(self, TradeNotice::Failed { .. } | TradeNotice::NotInitiated(_))
    }
}

impl fmt::Display for TradeNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeNotice::Succeeded { kind, .. } => match kind {
                TradeKind::Approve => f.write_str("Token approval successful"),
                TradeKind::Buy => f.write_str("Tokens bought successfully"),
                TradeKind::Sell => f.write_str("Tokens sold successfully"),
                TradeKind::Create => f.write_str("Token created successfully"),
            },
            TradeNotice::Failed { .. } => f.write_str("Transaction failed"),
            TradeNotice::Unknown { hash, .. } => {
                write!(f, "Transaction {} status unknown, check the explorer", hash)
            }
            TradeNotice::NotInitiated(reason) => write!(f, "Transaction failed to initiate: {}", reason),
        }
    }
}

/// Tunables for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub watch: WatchConfig,
    pub slippage_bps: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: crate::core::constants::QUOTE_DEBOUNCE,
            watch: WatchConfig::default(),
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

pub struct TradeSession {
    token: Address,
    pool: PoolReference,
    intent: TradeIntent,
    quote: QuoteState,
    allowance: AllowanceState,
    balances: Balances,
    chain: Arc<dyn ChainReader>,
    resolver: Arc<QuoteResolver>,
    executor: Arc<TradeExecutor>,
    refresher: BalanceRefresher,
    watch: WatchConfig,
}

impl TradeSession {
    pub fn new(
        token: Address,
        pool: PoolReference,
        chain: Arc<dyn ChainReader>,
        executor: Arc<TradeExecutor>,
        config: SessionConfig,
    ) -> Self {
        Self {
            token,
            pool,
            intent: TradeIntent::new(TradeDirection::Buy, "", config.slippage_bps),
            quote: QuoteState::Empty,
            allowance: AllowanceState::default(),
            balances: Balances::default(),
            resolver: Arc::new(QuoteResolver::new(chain.clone(), config.debounce)),
            refresher: BalanceRefresher::new(chain.clone()),
            chain,
            executor,
            watch: config.watch,
        }
    }

    pub fn token(&self) -> Address {
        self.token
    }

    pub fn pool(&self) -> PoolReference {
        self.pool
    }

    pub fn user(&self) -> Address {
        self.executor.wallet_address()
    }

    pub fn intent(&self) -> &TradeIntent {
        &self.intent
    }

    pub fn quote_state(&self) -> QuoteState {
        self.quote
    }

    pub fn allowance(&self) -> AllowanceState {
        self.allowance
    }

    pub fn balances(&self) -> Balances {
        self.balances
    }

    /// Shared handle for driving quotes from a background task
    pub fn resolver(&self) -> Arc<QuoteResolver> {
        self.resolver.clone()
    }

    pub fn set_amount(&mut self, input: impl Into<String>) {
        self.intent.input_amount = input.into();
        self.invalidate_quote();
    }

    /// Swap buy and sell. The typed amount is kept.
    pub fn flip_direction(&mut self) {
        self.intent.direction = self.intent.direction.flipped();
        self.invalidate_quote();
    }

    /// Set slippage from a percent string; returns the applied bps
    pub fn set_slippage(&mut self, percent: &str) -> u16 {
        self.intent.slippage_bps = parse_slippage_percent(percent);
        self.invalidate_quote();
        self.intent.slippage_bps
    }

    fn invalidate_quote(&mut self) {
        self.resolver.cancel();
        self.quote = QuoteState::Empty;
    }

    /// Mark the current quote stale ahead of a new read. Returns the key to
    /// resolve, or `None` when there is nothing to quote.
    pub fn begin_quote(&mut self) -> SdkResult<Option<QuoteKey>> {
        let key = self.intent.key()?;
        if key.amount.is_zero() {
            self.quote = QuoteState::Empty;
            return Ok(None);
        }

        let previous = match self.quote {
            QuoteState::Ready(quote) => Some(Quote { is_stale: true, ..quote }),
            QuoteState::Loading { previous } => previous,
            _ => None,
        };
        self.quote = QuoteState::Loading { previous };
        Ok(Some(key))
    }

    /// Apply a resolver answer if it still matches the intent
    pub fn apply_quote(&mut self, key: QuoteKey, outcome: QuoteOutcome) {
        if self.intent.key().ok() != Some(key) {
            debug!(?key, "Dropping quote for an outdated intent");
            return;
        }
        self.quote = match outcome {
            QuoteOutcome::Ready(quote) => QuoteState::Ready(quote),
            QuoteOutcome::Unavailable(_) => QuoteState::Unavailable,
            QuoteOutcome::Empty => QuoteState::Empty,
            QuoteOutcome::Superseded => return,
        };
    }

    /// Debounced quote for the current intent
    pub async fn refresh_quote(&mut self) -> SdkResult<QuoteState> {
        if let Some(key) = self.begin_quote()? {
            let outcome = self.resolver.resolve(self.pool, key).await;
            self.apply_quote(key, outcome);
        }
        Ok(self.quote)
    }

    /// The quote, only if it is fresh and was computed for the current intent
    pub fn current_quote(&self) -> Option<Quote> {
        let key = self.intent.key().ok()?;
        match self.quote {
            QuoteState::Ready(quote) if quote.is_valid_for(&key) => Some(quote),
            _ => None,
        }
    }

    /// Output estimate to display; `None` renders as unavailable or loading
    pub fn displayed_estimate(&self) -> Option<U256> {
        self.current_quote().map(|q| q.estimated_output)
    }

    pub fn next_action(&self) -> SdkResult<NextAction> {
        match self.intent.direction {
            TradeDirection::Buy => Ok(NextAction::Buy),
            TradeDirection::Sell => {
                let amount = self.intent.parsed_amount()?;
                if self.allowance.covers(amount) {
                    Ok(NextAction::Sell)
                } else {
                    Ok(NextAction::Approve)
                }
            }
        }
    }

    /// Submit whatever the panel's button currently stands for
    pub async fn execute(&mut self) -> SdkResult<PendingTransaction> {
        let action = self.next_action()?;
        let request = match action {
            NextAction::Approve => TradeRequest::approve(self.token, self.pool),
            NextAction::Buy | NextAction::Sell => {
                let amount = self.intent.parsed_amount()?;
                if amount.is_zero() {
                    return Err(SdkError::Validation("enter an amount".into()));
                }
                let quote = self
                    .current_quote()
                    .ok_or_else(|| SdkError::Validation("no fresh quote for this amount".into()))?;
                let min_out = min_return(quote.estimated_output, self.intent.slippage_bps);
                if action == NextAction::Buy {
                    TradeRequest::buy(self.pool, amount, min_out)
                } else {
                    TradeRequest::sell(self.pool, amount, min_out)
                }
            }
        };

        let pending = self.executor.submit(request).await?;
        if action != NextAction::Approve {
            self.intent.input_amount.clear();
            self.invalidate_quote();
        }
        Ok(pending)
    }

    /// Follow `pending` on its own task. The task frees the executor slot
    /// when it finishes, even if this session is gone by then.
    pub fn spawn_watch(&self, pending: PendingTransaction) -> JoinHandle<WatchState> {
        let watcher = ConfirmationWatcher::new(self.chain.clone(), pending, self.watch);
        let executor = self.executor.clone();
        tokio::spawn(async move {
            let state = watcher.run().await;
            executor.release(pending.hash);
            state
        })
    }

    /// Wait for `pending` and settle its outcome
    pub async fn watch_and_settle(&mut self, pending: PendingTransaction) -> Option<TradeNotice> {
        let state = match self.spawn_watch(pending).await {
            Ok(state) => state,
            Err(e) => {
                debug!(error = %e, "Watcher task ended abnormally");
                WatchState::Cancelled
            }
        };
        self.settle(pending, state).await
    }

    /// Act on a terminal watcher state. Confirmed and reverted transactions
    /// trigger exactly one balance refresh.
    pub async fn settle(&mut self, pending: PendingTransaction, state: WatchState) -> Option<TradeNotice> {
        self.executor.release(pending.hash);
        let (kind, hash) = (pending.kind, pending.hash);

        let notice = match state {
            WatchState::Confirmed(_) => {
                self.refresh_balances().await;
                Some(TradeNotice::Succeeded { kind, hash })
            }
            WatchState::Reverted(_) => {
                self.refresh_balances().await;
                Some(TradeNotice::Failed { kind, hash })
            }
            WatchState::TimedOut { .. } => Some(TradeNotice::Unknown { kind, hash }),
            WatchState::Cancelled | WatchState::Submitted { .. } => None,
        };
        if let Some(notice) = &notice {
            info!(%kind, %hash, %notice, "Trade settled");
        }
        notice
    }

    /// Re-read balances and allowance; unknown values keep their last state
    pub async fn refresh_balances(&mut self) -> Balances {
        let balances = self
            .refresher
            .refresh(self.user(), self.token, self.pool.address())
            .await;
        if let Some(amount) = balances.allowance {
            self.allowance = AllowanceState { amount };
        }
        self.balances = balances;
        balances
    }
}

impl Drop for TradeSession {
    fn drop(&mut self) {
        self.resolver.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockChain, MockWallet, Read};
    use alloy_primitives::utils::parse_ether;

    fn session() -> (Arc<MockChain>, Arc<MockWallet>, TradeSession) {
        let chain = Arc::new(MockChain::new());
        let wallet = Arc::new(MockWallet::new(Address::repeat_byte(0x0a)));
        let executor = Arc::new(TradeExecutor::new(wallet.clone()));
        let session = TradeSession::new(
            Address::repeat_byte(0x0b),
            PoolReference(Address::repeat_byte(0x0c)),
            chain.clone(),
            executor,
            SessionConfig {
                debounce: Duration::ZERO,
                ..SessionConfig::default()
            },
        );
        (chain, wallet, session)
    }

    #[tokio::test]
    async fn test_intent_change_invalidates_quote() {
        let (_chain, _wallet, mut session) = session();
        session.set_amount("1");
        session.refresh_quote().await.unwrap();
        assert_eq!(session.displayed_estimate(), Some(parse_ether("1000").unwrap()));

        session.flip_direction();
        assert_eq!(session.quote_state(), QuoteState::Empty);
        assert_eq!(session.displayed_estimate(), None);
    }

    #[tokio::test]
    async fn test_stale_quote_kept_while_loading() {
        let (_chain, _wallet, mut session) = session();
        session.set_amount("1");
        session.refresh_quote().await.unwrap();

        let key = session.begin_quote().unwrap().unwrap();
        match session.quote_state() {
            QuoteState::Loading { previous: Some(previous) } => assert!(previous.is_stale),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(session.displayed_estimate(), None);

        session.apply_quote(key, QuoteOutcome::Unavailable(SdkError::Network("down".into())));
        assert_eq!(session.quote_state(), QuoteState::Unavailable);
    }

    #[tokio::test]
    async fn test_outdated_answer_is_dropped() {
        let (_chain, _wallet, mut session) = session();
        session.set_amount("1");
        let old_key = session.begin_quote().unwrap().unwrap();
        session.set_amount("2");

        session.apply_quote(old_key, QuoteOutcome::Ready(Quote::new(old_key, U256::from(5u64))));
        assert_eq!(session.quote_state(), QuoteState::Empty);
    }

    #[tokio::test]
    async fn test_sell_requires_allowance() {
        let (chain, _wallet, mut session) = session();
        session.flip_direction();
        session.set_amount("5");
        assert_eq!(session.next_action().unwrap(), NextAction::Approve);

        chain.set_allowance(parse_ether("5").unwrap());
        session.refresh_balances().await;
        assert_eq!(session.next_action().unwrap(), NextAction::Sell);

        session.set_amount("6");
        assert_eq!(session.next_action().unwrap(), NextAction::Approve);
    }

    #[tokio::test]
    async fn test_execute_without_quote_is_rejected() {
        let (_chain, wallet, mut session) = session();
        session.set_amount("1");

        assert!(matches!(session.execute().await, Err(SdkError::Validation(_))));
        assert_eq!(wallet.calls(), 0);
    }

    #[tokio::test]
    async fn test_approval_keeps_amount() {
        let (_chain, wallet, mut session) = session();
        session.flip_direction();
        session.set_amount("3");

        let pending = session.execute().await.unwrap();
        assert_eq!(pending.kind, TradeKind::Approve);
        assert_eq!(session.intent().input_amount, "3");
        assert_eq!(wallet.sent()[0].to, Address::repeat_byte(0x0b));
    }

    #[tokio::test]
    async fn test_reverted_refreshes_once_and_reports_failure() {
        let (chain, _wallet, mut session) = session();
        session.set_amount("1");
        session.refresh_quote().await.unwrap();
        let pending = session.execute().await.unwrap();
        chain.mine(pending.hash, 3, false);

        let notice = session.watch_and_settle(pending).await;

        assert_eq!(
            notice,
            Some(TradeNotice::Failed {
                kind: TradeKind::Buy,
                hash: pending.hash
            })
        );
        assert_eq!(chain.calls(Read::EthBalance), 1);
    }

    #[test]
    fn test_notice_messages() {
        let hash = TxHash::with_last_byte(1);
        assert_eq!(
            TradeNotice::Succeeded {
                kind: TradeKind::Buy,
                hash
            }
            .to_string(),
            "Tokens bought successfully"
        );
        assert_eq!(TradeNotice::from_submit_error(&SdkError::UserRejected), None);
        assert!(TradeNotice::from_submit_error(&SdkError::TransactionInProgress).is_some());
    }

    #[test]
    fn test_unknown_outcome_is_not_an_error() {
        let hash = TxHash::with_last_byte(2);
        let unknown = TradeNotice::Unknown {
            kind: TradeKind::Sell,
            hash,
        };
        assert!(!unknown.is_error());
        assert!(unknown.to_string().contains("check the explorer"));

        assert!(TradeNotice::Failed {
            kind: TradeKind::Sell,
            hash
        }
        .is_error());
        assert!(TradeNotice::NotInitiated("insufficient funds".into()).is_error());
        assert!(!TradeNotice::Succeeded {
            kind: TradeKind::Create,
            hash
        }
        .is_error());
    }
}
