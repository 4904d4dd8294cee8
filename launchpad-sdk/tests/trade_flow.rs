//! End-to-end trade flow against the in-memory chain and wallet

use std::{sync::Arc, time::Duration};

use alloy_primitives::{utils::parse_ether, Address, U256};
use alloy_sol_types::SolCall;
use launchpad_sdk::{
    client::{SessionConfig, TradeExecutor},
    core::constants::RECEIPT_POLL_INTERVAL,
    prelude::*,
    protocol::{contracts::ILiquidityPool, min_return, slippage_bps_to_percent},
    testing::{MockChain, MockWallet, Read},
};

const TOKEN: Address = Address::repeat_byte(0x0b);
const POOL: Address = Address::repeat_byte(0x0c);

struct Harness {
    chain: Arc<MockChain>,
    wallet: Arc<MockWallet>,
    executor: Arc<TradeExecutor>,
    session: TradeSession,
}

fn harness() -> Harness {
    let chain = Arc::new(MockChain::new());
    let wallet = Arc::new(MockWallet::new(Address::repeat_byte(0x0a)));
    let executor = Arc::new(TradeExecutor::new(wallet.clone()));
    let session = TradeSession::new(
        TOKEN,
        PoolReference(POOL),
        chain.clone(),
        executor.clone(),
        SessionConfig::default(),
    );
    Harness {
        chain,
        wallet,
        executor,
        session,
    }
}

fn ether(value: &str) -> U256 {
    parse_ether(value).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_buy_ten_with_half_percent_slippage() {
    let Harness {
        wallet, mut session, ..
    } = harness();

    session.set_amount("10");
    assert_eq!(session.set_slippage("0.5"), 50);

    let quoted = match session.refresh_quote().await.unwrap() {
        QuoteState::Ready(quote) => quote.estimated_output,
        other => panic!("expected a quote, got {:?}", other),
    };
    assert_eq!(quoted, ether("10000"));

    let pending = session.execute().await.unwrap();
    assert_eq!(pending.kind, TradeKind::Buy);

    let sent = wallet.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, POOL);
    assert_eq!(sent[0].value, ether("10"));

    let call = ILiquidityPool::buyTokenCall::abi_decode(&sent[0].data, true).unwrap();
    assert_eq!(call.minReturn, quoted * U256::from(9950u64) / U256::from(10_000u64));
    assert_eq!(call.minReturn, ether("9950"));
    assert_eq!(call.deadline, U256::MAX);
}

#[tokio::test(start_paused = true)]
async fn test_slippage_above_cap_is_clamped_before_use() {
    let Harness {
        wallet, mut session, ..
    } = harness();

    let bps = session.set_slippage("30");
    assert_eq!(slippage_bps_to_percent(bps), "25");

    session.set_amount("2");
    session.refresh_quote().await.unwrap();
    session.execute().await.unwrap();

    let call = ILiquidityPool::buyTokenCall::abi_decode(&wallet.sent()[0].data, true).unwrap();
    assert_eq!(call.minReturn, ether("1500"));
    assert_eq!(call.minReturn, min_return(ether("2000"), 2_500));
}

#[tokio::test(start_paused = true)]
async fn test_late_answer_for_earlier_amount_is_discarded() {
    let Harness { chain, mut session, .. } = harness();
    chain.delay_quote(ether("1"), Duration::from_secs(2));
    let resolver = session.resolver();

    session.set_amount("1");
    let first_key = session.begin_quote().unwrap().unwrap();
    let first = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve(PoolReference(POOL), first_key).await })
    };

    // First read is in flight once the debounce window has passed
    tokio::time::sleep(Duration::from_millis(500)).await;

    session.set_amount("2");
    let second_key = session.begin_quote().unwrap().unwrap();
    let second = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve(PoolReference(POOL), second_key).await })
    };

    let second_outcome = second.await.unwrap();
    let first_outcome = first.await.unwrap();
    session.apply_quote(second_key, second_outcome);
    session.apply_quote(first_key, first_outcome.clone());

    assert_eq!(first_outcome, QuoteOutcome::Superseded);
    assert_eq!(session.displayed_estimate(), Some(ether("2000")));
    assert_eq!(chain.calls(Read::BuyReturn), 2);
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_pending_never_reaches_wallet() {
    let Harness {
        wallet,
        executor,
        mut session,
        ..
    } = harness();

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    let pending = session.execute().await.unwrap();
    assert_eq!(executor.pending(), Some(pending));

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    assert_eq!(session.execute().await, Err(SdkError::TransactionInProgress));
    assert_eq!(wallet.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_confirmed_trade_refreshes_balances_exactly_once() {
    let Harness {
        chain,
        executor,
        mut session,
        ..
    } = harness();

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    let pending = session.execute().await.unwrap();

    chain.set_balances(ether("4"), ether("1000"), U256::ZERO);
    chain.mine(pending.hash, 10, true);
    chain.set_block_number(11);

    let notice = session.watch_and_settle(pending).await;

    assert_eq!(
        notice,
        Some(TradeNotice::Succeeded {
            kind: TradeKind::Buy,
            hash: pending.hash
        })
    );
    assert_eq!(notice.unwrap().to_string(), "Tokens bought successfully");
    assert_eq!(chain.calls(Read::EthBalance), 1);
    assert_eq!(chain.calls(Read::TokenBalance), 1);
    assert_eq!(chain.calls(Read::Allowance), 1);
    assert_eq!(session.balances().token_balance, Some(ether("1000")));
    assert!(!executor.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_missing_receipt_times_out_instead_of_reverting() {
    let Harness {
        chain,
        executor,
        mut session,
        ..
    } = harness();

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    let pending = session.execute().await.unwrap();

    let started = tokio::time::Instant::now();
    let notice = session.watch_and_settle(pending).await;

    assert_eq!(
        notice,
        Some(TradeNotice::Unknown {
            kind: TradeKind::Buy,
            hash: pending.hash
        })
    );
    assert_eq!(chain.calls(Read::Receipt), 30);
    assert_eq!(started.elapsed(), RECEIPT_POLL_INTERVAL * 29);
    assert_eq!(chain.calls(Read::EthBalance), 0);
    assert!(!executor.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_user_rejection_is_silent_and_clears_pending() {
    let Harness {
        wallet,
        executor,
        mut session,
        ..
    } = harness();

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    wallet.reject_next();

    let error = session.execute().await.unwrap_err();
    assert_eq!(error, SdkError::UserRejected);
    assert_eq!(TradeNotice::from_submit_error(&error), None);
    assert_eq!(executor.pending(), None);
    assert!(!executor.is_busy());

    // The intent survives a declined prompt, so the user can retry
    assert_eq!(session.intent().input_amount, "1");
    assert!(session.execute().await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_watch_outlives_the_session() {
    let Harness {
        chain,
        executor,
        mut session,
        ..
    } = harness();

    session.set_amount("1");
    session.refresh_quote().await.unwrap();
    let pending = session.execute().await.unwrap();
    chain.reveal_after(pending.hash, 2);
    chain.mine(pending.hash, 5, true);
    chain.set_block_number(6);

    let handle = session.spawn_watch(pending);
    drop(session);

    assert!(matches!(handle.await.unwrap(), WatchState::Confirmed(_)));
    assert!(!executor.is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_approve_then_sell() {
    let Harness {
        chain,
        wallet,
        mut session,
        ..
    } = harness();

    session.flip_direction();
    session.set_amount("100");
    assert_eq!(session.next_action().unwrap(), NextAction::Approve);

    let approval = session.execute().await.unwrap();
    assert_eq!(approval.kind, TradeKind::Approve);
    assert_eq!(wallet.sent()[0].to, TOKEN);

    chain.set_allowance(U256::MAX);
    chain.mine(approval.hash, 3, true);
    chain.set_block_number(4);
    let notice = session.watch_and_settle(approval).await.unwrap();
    assert_eq!(notice.to_string(), "Token approval successful");
    assert_eq!(session.next_action().unwrap(), NextAction::Sell);

    session.refresh_quote().await.unwrap();
    let sale = session.execute().await.unwrap();
    assert_eq!(sale.kind, TradeKind::Sell);

    let call = ILiquidityPool::sellTokenCall::abi_decode(&wallet.sent()[1].data, true).unwrap();
    assert_eq!(call.amount, ether("100"));
    assert_eq!(call.minReturn, min_return(ether("0.1"), 50));
}
