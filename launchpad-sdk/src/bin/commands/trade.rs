// Quote and trade commands

use anyhow::{bail, Context, Result};
use clap::Args;
use launchpad_sdk::{
    client::TradeSession,
    core::{constants::COMMON_SLIPPAGE_VALUES, parse_token_amount, PendingTransaction},
    format::format_amount,
    prelude::*,
    protocol::{is_common_slippage, min_return, slippage_bps_to_percent},
};

use super::utils::{error, info, parse_address, success, warn};

#[derive(Args)]
pub struct QuoteCmd {
    /// Token address
    #[arg(long)]
    token: String,

    /// Input amount in whole units (native coin for buys, tokens for sells)
    #[arg(long)]
    amount: String,

    /// Quote a sell instead of a buy
    #[arg(long)]
    sell: bool,
}

#[derive(Args)]
pub struct TradeCmd {
    /// Token address
    #[arg(long)]
    token: String,

    /// Account the wallet endpoint signs for
    #[arg(long)]
    from: String,

    /// Input amount in whole units
    #[arg(long)]
    amount: String,

    /// Slippage tolerance in percent, capped at 25
    #[arg(long, default_value = "0.5")]
    slippage: String,

    /// Return after submission instead of waiting for confirmation
    #[arg(long)]
    no_wait: bool,
}

#[derive(Args)]
pub struct CreateCmd {
    /// Account the wallet endpoint signs for
    #[arg(long)]
    from: String,

    /// Token name
    #[arg(long)]
    name: String,

    /// Token symbol
    #[arg(long)]
    symbol: String,

    /// Native coin spent buying the new token, on top of the creation fee
    #[arg(long, default_value = "0")]
    initial_purchase: String,

    /// Return after submission instead of waiting for the token address
    #[arg(long)]
    no_wait: bool,
}

#[derive(Args)]
pub struct ApproveCmd {
    /// Token address
    #[arg(long)]
    token: String,

    /// Account the wallet endpoint signs for
    #[arg(long)]
    from: String,
}

pub async fn quote(cmd: QuoteCmd, config: LaunchpadConfig) -> Result<()> {
    let token = parse_address(&cmd.token)?;
    let client = LaunchpadClient::new(config)?;
    let pool = client.pools.pool_for(token).await.context("Failed to resolve pool")?;

    let direction = if cmd.sell { TradeDirection::Sell } else { TradeDirection::Buy };
    let amount = parse_token_amount(&cmd.amount)?;
    let resolver = launchpad_sdk::client::QuoteResolver::new(client.chain.clone(), std::time::Duration::ZERO);
    let estimate = resolver
        .get_quote(pool, direction, amount)
        .await
        .context("Quote unavailable")?;

    info(&format!("Pool: {}", pool));
    success(&format!("Estimated output: {}", format_amount(estimate)));
    Ok(())
}

pub async fn buy(cmd: TradeCmd, config: LaunchpadConfig) -> Result<()> {
    trade(cmd, config, TradeDirection::Buy).await
}

pub async fn sell(cmd: TradeCmd, config: LaunchpadConfig) -> Result<()> {
    trade(cmd, config, TradeDirection::Sell).await
}

pub async fn approve(cmd: ApproveCmd, config: LaunchpadConfig) -> Result<()> {
    let token = parse_address(&cmd.token)?;
    let account = parse_address(&cmd.from)?;
    let client = LaunchpadClient::with_wallet(config, account)?;
    let mut session = client.session(token).await.context("Failed to open trade session")?;

    let submitted = client.executor()?.submit(TradeRequest::approve(token, session.pool())).await;
    let Some(pending) = submitted_or_rejected(submitted)? else {
        return Ok(());
    };
    info(&format!("Submitted approve transaction {}", pending.hash));
    report(&client, &mut session, pending, false).await
}

pub async fn create(cmd: CreateCmd, config: LaunchpadConfig) -> Result<()> {
    let account = parse_address(&cmd.from)?;
    let initial_purchase = parse_token_amount(&cmd.initial_purchase)?;
    let client = LaunchpadClient::with_wallet(config, account)?;
    let launcher = client.launcher()?;

    let submitted = launcher.submit(&cmd.name, &cmd.symbol, initial_purchase).await;
    let Some(pending) = submitted_or_rejected(submitted)? else {
        return Ok(());
    };
    info(&format!("Submitted create transaction {}", pending.hash));
    info(&format!("Explorer: {}", client.explorer.tx_url(pending.hash)));
    if cmd.no_wait {
        return Ok(());
    }

    match launcher.confirm(pending).await {
        Ok(created) => {
            success(&format!("{} ({}) created at {}", created.name, created.symbol, created.token));
            info(&format!("Pool: {}", created.pool));
            Ok(())
        }
        Err(SdkError::TimedOut(hash)) => {
            warn(&TradeNotice::Unknown { kind: TradeKind::Create, hash }.to_string());
            Ok(())
        }
        Err(e) => {
            error(&format!("Token creation failed: {}", e));
            Err(e.into())
        }
    }
}

async fn trade(cmd: TradeCmd, config: LaunchpadConfig, direction: TradeDirection) -> Result<()> {
    let token = parse_address(&cmd.token)?;
    let account = parse_address(&cmd.from)?;
    let client = LaunchpadClient::with_wallet(config, account)?;
    let mut session = client.session(token).await.context("Failed to open trade session")?;

    if session.intent().direction != direction {
        session.flip_direction();
    }
    session.set_amount(cmd.amount.as_str());
    let bps = session.set_slippage(&cmd.slippage);
    info(&format!("Slippage tolerance: {}%", slippage_bps_to_percent(bps)));
    if !is_common_slippage(bps) {
        info(&format!("Common values: {}%", COMMON_SLIPPAGE_VALUES.join("%, ")));
    }

    if session.next_action()? == NextAction::Approve {
        info("Allowance too low, approving the pool first");
        let Some(pending) = submitted_or_rejected(session.execute().await)? else {
            return Ok(());
        };
        info(&format!("Submitted approve transaction {}", pending.hash));
        report(&client, &mut session, pending, false).await?;
        if session.next_action()? == NextAction::Approve {
            bail!("Approval did not take effect");
        }
    }

    match session.refresh_quote().await? {
        QuoteState::Ready(quote) => {
            info(&format!("Estimated output: {}", format_amount(quote.estimated_output)));
            info(&format!(
                "Minimum received: {}",
                format_amount(min_return(quote.estimated_output, bps))
            ));
        }
        QuoteState::Empty => bail!("Enter an amount greater than zero"),
        _ => bail!("Quote unavailable, try again"),
    }

    let Some(pending) = submitted_or_rejected(session.execute().await)? else {
        return Ok(());
    };
    info(&format!("Submitted {} transaction {}", pending.kind, pending.hash));
    report(&client, &mut session, pending, cmd.no_wait).await
}

/// A declined wallet prompt ends the command quietly with `None`
fn submitted_or_rejected(result: SdkResult<PendingTransaction>) -> Result<Option<PendingTransaction>> {
    match result {
        Ok(pending) => Ok(Some(pending)),
        Err(SdkError::UserRejected) => {
            warn("Request rejected in wallet");
            Ok(None)
        }
        Err(e) => {
            if let Some(notice) = TradeNotice::from_submit_error(&e) {
                error(&notice.to_string());
            }
            Err(e.into())
        }
    }
}

async fn report(
    client: &LaunchpadClient,
    session: &mut TradeSession,
    pending: PendingTransaction,
    no_wait: bool,
) -> Result<()> {
    info(&format!("Explorer: {}", client.explorer.tx_url(pending.hash)));
    if no_wait {
        return Ok(());
    }

    match session.watch_and_settle(pending).await {
        Some(notice) if notice.is_error() => {
            error(&notice.to_string());
            bail!("{}", notice)
        }
        Some(notice @ TradeNotice::Unknown { .. }) => {
            warn(&notice.to_string());
            Ok(())
        }
        Some(notice) => {
            success(&notice.to_string());
            Ok(())
        }
        None => Ok(()),
    }
}
