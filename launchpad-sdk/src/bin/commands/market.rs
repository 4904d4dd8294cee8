// Pool and account inspection commands

use anyhow::{Context, Result};
use clap::Args;
use launchpad_sdk::{format::format_amount, prelude::*};

use super::utils::{amount_or_unknown, info, parse_address, success};

#[derive(Args)]
pub struct BalancesCmd {
    /// Token address
    #[arg(long)]
    token: String,

    /// Account to inspect
    #[arg(long)]
    account: String,
}

#[derive(Args)]
pub struct MarketCmd {
    /// Token address
    #[arg(long)]
    token: String,
}

pub async fn balances(cmd: BalancesCmd, config: LaunchpadConfig) -> Result<()> {
    let token = parse_address(&cmd.token)?;
    let account = parse_address(&cmd.account)?;
    let client = LaunchpadClient::new(config)?;
    let pool = client.pools.pool_for(token).await.context("Failed to resolve pool")?;

    let balances = client.balances.refresh(account, token, pool.address()).await;
    success(&format!("Balances of {}", account));
    info(&format!("Native: {}", amount_or_unknown(balances.eth_balance)));
    info(&format!("Token: {}", amount_or_unknown(balances.token_balance)));
    info(&format!("Allowance for pool: {}", amount_or_unknown(balances.allowance)));
    Ok(())
}

pub async fn market(cmd: MarketCmd, config: LaunchpadConfig) -> Result<()> {
    let token = parse_address(&cmd.token)?;
    let client = LaunchpadClient::new(config)?;
    let pool = client.pools.pool_for(token).await.context("Failed to resolve pool")?;

    let snapshot = client.market.snapshot(pool, token).await;
    success(&format!("Pool {}", pool));
    info(&format!("Current price: {}", amount_or_unknown(snapshot.current_price)));
    match snapshot.reserves {
        Some(reserves) => {
            info(&format!("Token reserve: {}", format_amount(reserves.token)));
            info(&format!("Native reserve: {}", format_amount(reserves.native)));
        }
        None => info("Reserves: unknown"),
    }
    info(&format!("Total supply: {}", amount_or_unknown(snapshot.total_supply)));
    if let Some(progress) = snapshot.progress {
        info(&format!("Bonding progress: {:.2}%", progress));
    }
    Ok(())
}
