// CLI tool for the launchpad
//
// Launches tokens, quotes and trades on bonding-curve pools, and browses
// launched tokens and their chat.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use launchpad_sdk::LaunchpadConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Bonding-curve launchpad CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML); LAUNCHPAD_* variables override it
    #[arg(long, default_value = "launchpad.toml")]
    config: PathBuf,

    /// Override the node RPC URL
    #[arg(long)]
    rpc_url: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the output of a buy or sell
    Quote(commands::trade::QuoteCmd),

    /// Buy tokens with the native coin
    Buy(commands::trade::TradeCmd),

    /// Sell tokens, approving the pool first if needed
    Sell(commands::trade::TradeCmd),

    /// Grant the pool an unlimited allowance
    Approve(commands::trade::ApproveCmd),

    /// Launch a new token through the bonding-curve manager
    Create(commands::trade::CreateCmd),

    /// Show native, token and allowance balances of an account
    Balances(commands::market::BalancesCmd),

    /// Show price, reserves and bonding progress of a token's pool
    Market(commands::market::MarketCmd),

    /// Browse launched tokens
    #[command(subcommand)]
    Tokens(commands::tokens::TokensCmd),

    /// Write the effective configuration to a file
    InitConfig {
        /// Destination path
        #[arg(long, default_value = "launchpad.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut config = LaunchpadConfig::load(Some(cli.config.as_path())).context("Failed to load configuration")?;
    if let Some(rpc_url) = cli.rpc_url {
        config.endpoints.rpc_url = rpc_url;
        config.validate().context("Invalid RPC URL")?;
    }

    match cli.command {
        Commands::Quote(cmd) => commands::trade::quote(cmd, config).await,
        Commands::Buy(cmd) => commands::trade::buy(cmd, config).await,
        Commands::Sell(cmd) => commands::trade::sell(cmd, config).await,
        Commands::Approve(cmd) => commands::trade::approve(cmd, config).await,
        Commands::Create(cmd) => commands::trade::create(cmd, config).await,
        Commands::Balances(cmd) => commands::market::balances(cmd, config).await,
        Commands::Market(cmd) => commands::market::market(cmd, config).await,
        Commands::Tokens(cmd) => commands::tokens::execute(cmd, config).await,
        Commands::InitConfig { output } => {
            config.save(&output).context("Failed to write configuration")?;
            commands::utils::success(&format!("Configuration written to {}", output.display()));
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("launchpad_sdk={},launchpad={}", level, level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
