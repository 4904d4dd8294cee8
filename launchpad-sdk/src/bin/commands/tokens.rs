// Token listing commands

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use launchpad_sdk::{
    api::{page_slice, NewChatMessage, Page, TokenSummary},
    core::constants::DEFAULT_PAGE_SIZE,
    format::{format_amount, format_amount_compact, format_amount_trimmed, format_relative_time, shorten_address},
    prelude::*,
};

use super::utils::{info, parse_address, success};

#[derive(Subcommand)]
pub enum TokensCmd {
    /// All launched tokens
    List {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
    },

    /// Tokens launched within the last hours
    Recent {
        #[arg(long, default_value = "1")]
        hours: u32,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Search by name or symbol
    Search {
        query: String,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Token details and recent trades
    Show {
        address: String,

        /// Trades page
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Top holders
    Holders {
        address: String,

        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// USD price history
    Prices { address: String },

    /// Tokens that have migrated liquidity to the DEX
    Liquidity {
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Chat thread of a token
    Chat { address: String },

    /// Post to a token's chat
    Say {
        address: String,

        /// Author address
        #[arg(long)]
        from: String,

        message: String,

        /// Id of the message being answered
        #[arg(long)]
        reply_to: Option<u64>,
    },
}

pub async fn execute(cmd: TokensCmd, config: LaunchpadConfig) -> Result<()> {
    let client = LaunchpadClient::new(config)?;

    match cmd {
        TokensCmd::List { page, page_size } => {
            let tokens = client.indexer.all_tokens(page, page_size).await?;
            print_tokens(&tokens);

            let pools: Vec<_> = tokens
                .data
                .iter()
                .filter_map(|t| t.pool.map(|pool| (pool, t.address)))
                .collect();
            for ((_, token), snapshot) in pools.iter().zip(client.market.snapshots(&pools).await) {
                if let Some(reserves) = snapshot.reserves {
                    info(&format!(
                        "{} liquidity {} ({:.2}%)",
                        token,
                        format_amount_compact(reserves.native),
                        snapshot.progress.unwrap_or(0.0)
                    ));
                }
            }
        }
        TokensCmd::Recent { hours, page } => {
            let tokens = client
                .indexer
                .recent_tokens(page, DEFAULT_PAGE_SIZE, hours)
                .await
                .context("Failed to fetch recent tokens")?;
            print_tokens(&tokens);
        }
        TokensCmd::Search { query, page } => {
            let tokens = client
                .indexer
                .search_tokens(&query, page, DEFAULT_PAGE_SIZE)
                .await
                .context("Search failed")?;
            print_tokens(&tokens);
        }
        TokensCmd::Show { address, page } => {
            let token = parse_address(&address)?;
            let detail = client
                .token_detail(token, page, DEFAULT_PAGE_SIZE)
                .await
                .context("Failed to fetch token")?;

            success(&format!("{} ({})", detail.token.name, detail.token.symbol));
            info(&format!("Address: {}", detail.token.address));
            if let Some(pool) = detail.token.pool {
                info(&format!("Pool: {}", pool));
            }
            info(&format!(
                "Created: {}",
                format_relative_time(detail.token.created_at, Utc::now())
            ));
            for tx in &detail.transactions.data {
                info(&format!(
                    "{:<5} {} native / {} tokens by {} ({})",
                    tx.kind,
                    format_amount_trimmed(tx.eth_amount),
                    format_amount_trimmed(tx.token_amount),
                    tx.sender.map(shorten_address).unwrap_or_default(),
                    format_relative_time(tx.timestamp, Utc::now()),
                ));
            }
        }
        TokensCmd::Holders { address, page } => {
            let token = parse_address(&address)?;
            let holders = client.explorer.holders(token).await.context("Failed to fetch token holders")?;
            for holder in page_slice(&holders, page, 10) {
                info(&format!("{} {}", holder.address, format_amount(holder.balance)));
            }
        }
        TokensCmd::Prices { address } => {
            let token = parse_address(&address)?;
            let history = client
                .metadata
                .usd_price_history(token)
                .await
                .context("Failed to calculate USD price history")?;
            for point in history {
                info(&format!("{} ${:.9}", point.timestamp.to_rfc3339(), point.token_price_usd));
            }
        }
        TokensCmd::Liquidity { page } => {
            let tokens = client
                .metadata
                .tokens_with_liquidity(page, DEFAULT_PAGE_SIZE)
                .await
                .context("Failed to fetch tokens with liquidity events")?;
            success(&format!(
                "Page {} of {} ({} tokens)",
                tokens.current_page, tokens.total_pages, tokens.total_count
            ));
            for entry in &tokens.data {
                let latest = entry.liquidity_events.iter().max_by_key(|e| e.timestamp);
                info(&format!(
                    "{:<10} {} {} events{}",
                    entry.token.symbol,
                    entry.token.address,
                    entry.liquidity_events.len(),
                    latest
                        .map(|e| format!(", last {}", format_relative_time(e.timestamp, Utc::now())))
                        .unwrap_or_default()
                ));
            }
        }
        TokensCmd::Chat { address } => {
            let token = parse_address(&address)?;
            let messages = client
                .metadata
                .chat_messages(token)
                .await
                .context("Failed to fetch chat messages")?;
            for message in &messages {
                let reply = message.reply_to.map(|id| format!(" (re #{})", id)).unwrap_or_default();
                info(&format!(
                    "#{} {}{}: {} ({})",
                    message.id,
                    shorten_address(message.user),
                    reply,
                    message.message,
                    format_relative_time(message.timestamp, Utc::now())
                ));
            }
        }
        TokensCmd::Say {
            address,
            from,
            message,
            reply_to,
        } => {
            let new_message = NewChatMessage {
                user: parse_address(&from)?,
                token: parse_address(&address)?,
                message,
                reply_to,
            };
            let id = client
                .metadata
                .post_chat_message(&new_message)
                .await
                .context("Failed to post chat message")?;
            success(&format!("Posted message #{}", id));
        }
    }
    Ok(())
}

fn print_tokens(tokens: &Page<TokenSummary>) {
    success(&format!(
        "Page {} of {} ({} tokens)",
        tokens.current_page, tokens.total_pages, tokens.total_count
    ));
    for token in &tokens.data {
        info(&format!(
            "{:<10} {:<24} {} {}",
            token.symbol,
            token.name,
            token.address,
            format_relative_time(token.created_at, Utc::now())
        ));
    }
}
