//! Launchpad SDK
//!
//! Client for trading tokens launched on bonding-curve pools:
//! - debounced output quotes from the pool contract
//! - buy, approve and sell submission through the user's wallet, one at a time
//! - receipt watching with confirmation depth and timeout
//! - balance and allowance refresh after a trade settles
//! - token listings, price history and holders from the off-chain backends

pub mod api;
pub mod cache;
pub mod chain;
pub mod client;
pub mod config;
pub mod core;
pub mod format;
pub mod prelude;
pub mod protocol;
pub mod testing;

pub use client::LaunchpadClient;
pub use config::LaunchpadConfig;
pub use crate::core::{SdkError, SdkResult};
