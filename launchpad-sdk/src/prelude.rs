//! Common imports for SDK users

pub use alloy_primitives::{Address, TxHash, U256};

pub use crate::{
    chain::{ChainReader, WalletSigner},
    client::{
        LaunchpadClient, NextAction, QuoteOutcome, QuoteState, TokenLauncher, TradeExecutor, TradeNotice,
        TradeRequest, TradeSession, WatchState,
    },
    config::LaunchpadConfig,
    core::{PoolReference, SdkError, SdkResult, TradeDirection, TradeKind},
    protocol::contracts::CreatedToken,
};
