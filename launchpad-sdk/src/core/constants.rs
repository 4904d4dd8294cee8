use std::time::Duration;

use alloy_primitives::{address, Address};

/// Bonding-curve manager deployment on testnet
pub const BONDING_CURVE_MANAGER: Address = address!("2a0B34a43b477fA9355AC2c8e54Da3c57067DDF4");

/// Decimals used by launched tokens and the native coin
pub const TOKEN_DECIMALS: u8 = 18;

/// Basis points denominator
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Upper bound for slippage tolerance (25%)
pub const MAX_SLIPPAGE_BPS: u16 = 2_500;

/// Slippage preselected in the trade panel (0.5%)
pub const DEFAULT_SLIPPAGE_BPS: u16 = 50;

/// Quick-pick slippage values, in percent
pub const COMMON_SLIPPAGE_VALUES: [&str; 3] = ["0.1", "0.5", "1.0"];

/// Debounce window for quote reads
pub const QUOTE_DEBOUNCE: Duration = Duration::from_millis(300);

/// Receipt polling defaults
pub const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const RECEIPT_MAX_ATTEMPTS: u32 = 30;
pub const REQUIRED_CONFIRMATIONS: u64 = 2;

/// Native-coin reserve at which a pool migrates, in wei (0.2 ETH)
pub const MIGRATION_TARGET_WEI: u128 = 200_000_000_000_000_000;

/// Token creation fee charged by the manager, in wei (0.0002 ETH)
pub const CREATION_FEE_WEI: u128 = 200_000_000_000_000;

/// Lifetime of the cached native-coin USD price
pub const PRICE_CACHE_TTL: Duration = Duration::from_secs(60);

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: u32 = 20;
