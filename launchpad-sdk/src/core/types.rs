use std::fmt;

use alloy_primitives::{utils::parse_units, utils::ParseUnits, Address, Bytes, TxHash, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{constants::TOKEN_DECIMALS, SdkError, SdkResult};

/// Address of the bonding-curve pool contract backing one token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolReference(pub Address);

impl PoolReference {
    pub fn address(&self) -> Address {
        self.0
    }
}

impl fmt::Display for PoolReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Address> for PoolReference {
    fn from(address: Address) -> Self {
        Self(address)
    }
}

/// Trade direction relative to the launched token
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Native coin in, token out
    Buy,
    /// Token in, native coin out
    Sell,
}

impl TradeDirection {
    pub fn flipped(self) -> Self {
        match self {
            TradeDirection::Buy => TradeDirection::Sell,
            TradeDirection::Sell => TradeDirection::Buy,
        }
    }
}

/// Kind of transaction presented to the wallet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Approve,
    Buy,
    Sell,
    /// Token launch through the bonding-curve manager
    Create,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TradeKind::Approve => "approve",
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::Create => "create",
        };
        f.write_str(label)
    }
}

/// What the user has typed into the trade panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeIntent {
    pub direction: TradeDirection,
    pub input_amount: String,
    pub slippage_bps: u16,
}

impl TradeIntent {
    pub fn new(direction: TradeDirection, input_amount: impl Into<String>, slippage_bps: u16) -> Self {
        Self {
            direction,
            input_amount: input_amount.into(),
            slippage_bps,
        }
    }

    /// Input amount in the smallest unit. Empty input parses to zero.
    pub fn parsed_amount(&self) -> SdkResult<U256> {
        parse_token_amount(&self.input_amount)
    }

    pub fn key(&self) -> SdkResult<QuoteKey> {
        Ok(QuoteKey {
            direction: self.direction,
            amount: self.parsed_amount()?,
        })
    }
}

/// Parse a decimal string into the 18-decimal smallest unit
pub fn parse_token_amount(input: &str) -> SdkResult<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(U256::ZERO);
    }
    match parse_units(trimmed, TOKEN_DECIMALS) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(SdkError::Validation(format!(
            "amount must not be negative: {}",
            trimmed
        ))),
        Err(e) => Err(SdkError::Validation(format!("invalid amount {:?}: {}", trimmed, e))),
    }
}

/// Identifies the intent a quote was computed for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QuoteKey {
    pub direction: TradeDirection,
    pub amount: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quote {
    pub key: QuoteKey,
    pub estimated_output: U256,
    pub is_stale: bool,
}

impl Quote {
    pub fn new(key: QuoteKey, estimated_output: U256) -> Self {
        Self {
            key,
            estimated_output,
            is_stale: false,
        }
    }

    /// A quote is only usable for the exact intent that produced it.
    pub fn is_valid_for(&self, key: &QuoteKey) -> bool {
        !self.is_stale && self.key == *key
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: TxHash,
    pub kind: TradeKind,
    pub submitted_at: DateTime<Utc>,
}

/// Minimal receipt view needed to classify an outcome
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub hash: TxHash,
    pub block_number: u64,
    pub success: bool,
}

/// Event log attached to a mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Unsigned call handed to the wallet
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

/// Pool reserves as reported by `getReserves`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reserves {
    pub token: U256,
    pub native: U256,
}

/// Spending allowance granted to the pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllowanceState {
    pub amount: U256,
}

impl AllowanceState {
    pub fn covers(&self, amount: U256) -> bool {
        self.amount >= amount
    }
}

/// Wallet balances after a refresh. `None` means the read failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    pub eth_balance: Option<U256>,
    pub token_balance: Option<U256>,
    pub allowance: Option<U256>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_amount() {
        assert_eq!(parse_token_amount("").unwrap(), U256::ZERO);
        assert_eq!(
            parse_token_amount("10").unwrap(),
            U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64))
        );
        assert_eq!(
            parse_token_amount("0.5").unwrap(),
            U256::from(500_000_000_000_000_000u64)
        );
        assert!(matches!(parse_token_amount("-1"), Err(SdkError::Validation(_))));
        assert!(matches!(parse_token_amount("abc"), Err(SdkError::Validation(_))));
    }

    #[test]
    fn test_quote_validity_is_bound_to_key() {
        let key = QuoteKey {
            direction: TradeDirection::Buy,
            amount: U256::from(1u64),
        };
        let quote = Quote::new(key, U256::from(100u64));
        assert!(quote.is_valid_for(&key));

        let flipped = QuoteKey {
            direction: TradeDirection::Sell,
            ..key
        };
        assert!(!quote.is_valid_for(&flipped));

        let stale = Quote { is_stale: true, ..quote };
        assert!(!stale.is_valid_for(&key));
    }
}
