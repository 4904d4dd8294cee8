//! ABI bindings for the bonding-curve manager, pool and ERC20 token contracts

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use tracing::debug;

use crate::core::{PoolReference, ReceiptLog, TransactionRequest};

sol! {
    /// Deploys a token and its pool in one call
    interface IBondingCurveManager {
        event TokenCreated(
            address indexed tokenAddress,
            address indexed creator,
            string name,
            string symbol,
            address poolAddress
        );

        function createToken(string name, string symbol) external payable returns (address);
    }

    /// Bonding-curve liquidity pool, one per launched token
    interface ILiquidityPool {
        function getCurrentTokenPrice() external view returns (uint256);
        function getReserves() external view returns (uint256, uint256);
        function calculateCurvedBuyReturn(uint256 ethAmount) external view returns (uint256);
        function calculateCurvedSellReturn(uint256 tokenAmount) external view returns (uint256);
        function buyToken(uint256 minReturn, uint256 deadline) external payable;
        function sellToken(uint256 amount, uint256 minReturn, uint256 deadline) external;
    }

    interface IERC20 {
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// `approve(spender, amount)` on the token contract
pub fn approve(token: Address, spender: Address, amount: U256) -> TransactionRequest {
    let call = IERC20::approveCall { spender, amount };
    TransactionRequest {
        to: token,
        data: Bytes::from(call.abi_encode()),
        value: U256::ZERO,
    }
}

/// `buyToken(minReturn, deadline)` with the native amount attached
pub fn buy_token(pool: PoolReference, eth_amount: U256, min_return: U256, deadline: U256) -> TransactionRequest {
    let call = ILiquidityPool::buyTokenCall {
        minReturn: min_return,
        deadline,
    };
    TransactionRequest {
        to: pool.address(),
        data: Bytes::from(call.abi_encode()),
        value: eth_amount,
    }
}

/// `sellToken(amount, minReturn, deadline)`
pub fn sell_token(pool: PoolReference, amount: U256, min_return: U256, deadline: U256) -> TransactionRequest {
    let call = ILiquidityPool::sellTokenCall {
        amount,
        minReturn: min_return,
        deadline,
    };
    TransactionRequest {
        to: pool.address(),
        data: Bytes::from(call.abi_encode()),
        value: U256::ZERO,
    }
}

/// `createToken(name, symbol)` paying the creation fee plus the initial purchase
pub fn create_token(manager: Address, name: &str, symbol: &str, value: U256) -> TransactionRequest {
    let call = IBondingCurveManager::createTokenCall {
        name: name.to_string(),
        symbol: symbol.to_string(),
    };
    TransactionRequest {
        to: manager,
        data: Bytes::from(call.abi_encode()),
        value,
    }
}

/// Launched token, as reported by the manager's `TokenCreated` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedToken {
    pub token: Address,
    pub creator: Address,
    pub pool: PoolReference,
    pub name: String,
    pub symbol: String,
}

/// First `TokenCreated` event emitted by `manager` among `logs`
pub fn find_token_created(logs: &[ReceiptLog], manager: Address) -> Option<CreatedToken> {
    logs.iter()
        .filter(|log| log.address == manager)
        .find_map(|log| {
            match IBondingCurveManager::TokenCreated::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
                Ok(event) => Some(CreatedToken {
                    token: event.tokenAddress,
                    creator: event.creator,
                    pool: PoolReference(event.poolAddress),
                    name: event.name,
                    symbol: event.symbol,
                }),
                Err(e) => {
                    debug!(error = %e, "Skipping manager log");
                    None
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_attaches_value_and_selector() {
        let pool = PoolReference(Address::repeat_byte(0x11));
        let tx = buy_token(pool, U256::from(5u64), U256::from(4u64), U256::MAX);

        assert_eq!(tx.to, pool.address());
        assert_eq!(tx.value, U256::from(5u64));
        assert_eq!(&tx.data[..4], &ILiquidityPool::buyTokenCall::SELECTOR[..]);

        let decoded = ILiquidityPool::buyTokenCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(decoded.minReturn, U256::from(4u64));
        assert_eq!(decoded.deadline, U256::MAX);
    }

    #[test]
    fn test_sell_and_approve_carry_no_value() {
        let pool = PoolReference(Address::repeat_byte(0x22));
        let token = Address::repeat_byte(0x33);

        let sell = sell_token(pool, U256::from(7u64), U256::from(6u64), U256::from(1_000u64));
        assert_eq!(sell.value, U256::ZERO);
        let decoded = ILiquidityPool::sellTokenCall::abi_decode(&sell.data, true).unwrap();
        assert_eq!(decoded.amount, U256::from(7u64));

        let approval = approve(token, pool.address(), U256::MAX);
        assert_eq!(approval.to, token);
        let decoded = IERC20::approveCall::abi_decode(&approval.data, true).unwrap();
        assert_eq!(decoded.spender, pool.address());
        assert_eq!(decoded.amount, U256::MAX);
    }

    #[test]
    fn test_create_token_pays_fee_and_purchase() {
        let manager = Address::repeat_byte(0x44);
        let tx = create_token(manager, "Cat", "CAT", U256::from(9u64));

        assert_eq!(tx.to, manager);
        assert_eq!(tx.value, U256::from(9u64));
        let decoded = IBondingCurveManager::createTokenCall::abi_decode(&tx.data, true).unwrap();
        assert_eq!(decoded.name, "Cat");
        assert_eq!(decoded.symbol, "CAT");
    }

    fn token_created_log(emitter: Address) -> ReceiptLog {
        crate::testing::token_created_log(
            emitter,
            Address::repeat_byte(0x0b),
            Address::repeat_byte(0x0a),
            PoolReference(Address::repeat_byte(0x0c)),
            "Cat",
            "CAT",
        )
    }

    #[test]
    fn test_token_created_only_from_manager() {
        let manager = Address::repeat_byte(0x44);
        let logs = vec![token_created_log(Address::repeat_byte(0x55)), token_created_log(manager)];

        let created = find_token_created(&logs, manager).unwrap();
        assert_eq!(created.token, Address::repeat_byte(0x0b));
        assert_eq!(created.creator, Address::repeat_byte(0x0a));
        assert_eq!(created.pool, PoolReference(Address::repeat_byte(0x0c)));
        assert_eq!(created.symbol, "CAT");

        assert_eq!(find_token_created(&logs[..1], manager), None);
    }
}
