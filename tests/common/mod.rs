//! Shared fixtures for the integration-test crate.
//!
//! Scripts a `MockRpcAdapter` to answer like a real Uniswap-V2-style
//! factory/pair pair, so tests can exercise the Pool Registry's V2 discovery
//! path (`arb_registry::PoolRegistry::refresh`) against real ABI-encoded
//! responses instead of only the placeholder V3 grid.

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use arb_rpc::MockRpcAdapter;

sol! {
    interface IUniswapV2Factory {
        function allPairsLength() external view returns (uint256);
        function allPairs(uint256 index) external view returns (address pair);
    }

    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
        function token0() external view returns (address);
        function token1() external view returns (address);
    }
}

/// Scripts `adapter` so a `PoolRegistry` V2 refresh against `factory` yields
/// exactly one pool at `pair`, with the given reserves and token ordering.
#[allow(clippy::too_many_arguments)]
pub fn script_single_v2_pool(
    adapter: &MockRpcAdapter,
    factory: Address,
    pair: Address,
    token0: Address,
    token1: Address,
    reserve0: u128,
    reserve1: u128,
) {
    adapter.set_call_response(
        factory,
        IUniswapV2Factory::allPairsLengthCall {}.abi_encode().into(),
        IUniswapV2Factory::allPairsLengthCall::abi_encode_returns(&U256::from(1)).into(),
    );
    adapter.set_call_response(
        factory,
        IUniswapV2Factory::allPairsCall { index: U256::from(0) }.abi_encode().into(),
        IUniswapV2Factory::allPairsCall::abi_encode_returns(&pair).into(),
    );
    let reserves_return = IUniswapV2Pair::getReservesReturn {
        reserve0: U256::from(reserve0).to::<alloy::primitives::Uint<112, 2>>(),
        reserve1: U256::from(reserve1).to::<alloy::primitives::Uint<112, 2>>(),
        blockTimestampLast: 0u32,
    };
    adapter.set_call_response(
        pair,
        IUniswapV2Pair::getReservesCall {}.abi_encode().into(),
        IUniswapV2Pair::getReservesCall::abi_encode_returns(&reserves_return).into(),
    );
    adapter.set_call_response(
        pair,
        IUniswapV2Pair::token0Call {}.abi_encode().into(),
        IUniswapV2Pair::token0Call::abi_encode_returns(&token0).into(),
    );
    adapter.set_call_response(
        pair,
        IUniswapV2Pair::token1Call {}.abi_encode().into(),
        IUniswapV2Pair::token1Call::abi_encode_returns(&token1).into(),
    );
}
