//! The fixed on-chain executor contract interface, per `SPEC_FULL.md` §6.
//!
//! Expressed as a compile-time-checked `sol!` interface rather than runtime
//! ABI-JSON parsing, matching how the rest of this workspace defines
//! on-chain interfaces (see `arb-registry`'s `IUniswapV2Factory`/`IUniswapV2Pair`).

use alloy::sol;

sol! {
    interface IArbExecutor {
        struct ArbitrageParams {
            address tokenIn;
            uint256 amountIn;
            address[] dexRouters;
            bytes[] swapData;
            uint256 expectedProfit;
        }

        function executeArbitrage(ArbitrageParams params) external;
        function owner() external view returns (address);
        function setMinProfitThreshold(uint256 threshold) external;
        function minProfitThreshold() external view returns (uint256);
        function emergencyWithdraw(address token) external;

        event ArbitrageExecuted(address indexed token, uint256 amountIn, uint256 profit, address indexed executor);
        event ArbitrageFailed(address indexed token, uint256 amountIn, string reason);
        event ProfitWithdrawn(address indexed token, uint256 amount, address indexed recipient);
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}
