//! Pool Registry: enumerates and refreshes per-DEX pool reserve snapshots.
//!
//! V2-style discovery is grounded on `scanner.py`'s `fetch_v2_pools` (sample
//! the most recently created pairs, read the first 20 reserves, rank by
//! TVL-proxy). V3-style discovery keeps that source's placeholder TVL
//! approach, since the core does not read live concentrated-liquidity state
//! (see the Open Questions in `SPEC_FULL.md`).

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use arb_rpc::RpcAdapter;
use arb_types::{DexConfig, DexId, PoolKind, PoolSnapshot, Token};
use dashmap::DashMap;
use eyre::Result;
use tokio::sync::Semaphore;

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

/// How many of the most recently created pairs to sample per V2-style refresh.
const SAMPLE_WINDOW: usize = 100;
/// How many sampled pairs actually get a reserve read.
const SAMPLE_READ_COUNT: usize = 20;
/// How many ranked pools `refresh` keeps.
const TOP_N_KEPT: usize = 20;
/// Placeholder TVL for V3-style pools, matching the source's constant.
const V3_PLACEHOLDER_TVL: u128 = 1_000_000;
/// Bounds concurrent per-pool RPC reads within a single refresh.
const REFRESH_CONCURRENCY: usize = 10;

/// Enumerates and caches per-DEX pool snapshots.
pub struct PoolRegistry {
    adapter: Arc<dyn RpcAdapter>,
    dex_configs: Vec<DexConfig>,
    /// Token universe used to build the V3 pair x fee-tier grid.
    tokens_of_interest: Vec<Token>,
    cache: DashMap<DexId, Vec<PoolSnapshot>>,
}

impl PoolRegistry {
    pub fn new(adapter: Arc<dyn RpcAdapter>, dex_configs: Vec<DexConfig>, tokens_of_interest: Vec<Token>) -> Self {
        Self {
            adapter,
            dex_configs,
            tokens_of_interest,
            cache: DashMap::new(),
        }
    }

    fn config_for(&self, dex_id: &DexId) -> Option<&DexConfig> {
        self.dex_configs.iter().find(|config| &config.dex_id == dex_id)
    }

    /// Refreshes one DEX's pool set and caches the result. A per-DEX error
    /// is logged and yields an empty list for that DEX; it never aborts the
    /// caller's scan cycle.
    pub async fn refresh(&self, dex_id: &DexId, current_block: u64) -> Vec<PoolSnapshot> {
        let Some(config) = self.config_for(dex_id) else {
            tracing::warn!(dex_id = %dex_id, "refresh requested for unconfigured DEX");
            return Vec::new();
        };

        let result = match config.kind {
            PoolKind::ConstantProductV2 => self.refresh_v2(config, current_block).await,
            PoolKind::ConcentratedV3 => Ok(self.refresh_v3_placeholder(config, current_block)),
        };

        let snapshots = match result {
            Ok(snapshots) => snapshots,
            Err(error) => {
                tracing::warn!(dex_id = %dex_id, error = %error, "pool refresh failed for DEX; yielding empty set");
                Vec::new()
            }
        };

        self.cache.insert(dex_id.clone(), snapshots.clone());
        snapshots
    }

    /// Returns up to `k` pools from the last cached refresh for `dex_id`.
    pub fn top_k(&self, dex_id: &DexId, k: usize) -> Vec<PoolSnapshot> {
        self.cache
            .get(dex_id)
            .map(|entry| entry.value().iter().take(k).cloned().collect())
            .unwrap_or_default()
    }

    async fn refresh_v2(&self, config: &DexConfig, current_block: u64) -> Result<Vec<PoolSnapshot>> {
        let call = IUniswapV2Factory::allPairsLengthCall {}.abi_encode();
        let raw = self.adapter.call(config.factory, call.into()).await?;
        let length = IUniswapV2Factory::allPairsLengthCall::abi_decode_returns(&raw, true)?
            .to::<u64>();

        if length == 0 {
            return Ok(Vec::new());
        }

        let sample_start = length.saturating_sub(SAMPLE_WINDOW as u64);
        let sample_indices: Vec<u64> = (sample_start..length).take(SAMPLE_WINDOW).collect();

        let semaphore = Arc::new(Semaphore::new(REFRESH_CONCURRENCY));
        let mut pair_futures = Vec::new();
        for index in sample_indices.into_iter().take(SAMPLE_READ_COUNT) {
            let semaphore = semaphore.clone();
            let adapter = self.adapter.clone();
            let factory = config.factory;
            pair_futures.push(async move {
                let _permit = semaphore.acquire().await.ok();
                let call = IUniswapV2Factory::allPairsCall { index: U256::from(index) }.abi_encode();
                let raw = adapter.call(factory, call.into()).await?;
                let decoded = IUniswapV2Factory::allPairsCall::abi_decode_returns(&raw, true)?;
                Ok::<Address, eyre::Report>(decoded)
            });
        }
        let pair_addresses: Vec<Address> = futures::future::join_all(pair_futures)
            .await
            .into_iter()
            .filter_map(|result| result.ok())
            .collect();

        let mut snapshot_futures = Vec::new();
        for pool_address in pair_addresses {
            let semaphore = semaphore.clone();
            let adapter = self.adapter.clone();
            let dex_id = config.dex_id.clone();
            let fee_num = config.default_fee_numerator;
            let fee_den = config.default_fee_denominator;
            snapshot_futures.push(async move {
                let _permit = semaphore.acquire().await.ok();
                fetch_v2_snapshot(adapter, pool_address, dex_id, fee_num, fee_den, current_block).await
            });
        }

        let mut snapshots: Vec<PoolSnapshot> = futures::future::join_all(snapshot_futures)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(snapshot) => Some(snapshot),
                Err(error) => {
                    tracing::debug!(error = %error, "per-pool refresh failed; skipping pool");
                    None
                }
            })
            .filter(|snapshot| !snapshot.is_empty())
            .collect();

        // Rank by TVL-proxy descending, stable; tie-break lexicographic pool address ascending.
        snapshots.sort_by(|a, b| {
            b.tvl_proxy()
                .cmp(&a.tvl_proxy())
                .then_with(|| a.pool_address.cmp(&b.pool_address))
        });
        snapshots.truncate(TOP_N_KEPT);

        Ok(snapshots)
    }

    fn refresh_v3_placeholder(&self, config: &DexConfig, current_block: u64) -> Vec<PoolSnapshot> {
        let mut snapshots = Vec::new();
        for i in 0..self.tokens_of_interest.len() {
            for j in (i + 1)..self.tokens_of_interest.len() {
                let token0 = self.tokens_of_interest[i];
                let token1 = self.tokens_of_interest[j];
                for &fee_bps in &config.fee_tiers {
                    snapshots.push(PoolSnapshot {
                        pool_address: placeholder_pool_address(config, token0, token1, fee_bps),
                        dex_id: config.dex_id.clone(),
                        token0,
                        token1,
                        reserve0: V3_PLACEHOLDER_TVL,
                        reserve1: V3_PLACEHOLDER_TVL,
                        fee_numerator: 1_000_000 - fee_bps as u32 * 100,
                        fee_denominator: 1_000_000,
                        kind: PoolKind::ConcentratedV3,
                        observed_at_block: current_block,
                    });
                }
            }
        }
        snapshots
    }
}

async fn fetch_v2_snapshot(
    adapter: Arc<dyn RpcAdapter>,
    pool_address: Address,
    dex_id: DexId,
    fee_num: u32,
    fee_den: u32,
    current_block: u64,
) -> Result<PoolSnapshot> {
    let reserves_call = IUniswapV2Pair::getReservesCall {}.abi_encode();
    let token0_call = IUniswapV2Pair::token0Call {}.abi_encode();
    let token1_call = IUniswapV2Pair::token1Call {}.abi_encode();

    let reserves_raw = adapter.call(pool_address, reserves_call.into()).await?;
    let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&reserves_raw, true)?;

    let token0_raw = adapter.call(pool_address, token0_call.into()).await?;
    let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&token0_raw, true)?;

    let token1_raw = adapter.call(pool_address, token1_call.into()).await?;
    let token1 = IUniswapV2Pair::token1Call::abi_decode_returns(&token1_raw, true)?;

    Ok(PoolSnapshot {
        pool_address,
        dex_id,
        token0,
        token1,
        reserve0: reserves.reserve0.to::<u128>(),
        reserve1: reserves.reserve1.to::<u128>(),
        fee_numerator: fee_num,
        fee_denominator: fee_den,
        kind: PoolKind::ConstantProductV2,
        observed_at_block: current_block,
    })
}

/// Deterministic placeholder pool address for the V3 grid, since there is no
/// real factory lookup backing these entries yet.
fn placeholder_pool_address(config: &DexConfig, token0: Token, token1: Token, fee_bps: u32) -> Address {
    use alloy::primitives::keccak256;
    let mut buf = Vec::with_capacity(20 + 20 + 20 + 4);
    buf.extend_from_slice(config.factory.as_slice());
    buf.extend_from_slice(token0.as_slice());
    buf.extend_from_slice(token1.as_slice());
    buf.extend_from_slice(&fee_bps.to_be_bytes());
    Address::from_slice(&keccak256(buf)[12..])
}
