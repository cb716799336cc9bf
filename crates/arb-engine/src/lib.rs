//! Route Engine: enumerates candidate two-hop cycles and computes AMM
//! output and net profit using only integer math.
//!
//! Grounded on `mev-sim`'s `strategies::arbitrage` pairwise-scan shape
//! (`scan_for_arb`/`detect_v2_arb_opportunity`), narrowed to the fixed-probe
//! algorithm `SPEC_FULL.md` §4.3 specifies rather than that module's
//! optimal-input search (kept available in `arb-amm` as an enrichment, not
//! part of this contract).

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use alloy::primitives::{keccak256, Bytes};
use arb_amm::{amm_out_for, estimated_gas_cost};
use arb_types::{DexId, Hop, PoolSnapshot, Route, Token};

/// Fixed probe amount the base algorithm tests with: 1 unit in 18-decimal terms.
pub const DEFAULT_PROBE_AMOUNT_IN: u128 = 1_000_000_000_000_000_000;

#[derive(Clone, Debug)]
pub struct RouteEngineConfig {
    pub probe_amount_in: u128,
    pub min_profit_threshold: u128,
    pub gas_price_cap: u128,
    /// When true, `enumerate_parallel` shards work across tasks. The shards
    /// run the identical integer `amm_out` path as the sequential engine —
    /// there is no separate floating-point accelerator here — so results
    /// are byte-for-byte identical either way.
    pub parallel: bool,
}

impl Default for RouteEngineConfig {
    fn default() -> Self {
        Self {
            probe_amount_in: DEFAULT_PROBE_AMOUNT_IN,
            min_profit_threshold: 10_000_000_000_000_000, // 1e16 wei
            gas_price_cap: 100_000_000_000,                // 100 gwei
            parallel: false,
        }
    }
}

/// Enumerates profitable two-hop cycles across every start token and every
/// ordered pair of distinct DEXs, per `SPEC_FULL.md` §4.3.
pub fn enumerate(
    pools_by_dex: &HashMap<DexId, Vec<PoolSnapshot>>,
    tokens_of_interest: &[Token],
    source_block: u64,
    now_ms: u64,
    config: &RouteEngineConfig,
) -> Vec<Route> {
    let dex_ids: Vec<&DexId> = pools_by_dex.keys().collect();
    let mut routes = Vec::new();

    for &start_token in tokens_of_interest {
        for &dex_a in &dex_ids {
            for &dex_b in &dex_ids {
                if dex_a == dex_b {
                    continue;
                }
                let Some(pools_a) = pools_by_dex.get(dex_a) else { continue };
                let Some(pools_b) = pools_by_dex.get(dex_b) else { continue };

                for pool1 in pools_a {
                    if pool1.is_empty() {
                        continue;
                    }
                    let Some(intermediate) = pool1.counterpart(start_token) else { continue };
                    if pool1.reserve_of(start_token).is_none() {
                        continue;
                    }

                    for pool2 in pools_b {
                        if pool2.is_empty() {
                            continue;
                        }
                        if pool2.counterpart(intermediate) != Some(start_token) {
                            continue;
                        }

                        if let Some(route) =
                            evaluate_pair(start_token, intermediate, pool1, pool2, source_block, now_ms, config)
                        {
                            routes.push(route);
                        }
                    }
                }
            }
        }
    }

    sort_by_tie_break(&mut routes);
    routes
}

/// Shards the enumeration across tasks by start token, then merges and
/// revalidates. See the note on `RouteEngineConfig::parallel`: the "GPU"
/// accelerator path this mirrors is treated strictly as a pre-filter whose
/// candidates must pass the same integer check as the sequential path.
pub async fn enumerate_parallel(
    pools_by_dex: Arc<HashMap<DexId, Vec<PoolSnapshot>>>,
    tokens_of_interest: Vec<Token>,
    source_block: u64,
    now_ms: u64,
    config: RouteEngineConfig,
) -> Vec<Route> {
    let mut handles = Vec::new();
    for start_token in tokens_of_interest {
        let pools_by_dex = pools_by_dex.clone();
        let config = config.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            enumerate(&pools_by_dex, &[start_token], source_block, now_ms, &config)
        }));
    }

    let mut merged = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(routes) => merged.extend(routes),
            Err(error) => tracing::error!(error = %error, "route enumeration shard panicked"),
        }
    }

    let revalidated = revalidate(merged, &config);
    let mut routes = revalidated;
    sort_by_tie_break(&mut routes);
    routes
}

/// Re-checks that every candidate still clears the profitability bar under
/// the exact integer formula. A no-op today since `evaluate_pair` already
/// computes with integers, but it is the seam a real accelerator path would
/// be revalidated through.
fn revalidate(candidates: Vec<Route>, config: &RouteEngineConfig) -> Vec<Route> {
    candidates
        .into_iter()
        .filter(|route| {
            let passes = route.net_profit > 0;
            if !passes {
                tracing::debug!(net_profit = route.net_profit, "candidate failed integer revalidation; discarding");
            }
            let _ = config;
            passes
        })
        .collect()
}

fn evaluate_pair(
    start_token: Token,
    intermediate: Token,
    pool1: &PoolSnapshot,
    pool2: &PoolSnapshot,
    source_block: u64,
    now_ms: u64,
    config: &RouteEngineConfig,
) -> Option<Route> {
    let amount_out_1 = amm_out_for(pool1, config.probe_amount_in, start_token);
    if amount_out_1 == 0 {
        return None;
    }
    let amount_out_2 = amm_out_for(pool2, amount_out_1, intermediate);
    if amount_out_2 == 0 {
        return None;
    }

    let expected_profit = amount_out_2 as i128 - config.probe_amount_in as i128;
    if expected_profit <= 0 {
        return None;
    }

    let gas_cost = estimated_gas_cost(2, config.gas_price_cap);
    let threshold = config.min_profit_threshold.saturating_add(gas_cost);
    if (expected_profit as u128) <= threshold {
        return None;
    }

    let net_profit = expected_profit - gas_cost as i128;
    if net_profit <= 0 {
        return None;
    }

    let hops = vec![
        Hop {
            dex_id: pool1.dex_id.clone(),
            pool_address: pool1.pool_address,
            router_address: pool1.pool_address,
            swap_calldata: placeholder_calldata(pool1.pool_address),
        },
        Hop {
            dex_id: pool2.dex_id.clone(),
            pool_address: pool2.pool_address,
            router_address: pool2.pool_address,
            swap_calldata: placeholder_calldata(pool2.pool_address),
        },
    ];

    Some(Route {
        start_token,
        amount_in: config.probe_amount_in,
        hops,
        expected_output: amount_out_2,
        expected_profit,
        gas_estimate: arb_amm::PER_HOP_GAS_ESTIMATE * 2,
        gas_cost,
        net_profit,
        created_at_ms: now_ms,
        source_block,
    })
}

/// Placeholder swap-calldata encoder: keccak of the pool address. The real
/// on-chain executor contract's calldata format is specified by the
/// contract's own interface document, not derivable from this core — see
/// the Open Questions in `SPEC_FULL.md`.
fn placeholder_calldata(pool_address: alloy::primitives::Address) -> Bytes {
    Bytes::from(keccak256(pool_address.as_slice()).to_vec())
}

fn route_hash(route: &Route) -> u64 {
    let mut hasher = DefaultHasher::new();
    route.hash(&mut hasher);
    hasher.finish()
}

fn sort_by_tie_break(routes: &mut [Route]) {
    routes.sort_by(|a, b| {
        b.net_profit
            .cmp(&a.net_profit)
            .then_with(|| a.created_at_ms.cmp(&b.created_at_ms))
            .then_with(|| route_hash(a).cmp(&route_hash(b)))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use arb_types::PoolKind;
    use alloy::primitives::Address;

    fn pool(dex: &str, addr: u8, token0: Token, token1: Token, r0: u128, r1: u128) -> PoolSnapshot {
        PoolSnapshot {
            pool_address: Address::repeat_byte(addr),
            dex_id: DexId::from(dex),
            token0,
            token1,
            reserve0: r0,
            reserve1: r1,
            fee_numerator: 997,
            fee_denominator: 1000,
            kind: PoolKind::ConstantProductV2,
            observed_at_block: 1,
        }
    }

    #[test]
    fn trivially_profitable_two_hop_emits_route() {
        let weth = Address::repeat_byte(0xAA);
        let usdc = Address::repeat_byte(0xBB);

        let mut pools = HashMap::new();
        pools.insert(
            DexId::from("dex1"),
            vec![pool("dex1", 1, weth, usdc, 1_000_000_000_000_000_000_000, 2_000_000_000_000_000_000_000_000)],
        );
        pools.insert(
            DexId::from("dex2"),
            vec![pool("dex2", 2, usdc, weth, 2_100_000_000_000_000_000_000_000, 1_000_000_000_000_000_000_000)],
        );

        let config = RouteEngineConfig::default();
        let routes = enumerate(&pools, &[weth], 10, 1000, &config);
        assert!(!routes.is_empty(), "expected at least one profitable route");
        assert!(routes[0].expected_profit > 0);
        assert!(routes[0].net_profit > 0);
    }

    #[test]
    fn zero_reserve_pool_yields_no_route() {
        let weth = Address::repeat_byte(0xAA);
        let usdc = Address::repeat_byte(0xBB);

        let mut pools = HashMap::new();
        pools.insert(DexId::from("dex1"), vec![pool("dex1", 1, weth, usdc, 0, 2_000_000_000_000_000_000_000_000)]);
        pools.insert(
            DexId::from("dex2"),
            vec![pool("dex2", 2, usdc, weth, 2_100_000_000_000_000_000_000_000, 1_000_000_000_000_000_000_000)],
        );

        let config = RouteEngineConfig::default();
        let routes = enumerate(&pools, &[weth], 10, 1000, &config);
        assert!(routes.is_empty());
    }

    #[test]
    fn identical_pools_produce_no_arbitrage() {
        let weth = Address::repeat_byte(0xAA);
        let usdc = Address::repeat_byte(0xBB);

        let mut pools = HashMap::new();
        pools.insert(DexId::from("dex1"), vec![pool("dex1", 1, weth, usdc, 1_000_000, 2_000_000_000)]);
        pools.insert(DexId::from("dex2"), vec![pool("dex2", 2, usdc, weth, 2_000_000_000, 1_000_000)]);

        let config = RouteEngineConfig { probe_amount_in: 1000, ..RouteEngineConfig::default() };
        let routes = enumerate(&pools, &[weth], 10, 1000, &config);
        assert!(routes.is_empty(), "equal prices across pools should never round-trip a profit");
    }
}
