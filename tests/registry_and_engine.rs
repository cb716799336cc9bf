//! Drives the Pool Registry's V2 discovery path against a scripted
//! `MockRpcAdapter` standing in for two real Uniswap-V2-style DEXs, then
//! feeds the resulting snapshots into the Route Engine — end to end through
//! real ABI encode/decode, not just the engine's literal-snapshot unit tests.

mod common;

use std::sync::Arc;

use alloy::primitives::Address;
use arb_registry::PoolRegistry;
use arb_rpc::MockRpcAdapter;
use arb_types::{DexConfig, DexId, PoolKind};

#[tokio::test]
async fn divergent_price_pools_across_two_dexs_yield_a_profitable_route() {
    let adapter = Arc::new(MockRpcAdapter::new());

    let weth = Address::repeat_byte(0xAA);
    let usdc = Address::repeat_byte(0xBB);

    let dex1_factory = Address::repeat_byte(0x10);
    let dex1_pair = Address::repeat_byte(0x11);
    common::script_single_v2_pool(
        &adapter,
        dex1_factory,
        dex1_pair,
        weth,
        usdc,
        1_000_000_000_000_000_000_000,
        2_000_000_000_000_000_000_000_000,
    );

    let dex2_factory = Address::repeat_byte(0x20);
    let dex2_pair = Address::repeat_byte(0x21);
    common::script_single_v2_pool(
        &adapter,
        dex2_factory,
        dex2_pair,
        usdc,
        weth,
        2_100_000_000_000_000_000_000_000,
        1_000_000_000_000_000_000_000,
    );

    let dex1 = DexConfig {
        dex_id: DexId::from("dex1"),
        router: Address::repeat_byte(0x12),
        factory: dex1_factory,
        default_fee_numerator: 997,
        default_fee_denominator: 1000,
        kind: PoolKind::ConstantProductV2,
        fee_tiers: Vec::new(),
    };
    let dex2 = DexConfig {
        dex_id: DexId::from("dex2"),
        router: Address::repeat_byte(0x22),
        factory: dex2_factory,
        default_fee_numerator: 997,
        default_fee_denominator: 1000,
        kind: PoolKind::ConstantProductV2,
        fee_tiers: Vec::new(),
    };

    let registry = PoolRegistry::new(adapter, vec![dex1.clone(), dex2.clone()], vec![weth, usdc]);

    let dex1_snapshots = registry.refresh(&dex1.dex_id, 10).await;
    let dex2_snapshots = registry.refresh(&dex2.dex_id, 10).await;
    assert_eq!(dex1_snapshots.len(), 1, "registry should have discovered exactly one dex1 pool via the factory/pair scripting");
    assert_eq!(dex2_snapshots.len(), 1, "registry should have discovered exactly one dex2 pool via the factory/pair scripting");

    let mut pools_by_dex = std::collections::HashMap::new();
    pools_by_dex.insert(dex1.dex_id.clone(), dex1_snapshots);
    pools_by_dex.insert(dex2.dex_id.clone(), dex2_snapshots);

    let config = arb_engine::RouteEngineConfig::default();
    let routes = arb_engine::enumerate(&pools_by_dex, &[weth], 10, 1_000, &config);

    assert!(!routes.is_empty(), "divergent V2 pools discovered through the registry should round-trip a profitable route");
    assert!(routes[0].expected_profit > 0);
    assert!(routes[0].net_profit > 0);
    assert_eq!(routes[0].hops.len(), 2);
}

#[tokio::test]
async fn unconfigured_dex_is_skipped_without_aborting_the_cycle() {
    let adapter = Arc::new(MockRpcAdapter::new());
    let registry = PoolRegistry::new(adapter, Vec::new(), Vec::new());
    let snapshots = registry.refresh(&DexId::from("ghost_dex"), 1).await;
    assert!(snapshots.is_empty());
}
