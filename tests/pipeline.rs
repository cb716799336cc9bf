//! End-to-end pipeline test: a Scanner discovers a profitable two-hop route
//! across two scripted V2-style DEXs, publishes it onto the real Opportunity
//! Channel, and a separate Executor (its own `MockRpcAdapter`, as in
//! production where Scanner and Executor never share an adapter instance)
//! picks it up, signs it, and submits it — all driven through the
//! deterministic mock per `SPEC_FULL.md` §10's test-tooling note.

mod common;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use arb_executor::{Executor, ExecutorConfig};
use arb_rpc::{BlockHeader, MockRpcAdapter};
use arb_scanner::{Scanner, ScannerConfig};
use arb_types::{DexConfig, DexId, PoolKind};

fn block(number: u64) -> BlockHeader {
    BlockHeader {
        number,
        hash: alloy::primitives::B256::repeat_byte(number as u8),
        base_fee_per_gas: Some(1_000_000_000),
        transactions: Vec::new(),
    }
}

#[tokio::test]
async fn profitable_route_flows_from_scanner_through_channel_to_executor() {
    let weth = Address::repeat_byte(0xAA);
    let usdc = Address::repeat_byte(0xBB);

    let scanner_adapter = Arc::new(MockRpcAdapter::new());
    scanner_adapter.push_block(block(10));

    let dex1_factory = Address::repeat_byte(0x10);
    let dex1_pair = Address::repeat_byte(0x11);
    common::script_single_v2_pool(
        &scanner_adapter,
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
        &scanner_adapter,
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

    let (tx, rx) = arb_channel::with_capacity(16);
    let mut scanner_config = ScannerConfig {
        dex_configs: vec![dex1, dex2],
        tokens_of_interest: vec![weth, usdc],
        ..ScannerConfig::default()
    };
    scanner_config.engine_config.min_profit_threshold = 0;
    scanner_config.engine_config.gas_price_cap = 0;

    let scanner = Scanner::new(scanner_adapter, tx, scanner_config);
    let scanner_handles = scanner.start();

    let executor_adapter = Arc::new(MockRpcAdapter::new());
    executor_adapter.push_block(block(1));
    executor_adapter.set_estimate_gas(300_000);
    let signer = PrivateKeySigner::from_slice(&[0x22; 32]).expect("valid test signing key");
    let executor_config = ExecutorConfig {
        contract_address: Address::repeat_byte(0x99),
        min_profit_threshold: 0,
        ..ExecutorConfig::default()
    };
    let executor = Executor::new(executor_adapter.clone(), rx, signer, executor_config)
        .await
        .expect("executor should seed its nonce from the mock adapter");
    let executor_handles = executor.start();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if executor.pending_count().await > 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("executor never observed a submitted transaction within the deadline");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(executor_adapter.sent_transactions().len(), 1);
    assert_eq!(executor.pending_count().await, 1);

    scanner.stop();
    executor.stop();
    let _ = tokio::time::timeout(Duration::from_secs(2), scanner_handles.block).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), scanner_handles.mempool).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), scanner_handles.self_health).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), executor_handles.submit).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), executor_handles.monitor).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), executor_handles.nonce_sync).await;
}

#[tokio::test]
async fn emergency_stop_replaces_pending_transactions_and_halts_new_submissions() {
    let adapter = Arc::new(MockRpcAdapter::new());
    adapter.push_block(block(1));
    let (tx, rx) = arb_channel::channel();
    let signer = PrivateKeySigner::from_slice(&[0x33; 32]).expect("valid test signing key");
    let config = ExecutorConfig {
        contract_address: Address::repeat_byte(0x88),
        min_profit_threshold: 0,
        ..ExecutorConfig::default()
    };
    let executor = Executor::new(adapter.clone(), rx, signer, config).await.unwrap();
    let handles = executor.start();

    let route = arb_types::Route {
        start_token: Address::repeat_byte(0xAA),
        amount_in: 1_000_000_000_000_000_000,
        hops: vec![arb_types::Hop {
            dex_id: DexId::from("dex1"),
            pool_address: Address::repeat_byte(1),
            router_address: Address::repeat_byte(2),
            swap_calldata: alloy::primitives::Bytes::new(),
        }],
        expected_output: 1_000_000_000_000_000_000 + 5_000_000_000_000_000_000,
        expected_profit: 5_000_000_000_000_000_000,
        gas_estimate: 300_000,
        gas_cost: 0,
        net_profit: 5_000_000_000_000_000_000,
        created_at_ms: now_ms(),
        source_block: 1,
    };
    tx.send(route);

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if executor.pending_count().await > 0 {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("executor never submitted the seeded route");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    executor.emergency_stop().await;
    assert_eq!(executor.pending_count().await, 1, "the stuck transaction should be replaced, not removed");
    assert_eq!(adapter.sent_transactions().len(), 2, "the original submission plus the emergency replacement");

    executor.stop();
    let _ = tokio::time::timeout(Duration::from_secs(2), handles.submit).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), handles.monitor).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), handles.nonce_sync).await;
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
