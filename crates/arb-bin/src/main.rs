mod config;

use std::sync::Arc;

use alloy::primitives::Address;
use arb_engine::RouteEngineConfig;
use arb_executor::{Executor, ExecutorConfig};
use arb_rpc::{AlloyRpcAdapter, RpcAdapter};
use arb_scanner::{Scanner, ScannerConfig};
use arb_types::{DexConfig, PoolKind};
use clap::Parser;
use config::AppConfig;
use eyre::{Context, Result};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Base-mainnet DEX routers/factories this build ships with by default.
/// Grounded on the `dallonby-mev-base` atomic-executor router table.
fn default_dex_configs() -> Vec<DexConfig> {
    vec![
        DexConfig {
            dex_id: arb_types::DexId::from("uniswap_v2"),
            router: "0x4752ba5dbc23f44d87826276bf6fd6b1c372ad24".parse().unwrap(),
            factory: "0x8909dc15e40173ff4699343b6eb8132c65e18ec6".parse().unwrap(),
            default_fee_numerator: 997,
            default_fee_denominator: 1000,
            kind: PoolKind::ConstantProductV2,
            fee_tiers: Vec::new(),
        },
        DexConfig {
            dex_id: arb_types::DexId::from("sushiswap"),
            router: "0x6bded42c6da8fbf0d2ba55b2fa120c5e0c8d7891".parse().unwrap(),
            factory: "0x71524b4f93c58fcbf659783284e38825f0622859".parse().unwrap(),
            default_fee_numerator: 997,
            default_fee_denominator: 1000,
            kind: PoolKind::ConstantProductV2,
            fee_tiers: Vec::new(),
        },
        DexConfig {
            dex_id: arb_types::DexId::from("aerodrome"),
            router: "0xcf77a3ba9a5ca399b7c97c74d54e5b1beb874e43".parse().unwrap(),
            factory: "0x420dd381b31aef6683db6b902084cb0ffece40da".parse().unwrap(),
            default_fee_numerator: 997,
            default_fee_denominator: 1000,
            kind: PoolKind::ConstantProductV2,
            fee_tiers: Vec::new(),
        },
    ]
}

#[derive(Parser, Debug)]
#[command(name = "arb")]
#[command(about = "Base-chain cyclic-arbitrage scanner and executor")]
#[command(version)]
struct Cli {
    /// Use Base Sepolia testnet endpoints/chain id instead of mainnet.
    #[arg(long)]
    testnet: bool,

    /// Run the Scanner only; never start the Executor.
    #[arg(long)]
    scan_only: bool,

    /// Enable the Route Engine's sharded enumeration path.
    #[arg(long)]
    gpu: bool,

    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(level_from_config: &str, verbose: u8, log_file: Option<&str>) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = match verbose {
        0 => level_from_config.to_string(),
        1 => Level::DEBUG.to_string(),
        _ => Level::TRACE.to_string(),
    };

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&level)).wrap_err("failed to initialize tracing filter")?;

    match log_file {
        Some(path) => {
            let file_appender = tracing_appender::rolling::never(".", path);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(non_blocking).init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(error) = run().await {
        eprintln!("fatal: {error:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config = AppConfig::from_env().map_err(|error| {
        eprintln!("configuration error: {error}");
        error
    })?;

    let _log_guard = init_tracing(&config.log_level, cli.verbose, config.log_file.as_deref())?;

    let chain_id = if cli.testnet { 84532 } else { config.chain_id };
    info!(chain_id, scan_only = cli.scan_only, testnet = cli.testnet, "starting");

    let scanner_adapter: Arc<dyn RpcAdapter> = Arc::new(
        AlloyRpcAdapter::with_ws(config.rpc_urls.clone(), config.ws_rpc_url.clone())
            .await
            .wrap_err("failed to establish Scanner RPC adapter")?,
    );

    let (opportunity_tx, opportunity_rx) = arb_channel::channel();

    let scanner_config = ScannerConfig {
        dex_configs: default_dex_configs(),
        tokens_of_interest: config.token_list.clone(),
        engine_config: RouteEngineConfig {
            gas_price_cap: config.max_gas_price_gwei as u128 * 1_000_000_000,
            parallel: cli.gpu || config.use_gpu,
            ..RouteEngineConfig::default()
        },
        enable_mempool: config.enable_mempool,
        known_routers: default_dex_configs().into_iter().map(|dex| dex.router).collect::<Vec<Address>>(),
        ..ScannerConfig::default()
    };

    let scanner = Scanner::new(scanner_adapter, opportunity_tx, scanner_config);
    let scanner_handles = scanner.start();

    if cli.scan_only {
        info!("running in scan-only mode; Executor will not start");
        tokio::signal::ctrl_c().await.wrap_err("failed to listen for ctrl-c")?;
        scanner.stop();
        let _ = scanner_handles.block.await;
        let _ = scanner_handles.mempool.await;
        let _ = scanner_handles.self_health.await;
        return Ok(());
    }

    let executor_adapter: Arc<dyn RpcAdapter> = Arc::new(
        AlloyRpcAdapter::new(config.rpc_urls.clone())
            .await
            .wrap_err("failed to establish Executor RPC adapter")?,
    );

    let executor_config = ExecutorConfig {
        contract_address: config.contract_address,
        chain_id,
        min_profit_threshold: config.min_profit_threshold,
        max_gas_price_cap: config.max_gas_price_gwei as u128 * 1_000_000_000,
        ..ExecutorConfig::default()
    };

    let executor = Executor::new(executor_adapter, opportunity_rx, config.signer.clone(), executor_config)
        .await
        .wrap_err("failed to initialize Executor")?;
    let executor_handles = executor.start();

    tokio::signal::ctrl_c().await.wrap_err("failed to listen for ctrl-c")?;
    info!("shutdown signal received");

    scanner.stop();
    executor.stop();

    let _ = scanner_handles.block.await;
    let _ = scanner_handles.mempool.await;
    let _ = scanner_handles.self_health.await;
    let _ = executor_handles.submit.await;
    let _ = executor_handles.monitor.await;
    let _ = executor_handles.nonce_sync.await;

    Ok(())
}
