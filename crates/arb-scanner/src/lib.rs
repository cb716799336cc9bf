//! Scanner: orchestrates block/mempool subscription, triggers pool refresh
//! and route enumeration, and publishes profitable routes onto the
//! Opportunity Channel.
//!
//! Grounded on `SPEC_FULL.md` §4.5. The Scanner exclusively owns the Pool
//! Registry and Route Engine configuration it is constructed with; it holds
//! its own `RpcAdapter` instance, independent of the Executor's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, B256};
use arb_channel::OpportunitySender;
use arb_engine::RouteEngineConfig;
use arb_registry::PoolRegistry;
use arb_rpc::{BlockHeader, RpcAdapter};
use arb_types::{DexConfig, Token};
use futures::StreamExt;

/// Tunables for one Scanner instance. Built once at startup from the
/// immutable top-level configuration and never mutated afterward.
#[derive(Clone)]
pub struct ScannerConfig {
    pub dex_configs: Vec<DexConfig>,
    pub tokens_of_interest: Vec<Token>,
    /// How many ranked pools per DEX are fed to the Route Engine each cycle.
    pub top_k: usize,
    pub engine_config: RouteEngineConfig,
    pub enable_mempool: bool,
    /// Router addresses the mempool loop treats as arbitrage-relevant.
    pub known_routers: Vec<Address>,
    /// A single block's analysis exceeding this logs a warning, per §4.5.
    pub block_analysis_warn: Duration,
    pub backoff_initial: Duration,
    pub backoff_cap: Duration,
    pub self_health_interval: Duration,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            dex_configs: Vec::new(),
            tokens_of_interest: Vec::new(),
            top_k: 20,
            engine_config: RouteEngineConfig::default(),
            enable_mempool: false,
            known_routers: Vec::new(),
            block_analysis_warn: Duration::from_secs(1),
            backoff_initial: Duration::from_millis(100),
            backoff_cap: Duration::from_secs(5),
            self_health_interval: Duration::from_secs(30),
        }
    }
}

/// Join handles for the three loops spawned by [`Scanner::start`].
pub struct ScannerHandles {
    pub block: tokio::task::JoinHandle<()>,
    pub mempool: tokio::task::JoinHandle<()>,
    pub self_health: tokio::task::JoinHandle<()>,
}

pub struct Scanner {
    adapter: Arc<dyn RpcAdapter>,
    registry: PoolRegistry,
    sender: OpportunitySender,
    config: ScannerConfig,
    running: AtomicBool,
    blocks_processed: AtomicU64,
    routes_emitted: AtomicU64,
    mempool_candidates_seen: AtomicU64,
}

impl Scanner {
    pub fn new(adapter: Arc<dyn RpcAdapter>, sender: OpportunitySender, config: ScannerConfig) -> Arc<Self> {
        let registry = PoolRegistry::new(adapter.clone(), config.dex_configs.clone(), config.tokens_of_interest.clone());
        Arc::new(Self {
            adapter,
            registry,
            sender,
            config,
            running: AtomicBool::new(true),
            blocks_processed: AtomicU64::new(0),
            routes_emitted: AtomicU64::new(0),
            mempool_candidates_seen: AtomicU64::new(0),
        })
    }

    /// Spawns the block, mempool, and self-health loops. The Scanner never
    /// exits any of them except through [`Scanner::stop`].
    pub fn start(self: &Arc<Self>) -> ScannerHandles {
        ScannerHandles {
            block: tokio::spawn(self.clone().block_loop()),
            mempool: tokio::spawn(self.clone().mempool_loop()),
            self_health: tokio::spawn(self.clone().self_health_loop()),
        }
    }

    /// Flips the flag every loop observes at its next suspension point.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed.load(Ordering::Relaxed)
    }

    pub fn routes_emitted(&self) -> u64 {
        self.routes_emitted.load(Ordering::Relaxed)
    }

    async fn block_loop(self: Arc<Self>) {
        let mut backoff = self.config.backoff_initial;
        while self.running.load(Ordering::Relaxed) {
            match self.adapter.subscribe_new_heads().await {
                Ok(mut stream) => {
                    backoff = self.config.backoff_initial;
                    while let Some(header) = stream.next().await {
                        if !self.running.load(Ordering::Relaxed) {
                            return;
                        }
                        self.process_block(header).await;
                    }
                    tracing::warn!("new-heads subscription closed; resubscribing after backoff");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "failed to subscribe to new heads");
                }
            }
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.config.backoff_cap);
        }
    }

    async fn process_block(&self, header: BlockHeader) {
        let span = tracing::info_span!("block_analysis", block = header.number);
        let _guard = span.enter();
        let started = Instant::now();

        let mut pools_by_dex = HashMap::new();
        for dex in &self.config.dex_configs {
            let snapshots = self.registry.refresh(&dex.dex_id, header.number).await;
            let capped: Vec<_> = snapshots.into_iter().take(self.config.top_k).collect();
            pools_by_dex.insert(dex.dex_id.clone(), capped);
        }

        let now = now_ms();
        let routes = if self.config.engine_config.parallel {
            arb_engine::enumerate_parallel(
                Arc::new(pools_by_dex),
                self.config.tokens_of_interest.clone(),
                header.number,
                now,
                self.config.engine_config.clone(),
            )
            .await
        } else {
            arb_engine::enumerate(&pools_by_dex, &self.config.tokens_of_interest, header.number, now, &self.config.engine_config)
        };

        let route_count = routes.len();
        for route in routes {
            self.sender.send(route);
        }
        self.routes_emitted.fetch_add(route_count as u64, Ordering::Relaxed);
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);

        let elapsed = started.elapsed();
        if elapsed > self.config.block_analysis_warn {
            tracing::warn!(
                block = header.number,
                elapsed_ms = elapsed.as_millis() as u64,
                "block analysis exceeded warning threshold; subscription was not blocked"
            );
        }
    }

    async fn mempool_loop(self: Arc<Self>) {
        if !self.config.enable_mempool {
            return;
        }

        let mut backoff = self.config.backoff_initial;
        while self.running.load(Ordering::Relaxed) {
            match self.adapter.subscribe_pending_tx().await {
                Ok(mut stream) => {
                    backoff = self.config.backoff_initial;
                    while let Some(tx_hash) = stream.next().await {
                        if !self.running.load(Ordering::Relaxed) {
                            return;
                        }
                        self.observe_pending_tx(tx_hash).await;
                    }
                    tracing::warn!("pending-tx subscription closed; resubscribing after backoff");
                }
                Err(error) => {
                    tracing::warn!(error = %error, "failed to subscribe to pending transactions");
                }
            }
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(self.config.backoff_cap);
        }
    }

    /// Records pending transactions bound for a known router. This is a
    /// future extension point only — the base core never turns a mempool
    /// observation into an enqueued Route.
    async fn observe_pending_tx(&self, tx_hash: B256) {
        let Ok(Some(tx)) = self.adapter.get_transaction(tx_hash).await else {
            return;
        };
        let Some(to) = tx.to else {
            return;
        };
        if self.config.known_routers.contains(&to) {
            self.mempool_candidates_seen.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tx_hash = %tx_hash, router = %to, "observed pending tx addressed to a known router");
        }
    }

    async fn self_health_loop(self: Arc<Self>) {
        while self.running.load(Ordering::Relaxed) {
            tokio::time::sleep(self.config.self_health_interval).await;
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            tracing::info!(
                blocks_processed = self.blocks_processed.load(Ordering::Relaxed),
                routes_emitted = self.routes_emitted.load(Ordering::Relaxed),
                channel_drops = self.sender.dropped_count(),
                mempool_candidates = self.mempool_candidates_seen.load(Ordering::Relaxed),
                "scanner self-health"
            );
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}
