//! Executor: validates scanner proposals, manages nonce and gas policy,
//! signs and submits transactions, monitors inclusion, and sweeps profit.
//!
//! Grounded on `SPEC_FULL.md` §4.6. The submit loop is the Executor's sole
//! nonce authority: the monitor loop's withdrawal requests and the
//! nonce-sync loop's corrections both funnel through the same serialized
//! path instead of spawning independent fire-and-forget writers (see the
//! Open Questions resolution in `SPEC_FULL.md` §9).

pub mod contract;
pub mod signing;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use alloy::sol_types::{SolCall, SolEvent};
use arb_channel::OpportunityReceiver;
use arb_rpc::{RpcAdapter, TransactionReceiptInfo, TxRequest};
use arb_types::{ChainError, InvariantViolation, PendingTx, Route, Token, TransportError, TxState, ValidationError};
use eyre::{Context, Result};
use tokio::sync::{mpsc, Mutex};

use contract::{IArbExecutor, IERC20};

/// Tunables for one Executor instance, built once from the immutable
/// top-level configuration.
#[derive(Clone)]
pub struct ExecutorConfig {
    pub contract_address: Address,
    pub chain_id: u64,
    pub min_profit_threshold: u128,
    /// `MAX_GAS_PRICE_GWEI` converted to wei.
    pub max_gas_price_cap: u128,
    pub route_max_age: Duration,
    pub gas_estimate_cap: u64,
    pub gas_limit_fallback: u64,
    pub monitor_interval: Duration,
    pub nonce_sync_interval: Duration,
    pub withdraw_delay: Duration,
    pub withdraw_dust_floor: u128,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            contract_address: Address::ZERO,
            chain_id: 8453,
            min_profit_threshold: 10_000_000_000_000_000, // 1e16 wei
            max_gas_price_cap: 100_000_000_000,            // 100 gwei
            route_max_age: Duration::from_secs(30),
            gas_estimate_cap: 800_000,
            gas_limit_fallback: 600_000,
            monitor_interval: Duration::from_secs(10),
            nonce_sync_interval: Duration::from_secs(60),
            withdraw_delay: Duration::from_secs(5),
            withdraw_dust_floor: 1_000_000_000_000, // 1e-6 ETH-denominated dust floor
        }
    }
}

struct ExecutorState {
    nonce: u64,
    pending: HashMap<B256, PendingTx>,
    /// The last nonce this authority handed to a successful submission.
    /// The submit and withdrawal paths are the sole writers under `state`'s
    /// lock, so a newly assigned nonce failing to exceed this is a bug, not
    /// a recoverable condition — `record_submission` turns that into an
    /// `InvariantViolation` instead of silently corrupting state.
    last_submitted_nonce: Option<u64>,
}

impl ExecutorState {
    fn record_submission(&mut self, nonce: u64) -> Result<(), InvariantViolation> {
        if let Some(last) = self.last_submitted_nonce {
            if nonce <= last {
                return Err(InvariantViolation(format!(
                    "nonce monotonicity violated: submitted {nonce} after already having submitted {last}"
                )));
            }
        }
        self.last_submitted_nonce = Some(nonce);
        Ok(())
    }
}

struct WithdrawalRequest {
    token: Token,
}

pub struct ExecutorHandles {
    pub submit: tokio::task::JoinHandle<()>,
    pub monitor: tokio::task::JoinHandle<()>,
    pub nonce_sync: tokio::task::JoinHandle<()>,
}

pub struct Executor {
    adapter: Arc<dyn RpcAdapter>,
    receiver: OpportunityReceiver,
    signer: PrivateKeySigner,
    config: ExecutorConfig,
    running: AtomicBool,
    executing: AtomicBool,
    state: Mutex<ExecutorState>,
    withdrawal_tx: mpsc::UnboundedSender<WithdrawalRequest>,
    withdrawal_rx: Mutex<mpsc::UnboundedReceiver<WithdrawalRequest>>,
}

impl Executor {
    /// Builds an Executor and seeds its local nonce from the on-chain value.
    pub async fn new(
        adapter: Arc<dyn RpcAdapter>,
        receiver: OpportunityReceiver,
        signer: PrivateKeySigner,
        config: ExecutorConfig,
    ) -> Result<Arc<Self>> {
        let initial_nonce = adapter
            .get_transaction_count(signer.address())
            .await
            .wrap_err("failed to read initial nonce for executor account")?;
        let (withdrawal_tx, withdrawal_rx) = mpsc::unbounded_channel();

        Ok(Arc::new(Self {
            adapter,
            receiver,
            signer,
            config,
            running: AtomicBool::new(true),
            executing: AtomicBool::new(true),
            state: Mutex::new(ExecutorState {
                nonce: initial_nonce,
                pending: HashMap::new(),
                last_submitted_nonce: None,
            }),
            withdrawal_tx,
            withdrawal_rx: Mutex::new(withdrawal_rx),
        }))
    }

    pub fn start(self: &Arc<Self>) -> ExecutorHandles {
        ExecutorHandles {
            submit: tokio::spawn(self.clone().submit_loop()),
            monitor: tokio::spawn(self.clone().monitor_loop()),
            nonce_sync: tokio::spawn(self.clone().nonce_sync_loop()),
        }
    }

    /// Flips the flag every loop observes at its next suspension point.
    /// Pending transactions are not cancelled; only `emergency_stop` does that.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn local_nonce(&self) -> u64 {
        self.state.lock().await.nonce
    }

    // -- submit loop ----------------------------------------------------

    async fn submit_loop(self: Arc<Self>) {
        let mut withdrawal_rx = self.withdrawal_rx.lock().await;
        while self.running.load(Ordering::Relaxed) {
            tokio::select! {
                route = self.receiver.recv_timed(Duration::from_secs(1)) => {
                    if let Some(route) = route {
                        self.handle_route(route).await;
                    }
                }
                Some(request) = withdrawal_rx.recv() => {
                    self.handle_withdrawal(request).await;
                }
            }
        }
    }

    async fn handle_route(&self, route: Route) {
        if !self.executing.load(Ordering::Relaxed) {
            tracing::debug!("executing disabled (emergency stop); dropping route");
            return;
        }

        if route.net_profit < self.config.min_profit_threshold as i128 {
            let error = ValidationError::BelowProfitThreshold {
                net_profit: route.net_profit,
                threshold: self.config.min_profit_threshold,
            };
            tracing::debug!(error = %error, "dropping route");
            return;
        }

        let age_ms = route.age_ms(now_ms());
        if age_ms > self.config.route_max_age.as_millis() as u64 {
            let error = ValidationError::TooStale {
                age_ms,
                max_age_ms: self.config.route_max_age.as_millis() as u64,
            };
            tracing::debug!(error = %error, "dropping route");
            return;
        }

        let balance_probe = IERC20::balanceOfCall { account: self.config.contract_address }.abi_encode();
        if let Err(probe_error) = self.adapter.call(route.start_token, balance_probe.into()).await {
            let error = ValidationError::TokenSanityFailed {
                token: route.start_token.to_string(),
                reason: probe_error.to_string(),
            };
            tracing::debug!(error = %error, "dropping route");
            return;
        }

        let params = IArbExecutor::ArbitrageParams {
            tokenIn: route.start_token,
            amountIn: U256::from(route.amount_in),
            dexRouters: route.hops.iter().map(|hop| hop.router_address).collect(),
            swapData: route.hops.iter().map(|hop| hop.swap_calldata.clone()).collect(),
            expectedProfit: U256::from(route.expected_profit.max(0) as u128),
        };
        let calldata: Bytes = IArbExecutor::executeArbitrageCall { params }.abi_encode().into();

        let estimate_request = TxRequest {
            to: self.config.contract_address,
            from: self.signer.address(),
            nonce: None,
            gas_limit: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            value: U256::ZERO,
            data: calldata.clone(),
        };
        let gas_estimate = match self.adapter.estimate_gas(&estimate_request).await {
            Ok(estimate) if estimate <= self.config.gas_estimate_cap => estimate,
            Ok(estimate) => {
                let error = ValidationError::GasEstimateTooHigh { gas_estimate: estimate, cap: self.config.gas_estimate_cap };
                tracing::debug!(error = %error, "dropping route");
                return;
            }
            Err(error) => {
                tracing::debug!(error = %error, "gas estimation failed; dropping route");
                return;
            }
        };

        let block = match self.adapter.get_block_latest().await {
            Ok(block) => block,
            Err(error) => {
                tracing::warn!(error = %error, "failed to fetch latest block for gas pricing; dropping route this cycle");
                return;
            }
        };
        let base_fee = block.base_fee_per_gas.unwrap_or(0);
        let max_fee_per_gas = (base_fee.saturating_mul(3) / 2).min(self.config.max_gas_price_cap);
        let max_priority_fee_per_gas = 2_000_000_000u128.min(max_fee_per_gas / 10);

        let gas_limit = if gas_estimate == 0 {
            self.config.gas_limit_fallback
        } else {
            (gas_estimate as u128 * 115 / 100) as u64
        };

        let gas_cost = gas_limit as u128 * max_fee_per_gas;
        if gas_cost >= route.expected_output.saturating_sub(route.amount_in).max(route.expected_profit.max(0) as u128) {
            let error = ValidationError::GasExceedsProfit { gas_cost, expected_profit: route.expected_profit.max(0) as u128 };
            tracing::debug!(error = %error, "dropping route");
            return;
        }

        let mut state = self.state.lock().await;
        let nonce = state.nonce;
        drop(state);

        let signed = match signing::build_and_sign(
            &self.signer,
            self.config.chain_id,
            nonce,
            self.config.contract_address,
            U256::ZERO,
            calldata,
            gas_limit,
            max_fee_per_gas,
            max_priority_fee_per_gas,
        )
        .await
        {
            Ok(signed) => signed,
            Err(error) => {
                tracing::warn!(error = %error, "failed to sign arbitrage transaction");
                return;
            }
        };

        match self.adapter.send_raw_transaction(signed.raw).await {
            Ok(tx_hash) => {
                let mut state = self.state.lock().await;
                if let Err(violation) = state.record_submission(nonce) {
                    drop(state);
                    tracing::error!(error = %violation, "nonce monotonicity invariant violated; submit loop exiting");
                    self.stop();
                    return;
                }
                state.nonce = nonce + 1;
                state.pending.insert(
                    tx_hash,
                    PendingTx {
                        tx_hash,
                        nonce,
                        route: Some(route),
                        submitted_at: Instant::now(),
                        fee_cap: max_fee_per_gas,
                        tip_cap: max_priority_fee_per_gas,
                        state: TxState::Pending,
                    },
                );
                tracing::info!(tx_hash = %tx_hash, nonce, "submitted arbitrage transaction");
            }
            Err(error) => self.handle_send_failure(error),
        }
    }

    /// Classifies a failed send into the transport/chain taxonomy instead of
    /// re-deriving the distinction at every call site.
    fn handle_send_failure(&self, error: eyre::Report) {
        let endpoint = self.adapter.current_endpoint();
        let message = error.to_string().to_lowercase();
        if message.contains("timeout") {
            let transport_error = TransportError::Timeout { endpoint, timeout_secs: 10 };
            if transport_error.is_recoverable_by_failover() {
                tracing::warn!(error = %transport_error, "send failed on a transport error; switching endpoint");
                self.adapter.advance_endpoint();
            }
        } else if message.contains("connection") {
            let transport_error = TransportError::Connection { endpoint, source: error };
            if transport_error.is_recoverable_by_failover() {
                tracing::warn!(error = %transport_error, "send failed on a transport error; switching endpoint");
                self.adapter.advance_endpoint();
            }
        } else {
            let chain_error = ChainError::Reverted { reason: error.to_string() };
            tracing::warn!(error = %chain_error, "chain rejected arbitrage submission; nonce not consumed");
        }
    }

    async fn handle_withdrawal(&self, request: WithdrawalRequest) {
        // The wire contract (§6) exposes no separate owner-withdraw call; the
        // only token-draining method on the interface is `emergencyWithdraw`,
        // so profit sweeps reuse it.
        let calldata: Bytes = IArbExecutor::emergencyWithdrawCall { token: request.token }.abi_encode().into();

        let mut state = self.state.lock().await;
        let nonce = state.nonce;
        drop(state);

        let signed = match signing::build_and_sign(
            &self.signer,
            self.config.chain_id,
            nonce,
            self.config.contract_address,
            U256::ZERO,
            calldata,
            150_000,
            self.config.max_gas_price_cap,
            2_000_000_000,
        )
        .await
        {
            Ok(signed) => signed,
            Err(error) => {
                tracing::warn!(error = %error, token = %request.token, "failed to sign withdrawal transaction");
                return;
            }
        };

        match self.adapter.send_raw_transaction(signed.raw).await {
            Ok(tx_hash) => {
                let mut state = self.state.lock().await;
                if let Err(violation) = state.record_submission(nonce) {
                    drop(state);
                    tracing::error!(error = %violation, "nonce monotonicity invariant violated; submit loop exiting");
                    self.stop();
                    return;
                }
                state.nonce = nonce + 1;
                state.pending.insert(
                    tx_hash,
                    PendingTx {
                        tx_hash,
                        nonce,
                        route: None,
                        submitted_at: Instant::now(),
                        fee_cap: self.config.max_gas_price_cap,
                        tip_cap: 2_000_000_000,
                        state: TxState::Pending,
                    },
                );
                tracing::info!(tx_hash = %tx_hash, token = %request.token, "submitted profit withdrawal");
            }
            Err(error) => self.handle_send_failure(error),
        }
    }

    // -- monitor loop -----------------------------------------------------

    async fn monitor_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.monitor_interval);
        while self.running.load(Ordering::Relaxed) {
            interval.tick().await;
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            self.monitor_once().await;
        }
    }

    async fn monitor_once(&self) {
        let snapshot: Vec<(B256, PendingTx)> = {
            let state = self.state.lock().await;
            state.pending.iter().map(|(hash, tx)| (*hash, tx.clone())).collect()
        };

        let now = Instant::now();
        for (tx_hash, pending) in snapshot {
            match self.adapter.get_transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if receipt.status {
                        self.handle_included(&pending, &receipt).await;
                    } else {
                        let error = ChainError::Reverted { reason: format!("tx_hash={tx_hash} nonce={}", pending.nonce) };
                        tracing::warn!(error = %error, "transaction reverted on-chain");
                    }
                    self.state.lock().await.pending.remove(&tx_hash);
                }
                Ok(None) => {
                    if pending.is_stuck(now) {
                        tracing::warn!(tx_hash = %tx_hash, nonce = pending.nonce, "no receipt after inclusion deadline; marking dropped");
                        self.state.lock().await.pending.remove(&tx_hash);
                    }
                }
                Err(error) => {
                    tracing::debug!(tx_hash = %tx_hash, error = %error, "receipt lookup failed this cycle");
                }
            }
        }
    }

    async fn handle_included(self: &Self, pending: &PendingTx, receipt: &TransactionReceiptInfo) {
        let Some(log) = receipt
            .logs
            .iter()
            .find(|log| log.topics.first() == Some(&IArbExecutor::ArbitrageExecuted::SIGNATURE_HASH))
        else {
            tracing::debug!(tx_hash = %pending.tx_hash, "included transaction carried no ArbitrageExecuted event");
            return;
        };

        let decoded = match IArbExecutor::ArbitrageExecuted::decode_raw_log(log.topics.iter().copied(), &log.data, true) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(tx_hash = %pending.tx_hash, error = %error, "failed to decode ArbitrageExecuted event");
                return;
            }
        };

        let gas_cost = U256::from(receipt.gas_used) * U256::from(receipt.effective_gas_price);
        let net = decoded.profit.saturating_sub(gas_cost);
        tracing::info!(
            tx_hash = %pending.tx_hash,
            token = %decoded.token,
            gross_profit = %decoded.profit,
            net_profit = %net,
            "arbitrage included"
        );

        if net <= U256::from(self.config.withdraw_dust_floor) {
            tracing::debug!(token = %decoded.token, net = %net, "net profit below dust floor; not sweeping");
            return;
        }

        let executor = Arc::new(WithdrawalTimer {
            withdrawal_tx: self.withdrawal_tx.clone(),
            token: decoded.token,
        });
        let delay = self.config.withdraw_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            executor.fire();
        });
    }

    // -- nonce sync loop --------------------------------------------------

    async fn nonce_sync_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.nonce_sync_interval);
        while self.running.load(Ordering::Relaxed) {
            interval.tick().await;
            if !self.running.load(Ordering::Relaxed) {
                return;
            }
            match self.adapter.get_transaction_count(self.signer.address()).await {
                Ok(chain_nonce) => {
                    let mut state = self.state.lock().await;
                    if chain_nonce != state.nonce {
                        tracing::warn!(local = state.nonce, chain = chain_nonce, "nonce diverged from chain; adopting on-chain value");
                        state.nonce = chain_nonce;
                    }
                }
                Err(error) => tracing::warn!(error = %error, "nonce sync failed to read on-chain nonce"),
            }
        }
    }

    // -- emergency stop ----------------------------------------------------

    /// Disables further submission and replaces every pending transaction
    /// with a same-nonce, zero-value self-transfer at an elevated fee cap,
    /// per `SPEC_FULL.md` §4.6.
    pub async fn emergency_stop(&self) {
        self.executing.store(false, Ordering::Relaxed);

        let pending: Vec<(B256, PendingTx)> = {
            let state = self.state.lock().await;
            state.pending.iter().map(|(hash, tx)| (*hash, tx.clone())).collect()
        };

        for (old_hash, tx) in pending {
            let fee_cap = self.config.max_gas_price_cap.saturating_mul(3) / 2;
            let tip_cap = tx.tip_cap / 5;

            let signed = match signing::build_and_sign(
                &self.signer,
                self.config.chain_id,
                tx.nonce,
                self.signer.address(),
                U256::ZERO,
                Bytes::new(),
                21_000,
                fee_cap,
                tip_cap,
            )
            .await
            {
                Ok(signed) => signed,
                Err(error) => {
                    tracing::error!(error = %error, nonce = tx.nonce, "failed to build emergency replacement transaction");
                    continue;
                }
            };

            match self.adapter.send_raw_transaction(signed.raw).await {
                Ok(new_hash) => {
                    let mut state = self.state.lock().await;
                    state.pending.remove(&old_hash);
                    state.pending.insert(
                        new_hash,
                        PendingTx {
                            tx_hash: new_hash,
                            nonce: tx.nonce,
                            route: tx.route,
                            submitted_at: Instant::now(),
                            fee_cap,
                            tip_cap,
                            state: TxState::Replaced,
                        },
                    );
                    tracing::warn!(old_tx_hash = %old_hash, new_tx_hash = %new_hash, nonce = tx.nonce, "replaced stuck transaction");
                }
                Err(error) => {
                    tracing::error!(error = %error, nonce = tx.nonce, "emergency replacement send failed");
                }
            }
        }
    }
}

/// Carries a scheduled withdrawal back onto the nonce authority's channel
/// after the delay elapses, keeping withdrawal submission serialized with
/// route submission rather than a second independent writer.
struct WithdrawalTimer {
    withdrawal_tx: mpsc::UnboundedSender<WithdrawalRequest>,
    token: Token,
}

impl WithdrawalTimer {
    fn fire(&self) {
        let _ = self.withdrawal_tx.send(WithdrawalRequest { token: self.token });
    }
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Address};
    use arb_rpc::{BlockHeader, MockRpcAdapter, RawLog, TransactionReceiptInfo};
    use arb_types::Hop;
    use std::sync::Arc as StdArc;

    fn test_signer() -> PrivateKeySigner {
        PrivateKeySigner::from_slice(&[0x11; 32]).expect("valid test key")
    }

    fn sample_route(net_profit: i128, created_at_ms: u64) -> Route {
        Route {
            start_token: Address::repeat_byte(0xAA),
            amount_in: 1_000_000_000_000_000_000,
            hops: vec![Hop {
                dex_id: arb_types::DexId::from("dex1"),
                pool_address: Address::repeat_byte(1),
                router_address: Address::repeat_byte(2),
                swap_calldata: Bytes::new(),
            }],
            expected_output: 1_000_000_000_000_000_000 + net_profit.max(0) as u128,
            expected_profit: net_profit,
            gas_estimate: 300_000,
            gas_cost: 0,
            net_profit,
            created_at_ms,
            source_block: 1,
        }
    }

    async fn build_executor(adapter: StdArc<MockRpcAdapter>) -> (Arc<Executor>, arb_channel::OpportunitySender) {
        adapter.push_block(BlockHeader {
            number: 1,
            hash: B256::ZERO,
            base_fee_per_gas: Some(1_000_000_000),
            transactions: Vec::new(),
        });
        let (tx, rx) = arb_channel::channel();
        let config = ExecutorConfig {
            contract_address: address!("1000000000000000000000000000000000000001"),
            min_profit_threshold: 0,
            ..ExecutorConfig::default()
        };
        let executor = Executor::new(adapter, rx, test_signer(), config).await.unwrap();
        (executor, tx)
    }

    #[tokio::test]
    async fn stale_route_is_dropped_without_submission() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        let (executor, _tx) = build_executor(adapter.clone()).await;

        let route = sample_route(1_000_000_000_000_000, 0);
        executor.handle_route(route).await;

        assert_eq!(executor.pending_count().await, 0);
        assert!(adapter.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn gas_exceeding_profit_is_rejected_without_nonce_consumption() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        adapter.set_estimate_gas(800_000);
        let (executor, _tx) = build_executor(adapter.clone()).await;

        let initial_nonce = executor.local_nonce().await;
        let route = sample_route(1, now_ms());
        executor.handle_route(route).await;

        assert_eq!(executor.local_nonce().await, initial_nonce);
        assert!(adapter.sent_transactions().is_empty());
    }

    #[tokio::test]
    async fn profitable_route_is_submitted_and_increments_nonce() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        adapter.set_estimate_gas(300_000);
        let (executor, _tx) = build_executor(adapter.clone()).await;

        let initial_nonce = executor.local_nonce().await;
        let route = sample_route(5_000_000_000_000_000_000, now_ms());
        executor.handle_route(route).await;

        assert_eq!(executor.local_nonce().await, initial_nonce + 1);
        assert_eq!(executor.pending_count().await, 1);
        assert_eq!(adapter.sent_transactions().len(), 1);
    }

    #[tokio::test]
    async fn send_failure_switches_endpoint_and_does_not_consume_nonce() {
        let adapter = StdArc::new(MockRpcAdapter::with_endpoints(["e1".to_string(), "e2".to_string()]));
        adapter.set_estimate_gas(300_000);
        adapter.fail_next_sends(1);
        let (executor, _tx) = build_executor(adapter.clone()).await;

        let initial_nonce = executor.local_nonce().await;
        let route = sample_route(5_000_000_000_000_000_000, now_ms());
        executor.handle_route(route).await;

        assert_eq!(executor.local_nonce().await, initial_nonce, "failed send must not consume the nonce");
        // The mock already advances its ring internally to simulate the
        // failing endpoint dropping out; the executor's own transport-error
        // handling advances it a second time, landing back on "e1".
        assert_eq!(adapter.current_ring_index_url(), "e1");
    }

    #[tokio::test]
    async fn nonce_resync_adopts_chain_value_on_divergence() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        let signer = test_signer();
        adapter.set_nonce(signer.address(), 40);
        let (_tx, rx) = arb_channel::channel();
        let config = ExecutorConfig::default();
        let executor = Executor::new(adapter.clone(), rx, signer.clone(), config).await.unwrap();

        {
            let mut state = executor.state.lock().await;
            state.nonce = 42;
        }

        adapter.set_nonce(signer.address(), 40);
        executor.nonce_sync_once_for_test().await;
        assert_eq!(executor.local_nonce().await, 40);
    }

    #[tokio::test]
    async fn monitor_marks_stuck_transaction_dropped_after_deadline() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        let (executor, _tx) = build_executor(adapter.clone()).await;

        {
            let mut state = executor.state.lock().await;
            state.pending.insert(
                B256::repeat_byte(9),
                PendingTx {
                    tx_hash: B256::repeat_byte(9),
                    nonce: 0,
                    route: None,
                    submitted_at: Instant::now() - Duration::from_secs(301),
                    fee_cap: 0,
                    tip_cap: 0,
                    state: TxState::Pending,
                },
            );
        }

        executor.monitor_once().await;
        assert_eq!(executor.pending_count().await, 0);
    }

    #[tokio::test]
    async fn monitor_removes_entry_on_included_receipt() {
        let adapter = StdArc::new(MockRpcAdapter::new());
        let (executor, _tx) = build_executor(adapter.clone()).await;

        let tx_hash = B256::repeat_byte(7);
        {
            let mut state = executor.state.lock().await;
            state.pending.insert(
                tx_hash,
                PendingTx {
                    tx_hash,
                    nonce: 0,
                    route: None,
                    submitted_at: Instant::now(),
                    fee_cap: 0,
                    tip_cap: 0,
                    state: TxState::Pending,
                },
            );
        }
        adapter.set_receipt(
            tx_hash,
            TransactionReceiptInfo {
                transaction_hash: tx_hash,
                status: true,
                gas_used: 200_000,
                effective_gas_price: 1_000_000_000,
                logs: vec![RawLog {
                    address: Address::repeat_byte(1),
                    topics: vec![IArbExecutor::ArbitrageExecuted::SIGNATURE_HASH],
                    data: Bytes::new(),
                }],
            },
        );

        executor.monitor_once().await;
        assert_eq!(executor.pending_count().await, 0);
    }
}

#[cfg(test)]
impl Executor {
    /// Test-only hook exercising the nonce-sync loop's body without waiting
    /// on its `tokio::time::interval`.
    async fn nonce_sync_once_for_test(&self) {
        match self.adapter.get_transaction_count(self.signer.address()).await {
            Ok(chain_nonce) => {
                let mut state = self.state.lock().await;
                if chain_nonce != state.nonce {
                    state.nonce = chain_nonce;
                }
            }
            Err(_) => {}
        }
    }
}
