//! A deterministic, in-memory `RpcAdapter` double for tests.
//!
//! Lets the Scanner, the Executor, and integration tests drive the whole
//! core without a live chain, per the RPC provider abstraction note in
//! `SPEC_FULL.md` §9.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use eyre::{eyre, Result};
use futures::stream::{self, BoxStream, StreamExt};

use crate::adapter::{
    BlockHeader, RpcAdapter, TransactionInfo, TransactionReceiptInfo, TxRequest,
};
use crate::ring::EndpointRing;

#[derive(Default)]
struct MockState {
    blocks: Vec<BlockHeader>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    receipts: HashMap<B256, TransactionReceiptInfo>,
    sent: Vec<Bytes>,
    next_tx_hash: u64,
    estimate_gas: u64,
    /// When `Some(n)`, `send_raw_transaction` fails the next `n` calls before succeeding.
    send_failures_remaining: u32,
    /// Scripted `eth_call` responses, keyed by exact `(to, calldata)` match.
    /// Lets integration tests stand a real contract ABI up behind the mock
    /// (e.g. a Uniswap V2 factory/pair) instead of every `call` returning
    /// empty bytes.
    call_responses: HashMap<(Address, Bytes), Bytes>,
}

/// A scriptable `RpcAdapter` used by unit and integration tests.
pub struct MockRpcAdapter {
    state: Mutex<MockState>,
    ring: Mutex<EndpointRing>,
}

impl MockRpcAdapter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                estimate_gas: 200_000,
                ..Default::default()
            }),
            ring: Mutex::new(EndpointRing::new(["mock://primary".to_string()])),
        }
    }

    pub fn with_endpoints(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            state: Mutex::new(MockState {
                estimate_gas: 200_000,
                ..Default::default()
            }),
            ring: Mutex::new(EndpointRing::new(urls)),
        }
    }

    pub fn push_block(&self, header: BlockHeader) {
        self.state.lock().expect("mock state poisoned").blocks.push(header);
    }

    pub fn set_balance(&self, token_or_account: Address, balance: U256) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .balances
            .insert(token_or_account, balance);
    }

    pub fn set_nonce(&self, account: Address, nonce: u64) {
        self.state.lock().expect("mock state poisoned").nonces.insert(account, nonce);
    }

    pub fn set_receipt(&self, tx_hash: B256, receipt: TransactionReceiptInfo) {
        self.state.lock().expect("mock state poisoned").receipts.insert(tx_hash, receipt);
    }

    pub fn set_estimate_gas(&self, gas: u64) {
        self.state.lock().expect("mock state poisoned").estimate_gas = gas;
    }

    /// Makes the next `n` calls to `send_raw_transaction` fail with a
    /// transport-flavored error, to exercise the failover scenario.
    pub fn fail_next_sends(&self, n: u32) {
        self.state.lock().expect("mock state poisoned").send_failures_remaining = n;
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.state.lock().expect("mock state poisoned").sent.clone()
    }

    pub fn current_ring_index_url(&self) -> String {
        self.ring.lock().expect("ring poisoned").current().url.clone()
    }

    /// Scripts the response to a future `call(to, calldata)` with an exact
    /// calldata match. Unscripted calls keep falling back to empty bytes.
    pub fn set_call_response(&self, to: Address, calldata: Bytes, response: Bytes) {
        self.state
            .lock()
            .expect("mock state poisoned")
            .call_responses
            .insert((to, calldata), response);
    }
}

impl Default for MockRpcAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcAdapter for MockRpcAdapter {
    async fn get_block_latest(&self) -> Result<BlockHeader> {
        self.state
            .lock()
            .expect("mock state poisoned")
            .blocks
            .last()
            .cloned()
            .ok_or_else(|| eyre!("mock adapter has no blocks queued"))
    }

    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>> {
        Ok(self
            .state
            .lock()
            .expect("mock state poisoned")
            .blocks
            .iter()
            .find(|header| header.hash == hash)
            .cloned())
    }

    async fn get_transaction(&self, _hash: B256) -> Result<Option<TransactionInfo>> {
        Ok(None)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceiptInfo>> {
        Ok(self.state.lock().expect("mock state poisoned").receipts.get(&hash).cloned())
    }

    async fn get_balance(&self, address: Address) -> Result<U256> {
        Ok(self
            .state
            .lock()
            .expect("mock state poisoned")
            .balances
            .get(&address)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn get_transaction_count(&self, address: Address) -> Result<u64> {
        Ok(self.state.lock().expect("mock state poisoned").nonces.get(&address).copied().unwrap_or(0))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let state = self.state.lock().expect("mock state poisoned");
        if let Some(response) = state.call_responses.get(&(to, calldata)) {
            return Ok(response.clone());
        }
        // Token-sanity probes in the submit loop only check callability, not
        // a decoded value, so an empty successful response is sufficient
        // for any call that hasn't been scripted.
        Ok(Bytes::new())
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64> {
        Ok(self.state.lock().expect("mock state poisoned").estimate_gas)
    }

    async fn send_raw_transaction(&self, signed: Bytes) -> Result<B256> {
        {
            let mut state = self.state.lock().expect("mock state poisoned");
            if state.send_failures_remaining > 0 {
                state.send_failures_remaining -= 1;
                drop(state);
                self.ring.lock().expect("ring poisoned").advance();
                return Err(eyre!("connection reset by mock endpoint {}", self.current_ring_index_url()));
            }
        }

        let mut state = self.state.lock().expect("mock state poisoned");
        state.next_tx_hash += 1;
        let hash = B256::from(U256::from(state.next_tx_hash));
        state.sent.push(signed);
        Ok(hash)
    }

    async fn subscribe_new_heads(&self) -> Result<BoxStream<'static, BlockHeader>> {
        let blocks = self.state.lock().expect("mock state poisoned").blocks.clone();
        Ok(stream::iter(blocks).boxed())
    }

    async fn subscribe_pending_tx(&self) -> Result<BoxStream<'static, B256>> {
        Ok(stream::empty().boxed())
    }

    fn current_endpoint(&self) -> String {
        self.current_ring_index_url()
    }

    fn advance_endpoint(&self) {
        self.ring.lock().expect("ring poisoned").advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_failure_advances_ring_then_recovers() {
        let mock = MockRpcAdapter::with_endpoints(["e1".to_string(), "e2".to_string()]);
        mock.fail_next_sends(1);

        let first = mock.send_raw_transaction(Bytes::from_static(b"tx")).await;
        assert!(first.is_err());
        assert_eq!(mock.current_ring_index_url(), "e2");

        let second = mock.send_raw_transaction(Bytes::from_static(b"tx")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn nonce_defaults_to_zero_for_unknown_account() {
        let mock = MockRpcAdapter::new();
        let count = mock.get_transaction_count(Address::ZERO).await.unwrap();
        assert_eq!(count, 0);
    }
}
