//! The RPC provider abstraction every other component programs against.
//!
//! Kept to the small method set the core actually needs (`SPEC_FULL.md`
//! §4.1 / §9) so a deterministic in-memory double can stand in for a live
//! chain in tests.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use eyre::Result;
use futures::stream::BoxStream;

/// Minimal block header fields the core reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub base_fee_per_gas: Option<u128>,
    pub transactions: Vec<B256>,
}

/// Minimal transaction fields the core reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInfo {
    pub hash: B256,
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
}

/// Minimal receipt fields the core reads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceiptInfo {
    pub transaction_hash: B256,
    pub status: bool,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<RawLog>,
}

/// A decode-agnostic event log; callers that know the ABI decode `data`/`topics` themselves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// An unsigned transaction request, filled in by the caller before signing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub from: Address,
    pub nonce: Option<u64>,
    pub gas_limit: Option<u64>,
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
    pub value: U256,
    pub data: Bytes,
}

/// Chain read/write operations with multi-endpoint failover.
///
/// Implementations own their endpoint ring internally; per `SPEC_FULL.md`
/// §3, the Scanner and the Executor each hold an independent adapter
/// instance so failover state is never shared between them.
#[async_trait]
pub trait RpcAdapter: Send + Sync {
    async fn get_block_latest(&self) -> Result<BlockHeader>;
    async fn get_block_by_hash(&self, hash: B256) -> Result<Option<BlockHeader>>;
    async fn get_transaction(&self, hash: B256) -> Result<Option<TransactionInfo>>;
    async fn get_transaction_receipt(&self, hash: B256) -> Result<Option<TransactionReceiptInfo>>;
    async fn get_balance(&self, address: Address) -> Result<U256>;
    async fn get_transaction_count(&self, address: Address) -> Result<u64>;
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes>;
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64>;
    /// Sends an already-signed raw transaction. Never silently drops a
    /// failure: the caller decides whether the nonce was consumed.
    async fn send_raw_transaction(&self, signed: Bytes) -> Result<B256>;

    /// A lazy, finite sequence of new block headers. The stream ends when
    /// the underlying socket closes; the caller must call this again to
    /// resubscribe, it is not automatically restarted.
    async fn subscribe_new_heads(&self) -> Result<BoxStream<'static, BlockHeader>>;

    /// As `subscribe_new_heads`, but for pending transactions. Optional:
    /// only used when mempool observation is enabled.
    async fn subscribe_pending_tx(&self) -> Result<BoxStream<'static, B256>>;

    /// URL of the endpoint currently in use, for logging.
    fn current_endpoint(&self) -> String;

    /// Advances past the current endpoint without retrying anything.
    ///
    /// `send_raw_transaction` never retries a failed write internally (the
    /// caller owns the nonce-consumption decision), so when the Executor's
    /// submit loop sees a transport-flavored send error it calls this
    /// directly rather than relying on `with_failover`'s retry-once path.
    fn advance_endpoint(&self);
}
