//! RPC Adapter: chain read/write operations with multi-endpoint failover.

pub mod adapter;
pub mod alloy_adapter;
pub mod mock;
pub mod ring;

pub use adapter::{BlockHeader, RawLog, RpcAdapter, TransactionInfo, TransactionReceiptInfo, TxRequest};
pub use alloy_adapter::AlloyRpcAdapter;
pub use mock::MockRpcAdapter;
pub use ring::EndpointRing;
