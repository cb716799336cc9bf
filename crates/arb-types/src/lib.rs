//! Shared data model for the arbitrage core: pools, routes, pending transactions,
//! RPC endpoints, and the error taxonomy components communicate failures with.
//!
//! Kept dependency-light and free of any I/O so every other crate in the
//! workspace can depend on it without pulling in a provider stack.

pub mod error;
pub mod pool;
pub mod rpc;
pub mod route;
pub mod tx;

pub use error::{ChainError, ConfigError, InvariantViolation, TransportError, ValidationError};
pub use pool::{DexConfig, DexId, PoolKind, PoolSnapshot, Token};
pub use rpc::RpcEndpoint;
pub use route::{Hop, Route};
pub use tx::{PendingTx, TxState};
