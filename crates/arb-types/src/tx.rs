//! Submitted-transaction tracking state owned exclusively by the Executor.

use std::time::Instant;

use alloy::primitives::B256;

use crate::route::Route;

/// Lifecycle state of a submitted transaction.
///
/// ```text
/// Submitted ──receipt.status=1──► Included
///           ──receipt.status=0──► Failed
///           ──age > 300s───────► Dropped
///           ──emergency stop───► Replaced
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxState {
    Pending,
    Included,
    Failed,
    Dropped,
    Replaced,
}

/// A submitted transaction's tracking record, keyed by `tx_hash` in the
/// Executor's pending map.
///
/// `route` is `None` for transactions the nonce authority submits that
/// aren't an arbitrage attempt — a scheduled profit withdrawal or an
/// emergency-stop replacement.
#[derive(Clone, Debug)]
pub struct PendingTx {
    pub tx_hash: B256,
    pub nonce: u64,
    pub route: Option<Route>,
    pub submitted_at: Instant,
    pub fee_cap: u128,
    pub tip_cap: u128,
    pub state: TxState,
}

impl PendingTx {
    /// Inclusion deadline per the spec: 5 minutes with no receipt marks the
    /// transaction Dropped.
    pub const STUCK_AFTER: std::time::Duration = std::time::Duration::from_secs(300);

    pub fn is_stuck(&self, now: Instant) -> bool {
        now.duration_since(self.submitted_at) >= Self::STUCK_AFTER
    }
}
