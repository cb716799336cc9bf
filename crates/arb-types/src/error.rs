//! Error taxonomy shared across the core (see `SPEC_FULL.md` §7).
//!
//! Each kind is a distinct type rather than one catch-all enum, so a `match`
//! at a call site can only ever see the errors that component can actually
//! produce. Components that need to propagate a mix of these to an outer
//! task boundary do so through `eyre::Report`, not by merging the types.

use thiserror::Error;

/// Missing or invalid required configuration. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration key: {0}")]
    MissingKey(&'static str),
    #[error("invalid value for configuration key {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// RPC connection or timeout failure. Recovered by endpoint failover; only
/// surfaces once every endpoint in the ring has been tried within one cycle.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection error contacting {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: eyre::Report,
    },
    #[error("request to {endpoint} timed out after {timeout_secs}s")]
    Timeout { endpoint: String, timeout_secs: u64 },
    #[error("all {endpoint_count} configured endpoints failed this cycle")]
    AllEndpointsFailed { endpoint_count: usize },
}

impl TransportError {
    /// The submit loop switches endpoints when the failure message looks
    /// transport-related, matching the source's substring check.
    pub fn is_recoverable_by_failover(&self) -> bool {
        matches!(self, TransportError::Connection { .. } | TransportError::Timeout { .. })
    }
}

/// On-chain rejection: bad nonce, insufficient funds, or a revert on simulate.
/// The offending route is dropped and the nonce-sync loop re-aligns state.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transaction reverted: {reason}")]
    Reverted { reason: String },
    #[error("nonce too low: local={local}, chain={chain}")]
    NonceTooLow { local: u64, chain: u64 },
    #[error("insufficient balance for {token}: have {have}, need {need}")]
    InsufficientBalance { token: String, have: u128, need: u128 },
}

/// A route failed a staleness, profitability, or gas check. Dropped silently
/// at debug level — never surfaced as a process-level error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("net profit {net_profit} below minimum threshold {threshold}")]
    BelowProfitThreshold { net_profit: i128, threshold: u128 },
    #[error("route age {age_ms}ms exceeds staleness bound {max_age_ms}ms")]
    TooStale { age_ms: u64, max_age_ms: u64 },
    #[error("gas estimate {gas_estimate} exceeds cap {cap}")]
    GasEstimateTooHigh { gas_estimate: u64, cap: u64 },
    #[error("gas cost {gas_cost} would consume the entire expected profit {expected_profit}")]
    GasExceedsProfit { gas_cost: u128, expected_profit: u128 },
    #[error("balanceOf probe for {token} failed: {reason}")]
    TokenSanityFailed { token: String, reason: String },
}

/// An internal bug, e.g. a non-monotonic nonce observed where the code
/// assumes monotonicity. Logged critical; the owning task exits so a
/// supervisor can restart it rather than continuing on corrupted state.
#[derive(Debug, Error)]
#[error("invariant violated: {0}")]
pub struct InvariantViolation(pub String);
