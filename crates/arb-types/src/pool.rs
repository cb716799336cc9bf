//! Pool and DEX configuration types.

use std::sync::Arc;

use alloy::primitives::Address;

/// An opaque chain address. Identity-by-equality; immutable once sourced from config.
pub type Token = Address;

/// Short identifier for a configured DEX, e.g. `"uniswap_v2"`. Cheap to clone since
/// it is threaded through every pool snapshot and route hop.
pub type DexId = Arc<str>;

/// The AMM family a pool belongs to.
///
/// `ConcentratedV3` pools are tracked with placeholder liquidity until a real
/// indexer or direct slot0 read is wired up (see the Open Questions in
/// `SPEC_FULL.md`); the tag exists so the Route Engine can dispatch on it
/// without the registry or engine needing to change shape later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKind {
    ConstantProductV2,
    ConcentratedV3,
}

/// A point-in-time view of one DEX pool's reserves and fee schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub pool_address: Address,
    pub dex_id: DexId,
    pub token0: Token,
    pub token1: Token,
    pub reserve0: u128,
    pub reserve1: u128,
    /// Exact fee rational numerator, e.g. 997 for a 0.3% pool.
    pub fee_numerator: u32,
    /// Exact fee rational denominator, e.g. 1000 for a 0.3% pool.
    pub fee_denominator: u32,
    pub kind: PoolKind,
    pub observed_at_block: u64,
}

impl PoolSnapshot {
    /// `true` when either reserve is zero; such snapshots are excluded from routing.
    pub fn is_empty(&self) -> bool {
        self.reserve0 == 0 || self.reserve1 == 0
    }

    /// Reserve of `token` in this pool, if `token` is one of the two pool tokens.
    pub fn reserve_of(&self, token: Token) -> Option<u128> {
        if token == self.token0 {
            Some(self.reserve0)
        } else if token == self.token1 {
            Some(self.reserve1)
        } else {
            None
        }
    }

    /// The pool's other token, given one of its tokens.
    pub fn counterpart(&self, token: Token) -> Option<Token> {
        if token == self.token0 {
            Some(self.token1)
        } else if token == self.token1 {
            Some(self.token0)
        } else {
            None
        }
    }

    /// TVL-proxy ranking heuristic used by the Pool Registry: sum of both reserves.
    pub fn tvl_proxy(&self) -> u128 {
        self.reserve0.saturating_add(self.reserve1)
    }
}

/// Per-DEX constants sourced from configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DexConfig {
    pub dex_id: DexId,
    pub router: Address,
    pub factory: Address,
    pub default_fee_numerator: u32,
    pub default_fee_denominator: u32,
    pub kind: PoolKind,
    /// Fee tiers in basis points; populated only for concentrated-liquidity DEXs.
    pub fee_tiers: Vec<u32>,
}
