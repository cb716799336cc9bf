//! Candidate arbitrage routes produced by the Route Engine.

use alloy::primitives::{Address, Bytes};

use crate::pool::{DexId, Token};

/// One leg of a route: swap on `pool_address` via `router_address`, using DEX
/// `dex_id`'s calldata encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hop {
    pub dex_id: DexId,
    pub pool_address: Address,
    pub router_address: Address,
    pub swap_calldata: Bytes,
}

/// A proposed arbitrage cycle: spend `amount_in` of `start_token`, follow `hops`
/// in order, and receive `expected_output` of `start_token` back.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Route {
    pub start_token: Token,
    pub amount_in: u128,
    pub hops: Vec<Hop>,
    pub expected_output: u128,
    /// `expected_output - amount_in`, before gas.
    pub expected_profit: i128,
    pub gas_estimate: u64,
    pub gas_cost: u128,
    /// `expected_profit - gas_cost`. Admission to the Opportunity Channel
    /// requires this to be strictly positive.
    pub net_profit: i128,
    pub created_at_ms: u64,
    pub source_block: u64,
}

impl Route {
    /// Whether this route clears the channel's admission bar.
    pub fn is_profitable(&self) -> bool {
        self.net_profit > 0
    }

    /// Age of this route relative to `now_ms`, saturating at zero for clock skew.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms)
    }
}
