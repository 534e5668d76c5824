// src/math.rs
//! Integer-safe swap math shared by the venue adapters and the path tester.

/// Constant-product output for a swap against pool reserves.
///
/// `out = (amount_in_with_fee * reserve_out) / (reserve_in + amount_in_with_fee)`
/// with the fee taken on the input side. All intermediates are u128 so the
/// product of two u64 amounts cannot overflow; the result is floored to an
/// integer amount like SPL token math.
pub fn constant_product_out(amount_in: u64, reserve_in: u64, reserve_out: u64, fee_bps: u32) -> u64 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }

    let amount_in_with_fee = amount_in as u128 * (10_000u128 - fee_bps as u128);
    let numerator = amount_in_with_fee * reserve_out as u128;
    let denominator = reserve_in as u128 * 10_000u128 + amount_in_with_fee;

    (numerator / denominator) as u64
}

/// Minimum output amount after applying slippage tolerance
pub fn apply_slippage(amount_out: u64, slippage_bps: u32) -> u64 {
    let kept = 10_000u128.saturating_sub(slippage_bps as u128);
    (amount_out as u128 * kept / 10_000u128) as u64
}

/// Round-trip profit percentage. The difference is computed on the integer
/// amounts; floating arithmetic only enters for the final ratio.
pub fn profit_percentage(initial_amount: u64, final_amount: u64) -> f64 {
    if initial_amount == 0 {
        return 0.0;
    }
    if final_amount >= initial_amount {
        (final_amount - initial_amount) as f64 / initial_amount as f64 * 100.0
    } else {
        -((initial_amount - final_amount) as f64 / initial_amount as f64 * 100.0)
    }
}

/// Whether `final_amount >= initial_amount * num / den`, in pure integer
/// arithmetic. Used for the near-break-even acceptance band.
pub fn within_band(initial_amount: u64, final_amount: u64, num: u64, den: u64) -> bool {
    if den == 0 {
        return false;
    }
    final_amount as u128 * den as u128 >= initial_amount as u128 * num as u128
}
