// crates/galactic-core/src/math.rs
//
// Fixed-point helpers.
//
// Reward accounting multiplies amounts (up to ~1e27 wei per year of
// emission) by weights and by ACC_PRECISION before dividing, which does not
// fit in u128. The product is formed in 256 bits and the quotient narrowed
// back, failing only if the *result* does not fit.

use primitive_types::U256;

use crate::token::Amount;

/// Scale of `acc_reward_per_share`: reward per staked wei, times 10^12.
///
/// With 18-decimal tokens this keeps per-settlement truncation below
/// 10^-12 wei per staked wei, and the truncated remainder is carried into the
/// next settlement anyway.
pub const ACC_PRECISION: Amount = 1_000_000_000_000;

/// `floor(a * b / d)`, or `None` on division by zero or if the quotient
/// exceeds `u128`.
pub fn mul_div(a: Amount, b: Amount, d: Amount) -> Option<Amount> {
    mul_div_rem(a, b, d).map(|(q, _)| q)
}

/// `(floor(a * b / d), (a * b) mod d)`.
pub fn mul_div_rem(a: Amount, b: Amount, d: Amount) -> Option<(Amount, Amount)> {
    if d == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    let (q, r) = product.div_mod(U256::from(d));
    if q > U256::from(u128::MAX) {
        return None;
    }
    // r < d <= u128::MAX
    Some((q.as_u128(), r.as_u128()))
}

/// `floor((a * b + carry) / d)` with its remainder, for dust-carrying divisions.
pub fn mul_add_div_rem(a: Amount, b: Amount, carry: Amount, d: Amount) -> Option<(Amount, Amount)> {
    if d == 0 {
        return None;
    }
    let numerator = U256::from(a)
        .checked_mul(U256::from(b))?
        .checked_add(U256::from(carry))?;
    let (q, r) = numerator.div_mod(U256::from(d));
    if q > U256::from(u128::MAX) {
        return None;
    }
    Some((q.as_u128(), r.as_u128()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_basic() {
        assert_eq!(mul_div(100, 50, 100), Some(50));
        assert_eq!(mul_div(1000, 3333, 10000), Some(333));
        assert_eq!(mul_div(100, 1, 0), None);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 4.2e26 * 1e12 overflows u128 but the quotient does not.
        let share: Amount = 420_000_000 * 1_000_000_000_000_000_000;
        let q = mul_div(share, ACC_PRECISION, 1_000_000_000_000_000_000).unwrap();
        assert_eq!(q, 420_000_000 * ACC_PRECISION);
    }

    #[test]
    fn test_mul_div_quotient_overflow() {
        assert_eq!(mul_div(u128::MAX, 2, 1), None);
    }

    #[test]
    fn test_mul_div_rem() {
        assert_eq!(mul_div_rem(7, 3, 4), Some((5, 1)));
    }

    #[test]
    fn test_mul_add_div_rem_carries() {
        // 7*3 + 3 = 24 = 6*4
        assert_eq!(mul_add_div_rem(7, 3, 3, 4), Some((6, 0)));
        assert_eq!(mul_add_div_rem(1, 1, 1, 0), None);
    }
}
