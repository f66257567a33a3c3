// crates/galactic-fees/src/split.rs
//
// Basis-point allocation with exact consumption.

use galactic_core::error::GalacticError;
use galactic_core::math::mul_div;
use galactic_core::token::{Amount, BPS_DENOMINATOR};

/// Split `amount` by `bps` (parts of 10000).
///
/// Returns `bps.len() + 1` amounts: one per entry, then the unbudgeted
/// remainder (the treasury's slice). Every part rounds down and the total
/// always equals `amount`. The rounding dust lands on the last destination
/// in order: the remainder slot when the budget is below 10000, otherwise
/// the last entry with nonzero bps.
///
/// # Errors
/// `InvalidConfig` if the entries sum to more than 10000.
pub fn allocate_bps(amount: Amount, bps: &[u32]) -> Result<Vec<Amount>, GalacticError> {
    let total_bps: u128 = bps.iter().map(|b| *b as u128).sum();
    if total_bps > BPS_DENOMINATOR {
        return Err(GalacticError::InvalidConfig(format!(
            "split of {} bps exceeds {}",
            total_bps, BPS_DENOMINATOR
        )));
    }

    let mut parts = Vec::with_capacity(bps.len() + 1);
    let mut assigned: Amount = 0;
    for b in bps {
        let part = mul_div(amount, *b as u128, BPS_DENOMINATOR)
            .ok_or_else(|| GalacticError::overflow("bps split"))?;
        assigned += part;
        parts.push(part);
    }
    // parts sum to at most amount * total_bps / 10000 <= amount
    let rest = amount - assigned;

    if total_bps < BPS_DENOMINATOR {
        parts.push(rest);
    } else {
        parts.push(0);
        if let Some(last) = bps.iter().rposition(|b| *b > 0) {
            parts[last] += rest;
        }
    }
    Ok(parts)
}
