// crates/galactic-store/src/swap.rs
//
// Constant-product swap adapter implementing the `SwapAdapter` trait.
//
// Every registered pair holds x*y=k reserves; a path of N tokens is routed
// through N-1 pairs in order. The adapter's reserves live in the token
// ledger under its own account, so a swap is two real transfers: the input
// from the holder into the adapter, the output from the adapter back out.
//
// Output per hop (fee in basis points, PancakeSwap-style):
//   out = in * (10000 - fee) * r_out / (r_in * 10000 + in * (10000 - fee))

use std::collections::BTreeMap;

use galactic_core::error::GalacticError;
use galactic_core::identity::{AccountId, TokenId};
use galactic_core::math::mul_div;
use galactic_core::token::{Amount, BPS_DENOMINATOR};
use galactic_core::traits::{SwapAdapter, TokenLedger};

/// Default swap fee: 25 bps.
pub const DEFAULT_SWAP_FEE_BPS: u16 = 25;

/// Reserves of one pair, stored with the lower address first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Reserves {
    low: Amount,
    high: Amount,
}

/// Multi-hop constant-product router.
#[derive(Debug, Clone)]
pub struct PairSwapAdapter {
    account: AccountId,
    fee_bps: u16,
    /// Maximum tolerated price impact per hop; 10000 disables the guard.
    max_price_impact_bps: u16,
    halted: bool,
    pairs: BTreeMap<(TokenId, TokenId), Reserves>,
}

fn pair_key(a: &TokenId, b: &TokenId) -> (TokenId, TokenId) {
    if a < b {
        (*a, *b)
    } else {
        (*b, *a)
    }
}

/// Constant-product output for a single hop. `None` on arithmetic failure.
fn amount_out(amount_in: Amount, reserve_in: Amount, reserve_out: Amount, fee_bps: u16) -> Option<Amount> {
    let in_with_fee = amount_in.checked_mul(BPS_DENOMINATOR - fee_bps as u128)?;
    let denominator = reserve_in
        .checked_mul(BPS_DENOMINATOR)?
        .checked_add(in_with_fee)?;
    mul_div(in_with_fee, reserve_out, denominator)
}

fn check_bps(what: &str, bps: u16) -> Result<u16, GalacticError> {
    if bps as u128 > BPS_DENOMINATOR {
        return Err(GalacticError::InvalidConfig(format!(
            "{} {} bps exceeds {}",
            what, bps, BPS_DENOMINATOR
        )));
    }
    Ok(bps)
}

impl PairSwapAdapter {
    /// Create an adapter that holds its reserves under `account`.
    ///
    /// # Errors
    /// `InvalidConfig` if `fee_bps` is above 10000.
    pub fn new(account: AccountId, fee_bps: u16) -> Result<Self, GalacticError> {
        Ok(Self {
            account,
            fee_bps: check_bps("swap fee", fee_bps)?,
            max_price_impact_bps: BPS_DENOMINATOR as u16,
            halted: false,
            pairs: BTreeMap::new(),
        })
    }

    /// Reject any hop whose execution price is worse than spot by more than
    /// `bps` (fee included). Fails with `InvalidConfig` above 10000.
    pub fn with_max_price_impact(mut self, bps: u16) -> Result<Self, GalacticError> {
        self.max_price_impact_bps = check_bps("max price impact", bps)?;
        Ok(self)
    }

    /// Halt or resume all swaps.
    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    /// Deposit liquidity from `provider` into the pair `(token_a, token_b)`,
    /// creating the pair if needed.
    ///
    /// # Errors
    /// Propagates ledger errors if `provider` cannot cover the amounts.
    pub fn add_liquidity(
        &mut self,
        ledger: &mut dyn TokenLedger,
        provider: &AccountId,
        token_a: TokenId,
        amount_a: Amount,
        token_b: TokenId,
        amount_b: Amount,
    ) -> Result<(), GalacticError> {
        if token_a == token_b {
            return Err(GalacticError::InvalidConfig(
                "pair tokens must differ".to_string(),
            ));
        }
        ledger.transfer(&token_a, provider, &self.account, amount_a)?;
        ledger.transfer(&token_b, provider, &self.account, amount_b)?;

        let reserves = self.pairs.entry(pair_key(&token_a, &token_b)).or_default();
        let (add_low, add_high) = if token_a < token_b {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        reserves.low = reserves
            .low
            .checked_add(add_low)
            .ok_or_else(|| GalacticError::overflow("pair reserves"))?;
        reserves.high = reserves
            .high
            .checked_add(add_high)
            .ok_or_else(|| GalacticError::overflow("pair reserves"))?;
        tracing::debug!(
            "Pair {}/{} reserves now {}/{}",
            token_a,
            token_b,
            reserves.low,
            reserves.high
        );
        Ok(())
    }

    /// Reserves of `(token_in, token_out)` in that order.
    pub fn reserves(&self, token_in: &TokenId, token_out: &TokenId) -> Option<(Amount, Amount)> {
        self.pairs.get(&pair_key(token_in, token_out)).map(|r| {
            if token_in < token_out {
                (r.low, r.high)
            } else {
                (r.high, r.low)
            }
        })
    }

    /// Output of each hop for `amount_in` along `path`, without executing.
    ///
    /// # Errors
    /// `GalacticError::SwapFailed` for malformed paths, missing or empty
    /// pairs, zero output, or excessive price impact.
    pub fn quote(&self, path: &[TokenId], amount_in: Amount) -> Result<Vec<Amount>, GalacticError> {
        if path.len() < 2 {
            return Err(GalacticError::SwapFailed(format!(
                "path must name at least two tokens, got {}",
                path.len()
            )));
        }
        let mut amounts = Vec::with_capacity(path.len());
        amounts.push(amount_in);
        if amount_in == 0 {
            amounts.resize(path.len(), 0);
            return Ok(amounts);
        }

        let mut current = amount_in;
        for hop in path.windows(2) {
            let (token_in, token_out) = (&hop[0], &hop[1]);
            if token_in == token_out {
                return Err(GalacticError::SwapFailed(format!(
                    "path repeats token {}",
                    token_in
                )));
            }
            let (reserve_in, reserve_out) = self
                .reserves(token_in, token_out)
                .filter(|(a, b)| *a > 0 && *b > 0)
                .ok_or_else(|| {
                    GalacticError::SwapFailed(format!("no liquidity for {} -> {}", token_in, token_out))
                })?;

            let out = amount_out(current, reserve_in, reserve_out, self.fee_bps)
                .ok_or_else(|| GalacticError::SwapFailed("swap amount overflow".to_string()))?;
            if out == 0 {
                return Err(GalacticError::SwapFailed(format!(
                    "insufficient output swapping {} {} -> {}",
                    current, token_in, token_out
                )));
            }

            let spot = mul_div(current, reserve_out, reserve_in)
                .ok_or_else(|| GalacticError::SwapFailed("spot price overflow".to_string()))?;
            let floor = mul_div(spot, BPS_DENOMINATOR - self.max_price_impact_bps as u128, BPS_DENOMINATOR)
                .unwrap_or(0);
            if out < floor {
                return Err(GalacticError::SwapFailed(format!(
                    "price impact too high on {} -> {}: got {} against spot {}",
                    token_in, token_out, out, spot
                )));
            }

            amounts.push(out);
            current = out;
        }
        Ok(amounts)
    }
}

impl SwapAdapter for PairSwapAdapter {
    fn account(&self) -> AccountId {
        self.account
    }

    fn swap_exact_in(
        &mut self,
        ledger: &mut dyn TokenLedger,
        path: &[TokenId],
        amount_in: Amount,
        holder: &AccountId,
    ) -> Result<Amount, GalacticError> {
        if self.halted {
            return Err(GalacticError::SwapFailed("adapter halted".to_string()));
        }
        let amounts = self.quote(path, amount_in)?;
        if amount_in == 0 {
            return Ok(0);
        }

        ledger
            .transfer(&path[0], holder, &self.account, amount_in)
            .map_err(|e| GalacticError::SwapFailed(format!("input transfer: {}", e)))?;

        for (i, hop) in path.windows(2).enumerate() {
            let (token_in, token_out) = (&hop[0], &hop[1]);
            let (hop_in, hop_out) = (amounts[i], amounts[i + 1]);
            let reserves = self
                .pairs
                .get_mut(&pair_key(token_in, token_out))
                .ok_or_else(|| GalacticError::SwapFailed(format!("pair {} -> {} vanished", token_in, token_out)))?;
            if token_in < token_out {
                reserves.low += hop_in;
                reserves.high -= hop_out;
            } else {
                reserves.high += hop_in;
                reserves.low -= hop_out;
            }
        }

        let out = amounts[amounts.len() - 1];
        let token_out = &path[path.len() - 1];
        ledger
            .transfer(token_out, &self.account, holder, out)
            .map_err(|e| GalacticError::SwapFailed(format!("output transfer: {}", e)))?;

        tracing::debug!(
            "Swapped {} {} for {} {} over {} hops",
            amount_in,
            path[0],
            out,
            token_out,
            path.len() - 1
        );
        Ok(out)
    }
}
