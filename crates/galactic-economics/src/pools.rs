// crates/galactic-economics/src/pools.rs
//
// Pool registry: the ordered arena of farming pools and the global weight sum.
//
// Pools are never deleted; a pool is retired by setting its weight to 0 so
// its `acc_reward_per_share` history stays intact for existing stakers.
// `total_weight` is maintained incrementally alongside every insert and
// edit and is never recomputed on the hot path.
//
// Mutations are reached only through `RewardAccountant`, which settles all
// pools before any weight change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use galactic_core::access::OwnerCap;
use galactic_core::error::GalacticError;
use galactic_core::identity::{PoolId, TokenId};
use galactic_core::token::{Amount, Timestamp, BPS_DENOMINATOR};

/// Upper bound of the global weight sum.
pub const DEFAULT_MAX_TOTAL_WEIGHT: u64 = 1_000_000;

/// A farming pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Sequential id, starting at 1.
    pub id: PoolId,
    /// Staked token; for auto-compounders, also the beneficiary account.
    pub token: TokenId,
    pub weight: u64,
    pub deposit_fee_bps: u16,
    pub is_auto_compounder: bool,
    pub is_liquidity_pool: bool,
    pub paused: bool,
    pub total_staked: Amount,
    /// Reward per staked wei, scaled by `ACC_PRECISION`.
    pub acc_reward_per_share: Amount,
    pub last_reward_time: Timestamp,
    /// Remainder of `emitted * weight / total_weight`, in 1/total_weight wei.
    pub share_dust: Amount,
    /// Remainder of `share * ACC_PRECISION / total_staked`.
    pub acc_dust: Amount,
    /// Auto-compounder share accrued but not yet minted.
    pub compounder_pending: Amount,
    /// Everything credited to stakers (or the compounder) so far.
    pub rewards_accrued: Amount,
    /// Everything minted out of `rewards_accrued` so far.
    pub rewards_paid: Amount,
}

/// Arguments of `add_pool`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPool {
    pub token: TokenId,
    pub weight: u64,
    pub deposit_fee_bps: u16,
    pub is_auto_compounder: bool,
    pub is_liquidity_pool: bool,
    /// Existing pools re-weighted in the same operation.
    pub dependent_pool_ids: Vec<PoolId>,
    /// New weights of `dependent_pool_ids`, index for index.
    pub dependent_weights: Vec<u64>,
}

impl NewPool {
    /// A plain staking pool with no deposit fee and no dependents.
    pub fn staking(token: TokenId, weight: u64) -> Self {
        Self {
            token,
            weight,
            ..Self::default()
        }
    }

    pub fn with_deposit_fee(mut self, bps: u16) -> Self {
        self.deposit_fee_bps = bps;
        self
    }

    pub fn auto_compounder(mut self) -> Self {
        self.is_auto_compounder = true;
        self
    }

    pub fn liquidity_pool(mut self) -> Self {
        self.is_liquidity_pool = true;
        self
    }

    pub fn with_dependents(mut self, ids: Vec<PoolId>, weights: Vec<u64>) -> Self {
        self.dependent_pool_ids = ids;
        self.dependent_weights = weights;
        self
    }
}

/// Ordered collection of pools indexed by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
    total_weight: u64,
    max_total_weight: u64,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TOTAL_WEIGHT)
    }
}

impl PoolRegistry {
    pub fn new(max_total_weight: u64) -> Self {
        Self {
            pools: Vec::new(),
            total_weight: 0,
            max_total_weight,
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn max_total_weight(&self) -> u64 {
        self.max_total_weight
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.pools.iter().map(|p| p.id)
    }

    fn index(&self, pool_id: PoolId) -> Result<usize, GalacticError> {
        let idx = (pool_id as usize).wrapping_sub(1);
        if pool_id == 0 || idx >= self.pools.len() {
            return Err(GalacticError::NotFound(format!("pool {}", pool_id)));
        }
        Ok(idx)
    }

    /// # Errors
    /// `NotFound` for an unknown id.
    pub fn get(&self, pool_id: PoolId) -> Result<&Pool, GalacticError> {
        let idx = self.index(pool_id)?;
        Ok(&self.pools[idx])
    }

    pub(crate) fn get_mut(&mut self, pool_id: PoolId) -> Result<&mut Pool, GalacticError> {
        let idx = self.index(pool_id)?;
        Ok(&mut self.pools[idx])
    }

    /// Switch to a new total weight.
    ///
    /// Each pool's `share_dust` is a remainder over the old total; it is
    /// carried over as `dust * new / old`, rounded down, so its value in wei
    /// never grows.
    fn rescale_share_dust(&mut self, new_total: u64) {
        let old_total = self.total_weight;
        if old_total != new_total {
            for pool in &mut self.pools {
                pool.share_dust = if old_total == 0 {
                    0
                } else {
                    // dust < old_total, so the product fits
                    pool.share_dust * new_total as u128 / old_total as u128
                };
            }
        }
        self.total_weight = new_total;
    }

    fn check_total(&self, total: u128) -> Result<u64, GalacticError> {
        if total > self.max_total_weight as u128 {
            return Err(GalacticError::InvalidConfig(format!(
                "total weight {} exceeds maximum {}",
                total, self.max_total_weight
            )));
        }
        Ok(total as u64)
    }

    /// Append a pool and re-weight its dependents. Returns the new id.
    ///
    /// Callers must have settled every pool at `now` first.
    ///
    /// # Errors
    /// `InvalidConfig` for a deposit fee above 10000 bps, mismatched or
    /// duplicated dependent arrays, or a resulting total weight above the
    /// maximum. `NotFound` for an unknown dependent id.
    pub fn add_pool(&mut self, _cap: &OwnerCap, new_pool: NewPool, now: Timestamp) -> Result<PoolId, GalacticError> {
        if new_pool.deposit_fee_bps as u128 > BPS_DENOMINATOR {
            return Err(GalacticError::InvalidConfig(format!(
                "deposit fee {} bps exceeds {}",
                new_pool.deposit_fee_bps, BPS_DENOMINATOR
            )));
        }
        if new_pool.dependent_pool_ids.len() != new_pool.dependent_weights.len() {
            return Err(GalacticError::InvalidConfig(format!(
                "{} dependent pools but {} dependent weights",
                new_pool.dependent_pool_ids.len(),
                new_pool.dependent_weights.len()
            )));
        }
        let mut seen = BTreeSet::new();
        let mut total = self.total_weight as u128 + new_pool.weight as u128;
        for (id, weight) in new_pool.dependent_pool_ids.iter().zip(&new_pool.dependent_weights) {
            if !seen.insert(*id) {
                return Err(GalacticError::InvalidConfig(format!(
                    "dependent pool {} listed twice",
                    id
                )));
            }
            let old = self.get(*id)?.weight as u128;
            total = total - old + *weight as u128;
        }
        let total = self.check_total(total)?;

        // all checks passed
        for (id, weight) in new_pool.dependent_pool_ids.iter().zip(&new_pool.dependent_weights) {
            let pool = self.get_mut(*id)?;
            tracing::debug!("Pool {} re-weighted {} -> {} as dependent", id, pool.weight, weight);
            pool.weight = *weight;
        }
        let id = (self.pools.len() + 1) as PoolId;
        self.pools.push(Pool {
            id,
            token: new_pool.token,
            weight: new_pool.weight,
            deposit_fee_bps: new_pool.deposit_fee_bps,
            is_auto_compounder: new_pool.is_auto_compounder,
            is_liquidity_pool: new_pool.is_liquidity_pool,
            paused: false,
            total_staked: 0,
            acc_reward_per_share: 0,
            last_reward_time: now,
            share_dust: 0,
            acc_dust: 0,
            compounder_pending: 0,
            rewards_accrued: 0,
            rewards_paid: 0,
        });
        self.rescale_share_dust(total);
        tracing::info!(
            "Added pool {} (token {}, weight {}, fee {} bps); total weight {}",
            id,
            new_pool.token,
            new_pool.weight,
            new_pool.deposit_fee_bps,
            total
        );
        Ok(id)
    }

    /// Change one pool's weight. Returns the previous weight.
    ///
    /// Callers must have settled every pool at the current time first.
    pub fn set_weight(&mut self, _cap: &OwnerCap, pool_id: PoolId, weight: u64) -> Result<u64, GalacticError> {
        let old = self.get(pool_id)?.weight;
        let total = self.check_total(self.total_weight as u128 - old as u128 + weight as u128)?;
        self.get_mut(pool_id)?.weight = weight;
        self.rescale_share_dust(total);
        tracing::info!(
            "Pool {} weight {} -> {}; total weight {}",
            pool_id,
            old,
            weight,
            total
        );
        Ok(old)
    }

    pub fn set_paused(&mut self, _cap: &OwnerCap, pool_id: PoolId, paused: bool) -> Result<(), GalacticError> {
        self.get_mut(pool_id)?.paused = paused;
        tracing::info!("Pool {} paused = {}", pool_id, paused);
        Ok(())
    }

    /// Full re-scan of the weight sum; for invariant checks only.
    pub fn recomputed_total_weight(&self) -> u64 {
        self.pools.iter().map(|p| p.weight).sum()
    }
}
