// crates/galactic-economics/src/rewards.rs
//
// Reward accounting: turns the emission schedule and pool weights into
// per-pool and per-user reward balances.
//
// Each pool keeps `acc_reward_per_share`, the reward earned by one staked
// wei since the pool was created (scaled by ACC_PRECISION). A stake's
// pending reward is `amount * acc / ACC_PRECISION - reward_debt`, where the
// debt snapshots the same product at the stake's last change.
//
// Every state-changing call first settles the pool up to `now`, then
// updates internal state, and only then moves tokens through the ledger.
//
// Rounding: every division rounds down and its remainder is carried in the
// pool (`share_dust`, `acc_dust`). Reward debt rounds up, so the minted
// total can never exceed what was credited to the pool.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use galactic_core::access::OwnerCap;
use galactic_core::error::GalacticError;
use galactic_core::identity::{AccountId, PoolId, TokenId};
use galactic_core::math::{mul_add_div_rem, mul_div, mul_div_rem, ACC_PRECISION};
use galactic_core::token::{Amount, DisplayAmount, Timestamp, BPS_DENOMINATOR};
use galactic_core::traits::TokenLedger;

use crate::emission::{Allocation, EmissionScheduler};
use crate::pools::{NewPool, Pool, PoolRegistry};
use crate::treasury::{ReservedEmission, ReservedPayout};

/// A user's position in one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    pub amount: Amount,
    /// `amount * acc_reward_per_share / ACC_PRECISION` at the last change, rounded up.
    pub reward_debt: Amount,
}

/// Where deposit fees are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAddress {
    pub account: AccountId,
    /// The account is the fee router and must process each fee as it arrives.
    pub notify_router: bool,
}

/// Outcome of a deposit (or a harvest, when `amount` is 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositReceipt {
    pub pool_id: PoolId,
    pub user: AccountId,
    pub token: TokenId,
    pub amount: Amount,
    pub fee: Amount,
    pub net: Amount,
    pub harvested: Amount,
    /// Set when a nonzero fee was transferred.
    pub fee_address: Option<FeeAddress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReceipt {
    pub pool_id: PoolId,
    pub user: AccountId,
    pub token: TokenId,
    pub amount: Amount,
    pub harvested: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOutcome {
    pub split_count: u32,
    /// Total emission rate in wei per second after the split.
    pub new_rate: Amount,
    pub reserved: ReservedPayout,
}

/// Pool accumulator values after settling up to some time.
#[derive(Debug, Clone, Copy)]
struct Accrual {
    credited: Amount,
    share_dust: Amount,
    acc_reward_per_share: Amount,
    acc_dust: Amount,
    compounder_pending: Amount,
}

fn accrued_for(amount: Amount, acc_reward_per_share: Amount) -> Result<Amount, GalacticError> {
    mul_div(amount, acc_reward_per_share, ACC_PRECISION).ok_or_else(|| GalacticError::overflow("accrued reward"))
}

fn debt_for(amount: Amount, acc_reward_per_share: Amount) -> Result<Amount, GalacticError> {
    let (q, r) = mul_div_rem(amount, acc_reward_per_share, ACC_PRECISION)
        .ok_or_else(|| GalacticError::overflow("reward debt"))?;
    if r > 0 {
        q.checked_add(1).ok_or_else(|| GalacticError::overflow("reward debt"))
    } else {
        Ok(q)
    }
}

fn pending_for(stake: &UserStake, acc_reward_per_share: Amount) -> Result<Amount, GalacticError> {
    Ok(accrued_for(stake.amount, acc_reward_per_share)?.saturating_sub(stake.reward_debt))
}

fn add(a: Amount, b: Amount, what: &str) -> Result<Amount, GalacticError> {
    a.checked_add(b).ok_or_else(|| GalacticError::overflow(what))
}

/// The chef: owns the emission schedule, the pool registry and every stake.
///
/// Token movements go through the `TokenLedger` passed into each call; the
/// accountant itself only ever holds bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardAccountant {
    /// Account that custodies staked tokens and mints rewards.
    chef: AccountId,
    reward_token: TokenId,
    scheduler: EmissionScheduler,
    registry: PoolRegistry,
    reserved: ReservedEmission,
    stakes: BTreeMap<PoolId, BTreeMap<AccountId, UserStake>>,
    fee_address: Option<FeeAddress>,
}

impl RewardAccountant {
    pub fn new(
        chef: AccountId,
        reward_token: TokenId,
        scheduler: EmissionScheduler,
        registry: PoolRegistry,
        reserved: ReservedEmission,
    ) -> Self {
        Self {
            chef,
            reward_token,
            scheduler,
            registry,
            reserved,
            stakes: BTreeMap::new(),
            fee_address: None,
        }
    }

    pub fn chef(&self) -> &AccountId {
        &self.chef
    }

    pub fn reward_token(&self) -> &TokenId {
        &self.reward_token
    }

    pub fn scheduler(&self) -> &EmissionScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn reserved(&self) -> &ReservedEmission {
        &self.reserved
    }

    pub fn fee_address(&self) -> Option<&FeeAddress> {
        self.fee_address.as_ref()
    }

    /// A user's stake; the zero stake if they never deposited.
    pub fn stake(&self, pool_id: PoolId, user: &AccountId) -> UserStake {
        self.stakes
            .get(&pool_id)
            .and_then(|m| m.get(user))
            .copied()
            .unwrap_or_default()
    }

    /// Sum of every user's stake in a pool; equals `Pool::total_staked`.
    pub fn staked_sum(&self, pool_id: PoolId) -> Amount {
        self.stakes
            .get(&pool_id)
            .map(|m| m.values().map(|s| s.amount).sum())
            .unwrap_or(0)
    }

    /// Total emission rate at `now`.
    pub fn current_emission_rate(&self, now: Timestamp) -> Result<Amount, GalacticError> {
        self.scheduler.current_emission_rate(now)
    }

    /// Emission rate of one pool at `now`, given current weights.
    pub fn pool_emission_rate(&self, pool_id: PoolId, now: Timestamp) -> Result<Amount, GalacticError> {
        let pool = self.registry.get(pool_id)?;
        self.scheduler.pool_rate(now, pool.weight, self.registry.total_weight())
    }

    // --- settlement -------------------------------------------------------

    /// Project a pool's accumulators forward to `now` without mutating it.
    fn project(&self, pool: &Pool, now: Timestamp) -> Result<Accrual, GalacticError> {
        let mut accrual = Accrual {
            credited: 0,
            share_dust: pool.share_dust,
            acc_reward_per_share: pool.acc_reward_per_share,
            acc_dust: pool.acc_dust,
            compounder_pending: pool.compounder_pending,
        };
        let total_weight = self.registry.total_weight();
        if now <= pool.last_reward_time || pool.weight == 0 || total_weight == 0 {
            return Ok(accrual);
        }

        let emitted = self
            .scheduler
            .allocation_between(pool.last_reward_time, now, Allocation::Pools)?;
        let (share, share_dust) = mul_add_div_rem(
            emitted,
            pool.weight as u128,
            pool.share_dust,
            total_weight as u128,
        )
        .ok_or_else(|| GalacticError::overflow("pool share"))?;
        accrual.share_dust = share_dust;

        if pool.is_auto_compounder {
            accrual.compounder_pending = add(pool.compounder_pending, share, "compounder pending")?;
            accrual.credited = share;
        } else if pool.total_staked > 0 {
            let (increment, acc_dust) =
                mul_add_div_rem(share, ACC_PRECISION, pool.acc_dust, pool.total_staked)
                    .ok_or_else(|| GalacticError::overflow("reward per share"))?;
            accrual.acc_reward_per_share = add(pool.acc_reward_per_share, increment, "reward per share")?;
            accrual.acc_dust = acc_dust;
            accrual.credited = share;
        }
        // An empty pool's share is never minted.
        Ok(accrual)
    }

    fn settle_pool(&mut self, pool_id: PoolId, now: Timestamp) -> Result<(), GalacticError> {
        let accrual = {
            let pool = self.registry.get(pool_id)?;
            if now <= pool.last_reward_time {
                return Ok(());
            }
            self.project(pool, now)?
        };
        let pool = self.registry.get_mut(pool_id)?;
        pool.share_dust = accrual.share_dust;
        pool.acc_reward_per_share = accrual.acc_reward_per_share;
        pool.acc_dust = accrual.acc_dust;
        pool.compounder_pending = accrual.compounder_pending;
        pool.rewards_accrued = add(pool.rewards_accrued, accrual.credited, "rewards accrued")?;
        pool.last_reward_time = now;
        Ok(())
    }

    /// Settle every pool up to `now`.
    pub fn mass_settle(&mut self, now: Timestamp) -> Result<(), GalacticError> {
        let ids: Vec<PoolId> = self.registry.ids().collect();
        for id in ids {
            self.settle_pool(id, now)?;
        }
        Ok(())
    }

    /// Reward `user` would harvest from `pool_id` at `now`.
    ///
    /// For an auto-compounder the beneficiary is the pool's token address.
    pub fn pending_rewards(&self, pool_id: PoolId, user: &AccountId, now: Timestamp) -> Result<Amount, GalacticError> {
        let pool = self.registry.get(pool_id)?;
        let accrual = self.project(pool, now)?;
        if pool.is_auto_compounder {
            return Ok(if user == &pool.token {
                accrual.compounder_pending
            } else {
                0
            });
        }
        pending_for(&self.stake(pool_id, user), accrual.acc_reward_per_share)
    }

    // --- admin ------------------------------------------------------------

    /// Settle all pools, then append a new one.
    pub fn add_pool(&mut self, cap: &OwnerCap, new_pool: NewPool, now: Timestamp) -> Result<PoolId, GalacticError> {
        self.mass_settle(now)?;
        let id = self.registry.add_pool(cap, new_pool, now)?;
        self.stakes.entry(id).or_default();
        Ok(id)
    }

    /// Settle all pools, then change one weight. Returns the previous weight.
    pub fn edit_weight(
        &mut self,
        cap: &OwnerCap,
        pool_id: PoolId,
        weight: u64,
        now: Timestamp,
    ) -> Result<u64, GalacticError> {
        self.registry.get(pool_id)?;
        self.mass_settle(now)?;
        self.registry.set_weight(cap, pool_id, weight)
    }

    pub fn pause_pool(&mut self, cap: &OwnerCap, pool_id: PoolId, paused: bool) -> Result<(), GalacticError> {
        self.registry.set_paused(cap, pool_id, paused)
    }

    pub fn set_fee_address(&mut self, _cap: &OwnerCap, account: AccountId, notify_router: bool) {
        tracing::info!("Fee address set to {} (notify router: {})", account, notify_router);
        self.fee_address = Some(FeeAddress {
            account,
            notify_router,
        });
    }

    pub fn set_treasury(&mut self, cap: &OwnerCap, account: AccountId) {
        self.reserved.set_treasury(cap, account);
    }

    /// Mint the reserved allocations accrued up to `now`, then apply a split.
    pub fn apply_split(
        &mut self,
        _cap: &OwnerCap,
        ledger: &mut dyn TokenLedger,
        now: Timestamp,
    ) -> Result<SplitOutcome, GalacticError> {
        if now < self.scheduler.last_split_time() {
            return Err(GalacticError::InvalidState(format!(
                "split at {} precedes previous split at {}",
                now,
                self.scheduler.last_split_time()
            )));
        }
        let payout = self.reserved.settle(&self.scheduler, now)?;
        let split_count = self.scheduler.apply_split(now)?;
        let new_rate = self.scheduler.current_emission_rate(now)?;
        self.mint_reserved(ledger, &payout)?;
        Ok(SplitOutcome {
            split_count,
            new_rate,
            reserved: payout,
        })
    }

    // --- reserved emission ------------------------------------------------

    /// Mint treasury and non-DeFi emission accrued since the last settlement.
    pub fn settle_reserved(&mut self, ledger: &mut dyn TokenLedger, now: Timestamp) -> Result<ReservedPayout, GalacticError> {
        let payout = self.reserved.settle(&self.scheduler, now)?;
        self.mint_reserved(ledger, &payout)?;
        Ok(payout)
    }

    fn mint_reserved(&self, ledger: &mut dyn TokenLedger, payout: &ReservedPayout) -> Result<(), GalacticError> {
        if payout.treasury_amount > 0 {
            ledger.mint(&self.reward_token, &self.chef, &payout.treasury, payout.treasury_amount)?;
        }
        if payout.non_defi_amount > 0 {
            ledger.mint(&self.reward_token, &self.chef, &payout.non_defi, payout.non_defi_amount)?;
        }
        if payout.treasury_amount > 0 || payout.non_defi_amount > 0 {
            tracing::info!(
                "Reserved emission minted: treasury {}, non-DeFi {}",
                DisplayAmount(payout.treasury_amount),
                DisplayAmount(payout.non_defi_amount)
            );
        }
        Ok(())
    }

    // --- user operations --------------------------------------------------

    /// Harvest pending rewards and stake `amount` of the pool token.
    ///
    /// `amount == 0` only harvests and is allowed on paused pools. The
    /// deposit fee is taken from `amount` and sent to the fee address.
    ///
    /// # Errors
    /// `PoolPaused`, `InvalidConfig` (auto-compounder pool, or a fee with no
    /// fee address), `InsufficientAllowance` / `InsufficientBalance` if the
    /// user cannot fund the deposit.
    pub fn deposit(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        user: AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<DepositReceipt, GalacticError> {
        // checks
        let pool = self.registry.get(pool_id)?;
        let token = pool.token;
        if amount > 0 {
            if pool.is_auto_compounder {
                return Err(GalacticError::InvalidConfig(format!(
                    "pool {} is an auto-compounder and takes no direct stakes",
                    pool_id
                )));
            }
            if pool.paused {
                return Err(GalacticError::PoolPaused { pool_id });
            }
        }
        let fee = mul_div(amount, pool.deposit_fee_bps as u128, BPS_DENOMINATOR)
            .ok_or_else(|| GalacticError::overflow("deposit fee"))?;
        let net = amount - fee;
        let fee_address = if fee > 0 {
            Some(self.fee_address.ok_or_else(|| {
                GalacticError::InvalidConfig(format!("pool {} charges a deposit fee but no fee address is set", pool_id))
            })?)
        } else {
            None
        };
        if amount > 0 {
            let allowed = ledger.allowance(&token, &user, &self.chef);
            if allowed < amount {
                return Err(GalacticError::InsufficientAllowance {
                    token,
                    owner: user,
                    spender: self.chef,
                    allowed,
                    requested: amount,
                });
            }
            let available = ledger.balance_of(&token, &user);
            if available < amount {
                return Err(GalacticError::InsufficientBalance {
                    token,
                    account: user,
                    available,
                    requested: amount,
                });
            }
        }

        // effects
        self.settle_pool(pool_id, now)?;
        let acc = self.registry.get(pool_id)?.acc_reward_per_share;
        let stake = self.stakes.entry(pool_id).or_default().entry(user).or_default();
        let harvested = pending_for(stake, acc)?;
        stake.amount = add(stake.amount, net, "stake")?;
        stake.reward_debt = debt_for(stake.amount, acc)?;
        let pool = self.registry.get_mut(pool_id)?;
        pool.total_staked = add(pool.total_staked, net, "total staked")?;
        pool.rewards_paid = add(pool.rewards_paid, harvested, "rewards paid")?;

        // interactions
        if amount > 0 {
            ledger.transfer_from(&token, &self.chef, &user, &self.chef, amount)?;
        }
        if let Some(fa) = &fee_address {
            ledger.transfer(&token, &self.chef, &fa.account, fee)?;
        }
        if harvested > 0 {
            ledger.mint(&self.reward_token, &self.chef, &user, harvested)?;
        }

        tracing::info!(
            "Deposit pool {} user {}: amount {} fee {} net {}, harvested {}",
            pool_id,
            user,
            DisplayAmount(amount),
            DisplayAmount(fee),
            DisplayAmount(net),
            DisplayAmount(harvested)
        );
        Ok(DepositReceipt {
            pool_id,
            user,
            token,
            amount,
            fee,
            net,
            harvested,
            fee_address,
        })
    }

    /// Harvest pending rewards without changing the stake.
    pub fn harvest(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        user: AccountId,
        now: Timestamp,
    ) -> Result<DepositReceipt, GalacticError> {
        self.deposit(ledger, pool_id, user, 0, now)
    }

    /// Harvest pending rewards and return `amount` of the stake.
    ///
    /// # Errors
    /// `InsufficientStake` if `amount` exceeds the user's stake.
    pub fn withdraw(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        user: AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<WithdrawReceipt, GalacticError> {
        let token = self.registry.get(pool_id)?.token;
        let staked = self.stake(pool_id, &user).amount;
        if amount > staked {
            return Err(GalacticError::InsufficientStake {
                pool_id,
                requested: amount,
                staked,
            });
        }

        self.settle_pool(pool_id, now)?;
        let acc = self.registry.get(pool_id)?.acc_reward_per_share;
        let stake = self.stakes.entry(pool_id).or_default().entry(user).or_default();
        let harvested = pending_for(stake, acc)?;
        stake.amount -= amount;
        stake.reward_debt = debt_for(stake.amount, acc)?;
        let pool = self.registry.get_mut(pool_id)?;
        pool.total_staked -= amount;
        pool.rewards_paid = add(pool.rewards_paid, harvested, "rewards paid")?;

        if amount > 0 {
            ledger.transfer(&token, &self.chef, &user, amount)?;
        }
        if harvested > 0 {
            ledger.mint(&self.reward_token, &self.chef, &user, harvested)?;
        }

        tracing::info!(
            "Withdraw pool {} user {}: amount {}, harvested {}",
            pool_id,
            user,
            DisplayAmount(amount),
            DisplayAmount(harvested)
        );
        Ok(WithdrawReceipt {
            pool_id,
            user,
            token,
            amount,
            harvested,
        })
    }

    /// Return the whole stake and forfeit pending rewards. Always permitted.
    pub fn emergency_withdraw(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        user: AccountId,
        now: Timestamp,
    ) -> Result<Amount, GalacticError> {
        let token = self.registry.get(pool_id)?.token;
        // Settle with the stake still counted so the interval up to now is
        // shared among everyone who was staked during it.
        self.settle_pool(pool_id, now)?;
        let amount = self
            .stakes
            .get_mut(&pool_id)
            .and_then(|m| m.get_mut(&user))
            .map(std::mem::take)
            .map(|s| s.amount)
            .unwrap_or(0);
        let pool = self.registry.get_mut(pool_id)?;
        pool.total_staked -= amount;

        if amount > 0 {
            ledger.transfer(&token, &self.chef, &user, amount)?;
        }
        tracing::warn!("Emergency withdraw pool {} user {}: {} returned, rewards forfeited", pool_id, user, amount);
        Ok(amount)
    }

    /// Mint an auto-compounder pool's accrued share to its beneficiary.
    ///
    /// # Errors
    /// `InvalidConfig` if the pool is not an auto-compounder, `Unauthorized`
    /// unless `caller` is the pool's token address.
    pub fn mint_compounder_rewards(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: AccountId,
        pool_id: PoolId,
        now: Timestamp,
    ) -> Result<Amount, GalacticError> {
        let pool = self.registry.get(pool_id)?;
        if !pool.is_auto_compounder {
            return Err(GalacticError::InvalidConfig(format!(
                "pool {} is not an auto-compounder",
                pool_id
            )));
        }
        if caller != pool.token {
            return Err(GalacticError::unauthorized(caller, format!("mint compounder rewards of pool {}", pool_id)));
        }

        self.settle_pool(pool_id, now)?;
        let pool = self.registry.get_mut(pool_id)?;
        let amount = std::mem::take(&mut pool.compounder_pending);
        pool.rewards_paid = add(pool.rewards_paid, amount, "rewards paid")?;

        if amount > 0 {
            ledger.mint(&self.reward_token, &self.chef, &caller, amount)?;
        }
        tracing::info!(
            "Compounder rewards of pool {}: {} minted to {}",
            pool_id,
            DisplayAmount(amount),
            caller
        );
        Ok(amount)
    }
}
