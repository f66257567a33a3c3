// crates/galactic-fees/src/router.rs
//
// Fee router.
//
// Fees arrive as a token balance already credited to the router's account.
// `receive_fees` splits each receipt into an own side and an other side,
// runs the configured swaps, and forwards every slice to its destination.
// The router never keeps any part of a receipt: after each call its balance
// of the fee token is exactly what it was before the fees arrived.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use galactic_core::access::OwnerCap;
use galactic_core::error::GalacticError;
use galactic_core::events::{FeeDestination, FeeTransfer};
use galactic_core::identity::{AccountId, PoolId, TokenId};
use galactic_core::math::mul_div;
use galactic_core::token::{Amount, DisplayAmount};
use galactic_core::traits::{SwapAdapter, TokenLedger};

use crate::config::FeeConfig;
use crate::destinations::Destinations;
use crate::split::allocate_bps;

/// Running totals per pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeStats {
    /// Fee-token wei received over all calls.
    pub total_received: Amount,
    pub distributions: u64,
}

/// Result of one `receive_fees` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeDistribution {
    pub pool_id: PoolId,
    pub fee_token: TokenId,
    pub amount: Amount,
    /// Nonzero outbound transfers, in execution order.
    pub transfers: Vec<FeeTransfer>,
}

impl FeeDistribution {
    /// Sum sent to `destination` in `token`.
    pub fn total_to(&self, destination: FeeDestination, token: &TokenId) -> Amount {
        self.transfers
            .iter()
            .filter(|t| t.destination == destination && &t.token == token)
            .map(|t| t.amount)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct FeeRouter<S> {
    account: AccountId,
    destinations: Destinations,
    configs: BTreeMap<PoolId, FeeConfig>,
    adapters: BTreeMap<AccountId, S>,
    collectors: BTreeSet<AccountId>,
    stats: BTreeMap<PoolId, FeeStats>,
}

impl<S: SwapAdapter> FeeRouter<S> {
    /// A router holding receipts under `account`.
    pub fn new(account: AccountId, destinations: Destinations) -> Self {
        Self {
            account,
            destinations,
            configs: BTreeMap::new(),
            adapters: BTreeMap::new(),
            collectors: BTreeSet::new(),
            stats: BTreeMap::new(),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn destinations(&self) -> &Destinations {
        &self.destinations
    }

    pub fn config(&self, pool_id: PoolId) -> Option<&FeeConfig> {
        self.configs.get(&pool_id)
    }

    pub fn stats(&self, pool_id: PoolId) -> FeeStats {
        self.stats.get(&pool_id).copied().unwrap_or_default()
    }

    pub fn adapter(&self, id: &AccountId) -> Option<&S> {
        self.adapters.get(id)
    }

    pub fn adapter_mut(&mut self, id: &AccountId) -> Option<&mut S> {
        self.adapters.get_mut(id)
    }

    pub fn is_collector(&self, account: &AccountId) -> bool {
        self.collectors.contains(account)
    }

    // --- admin ------------------------------------------------------------

    /// Register (or replace) a swap adapter under its own account.
    pub fn register_swap_adapter(&mut self, _cap: &OwnerCap, adapter: S) -> AccountId {
        let id = adapter.account();
        self.adapters.insert(id, adapter);
        tracing::info!("Swap adapter {} registered", id);
        id
    }

    /// Install or replace a pool's fee configuration.
    ///
    /// Paths are checked for shape only; liquidity is discovered when fees
    /// are received.
    ///
    /// # Errors
    /// `FeeBudgetExceeded` or `InvalidConfig` from `FeeConfig::validate`,
    /// and `InvalidConfig` if a path is set but its adapter is unknown.
    pub fn add_or_edit_fee(&mut self, _cap: &OwnerCap, pool_id: PoolId, config: FeeConfig) -> Result<(), GalacticError> {
        config.validate(pool_id)?;
        if config.uses_swaps() && !self.adapters.contains_key(&config.swap_adapter) {
            return Err(GalacticError::InvalidConfig(format!(
                "pool {}: swap adapter {} is not registered",
                pool_id, config.swap_adapter
            )));
        }
        let replaced = self.configs.insert(pool_id, config).is_some();
        tracing::info!(
            "Fee config for pool {} {}",
            pool_id,
            if replaced { "updated" } else { "added" }
        );
        Ok(())
    }

    pub fn set_destination(&mut self, _cap: &OwnerCap, destination: FeeDestination, account: AccountId) {
        tracing::info!(
            "Fee destination {} {} -> {}",
            destination,
            self.destinations.account(destination),
            account
        );
        self.destinations.set(destination, account);
    }

    pub fn authorize_collector(&mut self, _cap: &OwnerCap, account: AccountId, authorized: bool) {
        if authorized {
            self.collectors.insert(account);
        } else {
            self.collectors.remove(&account);
        }
        tracing::info!("Fee collector {} authorized = {}", account, authorized);
    }

    // --- fee processing ---------------------------------------------------

    /// Distribute `amount` of `fee_token`, already held by the router, for
    /// `pool_id`. Unconfigured pools forward everything to the treasury.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is `owner` or an authorized collector;
    /// `InsufficientBalance` if the router does not hold `amount`;
    /// `InvalidConfig` for a path that does not start at the token it
    /// converts or that ends at the fee token; `SwapFailed` from the
    /// adapter. A failed call may leave swaps executed; the caller is
    /// expected to roll the whole transaction back.
    pub fn receive_fees(
        &mut self,
        ledger: &mut dyn TokenLedger,
        owner: &AccountId,
        caller: &AccountId,
        pool_id: PoolId,
        fee_token: TokenId,
        amount: Amount,
    ) -> Result<FeeDistribution, GalacticError> {
        if caller != owner && !self.collectors.contains(caller) {
            return Err(GalacticError::unauthorized(*caller, format!("receive fees for pool {}", pool_id)));
        }
        let before = ledger.balance_of(&fee_token, &self.account);
        if before < amount {
            return Err(GalacticError::InsufficientBalance {
                token: fee_token,
                account: self.account,
                available: before,
                requested: amount,
            });
        }
        let config = self.configs.get(&pool_id).cloned();
        if let Some(c) = &config {
            if c.flags.swap_to_settlement && c.own_path.last() == Some(&fee_token) {
                return Err(GalacticError::InvalidConfig(format!(
                    "pool {}: settlement token is the fee token {}",
                    pool_id, fee_token
                )));
            }
        }

        let stats = self.stats.entry(pool_id).or_default();
        stats.total_received = stats
            .total_received
            .checked_add(amount)
            .ok_or_else(|| GalacticError::overflow("fees received"))?;
        stats.distributions += 1;

        let transfers = match &config {
            None => self.slice(FeeDestination::Treasury, fee_token, amount).into_iter().collect(),
            Some(c) => self.route(ledger, pool_id, c, fee_token, amount)?,
        };
        for t in &transfers {
            ledger.transfer(&t.token, &self.account, &t.account, t.amount)?;
        }

        let after = ledger.balance_of(&fee_token, &self.account);
        if after != before - amount {
            return Err(GalacticError::InvalidState(format!(
                "pool {}: router holds {} of {} after distributing, expected {}",
                pool_id,
                after,
                fee_token,
                before - amount
            )));
        }
        tracing::info!(
            "Fees for pool {}: {} of {} distributed in {} transfers",
            pool_id,
            DisplayAmount(amount),
            fee_token,
            transfers.len()
        );
        Ok(FeeDistribution {
            pool_id,
            fee_token,
            amount,
            transfers,
        })
    }

    fn slice(&self, destination: FeeDestination, token: TokenId, amount: Amount) -> Option<FeeTransfer> {
        (amount > 0).then(|| FeeTransfer {
            destination,
            account: self.destinations.account(destination),
            token,
            amount,
        })
    }

    /// Run the swaps of a configured pool and list the resulting transfers.
    fn route(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        config: &FeeConfig,
        fee_token: TokenId,
        amount: Amount,
    ) -> Result<Vec<FeeTransfer>, GalacticError> {
        let mut out = Vec::new();
        let own_amount = config.flags.own_portion(amount);
        let other_amount = amount - own_amount;

        // own side, forwarded in the fee token
        let own = allocate_bps(own_amount, &config.own_splits.as_array())?;
        out.extend(self.slice(FeeDestination::Burn, fee_token, own[0]));
        out.extend(self.slice(FeeDestination::PermaLiquidity, fee_token, own[1]));
        out.extend(self.slice(FeeDestination::LockLiquidity, fee_token, own[2]));
        out.extend(self.slice(FeeDestination::Treasury, fee_token, own[3]));

        // other side
        let (token, total) = if config.flags.swap_to_settlement && other_amount > 0 {
            self.swap(ledger, pool_id, config, &config.own_path, fee_token, other_amount)?
        } else {
            (fee_token, other_amount)
        };
        let other = allocate_bps(total, &config.other_splits.as_array())?;

        if !config.aux_path0.is_empty() && other[0] > 0 {
            let (burn_token, burned) = self.swap(ledger, pool_id, config, &config.aux_path0, token, other[0])?;
            out.extend(self.slice(FeeDestination::Burn, burn_token, burned));
        } else {
            out.extend(self.slice(FeeDestination::Burn, token, other[0]));
        }
        out.extend(self.slice(FeeDestination::Staker, token, other[1]));
        out.extend(self.slice(FeeDestination::Lottery, token, other[2]));

        let liquidity = other[3] + other[4];
        if !config.aux_path1.is_empty() && liquidity > 0 {
            let (liq_token, converted) = self.swap(ledger, pool_id, config, &config.aux_path1, token, liquidity)?;
            let perma = mul_div(converted, other[3], liquidity).ok_or_else(|| GalacticError::overflow("liquidity split"))?;
            out.extend(self.slice(FeeDestination::PermaLiquidity, liq_token, perma));
            out.extend(self.slice(FeeDestination::LockLiquidity, liq_token, converted - perma));
        } else {
            out.extend(self.slice(FeeDestination::PermaLiquidity, token, other[3]));
            out.extend(self.slice(FeeDestination::LockLiquidity, token, other[4]));
        }
        out.extend(self.slice(FeeDestination::Treasury, token, other[5]));
        Ok(out)
    }

    /// Swap `amount` of `token_in` along `path`; returns the output token and amount.
    fn swap(
        &mut self,
        ledger: &mut dyn TokenLedger,
        pool_id: PoolId,
        config: &FeeConfig,
        path: &[TokenId],
        token_in: TokenId,
        amount: Amount,
    ) -> Result<(TokenId, Amount), GalacticError> {
        let (first, last) = match (path.first(), path.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(GalacticError::InvalidConfig(format!("pool {}: empty swap path", pool_id)));
            }
        };
        if first != token_in {
            return Err(GalacticError::InvalidConfig(format!(
                "pool {}: swap path starts at {} but the slice is in {}",
                pool_id, first, token_in
            )));
        }
        let holder = self.account;
        let adapter = self.adapters.get_mut(&config.swap_adapter).ok_or_else(|| {
            GalacticError::InvalidConfig(format!(
                "pool {}: swap adapter {} is not registered",
                pool_id, config.swap_adapter
            ))
        })?;
        let received = adapter.swap_exact_in(ledger, path, amount, &holder)?;
        tracing::debug!(
            "Pool {} fee swap: {} of {} -> {} of {}",
            pool_id,
            amount,
            token_in,
            received,
            last
        );
        Ok((last, received))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeFlags;
    use galactic_core::identity::Address;
    use galactic_core::token::tokens;
    use galactic_store::{MemoryTokenLedger, PairSwapAdapter};

    struct Fixture {
        ledger: MemoryTokenLedger,
        router: FeeRouter<PairSwapAdapter>,
        cap: OwnerCap,
        owner: AccountId,
        adapter: AccountId,
        busd: TokenId,
        weth: TokenId,
        nice: TokenId,
    }

    fn destinations() -> Destinations {
        Destinations {
            treasury: Address::from_label("treasury"),
            staker: Address::from_label("staker"),
            lottery: Address::from_label("lottery"),
            perma_vault: Address::from_label("perma"),
            lock_vault: Address::from_label("lock"),
            burn_sink: Address::from_label("burn"),
        }
    }

    fn fixture() -> Fixture {
        let owner = Address::from_label("owner");
        let busd = Address::from_label("BUSD");
        let weth = Address::from_label("WETH");
        let nice = Address::from_label("NICE");
        let mut ledger = MemoryTokenLedger::new();
        for (t, s) in [(busd, "BUSD"), (weth, "WETH"), (nice, "NICE")] {
            ledger.create_token(t, s, owner).unwrap();
            ledger.mint(&t, &owner, &owner, tokens(10_000_000)).unwrap();
        }
        let mut pancake = PairSwapAdapter::new(Address::from_label("pancake"), 25).unwrap();
        pancake
            .add_liquidity(&mut ledger, &owner, busd, tokens(4_000_000), weth, tokens(1_000))
            .unwrap();
        pancake
            .add_liquidity(&mut ledger, &owner, weth, tokens(1_000), nice, tokens(5_000_000))
            .unwrap();

        let cap = OwnerCap::verify(&owner, &owner, "test").unwrap();
        let mut router = FeeRouter::new(Address::from_label("fee-router"), destinations());
        let adapter = router.register_swap_adapter(&cap, pancake);
        Fixture {
            ledger,
            router,
            cap,
            owner,
            adapter,
            busd,
            weth,
            nice,
        }
    }

    impl Fixture {
        fn fund_router(&mut self, token: TokenId, amount: Amount) {
            let router = *self.router.account();
            self.ledger.transfer(&token, &self.owner, &router, amount).unwrap();
        }

        fn receive(&mut self, pool_id: PoolId, token: TokenId, amount: Amount) -> Result<FeeDistribution, GalacticError> {
            let owner = self.owner;
            self.router
                .receive_fees(&mut self.ledger, &owner, &owner, pool_id, token, amount)
        }

        fn balance(&self, token: &TokenId, label: &str) -> Amount {
            self.ledger.balance_of(token, &Address::from_label(label))
        }
    }

    #[test]
    fn test_unconfigured_pool_goes_to_treasury() {
        let mut f = fixture();
        f.fund_router(f.busd, tokens(10));
        let d = f.receive(7, f.busd, tokens(10)).unwrap();
        assert_eq!(d.transfers.len(), 1);
        assert_eq!(f.balance(&f.busd, "treasury"), tokens(10));
        assert_eq!(f.ledger.balance_of(&f.busd, f.router.account()), 0);
    }

    #[test]
    fn test_partial_budget_forwards_rest_to_treasury() {
        let mut f = fixture();
        let config = FeeConfig {
            other_splits: [2000, 500, 1500, 700, 1300].into(),
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        f.fund_router(f.busd, tokens(1_000));
        f.receive(1, f.busd, tokens(1_000)).unwrap();

        assert_eq!(f.balance(&f.busd, "burn"), tokens(200));
        assert_eq!(f.balance(&f.busd, "staker"), tokens(50));
        assert_eq!(f.balance(&f.busd, "lottery"), tokens(150));
        assert_eq!(f.balance(&f.busd, "perma"), tokens(70));
        assert_eq!(f.balance(&f.busd, "lock"), tokens(130));
        assert_eq!(f.balance(&f.busd, "treasury"), tokens(400));
        assert_eq!(f.ledger.balance_of(&f.busd, f.router.account()), 0);
    }

    #[test]
    fn test_own_token_uses_own_splits() {
        let mut f = fixture();
        let config = FeeConfig {
            own_splits: [5000, 2500, 2500].into(),
            other_splits: [10_000, 0, 0, 0, 0].into(),
            flags: FeeFlags::from([false, true, false]),
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        f.fund_router(f.nice, 1_001);
        let d = f.receive(1, f.nice, 1_001).unwrap();
        assert_eq!(f.balance(&f.nice, "burn"), 500);
        assert_eq!(f.balance(&f.nice, "perma"), 250);
        assert_eq!(f.balance(&f.nice, "lock"), 251);
        assert_eq!(d.transfers.iter().map(|t| t.amount).sum::<Amount>(), 1_001);
    }

    #[test]
    fn test_liquidity_pair_halves() {
        let mut f = fixture();
        let config = FeeConfig {
            own_splits: [10_000, 0, 0].into(),
            other_splits: [0, 10_000, 0, 0, 0].into(),
            flags: FeeFlags::from([false, false, true]),
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 2, config).unwrap();
        f.fund_router(f.busd, 11);
        f.receive(2, f.busd, 11).unwrap();
        assert_eq!(f.balance(&f.busd, "burn"), 5);
        assert_eq!(f.balance(&f.busd, "staker"), 6);
    }

    #[test]
    fn test_swap_to_settlement_token() {
        let mut f = fixture();
        let config = FeeConfig {
            other_splits: [2000, 500, 1500, 700, 1300].into(),
            flags: FeeFlags::from([true, false, false]),
            swap_adapter: f.adapter,
            own_path: vec![f.busd, f.weth],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 3, config).unwrap();
        f.fund_router(f.busd, tokens(4_000));
        let d = f.receive(3, f.busd, tokens(4_000)).unwrap();

        let weth_out: Amount = d.transfers.iter().filter(|t| t.token == f.weth).map(|t| t.amount).sum();
        assert!(weth_out > 0);
        assert_eq!(d.total_to(FeeDestination::Treasury, &f.weth), f.balance(&f.weth, "treasury"));
        assert_eq!(f.ledger.balance_of(&f.busd, f.router.account()), 0);
        assert_eq!(f.ledger.balance_of(&f.weth, f.router.account()), 0);
        assert_eq!(f.balance(&f.busd, "treasury"), 0);
    }

    #[test]
    fn test_aux_paths_convert_burn_and_liquidity() {
        let mut f = fixture();
        let config = FeeConfig {
            other_splits: [2500, 2500, 0, 3000, 2000].into(),
            swap_adapter: f.adapter,
            aux_path0: vec![f.busd, f.weth, f.nice],
            aux_path1: vec![f.busd, f.weth],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 4, config).unwrap();
        f.fund_router(f.busd, tokens(1_000));
        let d = f.receive(4, f.busd, tokens(1_000)).unwrap();

        assert!(f.balance(&f.nice, "burn") > 0);
        assert_eq!(f.balance(&f.busd, "burn"), 0);
        assert_eq!(f.balance(&f.busd, "staker"), tokens(250));
        let perma = f.balance(&f.weth, "perma");
        let lock = f.balance(&f.weth, "lock");
        assert!(perma > 0 && lock > 0);
        // 3000 : 2000 of the converted liquidity slice
        assert!(perma * 2 + 5 > lock * 3 && perma * 2 <= lock * 3);
        assert_eq!(d.total_to(FeeDestination::Burn, &f.nice), f.balance(&f.nice, "burn"));
        for t in [f.busd, f.weth, f.nice] {
            assert_eq!(f.ledger.balance_of(&t, f.router.account()), 0);
        }
    }

    #[test]
    fn test_zero_amount_is_a_no_op() {
        let mut f = fixture();
        let config = FeeConfig {
            other_splits: [2000, 2000, 2000, 2000, 2000].into(),
            flags: FeeFlags::from([true, false, false]),
            swap_adapter: f.adapter,
            own_path: vec![f.busd, f.weth],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        let d = f.receive(1, f.busd, 0).unwrap();
        assert!(d.transfers.is_empty());
        assert_eq!(f.router.stats(1).distributions, 1);
    }

    #[test]
    fn test_halted_adapter_fails_swap() {
        let mut f = fixture();
        let config = FeeConfig {
            flags: FeeFlags::from([true, false, false]),
            swap_adapter: f.adapter,
            own_path: vec![f.busd, f.weth],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        let adapter = f.adapter;
        f.router.adapter_mut(&adapter).unwrap().set_halted(true);
        f.fund_router(f.busd, tokens(5));
        assert!(matches!(f.receive(1, f.busd, tokens(5)), Err(GalacticError::SwapFailed(_))));
    }

    #[test]
    fn test_settlement_equal_to_fee_token_rejected() {
        let mut f = fixture();
        let config = FeeConfig {
            flags: FeeFlags::from([true, false, false]),
            swap_adapter: f.adapter,
            own_path: vec![f.busd, f.weth, f.busd],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        f.fund_router(f.busd, 100);
        assert!(matches!(f.receive(1, f.busd, 100), Err(GalacticError::InvalidConfig(_))));
        assert_eq!(f.router.stats(1), FeeStats::default());
    }

    #[test]
    fn test_path_must_start_at_fee_token() {
        let mut f = fixture();
        let config = FeeConfig {
            flags: FeeFlags::from([true, false, false]),
            swap_adapter: f.adapter,
            own_path: vec![f.weth, f.nice],
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        f.fund_router(f.busd, 100);
        assert!(matches!(f.receive(1, f.busd, 100), Err(GalacticError::InvalidConfig(_))));
    }

    #[test]
    fn test_unauthorized_collector() {
        let mut f = fixture();
        let mallory = Address::from_label("mallory");
        f.fund_router(f.busd, 100);
        let owner = f.owner;
        let err = f
            .router
            .receive_fees(&mut f.ledger, &owner, &mallory, 1, f.busd, 100)
            .unwrap_err();
        assert!(matches!(err, GalacticError::Unauthorized { .. }));

        f.router.authorize_collector(&f.cap, mallory, true);
        assert!(f.router.receive_fees(&mut f.ledger, &owner, &mallory, 1, f.busd, 100).is_ok());
    }

    #[test]
    fn test_router_must_hold_the_fees() {
        let mut f = fixture();
        f.fund_router(f.busd, 99);
        assert!(matches!(
            f.receive(1, f.busd, 100),
            Err(GalacticError::InsufficientBalance { available: 99, .. })
        ));
    }

    #[test]
    fn test_unknown_adapter_rejected_at_config() {
        let mut f = fixture();
        let config = FeeConfig {
            swap_adapter: Address::from_label("sushiswap"),
            aux_path0: vec![f.busd, f.nice],
            ..FeeConfig::default()
        };
        assert!(matches!(
            f.router.add_or_edit_fee(&f.cap, 1, config),
            Err(GalacticError::InvalidConfig(_))
        ));
        assert!(f.router.config(1).is_none());
    }

    #[test]
    fn test_set_destination() {
        let mut f = fixture();
        let new_lottery = Address::from_label("lottery-v2");
        f.router.set_destination(&f.cap, FeeDestination::Lottery, new_lottery);
        let config = FeeConfig {
            other_splits: [0, 0, 10_000, 0, 0].into(),
            ..FeeConfig::default()
        };
        f.router.add_or_edit_fee(&f.cap, 1, config).unwrap();
        f.fund_router(f.busd, 42);
        f.receive(1, f.busd, 42).unwrap();
        assert_eq!(f.ledger.balance_of(&f.busd, &new_lottery), 42);
    }
}
