// crates/galactic-runtime/src/lib.rs
//
// galactic-runtime: the transactional facade over the Galactic ledger.
//
// `Protocol` owns the token ledger, the reward accountant and the fee
// router. Every public operation runs inside `transact`: the ledger, the
// accountant, the router and the owner are snapshotted first and restored if
// the operation fails, and the append-only event log is cut back to its
// length at entry. An error never leaves partial effects (token movements
// and swaps included) or events behind.

pub mod config;

pub use config::ProtocolConfig;

use galactic_core::access::OwnerCap;
use galactic_core::error::GalacticError;
use galactic_core::events::{FeeDestination, LedgerEvent};
use galactic_core::identity::{AccountId, PoolId};
use galactic_core::token::{Amount, Timestamp};
use galactic_core::traits::{SwapAdapter, TokenLedger};
use galactic_economics::{
    DepositReceipt, EmissionScheduler, NewPool, PoolRegistry, ReservedEmission, ReservedPayout, RewardAccountant,
    SplitOutcome, WithdrawReceipt,
};
use galactic_fees::{FeeConfig, FeeDistribution, FeeRouter};

/// The whole ledger: state, collaborators and the event log.
#[derive(Debug, Clone)]
pub struct Protocol<L, S> {
    owner: AccountId,
    ledger: L,
    accountant: RewardAccountant,
    router: FeeRouter<S>,
    events: Vec<LedgerEvent>,
    /// Latest committed timestamp; time never runs backwards.
    clock: Timestamp,
}

impl<L, S> Protocol<L, S>
where
    L: TokenLedger + Clone,
    S: SwapAdapter + Clone,
{
    /// Build the protocol from a validated configuration.
    ///
    /// The ledger must already know the reward token, with the chef account
    /// as an authorized minter.
    pub fn new(config: &ProtocolConfig, ledger: L) -> Result<Self, GalacticError> {
        config.validate()?;
        let accounts = &config.accounts;
        let scheduler = EmissionScheduler::new(config.genesis_time, config.emission.params())?;
        let reserved = ReservedEmission::new(accounts.treasury, accounts.non_defi, config.genesis_time);
        let accountant = RewardAccountant::new(
            accounts.chef,
            accounts.reward_token,
            scheduler,
            PoolRegistry::new(config.max_total_weight),
            reserved,
        );
        let router = FeeRouter::new(accounts.router, accounts.destinations());
        tracing::info!(
            "Protocol initialized: owner {}, chef {}, router {}, genesis {}",
            accounts.owner,
            accounts.chef,
            accounts.router,
            config.genesis_time
        );
        Ok(Self {
            owner: accounts.owner,
            ledger,
            accountant,
            router,
            events: Vec::new(),
            clock: config.genesis_time,
        })
    }

    /// Run `op` atomically at time `now`.
    fn transact<T>(
        &mut self,
        name: &str,
        now: Timestamp,
        op: impl FnOnce(&mut Self) -> Result<T, GalacticError>,
    ) -> Result<T, GalacticError> {
        if now < self.clock {
            return Err(GalacticError::InvalidState(format!(
                "{} at {} precedes the latest transaction at {}",
                name, now, self.clock
            )));
        }
        let mark = self.events.len();
        let (owner, ledger, accountant, router) = (
            self.owner,
            self.ledger.clone(),
            self.accountant.clone(),
            self.router.clone(),
        );
        match op(self) {
            Ok(value) => {
                self.clock = now;
                Ok(value)
            }
            Err(e) => {
                self.owner = owner;
                self.ledger = ledger;
                self.accountant = accountant;
                self.router = router;
                self.events.truncate(mark);
                tracing::warn!("{} rolled back: {}", name, e);
                Err(e)
            }
        }
    }

    fn owner_cap(&self, caller: &AccountId, action: &str) -> Result<OwnerCap, GalacticError> {
        OwnerCap::verify(&self.owner, caller, action)
    }

    // --- accessors --------------------------------------------------------

    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The ledger itself, for token operations outside the protocol
    /// (funding accounts, approvals).
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn accountant(&self) -> &RewardAccountant {
        &self.accountant
    }

    pub fn router(&self) -> &FeeRouter<S> {
        &self.router
    }

    /// A registered swap adapter, for maintenance outside the protocol.
    pub fn swap_adapter_mut(&mut self, id: &AccountId) -> Option<&mut S> {
        self.router.adapter_mut(id)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// The event log as JSON lines.
    pub fn export_events_json(&self) -> Result<String, GalacticError> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }

    // --- queries ----------------------------------------------------------

    pub fn pending_rewards(&self, pool_id: PoolId, user: &AccountId, now: Timestamp) -> Result<Amount, GalacticError> {
        self.accountant.pending_rewards(pool_id, user, now)
    }

    pub fn current_emission_rate(&self, now: Timestamp) -> Result<Amount, GalacticError> {
        self.accountant.current_emission_rate(now)
    }

    pub fn pool_emission_rate(&self, pool_id: PoolId, now: Timestamp) -> Result<Amount, GalacticError> {
        self.accountant.pool_emission_rate(pool_id, now)
    }

    // --- owner operations -------------------------------------------------

    pub fn add_pool(&mut self, caller: AccountId, new_pool: NewPool, now: Timestamp) -> Result<PoolId, GalacticError> {
        self.transact("add_pool", now, |p| {
            let cap = p.owner_cap(&caller, "add pool")?;
            let dependents: Vec<PoolId> = new_pool.dependent_pool_ids.clone();
            let old_weights = dependents
                .iter()
                .map(|id| p.accountant.registry().get(*id).map(|pool| pool.weight))
                .collect::<Result<Vec<u64>, GalacticError>>()?;
            let pool_id = p.accountant.add_pool(&cap, new_pool, now)?;

            let registry = p.accountant.registry();
            let total_weight = registry.total_weight();
            for (id, old_weight) in dependents.iter().zip(old_weights) {
                let new_weight = registry.get(*id)?.weight;
                p.events.push(LedgerEvent::PoolWeightChanged {
                    pool_id: *id,
                    old_weight,
                    new_weight,
                    total_weight,
                    time: now,
                });
            }
            let pool = registry.get(pool_id)?;
            p.events.push(LedgerEvent::PoolAdded {
                pool_id,
                token: pool.token,
                weight: pool.weight,
                deposit_fee_bps: pool.deposit_fee_bps,
                is_auto_compounder: pool.is_auto_compounder,
                is_liquidity_pool: pool.is_liquidity_pool,
                total_weight,
                time: now,
            });
            Ok(pool_id)
        })
    }

    pub fn edit_weight(&mut self, caller: AccountId, pool_id: PoolId, weight: u64, now: Timestamp) -> Result<(), GalacticError> {
        self.transact("edit_weight", now, |p| {
            let cap = p.owner_cap(&caller, "edit pool weight")?;
            let old_weight = p.accountant.edit_weight(&cap, pool_id, weight, now)?;
            p.events.push(LedgerEvent::PoolWeightChanged {
                pool_id,
                old_weight,
                new_weight: weight,
                total_weight: p.accountant.registry().total_weight(),
                time: now,
            });
            Ok(())
        })
    }

    pub fn pause_pool(&mut self, caller: AccountId, pool_id: PoolId, paused: bool, now: Timestamp) -> Result<(), GalacticError> {
        self.transact("pause_pool", now, |p| {
            let cap = p.owner_cap(&caller, "pause pool")?;
            p.accountant.pause_pool(&cap, pool_id, paused)?;
            p.events.push(LedgerEvent::PoolPauseChanged { pool_id, paused });
            Ok(())
        })
    }

    /// Mint the reserved allocations so far, then halve (by divisor) the
    /// emission rate from `now` on.
    pub fn apply_split(&mut self, caller: AccountId, now: Timestamp) -> Result<SplitOutcome, GalacticError> {
        self.transact("apply_split", now, |p| {
            let cap = p.owner_cap(&caller, "apply split")?;
            let outcome = p.accountant.apply_split(&cap, &mut p.ledger, now)?;
            p.record_reserved(&outcome.reserved, now);
            p.events.push(LedgerEvent::SplitApplied {
                split_count: outcome.split_count,
                new_rate: outcome.new_rate,
                time: now,
            });
            tracing::info!(
                "Split {} applied at {}: emission now {} wei/s",
                outcome.split_count,
                now,
                outcome.new_rate
            );
            Ok(outcome)
        })
    }

    /// Point deposit fees at `account`. With `notify_router`, `account`
    /// must be the fee router, which then processes each fee on arrival;
    /// the chef is authorized as a collector for that.
    pub fn set_fee_address(
        &mut self,
        caller: AccountId,
        account: AccountId,
        notify_router: bool,
        now: Timestamp,
    ) -> Result<(), GalacticError> {
        self.transact("set_fee_address", now, |p| {
            let cap = p.owner_cap(&caller, "set fee address")?;
            if notify_router && &account != p.router.account() {
                return Err(GalacticError::InvalidConfig(format!(
                    "notified fee address {} is not the fee router {}",
                    account,
                    p.router.account()
                )));
            }
            p.accountant.set_fee_address(&cap, account, notify_router);
            p.events.push(LedgerEvent::FeeAddressChanged { account, notify_router });
            let chef = *p.accountant.chef();
            if notify_router && !p.router.is_collector(&chef) {
                p.router.authorize_collector(&cap, chef, true);
                p.events.push(LedgerEvent::CollectorAuthorized {
                    account: chef,
                    authorized: true,
                });
            }
            Ok(())
        })
    }

    /// Install or replace the fee configuration of an existing pool.
    pub fn add_or_edit_fee(
        &mut self,
        caller: AccountId,
        pool_id: PoolId,
        config: FeeConfig,
        now: Timestamp,
    ) -> Result<(), GalacticError> {
        self.transact("add_or_edit_fee", now, |p| {
            let cap = p.owner_cap(&caller, "configure fees")?;
            p.accountant.registry().get(pool_id)?;
            p.router.add_or_edit_fee(&cap, pool_id, config)?;
            p.events.push(LedgerEvent::FeeConfigured { pool_id });
            Ok(())
        })
    }

    /// Redirect one fee destination. The treasury destination also receives
    /// the treasury's share of emission.
    pub fn set_destination(
        &mut self,
        caller: AccountId,
        destination: FeeDestination,
        account: AccountId,
        now: Timestamp,
    ) -> Result<(), GalacticError> {
        self.transact("set_destination", now, |p| {
            let cap = p.owner_cap(&caller, "set fee destination")?;
            if destination == FeeDestination::Treasury {
                // mint what accrued to the old treasury first
                let payout = p.accountant.settle_reserved(&mut p.ledger, now)?;
                p.record_reserved(&payout, now);
                p.accountant.set_treasury(&cap, account);
            }
            p.router.set_destination(&cap, destination, account);
            p.events.push(LedgerEvent::DestinationChanged { destination, account });
            Ok(())
        })
    }

    pub fn authorize_collector(
        &mut self,
        caller: AccountId,
        account: AccountId,
        authorized: bool,
        now: Timestamp,
    ) -> Result<(), GalacticError> {
        self.transact("authorize_collector", now, |p| {
            let cap = p.owner_cap(&caller, "authorize fee collector")?;
            p.router.authorize_collector(&cap, account, authorized);
            p.events.push(LedgerEvent::CollectorAuthorized { account, authorized });
            Ok(())
        })
    }

    pub fn register_swap_adapter(&mut self, caller: AccountId, adapter: S, now: Timestamp) -> Result<AccountId, GalacticError> {
        self.transact("register_swap_adapter", now, |p| {
            let cap = p.owner_cap(&caller, "register swap adapter")?;
            let id = p.router.register_swap_adapter(&cap, adapter);
            p.events.push(LedgerEvent::SwapAdapterRegistered { adapter: id });
            Ok(id)
        })
    }

    pub fn transfer_ownership(&mut self, caller: AccountId, new_owner: AccountId, now: Timestamp) -> Result<(), GalacticError> {
        self.transact("transfer_ownership", now, |p| {
            p.owner_cap(&caller, "transfer ownership")?;
            let previous = p.owner;
            p.owner = new_owner;
            p.events.push(LedgerEvent::OwnershipTransferred { previous, new_owner });
            tracing::info!("Ownership transferred {} -> {}", previous, new_owner);
            Ok(())
        })
    }

    // --- user operations --------------------------------------------------

    /// Stake `amount` (after the deposit fee) and harvest pending rewards.
    /// With `amount == 0` this only harvests.
    pub fn deposit(&mut self, caller: AccountId, pool_id: PoolId, amount: Amount, now: Timestamp) -> Result<DepositReceipt, GalacticError> {
        self.transact("deposit", now, |p| {
            let receipt = p.accountant.deposit(&mut p.ledger, pool_id, caller, amount, now)?;
            if receipt.amount > 0 {
                p.events.push(LedgerEvent::Deposit {
                    pool_id,
                    user: caller,
                    amount: receipt.amount,
                    fee: receipt.fee,
                    net: receipt.net,
                });
            }
            p.record_harvest(pool_id, caller, receipt.harvested);
            if let Some(fee_address) = receipt.fee_address {
                if fee_address.notify_router {
                    let owner = p.owner;
                    let chef = *p.accountant.chef();
                    let distribution =
                        p.router
                            .receive_fees(&mut p.ledger, &owner, &chef, pool_id, receipt.token, receipt.fee)?;
                    p.record_distribution(distribution);
                }
            }
            Ok(receipt)
        })
    }

    pub fn harvest(&mut self, caller: AccountId, pool_id: PoolId, now: Timestamp) -> Result<Amount, GalacticError> {
        self.deposit(caller, pool_id, 0, now).map(|r| r.harvested)
    }

    pub fn withdraw(&mut self, caller: AccountId, pool_id: PoolId, amount: Amount, now: Timestamp) -> Result<WithdrawReceipt, GalacticError> {
        self.transact("withdraw", now, |p| {
            let receipt = p.accountant.withdraw(&mut p.ledger, pool_id, caller, amount, now)?;
            if amount > 0 {
                p.events.push(LedgerEvent::Withdraw {
                    pool_id,
                    user: caller,
                    amount,
                });
            }
            p.record_harvest(pool_id, caller, receipt.harvested);
            Ok(receipt)
        })
    }

    pub fn emergency_withdraw(&mut self, caller: AccountId, pool_id: PoolId, now: Timestamp) -> Result<Amount, GalacticError> {
        self.transact("emergency_withdraw", now, |p| {
            let amount = p.accountant.emergency_withdraw(&mut p.ledger, pool_id, caller, now)?;
            p.events.push(LedgerEvent::EmergencyWithdraw {
                pool_id,
                user: caller,
                amount,
            });
            Ok(amount)
        })
    }

    /// Mint an auto-compounder pool's accrued share; only its token
    /// address may call this.
    pub fn mint_compounder_rewards(&mut self, caller: AccountId, pool_id: PoolId, now: Timestamp) -> Result<Amount, GalacticError> {
        self.transact("mint_compounder_rewards", now, |p| {
            let amount = p.accountant.mint_compounder_rewards(&mut p.ledger, caller, pool_id, now)?;
            p.events.push(LedgerEvent::CompounderRewardsMinted {
                pool_id,
                beneficiary: caller,
                amount,
            });
            Ok(amount)
        })
    }

    /// Mint the treasury and non-DeFi emission accrued so far. Open to anyone.
    pub fn settle_reserved(&mut self, now: Timestamp) -> Result<ReservedPayout, GalacticError> {
        self.transact("settle_reserved", now, |p| {
            let payout = p.accountant.settle_reserved(&mut p.ledger, now)?;
            p.record_reserved(&payout, now);
            Ok(payout)
        })
    }

    /// Distribute `amount` of the pool's token that the router already holds.
    pub fn receive_fees(&mut self, caller: AccountId, pool_id: PoolId, amount: Amount, now: Timestamp) -> Result<FeeDistribution, GalacticError> {
        self.transact("receive_fees", now, |p| {
            let fee_token = p.accountant.registry().get(pool_id)?.token;
            let owner = p.owner;
            let distribution = p
                .router
                .receive_fees(&mut p.ledger, &owner, &caller, pool_id, fee_token, amount)?;
            p.record_distribution(distribution.clone());
            Ok(distribution)
        })
    }

    // --- event helpers ----------------------------------------------------

    fn record_harvest(&mut self, pool_id: PoolId, user: AccountId, reward: Amount) {
        if reward > 0 {
            self.events.push(LedgerEvent::Harvest { pool_id, user, reward });
        }
    }

    fn record_reserved(&mut self, payout: &ReservedPayout, now: Timestamp) {
        if payout.treasury_amount > 0 || payout.non_defi_amount > 0 {
            self.events.push(LedgerEvent::ReservedEmissionMinted {
                treasury_amount: payout.treasury_amount,
                non_defi_amount: payout.non_defi_amount,
                time: now,
            });
        }
    }

    fn record_distribution(&mut self, distribution: FeeDistribution) {
        self.events.push(LedgerEvent::FeesDistributed {
            pool_id: distribution.pool_id,
            fee_token: distribution.fee_token,
            amount: distribution.amount,
            transfers: distribution.transfers,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galactic_core::identity::{Address, TokenId};
    use galactic_core::token::tokens;
    use galactic_economics::emission::Allocation;
    use galactic_store::{MemoryTokenLedger, PairSwapAdapter};

    const GENESIS: Timestamp = 1_700_000_000;

    type TestProtocol = Protocol<MemoryTokenLedger, PairSwapAdapter>;

    fn busd() -> TokenId {
        Address::from_label("BUSD")
    }

    fn alice() -> AccountId {
        Address::from_label("alice")
    }

    fn protocol() -> TestProtocol {
        let config = ProtocolConfig {
            genesis_time: GENESIS,
            ..ProtocolConfig::default()
        };
        let a = &config.accounts;
        let mut ledger = MemoryTokenLedger::new();
        ledger.create_token(a.reward_token, "NICE", a.owner).unwrap();
        ledger.toggle_minter(&a.reward_token, &a.owner, a.chef).unwrap();
        ledger.create_token(busd(), "BUSD", a.owner).unwrap();
        ledger.mint(&busd(), &a.owner, &alice(), tokens(1_000)).unwrap();
        ledger.approve(&busd(), &alice(), &a.chef, Amount::MAX).unwrap();
        Protocol::new(&config, ledger).unwrap()
    }

    fn owner(p: &TestProtocol) -> AccountId {
        *p.owner()
    }

    #[test]
    fn test_unauthorized_calls_leave_no_trace() {
        let mut p = protocol();
        let stranger = Address::from_label("stranger");
        let err = p.add_pool(stranger, NewPool::staking(busd(), 100), GENESIS).unwrap_err();
        assert!(matches!(err, GalacticError::Unauthorized { caller, .. } if caller == stranger));
        assert!(p.apply_split(stranger, GENESIS + 1).is_err());
        assert!(p.transfer_ownership(stranger, stranger, GENESIS + 1).is_err());
        assert!(p.accountant().registry().is_empty());
        assert_eq!(p.accountant().scheduler().split_count(), 0);
        assert!(p.events().is_empty());
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100), GENESIS + 100).unwrap();
        let err = p.deposit(alice(), 1, tokens(1), GENESIS + 99).unwrap_err();
        assert!(matches!(err, GalacticError::InvalidState(_)));
        assert!(p.deposit(alice(), 1, tokens(1), GENESIS + 100).is_ok());
    }

    #[test]
    fn test_rejected_call_does_not_advance_clock() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100), GENESIS).unwrap();
        p.pause_pool(o, 1, true, GENESIS).unwrap();
        let events = p.events().len();
        let err = p.deposit(alice(), 1, tokens(10), GENESIS + 50).unwrap_err();
        assert_eq!(err, GalacticError::PoolPaused { pool_id: 1 });
        assert_eq!(p.events().len(), events);
        assert_eq!(p.ledger().balance_of(&busd(), &alice()), tokens(1_000));
        // the failed call at +50 did not move time forward
        p.pause_pool(o, 1, false, GENESIS + 10).unwrap();
        p.deposit(alice(), 1, tokens(10), GENESIS + 20).unwrap();
        assert_eq!(p.accountant().stake(1, &alice()).amount, tokens(10));
    }

    #[test]
    fn test_rollback_truncates_event_log() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100).with_deposit_fee(400), GENESIS).unwrap();
        let pancake = Address::from_label("pancake");
        p.register_swap_adapter(o, PairSwapAdapter::new(pancake, 25).unwrap(), GENESIS)
            .unwrap();
        let fees = Address::from_label("fees");
        p.set_fee_address(o, fees, false, GENESIS).unwrap();
        for i in 1..=40 {
            p.deposit(alice(), 1, tokens(1), GENESIS + i).unwrap();
        }
        let config = FeeConfig {
            other_splits: [2000, 3000, 1000, 1500, 1500].into(),
            flags: [true, false, false].into(),
            swap_adapter: pancake,
            own_path: vec![busd(), *p.accountant().reward_token()],
            ..FeeConfig::default()
        };
        p.add_or_edit_fee(o, 1, config, GENESIS + 40).unwrap();
        let router = *p.router().account();
        p.set_fee_address(o, router, true, GENESIS + 40).unwrap();

        // the deposit is logged, then routing fails on a pair with no liquidity
        let mark = p.events().len();
        let committed = p.events().to_vec();
        let err = p.deposit(alice(), 1, tokens(10), GENESIS + 50).unwrap_err();
        assert!(matches!(err, GalacticError::SwapFailed(_)));
        assert_eq!(p.events().len(), mark);
        assert_eq!(p.events(), committed.as_slice());

        p.set_fee_address(o, fees, false, GENESIS + 50).unwrap();
        p.deposit(alice(), 1, tokens(10), GENESIS + 50).unwrap();
        assert_eq!(&p.events()[..mark], committed.as_slice());
        assert_eq!(
            p.events()[mark],
            LedgerEvent::FeeAddressChanged {
                account: fees,
                notify_router: false
            }
        );
    }

    #[test]
    fn test_notify_requires_router_account() {
        let mut p = protocol();
        let o = owner(&p);
        let stranger = Address::from_label("stranger");
        assert!(matches!(
            p.set_fee_address(o, stranger, true, GENESIS),
            Err(GalacticError::InvalidConfig(_))
        ));
        let router = *p.router().account();
        p.set_fee_address(o, router, true, GENESIS).unwrap();
        let chef = *p.accountant().chef();
        assert!(p.router().is_collector(&chef));
        assert_eq!(
            p.events(),
            &[
                LedgerEvent::FeeAddressChanged {
                    account: router,
                    notify_router: true
                },
                LedgerEvent::CollectorAuthorized {
                    account: chef,
                    authorized: true
                },
            ]
        );
    }

    #[test]
    fn test_deposit_fee_routed_on_arrival() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100).with_deposit_fee(400), GENESIS).unwrap();
        let router = *p.router().account();
        p.set_fee_address(o, router, true, GENESIS).unwrap();

        let receipt = p.deposit(alice(), 1, tokens(100), GENESIS + 1).unwrap();
        assert_eq!(receipt.fee, tokens(4));
        assert_eq!(receipt.net, tokens(96));

        // no fee configuration: everything is unbudgeted and goes to the treasury
        let treasury = p.router().destinations().treasury;
        assert_eq!(p.ledger().balance_of(&busd(), &treasury), tokens(4));
        assert_eq!(p.ledger().balance_of(&busd(), &router), 0);
        assert_eq!(p.accountant().stake(1, &alice()).amount, tokens(96));
        assert_eq!(p.router().stats(1).total_received, tokens(4));
        assert!(matches!(p.events().last(), Some(LedgerEvent::FeesDistributed { amount, .. }) if *amount == tokens(4)));
    }

    #[test]
    fn test_harvest_matches_pending() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100), GENESIS).unwrap();
        p.deposit(alice(), 1, tokens(100), GENESIS).unwrap();
        let pending = p.pending_rewards(1, &alice(), GENESIS + 3_600).unwrap();
        assert!(pending > 0);
        let harvested = p.harvest(alice(), 1, GENESIS + 3_600).unwrap();
        assert_eq!(harvested, pending);
        let nice = *p.accountant().reward_token();
        assert_eq!(p.ledger().balance_of(&nice, &alice()), pending);
        assert_eq!(p.pending_rewards(1, &alice(), GENESIS + 3_600).unwrap(), 0);
        assert!(matches!(p.events().last(), Some(LedgerEvent::Harvest { reward, .. }) if *reward == pending));
    }

    #[test]
    fn test_treasury_change_settles_old_treasury_first() {
        let mut p = protocol();
        let o = owner(&p);
        let old = p.router().destinations().treasury;
        let new = Address::from_label("treasury-v2");
        p.set_destination(o, FeeDestination::Treasury, new, GENESIS + 10).unwrap();
        p.settle_reserved(GENESIS + 20).unwrap();

        let nice = *p.accountant().reward_token();
        let scheduler = p.accountant().scheduler();
        let first = scheduler.allocation_between(GENESIS, GENESIS + 10, Allocation::Treasury).unwrap();
        let second = scheduler.allocation_between(GENESIS + 10, GENESIS + 20, Allocation::Treasury).unwrap();
        assert!(first > 0);
        assert_eq!(p.ledger().balance_of(&nice, &old), first);
        assert_eq!(p.ledger().balance_of(&nice, &new), second);
        assert_eq!(p.router().destinations().treasury, new);
        assert_eq!(p.accountant().reserved().treasury(), &new);
    }

    #[test]
    fn test_ownership_transfer() {
        let mut p = protocol();
        let o = owner(&p);
        let successor = Address::from_label("successor");
        p.transfer_ownership(o, successor, GENESIS).unwrap();
        assert_eq!(p.owner(), &successor);
        assert!(p.add_pool(o, NewPool::staking(busd(), 1), GENESIS).is_err());
        assert!(p.add_pool(successor, NewPool::staking(busd(), 1), GENESIS).is_ok());
    }

    #[test]
    fn test_add_pool_with_dependents_logs_reweights() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100), GENESIS).unwrap();
        let lp = Address::from_label("NICE-BUSD");
        p.add_pool(o, NewPool::staking(lp, 300).with_dependents(vec![1], vec![50]), GENESIS)
            .unwrap();
        assert_eq!(p.accountant().registry().total_weight(), 350);
        assert!(p.events().contains(&LedgerEvent::PoolWeightChanged {
            pool_id: 1,
            old_weight: 100,
            new_weight: 50,
            total_weight: 350,
            time: GENESIS,
        }));
    }

    #[test]
    fn test_export_events_json_lines() {
        let mut p = protocol();
        let o = owner(&p);
        p.add_pool(o, NewPool::staking(busd(), 100), GENESIS).unwrap();
        p.apply_split(o, GENESIS + 60).unwrap();
        let json = p.export_events_json().unwrap();
        let lines: Vec<&str> = json.lines().collect();
        assert_eq!(lines.len(), p.events().len());
        for (line, event) in lines.iter().zip(p.events()) {
            let back: LedgerEvent = serde_json::from_str(line).unwrap();
            assert_eq!(&back, event);
        }
        assert!(lines.iter().any(|l| l.starts_with("{\"split_applied\"")));
    }
}
