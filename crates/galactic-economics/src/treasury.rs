// crates/galactic-economics/src/treasury.rs
//
// Reserved emission: the treasury and non-DeFi allocations.
//
// These two slices of emission go to fixed accounts independent of pool
// weights. They accrue continuously and are minted in one batch by
// `settle`, which the accountant runs before every split and which anyone
// may trigger.

use serde::{Deserialize, Serialize};

use galactic_core::access::OwnerCap;
use galactic_core::error::GalacticError;
use galactic_core::identity::AccountId;
use galactic_core::token::{Amount, Timestamp};

use crate::emission::{Allocation, EmissionScheduler};

/// Amounts released by one settlement of the reserved allocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedPayout {
    pub treasury: AccountId,
    pub treasury_amount: Amount,
    pub non_defi: AccountId,
    pub non_defi_amount: Amount,
}

/// Settlement state of the treasury and non-DeFi allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedEmission {
    treasury: AccountId,
    non_defi: AccountId,
    last_settle_time: Timestamp,
    treasury_minted: Amount,
    non_defi_minted: Amount,
}

impl ReservedEmission {
    /// Nothing accrues before `start` (normally genesis).
    pub fn new(treasury: AccountId, non_defi: AccountId, start: Timestamp) -> Self {
        Self {
            treasury,
            non_defi,
            last_settle_time: start,
            treasury_minted: 0,
            non_defi_minted: 0,
        }
    }

    pub fn treasury(&self) -> &AccountId {
        &self.treasury
    }

    pub fn non_defi(&self) -> &AccountId {
        &self.non_defi
    }

    pub fn last_settle_time(&self) -> Timestamp {
        self.last_settle_time
    }

    /// Total minted to the treasury so far.
    pub fn treasury_minted(&self) -> Amount {
        self.treasury_minted
    }

    /// Total minted to the non-DeFi account so far.
    pub fn non_defi_minted(&self) -> Amount {
        self.non_defi_minted
    }

    /// Accrued but unminted amounts at `now`, without mutating anything.
    pub fn pending(&self, scheduler: &EmissionScheduler, now: Timestamp) -> Result<ReservedPayout, GalacticError> {
        Ok(ReservedPayout {
            treasury: self.treasury,
            treasury_amount: scheduler.allocation_between(self.last_settle_time, now, Allocation::Treasury)?,
            non_defi: self.non_defi,
            non_defi_amount: scheduler.allocation_between(self.last_settle_time, now, Allocation::NonDefi)?,
        })
    }

    /// Advance the settlement clock to `now` and return what must be minted.
    /// The caller performs the mint after this bookkeeping.
    pub fn settle(&mut self, scheduler: &EmissionScheduler, now: Timestamp) -> Result<ReservedPayout, GalacticError> {
        if now <= self.last_settle_time {
            return Ok(ReservedPayout {
                treasury: self.treasury,
                non_defi: self.non_defi,
                ..ReservedPayout::default()
            });
        }
        let payout = self.pending(scheduler, now)?;
        self.treasury_minted = self
            .treasury_minted
            .checked_add(payout.treasury_amount)
            .ok_or_else(|| GalacticError::overflow("treasury minted"))?;
        self.non_defi_minted = self
            .non_defi_minted
            .checked_add(payout.non_defi_amount)
            .ok_or_else(|| GalacticError::overflow("non-DeFi minted"))?;
        self.last_settle_time = now;
        Ok(payout)
    }

    pub fn set_treasury(&mut self, _cap: &OwnerCap, account: AccountId) {
        tracing::info!("Treasury account {} -> {}", self.treasury, account);
        self.treasury = account;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::{EmissionParams, SECONDS_PER_YEAR};
    use galactic_core::identity::Address;

    const GENESIS: Timestamp = 1_000;

    fn setup() -> (EmissionScheduler, ReservedEmission) {
        let scheduler = EmissionScheduler::new(GENESIS, EmissionParams::default()).unwrap();
        let reserved = ReservedEmission::new(
            Address::from_label("treasury"),
            Address::from_label("non-defi"),
            GENESIS,
        );
        (scheduler, reserved)
    }

    #[test]
    fn test_one_second_of_reserved_emission() {
        let (scheduler, mut reserved) = setup();
        let payout = reserved.settle(&scheduler, GENESIS + 1).unwrap();
        // C(1) = 47_564_687_975_646_879_756 wei, split 100 : 980 of 1500
        assert_eq!(payout.treasury_amount, 3_170_979_198_376_458_650);
        assert_eq!(payout.non_defi_amount, 31_075_596_144_089_294_773);
        assert_eq!(reserved.last_settle_time(), GENESIS + 1);
    }

    #[test]
    fn test_settle_is_idempotent_at_same_time() {
        let (scheduler, mut reserved) = setup();
        reserved.settle(&scheduler, GENESIS + 500).unwrap();
        let again = reserved.settle(&scheduler, GENESIS + 500).unwrap();
        assert_eq!(again.treasury_amount, 0);
        assert_eq!(again.non_defi_amount, 0);
    }

    #[test]
    fn test_piecewise_settlement_matches_single() {
        let (scheduler, mut split) = setup();
        let (_, mut single) = setup();
        for t in [GENESIS + 7, GENESIS + 1_000, GENESIS + 86_399, GENESIS + 86_400] {
            split.settle(&scheduler, t).unwrap();
        }
        single.settle(&scheduler, GENESIS + 86_400).unwrap();
        assert_eq!(split.treasury_minted(), single.treasury_minted());
        assert_eq!(split.non_defi_minted(), single.non_defi_minted());
    }

    #[test]
    fn test_full_year_shares() {
        let (scheduler, mut reserved) = setup();
        reserved.settle(&scheduler, GENESIS + SECONDS_PER_YEAR).unwrap();
        let yearly = scheduler.params().yearly_emission;
        assert_eq!(reserved.treasury_minted(), yearly * 100 / 1500);
        assert_eq!(reserved.non_defi_minted(), yearly * 980 / 1500);
    }

    #[test]
    fn test_pending_does_not_mutate() {
        let (scheduler, reserved) = setup();
        let p = reserved.pending(&scheduler, GENESIS + 10).unwrap();
        assert!(p.treasury_amount > 0);
        assert_eq!(reserved.last_settle_time(), GENESIS);
    }
}
