// crates/galactic-fees/src/destinations.rs

use serde::{Deserialize, Serialize};

use galactic_core::events::FeeDestination;
use galactic_core::identity::AccountId;

/// Accounts that receive each fee slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destinations {
    pub treasury: AccountId,
    pub staker: AccountId,
    pub lottery: AccountId,
    pub perma_vault: AccountId,
    pub lock_vault: AccountId,
    /// Tokens sent here are out of circulation.
    pub burn_sink: AccountId,
}

impl Destinations {
    pub fn account(&self, destination: FeeDestination) -> AccountId {
        match destination {
            FeeDestination::Burn => self.burn_sink,
            FeeDestination::Staker => self.staker,
            FeeDestination::Lottery => self.lottery,
            FeeDestination::PermaLiquidity => self.perma_vault,
            FeeDestination::LockLiquidity => self.lock_vault,
            FeeDestination::Treasury => self.treasury,
        }
    }

    pub fn set(&mut self, destination: FeeDestination, account: AccountId) {
        let slot = match destination {
            FeeDestination::Burn => &mut self.burn_sink,
            FeeDestination::Staker => &mut self.staker,
            FeeDestination::Lottery => &mut self.lottery,
            FeeDestination::PermaLiquidity => &mut self.perma_vault,
            FeeDestination::LockLiquidity => &mut self.lock_vault,
            FeeDestination::Treasury => &mut self.treasury,
        };
        *slot = account;
    }
}
