// crates/galactic-economics/src/lib.rs
//
// galactic-economics: emission schedule, pool registry, reward accounting,
// and reserved (treasury / non-DeFi) emission for the Galactic ledger.
//
// All monetary values are tracked in wei (10^18 wei = 1 token).

pub mod emission;
pub mod pools;
pub mod rewards;
pub mod treasury;

// Re-export key types for ergonomic access from downstream crates.
pub use emission::{
    Allocation, EmissionParams, EmissionScheduler, SplitSegment, DEFAULT_NON_DEFI_SHARE,
    DEFAULT_POOL_SHARE, DEFAULT_TREASURY_SHARE, DEFAULT_YEARLY_EMISSION, SECONDS_PER_YEAR,
};
pub use pools::{NewPool, Pool, PoolRegistry, DEFAULT_MAX_TOTAL_WEIGHT};
pub use rewards::{DepositReceipt, FeeAddress, RewardAccountant, SplitOutcome, UserStake, WithdrawReceipt};
pub use treasury::{ReservedEmission, ReservedPayout};
