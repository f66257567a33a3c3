// crates/galactic-core/src/events.rs
//
// Audit/replay events.
//
// The runtime appends one or more events for every committed operation.
// Rolled-back operations leave no events behind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::{AccountId, PoolId, TokenId};
use crate::token::{Amount, Timestamp};

/// Where a slice of a fee receipt ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeeDestination {
    /// Burn sink; tokens sent here are out of circulation.
    Burn,
    /// Staking-reward pool.
    Staker,
    /// Lottery pool.
    Lottery,
    /// Liquidity vault that never releases.
    PermaLiquidity,
    /// Time-locked liquidity vault.
    LockLiquidity,
    /// Protocol treasury; also receives the unbudgeted share.
    Treasury,
}

impl fmt::Display for FeeDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeDestination::Burn => write!(f, "burn"),
            FeeDestination::Staker => write!(f, "staker"),
            FeeDestination::Lottery => write!(f, "lottery"),
            FeeDestination::PermaLiquidity => write!(f, "perma-liquidity"),
            FeeDestination::LockLiquidity => write!(f, "lock-liquidity"),
            FeeDestination::Treasury => write!(f, "treasury"),
        }
    }
}

/// One token movement out of the fee router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTransfer {
    pub destination: FeeDestination,
    pub account: AccountId,
    pub token: TokenId,
    pub amount: Amount,
}

/// Events emitted by committed operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    PoolAdded {
        pool_id: PoolId,
        token: TokenId,
        weight: u64,
        deposit_fee_bps: u16,
        is_auto_compounder: bool,
        is_liquidity_pool: bool,
        total_weight: u64,
        time: Timestamp,
    },
    PoolWeightChanged {
        pool_id: PoolId,
        old_weight: u64,
        new_weight: u64,
        total_weight: u64,
        time: Timestamp,
    },
    PoolPauseChanged {
        pool_id: PoolId,
        paused: bool,
    },
    SplitApplied {
        split_count: u32,
        /// Total emission rate in wei per second from this point on.
        new_rate: Amount,
        time: Timestamp,
    },
    ReservedEmissionMinted {
        treasury_amount: Amount,
        non_defi_amount: Amount,
        time: Timestamp,
    },
    Deposit {
        pool_id: PoolId,
        user: AccountId,
        amount: Amount,
        fee: Amount,
        net: Amount,
    },
    Withdraw {
        pool_id: PoolId,
        user: AccountId,
        amount: Amount,
    },
    Harvest {
        pool_id: PoolId,
        user: AccountId,
        reward: Amount,
    },
    EmergencyWithdraw {
        pool_id: PoolId,
        user: AccountId,
        amount: Amount,
    },
    CompounderRewardsMinted {
        pool_id: PoolId,
        beneficiary: AccountId,
        amount: Amount,
    },
    FeeAddressChanged {
        account: AccountId,
        notify_router: bool,
    },
    FeeConfigured {
        pool_id: PoolId,
    },
    FeesDistributed {
        pool_id: PoolId,
        fee_token: TokenId,
        amount: Amount,
        transfers: Vec<FeeTransfer>,
    },
    DestinationChanged {
        destination: FeeDestination,
        account: AccountId,
    },
    CollectorAuthorized {
        account: AccountId,
        authorized: bool,
    },
    SwapAdapterRegistered {
        adapter: AccountId,
    },
    OwnershipTransferred {
        previous: AccountId,
        new_owner: AccountId,
    },
}
