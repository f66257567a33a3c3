use thiserror::Error;

use crate::identity::{AccountId, PoolId, TokenId};
use crate::token::Amount;

/// Protocol-wide error types for the Galactic ledger.
///
/// Every variant aborts the enclosing transaction; the runtime restores the
/// pre-call state before surfacing the error to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalacticError {
    /// Caller lacks the owner, minter, or collector role.
    #[error("Unauthorized: {caller} cannot {action}")]
    Unauthorized { caller: AccountId, action: String },

    /// Weight, fee, path, or configuration argument is malformed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A basis-point split vector sums to more than 10000.
    #[error("Fee budget exceeded for pool {pool_id}: {side} splits sum to {total_bps} bps")]
    FeeBudgetExceeded {
        pool_id: PoolId,
        side: &'static str,
        total_bps: u32,
    },

    /// Deposit attempted on a paused pool.
    #[error("Pool {pool_id} is paused")]
    PoolPaused { pool_id: PoolId },

    /// Withdrawal exceeds the staked balance.
    #[error("Insufficient stake in pool {pool_id}: requested {requested}, staked {staked}")]
    InsufficientStake {
        pool_id: PoolId,
        requested: Amount,
        staked: Amount,
    },

    /// Third-party pull exceeds the approved allowance.
    #[error("Insufficient allowance on {token}: {spender} may pull {allowed} from {owner}, requested {requested}")]
    InsufficientAllowance {
        token: TokenId,
        owner: AccountId,
        spender: AccountId,
        allowed: Amount,
        requested: Amount,
    },

    /// Account does not hold enough of a token.
    #[error("Insufficient balance on {token}: {account} holds {available}, requested {requested}")]
    InsufficientBalance {
        token: TokenId,
        account: AccountId,
        available: Amount,
        requested: Amount,
    },

    /// Token movement rejected by the ledger.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// The swap adapter could not complete the conversion.
    #[error("Swap failed: {0}")]
    SwapFailed(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Checked arithmetic overflowed or divided by zero.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// Invalid state transition or broken internal invariant.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GalacticError {
    /// Shorthand for an `Unauthorized` error.
    pub fn unauthorized(caller: AccountId, action: impl Into<String>) -> Self {
        GalacticError::Unauthorized {
            caller,
            action: action.into(),
        }
    }

    /// Shorthand for an overflow in the named computation.
    pub fn overflow(what: &str) -> Self {
        GalacticError::Arithmetic(format!("overflow in {}", what))
    }
}

impl From<serde_json::Error> for GalacticError {
    fn from(e: serde_json::Error) -> Self {
        GalacticError::Serialization(e.to_string())
    }
}
