// crates/galactic-core/src/traits.rs

use crate::error::GalacticError;
use crate::identity::{AccountId, TokenId};
use crate::token::Amount;

/// Fungible-token primitives with ERC20-like semantics.
///
/// Implemented by galactic-store (`MemoryTokenLedger`). Every token variant
/// (the reward token, arbitrary third-party tokens, liquidity-pair tokens)
/// is driven through this one interface.
pub trait TokenLedger {
    /// Balance of `account` in `token`. Unknown tokens and accounts read as 0.
    fn balance_of(&self, token: &TokenId, account: &AccountId) -> Amount;

    /// Total minted supply of `token`.
    fn total_supply(&self, token: &TokenId) -> Amount;

    /// Amount `spender` may still pull from `owner`.
    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount;

    /// Set the allowance of `spender` over `owner`'s balance.
    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError>;

    /// Move `amount` from `from` to `to`.
    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError>;

    /// Third-party pull: `spender` moves `amount` from `from` to `to`,
    /// consuming allowance.
    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError>;

    /// Create `amount` new tokens for `to`. Only authorized minters may mint.
    fn mint(
        &mut self,
        token: &TokenId,
        minter: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError>;
}

/// Converts an input amount along an ordered token path.
///
/// Implemented by galactic-store (`PairSwapAdapter`).
pub trait SwapAdapter {
    /// The address under which the adapter is registered and holds reserves.
    fn account(&self) -> AccountId;

    /// Swap exactly `amount_in` of `path[0]` held by `holder` into
    /// `path.last()`, delivered back to `holder`. Returns the output amount.
    ///
    /// # Errors
    /// `GalacticError::SwapFailed` if the path is malformed, a hop has no
    /// liquidity, the output is zero, or slippage limits are exceeded.
    fn swap_exact_in(
        &mut self,
        ledger: &mut dyn TokenLedger,
        path: &[TokenId],
        amount_in: Amount,
        holder: &AccountId,
    ) -> Result<Amount, GalacticError>;
}
