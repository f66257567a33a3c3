// crates/galactic-store/src/ledger.rs
//
// In-memory multi-token ledger implementing the `TokenLedger` trait.
//
// Each registered token keeps its own balance book, allowance table, and
// minter set. The token's admin toggles minters, mirroring the
// `toggleMinter` pattern of the deployed reward token.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use galactic_core::error::GalacticError;
use galactic_core::identity::{AccountId, TokenId};
use galactic_core::token::Amount;
use galactic_core::traits::TokenLedger;

/// Balance book of a single token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TokenBook {
    symbol: String,
    admin: AccountId,
    total_supply: Amount,
    balances: BTreeMap<AccountId, Amount>,
    /// owner -> spender -> remaining allowance
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
    minters: BTreeSet<AccountId>,
}

impl TokenBook {
    fn balance(&self, account: &AccountId) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|m| m.get(spender))
            .copied()
            .unwrap_or(0)
    }

    fn debit(&mut self, token: &TokenId, account: &AccountId, amount: Amount) -> Result<(), GalacticError> {
        let available = self.balance(account);
        if available < amount {
            return Err(GalacticError::InsufficientBalance {
                token: *token,
                account: *account,
                available,
                requested: amount,
            });
        }
        self.balances.insert(*account, available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &AccountId, amount: Amount) -> Result<(), GalacticError> {
        let current = self.balance(account);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| GalacticError::overflow("token balance"))?;
        self.balances.insert(*account, updated);
        Ok(())
    }
}

/// Multi-token ledger held entirely in memory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTokenLedger {
    tokens: BTreeMap<TokenId, TokenBook>,
}

impl MemoryTokenLedger {
    /// Create an empty ledger with no tokens.
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
        }
    }

    /// Register a new token. `admin` controls the minter set and starts as
    /// its only minter.
    ///
    /// # Errors
    /// Returns `GalacticError::InvalidState` if the token already exists.
    pub fn create_token(&mut self, token: TokenId, symbol: &str, admin: AccountId) -> Result<(), GalacticError> {
        if self.tokens.contains_key(&token) {
            return Err(GalacticError::InvalidState(format!(
                "token {} ({}) already exists",
                token, symbol
            )));
        }
        let mut book = TokenBook {
            symbol: symbol.to_string(),
            admin,
            ..TokenBook::default()
        };
        book.minters.insert(admin);
        self.tokens.insert(token, book);
        tracing::debug!("Created token {} ({})", symbol, token);
        Ok(())
    }

    /// Grant or revoke minting rights. Returns whether `account` is a minter
    /// afterwards.
    ///
    /// # Errors
    /// `NotFound` for unknown tokens, `Unauthorized` if `caller` is not the
    /// token admin.
    pub fn toggle_minter(
        &mut self,
        token: &TokenId,
        caller: &AccountId,
        account: AccountId,
    ) -> Result<bool, GalacticError> {
        let book = self.book_mut(token)?;
        if &book.admin != caller {
            return Err(GalacticError::unauthorized(*caller, "toggle minter"));
        }
        let now_minter = if book.minters.remove(&account) {
            false
        } else {
            book.minters.insert(account);
            true
        };
        Ok(now_minter)
    }

    /// Whether `account` may mint `token`.
    pub fn is_minter(&self, token: &TokenId, account: &AccountId) -> bool {
        self.tokens
            .get(token)
            .map(|b| b.minters.contains(account))
            .unwrap_or(false)
    }

    /// Ticker of a registered token.
    pub fn symbol(&self, token: &TokenId) -> Option<&str> {
        self.tokens.get(token).map(|b| b.symbol.as_str())
    }

    fn book(&self, token: &TokenId) -> Result<&TokenBook, GalacticError> {
        self.tokens
            .get(token)
            .ok_or_else(|| GalacticError::NotFound(format!("token {}", token)))
    }

    fn book_mut(&mut self, token: &TokenId) -> Result<&mut TokenBook, GalacticError> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| GalacticError::NotFound(format!("token {}", token)))
    }
}

impl TokenLedger for MemoryTokenLedger {
    fn balance_of(&self, token: &TokenId, account: &AccountId) -> Amount {
        self.book(token).map(|b| b.balance(account)).unwrap_or(0)
    }

    fn total_supply(&self, token: &TokenId) -> Amount {
        self.book(token).map(|b| b.total_supply).unwrap_or(0)
    }

    fn allowance(&self, token: &TokenId, owner: &AccountId, spender: &AccountId) -> Amount {
        self.book(token)
            .map(|b| b.allowance(owner, spender))
            .unwrap_or(0)
    }

    fn approve(
        &mut self,
        token: &TokenId,
        owner: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError> {
        let book = self.book_mut(token)?;
        book.allowances
            .entry(*owner)
            .or_default()
            .insert(*spender, amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: &TokenId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError> {
        let book = self.book_mut(token)?;
        if amount == 0 {
            return Ok(());
        }
        book.debit(token, from, amount)?;
        book.credit(to, amount)?;
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: &TokenId,
        spender: &AccountId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError> {
        let book = self.book_mut(token)?;
        if amount == 0 {
            return Ok(());
        }
        let allowed = book.allowance(from, spender);
        if allowed < amount {
            return Err(GalacticError::InsufficientAllowance {
                token: *token,
                owner: *from,
                spender: *spender,
                allowed,
                requested: amount,
            });
        }
        book.debit(token, from, amount)?;
        book.credit(to, amount)?;
        book.allowances
            .entry(*from)
            .or_default()
            .insert(*spender, allowed - amount);
        Ok(())
    }

    fn mint(
        &mut self,
        token: &TokenId,
        minter: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), GalacticError> {
        let book = self.book_mut(token)?;
        if !book.minters.contains(minter) {
            return Err(GalacticError::unauthorized(*minter, format!("mint {}", book.symbol)));
        }
        if amount == 0 {
            return Ok(());
        }
        book.total_supply = book
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| GalacticError::overflow("total supply"))?;
        book.credit(to, amount)?;
        Ok(())
    }
}
