// crates/galactic-core/src/access.rs
//
// Owner capability.
//
// Administrative methods on every component take `&OwnerCap`. The only way
// to obtain one is `OwnerCap::verify`, so an admin mutation cannot be
// reached without the role check having run first.

use crate::error::GalacticError;
use crate::identity::AccountId;

/// Proof that the current caller is the protocol owner.
#[derive(Debug)]
pub struct OwnerCap {
    holder: AccountId,
    _private: (),
}

impl OwnerCap {
    /// Issue a capability if `caller` is `owner`.
    ///
    /// # Errors
    /// Returns `GalacticError::Unauthorized` naming the attempted `action`.
    pub fn verify(owner: &AccountId, caller: &AccountId, action: &str) -> Result<Self, GalacticError> {
        if owner != caller {
            return Err(GalacticError::unauthorized(*caller, action));
        }
        Ok(Self {
            holder: *caller,
            _private: (),
        })
    }

    /// The account the capability was issued to.
    pub fn holder(&self) -> &AccountId {
        &self.holder
    }
}
