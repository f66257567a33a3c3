// crates/galactic-core/src/lib.rs
//
// galactic-core: Core types, traits, and fixed-point helpers for the Galactic
// emission and fee-routing ledger.
//
// This is the leaf crate that all other crates in the workspace depend on.
// It defines addresses, amounts, the protocol error type, the owner
// capability, the event vocabulary, and the interfaces of the two external
// collaborators (token ledger and swap adapter).

pub mod access;
pub mod error;
pub mod events;
pub mod identity;
pub mod math;
pub mod token;
pub mod traits;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use galactic_core::Address;`

// Identity types
pub use identity::{AccountId, Address, PoolId, TokenId};

// Amounts and fixed point
pub use math::{mul_add_div_rem, mul_div, mul_div_rem, ACC_PRECISION};
pub use token::{tokens, Amount, DisplayAmount, Timestamp, BPS_DENOMINATOR, WEI_PER_TOKEN};

// Access control
pub use access::OwnerCap;

// Events
pub use events::{FeeDestination, FeeTransfer, LedgerEvent};

// Error type
pub use error::GalacticError;

// Traits
pub use traits::{SwapAdapter, TokenLedger};
