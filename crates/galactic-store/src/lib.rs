// crates/galactic-store/src/lib.rs
//
// galactic-store: In-memory implementations of the external collaborators.
//
// Provides a multi-token ERC20-like ledger with minter roles and allowances,
// and a constant-product swap adapter that routes multi-hop paths over
// registered pairs. Both are `Clone` so the runtime can snapshot them for
// transactional rollback.

pub mod ledger;
pub mod swap;

// Re-export key types for ergonomic access from downstream crates.
pub use ledger::MemoryTokenLedger;
pub use swap::PairSwapAdapter;
