// crates/galactic-fees/src/lib.rs
//
// galactic-fees: processes collected protocol fees into burn, staking,
// lottery, liquidity and treasury destinations.

pub mod config;
pub mod destinations;
pub mod router;
pub mod split;

pub use config::{FeeConfig, FeeFlags, OtherSplits, OwnSplits};
pub use destinations::Destinations;
pub use router::{FeeDistribution, FeeRouter, FeeStats};
pub use split::allocate_bps;
