// crates/galactic-fees/src/config.rs
//
// Per-pool fee configuration.
//
// A fee receipt is divided into an "own" side (distributed as received) and
// an "other" side (optionally swapped, then split five ways). Both sides
// send their unbudgeted basis points to the treasury.

use serde::{Deserialize, Serialize};

use galactic_core::error::GalacticError;
use galactic_core::identity::{AccountId, PoolId, TokenId};
use galactic_core::token::{Amount, BPS_DENOMINATOR};

/// Behavior switches, in their configuration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeFlags {
    /// Swap the other side through `own_path` before splitting it.
    pub swap_to_settlement: bool,
    /// The fee token is the reward token: everything is own side.
    pub own_token: bool,
    /// The fee token is a reward-token pair: half (rounded down) is own side.
    pub liquidity_pair: bool,
}

impl From<[bool; 3]> for FeeFlags {
    fn from(flags: [bool; 3]) -> Self {
        Self {
            swap_to_settlement: flags[0],
            own_token: flags[1],
            liquidity_pair: flags[2],
        }
    }
}

impl FeeFlags {
    /// Portion of `amount` handled as own side.
    pub fn own_portion(&self, amount: Amount) -> Amount {
        if self.own_token {
            amount
        } else if self.liquidity_pair {
            amount / 2
        } else {
            0
        }
    }
}

/// Own-side split: burn, perma-liquidity, lock-liquidity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnSplits {
    pub burn: u32,
    pub perma: u32,
    pub lock: u32,
}

impl OwnSplits {
    pub fn as_array(&self) -> [u32; 3] {
        [self.burn, self.perma, self.lock]
    }

    pub fn total(&self) -> u32 {
        self.burn.saturating_add(self.perma).saturating_add(self.lock)
    }
}

impl From<[u32; 3]> for OwnSplits {
    fn from(s: [u32; 3]) -> Self {
        Self {
            burn: s[0],
            perma: s[1],
            lock: s[2],
        }
    }
}

/// Other-side split: burn, staker, lottery, perma-liquidity, lock-liquidity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherSplits {
    pub burn: u32,
    pub staker: u32,
    pub lottery: u32,
    pub perma: u32,
    pub lock: u32,
}

impl OtherSplits {
    pub fn as_array(&self) -> [u32; 5] {
        [self.burn, self.staker, self.lottery, self.perma, self.lock]
    }

    pub fn total(&self) -> u32 {
        self.as_array().iter().fold(0u32, |a, b| a.saturating_add(*b))
    }
}

impl From<[u32; 5]> for OtherSplits {
    fn from(s: [u32; 5]) -> Self {
        Self {
            burn: s[0],
            staker: s[1],
            lottery: s[2],
            perma: s[3],
            lock: s[4],
        }
    }
}

/// Fee configuration of one pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeConfig {
    pub own_splits: OwnSplits,
    pub other_splits: OtherSplits,
    pub flags: FeeFlags,
    /// Adapter that executes this pool's swaps.
    pub swap_adapter: AccountId,
    /// Path from the fee token to the settlement token.
    pub own_path: Vec<TokenId>,
    /// Converts the other-side burn slice before burning.
    pub aux_path0: Vec<TokenId>,
    /// Converts the other-side liquidity slices before forwarding.
    pub aux_path1: Vec<TokenId>,
}

fn check_path(pool_id: PoolId, name: &str, path: &[TokenId]) -> Result<(), GalacticError> {
    if path.len() == 1 {
        return Err(GalacticError::InvalidConfig(format!(
            "pool {}: {} must be empty or have at least two tokens",
            pool_id, name
        )));
    }
    Ok(())
}

impl FeeConfig {
    /// Whether any swap can be requested by this configuration.
    pub fn uses_swaps(&self) -> bool {
        !self.own_path.is_empty() || !self.aux_path0.is_empty() || !self.aux_path1.is_empty()
    }

    /// # Errors
    /// `FeeBudgetExceeded` if either split sums above 10000 bps;
    /// `InvalidConfig` for conflicting flags or malformed paths.
    pub fn validate(&self, pool_id: PoolId) -> Result<(), GalacticError> {
        let own = self.own_splits.total();
        if own as u128 > BPS_DENOMINATOR {
            return Err(GalacticError::FeeBudgetExceeded {
                pool_id,
                side: "own",
                total_bps: own,
            });
        }
        let other = self.other_splits.total();
        if other as u128 > BPS_DENOMINATOR {
            return Err(GalacticError::FeeBudgetExceeded {
                pool_id,
                side: "other",
                total_bps: other,
            });
        }
        if self.flags.own_token && self.flags.liquidity_pair {
            return Err(GalacticError::InvalidConfig(format!(
                "pool {}: own-token and liquidity-pair flags are exclusive",
                pool_id
            )));
        }
        check_path(pool_id, "own path", &self.own_path)?;
        check_path(pool_id, "aux path 0", &self.aux_path0)?;
        check_path(pool_id, "aux path 1", &self.aux_path1)?;
        if self.flags.swap_to_settlement && self.own_path.is_empty() {
            return Err(GalacticError::InvalidConfig(format!(
                "pool {}: swap to settlement needs an own path",
                pool_id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galactic_core::identity::Address;

    fn path(labels: &[&str]) -> Vec<TokenId> {
        labels.iter().map(|l| Address::from_label(l)).collect()
    }

    #[test]
    fn test_budget_exactly_full_ok() {
        let config = FeeConfig {
            own_splits: [5000, 2500, 2500].into(),
            other_splits: [2000, 2000, 2000, 2000, 2000].into(),
            ..FeeConfig::default()
        };
        assert!(config.validate(1).is_ok());
    }

    #[test]
    fn test_budget_exceeded_by_one() {
        let config = FeeConfig {
            other_splits: [2000, 2000, 2000, 2000, 2001].into(),
            ..FeeConfig::default()
        };
        assert_eq!(
            config.validate(4).unwrap_err(),
            GalacticError::FeeBudgetExceeded {
                pool_id: 4,
                side: "other",
                total_bps: 10_001
            }
        );
        let config = FeeConfig {
            own_splits: [10_000, 0, 1].into(),
            ..FeeConfig::default()
        };
        assert!(matches!(
            config.validate(4),
            Err(GalacticError::FeeBudgetExceeded { side: "own", .. })
        ));
    }

    #[test]
    fn test_huge_bps_do_not_wrap() {
        let config = FeeConfig {
            other_splits: [u32::MAX, u32::MAX, 0, 0, 0].into(),
            ..FeeConfig::default()
        };
        assert!(config.validate(1).is_err());
    }

    #[test]
    fn test_conflicting_flags() {
        let config = FeeConfig {
            flags: [false, true, true].into(),
            ..FeeConfig::default()
        };
        assert!(matches!(config.validate(1), Err(GalacticError::InvalidConfig(_))));
    }

    #[test]
    fn test_single_token_path_rejected() {
        let config = FeeConfig {
            aux_path1: path(&["BUSD"]),
            ..FeeConfig::default()
        };
        assert!(config.validate(1).is_err());
    }

    #[test]
    fn test_settlement_swap_needs_path() {
        let mut config = FeeConfig {
            flags: [true, false, false].into(),
            ..FeeConfig::default()
        };
        assert!(config.validate(1).is_err());
        config.own_path = path(&["BUSD", "WETH"]);
        assert!(config.validate(1).is_ok());
        assert!(config.uses_swaps());
    }

    #[test]
    fn test_own_portion() {
        assert_eq!(FeeFlags::from([false, true, false]).own_portion(9), 9);
        assert_eq!(FeeFlags::from([false, false, true]).own_portion(9), 4);
        assert_eq!(FeeFlags::default().own_portion(9), 0);
    }
}
