// crates/galactic-runtime/src/config.rs
//
// Protocol configuration.
// Loaded from a TOML file or populated with the deployed system's defaults.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use galactic_core::error::GalacticError;
use galactic_core::identity::Address;
use galactic_core::token::{tokens, Timestamp};
use galactic_economics::emission::{
    EmissionParams, DEFAULT_NON_DEFI_SHARE, DEFAULT_POOL_SHARE, DEFAULT_TREASURY_SHARE,
};
use galactic_economics::pools::DEFAULT_MAX_TOTAL_WEIGHT;
use galactic_fees::Destinations;

/// Top-level protocol configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Unix time at which emission starts.
    #[serde(default)]
    pub genesis_time: Timestamp,

    #[serde(default)]
    pub emission: EmissionSection,

    /// Cap on the sum of all pool weights.
    #[serde(default = "default_max_total_weight")]
    pub max_total_weight: u64,

    #[serde(default)]
    pub accounts: AccountsSection,
}

/// `[emission]`: yearly amount and the three allocation shares.
#[derive(Debug, Clone, Deserialize)]
pub struct EmissionSection {
    /// Whole tokens emitted per year before any split.
    #[serde(default = "default_yearly_emission_tokens")]
    pub yearly_emission_tokens: u64,

    #[serde(default = "default_treasury_share")]
    pub treasury_share: u32,

    #[serde(default = "default_non_defi_share")]
    pub non_defi_share: u32,

    #[serde(default = "default_pool_share")]
    pub pool_share: u32,
}

/// `[accounts]`: hex addresses of every wired account.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountsSection {
    pub owner: Address,
    /// Custodies stakes and mints rewards.
    pub chef: Address,
    /// Holds fee receipts while they are distributed.
    pub router: Address,
    pub reward_token: Address,
    pub treasury: Address,
    pub non_defi: Address,
    pub staking_pool: Address,
    pub lottery: Address,
    pub perma_vault: Address,
    pub lock_vault: Address,
    pub burn_sink: Address,
}

fn default_max_total_weight() -> u64 {
    DEFAULT_MAX_TOTAL_WEIGHT
}

fn default_yearly_emission_tokens() -> u64 {
    1_500_000_000
}

fn default_treasury_share() -> u32 {
    DEFAULT_TREASURY_SHARE
}

fn default_non_defi_share() -> u32 {
    DEFAULT_NON_DEFI_SHARE
}

fn default_pool_share() -> u32 {
    DEFAULT_POOL_SHARE
}

/// `0x000000000000000000000000000000000000dEaD`
fn dead_address() -> Address {
    let mut bytes = [0u8; 20];
    bytes[18] = 0xde;
    bytes[19] = 0xad;
    Address(bytes)
}

impl Default for EmissionSection {
    fn default() -> Self {
        Self {
            yearly_emission_tokens: default_yearly_emission_tokens(),
            treasury_share: default_treasury_share(),
            non_defi_share: default_non_defi_share(),
            pool_share: default_pool_share(),
        }
    }
}

impl EmissionSection {
    pub fn params(&self) -> EmissionParams {
        EmissionParams {
            yearly_emission: tokens(self.yearly_emission_tokens),
            treasury_share: self.treasury_share,
            non_defi_share: self.non_defi_share,
            pool_share: self.pool_share,
        }
    }
}

impl Default for AccountsSection {
    fn default() -> Self {
        Self {
            owner: Address::from_label("owner"),
            chef: Address::from_label("chef"),
            router: Address::from_label("fee-router"),
            reward_token: Address::from_label("NICE"),
            treasury: Address::from_label("treasury"),
            non_defi: Address::from_label("non-defi"),
            staking_pool: Address::from_label("staking-pool"),
            lottery: Address::from_label("lottery"),
            perma_vault: Address::from_label("perma-vault"),
            lock_vault: Address::from_label("lock-vault"),
            burn_sink: dead_address(),
        }
    }
}

impl AccountsSection {
    pub fn destinations(&self) -> Destinations {
        Destinations {
            treasury: self.treasury,
            staker: self.staking_pool,
            lottery: self.lottery,
            perma_vault: self.perma_vault,
            lock_vault: self.lock_vault,
            burn_sink: self.burn_sink,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            genesis_time: 0,
            emission: EmissionSection::default(),
            max_total_weight: default_max_total_weight(),
            accounts: AccountsSection::default(),
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// # Errors
    /// `InvalidConfig` if the file cannot be read or parsed, or fails
    /// `validate`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, GalacticError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| GalacticError::InvalidConfig(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, GalacticError> {
        let config: ProtocolConfig =
            toml::from_str(contents).map_err(|e| GalacticError::InvalidConfig(format!("bad TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GalacticError> {
        self.emission.params().validate()?;
        if self.max_total_weight == 0 {
            return Err(GalacticError::InvalidConfig(
                "max_total_weight must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = ProtocolConfig::from_toml_str("").unwrap();
        assert_eq!(config.genesis_time, 0);
        assert_eq!(config.max_total_weight, 1_000_000);
        assert_eq!(config.emission.params(), EmissionParams::default());
        assert_eq!(config.accounts.owner, Address::from_label("owner"));
        assert_eq!(config.accounts.burn_sink.to_hex(), "0x000000000000000000000000000000000000dead");
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
            genesis_time = 1700000000
            max_total_weight = 500000

            [emission]
            pool_share = 500

            [accounts]
            owner = "0x1111111111111111111111111111111111111111"
        "#;
        let config = ProtocolConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.genesis_time, 1_700_000_000);
        assert_eq!(config.max_total_weight, 500_000);
        assert_eq!(config.emission.pool_share, 500);
        assert_eq!(config.emission.treasury_share, 100);
        assert_eq!(config.accounts.owner, Address([0x11; 20]));
        assert_eq!(config.accounts.chef, Address::from_label("chef"));
    }

    #[test]
    fn test_bad_address_rejected() {
        let toml = r#"
            [accounts]
            owner = "0x1234"
        "#;
        assert!(matches!(
            ProtocolConfig::from_toml_str(toml),
            Err(GalacticError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_shares_rejected() {
        let toml = r#"
            [emission]
            treasury_share = 0
            non_defi_share = 0
            pool_share = 0
        "#;
        assert!(ProtocolConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn test_zero_max_weight_rejected() {
        assert!(ProtocolConfig::from_toml_str("max_total_weight = 0").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ProtocolConfig::load("/nonexistent/galactic.toml"),
            Err(GalacticError::InvalidConfig(_))
        ));
    }
}
