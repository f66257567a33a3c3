// crates/galactic-core/src/identity.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::GalacticError;

/// A 20-byte ledger address.
///
/// Accounts, token contracts, vaults and swap routers are all identified by
/// address, so a liquidity-pool token and the account that issued it share
/// the same identity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub [u8; 20]);

/// An address that holds balances.
pub type AccountId = Address;

/// An address that identifies a fungible token.
pub type TokenId = Address;

/// Sequential pool identifier. The first pool is 1.
pub type PoolId = u32;

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive a deterministic address from a human-readable label.
    ///
    /// Takes the first 20 bytes of SHA-256(label).
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        Address(bytes)
    }

    /// Returns true for the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Lowercase hex with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = GalacticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(stripped)
            .map_err(|e| GalacticError::InvalidConfig(format!("bad address {:?}: {}", s, e)))?;
        if raw.len() != 20 {
            return Err(GalacticError::InvalidConfig(format!(
                "bad address {:?}: expected 20 bytes, got {}",
                s,
                raw.len()
            )));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&raw);
        Ok(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines and assertion output readable.
        write!(f, "0x{}..", hex::encode(&self.0[..4]))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_is_deterministic() {
        assert_eq!(Address::from_label("treasury"), Address::from_label("treasury"));
        assert_ne!(Address::from_label("treasury"), Address::from_label("lottery"));
    }

    #[test]
    fn test_hex_round_trip() {
        let addr = Address::from_label("chef");
        let parsed: Address = addr.to_hex().parse().unwrap();
        assert_eq!(parsed, addr);
    }

    #[test]
    fn test_parse_rejects_wrong_length() {
        assert!("0x1234".parse::<Address>().is_err());
        assert!("not-hex".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = Address::from_label("router");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_zero() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_label("x").is_zero());
    }
}
