// crates/galactic-core/src/token.rs
//
// Amount type and unit constants.
//
// All accounting is done in wei, the smallest unit of an 18-decimal token.
// 1 token = 10^18 wei. No floating point is used anywhere in settlement.

use std::fmt;

/// Token amount in wei.
pub type Amount = u128;

/// Unix time in seconds.
pub type Timestamp = u64;

/// Number of wei in one whole token.
pub const WEI_PER_TOKEN: Amount = 1_000_000_000_000_000_000;

/// Parts per ten thousand. A split vector may use at most this many.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Convert a whole-token count to wei.
pub const fn tokens(whole: u64) -> Amount {
    whole as Amount * WEI_PER_TOKEN
}

/// Formats a wei amount as a decimal token value for logs.
///
/// ```
/// use galactic_core::token::DisplayAmount;
/// assert_eq!(DisplayAmount(1_500_000_000_000_000_000).to_string(), "1.5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayAmount(pub Amount);

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_TOKEN;
        let frac = self.0 % WEI_PER_TOKEN;
        if frac == 0 {
            write!(f, "{}", whole)
        } else {
            // Up to 18 decimal places, trailing zeros trimmed
            let frac_str = format!("{:018}", frac);
            let trimmed = frac_str.trim_end_matches('0');
            write!(f, "{}.{}", whole, trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens() {
        assert_eq!(tokens(1), WEI_PER_TOKEN);
        assert_eq!(tokens(1_500_000_000), 1_500_000_000 * WEI_PER_TOKEN);
    }

    #[test]
    fn test_display_whole() {
        assert_eq!(DisplayAmount(tokens(42)).to_string(), "42");
    }

    #[test]
    fn test_display_fractional() {
        assert_eq!(DisplayAmount(WEI_PER_TOKEN / 4).to_string(), "0.25");
        assert_eq!(DisplayAmount(1).to_string(), "0.000000000000000001");
    }

    #[test]
    fn test_display_zero() {
        assert_eq!(DisplayAmount(0).to_string(), "0");
    }
}
