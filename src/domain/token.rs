//! Fungible token descriptors and address parsing.

use std::fmt;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::RouterError;

/// Identity of an ERC-20 asset.
///
/// Immutable once constructed. Two tokens are equal when their addresses
/// are equal; symbol and name are informational only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    address: Address,
    symbol: String,
    name: String,
    decimals: u8,
}

impl Token {
    /// Creates a new token descriptor.
    #[must_use]
    pub fn new(
        address: Address,
        symbol: impl Into<String>,
        name: impl Into<String>,
        decimals: u8,
    ) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            name: name.into(),
            decimals,
        }
    }

    /// Contract address (primary key).
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Ticker symbol, e.g. `"USDC"`.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display name, e.g. `"USD Coin"`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of decimal places of the raw on-chain amount.
    #[must_use]
    pub const fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Converts a raw on-chain amount into human-readable units.
    #[must_use]
    pub fn to_human(&self, raw: u128) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let value = raw as f64;
        value / self.unit()
    }

    /// Converts a human-readable amount into raw on-chain units, truncating
    /// anything below the smallest unit. Negative input maps to zero.
    #[must_use]
    pub fn to_raw(&self, human: f64) -> u128 {
        if human <= 0.0 || !human.is_finite() {
            return 0;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = (human * self.unit()) as u128;
        raw
    }

    fn unit(&self) -> f64 {
        10f64.powi(i32::from(self.decimals))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Token {}

impl std::hash::Hash for Token {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, self.address)
    }
}

/// Parses a `0x`-prefixed hex string into an [`Address`].
///
/// # Errors
///
/// Returns [`RouterError::InvalidAddress`] if the string is not a 20-byte
/// hex address.
pub fn parse_address(s: &str) -> Result<Address, RouterError> {
    s.trim()
        .parse::<Address>()
        .map_err(|_| RouterError::InvalidAddress(s.to_string()))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn usdc() -> Token {
        Token::new(Address::repeat_byte(0x11), "USDC", "USD Coin", 6)
    }

    #[test]
    fn human_conversion_uses_decimals() {
        let token = usdc();
        assert!((token.to_human(2_500_000) - 2.5).abs() < 1e-12);
        assert_eq!(token.to_raw(2.5), 2_500_000);
        assert_eq!(token.to_raw(-1.0), 0);
    }

    #[test]
    fn equality_is_by_address() {
        let a = usdc();
        let b = Token::new(Address::repeat_byte(0x11), "X", "Other label", 18);
        assert_eq!(a, b);
    }

    #[test]
    fn parse_address_rejects_garbage() {
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("not an address").is_err());
        let Ok(addr) = parse_address("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2") else {
            panic!("valid address");
        };
        assert_ne!(addr, Address::ZERO);
    }
}
