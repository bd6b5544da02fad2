//! DEX provider identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::RouterError;

/// An AMM venue whose pools can be read and priced.
///
/// Constant-product (`x * y = k`) providers are fully supported. Uniswap V3
/// is recognised so that requests for it fail with a clear
/// [`RouterError::UnsupportedProvider`] instead of a parse error.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum DexProvider {
    /// Uniswap V2 pairs.
    #[default]
    UniswapV2,
    /// SushiSwap (Uniswap V2 fork) pairs.
    SushiswapV2,
    /// Uniswap V3 concentrated liquidity pools (not implemented).
    UniswapV3,
}

impl DexProvider {
    /// All providers, in display order.
    pub const ALL: [Self; 3] = [Self::UniswapV2, Self::SushiswapV2, Self::UniswapV3];

    /// Wire identifier, e.g. `"uniswap_v2"`.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UniswapV2 => "uniswap_v2",
            Self::SushiswapV2 => "sushiswap_v2",
            Self::UniswapV3 => "uniswap_v3",
        }
    }

    /// Trading fee as a fraction of the input amount.
    ///
    /// Fixed per provider type; `None` for providers without an
    /// implementation.
    #[must_use]
    pub const fn fee_rate(&self) -> Option<f64> {
        match self {
            Self::UniswapV2 | Self::SushiswapV2 => Some(0.003),
            Self::UniswapV3 => None,
        }
    }

    /// Returns `true` if pools of this provider follow the constant-product curve.
    #[must_use]
    pub const fn is_constant_product(&self) -> bool {
        matches!(self, Self::UniswapV2 | Self::SushiswapV2)
    }
}

impl fmt::Display for DexProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DexProvider {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uniswap_v2" | "uniswapv2" => Ok(Self::UniswapV2),
            "sushiswap_v2" | "sushiswap" => Ok(Self::SushiswapV2),
            "uniswap_v3" | "uniswapv3" => Ok(Self::UniswapV3),
            other => Err(RouterError::InvalidRequest(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!("uniswap_v2".parse::<DexProvider>().ok(), Some(DexProvider::UniswapV2));
        assert_eq!("SushiSwap".parse::<DexProvider>().ok(), Some(DexProvider::SushiswapV2));
        assert!("curve".parse::<DexProvider>().is_err());
    }

    #[test]
    fn fee_only_for_implemented_providers() {
        assert_eq!(DexProvider::UniswapV2.fee_rate(), Some(0.003));
        assert_eq!(DexProvider::UniswapV3.fee_rate(), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&DexProvider::SushiswapV2).unwrap_or_default();
        assert_eq!(json, "\"sushiswap_v2\"");
    }
}
