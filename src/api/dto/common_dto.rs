//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DexProvider, Token};

/// Token descriptor in responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenDto {
    /// Checksummed token address.
    pub address: String,
    /// Ticker symbol (e.g. `"USDC"`).
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Number of decimal places.
    pub decimals: u8,
}

impl From<&Token> for TokenDto {
    fn from(token: &Token) -> Self {
        Self {
            address: token.address().to_string(),
            symbol: token.symbol().to_string(),
            name: token.name().to_string(),
            decimals: token.decimals(),
        }
    }
}

/// Optional `?provider=` query parameter.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProviderQuery {
    /// DEX provider, `uniswap_v2` when omitted.
    #[serde(default)]
    pub provider: Option<DexProvider>,
}

impl ProviderQuery {
    /// The requested provider or the default one.
    #[must_use]
    pub fn provider(&self) -> DexProvider {
        self.provider.unwrap_or_default()
    }
}
