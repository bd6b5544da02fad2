//! Per-chain deployment presets.

use std::str::FromStr;

use alloy_primitives::{Address, address};

use crate::domain::{DexProvider, Token};
use crate::error::RouterError;

/// Addresses and token lists for one EVM network.
#[derive(Debug, Clone)]
pub struct Network {
    name: &'static str,
    chain_id: u64,
    wrapped_native: Token,
    factories: Vec<(DexProvider, Address)>,
    bridge_tokens: Vec<Address>,
    known_tokens: Vec<Token>,
}

impl Network {
    /// Ethereum mainnet.
    #[must_use]
    pub fn mainnet() -> Self {
        let weth = Token::new(
            address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            "WETH",
            "Wrapped Ether",
            18,
        );
        let usdc = Token::new(
            address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            "USDC",
            "USD Coin",
            6,
        );
        let usdt = Token::new(
            address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            "USDT",
            "Tether USD",
            6,
        );
        let dai = Token::new(
            address!("0x6B175474E89094C44Da98b954EedeAC495271d0F"),
            "DAI",
            "Dai Stablecoin",
            18,
        );
        let wbtc = Token::new(
            address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
            "WBTC",
            "Wrapped BTC",
            8,
        );
        let known_tokens = vec![weth.clone(), usdc, usdt, dai, wbtc];
        Self {
            name: "mainnet",
            chain_id: 1,
            bridge_tokens: known_tokens.iter().map(Token::address).collect(),
            wrapped_native: weth,
            factories: vec![
                (
                    DexProvider::UniswapV2,
                    address!("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f"),
                ),
                (
                    DexProvider::SushiswapV2,
                    address!("0xC0AEe478e3658e2610c5F7A4A2E1777cE9e4f2Ac"),
                ),
            ],
            known_tokens,
        }
    }

    /// Sepolia testnet. Only Uniswap V2 is deployed.
    #[must_use]
    pub fn sepolia() -> Self {
        let weth = Token::new(
            address!("0xfFf9976782d46CC05630D1f6eBAb18b2324d6B14"),
            "WETH",
            "Wrapped Ether",
            18,
        );
        let usdc = Token::new(
            address!("0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238"),
            "USDC",
            "USD Coin",
            6,
        );
        let known_tokens = vec![weth.clone(), usdc];
        Self {
            name: "sepolia",
            chain_id: 11_155_111,
            bridge_tokens: known_tokens.iter().map(Token::address).collect(),
            wrapped_native: weth,
            factories: vec![(
                DexProvider::UniswapV2,
                address!("0xF62c03E08ada871A0bEb309762E260a7a6a880E6"),
            )],
            known_tokens,
        }
    }

    /// Network name, e.g. `"mainnet"`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// EIP-155 chain id.
    #[must_use]
    pub const fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The wrapped native asset (WETH).
    #[must_use]
    pub const fn wrapped_native(&self) -> &Token {
        &self.wrapped_native
    }

    /// Intermediate tokens tried for two-hop routes.
    #[must_use]
    pub fn bridge_tokens(&self) -> &[Address] {
        &self.bridge_tokens
    }

    /// Replaces the bridge token list.
    #[must_use]
    pub fn with_bridge_tokens(mut self, bridge_tokens: Vec<Address>) -> Self {
        self.bridge_tokens = bridge_tokens;
        self
    }

    /// Tokens whose metadata is known without a chain read.
    #[must_use]
    pub fn known_tokens(&self) -> &[Token] {
        &self.known_tokens
    }

    /// Looks up a known token by address.
    #[must_use]
    pub fn known_token(&self, address: Address) -> Option<&Token> {
        self.known_tokens.iter().find(|t| t.address() == address)
    }

    /// Looks up a known token by symbol, case-insensitively.
    #[must_use]
    pub fn token_by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.known_tokens
            .iter()
            .find(|t| t.symbol().eq_ignore_ascii_case(symbol))
    }

    /// Factory contract of `provider` on this network.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::UnsupportedProvider`] if the provider is not
    /// a constant-product AMM or has no deployment here.
    pub fn factory(&self, provider: DexProvider) -> Result<Address, RouterError> {
        let unsupported = || RouterError::UnsupportedProvider {
            provider,
            network: self.name.to_string(),
        };
        if !provider.is_constant_product() {
            return Err(unsupported());
        }
        self.factories
            .iter()
            .find(|(p, _)| *p == provider)
            .map(|(_, factory)| *factory)
            .ok_or_else(unsupported)
    }

    /// Providers with a factory on this network.
    #[must_use]
    pub fn supported_providers(&self) -> Vec<DexProvider> {
        DexProvider::ALL
            .into_iter()
            .filter(|p| self.factory(*p).is_ok())
            .collect()
    }
}

impl FromStr for Network {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "ethereum" | "1" => Ok(Self::mainnet()),
            "sepolia" | "11155111" => Ok(Self::sepolia()),
            other => Err(RouterError::InvalidRequest(format!("unknown network: {other}"))),
        }
    }
}
