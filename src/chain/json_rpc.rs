//! [`ChainClient`] over an alloy HTTP provider (`eth_call` at `latest`).

use std::fmt;

use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::transports::http::reqwest::Url;
use alloy_primitives::Address;
use async_trait::async_trait;

use super::contracts::{IERC20Metadata, IUniswapV2Factory, IUniswapV2Pair, decode_text};
use super::{ChainClient, TokenMetadata};
use crate::error::RouterError;

/// HTTP JSON-RPC client for an EVM node.
pub struct JsonRpcClient {
    provider: DynProvider,
    url: String,
}

impl fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Creates a client for the node at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Internal`] if `url` is not a valid URL.
    pub fn new(url: &str) -> Result<Self, RouterError> {
        let endpoint: Url = url
            .parse()
            .map_err(|e| RouterError::Internal(format!("invalid RPC_URL {url:?}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(endpoint).erased();
        Ok(Self {
            provider,
            url: url.to_string(),
        })
    }
}

fn rpc_error(call: &str, to: Address, err: &impl fmt::Display) -> RouterError {
    RouterError::Rpc(format!("{call} on {to} failed: {err}"))
}

#[async_trait]
impl ChainClient for JsonRpcClient {
    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, RouterError> {
        let pair = IUniswapV2Factory::new(factory, &self.provider)
            .getPair(token_a, token_b)
            .call()
            .await
            .map_err(|e| rpc_error("getPair", factory, &e))?;
        Ok((pair != Address::ZERO).then_some(pair))
    }

    async fn get_reserves(&self, pair: Address) -> Result<(u128, u128), RouterError> {
        let reserves = IUniswapV2Pair::new(pair, &self.provider)
            .getReserves()
            .call()
            .await
            .map_err(|e| rpc_error("getReserves", pair, &e))?;
        Ok((reserves.reserve0.to::<u128>(), reserves.reserve1.to::<u128>()))
    }

    async fn token0(&self, pair: Address) -> Result<Address, RouterError> {
        IUniswapV2Pair::new(pair, &self.provider)
            .token0()
            .call()
            .await
            .map_err(|e| rpc_error("token0", pair, &e))
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, RouterError> {
        let erc20 = IERC20Metadata::new(token, &self.provider);
        let decimals = erc20
            .decimals()
            .call()
            .await
            .map_err(|e| rpc_error("decimals", token, &e))?;
        let symbol = erc20
            .symbol()
            .call_raw()
            .await
            .map_err(|e| rpc_error("symbol", token, &e))?;
        let name = erc20
            .name()
            .call_raw()
            .await
            .map_err(|e| rpc_error("name", token, &e))?;
        Ok(TokenMetadata {
            symbol: decode_text(&symbol)?,
            name: decode_text(&name)?,
            decimals,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            JsonRpcClient::new("not a url"),
            Err(RouterError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_node_is_rpc_error() {
        let Ok(client) = JsonRpcClient::new("http://127.0.0.1:9") else {
            panic!("client builds");
        };
        let result = client.token0(Address::repeat_byte(1)).await;
        assert!(matches!(result, Err(RouterError::Rpc(_))));
    }
}
