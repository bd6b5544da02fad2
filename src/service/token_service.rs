//! Token descriptor resolution.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tokio::sync::RwLock;

use crate::chain::{ChainClient, Network, with_timeout};
use crate::domain::Token;
use crate::error::RouterError;

/// Resolves addresses to [`Token`] descriptors.
///
/// Tokens of the network's known list are served without a chain read.
/// Anything else is read from the ERC-20 contract once and memoized for
/// the lifetime of the service; token metadata is immutable.
#[derive(Debug)]
pub struct TokenService {
    chain: Arc<dyn ChainClient>,
    network: Arc<Network>,
    resolved: RwLock<HashMap<Address, Token>>,
    rpc_timeout: Duration,
}

impl TokenService {
    /// Creates a resolver backed by `chain`.
    #[must_use]
    pub fn new(chain: Arc<dyn ChainClient>, network: Arc<Network>, rpc_timeout: Duration) -> Self {
        Self {
            chain,
            network,
            resolved: RwLock::new(HashMap::new()),
            rpc_timeout,
        }
    }

    /// Returns the descriptor for `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Rpc`] or [`RouterError::RpcTimeout`] if the
    /// metadata read fails.
    pub async fn resolve(&self, address: Address) -> Result<Token, RouterError> {
        if let Some(token) = self.network.known_token(address) {
            return Ok(token.clone());
        }
        if let Some(token) = self.resolved.read().await.get(&address) {
            return Ok(token.clone());
        }

        let meta = with_timeout(self.rpc_timeout, self.chain.token_metadata(address)).await?;
        let token = Token::new(address, meta.symbol, meta.name, meta.decimals);
        tracing::debug!(
            %address,
            symbol = token.symbol(),
            decimals = token.decimals(),
            "token resolved on chain"
        );
        self.resolved.write().await.insert(address, token.clone());
        Ok(token)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::chain::InMemoryChain;

    #[tokio::test]
    async fn known_tokens_skip_chain() {
        let chain = Arc::new(InMemoryChain::new());
        let network = Arc::new(Network::mainnet());
        let service = TokenService::new(
            Arc::clone(&chain) as Arc<dyn ChainClient>,
            Arc::clone(&network),
            Duration::from_secs(1),
        );

        let weth = network.wrapped_native().address();
        let Ok(token) = service.resolve(weth).await else {
            panic!("known token resolves");
        };
        assert_eq!(token.symbol(), "WETH");
        assert_eq!(chain.read_count(), 0);
    }

    #[tokio::test]
    async fn unknown_tokens_are_read_once() {
        let chain = Arc::new(InMemoryChain::new());
        let pepe = Token::new(Address::repeat_byte(0x77), "PEPE", "Pepe", 18);
        chain.add_token(&pepe).await;
        let service = TokenService::new(
            Arc::clone(&chain) as Arc<dyn ChainClient>,
            Arc::new(Network::mainnet()),
            Duration::from_secs(1),
        );

        for _ in 0..3 {
            let Ok(token) = service.resolve(pepe.address()).await else {
                panic!("token resolves");
            };
            assert_eq!(token.symbol(), "PEPE");
        }
        assert_eq!(chain.read_count(), 1);
    }

    #[tokio::test]
    async fn missing_contract_is_rpc_error() {
        let service = TokenService::new(
            Arc::new(InMemoryChain::new()),
            Arc::new(Network::mainnet()),
            Duration::from_secs(1),
        );
        let result = service.resolve(Address::repeat_byte(0x78)).await;
        assert!(matches!(result, Err(RouterError::Rpc(_))));
    }
}
