//! Shared test market on an in-memory mainnet.

use std::sync::Arc;

use alloy_primitives::Address;

use crate::chain::{ChainClient, InMemoryChain, Network};
use crate::config::{CachePolicy, RoutingPolicy};
use crate::domain::{DexProvider, EventBus, Token};

use super::{PoolDataService, RouteOptimizerService};

/// Mainnet token set backed by an [`InMemoryChain`] with no pairs yet.
#[derive(Debug)]
pub(crate) struct Market {
    pub chain: Arc<InMemoryChain>,
    pub network: Arc<Network>,
    pub factory: Address,
    pub weth: Token,
    pub usdc: Token,
    pub usdt: Token,
    pub dai: Token,
    pub wbtc: Token,
}

#[allow(clippy::panic)]
fn known(network: &Network, symbol: &str) -> Token {
    let Some(token) = network.token_by_symbol(symbol) else {
        panic!("{symbol} missing from preset");
    };
    token.clone()
}

impl Market {
    #[allow(clippy::panic)]
    pub async fn new() -> Self {
        let network = Network::mainnet();
        let Ok(factory) = network.factory(DexProvider::UniswapV2) else {
            panic!("mainnet has uniswap v2");
        };
        let chain = InMemoryChain::new();
        for token in network.known_tokens() {
            chain.add_token(token).await;
        }
        Self {
            weth: known(&network, "WETH"),
            usdc: known(&network, "USDC"),
            usdt: known(&network, "USDT"),
            dai: known(&network, "DAI"),
            wbtc: known(&network, "WBTC"),
            chain: Arc::new(chain),
            network: Arc::new(network),
            factory,
        }
    }

    /// Deploys a Uniswap V2 pair with reserves given in human units.
    pub async fn pair(&self, a: &Token, b: &Token, human_a: f64, human_b: f64) -> Address {
        self.chain
            .add_pair(
                self.factory,
                a.address(),
                b.address(),
                a.to_raw(human_a),
                b.to_raw(human_b),
            )
            .await
    }

    pub fn pool_data(&self) -> PoolDataService {
        PoolDataService::new(
            Arc::clone(&self.chain) as Arc<dyn ChainClient>,
            Arc::clone(&self.network),
            CachePolicy::default(),
            EventBus::new(64),
        )
    }

    pub fn optimizer(&self) -> RouteOptimizerService {
        RouteOptimizerService::new(Arc::new(self.pool_data()), RoutingPolicy::default())
    }
}
