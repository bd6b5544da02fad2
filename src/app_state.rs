//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::chain::{ChainClient, InMemoryChain, JsonRpcClient};
use crate::config::RouterConfig;
use crate::domain::EventBus;
use crate::error::RouterError;
use crate::service::{PoolDataService, RouteOptimizerService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pool data service (reserves cache and analytics).
    pub pool_data: Arc<PoolDataService>,
    /// Route optimizer built on `pool_data`.
    pub optimizer: RouteOptimizerService,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Overall budget of a quote request.
    pub quote_timeout: Duration,
}

impl AppState {
    /// Wires the services together over an explicit chain client.
    #[must_use]
    pub fn new(config: &RouterConfig, chain: Arc<dyn ChainClient>) -> Self {
        let event_bus = EventBus::new(config.event_bus_capacity);
        let pool_data = Arc::new(
            PoolDataService::new(
                chain,
                Arc::new(config.network.clone()),
                config.cache,
                event_bus.clone(),
            )
            .with_search_iterations(config.routing.max_search_iterations),
        );
        let optimizer = RouteOptimizerService::new(Arc::clone(&pool_data), config.routing);
        Self {
            pool_data,
            optimizer,
            event_bus,
            quote_timeout: config.quote_timeout,
        }
    }

    /// Builds the chain client selected by `RPC_URL` and wires the services.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Internal`] if no RPC URL is configured or the
    /// URL is invalid.
    pub fn from_config(config: &RouterConfig) -> Result<Self, RouterError> {
        let chain: Arc<dyn ChainClient> = if config.uses_memory_chain() {
            tracing::warn!("RPC_URL=memory: serving pools from the in-memory chain");
            Arc::new(InMemoryChain::new())
        } else if config.rpc_url.trim().is_empty() {
            return Err(RouterError::Internal("RPC_URL is not set".to_string()));
        } else {
            Arc::new(JsonRpcClient::new(&config.rpc_url)?)
        };
        Ok(Self::new(config, chain))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::config::MEMORY_RPC_URL;

    #[tokio::test]
    async fn missing_rpc_url_is_refused() {
        let result = AppState::from_config(&RouterConfig::default());
        assert!(matches!(result, Err(RouterError::Internal(_))));
    }

    #[tokio::test]
    async fn memory_chain_is_opt_in() {
        let config = RouterConfig {
            rpc_url: MEMORY_RPC_URL.to_string(),
            ..RouterConfig::default()
        };
        let Ok(state) = AppState::from_config(&config) else {
            panic!("memory chain wires up");
        };
        assert_eq!(state.event_bus.receiver_count(), 0);
    }

    #[tokio::test]
    async fn node_url_builds_rpc_client() {
        let config = RouterConfig {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            ..RouterConfig::default()
        };
        assert!(AppState::from_config(&config).is_ok());
    }
}
