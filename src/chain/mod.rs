//! Chain access layer.
//!
//! [`ChainClient`] is the seam between the services and the blockchain:
//! [`JsonRpcClient`] reads a live node through an alloy provider, while
//! [`InMemoryChain`] serves pairs held in memory for tests and offline runs.
//! [`Network`] holds the per-chain addresses (factories, wrapped native
//! asset, bridge tokens).

mod contracts;
pub mod json_rpc;
pub mod memory;
pub mod network;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use serde::Serialize;

use crate::error::RouterError;

pub use json_rpc::JsonRpcClient;
pub use memory::InMemoryChain;
pub use network::Network;

/// ERC-20 metadata read from a token contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenMetadata {
    /// Ticker symbol.
    pub symbol: String,
    /// Display name.
    pub name: String,
    /// Decimal places.
    pub decimals: u8,
}

/// Read-only access to the contracts the router depends on.
///
/// All methods read state at the latest block.
#[async_trait]
pub trait ChainClient: fmt::Debug + Send + Sync {
    /// Pair address for `(token_a, token_b)` on a Uniswap V2 style factory.
    ///
    /// Returns `Ok(None)` when the factory has no pair (zero address).
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Rpc`] if the call fails.
    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, RouterError>;

    /// Raw `(reserve0, reserve1)` of a pair, in the pair's slot order.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Rpc`] if the call fails.
    async fn get_reserves(&self, pair: Address) -> Result<(u128, u128), RouterError>;

    /// Token occupying slot 0 of a pair.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Rpc`] if the call fails.
    async fn token0(&self, pair: Address) -> Result<Address, RouterError>;

    /// ERC-20 symbol, name and decimals.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Rpc`] if any of the calls fails.
    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, RouterError>;
}

/// Runs a chain read with a deadline.
///
/// # Errors
///
/// Returns [`RouterError::RpcTimeout`] if `timeout` elapses first, or the
/// error of the read itself.
pub async fn with_timeout<T, F>(timeout: Duration, read: F) -> Result<T, RouterError>
where
    F: Future<Output = Result<T, RouterError>>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => Err(RouterError::RpcTimeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn with_timeout_expires() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, RouterError>(1)
        };
        let result = with_timeout(Duration::from_secs(1), slow).await;
        assert!(matches!(result, Err(RouterError::RpcTimeout { timeout_ms: 1000 })));
    }

    #[tokio::test]
    async fn with_timeout_passes_result_through() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, RouterError>(7) }).await;
        assert_eq!(result.ok(), Some(7));
    }
}
