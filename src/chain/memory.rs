//! In-memory [`ChainClient`] used by tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ChainClient, TokenMetadata};
use crate::domain::Token;
use crate::error::RouterError;

/// Pair contract state, in slot order (`token0` is the lower address).
#[derive(Debug, Clone)]
struct PairState {
    token0: Address,
    reserve0: u128,
    reserve1: u128,
}

/// Chain state held in memory.
///
/// Pairs are registered per factory, mirroring a Uniswap V2 deployment:
/// `token0` is the numerically lower address. Every read increments a
/// counter so callers can assert on cache behaviour. Pairs can be marked
/// as failing, and a fixed latency can be injected to exercise timeouts
/// and cancellation.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    factories: RwLock<HashMap<(Address, Address, Address), Address>>,
    pairs: RwLock<HashMap<Address, PairState>>,
    tokens: RwLock<HashMap<Address, TokenMetadata>>,
    failing: RwLock<Vec<Address>>,
    latency: RwLock<Option<Duration>>,
    reads: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    next_pair: AtomicU64,
}

/// Counts a read as in flight until dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

impl InMemoryChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers ERC-20 metadata for a token.
    pub async fn add_token(&self, token: &Token) {
        self.tokens.write().await.insert(
            token.address(),
            TokenMetadata {
                symbol: token.symbol().to_string(),
                name: token.name().to_string(),
                decimals: token.decimals(),
            },
        );
    }

    /// Deploys a pair on `factory` with raw reserves given in the order of
    /// `token_a` / `token_b`. Returns the pair address.
    pub async fn add_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
        reserve_a: u128,
        reserve_b: u128,
    ) -> Address {
        let pair = self.mint_pair_address();
        let (token0, token1, reserve0, reserve1) =
            slot_order(token_a, token_b, reserve_a, reserve_b);
        self.factories
            .write()
            .await
            .insert((factory, token0, token1), pair);
        self.pairs.write().await.insert(
            pair,
            PairState {
                token0,
                reserve0,
                reserve1,
            },
        );
        pair
    }

    /// Overwrites the reserves of an existing pair, given in the order of
    /// `token_a` / `token_b`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidRequest`] if the pair is unknown.
    pub async fn set_reserves(
        &self,
        pair: Address,
        token_a: Address,
        reserve_a: u128,
        reserve_b: u128,
    ) -> Result<(), RouterError> {
        let mut pairs = self.pairs.write().await;
        let state = pairs
            .get_mut(&pair)
            .ok_or_else(|| RouterError::InvalidRequest(format!("unknown pair {pair}")))?;
        if state.token0 == token_a {
            state.reserve0 = reserve_a;
            state.reserve1 = reserve_b;
        } else {
            state.reserve0 = reserve_b;
            state.reserve1 = reserve_a;
        }
        Ok(())
    }

    /// Makes every read against `pair` fail with an RPC error.
    pub async fn fail_pair(&self, pair: Address) {
        self.failing.write().await.push(pair);
    }

    /// Delays every read by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Total number of reads served so far.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// Largest number of reads that were waiting out their latency at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    fn mint_pair_address(&self) -> Address {
        let n = self.next_pair.fetch_add(1, Ordering::Relaxed) + 1;
        let mut bytes = [0xaa_u8; 20];
        for (dst, src) in bytes.iter_mut().rev().zip(n.to_le_bytes()) {
            *dst = src;
        }
        Address::from(bytes)
    }

    async fn begin_read(&self, target: Address) -> Result<(), RouterError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            let running = self.in_flight.fetch_add(1, Ordering::Relaxed) + 1;
            let _in_flight = InFlight(&self.in_flight);
            self.peak_in_flight.fetch_max(running, Ordering::Relaxed);
            tokio::time::sleep(latency).await;
        }
        if self.failing.read().await.contains(&target) {
            return Err(RouterError::Rpc(format!("execution reverted at {target}")));
        }
        Ok(())
    }

    async fn pair_state(&self, pair: Address) -> Result<PairState, RouterError> {
        self.begin_read(pair).await?;
        self.pairs
            .read()
            .await
            .get(&pair)
            .cloned()
            .ok_or_else(|| RouterError::Rpc(format!("no contract at {pair}")))
    }
}

fn slot_order(
    token_a: Address,
    token_b: Address,
    reserve_a: u128,
    reserve_b: u128,
) -> (Address, Address, u128, u128) {
    if token_a < token_b {
        (token_a, token_b, reserve_a, reserve_b)
    } else {
        (token_b, token_a, reserve_b, reserve_a)
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    async fn get_pair(
        &self,
        factory: Address,
        token_a: Address,
        token_b: Address,
    ) -> Result<Option<Address>, RouterError> {
        self.begin_read(factory).await?;
        let (token0, token1, _, _) = slot_order(token_a, token_b, 0, 0);
        Ok(self
            .factories
            .read()
            .await
            .get(&(factory, token0, token1))
            .copied())
    }

    async fn get_reserves(&self, pair: Address) -> Result<(u128, u128), RouterError> {
        let state = self.pair_state(pair).await?;
        Ok((state.reserve0, state.reserve1))
    }

    async fn token0(&self, pair: Address) -> Result<Address, RouterError> {
        Ok(self.pair_state(pair).await?.token0)
    }

    async fn token_metadata(&self, token: Address) -> Result<TokenMetadata, RouterError> {
        self.begin_read(token).await?;
        self.tokens
            .read()
            .await
            .get(&token)
            .cloned()
            .ok_or_else(|| RouterError::Rpc(format!("no ERC-20 contract at {token}")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pair_lookup_is_order_independent() {
        let chain = InMemoryChain::new();
        let factory = Address::repeat_byte(0xfa);
        let a = Address::repeat_byte(2);
        let b = Address::repeat_byte(1);
        let pair = chain.add_pair(factory, a, b, 10, 20).await;

        assert_eq!(chain.get_pair(factory, a, b).await.ok().flatten(), Some(pair));
        assert_eq!(chain.get_pair(factory, b, a).await.ok().flatten(), Some(pair));
        assert_eq!(chain.token0(pair).await.ok(), Some(b));
        assert_eq!(chain.get_reserves(pair).await.ok(), Some((20, 10)));
        assert_eq!(chain.read_count(), 4);
    }

    #[tokio::test]
    async fn missing_pair_is_none() {
        let chain = InMemoryChain::new();
        let found = chain
            .get_pair(Address::repeat_byte(0xfa), Address::repeat_byte(1), Address::repeat_byte(2))
            .await;
        assert!(matches!(found, Ok(None)));
    }

    #[tokio::test]
    async fn failing_pair_errors() {
        let chain = InMemoryChain::new();
        let pair = chain
            .add_pair(
                Address::repeat_byte(0xfa),
                Address::repeat_byte(1),
                Address::repeat_byte(2),
                1,
                1,
            )
            .await;
        chain.fail_pair(pair).await;
        assert!(matches!(chain.get_reserves(pair).await, Err(RouterError::Rpc(_))));
    }

    #[tokio::test]
    async fn set_reserves_respects_caller_order() {
        let chain = InMemoryChain::new();
        let low = Address::repeat_byte(1);
        let high = Address::repeat_byte(2);
        let pair = chain.add_pair(Address::repeat_byte(0xfa), low, high, 1, 1).await;
        tokio_test::assert_ok!(chain.set_reserves(pair, high, 7, 3).await);
        assert_eq!(tokio_test::assert_ok!(chain.get_reserves(pair).await), (3, 7));
        tokio_test::assert_err!(chain.set_reserves(Address::ZERO, low, 1, 1).await);
    }
}
