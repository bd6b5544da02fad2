//! Pool data service: reserves fetching, caching and pool analytics.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Utc;
use futures_util::future::join_all;
use tokio::time::Instant;

use crate::chain::{ChainClient, Network, with_timeout};
use crate::config::{CachePolicy, RoutingPolicy};
use crate::domain::amm_math;
use crate::domain::{
    DexProvider, EventBus, LiquidityPool, MarketEvent, PoolCache, PoolKey, PoolReserves,
};
use crate::error::RouterError;

use super::TokenService;

/// A token pair to look up, with the provider to look it up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairRequest {
    /// First token address.
    pub token_a: Address,
    /// Second token address.
    pub token_b: Address,
    /// Provider to query.
    pub provider: DexProvider,
}

/// A pair of a batch lookup that could not be served.
#[derive(Debug)]
pub struct PairFailure {
    /// The pair that failed.
    pub pair: PairRequest,
    /// Why it failed.
    pub error: RouterError,
}

/// Result of [`PoolDataService::get_multiple_pools`].
#[derive(Debug, Default)]
pub struct PoolBatch {
    /// Pools that were served, keyed by pool key.
    pub pools: HashMap<PoolKey, LiquidityPool>,
    /// Pairs that failed, in request order.
    pub failures: Vec<PairFailure>,
}

/// Fetches, caches and analyses constant-product pools.
///
/// Owns the [`PoolCache`]; everything it reads from chain goes through the
/// injected [`ChainClient`] with the policy's RPC timeout. Reserve
/// refreshes and cache evictions are published on the [`EventBus`].
#[derive(Debug)]
pub struct PoolDataService {
    chain: Arc<dyn ChainClient>,
    network: Arc<Network>,
    tokens: TokenService,
    cache: PoolCache,
    policy: CachePolicy,
    search_iterations: u32,
    event_bus: EventBus,
}

impl PoolDataService {
    /// Creates a service with an empty cache.
    #[must_use]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        network: Arc<Network>,
        policy: CachePolicy,
        event_bus: EventBus,
    ) -> Self {
        Self {
            tokens: TokenService::new(Arc::clone(&chain), Arc::clone(&network), policy.rpc_timeout),
            cache: PoolCache::new(policy.reserves_ttl),
            chain,
            network,
            policy,
            search_iterations: RoutingPolicy::default().max_search_iterations,
            event_bus,
        }
    }

    /// Overrides the iteration cap of [`Self::calculate_optimal_trade_size`].
    #[must_use]
    pub const fn with_search_iterations(mut self, iterations: u32) -> Self {
        self.search_iterations = iterations;
        self
    }

    /// Network the service reads from.
    #[must_use]
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Token resolver.
    #[must_use]
    pub const fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Underlying cache.
    #[must_use]
    pub const fn cache(&self) -> &PoolCache {
        &self.cache
    }

    /// Event bus the service publishes on.
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the reserves of the `(token_a, token_b)` pool on `provider`,
    /// oriented in caller order.
    ///
    /// Serves the cached snapshot while it is younger than the TTL;
    /// otherwise resolves the pair through the factory, reads it and
    /// replaces the cached snapshot.
    ///
    /// # Errors
    ///
    /// - [`RouterError::InvalidRequest`] if both tokens are the same.
    /// - [`RouterError::UnsupportedProvider`] if the provider has no
    ///   constant-product deployment on this network.
    /// - [`RouterError::PairNotFound`] if the factory has no pair.
    /// - [`RouterError::Rpc`] / [`RouterError::RpcTimeout`] on chain failures.
    pub async fn get_pool_reserves(
        &self,
        token_a: Address,
        token_b: Address,
        provider: DexProvider,
    ) -> Result<PoolReserves, RouterError> {
        if token_a == token_b {
            return Err(RouterError::InvalidRequest(format!(
                "pool tokens must differ, got {token_a} twice"
            )));
        }
        let factory = self.network.factory(provider)?;
        let key = PoolKey::new(token_a, token_b, provider);

        if let Some(cached) = self.cache.live_reserves(&key).await {
            tracing::debug!(%key, age_ms = cached.age().as_millis(), "reserves cache hit");
            return Ok(cached.oriented(token_a));
        }

        let timeout = self.policy.rpc_timeout;
        let pair_address = with_timeout(timeout, self.chain.get_pair(factory, token_a, token_b))
            .await?
            .ok_or_else(|| RouterError::PairNotFound {
                token_a: token_a.to_string(),
                token_b: token_b.to_string(),
                provider,
            })?;
        let (reserve0, reserve1) =
            with_timeout(timeout, self.chain.get_reserves(pair_address)).await?;
        let token0 = with_timeout(timeout, self.chain.token0(pair_address)).await?;

        let (reserve_a, reserve_b) = if token0 == token_a {
            (reserve0, reserve1)
        } else if token0 == token_b {
            (reserve1, reserve0)
        } else {
            return Err(RouterError::Rpc(format!(
                "pair {pair_address} reports token0 {token0}, expected {token_a} or {token_b}"
            )));
        };

        let reserves = PoolReserves {
            pair_address,
            provider,
            token_a,
            token_b,
            reserve_a,
            reserve_b,
            fetched_at: Utc::now(),
            captured_at: Instant::now(),
        };
        self.cache.store_reserves(&reserves).await;

        let canonical = reserves.oriented(key.low());
        let _ = self.event_bus.publish(MarketEvent::ReservesRefreshed {
            pair_address,
            provider,
            token0: canonical.token_a,
            token1: canonical.token_b,
            reserve0: canonical.reserve_a.to_string(),
            reserve1: canonical.reserve_b.to_string(),
            timestamp: reserves.fetched_at,
        });
        tracing::debug!(%key, %pair_address, reserve_a, reserve_b, "reserves refreshed");
        Ok(reserves)
    }

    /// Returns the pool view of `(token_a, token_b)` on `provider`, oriented
    /// in caller order.
    ///
    /// The view is cached and re-derived whenever the underlying reserves
    /// snapshot is refreshed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::get_pool_reserves`], plus token metadata read failures.
    pub async fn get_pool_data(
        &self,
        token_a: Address,
        token_b: Address,
        provider: DexProvider,
    ) -> Result<LiquidityPool, RouterError> {
        let reserves = self.get_pool_reserves(token_a, token_b, provider).await?;
        if let Some(pool) = self.cache.pool_for(&reserves).await {
            return Ok(pool.oriented(token_a));
        }

        let fee_rate = provider
            .fee_rate()
            .ok_or_else(|| RouterError::UnsupportedProvider {
                provider,
                network: self.network.name().to_string(),
            })?;
        let (first, second) =
            tokio::try_join!(self.tokens.resolve(token_a), self.tokens.resolve(token_b))?;
        let pool = LiquidityPool::derive(reserves, first, second, fee_rate);
        self.cache.store_pool(&pool).await;
        Ok(pool)
    }

    /// Looks up many pools, `batch_size` at a time.
    ///
    /// Pairs of one batch are fetched concurrently; batches run one after
    /// another. A failing pair is logged and reported in
    /// [`PoolBatch::failures`] without affecting the others.
    pub async fn get_multiple_pools(&self, pairs: &[PairRequest]) -> PoolBatch {
        let mut batch = PoolBatch::default();
        for chunk in pairs.chunks(self.policy.batch_size.max(1)) {
            let lookups = chunk.iter().map(|pair| async move {
                let result = self
                    .get_pool_data(pair.token_a, pair.token_b, pair.provider)
                    .await;
                (*pair, result)
            });
            for (pair, result) in join_all(lookups).await {
                match result {
                    Ok(pool) => {
                        batch.pools.insert(pool.key(), pool);
                    }
                    Err(error) => {
                        tracing::warn!(
                            token_a = %pair.token_a,
                            token_b = %pair.token_b,
                            provider = %pair.provider,
                            %error,
                            transient = error.is_transient(),
                            "pool lookup failed"
                        );
                        batch.failures.push(PairFailure { pair, error });
                    }
                }
            }
        }
        batch
    }

    /// Curve price impact, in percent, of selling `amount_in` of `token_in`.
    ///
    /// Returns `0.0` for non-positive or negligible amounts.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::TokenNotInPool`] if `token_in` is not in the pool.
    pub fn calculate_price_impact(
        &self,
        pool: &LiquidityPool,
        amount_in: f64,
        token_in: Address,
    ) -> Result<f64, RouterError> {
        let (reserve_in, reserve_out) = sides(pool, token_in)?;
        Ok(amm_math::price_impact(reserve_in, reserve_out, amount_in))
    }

    /// Largest amount of `token_in`, up to `max_amount`, whose price impact
    /// stays within `max_price_impact` percent.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::TokenNotInPool`] if `token_in` is not in the pool.
    pub fn calculate_optimal_trade_size(
        &self,
        pool: &LiquidityPool,
        max_amount: f64,
        token_in: Address,
        max_price_impact: f64,
    ) -> Result<f64, RouterError> {
        let (reserve_in, reserve_out) = sides(pool, token_in)?;
        Ok(amm_math::optimal_trade_size(
            max_amount,
            max_price_impact,
            self.search_iterations,
            |amount| amm_math::price_impact(reserve_in, reserve_out, amount),
        ))
    }

    /// Expected output of selling `amount_in` of `token_in`, fee included.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::TokenNotInPool`] if `token_in` is not in the pool.
    pub fn expected_output(
        &self,
        pool: &LiquidityPool,
        amount_in: f64,
        token_in: Address,
    ) -> Result<f64, RouterError> {
        let (reserve_in, reserve_out) = sides(pool, token_in)?;
        Ok(amm_math::amount_out(
            reserve_in,
            reserve_out,
            amount_in,
            pool.fee_rate,
        ))
    }

    /// Slippage tolerance, in percent, suggested for trades on `pool`.
    #[must_use]
    pub fn get_recommended_slippage(&self, pool: &LiquidityPool) -> f64 {
        amm_math::recommended_slippage(pool.liquidity)
    }

    /// Evicts all cached reserves and pool views.
    ///
    /// Returns the number of reserves snapshots evicted.
    pub async fn clear_cache(&self) -> usize {
        let evicted = self.cache.clear().await;
        let _ = self.event_bus.publish(MarketEvent::PoolCacheCleared {
            evicted,
            timestamp: Utc::now(),
        });
        tracing::info!(evicted, "pool cache cleared");
        evicted
    }

    /// Drops expired snapshots. Returns the number removed.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.cache.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "expired reserves purged");
        }
        purged
    }
}

fn sides(pool: &LiquidityPool, token_in: Address) -> Result<(f64, f64), RouterError> {
    pool.sides(token_in)
        .ok_or_else(|| RouterError::TokenNotInPool {
            token: token_in.to_string(),
            pool: pool.pair_address().to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::service::fixtures::Market;

    #[tokio::test(start_paused = true)]
    async fn reserves_cached_for_ttl() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        let service = market.pool_data();

        let Ok(first) = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("pair exists");
        };
        let reads = market.chain.read_count();
        assert_eq!(reads, 3);

        tokio::time::advance(Duration::from_secs(29)).await;
        let Ok(second) = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("cached");
        };
        assert_eq!(market.chain.read_count(), reads);
        assert_eq!(first.fetched_at, second.fetched_at);

        tokio::time::advance(Duration::from_secs(2)).await;
        let Ok(third) = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("refetched");
        };
        assert_eq!(market.chain.read_count(), reads * 2);
        assert!(third.captured_at > first.captured_at);
    }

    #[tokio::test]
    async fn reserves_follow_caller_order() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        let service = market.pool_data();

        let Ok(forward) = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("pair exists");
        };
        let Ok(backward) = service
            .get_pool_reserves(
                market.weth.address(),
                market.usdc.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("pair exists");
        };

        assert_eq!(forward.token_a, market.usdc.address());
        assert_eq!(forward.reserve_a, market.usdc.to_raw(2_000_000.0));
        assert_eq!(backward.token_a, market.weth.address());
        assert_eq!(backward.reserve_a, forward.reserve_b);
        assert_eq!(backward.reserve_b, forward.reserve_a);
        assert_eq!(forward.key(), backward.key());
    }

    #[tokio::test]
    async fn pool_data_derives_liquidity_and_fee() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.dai, 4_000_000.0, 1_000_000.0).await;
        let service = market.pool_data();

        let Ok(pool) = service
            .get_pool_data(
                market.dai.address(),
                market.usdc.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("pair exists");
        };
        assert_eq!(pool.token_a.address(), market.dai.address());
        assert!((pool.fee_rate - 0.003).abs() < f64::EPSILON);
        assert!((pool.liquidity - 2_000_000.0).abs() < 1e-3);
        assert!((service.get_recommended_slippage(&pool) - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_view_rederived_after_refresh() {
        let market = Market::new().await;
        let pair = market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        let service = market.pool_data();
        let (usdc, weth) = (market.usdc.address(), market.weth.address());

        let Ok(before) = service.get_pool_data(usdc, weth, DexProvider::UniswapV2).await else {
            panic!("pair exists");
        };
        let moved = market.chain.set_reserves(
            pair,
            usdc,
            market.usdc.to_raw(1_000_000.0),
            market.weth.to_raw(2_000.0),
        );
        assert!(moved.await.is_ok());

        tokio::time::advance(Duration::from_secs(31)).await;
        let Ok(after) = service.get_pool_data(usdc, weth, DexProvider::UniswapV2).await else {
            panic!("pair exists");
        };
        assert_ne!(before.reserves.reserve_a, after.reserves.reserve_a);
        assert_eq!(after.reserves.reserve_a, market.usdc.to_raw(1_000_000.0));
    }

    #[tokio::test]
    async fn missing_pair_and_unsupported_provider() {
        let market = Market::new().await;
        let service = market.pool_data();
        let (usdc, wbtc) = (market.usdc.address(), market.wbtc.address());

        let missing = service.get_pool_reserves(usdc, wbtc, DexProvider::UniswapV2).await;
        assert!(matches!(missing, Err(RouterError::PairNotFound { .. })));

        let v3 = service.get_pool_reserves(usdc, wbtc, DexProvider::UniswapV3).await;
        assert!(matches!(v3, Err(RouterError::UnsupportedProvider { .. })));

        let same = service.get_pool_reserves(usdc, usdc, DexProvider::UniswapV2).await;
        assert!(matches!(same, Err(RouterError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn failed_lookup_is_not_cached() {
        let market = Market::new().await;
        let pair = market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        market.chain.fail_pair(pair).await;
        let service = market.pool_data();

        let result = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await;
        assert!(matches!(result, Err(RouterError::Rpc(_))));
        assert!(service.cache().is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chain_times_out() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        market.chain.set_latency(Some(Duration::from_secs(60))).await;
        let service = market.pool_data();

        let result = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await;
        assert!(matches!(result, Err(RouterError::RpcTimeout { .. })));
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 2_000_000.0, 1_000.0).await;
        market.pair(&market.dai, &market.weth, 2_000_000.0, 1_000.0).await;
        market.pair(&market.usdt, &market.weth, 2_000_000.0, 1_000.0).await;
        let service = market.pool_data();

        let request = |a: Address, b: Address| PairRequest {
            token_a: a,
            token_b: b,
            provider: DexProvider::UniswapV2,
        };
        let weth = market.weth.address();
        let pairs = vec![
            request(market.usdc.address(), weth),
            request(market.wbtc.address(), weth),
            request(market.dai.address(), weth),
            request(market.usdt.address(), weth),
            request(market.usdc.address(), market.dai.address()),
            request(weth, market.usdc.address()),
            PairRequest {
                provider: DexProvider::UniswapV3,
                ..request(market.dai.address(), weth)
            },
        ];

        let batch = service.get_multiple_pools(&pairs).await;
        assert_eq!(batch.pools.len(), 3);
        assert_eq!(batch.failures.len(), 3);
        assert!(
            batch
                .failures
                .iter()
                .any(|f| matches!(f.error, RouterError::UnsupportedProvider { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn batch_runs_in_bounded_waves() {
        let market = Market::new().await;
        let legs = [
            (&market.usdc, &market.weth),
            (&market.dai, &market.weth),
            (&market.usdt, &market.weth),
            (&market.wbtc, &market.weth),
            (&market.usdc, &market.dai),
            (&market.usdc, &market.usdt),
            (&market.dai, &market.usdt),
        ];
        let mut pairs = Vec::new();
        for (a, b) in legs {
            market.pair(a, b, 1_000_000.0, 1_000_000.0).await;
            pairs.push(PairRequest {
                token_a: a.address(),
                token_b: b.address(),
                provider: DexProvider::UniswapV2,
            });
        }
        market.chain.set_latency(Some(Duration::from_secs(1))).await;
        let service = market.pool_data();

        let started = tokio::time::Instant::now();
        let batch = service.get_multiple_pools(&pairs).await;
        let elapsed = started.elapsed();

        assert_eq!(batch.pools.len(), 7);
        assert!(batch.failures.is_empty());
        assert_eq!(market.chain.peak_in_flight(), CachePolicy::default().batch_size);
        // Two waves of three sequential reads each.
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(7));
    }

    #[tokio::test]
    async fn analytics_reject_foreign_token() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 1_000.0, 1_000.0).await;
        let service = market.pool_data();
        let Ok(pool) = service
            .get_pool_data(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await
        else {
            panic!("pair exists");
        };

        let impact = service.calculate_price_impact(&pool, 10.0, market.dai.address());
        assert!(matches!(impact, Err(RouterError::TokenNotInPool { .. })));

        let Ok(impact) = service.calculate_price_impact(&pool, 10.0, market.usdc.address()) else {
            panic!("token in pool");
        };
        assert!((impact - 10.0 / 1010.0 * 100.0).abs() < 1e-9);

        let Ok(size) =
            service.calculate_optimal_trade_size(&pool, 1_000.0, market.usdc.address(), 5.0)
        else {
            panic!("token in pool");
        };
        let Ok(fitted) = service.calculate_price_impact(&pool, size, market.usdc.address()) else {
            panic!("token in pool");
        };
        assert!(fitted <= 5.0);
        assert!(5.0 - fitted <= 0.1);

        let Ok(out) = service.expected_output(&pool, 10.0, market.weth.address()) else {
            panic!("token in pool");
        };
        assert!(out < 10.0 * 0.997);
    }

    #[tokio::test]
    async fn clear_cache_publishes_event() {
        let market = Market::new().await;
        market.pair(&market.usdc, &market.weth, 1_000.0, 1_000.0).await;
        let service = market.pool_data();
        let mut events = service.event_bus().subscribe();

        let fetched = service
            .get_pool_reserves(
                market.usdc.address(),
                market.weth.address(),
                DexProvider::UniswapV2,
            )
            .await;
        assert!(fetched.is_ok());
        assert_eq!(service.clear_cache().await, 1);

        let Ok(MarketEvent::ReservesRefreshed { token0, .. }) = events.recv().await else {
            panic!("expected reserves refresh");
        };
        assert_eq!(token0, market.usdc.address().min(market.weth.address()));
        let Ok(MarketEvent::PoolCacheCleared { evicted, .. }) = events.recv().await else {
            panic!("expected cache clear");
        };
        assert_eq!(evicted, 1);
    }
}
