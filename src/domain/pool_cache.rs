//! Process-local TTL cache for pool reserves and derived pool views.
//!
//! [`PoolCache`] keeps two maps keyed by [`PoolKey`], each behind its own
//! [`tokio::sync::RwLock`]: concurrent readers never observe a half-written
//! entry and writers are serialized per map.
//!
//! Entries are stored in canonical orientation (lower address first) so
//! that `(A, B)` and `(B, A)` share one slot.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;

use super::{LiquidityPool, PoolKey, PoolReserves};

/// Reserves snapshots plus the pool views derived from them.
///
/// Reserves expire after `ttl`. Pool views have no TTL of their own: a view
/// is only served while it was derived from the reserves snapshot that is
/// currently cached.
#[derive(Debug)]
pub struct PoolCache {
    reserves: RwLock<HashMap<PoolKey, PoolReserves>>,
    pools: RwLock<HashMap<PoolKey, LiquidityPool>>,
    ttl: Duration,
}

impl PoolCache {
    /// Creates an empty cache with the given reserves TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            reserves: RwLock::new(HashMap::new()),
            pools: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Time-to-live of reserves snapshots.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached snapshot for `key` if it has not expired.
    pub async fn live_reserves(&self, key: &PoolKey) -> Option<PoolReserves> {
        let map = self.reserves.read().await;
        map.get(key)
            .filter(|snapshot| !snapshot.is_expired(self.ttl))
            .cloned()
    }

    /// Stores a snapshot, replacing whatever was cached for its key.
    pub async fn store_reserves(&self, reserves: &PoolReserves) {
        let key = reserves.key();
        let canonical = reserves.oriented(key.low());
        self.reserves.write().await.insert(key, canonical);
    }

    /// Returns the cached pool view derived from exactly `reserves`.
    pub async fn pool_for(&self, reserves: &PoolReserves) -> Option<LiquidityPool> {
        let map = self.pools.read().await;
        map.get(&reserves.key())
            .filter(|pool| pool.reserves.captured_at == reserves.captured_at)
            .cloned()
    }

    /// Stores a pool view, replacing any previous view for its key.
    pub async fn store_pool(&self, pool: &LiquidityPool) {
        let key = pool.key();
        let canonical = pool.oriented(key.low());
        self.pools.write().await.insert(key, canonical);
    }

    /// Evicts everything. Returns the number of reserves entries removed.
    pub async fn clear(&self) -> usize {
        let mut reserves = self.reserves.write().await;
        let mut pools = self.pools.write().await;
        let removed = reserves.len();
        reserves.clear();
        pools.clear();
        removed
    }

    /// Drops expired snapshots and the views derived from them.
    ///
    /// Returns the number of reserves entries removed.
    pub async fn purge_expired(&self) -> usize {
        let mut reserves = self.reserves.write().await;
        let mut pools = self.pools.write().await;
        let before = reserves.len();
        reserves.retain(|_, snapshot| !snapshot.is_expired(self.ttl));
        pools.retain(|key, _| reserves.contains_key(key));
        before - reserves.len()
    }

    /// Number of cached reserves snapshots (live or stale).
    pub async fn len(&self) -> usize {
        self.reserves.read().await.len()
    }

    /// Returns `true` if no snapshot is cached.
    pub async fn is_empty(&self) -> bool {
        self.reserves.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DexProvider, Token};
    use alloy_primitives::Address;
    use chrono::Utc;
    use tokio::time::Instant;

    fn snapshot(token_a: Address, token_b: Address) -> PoolReserves {
        PoolReserves {
            pair_address: Address::repeat_byte(0xcc),
            provider: DexProvider::UniswapV2,
            token_a,
            token_b,
            reserve_a: 100,
            reserve_b: 300,
            fetched_at: Utc::now(),
            captured_at: Instant::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = PoolCache::new(Duration::from_secs(30));
        let snap = snapshot(Address::repeat_byte(2), Address::repeat_byte(1));
        cache.store_reserves(&snap).await;

        assert!(cache.live_reserves(&snap.key()).await.is_some());
        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(cache.live_reserves(&snap.key()).await.is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.live_reserves(&snap.key()).await.is_none());
    }

    #[tokio::test]
    async fn stored_in_canonical_orientation() {
        let cache = PoolCache::new(Duration::from_secs(30));
        let high = Address::repeat_byte(2);
        let low = Address::repeat_byte(1);
        cache.store_reserves(&snapshot(high, low)).await;

        let key = PoolKey::new(low, high, DexProvider::UniswapV2);
        let Some(cached) = cache.live_reserves(&key).await else {
            panic!("expected cached snapshot");
        };
        assert_eq!(cached.token_a, low);
        assert_eq!(cached.reserve_a, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn pool_view_tied_to_snapshot() {
        let cache = PoolCache::new(Duration::from_secs(30));
        let a = Token::new(Address::repeat_byte(1), "A", "A", 18);
        let b = Token::new(Address::repeat_byte(2), "B", "B", 18);
        let first = snapshot(a.address(), b.address());
        let pool = LiquidityPool::derive(first.clone(), a.clone(), b.clone(), 0.003);
        cache.store_pool(&pool).await;
        assert!(cache.pool_for(&first).await.is_some());

        tokio::time::advance(Duration::from_millis(2)).await;
        let second = snapshot(a.address(), b.address());
        assert!(cache.pool_for(&second).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_clear() {
        let cache = PoolCache::new(Duration::from_secs(30));
        cache
            .store_reserves(&snapshot(Address::repeat_byte(1), Address::repeat_byte(2)))
            .await;
        tokio::time::advance(Duration::from_secs(31)).await;
        cache
            .store_reserves(&snapshot(Address::repeat_byte(3), Address::repeat_byte(4)))
            .await;
        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.purge_expired().await, 1);
        assert_eq!(cache.clear().await, 1);
        assert!(cache.is_empty().await);
    }
}
