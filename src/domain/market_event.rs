//! Events describing changes to the cached market view.
//!
//! Reserve refreshes, cache evictions and served quotes are published as
//! [`MarketEvent`]s on the [`super::EventBus`] and forwarded to WebSocket
//! subscribers.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::DexProvider;

/// Market event emitted by the pool data and route services.
///
/// Amounts are serialized as strings so that large raw reserves keep
/// their precision in JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// A pool's reserves were read from chain and replaced the cached snapshot.
    ReservesRefreshed {
        /// Pair contract address.
        pair_address: Address,
        /// Provider of the pool.
        provider: DexProvider,
        /// Lower token address of the pair.
        token0: Address,
        /// Higher token address of the pair.
        token1: Address,
        /// Raw reserve of `token0`.
        reserve0: String,
        /// Raw reserve of `token1`.
        reserve1: String,
        /// Capture timestamp.
        timestamp: DateTime<Utc>,
    },

    /// All cached reserves and pool views were evicted.
    PoolCacheCleared {
        /// Number of reserves snapshots evicted.
        evicted: usize,
        /// Eviction timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A quote was served.
    RouteQuoted {
        /// Input token address.
        token_in: Address,
        /// Output token address.
        token_out: Address,
        /// Routed input amount (human units).
        amount_in: String,
        /// Expected output amount (human units).
        amount_out: String,
        /// Worst segment price impact, in percent.
        price_impact: f64,
        /// Route shape, e.g. `"direct"`.
        route: String,
        /// Pair addresses the route trades against.
        pair_addresses: Vec<Address>,
        /// Quote timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl MarketEvent {
    /// Pair addresses this event concerns. Empty for market-wide events.
    #[must_use]
    pub fn pair_addresses(&self) -> Vec<Address> {
        match self {
            Self::ReservesRefreshed { pair_address, .. } => vec![*pair_address],
            Self::RouteQuoted { pair_addresses, .. } => pair_addresses.clone(),
            Self::PoolCacheCleared { .. } => Vec::new(),
        }
    }

    /// Returns `true` if the event concerns the whole market rather than
    /// specific pools.
    #[must_use]
    pub const fn is_market_wide(&self) -> bool {
        matches!(self, Self::PoolCacheCleared { .. })
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::ReservesRefreshed { .. } => "reserves_refreshed",
            Self::PoolCacheCleared { .. } => "pool_cache_cleared",
            Self::RouteQuoted { .. } => "route_quoted",
        }
    }
}
