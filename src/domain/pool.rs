//! Pool identity, reserve snapshots and derived liquidity views.

use std::fmt;
use std::time::Duration;

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use super::{DexProvider, Token};

/// Cache key for a pool: the unordered token pair plus the provider.
///
/// `PoolKey::new(a, b, p) == PoolKey::new(b, a, p)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PoolKey {
    low: Address,
    high: Address,
    provider: DexProvider,
}

impl PoolKey {
    /// Builds the key for a pair, ordering the addresses canonically.
    #[must_use]
    pub fn new(token_a: Address, token_b: Address, provider: DexProvider) -> Self {
        let (low, high) = if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        Self {
            low,
            high,
            provider,
        }
    }

    /// The numerically lower address of the pair.
    #[must_use]
    pub const fn low(&self) -> Address {
        self.low
    }

    /// The numerically higher address of the pair.
    #[must_use]
    pub const fn high(&self) -> Address {
        self.high
    }

    /// Provider the pool belongs to.
    #[must_use]
    pub const fn provider(&self) -> DexProvider {
        self.provider
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}:{}", self.low, self.high, self.provider)
    }
}

/// Snapshot of an AMM pool's two reserve balances.
///
/// The reserves are expressed in the order of `token_a` / `token_b`, which
/// is the order the caller asked for. Snapshots are never mutated: once
/// older than the cache TTL they are replaced by a fresh read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolReserves {
    /// On-chain pair contract address.
    pub pair_address: Address,
    /// Provider the pair belongs to.
    pub provider: DexProvider,
    /// First token, in caller order.
    pub token_a: Address,
    /// Second token, in caller order.
    pub token_b: Address,
    /// Raw reserve of `token_a`.
    pub reserve_a: u128,
    /// Raw reserve of `token_b`.
    pub reserve_b: u128,
    /// Wall-clock capture time.
    pub fetched_at: DateTime<Utc>,
    /// Monotonic capture time used for TTL checks.
    #[serde(skip)]
    pub captured_at: Instant,
}

impl PoolReserves {
    /// Cache key of this snapshot.
    #[must_use]
    pub fn key(&self) -> PoolKey {
        PoolKey::new(self.token_a, self.token_b, self.provider)
    }

    /// Age of the snapshot.
    #[must_use]
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    /// Returns `true` once the snapshot is older than `ttl`.
    #[must_use]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.age() >= ttl
    }

    /// Returns the snapshot with `token_a` and `token_b` swapped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            token_a: self.token_b,
            token_b: self.token_a,
            reserve_a: self.reserve_b,
            reserve_b: self.reserve_a,
            ..self.clone()
        }
    }

    /// Returns the snapshot oriented so that `first` is `token_a`.
    ///
    /// Leaves the snapshot unchanged if `first` is not `token_b`.
    #[must_use]
    pub fn oriented(&self, first: Address) -> Self {
        if self.token_b == first && self.token_a != first {
            self.reversed()
        } else {
            self.clone()
        }
    }
}

/// Derived view of a [`PoolReserves`] snapshot with token metadata,
/// trading fee and a liquidity metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityPool {
    /// Underlying reserves snapshot, oriented like `token_a` / `token_b`.
    pub reserves: PoolReserves,
    /// Descriptor of `reserves.token_a`.
    pub token_a: Token,
    /// Descriptor of `reserves.token_b`.
    pub token_b: Token,
    /// Trading fee as a fraction of the input amount.
    pub fee_rate: f64,
    /// Geometric mean of both reserves in human units.
    pub liquidity: f64,
}

impl LiquidityPool {
    /// Derives the pool view from a snapshot and the two token descriptors.
    ///
    /// The descriptors may be given in either order; they are matched to
    /// the snapshot's orientation by address.
    #[must_use]
    pub fn derive(reserves: PoolReserves, first: Token, second: Token, fee_rate: f64) -> Self {
        let (token_a, token_b) = if first.address() == reserves.token_a {
            (first, second)
        } else {
            (second, first)
        };
        let liquidity =
            (token_a.to_human(reserves.reserve_a) * token_b.to_human(reserves.reserve_b)).sqrt();
        Self {
            reserves,
            token_a,
            token_b,
            fee_rate,
            liquidity,
        }
    }

    /// Cache key of the pool.
    #[must_use]
    pub fn key(&self) -> PoolKey {
        self.reserves.key()
    }

    /// On-chain pair address.
    #[must_use]
    pub const fn pair_address(&self) -> Address {
        self.reserves.pair_address
    }

    /// Provider the pool belongs to.
    #[must_use]
    pub const fn provider(&self) -> DexProvider {
        self.reserves.provider
    }

    /// Returns the view with both sides swapped.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            reserves: self.reserves.reversed(),
            token_a: self.token_b.clone(),
            token_b: self.token_a.clone(),
            fee_rate: self.fee_rate,
            liquidity: self.liquidity,
        }
    }

    /// Returns the view oriented so that `first` is `token_a`.
    #[must_use]
    pub fn oriented(&self, first: Address) -> Self {
        if self.token_b.address() == first && self.token_a.address() != first {
            self.reversed()
        } else {
            self.clone()
        }
    }

    /// Returns `(reserve_in, reserve_out)` in human units for a trade
    /// selling `token_in`, or `None` if the token is not in the pool.
    #[must_use]
    pub fn sides(&self, token_in: Address) -> Option<(f64, f64)> {
        let a = self.token_a.to_human(self.reserves.reserve_a);
        let b = self.token_b.to_human(self.reserves.reserve_b);
        if token_in == self.token_a.address() {
            Some((a, b))
        } else if token_in == self.token_b.address() {
            Some((b, a))
        } else {
            None
        }
    }

    /// The token received when selling `token_in` into this pool.
    #[must_use]
    pub fn counterpart(&self, token_in: Address) -> Option<&Token> {
        if token_in == self.token_a.address() {
            Some(&self.token_b)
        } else if token_in == self.token_b.address() {
            Some(&self.token_a)
        } else {
            None
        }
    }
}
