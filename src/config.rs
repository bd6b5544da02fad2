//! Router configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Behavioural thresholds are grouped in
//! [`CachePolicy`] and [`RoutingPolicy`], whose `Default` impls hold the
//! documented defaults.

use std::net::SocketAddr;
use std::time::Duration;

use crate::chain::Network;
use crate::domain::parse_address;

/// Sentinel `RPC_URL` selecting the in-memory chain.
pub const MEMORY_RPC_URL: &str = "memory";

/// Caching and batching knobs of the pool data service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachePolicy {
    /// Lifetime of a reserves snapshot.
    pub reserves_ttl: Duration,
    /// Pairs fetched concurrently per batch in `get_multiple_pools`.
    pub batch_size: usize,
    /// Deadline for a single chain read.
    pub rpc_timeout: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            reserves_ttl: Duration::from_secs(30),
            batch_size: 5,
            rpc_timeout: Duration::from_millis(10_000),
        }
    }
}

/// Thresholds steering the route search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingPolicy {
    /// Below this input amount the direct route is returned without
    /// searching alternatives.
    pub small_amount_threshold: f64,
    /// Minimum input amount for which a split route is tried.
    pub split_route_threshold: f64,
    /// Iteration cap of the trade-size binary search.
    pub max_search_iterations: u32,
    /// Price impact ceiling (percent) when the request names none.
    pub default_max_price_impact: f64,
    /// A fitted entry amount below this share of the request rejects the candidate.
    pub min_fit_ratio: f64,
    /// Direct impact at or under this share of the ceiling ends the search early.
    pub comfortable_impact_ratio: f64,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            small_amount_threshold: 10.0,
            split_route_threshold: 1000.0,
            max_search_iterations: 10,
            default_max_price_impact: 5.0,
            min_fit_ratio: 0.1,
            comfortable_impact_ratio: 0.5,
        }
    }
}

/// Top-level router configuration.
///
/// Loaded once at startup via [`RouterConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// JSON-RPC endpoint, or [`MEMORY_RPC_URL`] for the in-memory chain.
    /// Empty until configured.
    pub rpc_url: String,

    /// Network preset the factories and tokens are taken from.
    pub network: Network,

    /// Overall budget for one quote request.
    pub quote_timeout: Duration,

    /// Capacity of the EventBus broadcast channel.
    pub event_bus_capacity: usize,

    /// Seconds between sweeps of expired cache entries.
    pub cache_sweep_interval_secs: u64,

    /// Pool cache policy.
    pub cache: CachePolicy,

    /// Route search policy.
    pub routing: RoutingPolicy,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            rpc_url: String::new(),
            network: Network::mainnet(),
            quote_timeout: Duration::from_millis(30_000),
            event_bus_capacity: 10_000,
            cache_sweep_interval_secs: 60,
            cache: CachePolicy::default(),
            routing: RoutingPolicy::default(),
        }
    }
}

impl RouterConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `RPC_URL` is unset or blank, `LISTEN_ADDR` cannot
    /// be parsed as a [`SocketAddr`], `NETWORK` names an unknown network, or
    /// `BRIDGE_TOKENS` contains an invalid address.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let rpc_url = required_rpc_url(std::env::var("RPC_URL").ok())?;

        let mut network: Network = std::env::var("NETWORK")
            .unwrap_or_else(|_| "mainnet".to_string())
            .parse()?;
        if let Ok(list) = std::env::var("BRIDGE_TOKENS") {
            let bridge_tokens = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(parse_address)
                .collect::<Result<Vec<_>, _>>()?;
            network = network.with_bridge_tokens(bridge_tokens);
        }

        let cache_defaults = CachePolicy::default();
        let cache = CachePolicy {
            reserves_ttl: Duration::from_secs(parse_env(
                "RESERVES_TTL_SECS",
                cache_defaults.reserves_ttl.as_secs(),
            )),
            batch_size: parse_env("POOL_BATCH_SIZE", cache_defaults.batch_size).max(1),
            rpc_timeout: Duration::from_millis(parse_env("RPC_TIMEOUT_MS", 10_000)),
        };

        let routing_defaults = RoutingPolicy::default();
        let routing = RoutingPolicy {
            small_amount_threshold: parse_env(
                "SMALL_AMOUNT_THRESHOLD",
                routing_defaults.small_amount_threshold,
            ),
            split_route_threshold: parse_env(
                "SPLIT_ROUTE_THRESHOLD",
                routing_defaults.split_route_threshold,
            ),
            max_search_iterations: parse_env(
                "OPTIMAL_SIZE_MAX_ITERATIONS",
                routing_defaults.max_search_iterations,
            ),
            default_max_price_impact: parse_env(
                "MAX_PRICE_IMPACT",
                routing_defaults.default_max_price_impact,
            ),
            ..routing_defaults
        };

        Ok(Self {
            listen_addr,
            rpc_url,
            network,
            quote_timeout: Duration::from_millis(parse_env("QUOTE_TIMEOUT_MS", 30_000)),
            event_bus_capacity: parse_env("EVENT_BUS_CAPACITY", 10_000),
            cache_sweep_interval_secs: parse_env("CACHE_SWEEP_INTERVAL_SECS", 60),
            cache,
            routing,
        })
    }

    /// Returns `true` when the in-memory chain is selected.
    #[must_use]
    pub fn uses_memory_chain(&self) -> bool {
        self.rpc_url.eq_ignore_ascii_case(MEMORY_RPC_URL)
    }
}

/// Validates the `RPC_URL` setting. The in-memory chain is only selected
/// when [`MEMORY_RPC_URL`] is given explicitly.
fn required_rpc_url(value: Option<String>) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(format!(
            "RPC_URL is not set (use a node URL, or `{MEMORY_RPC_URL}` for the in-memory chain)"
        )),
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
