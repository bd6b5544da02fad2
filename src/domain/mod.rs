//! Domain layer: tokens, pools, routes, the reserves cache and market events.
//!
//! Everything here is independent of the chain transport and of HTTP. The
//! services in [`crate::service`] combine these types with a
//! [`crate::chain::ChainClient`].

pub mod amm_math;
pub mod event_bus;
pub mod market_event;
pub mod pool;
pub mod pool_cache;
pub mod provider;
pub mod route;
pub mod token;

pub use event_bus::EventBus;
pub use market_event::MarketEvent;
pub use pool::{LiquidityPool, PoolKey, PoolReserves};
pub use pool_cache::PoolCache;
pub use provider::DexProvider;
pub use route::{
    CandidateOutcome, CandidateRejection, OptimalRoute, RouteKind, RouteLeg, RouteSearch,
    RouteSegment,
};
pub use token::{Token, parse_address};
