//! Service layer: pool data caching and route search.
//!
//! [`PoolDataService`] owns the reserves cache and every chain read;
//! [`RouteOptimizerService`] builds route candidates on top of it.
//! Both publish [`crate::domain::MarketEvent`]s through the shared
//! [`crate::domain::EventBus`].

pub mod pool_data_service;
pub mod route_optimizer;
pub mod token_service;

#[cfg(test)]
pub(crate) mod fixtures;

pub use pool_data_service::{PairFailure, PairRequest, PoolBatch, PoolDataService};
pub use route_optimizer::{RouteOptimizerService, RouteRequest};
pub use token_service::TokenService;
