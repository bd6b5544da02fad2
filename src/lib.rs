//! # swap-router
//!
//! Swap route optimizer and pool reserves cache for EVM constant-product
//! DEXes (Uniswap V2 and its forks).
//!
//! The service reads pair reserves from a chain node, caches them with a
//! short TTL, and answers quote requests by comparing a direct swap, two-hop
//! routes through bridge tokens and a split route through the wrapped native
//! asset. Every segment of a returned route stays within the caller's price
//! impact ceiling.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── RouteOptimizerService (service/)
//!     ├── PoolDataService + TokenService (service/)
//!     │
//!     ├── PoolCache, AMM math, EventBus (domain/)
//!     │
//!     └── ChainClient: JSON-RPC node or in-memory chain (chain/)
//! ```

pub mod api;
pub mod app_state;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
