//! WebSocket layer: connection handling, message routing, subscriptions.
//!
//! The WebSocket endpoint at `/ws` streams market events (reserve
//! refreshes, quotes, cache clears) filtered by pair address, and accepts
//! quote commands.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
