//! Per-connection subscription manager.
//!
//! Tracks which pair addresses a WebSocket client follows and filters
//! market events server-side.

use std::collections::HashSet;

use alloy_primitives::Address;

use crate::domain::MarketEvent;

/// Manages the set of pair subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed pair addresses. Ignored while `subscribe_all` is set.
    pairs: HashSet<Address>,
    /// Whether the client follows every pair (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds pair addresses to the subscription set.
    pub fn subscribe(&mut self, pairs: &[Address], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.pairs.extend(pairs.iter().copied());
    }

    /// Removes pair addresses. `wildcard` also clears the wildcard.
    pub fn unsubscribe(&mut self, pairs: &[Address], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for pair in pairs {
            self.pairs.remove(pair);
        }
    }

    /// Returns `true` if the event should be forwarded to this client.
    ///
    /// Market-wide events reach every client; pool events reach clients
    /// following any of the pairs involved.
    #[must_use]
    pub fn matches(&self, event: &MarketEvent) -> bool {
        if event.is_market_wide() || self.subscribe_all {
            return true;
        }
        event
            .pair_addresses()
            .iter()
            .any(|pair| self.pairs.contains(pair))
    }

    /// Returns the number of explicitly subscribed pairs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub const fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
