//! Broadcast channel for market events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Reserve
//! refreshes, cache evictions and quotes publish a [`MarketEvent`] through
//! the bus, and every WebSocket connection subscribes to receive filtered
//! events.

use tokio::sync::broadcast;

use super::MarketEvent;

/// Broadcast bus for [`MarketEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MarketEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: MarketEvent) -> usize {
        let kind = event.event_type_str();
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!(event = kind, delivered, "market event published");
        delivered
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MarketEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::DexProvider;
    use alloy_primitives::Address;
    use chrono::Utc;

    fn make_event(pair_address: Address) -> MarketEvent {
        MarketEvent::ReservesRefreshed {
            pair_address,
            provider: DexProvider::UniswapV2,
            token0: Address::repeat_byte(0xaa),
            token1: Address::repeat_byte(0xbb),
            reserve0: "1000".to_string(),
            reserve1: "2000".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        let count = bus.publish(make_event(Address::repeat_byte(1)));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn subscriber_receives_event() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();

        let pair = Address::repeat_byte(7);
        bus.publish(make_event(pair));

        let event = rx.recv().await;
        let Ok(event) = event else {
            panic!("expected to receive event");
        };
        assert_eq!(event.pair_addresses(), vec![pair]);
    }

    #[tokio::test]
    async fn slow_receiver_lags_and_keeps_newest() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for byte in 1..=3 {
            bus.publish(make_event(Address::repeat_byte(byte)));
        }

        let Err(broadcast::error::RecvError::Lagged(missed)) = rx.recv().await else {
            panic!("receiver should lag");
        };
        assert_eq!(missed, 1);
        let Ok(event) = rx.recv().await else {
            panic!("expected buffered event");
        };
        assert_eq!(event.pair_addresses(), vec![Address::repeat_byte(2)]);
    }

    #[test]
    fn receivers_are_counted_until_dropped() {
        let bus = EventBus::new(8);
        let first = bus.subscribe();
        let _second = bus.subscribe();
        assert_eq!(bus.publish(make_event(Address::ZERO)), 2);
        drop(first);
        assert_eq!(bus.receiver_count(), 1);
    }
}
