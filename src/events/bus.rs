//! # Lifecycle event bus.
//!
//! [`Bus`] hands every stream lifecycle event to raw receivers obtained with
//! [`Provider::subscribe`](crate::Provider::subscribe). It wraps a
//! `tokio::sync::broadcast` sender, which works without a runtime: the engine
//! publishes from whatever thread drives its scheduler and receivers read with
//! `try_recv` or `recv().await`.
//!
//! Subscriber queues are fed by the engine directly, not through the bus;
//! the bus only sees their overflow and panic reports.
//!
//! ## Rules
//! - Publishing never blocks and never fails; with no receiver the event is gone.
//! - The ring buffer is shared: a receiver falling more than `capacity` events
//!   behind gets `Lagged(n)` and loses the `n` oldest.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Clones share the channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus keeping at most `capacity` (at least 1) unread events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes `ev`. Returns how many receivers will see it.
    pub fn publish(&self, ev: Event) -> usize {
        self.tx.send(ev).unwrap_or(0)
    }

    /// Returns a receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn test_publish_without_runtime() {
        let bus = Bus::new(0);
        assert_eq!(bus.publish(Event::new(EventKind::StreamCreated)), 0);

        let mut rx = bus.subscribe();
        assert_eq!(bus.publish(Event::new(EventKind::StreamDead)), 1);
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::StreamDead);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_slow_receiver_lags() {
        let bus = Bus::new(2);
        let mut rx = bus.subscribe();
        for _ in 0..3 {
            bus.publish(Event::new(EventKind::StreamActivated));
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(1))
        ));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::StreamActivated);
    }
}
