//! # Subscriber contract
//!
//! A [`Subscribe`] implementation observes stream lifecycle events. It runs as
//! a local task on the provider's scheduler, so it may hold `Rc`/`RefCell`
//! state shared with executables and never needs `Send`.
//!
//! ## Contract
//! - `on_event` must not block the thread: it shares it with the engine.
//!   Awaiting is fine; the next event waits for the current one.
//! - [`Subscribe::queue_capacity`] bounds the events waiting for this
//!   subscriber; beyond it they are dropped and `SubscriberOverflow` is
//!   published on the bus.

use async_trait::async_trait;

use crate::events::Event;

/// Observer of stream lifecycle events.
#[async_trait(?Send)]
pub trait Subscribe: 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow/panic events and logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Maximum number of events waiting for this subscriber.
    fn queue_capacity(&self) -> usize {
        256
    }
}
