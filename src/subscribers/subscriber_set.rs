//! # Subscriber fan-out on the engine's thread.
//!
//! Every subscriber gets a bounded queue and a delivery task spawned on the
//! provider's [`Scheduler`]. The engine only pushes into the queues; the
//! scheduler polls the tasks between its own callbacks.
//!
//! ```text
//! Core::emit(event)
//!     ├─► Bus::publish (raw receivers)
//!     └─► SubscriberSet::emit ── try_send ──► [queue k] ──► delivery k ──► on_event()
//!                                   │ full/closed                  │ panic
//!                                   ▼                              ▼
//!                        Bus: SubscriberOverflow          Bus: SubscriberPanicked
//! ```
//!
//! ## Rules
//! - `emit` never waits and never runs subscriber code.
//! - Each subscriber sees stream events in emission order.
//! - Overflow drops the event for that subscriber only.
//! - Subscriber events go to the bus, never back into the queues.
//! - Dropping the set closes the queues; delivery tasks finish what is queued.

use std::any::Any;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::channel::mpsc;
use futures::{FutureExt, StreamExt};
use tracing::warn;

use crate::events::{Bus, Event};
use crate::scheduler::Scheduler;
use crate::subscribers::Subscribe;

struct Queue {
    name: &'static str,
    tx: RefCell<mpsc::Sender<Rc<Event>>>,
}

/// Bounded per-subscriber queues feeding scheduler-driven delivery tasks.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates one queue per subscriber and spawns its delivery task on `scheduler`.
    #[must_use]
    pub fn new(subs: Vec<Rc<dyn Subscribe>>, bus: Bus, scheduler: &dyn Scheduler) -> Self {
        let queues = subs
            .into_iter()
            .map(|sub| {
                let name = sub.name();
                // The sender owns one guaranteed slot on top of the buffer.
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1) - 1);
                scheduler.spawn(deliver(sub, rx, bus.clone()).boxed_local());
                Queue {
                    name,
                    tx: RefCell::new(tx),
                }
            })
            .collect();
        Self { queues, bus }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    /// Returns `true` if there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Queues `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        if self.queues.is_empty() {
            return;
        }
        let event = Rc::new(event.clone());
        for queue in &self.queues {
            let Err(err) = queue.tx.borrow_mut().try_send(Rc::clone(&event)) else {
                continue;
            };
            let reason = if err.is_full() { "full" } else { "closed" };
            self.bus.publish(Event::subscriber_overflow(queue.name, reason));
        }
    }
}

async fn deliver(sub: Rc<dyn Subscribe>, mut rx: mpsc::Receiver<Rc<Event>>, bus: Bus) {
    while let Some(event) = rx.next().await {
        let outcome = AssertUnwindSafe(sub.on_event(&event)).catch_unwind().await;
        if let Err(panic) = outcome {
            let reason = panic_reason(panic.as_ref());
            warn!(subscriber = sub.name(), %reason, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(sub.name(), reason));
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::scheduler::ManualScheduler;
    use async_trait::async_trait;
    use std::cell::Cell;

    struct Counting(Rc<Cell<usize>>);

    #[async_trait(?Send)]
    impl Subscribe for Counting {
        async fn on_event(&self, _event: &Event) {
            self.0.set(self.0.get() + 1);
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Panicking;

    #[async_trait(?Send)]
    impl Subscribe for Panicking {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber boom");
        }

        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    struct Tiny;

    #[async_trait(?Send)]
    impl Subscribe for Tiny {
        async fn on_event(&self, _event: &Event) {}

        fn name(&self) -> &'static str {
            "tiny"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_fan_out_and_panic_isolation() {
        let sched = ManualScheduler::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let hits = Rc::new(Cell::new(0));

        let subs: Vec<Rc<dyn Subscribe>> = vec![Rc::new(Counting(hits.clone())), Rc::new(Panicking)];
        let set = SubscriberSet::new(subs, bus.clone(), &sched);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::StreamCreated));
        set.emit(&Event::new(EventKind::StreamDead));
        assert_eq!(hits.get(), 0);

        sched.run_until_idle();
        assert_eq!(hits.get(), 2);

        let mut panics = 0;
        while let Ok(ev) = rx.try_recv() {
            if ev.is_subscriber_panic() {
                assert_eq!(ev.subscriber, Some("panicking"));
                panics += 1;
            }
        }
        assert_eq!(panics, 2);
    }

    #[test]
    fn test_full_queue_reports_overflow() {
        let sched = ManualScheduler::new();
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();

        let subs: Vec<Rc<dyn Subscribe>> = vec![Rc::new(Tiny)];
        let set = SubscriberSet::new(subs, bus.clone(), &sched);
        set.emit(&Event::new(EventKind::StreamCreated));
        set.emit(&Event::new(EventKind::StreamDead));

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.subscriber, Some("tiny"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=tiny reason=full"));

        sched.run_until_idle();
        set.emit(&Event::new(EventKind::StreamDisposed));
        assert!(rx.try_recv().is_err());
    }
}
