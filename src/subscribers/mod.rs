//! # Event subscribers for the flowvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! that queues stream lifecycle events for user code. Delivery runs as local
//! tasks on the provider's [`Scheduler`](crate::Scheduler), after the signal
//! that produced the event has returned.
//!
//! ## Architecture
//! ```text
//! signal routing ── Core::emit(Event) ──┬──► Bus (Provider::subscribe)
//!                                       └──► SubscriberSet (bounded queues)
//!                                                    │  polled by the Scheduler
//!                                        ┌───────────┼───────────┐
//!                                        ▼           ▼           ▼
//!                                    LogWriter    Metrics      Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use std::cell::Cell;
//! use flowvisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! #[derive(Default)]
//! struct FailureCounter(Cell<u64>);
//!
//! #[async_trait(?Send)]
//! impl Subscribe for FailureCounter {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::StreamFailed {
//!             self.0.set(self.0.get() + 1);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "failure-counter"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
