//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted while streams run.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: signal routing in `core` (created, locked, activated, closed,
//!   failed, retry/repeat, aborted, dead/canceled), the registry (disposed) and
//!   `SubscriberSet` delivery (overflow/panic).
//! - **Consumers**: `Provider::subscribe()` receivers. Subscribers registered
//!   with `ProviderBuilder::with_subscribers` get stream events straight from
//!   the engine and never read the bus.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
