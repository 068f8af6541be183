//! Scheduling collaborators.
//!
//! Streams never run signal handlers inline: every continuation, resurrection
//! and branch dispatch goes through a [`Scheduler`], and every delay is a
//! one-shot timer started on it. Subscriber delivery tasks are local futures spawned
//! on the same scheduler, so nothing ever leaves the engine's thread.
//!
//! ## Contents
//! - [`Scheduler`] the contract the engine consumes
//! - [`ManualScheduler`] deterministic queue + virtual clock (tests, simulations, custom loops)
//! - [`LocalScheduler`] Tokio `LocalSet` backend (`spawn_local` + cancellable sleeps)
//!
//! ## Rules
//! - `defer` never runs the callback before returning.
//! - Deferred callbacks run in the order they were queued.
//! - A stopped timer never fires; stopping an unknown or fired timer is a no-op.
//! - Spawned tasks are polled on the scheduler's thread, never inside `spawn`.

mod local;
mod manual;

use std::time::Duration;

use futures::future::LocalBoxFuture;

pub use local::LocalScheduler;
pub use manual::ManualScheduler;

/// Callback queued on a scheduler.
pub type Callback = Box<dyn FnOnce() + 'static>;

/// Background future polled on the scheduler's thread.
pub type LocalTask = LocalBoxFuture<'static, ()>;

/// Identity of a started timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Builds an id from its raw value (for scheduler implementations).
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Event loop contract consumed by the engine.
pub trait Scheduler: 'static {
    /// Queues `callback` to run on a later tick.
    fn defer(&self, callback: Callback);

    /// Starts a one-shot timer firing `callback` after `after`.
    fn start_timer(&self, after: Duration, callback: Callback) -> TimerId;

    /// Stops a timer so it never fires.
    fn stop_timer(&self, timer: TimerId);

    /// Runs `task` to completion alongside the queued callbacks.
    fn spawn(&self, task: LocalTask);
}
