//! # Tokio-backed scheduler for a single-threaded runtime.
//!
//! [`LocalScheduler`] maps the scheduling contract onto a Tokio `LocalSet`:
//! - `defer` → `tokio::task::spawn_local` (runs on a later poll of the set);
//! - `start_timer` → `spawn_local` of `sleep(after)` raced against a
//!   [`CancellationToken`]; `stop_timer` cancels the token;
//! - `spawn` → `spawn_local` of the task itself.
//!
//! ## Rules
//! - Must be used from inside a `LocalSet` (`spawn_local` panics otherwise).
//! - Timers follow the runtime clock, so `start_paused` tests auto-advance.
//!
//! ## Example
//! ```rust
//! use std::rc::Rc;
//! use flowvisor::{LocalScheduler, MapFn, Provider, StreamType};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async {
//!         let provider = Provider::new(Rc::new(LocalScheduler::new()));
//!         provider.create(MapFn::new(Ok), StreamType::Abortable);
//!         tokio::time::sleep(std::time::Duration::from_millis(1)).await;
//!     })
//!     .await;
//! # }
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Callback, LocalTask, Scheduler, TimerId};

/// Scheduler running callbacks as local Tokio tasks.
#[derive(Default)]
pub struct LocalScheduler {
    timers: Rc<RefCell<HashMap<u64, CancellationToken>>>,
    next_timer: Cell<u64>,
}

impl LocalScheduler {
    /// Creates the scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Scheduler for LocalScheduler {
    fn defer(&self, callback: Callback) {
        tokio::task::spawn_local(async move { callback() });
    }

    fn start_timer(&self, after: Duration, callback: Callback) -> TimerId {
        let id = self.next_timer.get();
        self.next_timer.set(id + 1);

        let token = CancellationToken::new();
        self.timers.borrow_mut().insert(id, token.clone());

        let timers = Rc::clone(&self.timers);
        tokio::task::spawn_local(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    timers.borrow_mut().remove(&id);
                    callback();
                }
            }
        });
        TimerId::from_raw(id)
    }

    fn stop_timer(&self, timer: TimerId) {
        let token = self.timers.borrow_mut().remove(&timer.as_raw());
        if let Some(token) = token {
            token.cancel();
        }
    }

    fn spawn(&self, task: LocalTask) {
        tokio::task::spawn_local(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_timer_fires_and_stop_cancels() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let sched = LocalScheduler::new();
                let fired = Rc::new(Cell::new(0));

                let f = fired.clone();
                sched.start_timer(Duration::from_millis(10), Box::new(move || f.set(f.get() + 1)));
                let f = fired.clone();
                let stopped =
                    sched.start_timer(Duration::from_millis(10), Box::new(move || f.set(f.get() + 10)));
                sched.stop_timer(stopped);

                tokio::time::sleep(Duration::from_millis(20)).await;
                assert_eq!(fired.get(), 1);
                assert_eq!(sched.pending_timers(), 0);
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_defer_runs_later() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let sched = LocalScheduler::new();
                let hit = Rc::new(Cell::new(false));
                let h = hit.clone();
                sched.defer(Box::new(move || h.set(true)));
                assert!(!hit.get());
                tokio::time::sleep(Duration::from_millis(1)).await;
                assert!(hit.get());
            })
            .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_spawned_task_runs_on_local_set() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let sched = LocalScheduler::new();
                let (tx, rx) = tokio::sync::oneshot::channel();
                let marker = Rc::new(());
                let held = marker.clone();
                sched.spawn(Box::pin(async move {
                    let _ = tx.send(Rc::strong_count(&held));
                }));
                assert_eq!(rx.await.ok(), Some(2));
            })
            .await;
    }
}
