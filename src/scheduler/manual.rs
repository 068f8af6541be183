//! # Deterministic scheduler driven by the caller.
//!
//! [`ManualScheduler`] keeps a FIFO of deferred callbacks, a set of timers
//! on a virtual clock and a `futures` [`LocalPool`] for spawned tasks.
//! Nothing runs until the owner drives it:
//!
//! ```text
//! tick()            run the callbacks queued before the call (not the ones they queue),
//!                   then poll spawned tasks until they stall
//! run_until_idle()  tick until the queue is empty (timers untouched)
//! advance(d)        move the clock by d, firing due timers in deadline order,
//!                   draining the queue before and after each timer
//! run_all()         run_until_idle + fire every timer, however far away
//! ```
//!
//! Callbacks are popped before they run, so they may freely queue more work
//! or start/stop timers.
//!
//! ## Example
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::time::Duration;
//! use flowvisor::{ManualScheduler, Scheduler};
//!
//! let sched = ManualScheduler::new();
//! let hits = Rc::new(Cell::new(0));
//!
//! let h = hits.clone();
//! sched.start_timer(Duration::from_millis(10), Box::new(move || h.set(h.get() + 1)));
//!
//! sched.advance(Duration::from_millis(5));
//! assert_eq!(hits.get(), 0);
//! sched.advance(Duration::from_millis(5));
//! assert_eq!(hits.get(), 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;
use tracing::warn;

use super::{Callback, LocalTask, Scheduler, TimerId};

/// Deterministic scheduler with a virtual clock.
pub struct ManualScheduler {
    queue: RefCell<VecDeque<Callback>>,
    timers: RefCell<BTreeMap<(Duration, u64), Callback>>,
    now: Cell<Duration>,
    next_timer: Cell<u64>,
    tasks: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    /// Creates an idle scheduler at virtual time zero.
    pub fn new() -> Self {
        let tasks = LocalPool::new();
        let spawner = tasks.spawner();
        Self {
            queue: RefCell::default(),
            timers: RefCell::default(),
            now: Cell::default(),
            next_timer: Cell::default(),
            tasks: RefCell::new(tasks),
            spawner,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of queued callbacks.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Returns `true` if nothing is queued and no timer is armed.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0 && self.pending_timers() == 0
    }

    /// Runs the callbacks queued before this call. Returns how many ran.
    pub fn tick(&self) -> usize {
        let batch: Vec<Callback> = self.queue.borrow_mut().drain(..).collect();
        let n = batch.len();
        for callback in batch {
            callback();
        }
        self.poll_tasks();
        n
    }

    /// Ticks until the queue is empty. Returns how many callbacks ran.
    ///
    /// Never returns while a stream keeps resurrecting itself without a delay.
    pub fn run_until_idle(&self) -> usize {
        self.poll_tasks();
        let mut total = 0;
        while self.pending() > 0 {
            total += self.tick();
        }
        total
    }

    /// Moves the virtual clock forward by `by`, firing due timers in order.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        self.run_until_idle();
        while let Some(callback) = self.pop_due(target) {
            callback();
            self.run_until_idle();
        }
        self.now.set(target);
    }

    /// Drains the queue and fires every timer, jumping the clock as needed.
    pub fn run_all(&self) {
        self.run_until_idle();
        while let Some(callback) = self.pop_due(Duration::MAX) {
            callback();
            self.run_until_idle();
        }
    }

    /// Polls spawned tasks until none can make progress.
    fn poll_tasks(&self) {
        // A task driving this scheduler itself would re-enter the pool.
        if let Ok(mut tasks) = self.tasks.try_borrow_mut() {
            tasks.run_until_stalled();
        }
    }

    fn pop_due(&self, limit: Duration) -> Option<Callback> {
        let mut timers = self.timers.borrow_mut();
        let key = *timers.keys().next()?;
        if key.0 > limit {
            return None;
        }
        self.now.set(self.now.get().max(key.0));
        timers.remove(&key)
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, callback: Callback) {
        self.queue.borrow_mut().push_back(callback);
    }

    fn start_timer(&self, after: Duration, callback: Callback) -> TimerId {
        let id = self.next_timer.get();
        self.next_timer.set(id + 1);
        let deadline = self.now.get().saturating_add(after);
        self.timers.borrow_mut().insert((deadline, id), callback);
        TimerId::from_raw(id)
    }

    fn stop_timer(&self, timer: TimerId) {
        self.timers
            .borrow_mut()
            .retain(|&(_, id), _| id != timer.as_raw());
    }

    fn spawn(&self, task: LocalTask) {
        if let Err(err) = self.spawner.spawn_local(task) {
            warn!(error = %err, "task not spawned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Callback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let make = move |n: u32| -> Callback {
            let l = l.clone();
            Box::new(move || l.borrow_mut().push(n))
        };
        (log, make)
    }

    #[test]
    fn test_tick_runs_only_current_batch() {
        let sched = Rc::new(ManualScheduler::new());
        let (log, make) = recorder();

        let s = sched.clone();
        let inner = make(2);
        sched.defer(make(1));
        sched.defer(Box::new(move || s.defer(inner)));

        assert_eq!(sched.tick(), 2);
        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(sched.pending(), 1);

        assert_eq!(sched.run_until_idle(), 1);
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let sched = ManualScheduler::new();
        let (log, make) = recorder();

        sched.start_timer(Duration::from_millis(30), make(3));
        sched.start_timer(Duration::from_millis(10), make(1));
        sched.start_timer(Duration::from_millis(20), make(2));

        sched.advance(Duration::from_millis(25));
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(sched.now(), Duration::from_millis(25));

        sched.run_all();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert!(sched.is_idle());
    }

    #[test]
    fn test_stopped_timer_never_fires() {
        let sched = ManualScheduler::new();
        let (log, make) = recorder();

        let id = sched.start_timer(Duration::from_millis(5), make(1));
        sched.stop_timer(id);
        sched.stop_timer(id);
        sched.run_all();

        assert!(log.borrow().is_empty());
        assert_eq!(sched.pending_timers(), 0);
    }

    #[test]
    fn test_spawned_task_resumes_on_later_tick() {
        let sched = ManualScheduler::new();
        let (mut tx, mut rx) = futures::channel::mpsc::channel::<u32>(4);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s = seen.clone();
        sched.spawn(Box::pin(async move {
            use futures::StreamExt;
            while let Some(n) = rx.next().await {
                s.borrow_mut().push(n);
            }
        }));
        assert!(seen.borrow().is_empty());

        tx.try_send(1).unwrap();
        sched.tick();
        assert_eq!(*seen.borrow(), vec![1]);

        tx.try_send(2).unwrap();
        sched.run_until_idle();
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }
}
