//! # flowvisor
//!
//! **Flowvisor** is a single-threaded control-flow engine for Rust.
//!
//! It lets you describe asynchronous work as a graph of *streams*: units of
//! work chained into sequences, with recovery branches for failure and
//! cancellation, retry and repeat policies, delays and named events. The
//! engine never blocks and never spawns threads; it queues every signal on a
//! [`Scheduler`] you supply.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Executable  │   │  Executable  │   │  Executable  │
//!     │  (root)      │   │  (attached)  │   │  (failure)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Provider (factory + registry)                                    │
//! │  - Registry (id → node, created/existing/active counters)         │
//! │  - Scheduler (defer, one-shot timers, spawned local tasks)        │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │    Stream    │──►│    Stream    │   │    Stream    │   │
//!     │   #1 root    │   │ #2 attached  │   │ #3 failure   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ Publishes:       │                  │                 │
//!      │ - StreamCreated  │ - StreamClosed   │ - StreamFailed  │
//!      │ - GraphLocked    │ - StreamDead     │ - RetryScheduled│
//!      ▼                  ▼                  ▼                 │
//! ┌─────────────────────────────────────────────────┐          │
//! │ Core::emit                                      │          │
//! └───────┬──────────────────────────────┬──────────┘          │
//!         ▼                              ▼                     │
//! ┌────────────────────┐      ┌──────────────────────┐         │
//! │ Bus (broadcast)    │      │ SubscriberSet        │         │
//! │ Provider::subscribe│      │ (bounded queues)     │         │
//! └────────────────────┘      └──────────┬───────────┘         │
//!                                        ▼                     │
//!                          delivery tasks spawned on the ◄─────┘
//!                          Scheduler ─► Subscribe::on_event
//! ```
//!
//! ### Lifecycle
//! ```text
//! Provider::create(exec) ─► Initializing  (attach / bind / failure / abortion / retry / ...)
//!        next tick ───────► graph locked: every reachable stream ─► Awaiting
//!        wake(input) ─────► [AwaitingDelay ─timer─►] Active ─► exec.execute(&handle, input)
//!                                                     │
//!        close(d) ─┬─ repeat?  ─► wake self again (later tick, same input)
//!                  ├─ clean    ─► wake next(d)          ─► Dead
//!                  └─ aborted  ─► bound next / abortion ─► Dead
//!        fail(e) ──┬─ retry?   ─► wake self again (later tick, same input)
//!                  └─ else     ─► wake failure(e)       ─► Dead
//!
//! Streams that can no longer be reached are eliminated (Canceled if they never ran).
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                         |
//! |-------------------|-----------------------------------------------------------------|--------------------------------------------|
//! | **Graph**         | Build chains and recovery branches, abort, observe state.       | [`Provider`], [`Stream`], [`Handle`]       |
//! | **Work**          | Units of work as trait objects or closures.                     | [`Executable`], [`MapFn`], [`ExecFn`]      |
//! | **Policies**      | Resurrect streams after failure or close.                       | [`Retryer`], [`Repeater`]                  |
//! | **Scheduling**    | Plug the engine into an event loop.                             | [`Scheduler`], [`LocalScheduler`]          |
//! | **Errors**        | Structural errors and classified domain failures.               | [`ChainError`], [`StreamError`]            |
//! | **Subscriber API**| Hook into stream lifecycle events.                              | [`Subscribe`], [`Event`]                   |
//! | **Configuration** | Branch registration policy, bus capacity.                       | [`ProviderConfig`]                         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use flowvisor::{
//!     ErrorKind, ExecFn, Execution, ManualScheduler, MapFn, Payload, Provider, StreamError,
//!     StreamType,
//! };
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let provider = Provider::new(scheduler.clone());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let mut attempts: i64 = 0;
//! let root = provider.create(
//!     ExecFn::new(move |h, _| {
//!         attempts += 1;
//!         if attempts < 3 {
//!             return Err(StreamError::runtime("flaky"));
//!         }
//!         h.close(Payload::from(attempts));
//!         Ok(Execution::Pending)
//!     }),
//!     StreamType::Abortable,
//! );
//! root.retry_on([ErrorKind::Runtime], Some(5)).unwrap();
//!
//! let sink = seen.clone();
//! root.attach(MapFn::new(move |p: Payload| {
//!     sink.borrow_mut().push(p.clone());
//!     Ok(p)
//! }))
//! .unwrap();
//!
//! scheduler.run_all();
//! assert_eq!(*seen.borrow(), vec![Payload::from(3i64)]);
//! ```

mod core;
mod error;
mod events;
mod executables;
mod payload;
mod policies;
mod scheduler;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    BranchPolicy, CaptionStatus, Captured, Handle, Provider, ProviderBuilder, ProviderConfig,
    State, Stream, StreamId, StreamType, WakeCondition,
};
pub use error::{BranchKind, ChainError, ErrorKind, StreamError};
pub use events::{Bus, Event, EventKind};
pub use executables::{DelegateFn, ExecFn, Executable, Execution, MapFn};
pub use payload::Payload;
pub use policies::{
    ConditionRetryer, KindRetryer, NameRetryer, RepeatFn, RepeatTimes, Repeater, Retryer,
    TrialBudget,
};
pub use scheduler::{Callback, LocalScheduler, LocalTask, ManualScheduler, Scheduler, TimerId};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
