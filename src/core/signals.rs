//! # Runtime signals: wake, close, fail, abort, die, eliminate.
//!
//! Once a free stream locks its graph, only these signals move nodes through
//! the state machine. Routing between streams is always queued on the
//! scheduler; a signal acting on its own node is synchronous.
//!
//! ## Routing
//! ```text
//! close(d)   ── repeat? ──► re-wake self (queued, last input)
//!     │
//!     ├─ not aborted ─► wake next(d) ─► die ─► eliminate branches nobody shares
//!     ├─ aborted + Bound   ─► wake next(d, ABORT) ─► die
//!     └─ aborted otherwise ─► wake abortion(d) ─► die ─► eliminate next + failure
//!
//! fail(e)    ── retry? ───► re-wake self (queued, last input)
//!     │
//!     └─► wake failure(Error(e)) ─► die ─► eliminate next + abortion
//!
//! delegators observe close/fail of the stream they delegated to (queued);
//! a delegated stream eliminated without an outcome fails its delegators.
//! ```
//!
//! ## Rules
//! - A run settles once: the first close/fail counts, later ones are ignored.
//! - Close/fail/abort on an inactive stream (not running) are no-ops.
//! - `die` never fails: terminal states absorb everything.
//! - Elimination is a forced teardown: eliminated streams never run recovery.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::core::handle::Handle;
use crate::core::node::{Captured, CaptionStatus, State, StreamId, WakeCondition};
use crate::core::stream::Stream;
use crate::core::engine::Core;
use crate::error::StreamError;
use crate::events::{Event, EventKind};
use crate::executables::Execution;
use crate::payload::Payload;

impl Core {
    /// Entry point of a free stream, queued by its creation.
    pub(crate) fn initialize(&self, id: StreamId) {
        let Some(node) = self.node(id) else { return };
        {
            let n = node.borrow();
            if n.caption != CaptionStatus::Free || n.state != State::Initializing {
                return;
            }
        }
        let locked = self.lock_graph(id);
        debug!(stream = %id, locked, "graph locked");
        self.emit(
            Event::new(EventKind::GraphLocked)
                .with_stream(id)
                .with_attempt(locked),
        );
        self.awake(id, Payload::Empty, WakeCondition::DEFAULT);
    }

    /// Ends the build phase of everything reachable from `root` through
    /// continuation and branch edges. Returns how many streams were locked.
    pub(crate) fn lock_graph(&self, root: StreamId) -> u32 {
        let mut stack = vec![root];
        let mut seen = HashSet::new();
        let mut locked = 0;
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            let mut n = node.borrow_mut();
            if n.state == State::Initializing {
                n.state = State::Awaiting;
                locked += 1;
            }
            stack.extend(n.next);
            stack.extend(n.branch_heads());
        }
        locked
    }

    pub(crate) fn awake(&self, id: StreamId, input: Payload, cond: WakeCondition) {
        let Some(node) = self.node(id) else { return };

        let state = node.borrow().state;
        if state.is_terminal() {
            return;
        }
        if state == State::Initializing {
            self.lock_graph(id);
        }

        let parked = {
            let mut n = node.borrow_mut();
            match n.delay.filter(|_| !cond.skip_delay) {
                Some(delay) => {
                    n.state = State::AwaitingDelay;
                    n.input = input.clone();
                    Some((delay, n.timer.take()))
                }
                _ => None,
            }
        };
        if let Some((delay, previous)) = parked {
            if let Some(t) = previous {
                self.stop_timer(t);
            }
            let timer = self.start_timer(delay, move |core| {
                core.awake(id, input, cond.without_delay())
            });
            node.borrow_mut().timer = Some(timer);
            debug!(stream = %id, ?delay, "wake delayed");
            self.emit(
                Event::new(EventKind::DelayScheduled)
                    .with_stream(id)
                    .with_delay(delay),
            );
            return;
        }

        let (executable, run, first_run) = {
            let mut n = node.borrow_mut();
            n.timer = None;
            if cond.aborted {
                n.state = State::Aborted;
            } else if n.state != State::Aborted {
                n.state = State::Active;
            }
            n.settled = false;
            n.input = input.clone();
            n.runs += 1;
            let first_run = !n.counted_active;
            n.counted_active = true;
            (n.executable.take(), n.runs, first_run)
        };
        if first_run {
            self.registry.activated();
        }
        debug!(stream = %id, run, aborted = cond.aborted, "stream activated");
        self.emit(
            Event::new(EventKind::StreamActivated)
                .with_stream(id)
                .with_attempt(run),
        );

        let Some(mut executable) = executable else {
            self.close(id, input);
            return;
        };

        let handle = Handle::new(self.weak(), id);
        let outcome = executable.execute(&handle, input);

        let leftover = {
            let mut n = node.borrow_mut();
            if n.state.is_terminal() || n.executable.is_some() {
                Some(executable)
            } else {
                n.executable = Some(executable);
                None
            }
        };
        drop(leftover);

        match outcome {
            Ok(Execution::Pending) => {}
            Ok(Execution::Delegate(child)) => self.delegate(id, child),
            Err(error) => {
                let cond = if node.borrow().state == State::Aborted {
                    WakeCondition::ABORT
                } else {
                    WakeCondition::DEFAULT
                };
                self.fail(id, error, cond);
            }
        }
    }

    /// Makes `id` observe the terminal outcome of `child`.
    fn delegate(&self, id: StreamId, child: Stream) {
        let problem = if child.id() == id {
            Some("stream delegated to itself")
        } else if !child.belongs_to(self) {
            Some("delegated stream belongs to another provider")
        } else if child.state().is_terminal() {
            Some("delegated stream already finished")
        } else {
            None
        };
        if let Some(problem) = problem {
            warn!(stream = %id, child = %child.id(), problem, "invalid delegation");
            self.fail(id, StreamError::logic(problem), WakeCondition::DEFAULT);
            return;
        }
        debug!(stream = %id, child = %child.id(), "delegating outcome");
        child.node().borrow_mut().delegators.push(id);
    }

    pub(crate) fn close(&self, id: StreamId, data: Payload) {
        let Some(node) = self.node(id) else { return };

        let (mut retryer, mut repeater, aborted) = {
            let mut n = node.borrow_mut();
            if n.state.is_inactive() || n.settled {
                return;
            }
            n.settled = true;
            (n.retryer.take(), n.repeater.take(), n.state == State::Aborted)
        };
        if let Some(r) = retryer.as_mut() {
            r.reset();
        }
        let repeat = repeater.as_mut().is_some_and(|r| r.evaluate(aborted));

        let (input, run, next, captured, failure, abortion, delegators) = {
            let mut n = node.borrow_mut();
            if !n.state.is_terminal() {
                n.retryer = n.retryer.take().or(retryer);
                n.repeater = n.repeater.take().or(repeater);
            }
            (
                n.input.clone(),
                n.runs,
                n.next,
                n.captured,
                n.failure.map(|b| b.head),
                n.abortion.map(|b| b.head),
                if repeat {
                    Vec::new()
                } else {
                    std::mem::take(&mut n.delegators)
                },
            )
        };

        if repeat {
            debug!(stream = %id, run, "repeat scheduled");
            self.emit(
                Event::new(EventKind::RepeatScheduled)
                    .with_stream(id)
                    .with_attempt(run),
            );
            let cond = if aborted {
                WakeCondition::ABORT
            } else {
                WakeCondition::DEFAULT
            };
            self.wake_later(id, input, cond);
            return;
        }

        debug!(stream = %id, run, aborted, "stream closed");
        let mut ev = Event::new(EventKind::StreamClosed)
            .with_stream(id)
            .with_attempt(run);
        if aborted {
            ev = ev.with_label("aborted");
        }
        self.emit(ev);

        if aborted && captured == Captured::Bound {
            // The bound continuation takes over the rest of the sequence.
            if let Some(next) = next {
                self.wake_later(next, data.clone(), WakeCondition::ABORT);
            }
            self.forward_close(&delegators, &data);
            self.die(id);
            self.release_branches(next, failure.into_iter().chain(abortion));
            return;
        }

        if aborted {
            if let Some(head) = abortion {
                self.wake_later(head, data.clone(), WakeCondition::DEFAULT);
            }
            self.forward_close(&delegators, &data);
            self.die(id);
            let unreachable: Vec<StreamId> = next.into_iter().chain(failure).collect();
            self.eliminate(&unreachable, &abortion.into_iter().collect::<Vec<_>>());
            return;
        }

        if let Some(next) = next {
            self.wake_later(next, data.clone(), WakeCondition::DEFAULT);
        }
        self.forward_close(&delegators, &data);
        self.die(id);
        self.release_branches(next, failure.into_iter().chain(abortion));
    }

    /// Eliminates the branch `heads` of a closed stream that `next` does not share.
    fn release_branches(&self, next: Option<StreamId>, heads: impl Iterator<Item = StreamId>) {
        let shared = next
            .and_then(|n| self.node(n))
            .map(|n| n.borrow().branch_heads())
            .unwrap_or_default();
        let orphaned: Vec<StreamId> = heads.filter(|h| !shared.contains(h)).collect();
        if !orphaned.is_empty() {
            self.eliminate(&orphaned, &[]);
        }
    }

    fn forward_close(&self, delegators: &[StreamId], data: &Payload) {
        for &d in delegators {
            let data = data.clone();
            self.defer(move |core| core.close(d, data));
        }
    }

    pub(crate) fn fail(&self, id: StreamId, error: StreamError, cond: WakeCondition) {
        let Some(node) = self.node(id) else { return };

        let mut retryer = {
            let mut n = node.borrow_mut();
            if n.state.is_inactive() || n.settled {
                return;
            }
            n.settled = true;
            n.retryer.take()
        };
        let retry = retryer.as_mut().is_some_and(|r| r.verify(&error));

        let (input, run, next, failure, abortion, delegators) = {
            let mut n = node.borrow_mut();
            if !n.state.is_terminal() {
                n.retryer = n.retryer.take().or(retryer);
            }
            (
                n.input.clone(),
                n.runs,
                n.next,
                n.failure.map(|b| b.head),
                n.abortion.map(|b| b.head),
                if retry {
                    Vec::new()
                } else {
                    std::mem::take(&mut n.delegators)
                },
            )
        };

        if retry {
            debug!(stream = %id, run, %error, "retry scheduled");
            self.emit(
                Event::new(EventKind::RetryScheduled)
                    .with_stream(id)
                    .with_attempt(run)
                    .with_reason(error.to_string()),
            );
            self.wake_later(id, input, cond);
            return;
        }

        debug!(stream = %id, run, %error, "stream failed");
        self.emit(
            Event::new(EventKind::StreamFailed)
                .with_stream(id)
                .with_attempt(run)
                .with_reason(error.to_string())
                .with_label(error.as_label()),
        );

        if let Some(head) = failure {
            self.wake_later(head, Payload::Error(error.clone()), WakeCondition::DEFAULT);
        }
        for &d in &delegators {
            let error = error.clone();
            self.defer(move |core| core.fail(d, error, WakeCondition::DEFAULT));
        }
        self.die(id);

        let unreachable: Vec<StreamId> = next.into_iter().chain(abortion).collect();
        self.eliminate(&unreachable, &failure.into_iter().collect::<Vec<_>>());
    }

    pub(crate) fn abort(&self, id: StreamId) {
        let Some(node) = self.node(id) else { return };

        let (parked, subordinates) = {
            let mut n = node.borrow_mut();
            if n.state.is_inactive() || n.state == State::Aborted {
                return;
            }
            let was_parked = n.state == State::AwaitingDelay;
            n.state = State::Aborted;
            if !n.is_abortable() {
                (None, Vec::new())
            } else if was_parked {
                n.settled = false;
                (Some((n.timer.take(), n.input.clone())), Vec::new())
            } else {
                (None, n.subordinates.clone())
            }
        };
        debug!(stream = %id, "stream aborted");
        self.emit(Event::new(EventKind::StreamAborted).with_stream(id));

        if let Some((timer, input)) = parked {
            if let Some(t) = timer {
                self.stop_timer(t);
            }
            self.close(id, input);
            return;
        }
        for sub in subordinates {
            self.abort(sub);
        }
    }

    pub(crate) fn die(&self, id: StreamId) {
        let Some(node) = self.node(id) else { return };

        let (terminal, counted, timer, leftovers, subordinates, stranded) = {
            let mut n = node.borrow_mut();
            let terminal = match n.state {
                State::Dead | State::Canceled => return,
                State::Initializing | State::Awaiting => State::Canceled,
                _ => State::Dead,
            };
            n.state = terminal;
            let counted = std::mem::replace(&mut n.counted_active, false);
            let leftovers = (
                n.executable.take(),
                n.retryer.take(),
                n.repeater.take(),
                std::mem::take(&mut n.listeners),
            );
            (
                terminal,
                counted,
                n.timer.take(),
                leftovers,
                std::mem::take(&mut n.subordinates),
                std::mem::take(&mut n.delegators),
            )
        };
        if let Some(t) = timer {
            self.stop_timer(t);
        }
        if counted {
            self.registry.finished();
        }
        drop(leftovers);

        let kind = if terminal == State::Dead {
            EventKind::StreamDead
        } else {
            EventKind::StreamCanceled
        };
        debug!(stream = %id, state = terminal.as_label(), "stream finished");
        self.emit(Event::new(kind).with_stream(id));

        // Eliminated before reporting an outcome: delegators would wait forever.
        for d in stranded {
            warn!(stream = %d, child = %id, "delegated stream ended without outcome");
            self.defer(move |core| {
                let error = StreamError::logic("delegated stream ended without outcome");
                core.fail(d, error, WakeCondition::DEFAULT)
            });
        }

        self.dispose(id);
        if !subordinates.is_empty() {
            self.eliminate(&subordinates, &[]);
        }
    }

    /// Removes the registry's reference on the next tick.
    fn dispose(&self, id: StreamId) {
        self.defer(move |core| {
            let removed = core.registry.remove(id);
            if removed.is_some() {
                debug!(stream = %id, "stream disposed");
                core.emit(Event::new(EventKind::StreamDisposed).with_stream(id));
            }
            drop(removed);
        });
    }

    /// Forced teardown of every stream reachable from `roots` through
    /// continuation and branch edges, skipping the `spare` heads.
    pub(crate) fn eliminate(&self, roots: &[StreamId], spare: &[StreamId]) {
        let mut stack = roots.to_vec();
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if spare.contains(&id) || !seen.insert(id) {
                continue;
            }
            let Some(node) = self.node(id) else { continue };
            {
                let n = node.borrow();
                stack.extend(n.next);
                stack.extend(n.branch_heads());
            }
            self.die(id);
        }
    }

    /// Invokes the listeners registered for `name`, in registration order.
    pub(crate) fn emit_event(&self, id: StreamId, name: &str, data: &Payload) {
        let Some(node) = self.node(id) else { return };
        let listeners = {
            let n = node.borrow();
            if n.state.is_terminal() {
                return;
            }
            n.listeners.get(name).cloned().unwrap_or_default()
        };
        for listener in listeners {
            (*listener)(data);
        }
    }

    /// Eliminates every registered stream.
    pub(crate) fn teardown(&self) {
        let ids = self.registry.ids();
        debug!(streams = ids.len(), "teardown");
        self.eliminate(&ids, &[]);
    }
}
