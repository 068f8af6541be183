//! # User-facing stream reference.
//!
//! A [`Stream`] is a cheap, cloneable reference to one node of the graph. It is
//! how callers build chains before the graph runs, and how they observe or
//! abort it afterwards.
//!
//! ## Build phase
//! ```text
//! let root = provider.create(exec, StreamType::Abortable);
//! root.attach(a)?          ─► new stream, runs after root closes cleanly
//!     .bind(b)?            ─► new stream, runs after a closes (aborted or not)
//!     .failure(f)?;        ─► recovery head for the whole sequence
//! root.retry_if(|e| .., Some(3))?.delay(Duration::from_millis(50))?;
//! ```
//! Continuation and branch operators return the stream they created or
//! captured; policy operators (`retry*`, `repeat*`, `delay`, `event`) return
//! the stream they were called on.
//!
//! ## Rules
//! - Every operator returns `Err(ChainError::Locked)` once the stream left
//!   `Initializing` (its free root started on the scheduler).
//! - A stream captures at most one continuation and is captured at most once.
//! - Holding a `Stream` keeps the engine alive, not the node: a finished
//!   stream is removed from the registry and reports its terminal state.

use std::fmt;
use std::ptr;
use std::rc::Rc;
use std::time::Duration;

use crate::core::chain::Target;
use crate::core::engine::Core;
use crate::core::node::{Captured, State, StreamId, StreamType};
use crate::core::registry::NodeRef;
use crate::error::{BranchKind, ChainError, ErrorKind, StreamError};
use crate::executables::Executable;
use crate::payload::Payload;
use crate::policies::{ConditionRetryer, KindRetryer, NameRetryer, RepeatFn, Repeater, Retryer};

/// Reference to one stream of a provider's graph.
#[derive(Clone)]
pub struct Stream {
    id: StreamId,
    node: NodeRef,
    core: Rc<Core>,
}

impl Stream {
    pub(crate) fn new(core: Rc<Core>, node: NodeRef) -> Self {
        let id = node.borrow().id;
        Self { id, node, core }
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    pub(crate) fn belongs_to(&self, core: &Core) -> bool {
        ptr::eq(Rc::as_ptr(&self.core), core)
    }

    fn wrap(&self, node: NodeRef) -> Stream {
        Stream::new(Rc::clone(&self.core), node)
    }

    /// Identity within the provider.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Atomic or abortable; fixed at creation.
    pub fn kind(&self) -> StreamType {
        self.node.borrow().kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        self.node.borrow().state
    }

    /// Returns `true` if the stream responds to abort requests.
    pub fn is_abortable(&self) -> bool {
        self.node.borrow().is_abortable()
    }

    /// Returns `true` once an abort was requested.
    pub fn is_aborted(&self) -> bool {
        self.state() == State::Aborted
    }

    /// Returns `true` unless the stream is running.
    pub fn is_inactive(&self) -> bool {
        self.state().is_inactive()
    }

    /// Captures a new abortable stream that runs after a clean close.
    pub fn attach(&self, executable: impl Executable) -> Result<Stream, ChainError> {
        let node = self.core.capture(
            &self.node,
            Target::New(Box::new(executable)),
            Captured::Attached,
            "attach",
        )?;
        Ok(self.wrap(node))
    }

    /// Captures an existing free stream that runs after a clean close.
    pub fn attach_stream(&self, stream: &Stream) -> Result<Stream, ChainError> {
        self.core
            .capture(&self.node, Target::Existing(stream), Captured::Attached, "attach")?;
        Ok(stream.clone())
    }

    /// Captures a new abortable stream that runs after any close.
    ///
    /// After an aborted close it is woken in the aborted state, so it can
    /// check [`Handle::is_aborted`](crate::Handle::is_aborted).
    pub fn bind(&self, executable: impl Executable) -> Result<Stream, ChainError> {
        let node = self.core.capture(
            &self.node,
            Target::New(Box::new(executable)),
            Captured::Bound,
            "bind",
        )?;
        Ok(self.wrap(node))
    }

    /// Captures an existing free stream that runs after any close.
    pub fn bind_stream(&self, stream: &Stream) -> Result<Stream, ChainError> {
        self.core
            .capture(&self.node, Target::Existing(stream), Captured::Bound, "bind")?;
        Ok(stream.clone())
    }

    /// Registers a new atomic stream woken with the error when the sequence
    /// fails without recovering.
    pub fn failure(&self, executable: impl Executable) -> Result<Stream, ChainError> {
        let node = self.core.register_branch(
            &self.node,
            Target::New(Box::new(executable)),
            BranchKind::Failure,
        )?;
        Ok(self.wrap(node))
    }

    /// Registers an existing free stream as the failure branch.
    pub fn failure_stream(&self, stream: &Stream) -> Result<Stream, ChainError> {
        self.core
            .register_branch(&self.node, Target::Existing(stream), BranchKind::Failure)?;
        Ok(stream.clone())
    }

    /// Registers a new atomic stream woken when the sequence closes after an
    /// abort and has no bound continuation.
    pub fn abortion(&self, executable: impl Executable) -> Result<Stream, ChainError> {
        let node = self.core.register_branch(
            &self.node,
            Target::New(Box::new(executable)),
            BranchKind::Abortion,
        )?;
        Ok(self.wrap(node))
    }

    /// Registers an existing free stream as the abortion branch.
    pub fn abortion_stream(&self, stream: &Stream) -> Result<Stream, ChainError> {
        self.core
            .register_branch(&self.node, Target::Existing(stream), BranchKind::Abortion)?;
        Ok(stream.clone())
    }

    /// Installs a retry policy, replacing any previous one.
    pub fn retry(&self, retryer: impl Retryer) -> Result<Stream, ChainError> {
        self.core.ensure_building(&self.node, "retry")?;
        self.node.borrow_mut().retryer = Some(Box::new(retryer));
        Ok(self.clone())
    }

    /// Retries while `condition` accepts the error, at most `max_trials`
    /// times (`None` retries forever).
    pub fn retry_if<F>(&self, condition: F, max_trials: Option<u32>) -> Result<Stream, ChainError>
    where
        F: FnMut(&StreamError) -> bool + 'static,
    {
        self.retry(ConditionRetryer::new(condition, max_trials))
    }

    /// Retries errors of the given kinds only.
    pub fn retry_on(
        &self,
        kinds: impl IntoIterator<Item = ErrorKind>,
        max_trials: Option<u32>,
    ) -> Result<Stream, ChainError> {
        self.retry(KindRetryer::new(kinds, max_trials))
    }

    /// Retries dynamically named errors with one of the given names only.
    pub fn retry_on_names<S: Into<String>>(
        &self,
        names: impl IntoIterator<Item = S>,
        max_trials: Option<u32>,
    ) -> Result<Stream, ChainError> {
        self.retry(NameRetryer::new(names, max_trials))
    }

    /// Installs a repeat policy, replacing any previous one.
    pub fn repeat(&self, repeater: impl Repeater) -> Result<Stream, ChainError> {
        self.core.ensure_building(&self.node, "repeat")?;
        self.node.borrow_mut().repeater = Some(Box::new(repeater));
        Ok(self.clone())
    }

    /// Runs again after each close while `f(aborted)` returns `true`.
    pub fn repeat_while<F>(&self, f: F) -> Result<Stream, ChainError>
    where
        F: FnMut(bool) -> bool + 'static,
    {
        self.repeat(RepeatFn::new(f))
    }

    /// Parks every wake (first run and resurrections) behind a timer.
    pub fn delay(&self, after: Duration) -> Result<Stream, ChainError> {
        self.core.ensure_building(&self.node, "delay")?;
        self.node.borrow_mut().delay = Some(after);
        Ok(self.clone())
    }

    /// Registers a listener for events the executable emits under `name`.
    ///
    /// Several listeners per name are allowed; they run in registration
    /// order. An empty name is ignored.
    pub fn event<F>(&self, name: &str, listener: F) -> Result<Stream, ChainError>
    where
        F: Fn(&Payload) + 'static,
    {
        self.core.ensure_building(&self.node, "event")?;
        if !name.is_empty() {
            self.node
                .borrow_mut()
                .listeners
                .entry(name.to_string())
                .or_default()
                .push(Rc::new(listener));
        }
        Ok(self.clone())
    }

    /// Requests cancellation.
    ///
    /// Ignored on streams that are not running or already aborted. Atomic
    /// streams only record the request; abortable ones also abort the
    /// streams they adopted, or close at once if parked behind a delay.
    pub fn abort(&self) {
        self.core.abort(self.id);
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.node.borrow();
        f.debug_struct("Stream")
            .field("id", &n.id)
            .field("kind", &n.kind)
            .field("state", &n.state)
            .field("captured", &n.captured)
            .field("caption", &n.caption)
            .finish()
    }
}
