//! # Capability handed to an executable.
//!
//! A [`Handle`] lets the running unit of work report its outcome
//! (`close`/`fail`), publish named events and spawn subordinate streams
//! (`adopt`). It cannot touch chain structure.
//!
//! The handle only holds a weak reference to the engine: it may be cloned
//! into callbacks that fire on later ticks and becomes inert once the
//! provider is gone.
//!
//! ## Rules
//! - Only the first `close`/`fail` of a run counts.
//! - Calls on a stream that is not running are ignored.

use std::fmt;
use std::rc::Weak;

use crate::core::engine::Core;
use crate::core::node::{State, StreamId, StreamType, WakeCondition};
use crate::core::stream::Stream;
use crate::error::{ChainError, StreamError};
use crate::payload::Payload;

/// Outcome channel of one stream.
#[derive(Clone)]
pub struct Handle {
    core: Weak<Core>,
    id: StreamId,
}

impl Handle {
    pub(crate) fn new(core: Weak<Core>, id: StreamId) -> Self {
        Self { core, id }
    }

    /// Identity of the stream this handle reports for.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Invokes the listeners registered for `name`, synchronously.
    pub fn event(&self, name: &str, data: impl Into<Payload>) {
        if let Some(core) = self.core.upgrade() {
            core.emit_event(self.id, name, &data.into());
        }
    }

    /// Finishes the current run successfully.
    pub fn close(&self, data: impl Into<Payload>) {
        if let Some(core) = self.core.upgrade() {
            core.close(self.id, data.into());
        }
    }

    /// Finishes the current run with a domain failure.
    pub fn fail(&self, error: impl Into<StreamError>) {
        if let Some(core) = self.core.upgrade() {
            let cond = if self.is_aborted() {
                WakeCondition::ABORT
            } else {
                WakeCondition::DEFAULT
            };
            core.fail(self.id, error.into(), cond);
        }
    }

    /// Makes this stream the cancellation parent of `child`, or of a new
    /// empty atomic stream when `child` is `None`.
    ///
    /// Adopted streams are aborted when this stream is aborted and
    /// eliminated when it dies.
    pub fn adopt(&self, child: Option<&Stream>) -> Result<Stream, ChainError> {
        let core = self
            .core
            .upgrade()
            .ok_or(ChainError::Detached { stream: self.id })?;
        core.adopt(self.id, child)
    }

    /// Returns `true` if the stream responds to abort requests.
    pub fn is_abortable(&self) -> bool {
        self.with_node(|kind, _| kind == StreamType::Abortable)
    }

    /// Returns `true` once an abort was requested.
    pub fn is_aborted(&self) -> bool {
        self.with_node(|_, state| state == State::Aborted)
    }

    fn with_node(&self, f: impl FnOnce(StreamType, State) -> bool) -> bool {
        let Some(core) = self.core.upgrade() else {
            return false;
        };
        let Some(node) = core.node(self.id) else {
            return false;
        };
        let n = node.borrow();
        f(n.kind, n.state)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("attached", &(self.core.strong_count() > 0))
            .finish()
    }
}
