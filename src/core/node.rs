//! # Stream node: identity, classification and per-node state.
//!
//! A [`StreamNode`] is the registry-owned record behind every [`Stream`](crate::Stream).
//! All graph edges (`prev`, `next`, branches, parent, subordinates, delegators)
//! are plain [`StreamId`]s; the registry is the only owner of nodes.
//!
//! ## State machine
//! ```text
//! Initializing ──lock──► Awaiting ──wake──► Active ◄──timer── AwaitingDelay
//!      │                    │                 │  ▲                ▲
//!      │                    └──wake (delay)───┼──┼────────────────┘
//!      │                                      │  └─ retry / repeat (queued)
//!      └──eliminate──► Canceled ◄─eliminate───┤
//!                                             ├─abort──► Aborted
//!                                             ▼             │
//!                                           Dead ◄──────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::core::registry::Lease;
use crate::error::BranchKind;
use crate::executables::Executable;
use crate::payload::Payload;
use crate::policies::{Repeater, Retryer};
use crate::scheduler::TimerId;

/// Stable identity of a stream within its provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(u64);

impl StreamId {
    /// Builds an id from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a stream responds to cancellation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Runs to completion; abort only marks it as aborted.
    Atomic,
    /// Abort stops pending delays and cascades to adopted streams.
    Abortable,
}

/// Lifecycle state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Newly created; chain-building operators are legal.
    Initializing,
    /// Graph locked, waiting to be woken.
    Awaiting,
    /// Woken but parked behind the delay timer.
    AwaitingDelay,
    /// Executable ran (or is running) and the outcome is pending.
    Active,
    /// Abort requested; the outcome is routed to recovery.
    Aborted,
    /// Terminal; eliminated before it ever ran.
    Canceled,
    /// Terminal; finished after running.
    Dead,
}

impl State {
    /// `Dead` and `Canceled` are terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Dead | State::Canceled)
    }

    /// True unless the stream is currently running (`Active`, `AwaitingDelay`, `Aborted`).
    pub fn is_inactive(&self) -> bool {
        !matches!(self, State::Active | State::AwaitingDelay | State::Aborted)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            State::Initializing => "initializing",
            State::Awaiting => "awaiting",
            State::AwaitingDelay => "awaiting_delay",
            State::Active => "active",
            State::Aborted => "aborted",
            State::Canceled => "canceled",
            State::Dead => "dead",
        }
    }
}

/// How this stream captured its continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Captured {
    /// No continuation.
    None,
    /// Continuation runs only after a clean close.
    Attached,
    /// Continuation runs after any close, aborted or not.
    Bound,
}

/// How this stream was captured by an upstream node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionStatus {
    /// Not captured: the stream starts itself on the next tick. Streams
    /// created by `adopt(None)` stay free so they run on their own.
    Free,
    /// Captured as an attached continuation.
    Attached,
    /// Captured as a bound continuation or as a failure/abortion branch head.
    Bound,
}

/// Metadata accompanying a wake signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WakeCondition {
    /// The wake continues an aborted predecessor.
    pub aborted: bool,
    /// The configured delay has already been served.
    pub skip_delay: bool,
}

impl WakeCondition {
    /// Normal continuation.
    pub const DEFAULT: Self = Self {
        aborted: false,
        skip_delay: false,
    };

    /// Continuation of an aborted predecessor.
    pub const ABORT: Self = Self {
        aborted: true,
        skip_delay: false,
    };

    /// Same condition with the delay marked as served.
    pub fn without_delay(self) -> Self {
        Self {
            skip_delay: true,
            ..self
        }
    }
}

/// Link to the head of a recovery branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Branch {
    pub(crate) head: StreamId,
    /// Received by propagation rather than registered on this node.
    pub(crate) inherited: bool,
}

/// Event listener registered through [`Stream::event`](crate::Stream::event).
pub(crate) type Listener = Rc<dyn Fn(&Payload)>;

/// Registry-owned record of one stream.
pub(crate) struct StreamNode {
    pub(crate) id: StreamId,
    pub(crate) kind: StreamType,
    pub(crate) state: State,
    pub(crate) captured: Captured,
    pub(crate) caption: CaptionStatus,

    pub(crate) prev: Option<StreamId>,
    pub(crate) next: Option<StreamId>,
    pub(crate) failure: Option<Branch>,
    pub(crate) abortion: Option<Branch>,
    pub(crate) parent: Option<StreamId>,
    pub(crate) subordinates: Vec<StreamId>,
    /// Streams whose executable returned this stream and await its outcome.
    pub(crate) delegators: Vec<StreamId>,

    pub(crate) executable: Option<Box<dyn Executable>>,
    pub(crate) retryer: Option<Box<dyn Retryer>>,
    pub(crate) repeater: Option<Box<dyn Repeater>>,
    pub(crate) listeners: HashMap<String, Vec<Listener>>,
    pub(crate) delay: Option<Duration>,
    pub(crate) timer: Option<TimerId>,

    /// Input of the latest wake; reused on resurrection.
    pub(crate) input: Payload,
    /// The current run already produced its outcome.
    pub(crate) settled: bool,
    /// Counted in the provider's active total.
    pub(crate) counted_active: bool,
    pub(crate) runs: u32,

    _lease: Lease,
}

impl StreamNode {
    pub(crate) fn new(
        id: StreamId,
        executable: Option<Box<dyn Executable>>,
        kind: StreamType,
        caption: CaptionStatus,
        lease: Lease,
    ) -> Self {
        Self {
            id,
            kind,
            state: State::Initializing,
            captured: Captured::None,
            caption,
            prev: None,
            next: None,
            failure: None,
            abortion: None,
            parent: None,
            subordinates: Vec::new(),
            delegators: Vec::new(),
            executable,
            retryer: None,
            repeater: None,
            listeners: HashMap::new(),
            delay: None,
            timer: None,
            input: Payload::Empty,
            settled: false,
            counted_active: false,
            runs: 0,
            _lease: lease,
        }
    }

    pub(crate) fn is_abortable(&self) -> bool {
        self.kind == StreamType::Abortable
    }

    pub(crate) fn branch(&self, kind: BranchKind) -> Option<Branch> {
        match kind {
            BranchKind::Failure => self.failure,
            BranchKind::Abortion => self.abortion,
        }
    }

    pub(crate) fn branch_mut(&mut self, kind: BranchKind) -> &mut Option<Branch> {
        match kind {
            BranchKind::Failure => &mut self.failure,
            BranchKind::Abortion => &mut self.abortion,
        }
    }

    /// Heads of both recovery branches.
    pub(crate) fn branch_heads(&self) -> Vec<StreamId> {
        self.failure
            .iter()
            .chain(self.abortion.iter())
            .map(|b| b.head)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(State::Dead.is_terminal());
        assert!(State::Canceled.is_terminal());
        assert!(!State::Aborted.is_terminal());

        assert!(State::Initializing.is_inactive());
        assert!(State::Awaiting.is_inactive());
        assert!(!State::AwaitingDelay.is_inactive());
        assert!(!State::Aborted.is_inactive());
        assert!(State::Dead.is_inactive());
    }

    #[test]
    fn test_wake_condition_without_delay_keeps_abort_flag() {
        let cond = WakeCondition::ABORT.without_delay();
        assert!(cond.aborted);
        assert!(cond.skip_delay);
        assert_eq!(WakeCondition::default(), WakeCondition::DEFAULT);
    }
}
