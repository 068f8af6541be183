//! # Lifecycle events emitted by the stream engine.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Graph events**: a stream was created or its graph locked for execution
//! - **Run events**: activation, delay, close, failure, resurrection, abort
//! - **Terminal events**: dead/canceled, then disposed from the registry
//!
//! Subscriber delivery adds `SubscriberPanicked` / `SubscriberOverflow`.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use flowvisor::{Event, EventKind, StreamId};
//!
//! let ev = Event::new(EventKind::RetryScheduled)
//!     .with_stream(StreamId::from_raw(4))
//!     .with_reason("runtime: connection reset")
//!     .with_attempt(2);
//!
//! assert_eq!(ev.kind, EventKind::RetryScheduled);
//! assert_eq!(ev.stream, Some(StreamId::from_raw(4)));
//! assert_eq!(ev.attempt, Some(2));
//!
//! let delayed = Event::new(EventKind::DelayScheduled).with_delay(Duration::from_millis(250));
//! assert_eq!(delayed.delay_ms, Some(250));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::StreamId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or delivery task gone).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Graph events ===
    /// Stream registered by the provider.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `label`: stream type (`atomic` / `abortable`)
    StreamCreated,

    /// A free stream locked its graph and is about to run.
    ///
    /// Sets:
    /// - `stream`: root stream id
    /// - `attempt`: number of streams locked
    GraphLocked,

    /// Failure/abortion branch replaced under `BranchPolicy::Override`.
    ///
    /// Sets:
    /// - `stream`: stream the branch was registered on
    /// - `label`: branch kind (`failure` / `abortion`)
    /// - `reason`: replaced branch head
    BranchOverridden,

    // === Run events ===
    /// Executable is about to run.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: run number (1-based, counts retries and repetitions)
    StreamActivated,

    /// Wake parked behind the stream's delay timer.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `delay_ms`: configured delay (ms)
    DelayScheduled,

    /// Stream closed (before routing to continuation/branches).
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: run number
    /// - `label`: `aborted` when the stream had been aborted
    StreamClosed,

    /// Stream failed for good (retry policy absent or exhausted).
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: run number
    /// - `reason`: error message
    /// - `label`: error kind label
    StreamFailed,

    /// Failure accepted by the retry policy; resurrection queued.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: run number that failed
    /// - `reason`: error message
    RetryScheduled,

    /// Close accepted by the repeat policy; resurrection queued.
    ///
    /// Sets:
    /// - `stream`: stream id
    /// - `attempt`: run number that closed
    RepeatScheduled,

    /// Abort requested on a running stream.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamAborted,

    // === Terminal events ===
    /// Stream finished after running.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamDead,

    /// Stream eliminated before it ever ran.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamCanceled,

    /// Stream removed from the provider's registry.
    ///
    /// Sets:
    /// - `stream`: stream id
    StreamDisposed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Stream the event is about.
    pub stream: Option<StreamId>,
    /// Run number or count, depending on the kind.
    pub attempt: Option<u32>,
    /// Delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Short stable label (error kind, branch kind, stream type).
    pub label: Option<&'static str>,
    /// Subscriber name, for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            stream: None,
            attempt: None,
            delay_ms: None,
            reason: None,
            label: None,
            subscriber: None,
        }
    }

    /// Attaches the stream id.
    #[inline]
    pub fn with_stream(mut self, id: StreamId) -> Self {
        self.stream = Some(id);
        self
    }

    /// Attaches a run number (or count).
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a stable label.
    #[inline]
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = Some(label);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }

    /// Returns `true` for `StreamDead` and `StreamCanceled`.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::StreamDead | EventKind::StreamCanceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::StreamCreated);
        let b = Event::new(EventKind::StreamCreated);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_is_clamped_to_u32() {
        let ev = Event::new(EventKind::DelayScheduled).with_delay(Duration::from_secs(u64::MAX / 2));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.subscriber, Some("audit"));
        assert!(!ev.is_terminal());
    }
}
