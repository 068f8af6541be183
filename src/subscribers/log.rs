//! # Logging subscriber for debugging and demos.
//!
//! [`LogWriter`] renders stream lifecycle events through `tracing`.
//!
//! ## Output format
//! ```text
//! [created] stream=#1 type=abortable
//! [activated] stream=#1 run=1
//! [retry] stream=#1 run=1 err="runtime: connection reset"
//! [failed] stream=#1 run=3 kind=runtime err="runtime: connection reset"
//! [closed] stream=#2 run=1
//! [dead] stream=#2
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Tracing-backed logging subscriber.
///
/// Enabled via the `logging` feature. Not intended as a metrics pipeline:
/// implement a custom [`Subscribe`] for that.
pub struct LogWriter;

fn id(e: &Event) -> String {
    e.stream.map(|s| s.to_string()).unwrap_or_else(|| "-".into())
}

#[async_trait(?Send)]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::StreamCreated => {
                debug!("[created] stream={} type={}", id(e), e.label.unwrap_or("?"));
            }
            EventKind::GraphLocked => {
                debug!("[locked] stream={} streams={:?}", id(e), e.attempt);
            }
            EventKind::StreamActivated => {
                info!("[activated] stream={} run={:?}", id(e), e.attempt);
            }
            EventKind::DelayScheduled => {
                info!("[delay] stream={} delay_ms={:?}", id(e), e.delay_ms);
            }
            EventKind::StreamClosed => {
                info!("[closed] stream={} run={:?} {}", id(e), e.attempt, e.label.unwrap_or(""));
            }
            EventKind::StreamFailed => {
                warn!(
                    "[failed] stream={} run={:?} kind={:?} err={:?}",
                    id(e),
                    e.attempt,
                    e.label,
                    e.reason
                );
            }
            EventKind::RetryScheduled => {
                info!("[retry] stream={} run={:?} err={:?}", id(e), e.attempt, e.reason);
            }
            EventKind::RepeatScheduled => {
                info!("[repeat] stream={} run={:?}", id(e), e.attempt);
            }
            EventKind::StreamAborted => {
                info!("[aborted] stream={}", id(e));
            }
            EventKind::StreamDead => {
                debug!("[dead] stream={}", id(e));
            }
            EventKind::StreamCanceled => {
                debug!("[canceled] stream={}", id(e));
            }
            EventKind::StreamDisposed => {
                debug!("[disposed] stream={}", id(e));
            }
            EventKind::BranchOverridden => {
                warn!(
                    "[branch-overridden] stream={} branch={:?} old={:?}",
                    id(e),
                    e.label,
                    e.reason
                );
            }
            EventKind::SubscriberPanicked | EventKind::SubscriberOverflow => {
                warn!("[subscriber] name={:?} reason={:?}", e.subscriber, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
