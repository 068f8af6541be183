//! Error types used by the flowvisor runtime and by executables.
//!
//! This module defines two error families:
//!
//! - [`ChainError`]: structural errors raised by chain-building operators when
//!   the caller wires the graph illegally (double capture, self capture, use after
//!   the graph was locked, ...). These are programmer errors and are returned at
//!   the call site; they never enter the graph.
//! - [`StreamError`]: domain failures produced by an executable. These are routed
//!   through the graph: offered to the retryer, then to the failure branch.
//!
//! Both types provide `as_label` for logging/metrics.

use std::fmt;

use thiserror::Error;

use crate::core::StreamId;

/// Which recovery branch an operator was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchKind {
    /// Branch woken when the sequence fails uncaught.
    Failure,
    /// Branch woken when the sequence closes after being aborted.
    Abortion,
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Failure => f.write_str("failure"),
            BranchKind::Abortion => f.write_str("abortion"),
        }
    }
}

/// # Structural errors produced by chain-building operators.
///
/// Every variant indicates a bug in the code that assembles the graph, not a
/// runtime condition, so none of them is recoverable by the graph itself.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// An operator was used after the stream's graph was released for execution.
    #[error("`{op}` used on stream {stream} after its graph was locked")]
    Locked {
        /// Operator name.
        op: &'static str,
        /// Stream the operator was called on.
        stream: StreamId,
    },

    /// The stream already captured a continuation (no sequence splitting).
    #[error("stream {stream} already captures stream {captured}")]
    AlreadyCaptured {
        /// Stream the operator was called on.
        stream: StreamId,
        /// Continuation captured earlier.
        captured: StreamId,
    },

    /// The stream was asked to capture or adopt itself.
    #[error("stream {stream} cannot capture itself")]
    SelfCapture {
        /// Stream the operator was called on.
        stream: StreamId,
    },

    /// The target stream was already captured by another stream.
    #[error("stream {target} is not free and cannot be captured")]
    NotFree {
        /// Stream that was passed as target.
        target: StreamId,
    },

    /// The target stream already left the build phase.
    #[error("stream {target} was already released for execution")]
    TargetLocked {
        /// Stream that was passed as target.
        target: StreamId,
    },

    /// The stream already registered its own recovery branch of this kind.
    #[error("stream {stream} already registered a {branch} branch")]
    BranchAlreadyRegistered {
        /// Stream the operator was called on.
        stream: StreamId,
        /// Kind of branch.
        branch: BranchKind,
    },

    /// The branch head is a member of the sequence it is supposed to recover.
    #[error("stream {target} is a member of the sequence its {branch} branch would recover")]
    BranchIsMember {
        /// Stream that was passed as branch head.
        target: StreamId,
        /// Kind of branch.
        branch: BranchKind,
    },

    /// Capturing the target would make the sequence loop back on itself.
    #[error("stream {target} already precedes stream {stream} in its sequence")]
    Cycle {
        /// Stream the operator was called on.
        stream: StreamId,
        /// Stream that was passed as target.
        target: StreamId,
    },

    /// The target stream was created by a different provider.
    #[error("stream {target} belongs to another provider")]
    ForeignStream {
        /// Stream that was passed as target.
        target: StreamId,
    },

    /// The provider owning the stream no longer exists.
    #[error("stream {stream} outlived its provider")]
    Detached {
        /// Stream the operation was attempted on.
        stream: StreamId,
    },
}

impl ChainError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use flowvisor::{ChainError, StreamId};
    ///
    /// let err = ChainError::SelfCapture { stream: StreamId::from_raw(7) };
    /// assert_eq!(err.as_label(), "chain_self_capture");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ChainError::Locked { .. } => "chain_locked",
            ChainError::AlreadyCaptured { .. } => "chain_already_captured",
            ChainError::SelfCapture { .. } => "chain_self_capture",
            ChainError::NotFree { .. } => "chain_not_free",
            ChainError::TargetLocked { .. } => "chain_target_locked",
            ChainError::BranchAlreadyRegistered { .. } => "chain_branch_registered",
            ChainError::BranchIsMember { .. } => "chain_branch_is_member",
            ChainError::Cycle { .. } => "chain_cycle",
            ChainError::ForeignStream { .. } => "chain_foreign_stream",
            ChainError::Detached { .. } => "chain_detached",
        }
    }
}

/// Classification of a [`StreamError`].
///
/// Retry-by-kind policies match on this tag.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unclassified failure.
    Generic,
    /// Violated precondition or broken invariant in the calling code.
    Logic,
    /// An argument was rejected.
    InvalidArgument,
    /// Input outside the domain of an operation.
    Domain,
    /// A length limit was exceeded.
    Length,
    /// An index or key was out of range.
    OutOfRange,
    /// Failure only detectable while running (I/O, remote peers, ...).
    Runtime,
    /// A computed result was outside its representable range.
    Range,
    /// Arithmetic overflow.
    Overflow,
    /// Arithmetic underflow.
    Underflow,
    /// Operating system or I/O error.
    System,
    /// Dynamically named error raised by an embedding script layer.
    Script,
}

impl ErrorKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Generic => "generic",
            ErrorKind::Logic => "logic",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Domain => "domain",
            ErrorKind::Length => "length",
            ErrorKind::OutOfRange => "out_of_range",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Range => "range",
            ErrorKind::Overflow => "overflow",
            ErrorKind::Underflow => "underflow",
            ErrorKind::System => "system",
            ErrorKind::Script => "script",
        }
    }

    /// Returns `true` if the kind belongs to the logic-error family
    /// (`Logic`, `InvalidArgument`, `Domain`, `Length`, `OutOfRange`).
    pub fn is_logic(&self) -> bool {
        matches!(
            self,
            ErrorKind::Logic
                | ErrorKind::InvalidArgument
                | ErrorKind::Domain
                | ErrorKind::Length
                | ErrorKind::OutOfRange
        )
    }

    /// Returns `true` if the kind belongs to the runtime-error family
    /// (`Runtime`, `Range`, `Overflow`, `Underflow`, `System`).
    pub fn is_runtime(&self) -> bool {
        matches!(
            self,
            ErrorKind::Runtime
                | ErrorKind::Range
                | ErrorKind::Overflow
                | ErrorKind::Underflow
                | ErrorKind::System
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # Domain failure produced by an executable.
///
/// Carries a classification ([`ErrorKind`]), a human-readable message and,
/// for dynamically named errors, a name plus optional structured data.
///
/// # Example
/// ```
/// use flowvisor::{ErrorKind, StreamError};
///
/// let err = StreamError::runtime("connection reset");
/// assert!(err.is(ErrorKind::Runtime));
/// assert_eq!(err.message(), "connection reset");
///
/// let named = StreamError::script("QuotaExceeded", "too many uploads", None);
/// assert_eq!(named.name(), Some("QuotaExceeded"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct StreamError {
    kind: ErrorKind,
    message: String,
    name: Option<String>,
    data: Option<serde_json::Value>,
}

impl StreamError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            name: None,
            data: None,
        }
    }

    /// Shorthand for [`ErrorKind::Logic`].
    pub fn logic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Logic, message)
    }

    /// Shorthand for [`ErrorKind::Runtime`].
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Runtime, message)
    }

    /// Shorthand for [`ErrorKind::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates a dynamically named error ([`ErrorKind::Script`]).
    pub fn script(
        name: impl Into<String>,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            kind: ErrorKind::Script,
            message: message.into(),
            name: Some(name.into()),
            data,
        }
    }

    /// Returns the classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if the error is classified as `kind`.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the name of a dynamically named error.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the structured data attached to a dynamically named error.
    pub fn data(&self) -> Option<&serde_json::Value> {
        self.data.as_ref()
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        self.kind.as_label()
    }
}

impl From<&str> for StreamError {
    fn from(message: &str) -> Self {
        StreamError::new(ErrorKind::Generic, message)
    }
}

impl From<String> for StreamError {
    fn from(message: String) -> Self {
        StreamError::new(ErrorKind::Generic, message)
    }
}

/// Structural errors raised inside an executable (e.g. a failed `adopt`)
/// become logic failures of the running stream.
impl From<ChainError> for StreamError {
    fn from(err: ChainError) -> Self {
        StreamError::new(ErrorKind::Logic, err.to_string())
    }
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::new(ErrorKind::System, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families() {
        assert!(ErrorKind::OutOfRange.is_logic());
        assert!(!ErrorKind::OutOfRange.is_runtime());
        assert!(ErrorKind::Overflow.is_runtime());
        assert!(!ErrorKind::Script.is_logic());
        assert!(!ErrorKind::Generic.is_runtime());
    }

    #[test]
    fn test_display_and_labels() {
        let err = StreamError::logic("first error");
        assert_eq!(err.to_string(), "logic: first error");
        assert_eq!(err.as_label(), "logic");

        let err = ChainError::Locked {
            op: "attach",
            stream: StreamId::from_raw(3),
        };
        assert_eq!(err.as_label(), "chain_locked");
        assert!(err.to_string().contains("attach"));
    }

    #[test]
    fn test_conversions() {
        let err: StreamError = "boom".into();
        assert!(err.is(ErrorKind::Generic));

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: StreamError = io.into();
        assert!(err.is(ErrorKind::System));
        assert_eq!(err.message(), "disk gone");

        let err: StreamError = ChainError::Detached {
            stream: StreamId::from_raw(1),
        }
        .into();
        assert!(err.kind().is_logic());
    }

    #[test]
    fn test_script_error_keeps_name_and_data() {
        let err = StreamError::script("Timeout", "took too long", Some(serde_json::json!(5)));
        assert!(err.is(ErrorKind::Script));
        assert_eq!(err.name(), Some("Timeout"));
        assert_eq!(err.data(), Some(&serde_json::json!(5)));
    }
}
