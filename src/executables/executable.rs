//! # Core executable trait.
//!
//! An [`Executable`] is the unit of work a stream runs each time it is woken
//! (first run, retries and repetitions alike). The stream owns it for its whole
//! lifetime, so state kept in `self` survives resurrection.
//!
//! ## Contract
//! - `execute` runs synchronously on the scheduler thread and must not block.
//! - The outcome is reported through the [`Handle`]: `close`, `fail` and `event`
//!   may be called during `execute` or later (from a timer, another stream's
//!   listener, ...). Only the first close/fail of a run counts.
//! - Returning `Err(e)` is the same as calling `handle.fail(e)`.
//! - Returning [`Execution::Delegate`] hands the outcome over to another stream:
//!   its close/fail becomes this stream's close/fail.

use crate::core::{Handle, Stream};
use crate::error::StreamError;
use crate::payload::Payload;

/// What an executable reports when `execute` returns.
pub enum Execution {
    /// The outcome is (or will be) reported through the handle.
    Pending,
    /// The given stream's outcome becomes this stream's outcome.
    Delegate(Stream),
}

impl std::fmt::Debug for Execution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Execution::Pending => f.write_str("Pending"),
            Execution::Delegate(s) => write!(f, "Delegate({})", s.id()),
        }
    }
}

/// Unit of work owned by a stream.
///
/// # Example
/// ```rust
/// use flowvisor::{Executable, Execution, Handle, Payload, StreamError};
///
/// struct Counter {
///     runs: u32,
/// }
///
/// impl Executable for Counter {
///     fn execute(&mut self, handle: &Handle, _input: Payload) -> Result<Execution, StreamError> {
///         self.runs += 1;
///         handle.close(Payload::from(i64::from(self.runs)));
///         Ok(Execution::Pending)
///     }
/// }
/// ```
pub trait Executable: 'static {
    /// Runs one unit of work with the stream's current input.
    fn execute(&mut self, handle: &Handle, input: Payload) -> Result<Execution, StreamError>;
}

impl<E: Executable + ?Sized> Executable for Box<E> {
    fn execute(&mut self, handle: &Handle, input: Payload) -> Result<Execution, StreamError> {
        (**self).execute(handle, input)
    }
}
