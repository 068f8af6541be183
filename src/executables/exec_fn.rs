//! # Closure-backed executables.
//!
//! Three adapters cover the common shapes of a unit of work:
//!
//! | Adapter        | Closure                                              | Outcome                          |
//! |----------------|------------------------------------------------------|----------------------------------|
//! | [`ExecFn`]     | `FnMut(&Handle, Payload) -> Result<Execution, _>`    | whatever the closure signals     |
//! | [`MapFn`]      | `FnMut(Payload) -> Result<Payload, _>`               | closes with the returned payload |
//! | [`DelegateFn`] | `FnMut(Payload) -> Result<Option<Stream>, _>`        | delegates, or closes with input  |
//!
//! The bounds live on the constructors so closure parameter types are inferred.
//!
//! ## Example
//! ```rust
//! use flowvisor::{ExecFn, Execution, MapFn, Payload, StreamError};
//!
//! let double = MapFn::new(|p: Payload| {
//!     let n = p.as_i64().ok_or_else(|| StreamError::invalid_argument("not a number"))?;
//!     Ok(Payload::from(n * 2))
//! });
//!
//! let hello = ExecFn::new(|h, _input| {
//!     h.event("greeting", Payload::from("hello"));
//!     h.close(Payload::Empty);
//!     Ok(Execution::Pending)
//! });
//! # let _ = (double, hello);
//! ```

use crate::core::{Handle, Stream};
use crate::error::StreamError;
use crate::executables::{Executable, Execution};
use crate::payload::Payload;

/// Executable backed by a closure with full handle access.
pub struct ExecFn<F> {
    f: F,
}

impl<F> ExecFn<F>
where
    F: FnMut(&Handle, Payload) -> Result<Execution, StreamError> + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Executable for ExecFn<F>
where
    F: FnMut(&Handle, Payload) -> Result<Execution, StreamError> + 'static,
{
    fn execute(&mut self, handle: &Handle, input: Payload) -> Result<Execution, StreamError> {
        (self.f)(handle, input)
    }
}

/// Executable that closes with the closure's result.
pub struct MapFn<F> {
    f: F,
}

impl<F> MapFn<F>
where
    F: FnMut(Payload) -> Result<Payload, StreamError> + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Executable for MapFn<F>
where
    F: FnMut(Payload) -> Result<Payload, StreamError> + 'static,
{
    fn execute(&mut self, handle: &Handle, input: Payload) -> Result<Execution, StreamError> {
        let out = (self.f)(input)?;
        handle.close(out);
        Ok(Execution::Pending)
    }
}

/// Executable that hands its outcome to a stream built by the closure.
///
/// `Ok(None)` closes immediately with the input passed through.
pub struct DelegateFn<F> {
    f: F,
}

impl<F> DelegateFn<F>
where
    F: FnMut(Payload) -> Result<Option<Stream>, StreamError> + 'static,
{
    /// Wraps the closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Executable for DelegateFn<F>
where
    F: FnMut(Payload) -> Result<Option<Stream>, StreamError> + 'static,
{
    fn execute(&mut self, handle: &Handle, input: Payload) -> Result<Execution, StreamError> {
        match (self.f)(input.clone())? {
            Some(child) => Ok(Execution::Delegate(child)),
            None => {
                handle.close(input);
                Ok(Execution::Pending)
            }
        }
    }
}
