//! Units of work run by streams.
//!
//! ## Contents
//! - [`Executable`] the trait every unit of work implements
//! - [`Execution`] what an executable reports when `execute` returns
//! - [`ExecFn`] closure with full [`Handle`](crate::Handle) access
//! - [`MapFn`] closure that maps its input to the close data
//! - [`DelegateFn`] closure that hands off to another stream
//!
//! ## Quick wiring
//! ```text
//! Provider::create(exec, type) ─► Stream ─► wake(input)
//!                                              └─► exec.execute(&handle, input)
//!                                                    ├─ Ok(Pending)         ─► outcome via handle (now or later)
//!                                                    ├─ Ok(Delegate(child)) ─► child's outcome becomes ours
//!                                                    └─ Err(e)              ─► fail(e)
//! ```

mod exec_fn;
mod executable;

pub use exec_fn::{DelegateFn, ExecFn, MapFn};
pub use executable::{Executable, Execution};
