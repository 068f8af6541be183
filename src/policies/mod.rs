//! Resurrection policies.
//!
//! This module groups the knobs that decide **whether** a stream that already
//! produced an outcome runs again instead of finishing.
//!
//! ## Contents
//! - [`Retryer`] consulted on failure (`verify`), reset on successful close
//! - [`TrialBudget`] shared trial counter (`None` = infinite)
//! - [`ConditionRetryer`], [`KindRetryer`], [`NameRetryer`] built-in retryers
//! - [`Repeater`] consulted on close (`evaluate(aborted)`)
//! - [`RepeatFn`], [`RepeatTimes`] built-in repeaters
//!
//! ## Quick wiring
//! ```text
//! fail(e) ──► retryer.verify(&e)
//!               ├─ true  ─► re-wake later with the same input
//!               └─ false ─► failure branch
//!
//! close(d) ─► retryer.reset(); repeater.evaluate(aborted)
//!               ├─ true  ─► re-wake later with the same input
//!               └─ false ─► continuation / abortion branch
//! ```

mod repeat;
mod retry;

pub use repeat::{RepeatFn, RepeatTimes, Repeater};
pub use retry::{ConditionRetryer, KindRetryer, NameRetryer, Retryer, TrialBudget};
