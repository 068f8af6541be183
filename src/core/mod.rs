//! Runtime core: stream graph, signal routing and lifecycle.
//!
//! The public API from this module is [`Provider`] (plus its builder and
//! configuration), [`Stream`] for building and observing graphs, and
//! [`Handle`] for executables reporting their outcome.
//!
//! Internal modules:
//! - [`engine`]: shared engine state (registry, scheduler, bus) and queuing helpers;
//! - [`node`]: per-stream record and the state machine's vocabulary;
//! - [`registry`]: id → node map and the created/existing/active counters;
//! - [`chain`]: build-phase operators (capture, branches, adoption);
//! - [`signals`]: run-phase routing (wake, close, fail, abort, die, eliminate).

mod builder;
mod chain;
mod config;
mod engine;
mod handle;
mod node;
mod provider;
mod registry;
mod signals;
mod stream;


pub use builder::ProviderBuilder;
pub use config::{BranchPolicy, ProviderConfig};
pub use handle::Handle;
pub use node::{CaptionStatus, Captured, State, StreamId, StreamType, WakeCondition};
pub use provider::Provider;
pub use stream::Stream;
