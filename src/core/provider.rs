//! # Provider: stream factory and registry owner.
//!
//! The [`Provider`] creates streams, owns the only strong reference to every
//! node and keeps three counters:
//!
//! | Counter    | Increments                | Decrements                      |
//! |------------|---------------------------|---------------------------------|
//! | `created`  | on create                 | never                           |
//! | `existing` | on create                 | when the last reference drops   |
//! | `active`   | on the first run          | when the stream dies            |
//!
//! Finished streams leave the registry on the tick after they die; `existing`
//! drops once user-held [`Stream`] references are gone too.
//!
//! ## Example
//! ```rust
//! use std::rc::Rc;
//! use flowvisor::{ManualScheduler, MapFn, Payload, Provider, StreamType};
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let provider = Provider::new(scheduler.clone());
//!
//! let root = provider.create(MapFn::new(|_| Ok(Payload::from("testdata"))), StreamType::Abortable);
//! root.attach(MapFn::new(|input: Payload| {
//!     assert_eq!(input.as_str(), Some("testdata"));
//!     Ok(input)
//! }))
//! .unwrap();
//! drop(root);
//!
//! scheduler.run_all();
//! assert_eq!(provider.total_created(), 2);
//! assert_eq!(provider.total_existing(), 0);
//! ```

use std::rc::Rc;

use tokio::sync::broadcast;

use crate::core::builder::ProviderBuilder;
use crate::core::config::ProviderConfig;
use crate::core::engine::Core;
use crate::core::node::{CaptionStatus, StreamType};
use crate::core::stream::Stream;
use crate::events::{Bus, Event};
use crate::executables::Executable;
use crate::scheduler::Scheduler;
use crate::subscribers::SubscriberSet;

/// Creates streams and tracks their lifetime.
#[derive(Clone)]
pub struct Provider {
    core: Rc<Core>,
}

impl Provider {
    /// Creates a provider with the default configuration and no subscribers.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        ProviderBuilder::new(scheduler).build()
    }

    /// Returns a builder for a customized provider.
    pub fn builder(scheduler: Rc<dyn Scheduler>) -> ProviderBuilder {
        ProviderBuilder::new(scheduler)
    }

    pub(crate) fn from_parts(
        scheduler: Rc<dyn Scheduler>,
        bus: Bus,
        config: ProviderConfig,
        subscribers: SubscriberSet,
    ) -> Self {
        Self {
            core: Core::new(scheduler, bus, config, subscribers),
        }
    }

    /// Creates a free stream. It locks its graph and runs on a later tick.
    pub fn create(&self, executable: impl Executable, kind: StreamType) -> Stream {
        let node = self
            .core
            .create_node(Some(Box::new(executable)), kind, CaptionStatus::Free);
        Stream::new(Rc::clone(&self.core), node)
    }

    /// Creates a free stream without executable; it closes with its input.
    pub fn create_empty(&self, kind: StreamType) -> Stream {
        let node = self.core.create_node(None, kind, CaptionStatus::Free);
        Stream::new(Rc::clone(&self.core), node)
    }

    /// Streams ever created.
    pub fn total_created(&self) -> usize {
        self.core.registry.created()
    }

    /// Streams not yet released.
    pub fn total_existing(&self) -> usize {
        self.core.registry.existing()
    }

    /// Streams that ran at least once and are not dead yet.
    pub fn total_active(&self) -> usize {
        self.core.registry.active()
    }

    /// Streams currently held by the registry.
    pub fn registered(&self) -> usize {
        self.core.registry.len()
    }

    /// Lifecycle event bus.
    pub fn bus(&self) -> &Bus {
        &self.core.bus
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.core.bus.subscribe()
    }

    /// Active configuration.
    pub fn config(&self) -> &ProviderConfig {
        &self.core.config
    }

    /// Eliminates every registered stream; none of them runs recovery.
    pub fn teardown(&self) {
        self.core.teardown();
    }
}
