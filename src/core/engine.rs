//! # Engine state shared by a provider and its streams.
//!
//! [`Core`] bundles the registry, the scheduler, the event bus, the
//! subscriber queues and the configuration. It lives in an `Rc`; every callback handed to the scheduler
//! captures a `Weak<Core>` plus a [`StreamId`], so queued work never keeps the
//! engine alive and simply does nothing once the provider is gone.
//!
//! ## Rules
//! - No `RefCell` borrow of a node is held while user code runs
//!   (executables, policies, listeners are taken out or cloned first).
//! - Every cross-stream signal goes through [`Core::defer`] or a timer.

use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::core::config::ProviderConfig;
use crate::core::node::{CaptionStatus, StreamId, StreamNode, StreamType, WakeCondition};
use crate::core::registry::{NodeRef, Registry};
use crate::core::stream::Stream;
use crate::events::{Bus, Event, EventKind};
use crate::executables::Executable;
use crate::payload::Payload;
use crate::scheduler::{Scheduler, TimerId};
use crate::subscribers::SubscriberSet;

pub(crate) struct Core {
    pub(crate) registry: Registry,
    pub(crate) config: ProviderConfig,
    pub(crate) bus: Bus,
    subscribers: SubscriberSet,
    scheduler: Rc<dyn Scheduler>,
    me: Weak<Core>,
}

impl Core {
    pub(crate) fn new(
        scheduler: Rc<dyn Scheduler>,
        bus: Bus,
        config: ProviderConfig,
        subscribers: SubscriberSet,
    ) -> Rc<Self> {
        Rc::new_cyclic(|me| Core {
            registry: Registry::new(),
            config,
            bus,
            subscribers,
            scheduler,
            me: me.clone(),
        })
    }

    pub(crate) fn weak(&self) -> Weak<Core> {
        self.me.clone()
    }

    pub(crate) fn node(&self, id: StreamId) -> Option<NodeRef> {
        self.registry.get(id)
    }

    /// Wraps a node into a user-facing stream.
    pub(crate) fn stream(&self, node: NodeRef) -> Option<Stream> {
        self.me.upgrade().map(|core| Stream::new(core, node))
    }

    pub(crate) fn emit(&self, ev: Event) {
        self.subscribers.emit(&ev);
        self.bus.publish(ev);
    }

    /// Queues `f` for a later tick.
    pub(crate) fn defer(&self, f: impl FnOnce(&Core) + 'static) {
        let me = self.me.clone();
        self.scheduler.defer(Box::new(move || {
            if let Some(core) = me.upgrade() {
                f(&core);
            }
        }));
    }

    /// Queues a wake of `id` for a later tick.
    pub(crate) fn wake_later(&self, id: StreamId, input: Payload, cond: WakeCondition) {
        self.defer(move |core| core.awake(id, input, cond));
    }

    pub(crate) fn start_timer(&self, after: Duration, f: impl FnOnce(&Core) + 'static) -> TimerId {
        let me = self.me.clone();
        self.scheduler.start_timer(
            after,
            Box::new(move || {
                if let Some(core) = me.upgrade() {
                    f(&core);
                }
            }),
        )
    }

    pub(crate) fn stop_timer(&self, timer: TimerId) {
        self.scheduler.stop_timer(timer);
    }

    /// Registers a new node. Free nodes start themselves on the next tick.
    pub(crate) fn create_node(
        &self,
        executable: Option<Box<dyn Executable>>,
        kind: StreamType,
        caption: CaptionStatus,
    ) -> NodeRef {
        let (id, lease) = self.registry.reserve();
        let node = self
            .registry
            .insert(StreamNode::new(id, executable, kind, caption, lease));

        let label = match kind {
            StreamType::Atomic => "atomic",
            StreamType::Abortable => "abortable",
        };
        debug!(stream = %id, kind = label, ?caption, "stream created");
        self.emit(
            Event::new(EventKind::StreamCreated)
                .with_stream(id)
                .with_label(label),
        );

        if caption == CaptionStatus::Free {
            self.defer(move |core| core.initialize(id));
        }
        node
    }
}
