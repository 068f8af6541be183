use std::rc::Rc;

use crate::{
    core::config::{BranchPolicy, ProviderConfig},
    core::provider::Provider,
    events::Bus,
    scheduler::Scheduler,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing a Provider with optional features.
pub struct ProviderBuilder {
    scheduler: Rc<dyn Scheduler>,
    cfg: ProviderConfig,
    subscribers: Vec<Rc<dyn Subscribe>>,
}

impl ProviderBuilder {
    /// Creates a new builder driving streams on `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            cfg: ProviderConfig::default(),
            subscribers: Vec::new(),
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: ProviderConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets how a second branch registration on the same stream is handled.
    pub fn with_branch_policy(mut self, policy: BranchPolicy) -> Self {
        self.cfg.branch_policy = policy;
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Each subscriber gets a bounded queue drained by a task spawned on the
    /// provider's scheduler, so delivery needs no runtime beyond the scheduler.
    pub fn with_subscribers(mut self, subscribers: Vec<Rc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the provider.
    ///
    /// Delivery tasks stop once the provider and every stream are gone, after
    /// handing over the events already queued.
    pub fn build(self) -> Provider {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subscribers = SubscriberSet::new(self.subscribers, bus.clone(), &*self.scheduler);
        Provider::from_parts(self.scheduler, bus, self.cfg, subscribers)
    }
}
