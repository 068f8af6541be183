//! # Stream registry: the single owner of every node.
//!
//! The registry maps [`StreamId`] → node and keeps the provider's counters.
//!
//! ## Rules
//! - The registry holds the only strong reference the engine keeps; graph
//!   edges are ids, user [`Stream`](crate::Stream) values are extra references.
//! - `created` is monotonic.
//! - `existing` follows node lifetime: each node carries a [`Lease`] that
//!   decrements it when the node is dropped, i.e. after disposal **and** after
//!   the last user reference is gone.
//! - `active` counts streams that ran and have not reached a terminal state.
//! - Removal is never done inline: `dispose` queues it for the next tick.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::node::{StreamId, StreamNode};

pub(crate) type NodeRef = Rc<RefCell<StreamNode>>;

/// Provider counters.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    created: Cell<usize>,
    existing: Cell<usize>,
    active: Cell<usize>,
}

/// Keeps one unit of `existing` alive for as long as its node exists.
pub(crate) struct Lease {
    counters: Rc<Counters>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let n = self.counters.existing.get();
        self.counters.existing.set(n.saturating_sub(1));
    }
}

/// Arena of stream nodes keyed by id.
pub(crate) struct Registry {
    nodes: RefCell<HashMap<StreamId, NodeRef>>,
    counters: Rc<Counters>,
    next_id: Cell<u64>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            nodes: RefCell::new(HashMap::new()),
            counters: Rc::new(Counters::default()),
            next_id: Cell::new(1),
        }
    }

    /// Reserves an id and a lease for a node about to be created.
    pub(crate) fn reserve(&self) -> (StreamId, Lease) {
        let id = StreamId::from_raw(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);

        let c = &self.counters;
        c.created.set(c.created.get() + 1);
        c.existing.set(c.existing.get() + 1);
        (
            id,
            Lease {
                counters: Rc::clone(c),
            },
        )
    }

    pub(crate) fn insert(&self, node: StreamNode) -> NodeRef {
        let id = node.id;
        let node = Rc::new(RefCell::new(node));
        self.nodes.borrow_mut().insert(id, Rc::clone(&node));
        node
    }

    pub(crate) fn get(&self, id: StreamId) -> Option<NodeRef> {
        self.nodes.borrow().get(&id).cloned()
    }

    /// Drops the registry's reference. Returns it so the caller drops it
    /// outside of any borrow.
    pub(crate) fn remove(&self, id: StreamId) -> Option<NodeRef> {
        self.nodes.borrow_mut().remove(&id)
    }

    pub(crate) fn ids(&self) -> Vec<StreamId> {
        let mut ids: Vec<StreamId> = self.nodes.borrow().keys().copied().collect();
        ids.sort();
        ids
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub(crate) fn activated(&self) {
        let c = &self.counters;
        c.active.set(c.active.get() + 1);
    }

    pub(crate) fn finished(&self) {
        let c = &self.counters;
        c.active.set(c.active.get().saturating_sub(1));
    }

    pub(crate) fn created(&self) -> usize {
        self.counters.created.get()
    }

    pub(crate) fn existing(&self) -> usize {
        self.counters.existing.get()
    }

    pub(crate) fn active(&self) -> usize {
        self.counters.active.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::{CaptionStatus, StreamType};

    fn node(reg: &Registry) -> StreamNode {
        let (id, lease) = reg.reserve();
        StreamNode::new(id, None, StreamType::Atomic, CaptionStatus::Free, lease)
    }

    #[test]
    fn test_existing_follows_node_lifetime() {
        let reg = Registry::new();
        let a = reg.insert(node(&reg));
        let b = reg.insert(node(&reg));
        assert_eq!((reg.created(), reg.existing(), reg.len()), (2, 2, 2));

        let id_a = a.borrow().id;
        drop(reg.remove(id_a));
        assert_eq!(reg.existing(), 2, "user reference still alive");

        drop(a);
        assert_eq!(reg.existing(), 1);
        assert_eq!(reg.created(), 2);

        drop(b);
        assert_eq!(reg.existing(), 1, "registry still owns b");
        assert_eq!(reg.ids().len(), 1);
    }

    #[test]
    fn test_active_counter_saturates() {
        let reg = Registry::new();
        reg.finished();
        assert_eq!(reg.active(), 0);
        reg.activated();
        reg.activated();
        reg.finished();
        assert_eq!(reg.active(), 1);
    }
}
