//! # Chain building: capture, branch registration, adoption.
//!
//! Everything here runs in the build phase (the stream is `Initializing`) and
//! reports misuse as [`ChainError`] at the call site.
//!
//! ## Sequences
//! A sequence is the chain of streams linked by `attach`/`bind`:
//! ```text
//!  root ──next──► s1 ──next──► s2          prev edges point back
//!   │              │            │
//!   └── failure ───┴────────────┴──► F      (one explicit, others inherited)
//! ```
//!
//! ## Branch propagation
//! - Registering a branch on a member propagates it backwards (prev) and
//!   forwards (next) to every member that has no branch of that kind or only
//!   an inherited one; it stops at a member that registered its own.
//! - A stream attached later inherits the branches of the stream it is
//!   attached to, up to the first member of its own sequence that already
//!   has one.
//! - Adopted streams pass their parent on to every stream attached after them.

use std::rc::Rc;

use tracing::warn;

use crate::core::config::BranchPolicy;
use crate::core::engine::Core;
use crate::core::node::{Branch, CaptionStatus, Captured, State, StreamId, StreamType};
use crate::core::registry::NodeRef;
use crate::core::stream::Stream;
use crate::error::{BranchKind, ChainError};
use crate::events::{Event, EventKind};
use crate::executables::Executable;

/// What an operator captures: a stream it creates or one the caller built.
pub(crate) enum Target<'a> {
    New(Box<dyn Executable>),
    Existing(&'a Stream),
}

#[derive(Clone, Copy)]
enum Direction {
    Prev,
    Next,
}

impl Core {
    pub(crate) fn ensure_building(&self, node: &NodeRef, op: &'static str) -> Result<(), ChainError> {
        let n = node.borrow();
        if n.state != State::Initializing {
            return Err(ChainError::Locked { op, stream: n.id });
        }
        Ok(())
    }

    fn ensure_capturable(&self, me: StreamId, target: &Stream) -> Result<(), ChainError> {
        if target.id() == me {
            return Err(ChainError::SelfCapture { stream: me });
        }
        if !target.belongs_to(self) {
            return Err(ChainError::ForeignStream { target: target.id() });
        }
        let t = target.node().borrow();
        if t.caption != CaptionStatus::Free {
            return Err(ChainError::NotFree { target: t.id });
        }
        if t.state != State::Initializing {
            return Err(ChainError::TargetLocked { target: t.id });
        }
        Ok(())
    }

    fn neighbour(&self, id: StreamId, dir: Direction) -> Option<StreamId> {
        let node = self.node(id)?;
        let n = node.borrow();
        match dir {
            Direction::Prev => n.prev,
            Direction::Next => n.next,
        }
    }

    /// `id` and every stream after it in its sequence.
    fn successors(&self, id: StreamId) -> Vec<StreamId> {
        let mut out = vec![id];
        let mut cur = id;
        while let Some(next) = self.neighbour(cur, Direction::Next) {
            if out.contains(&next) {
                break;
            }
            out.push(next);
            cur = next;
        }
        out
    }

    /// Every stream before `id` in its sequence.
    fn predecessors(&self, id: StreamId) -> Vec<StreamId> {
        let mut out = Vec::new();
        let mut cur = id;
        while let Some(prev) = self.neighbour(cur, Direction::Prev) {
            if prev == id || out.contains(&prev) {
                break;
            }
            out.push(prev);
            cur = prev;
        }
        out
    }

    /// Links `target` (or a new abortable stream) as the continuation of `me`.
    pub(crate) fn capture(
        &self,
        me: &NodeRef,
        target: Target<'_>,
        captured: Captured,
        op: &'static str,
    ) -> Result<NodeRef, ChainError> {
        self.ensure_building(me, op)?;
        let id = me.borrow().id;
        let existing = me.borrow().next;
        if let Some(next) = existing {
            return Err(ChainError::AlreadyCaptured {
                stream: id,
                captured: next,
            });
        }
        let caption = match captured {
            Captured::Bound => CaptionStatus::Bound,
            _ => CaptionStatus::Attached,
        };

        let succ = match target {
            Target::New(executable) => self.create_node(Some(executable), StreamType::Abortable, caption),
            Target::Existing(stream) => {
                self.ensure_capturable(id, stream)?;
                if self.predecessors(id).contains(&stream.id()) {
                    return Err(ChainError::Cycle {
                        stream: id,
                        target: stream.id(),
                    });
                }
                stream.node().borrow_mut().caption = caption;
                Rc::clone(stream.node())
            }
        };
        let succ_id = succ.borrow().id;

        {
            let mut n = me.borrow_mut();
            n.next = Some(succ_id);
            n.captured = captured;
        }
        succ.borrow_mut().prev = Some(id);

        let (failure, abortion, parent) = {
            let n = me.borrow();
            (n.failure, n.abortion, n.parent)
        };
        for (kind, branch) in [(BranchKind::Failure, failure), (BranchKind::Abortion, abortion)] {
            if let Some(branch) = branch {
                self.inherit(succ_id, kind, branch.head);
            }
        }
        if let Some(parent) = parent {
            self.adopt_sequence(parent, succ_id);
        }
        Ok(succ)
    }

    /// Fills `kind` along the sequence starting at `start` until a member
    /// already has a branch of that kind.
    fn inherit(&self, start: StreamId, kind: BranchKind, head: StreamId) {
        for id in self.successors(start) {
            let Some(node) = self.node(id) else { break };
            let mut n = node.borrow_mut();
            if n.branch(kind).is_some() {
                break;
            }
            *n.branch_mut(kind) = Some(Branch {
                head,
                inherited: true,
            });
        }
    }

    /// Overwrites inherited `kind` branches walking from `start` in `dir`,
    /// stopping at a member that registered its own.
    fn propagate(&self, start: Option<StreamId>, kind: BranchKind, head: StreamId, dir: Direction) {
        let mut cur = start;
        let mut visited = Vec::new();
        while let Some(id) = cur {
            if visited.contains(&id) {
                break;
            }
            visited.push(id);
            let Some(node) = self.node(id) else { break };
            {
                let mut n = node.borrow_mut();
                if n.branch(kind).is_some_and(|b| !b.inherited) {
                    break;
                }
                *n.branch_mut(kind) = Some(Branch {
                    head,
                    inherited: true,
                });
            }
            cur = self.neighbour(id, dir);
        }
    }

    /// Registers `target` (or a new atomic stream) as the `kind` branch of `me`.
    pub(crate) fn register_branch(
        &self,
        me: &NodeRef,
        target: Target<'_>,
        kind: BranchKind,
    ) -> Result<NodeRef, ChainError> {
        let op = match kind {
            BranchKind::Failure => "failure",
            BranchKind::Abortion => "abortion",
        };
        self.ensure_building(me, op)?;
        let id = me.borrow().id;

        if let Target::Existing(stream) = &target {
            self.ensure_capturable(id, stream)?;
            let target_id = stream.id();
            if self.predecessors(id).contains(&target_id) || self.successors(id).contains(&target_id) {
                return Err(ChainError::BranchIsMember {
                    target: target_id,
                    branch: kind,
                });
            }
        }

        let registered = me.borrow().branch(kind);
        let replaced = match registered {
            Some(b) if !b.inherited => Some(b.head),
            _ => None,
        };
        if replaced.is_some() && self.config.branch_policy == BranchPolicy::Reject {
            return Err(ChainError::BranchAlreadyRegistered {
                stream: id,
                branch: kind,
            });
        }

        let head = match target {
            Target::New(executable) => {
                self.create_node(Some(executable), StreamType::Atomic, CaptionStatus::Bound)
            }
            Target::Existing(stream) => {
                stream.node().borrow_mut().caption = CaptionStatus::Bound;
                Rc::clone(stream.node())
            }
        };
        let head_id = head.borrow().id;

        let (prev, next) = {
            let mut n = me.borrow_mut();
            *n.branch_mut(kind) = Some(Branch {
                head: head_id,
                inherited: false,
            });
            (n.prev, n.next)
        };
        self.propagate(prev, kind, head_id, Direction::Prev);
        self.propagate(next, kind, head_id, Direction::Next);

        if let Some(old) = replaced {
            warn!(stream = %id, branch = %kind, %old, new = %head_id, "branch overridden");
            self.emit(
                Event::new(EventKind::BranchOverridden)
                    .with_stream(id)
                    .with_label(match kind {
                        BranchKind::Failure => "failure",
                        BranchKind::Abortion => "abortion",
                    })
                    .with_reason(old.to_string()),
            );
            self.eliminate(&[old], &[]);
        }
        Ok(head)
    }

    /// Makes `parent` the cancellation parent of `start` and everything after it.
    pub(crate) fn adopt_sequence(&self, parent: StreamId, start: StreamId) {
        let members = self.successors(start);
        for &id in &members {
            if let Some(node) = self.node(id) {
                node.borrow_mut().parent = Some(parent);
            }
        }
        if let Some(p) = self.node(parent) {
            let mut p = p.borrow_mut();
            for id in members {
                if !p.subordinates.contains(&id) {
                    p.subordinates.push(id);
                }
            }
        }
    }

    /// Adopts `child` (or a new empty atomic stream) under `parent`.
    pub(crate) fn adopt(&self, parent: StreamId, child: Option<&Stream>) -> Result<Stream, ChainError> {
        let node = match child {
            None => self.create_node(None, StreamType::Atomic, CaptionStatus::Free),
            Some(stream) => {
                if stream.id() == parent {
                    return Err(ChainError::SelfCapture { stream: parent });
                }
                if !stream.belongs_to(self) {
                    return Err(ChainError::ForeignStream {
                        target: stream.id(),
                    });
                }
                Rc::clone(stream.node())
            }
        };
        let child_id = node.borrow().id;
        self.adopt_sequence(parent, child_id);
        self.stream(node)
            .ok_or(ChainError::Detached { stream: parent })
    }
}
