#![forbid(unsafe_code)]

//! Clone-on-write mutation protocol.
//!
//! Every structural edit funnels through one propagation routine:
//!
//! 1. The affected old child is detached (its parent link cleared).
//! 2. If no replacement was supplied, the vacated slot either receives a
//!    fresh placeholder (order-sensitive parents, or parents at their
//!    minimum) or is dropped (commutative parents with surplus children).
//! 3. The parent is cloned under a fresh id with the new child list; the
//!    kept children are re-pointed at the clone.
//! 4. The same change is applied one level up (the old parent swapped for
//!    its clone) until the chain reaches a detached ancestor, whose new
//!    top is returned, or the synthetic root holder, which swaps the
//!    session root, records a history snapshot, and notifies the
//!    root-changed observer.
//!
//! Sibling subtrees off the edited path keep their node ids, so any
//! reference into a previous tree state stays valid; that structural
//! sharing is what makes the undo history a plain stack of roots.
//!
//! Inconsistent bookkeeping (a recorded parent that does not match the
//! invoking node, an old child missing from the children list, a change
//! with neither an old nor a new child) is a caller bug and fails
//! loudly, never a condition to patch over.

use std::fmt;

use scorex_expr::TestId;
use serde_json::Value;

use crate::builder::FitMode;
use crate::history::EditOp;
use crate::node::{NodeBody, NodeId, NodeKind, ParentLink};
use crate::tree::ScoreAst;

/// Errors raised by structural mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationError {
    /// The id is not present in the arena.
    UnknownNode { node: NodeId },
    /// The node was expected to be detached (a staged root) but is not.
    NotDetached { node: NodeId },
    /// The target has no owner; stage payloads at construction instead.
    DetachedTarget { node: NodeId },
    /// The parent is already at its kind's maximum child count.
    ChildLimit { parent: NodeId, limit: usize },
    /// A change with neither an old nor a new child.
    EmptyChange { parent: NodeId },
    /// The old child's recorded parent is not the invoking node.
    ParentMismatch { parent: NodeId, child: NodeId },
    /// The old child is not in the invoking node's children list.
    MissingChild { parent: NodeId, child: NodeId },
    /// A change at the root holder named a node that is not the root.
    RootMismatch { expected: NodeId, found: NodeId },
    /// Attaching here would make the subtree its own ancestor.
    WouldCycle { parent: NodeId, child: NodeId },
    /// Payload edit on a node of a different kind.
    WrongKind { node: NodeId, expected: NodeKind },
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode { node } => write!(f, "node {node} is not present in the arena"),
            Self::NotDetached { node } => write!(f, "node {node} is not a detached root"),
            Self::DetachedTarget { node } => {
                write!(f, "node {node} has no owner to record the change")
            }
            Self::ChildLimit { parent, limit } => {
                write!(f, "node {parent} already has its maximum of {limit} children")
            }
            Self::EmptyChange { parent } => {
                write!(f, "change at {parent} names neither an old nor a new child")
            }
            Self::ParentMismatch { parent, child } => {
                write!(f, "child {child} does not record {parent} as its parent")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "child {child} is not among the children of {parent}")
            }
            Self::RootMismatch { expected, found } => {
                write!(f, "root change names {found} but the current root is {expected}")
            }
            Self::WouldCycle { parent, child } => {
                write!(f, "attaching {child} under {parent} would create a cycle")
            }
            Self::WrongKind { node, expected } => {
                write!(f, "node {node} is not a {expected} node")
            }
        }
    }
}

impl std::error::Error for MutationError {}

impl ScoreAst {
    // ========================================================================
    // Staging
    // ========================================================================

    /// Create a detached node, pre-filled with placeholder children up to
    /// its kind's minimum so it can be appended as-is.
    pub fn new_node(&mut self, body: NodeBody) -> NodeId {
        let min = body.kind().min_children();
        let children: Vec<NodeId> = (0..min)
            .map(|_| self.insert_node(NodeBody::Placeholder, Vec::new()))
            .collect();
        let id = self.insert_node(body, children);
        self.bind_children(id);
        id
    }

    /// Build a detached subtree from a raw configuration value, with the
    /// same lenient degradation rules as session construction.
    pub fn stage_value(&mut self, raw: &Value) -> NodeId {
        self.build_subtree(raw)
    }

    /// Directly link a detached child under a detached parent, filling the
    /// first placeholder vacancy if there is one.
    ///
    /// This is the staging counterpart of [`append_child`](Self::append_child):
    /// no cloning, no history. Live nodes are rejected.
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), MutationError> {
        let parent_node = self
            .node(parent)
            .ok_or(MutationError::UnknownNode { node: parent })?;
        let kind = parent_node.kind();
        let count = parent_node.children().len();
        if self
            .node(child)
            .ok_or(MutationError::UnknownNode { node: child })?
            .parent()
            .is_some()
        {
            return Err(MutationError::NotDetached { node: child });
        }
        if self.is_attached(parent) {
            return Err(MutationError::NotDetached { node: parent });
        }
        if self.chain_top(parent) == Some(child) {
            return Err(MutationError::WouldCycle { parent, child });
        }
        let vacancy = self
            .node(parent)
            .and_then(|node| {
                node.children()
                    .iter()
                    .position(|slot| self.is_placeholder(*slot))
            });
        match vacancy {
            Some(position) => {
                let old = self
                    .nodes
                    .get_mut(&parent)
                    .map(|node| std::mem::replace(&mut node.children[position], child));
                if let Some(old) = old {
                    self.detach(old);
                }
            }
            None => {
                if let Some(max) = kind.max_children()
                    && count >= max
                {
                    return Err(MutationError::ChildLimit { parent, limit: max });
                }
                if let Some(node) = self.nodes.get_mut(&parent) {
                    node.children.push(child);
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(ParentLink::Node(parent));
        }
        Ok(())
    }

    // ========================================================================
    // Structural edits
    // ========================================================================

    /// Append a detached node as the last child of `parent`.
    ///
    /// Returns the new root (or new detached top when editing a staged
    /// subtree).
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId, MutationError> {
        self.ensure_known(parent)?;
        if self
            .node(child)
            .ok_or(MutationError::UnknownNode { node: child })?
            .parent()
            .is_some()
        {
            return Err(MutationError::NotDetached { node: child });
        }
        if self.chain_top(parent) == Some(child) {
            return Err(MutationError::WouldCycle { parent, child });
        }
        self.propagate(ParentLink::Node(parent), None, Some(child), EditOp::Append)
    }

    /// Swap `target` for `replacement`, grafting the target's children
    /// onto the replacement (fitted to its arity; placeholders are shed or
    /// added as needed). A placeholder target is a plain swap. Any
    /// children the replacement already had are detached.
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> Result<NodeId, MutationError> {
        let owner = self.check_replacement(target, replacement)?;
        if !self.is_placeholder(target) {
            let inherited = self
                .node(target)
                .map(|node| node.children().to_vec())
                .unwrap_or_default();
            let kind = self
                .node(replacement)
                .map(|node| node.kind())
                .unwrap_or(NodeKind::Placeholder);
            let fitted = self.fit_children(kind, inherited, FitMode::Mutate);
            let previous = match self.nodes.get_mut(&replacement) {
                Some(node) => std::mem::replace(&mut node.children, fitted),
                None => Vec::new(),
            };
            for child in previous {
                self.detach(child);
            }
            self.bind_children(replacement);
        }
        self.propagate(owner, Some(target), Some(replacement), EditOp::Replace)
    }

    /// Swap `target` for `replacement`, keeping the replacement's own
    /// children (drag/drop-style supplant).
    pub fn replace_with_subtree(
        &mut self,
        target: NodeId,
        replacement: NodeId,
    ) -> Result<NodeId, MutationError> {
        let owner = self.check_replacement(target, replacement)?;
        self.propagate(owner, Some(target), Some(replacement), EditOp::Supplant)
    }

    /// Remove `target` and its subtree from its parent.
    ///
    /// The vacated slot follows the placeholder rules; deleting the root
    /// leaves a fresh placeholder root behind.
    pub fn delete(&mut self, target: NodeId) -> Result<NodeId, MutationError> {
        let owner = self.owner_of(target)?;
        self.propagate(owner, Some(target), None, EditOp::Delete)
    }

    /// Assign the test id of a `test-result` node (an undoable edit, like
    /// any other mutation).
    pub fn set_test(
        &mut self,
        target: NodeId,
        test: Option<TestId>,
    ) -> Result<NodeId, MutationError> {
        self.set_payload(target, NodeKind::TestResult, NodeBody::test(test), EditOp::SetTest)
    }

    /// Assign the number of a `value` node.
    pub fn set_value(
        &mut self,
        target: NodeId,
        value: Option<f64>,
    ) -> Result<NodeId, MutationError> {
        self.set_payload(target, NodeKind::Value, NodeBody::value(value), EditOp::SetValue)
    }

    // ========================================================================
    // Protocol internals
    // ========================================================================

    fn set_payload(
        &mut self,
        target: NodeId,
        expected: NodeKind,
        body: NodeBody,
        op: EditOp,
    ) -> Result<NodeId, MutationError> {
        let node = self
            .node(target)
            .ok_or(MutationError::UnknownNode { node: target })?;
        if node.kind() != expected {
            return Err(MutationError::WrongKind { node: target, expected });
        }
        let owner = self.owner_of(target)?;
        let replacement = self.insert_node(body, Vec::new());
        self.propagate(owner, Some(target), Some(replacement), op)
    }

    fn ensure_known(&self, id: NodeId) -> Result<(), MutationError> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(MutationError::UnknownNode { node: id })
        }
    }

    fn owner_of(&self, target: NodeId) -> Result<ParentLink, MutationError> {
        self.node(target)
            .ok_or(MutationError::UnknownNode { node: target })?
            .parent()
            .ok_or(MutationError::DetachedTarget { node: target })
    }

    fn check_replacement(
        &self,
        target: NodeId,
        replacement: NodeId,
    ) -> Result<ParentLink, MutationError> {
        let owner = self.owner_of(target)?;
        if self
            .node(replacement)
            .ok_or(MutationError::UnknownNode { node: replacement })?
            .parent()
            .is_some()
        {
            return Err(MutationError::NotDetached { node: replacement });
        }
        if self.chain_top(target) == Some(replacement) {
            return Err(MutationError::WouldCycle {
                parent: replacement,
                child: target,
            });
        }
        Ok(owner)
    }

    /// Walk a change up from `owner` to the root holder or a detached top.
    fn propagate(
        &mut self,
        owner: ParentLink,
        old_child: Option<NodeId>,
        new_child: Option<NodeId>,
        op: EditOp,
    ) -> Result<NodeId, MutationError> {
        let (mut at, mut old, mut new) = match owner {
            ParentLink::Root => return self.finish_root_change(old_child, new_child, op),
            ParentLink::Node(parent) => (parent, old_child, new_child),
        };
        loop {
            let parent_link = self
                .node(at)
                .ok_or(MutationError::UnknownNode { node: at })?
                .parent();
            let clone = self.child_changed(at, old, new)?;
            match parent_link {
                None => {
                    tracing::debug!(op = op.description(), top = clone.get(), "staged subtree updated");
                    return Ok(clone);
                }
                Some(ParentLink::Root) => {
                    return self.finish_root_change(Some(at), Some(clone), op);
                }
                Some(ParentLink::Node(grandparent)) => {
                    old = Some(at);
                    new = Some(clone);
                    at = grandparent;
                }
            }
        }
    }

    /// Apply one change at `parent` and return its clone.
    fn child_changed(
        &mut self,
        parent: NodeId,
        old_child: Option<NodeId>,
        new_child: Option<NodeId>,
    ) -> Result<NodeId, MutationError> {
        let parent_node = self
            .node(parent)
            .ok_or(MutationError::UnknownNode { node: parent })?;
        let kind = parent_node.kind();
        let body = parent_node.body().clone();
        let mut children = parent_node.children().to_vec();

        match (old_child, new_child) {
            (None, None) => return Err(MutationError::EmptyChange { parent }),
            (None, Some(appended)) => {
                if let Some(max) = kind.max_children()
                    && children.len() >= max
                {
                    return Err(MutationError::ChildLimit { parent, limit: max });
                }
                children.push(appended);
            }
            (Some(old), replacement) => {
                let old_node = self
                    .node(old)
                    .ok_or(MutationError::UnknownNode { node: old })?;
                if old_node.parent() != Some(ParentLink::Node(parent)) {
                    return Err(MutationError::ParentMismatch { parent, child: old });
                }
                let Some(position) = children.iter().position(|c| *c == old) else {
                    return Err(MutationError::MissingChild { parent, child: old });
                };
                self.detach(old);
                match replacement {
                    Some(new) => children[position] = new,
                    None => {
                        let keeps_position = !kind.is_commutative()
                            && position + 1 < children.len()
                            && !self.is_placeholder(children[position + 1]);
                        let below_min = children.len() - 1 < kind.min_children();
                        if keeps_position || below_min {
                            children[position] = self.insert_node(NodeBody::Placeholder, Vec::new());
                        } else {
                            children.remove(position);
                        }
                    }
                }
            }
        }

        let clone = self.insert_node(body, children);
        self.bind_children(clone);
        Ok(clone)
    }

    /// Terminal step at the synthetic root holder.
    fn finish_root_change(
        &mut self,
        old_root: Option<NodeId>,
        new_root: Option<NodeId>,
        op: EditOp,
    ) -> Result<NodeId, MutationError> {
        if old_root.is_none() && new_root.is_none() {
            return Err(MutationError::EmptyChange { parent: self.root });
        }
        if let Some(old) = old_root
            && old != self.root
        {
            return Err(MutationError::RootMismatch {
                expected: self.root,
                found: old,
            });
        }
        let old_id = self.root;
        // No replacement supplied: the root holder synthesizes a
        // placeholder so the session always has a root.
        let new_id = match new_root {
            Some(id) => id,
            None => self.insert_node(NodeBody::Placeholder, Vec::new()),
        };
        self.detach(old_id);
        if let Some(node) = self.nodes.get_mut(&new_id) {
            node.parent = Some(ParentLink::Root);
        }
        self.root = new_id;
        self.history.push(new_id, op);
        tracing::debug!(
            op = op.description(),
            old = old_id.get(),
            new = new_id.get(),
            "root changed"
        );
        if let Some(observer) = self.on_root_changed.as_mut() {
            observer(old_id, new_id);
        }
        Ok(new_id)
    }
}

// ============================================================================
// Tests
// ============================================================================
