#![forbid(unsafe_code)]

//! Live score-expression tree session.
//!
//! A [`ScoreAst`] owns an arena of [`AstNode`]s keyed by [`NodeId`], the
//! current root, the edit history, and an optional root-changed observer.
//! Nodes are never edited in place: every structural change goes through
//! the clone-on-write mutation protocol (see [`crate::mutate`]), which
//! re-creates the path from the edited node up to the root and leaves
//! every untouched sibling subtree, and every node of every previous
//! state, exactly as it was. That is what makes undo/redo a plain
//! snapshot stack of root ids.
//!
//! The arena retains superseded nodes for as long as the session lives;
//! growth is proportional to the number of edits, which is what a bounded
//! history already caps in practice.

use std::collections::BTreeMap;
use std::fmt;

use scorex_expr::ScoreExpr;
use serde_json::Value;

use crate::history::{EditHistory, EditOp, HistoryConfig, HistoryEntry};
use crate::node::{AstNode, NodeBody, NodeId, NodeIdGen, ParentLink};

/// Observer invoked by the synthetic root holder with
/// `(old_root, new_root)` whenever a mutation swaps the root.
pub type RootChangedFn = Box<dyn FnMut(NodeId, NodeId)>;

/// Errors raised when serializing a tree for persistence.
///
/// Serialization is the validity gate: a tree containing a placeholder or
/// a payload-less leaf can be displayed and edited, but never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeError {
    /// The tree still contains a placeholder.
    Placeholder { node: NodeId },
    /// A `test-result` node has no test id yet.
    MissingTest { node: NodeId },
    /// A `value` node has no number yet.
    MissingValue { node: NodeId },
    /// A node's child count is outside its kind's bounds.
    ArityViolation { node: NodeId, count: usize },
    /// A child id is not present in the arena (tree corruption).
    UnknownNode { node: NodeId },
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placeholder { node } => {
                write!(f, "node {node} is a placeholder and cannot be serialized")
            }
            Self::MissingTest { node } => {
                write!(f, "test-result node {node} has no test assigned")
            }
            Self::MissingValue { node } => write!(f, "value node {node} has no number assigned"),
            Self::ArityViolation { node, count } => {
                write!(f, "node {node} has an out-of-bounds child count {count}")
            }
            Self::UnknownNode { node } => write!(f, "node {node} is not present in the arena"),
        }
    }
}

impl std::error::Error for SerializeError {}

/// Live, editable score-expression tree with undo/redo.
pub struct ScoreAst {
    pub(crate) nodes: BTreeMap<NodeId, AstNode>,
    pub(crate) root: NodeId,
    pub(crate) ids: NodeIdGen,
    pub(crate) history: EditHistory,
    pub(crate) on_root_changed: Option<RootChangedFn>,
}

impl fmt::Debug for ScoreAst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoreAst")
            .field("root", &self.root)
            .field("arena_len", &self.nodes.len())
            .field("node_count", &self.node_count())
            .field("history", &self.history)
            .finish()
    }
}

impl Default for ScoreAst {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreAst {
    /// Empty session: a lone placeholder root awaiting content.
    #[must_use]
    pub fn new() -> Self {
        let mut session = Self::bare();
        let root = session.insert_node(NodeBody::Placeholder, Vec::new());
        session.adopt_root(root);
        session
    }

    /// Build a session from a persisted configuration.
    ///
    /// Never fails: malformed regions degrade to placeholders (see
    /// [`crate::builder`]).
    #[must_use]
    pub fn from_value(raw: &Value) -> Self {
        let mut session = Self::bare();
        let root = session.build_subtree(raw);
        session.adopt_root(root);
        session
    }

    /// Build a session from a typed wire expression.
    #[must_use]
    pub fn from_expr(expr: &ScoreExpr) -> Self {
        let raw = serde_json::to_value(expr).unwrap_or(Value::Null);
        Self::from_value(&raw)
    }

    /// Parse JSON text and build a session from it.
    ///
    /// Only text that is not JSON at all is an error; a structurally
    /// malformed configuration still builds, with placeholders.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(&raw))
    }

    /// Replace the history configuration (useful right after construction;
    /// prior snapshots are discarded and the current state re-seeded).
    #[must_use]
    pub fn with_history_config(mut self, config: HistoryConfig) -> Self {
        let op = self.history.current().map_or(EditOp::Load, |e| e.op);
        self.history = EditHistory::new(config);
        self.history.push(self.root, op);
        self
    }

    /// Install the root-changed observer.
    ///
    /// The observer fires on every mutation that reaches the root holder;
    /// undo/redo restore roots directly and do not fire it.
    pub fn set_root_observer(&mut self, observer: impl FnMut(NodeId, NodeId) + 'static) {
        self.on_root_changed = Some(Box::new(observer));
    }

    fn bare() -> Self {
        Self {
            nodes: BTreeMap::new(),
            root: NodeId::new(0),
            ids: NodeIdGen::default(),
            history: EditHistory::with_default_config(),
            on_root_changed: None,
        }
    }

    fn adopt_root(&mut self, root: NodeId) {
        if let Some(node) = self.nodes.get_mut(&root) {
            node.parent = Some(ParentLink::Root);
        }
        self.root = root;
        self.history.push(root, EditOp::Load);
    }

    pub(crate) fn insert_node(&mut self, body: NodeBody, children: Vec<NodeId>) -> NodeId {
        let id = self.ids.next_id();
        self.nodes.insert(
            id,
            AstNode {
                id,
                parent: None,
                body,
                children,
            },
        );
        id
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Root of the current tree.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node by id (current or superseded).
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes in the current tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Depth-first (preorder) iteration over the current tree.
    pub fn iter(&self) -> TreeIter<'_> {
        TreeIter {
            ast: self,
            stack: vec![self.root],
        }
    }

    /// Whether `id` is reachable from the current root by parent links.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.chain_top(id) == Some(self.root)
    }

    /// Topmost ancestor of `id`: the current root, or the top of a
    /// detached chain. `None` for unknown ids or corrupt parent chains.
    pub(crate) fn chain_top(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        // The hop budget bounds traversal even over a corrupt cyclic chain.
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(&current)?;
            match node.parent {
                None => return Some(current),
                Some(ParentLink::Root) => {
                    return if current == self.root { Some(current) } else { None };
                }
                Some(ParentLink::Node(parent)) => current = parent,
            }
        }
        None
    }

    pub(crate) fn is_placeholder(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(AstNode::is_placeholder)
    }

    // ========================================================================
    // Validity
    // ========================================================================

    /// Whether one node satisfies its own contract: child count within the
    /// kind's bounds, no direct placeholder child, leaf payload present.
    /// Placeholders are never valid.
    #[must_use]
    pub fn is_node_valid(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let kind = node.kind();
        let count = node.children.len();
        if count < kind.min_children() {
            return false;
        }
        if let Some(max) = kind.max_children()
            && count > max
        {
            return false;
        }
        if node.children.iter().any(|child| self.is_placeholder(*child)) {
            return false;
        }
        match node.body {
            NodeBody::Placeholder => false,
            NodeBody::TestResult { test } => test.is_some(),
            NodeBody::Value { value } => value.is_some(),
            NodeBody::Func { .. } => true,
        }
    }

    /// Whether every node of the current tree is valid, the gate for
    /// serialization.
    #[must_use]
    pub fn is_tree_valid(&self) -> bool {
        self.iter().all(|node| self.is_node_valid(node.id))
    }

    /// Kind/payload/child-order equality between two subtrees, ignoring
    /// node identities.
    #[must_use]
    pub fn structural_eq(&self, a: NodeId, b: NodeId) -> bool {
        let (Some(na), Some(nb)) = (self.nodes.get(&a), self.nodes.get(&b)) else {
            return false;
        };
        na.body == nb.body
            && na.children.len() == nb.children.len()
            && na
                .children
                .iter()
                .zip(&nb.children)
                .all(|(ca, cb)| self.structural_eq(*ca, *cb))
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Serialize the current tree into its wire form.
    ///
    /// Fails on the first placeholder, missing payload, or arity violation
    /// found; the error names the offending node so a UI can highlight it.
    pub fn to_expr(&self) -> Result<ScoreExpr, SerializeError> {
        self.serialize_node(self.root, true)
    }

    /// Serialize into a JSON value.
    pub fn to_value(&self) -> Result<Value, SerializeError> {
        let expr = self.to_expr()?;
        Ok(serde_json::to_value(&expr).unwrap_or(Value::Null))
    }

    fn serialize_node(&self, id: NodeId, at_root: bool) -> Result<ScoreExpr, SerializeError> {
        let node = self
            .nodes
            .get(&id)
            .ok_or(SerializeError::UnknownNode { node: id })?;
        let kind = node.kind();
        let count = node.children.len();
        if count < kind.min_children()
            || kind.max_children().is_some_and(|max| count > max)
        {
            return Err(SerializeError::ArityViolation { node: id, count });
        }
        match &node.body {
            NodeBody::Placeholder => Err(SerializeError::Placeholder { node: id }),
            NodeBody::TestResult { test } => match test {
                Some(test) => Ok(ScoreExpr::test(*test)),
                None => Err(SerializeError::MissingTest { node: id }),
            },
            NodeBody::Value { value } => match value {
                // The bare-number shorthand applies everywhere except at
                // the root, where the object form keeps the type explicit.
                Some(v) if at_root => Ok(ScoreExpr::value(*v)),
                Some(v) => Ok(ScoreExpr::literal(*v)),
                None => Err(SerializeError::MissingValue { node: id }),
            },
            NodeBody::Func { op } => {
                let children = node
                    .children
                    .iter()
                    .map(|child| self.serialize_node(*child, false))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(ScoreExpr::call(*op, children))
            }
        }
    }

    // ========================================================================
    // Undo / redo
    // ========================================================================

    /// Whether a prior tree state can be restored.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether an undone tree state can be restored.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one tree state; reports the restored root.
    pub fn undo(&mut self) -> Option<NodeId> {
        let root = self.history.undo()?;
        self.restore_root(root);
        tracing::debug!(root = root.get(), "undo");
        Some(root)
    }

    /// Step forward one tree state; reports the restored root.
    pub fn redo(&mut self) -> Option<NodeId> {
        let root = self.history.redo()?;
        self.restore_root(root);
        tracing::debug!(root = root.get(), "redo");
        Some(root)
    }

    /// History inspection (depths, edit labels).
    #[must_use]
    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    /// Latest history entry, labelling how the current state came to be.
    #[must_use]
    pub fn current_entry(&self) -> Option<HistoryEntry> {
        self.history.current()
    }

    /// Swap the current root for a historic one and re-bind parent links
    /// along the restored tree. Shared subtrees may have been re-pointed
    /// at clones by later edits; after this walk every parent link matches
    /// the structure reachable from `new_root` again.
    fn restore_root(&mut self, new_root: NodeId) {
        let old_root = self.root;
        if let Some(node) = self.nodes.get_mut(&old_root) {
            node.parent = None;
        }
        self.root = new_root;
        if let Some(node) = self.nodes.get_mut(&new_root) {
            node.parent = Some(ParentLink::Root);
        }
        let mut stack = vec![new_root];
        while let Some(id) = stack.pop() {
            let children = match self.nodes.get(&id) {
                Some(node) => node.children.clone(),
                None => continue,
            };
            for child in children {
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.parent = Some(ParentLink::Node(id));
                }
                stack.push(child);
            }
        }
    }
}

/// Depth-first (preorder) iterator over the current tree.
pub struct TreeIter<'a> {
    ast: &'a ScoreAst,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a AstNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            if let Some(node) = self.ast.nodes.get(&id) {
                for child in node.children.iter().rev() {
                    self.stack.push(*child);
                }
                return Some(node);
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
