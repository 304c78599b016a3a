#![forbid(unsafe_code)]

//! Node identities, kinds, and bodies for the live score-expression tree.
//!
//! Live nodes are value types stored in a [`ScoreAst`](crate::ScoreAst)
//! arena and referenced by [`NodeId`]. Identity is the unit of change
//! tracking: the mutation protocol never edits a node in place, it clones
//! the node under a fresh id, so holding an id from a previous tree state
//! keeps denoting exactly that state.

use std::fmt;

use scorex_expr::{FuncOp, TestId};

/// Process-unique identifier for live AST nodes.
///
/// Issued by a per-session monotonic generator and never reused, so ids
/// from superseded tree states stay distinguishable from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value, for diagnostics.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id generator owned by a tree session.
///
/// Deliberately not global: two sessions in the same process issue
/// overlapping ids, but ids never cross session boundaries.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeIdGen {
    next: u64,
}

impl NodeIdGen {
    pub(crate) fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Link from a node to its structural owner.
///
/// Purely navigational; ownership always flows downward from parent to
/// children. Parent links are only meaningful within the *current* tree;
/// nodes kept alive solely by undo history may carry stale links until
/// their root is restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLink {
    /// Owned by another node.
    Node(NodeId),
    /// This node is the current root, held by the synthetic root holder.
    Root,
}

/// Kind tag of a live node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Function application of one operator.
    Func(FuncOp),
    /// Reference to one test's result.
    TestResult,
    /// Numeric literal.
    Value,
    /// Vacant slot awaiting a real node; never serializable.
    Placeholder,
}

/// Coarse editing category of a node kind, used by editors to pick the
/// applicable dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericClass {
    Function,
    Test,
    Literal,
}

impl NodeKind {
    /// Wire tag for this kind (placeholders report `"placeholder"` even
    /// though the wire format never contains one).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Func(op) => op.tag(),
            Self::TestResult => "test-result",
            Self::Value => "value",
            Self::Placeholder => "placeholder",
        }
    }

    /// Parse a wire tag; placeholders are not part of the wire format and
    /// do not parse.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "test-result" => Some(Self::TestResult),
            "value" => Some(Self::Value),
            _ => FuncOp::from_tag(tag).map(Self::Func),
        }
    }

    /// Minimum number of children.
    #[must_use]
    pub const fn min_children(self) -> usize {
        match self {
            Self::Func(op) => op.min_children(),
            Self::TestResult | Self::Value | Self::Placeholder => 0,
        }
    }

    /// Maximum number of children (`None` = unbounded).
    #[must_use]
    pub const fn max_children(self) -> Option<usize> {
        match self {
            Self::Func(op) => op.max_children(),
            Self::TestResult | Self::Value | Self::Placeholder => Some(0),
        }
    }

    /// Whether child order is semantically irrelevant.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        match self {
            Self::Func(op) => op.is_commutative(),
            Self::TestResult | Self::Value | Self::Placeholder => false,
        }
    }

    /// Editing category; placeholders have none.
    #[must_use]
    pub const fn generic_class(self) -> Option<GenericClass> {
        match self {
            Self::Func(_) => Some(GenericClass::Function),
            Self::TestResult => Some(GenericClass::Test),
            Self::Value => Some(GenericClass::Literal),
            Self::Placeholder => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Kind-specific payload of a live node.
///
/// Leaf payloads are nullable: an editor creates a `test-result` or
/// `value` node first and fills the payload in a separate step. A node
/// with a missing payload is not valid and blocks serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeBody {
    Func { op: FuncOp },
    TestResult { test: Option<TestId> },
    Value { value: Option<f64> },
    Placeholder,
}

impl NodeBody {
    /// Kind tag of this body.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Func { op } => NodeKind::Func(*op),
            Self::TestResult { .. } => NodeKind::TestResult,
            Self::Value { .. } => NodeKind::Value,
            Self::Placeholder => NodeKind::Placeholder,
        }
    }

    /// Function-application body.
    #[must_use]
    pub const fn func(op: FuncOp) -> Self {
        Self::Func { op }
    }

    /// Test-result body, payload optional.
    #[must_use]
    pub const fn test(test: Option<TestId>) -> Self {
        Self::TestResult { test }
    }

    /// Literal body, payload optional.
    #[must_use]
    pub const fn value(value: Option<f64>) -> Self {
        Self::Value { value }
    }
}

/// A live node owned by a [`ScoreAst`](crate::ScoreAst) arena.
#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<ParentLink>,
    pub(crate) body: NodeBody,
    pub(crate) children: Vec<NodeId>,
}

impl AstNode {
    /// This node's identity.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Structural owner; `None` for detached (staged or abandoned) nodes.
    #[must_use]
    pub const fn parent(&self) -> Option<ParentLink> {
        self.parent
    }

    /// Kind-specific payload.
    #[must_use]
    pub const fn body(&self) -> &NodeBody {
        &self.body
    }

    /// Kind tag.
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    /// Ordered child ids.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Test id payload of a `test-result` node.
    #[must_use]
    pub const fn test(&self) -> Option<TestId> {
        match self.body {
            NodeBody::TestResult { test } => test,
            _ => None,
        }
    }

    /// Numeric payload of a `value` node.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self.body {
            NodeBody::Value { value } => value,
            _ => None,
        }
    }

    /// Whether this node is a placeholder.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self.body, NodeBody::Placeholder)
    }
}

// ============================================================================
// Tests
// ============================================================================
