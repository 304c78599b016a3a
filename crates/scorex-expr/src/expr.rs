#![forbid(unsafe_code)]

//! Typed model of the serialized score-configuration wire format.
//!
//! The wire format is a JSON-compatible tree:
//!
//! - A bare number is shorthand for a literal value node.
//! - Anything else is an object `{"type": <kind>, ...}` where function kinds
//!   carry `"children"`, `test-result` carries `"test"` and `value` carries
//!   `"value"`.
//!
//! The bare-number shorthand is a size optimization in persisted
//! configurations: a `value` node only keeps its object form at the root,
//! where there is no parent to make the shorthand unambiguous. Both forms
//! round-trip through this model unchanged.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::op::FuncOp;

/// Identifier of an exercise test referenced by a `test-result` node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct TestId(u64);

impl TestId {
    /// Wrap a raw test id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One node of a serialized score expression.
///
/// Deserialization tries the bare-number shorthand first, then the tagged
/// object form. Unknown tags fail strict parsing here; lenient recovery is
/// the job of the live-tree builder, which degrades malformed regions to
/// placeholders instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScoreExpr {
    /// Bare-number shorthand for a literal value node.
    Literal(f64),
    /// Tagged object form.
    Node(ExprNode),
}

impl Serialize for ScoreExpr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Integer-valued literals keep their integer spelling so
            // re-serialized configurations match what servers persisted.
            Self::Literal(n) => {
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Self::Node(node) => node.serialize(serializer),
        }
    }
}

/// Object-form node, dispatched on its `"type"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ExprNode {
    Avg {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Clamp {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Div {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Max {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Min {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Mul {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Neg {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Sub {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    Sum {
        #[serde(default)]
        children: Vec<ScoreExpr>,
    },
    TestResult {
        test: TestId,
    },
    Value {
        value: f64,
    },
}

impl ExprNode {
    /// Build the object form of a function node.
    #[must_use]
    pub fn call(op: FuncOp, children: Vec<ScoreExpr>) -> Self {
        match op {
            FuncOp::Avg => Self::Avg { children },
            FuncOp::Clamp => Self::Clamp { children },
            FuncOp::Div => Self::Div { children },
            FuncOp::Max => Self::Max { children },
            FuncOp::Min => Self::Min { children },
            FuncOp::Mul => Self::Mul { children },
            FuncOp::Neg => Self::Neg { children },
            FuncOp::Sub => Self::Sub { children },
            FuncOp::Sum => Self::Sum { children },
        }
    }

    /// Operator of a function node, `None` for leaves.
    #[must_use]
    pub const fn op(&self) -> Option<FuncOp> {
        match self {
            Self::Avg { .. } => Some(FuncOp::Avg),
            Self::Clamp { .. } => Some(FuncOp::Clamp),
            Self::Div { .. } => Some(FuncOp::Div),
            Self::Max { .. } => Some(FuncOp::Max),
            Self::Min { .. } => Some(FuncOp::Min),
            Self::Mul { .. } => Some(FuncOp::Mul),
            Self::Neg { .. } => Some(FuncOp::Neg),
            Self::Sub { .. } => Some(FuncOp::Sub),
            Self::Sum { .. } => Some(FuncOp::Sum),
            Self::TestResult { .. } | Self::Value { .. } => None,
        }
    }

    /// Children of a function node; empty for leaves.
    #[must_use]
    pub fn children(&self) -> &[ScoreExpr] {
        match self {
            Self::Avg { children }
            | Self::Clamp { children }
            | Self::Div { children }
            | Self::Max { children }
            | Self::Min { children }
            | Self::Mul { children }
            | Self::Neg { children }
            | Self::Sub { children }
            | Self::Sum { children } => children,
            Self::TestResult { .. } | Self::Value { .. } => &[],
        }
    }

    /// Destructure a function node into `(op, children)`; leaves come back
    /// unchanged as the error value.
    pub fn into_call(self) -> Result<(FuncOp, Vec<ScoreExpr>), Self> {
        match self {
            Self::Avg { children } => Ok((FuncOp::Avg, children)),
            Self::Clamp { children } => Ok((FuncOp::Clamp, children)),
            Self::Div { children } => Ok((FuncOp::Div, children)),
            Self::Max { children } => Ok((FuncOp::Max, children)),
            Self::Min { children } => Ok((FuncOp::Min, children)),
            Self::Mul { children } => Ok((FuncOp::Mul, children)),
            Self::Neg { children } => Ok((FuncOp::Neg, children)),
            Self::Sub { children } => Ok((FuncOp::Sub, children)),
            Self::Sum { children } => Ok((FuncOp::Sum, children)),
            leaf @ (Self::TestResult { .. } | Self::Value { .. }) => Err(leaf),
        }
    }
}

impl ScoreExpr {
    /// Bare-number literal.
    #[must_use]
    pub const fn literal(value: f64) -> Self {
        Self::Literal(value)
    }

    /// Object-form `value` node (the root spelling of a literal).
    #[must_use]
    pub const fn value(value: f64) -> Self {
        Self::Node(ExprNode::Value { value })
    }

    /// A `test-result` reference.
    #[must_use]
    pub const fn test(test: TestId) -> Self {
        Self::Node(ExprNode::TestResult { test })
    }

    /// A function application.
    #[must_use]
    pub fn call(op: FuncOp, children: Vec<ScoreExpr>) -> Self {
        Self::Node(ExprNode::call(op, children))
    }

    /// Numeric value of a constant node (bare literal or object-form
    /// `value`), `None` for anything symbolic.
    #[must_use]
    pub const fn constant_value(&self) -> Option<f64> {
        match self {
            Self::Literal(n) => Some(*n),
            Self::Node(ExprNode::Value { value }) => Some(*value),
            Self::Node(_) => None,
        }
    }

    /// Whether this node is a numeric constant.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        self.constant_value().is_some()
    }

    /// Operator when this is a function node.
    #[must_use]
    pub const fn op(&self) -> Option<FuncOp> {
        match self {
            Self::Literal(_) => None,
            Self::Node(node) => node.op(),
        }
    }

    /// Children of a function node; empty for constants and leaves.
    #[must_use]
    pub fn children(&self) -> &[ScoreExpr] {
        match self {
            Self::Literal(_) => &[],
            Self::Node(node) => node.children(),
        }
    }

    /// Total number of nodes in this expression.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }

    /// Evaluate the expression against per-test results.
    ///
    /// A `test-result` whose id is absent from `results` evaluates to 0;
    /// the operator rules keep everything else total, so this never fails.
    #[must_use]
    pub fn evaluate(&self, results: &BTreeMap<TestId, f64>) -> f64 {
        match self {
            Self::Literal(n) => *n,
            Self::Node(ExprNode::Value { value }) => *value,
            Self::Node(ExprNode::TestResult { test }) => {
                results.get(test).copied().unwrap_or(0.0)
            }
            Self::Node(node) => {
                let args: Vec<f64> = node
                    .children()
                    .iter()
                    .map(|child| child.evaluate(results))
                    .collect();
                match node.op() {
                    Some(op) => op.apply(&args),
                    None => 0.0,
                }
            }
        }
    }

    /// Parse a serialized configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Render the configuration as JSON text.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for ScoreExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(n) => write!(f, "{n}"),
            Self::Node(node) => write!(f, "{node}"),
        }
    }
}

impl fmt::Display for ExprNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TestResult { test } => write!(f, "test({test})"),
            Self::Value { value } => write!(f, "value({value})"),
            _ => {
                let op = self.op();
                let tag = op.map_or("?", FuncOp::tag);
                write!(f, "{tag}(")?;
                for (index, child) in self.children().iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
