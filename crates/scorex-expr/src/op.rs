#![forbid(unsafe_code)]

//! Function-node operators and their evaluation rules.
//!
//! Every non-leaf node of a score expression applies one [`FuncOp`] to its
//! children. The operator determines the arity bounds, whether child order
//! is significant, and how the node evaluates once its arguments are known.
//!
//! Evaluation is **total**: degenerate input is defined numerically
//! (division by zero is 0, missing arguments default to 0) so a score
//! configuration always evaluates to *some* number and scoring never fails
//! at grading time.

use serde::{Deserialize, Serialize};

/// Operator of a function node in a score expression.
///
/// The serde representation matches the wire tags used in persisted
/// configurations (`"avg"`, `"clamp"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FuncOp {
    /// Arithmetic mean of the children.
    Avg,
    /// Clamp the single child into `[0, 1]`.
    Clamp,
    /// First child divided by the second; division by zero yields 0.
    Div,
    /// Largest child.
    Max,
    /// Smallest child.
    Min,
    /// Product of the children.
    Mul,
    /// Negation of the single child.
    Neg,
    /// First child minus the second.
    Sub,
    /// Total of the children.
    Sum,
}

impl FuncOp {
    /// All operators, in tag order.
    pub const ALL: [Self; 9] = [
        Self::Avg,
        Self::Clamp,
        Self::Div,
        Self::Max,
        Self::Min,
        Self::Mul,
        Self::Neg,
        Self::Sub,
        Self::Sum,
    ];

    /// Wire tag for this operator.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Avg => "avg",
            Self::Clamp => "clamp",
            Self::Div => "div",
            Self::Max => "max",
            Self::Min => "min",
            Self::Mul => "mul",
            Self::Neg => "neg",
            Self::Sub => "sub",
            Self::Sum => "sum",
        }
    }

    /// Parse a wire tag, `None` for anything outside the closed set.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.tag() == tag)
    }

    /// Minimum number of children.
    #[must_use]
    pub const fn min_children(self) -> usize {
        match self {
            Self::Clamp | Self::Neg => 1,
            Self::Div | Self::Sub => 2,
            Self::Avg | Self::Max | Self::Min | Self::Mul | Self::Sum => 1,
        }
    }

    /// Maximum number of children (`None` = unbounded).
    #[must_use]
    pub const fn max_children(self) -> Option<usize> {
        match self {
            Self::Clamp | Self::Neg => Some(1),
            Self::Div | Self::Sub => Some(2),
            Self::Avg | Self::Max | Self::Min | Self::Mul | Self::Sum => None,
        }
    }

    /// Whether child order is semantically irrelevant.
    ///
    /// Commutative operators may shed surplus slots cleanly; order-sensitive
    /// ones must preserve positions with placeholders.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        !matches!(self, Self::Clamp | Self::Div | Self::Neg | Self::Sub)
    }

    /// Apply the operator to already-evaluated arguments.
    #[must_use]
    pub fn apply(self, args: &[f64]) -> f64 {
        match self {
            Self::Avg => {
                if args.is_empty() {
                    0.0
                } else {
                    args.iter().sum::<f64>() / args.len() as f64
                }
            }
            Self::Clamp => nth(args, 0).max(0.0).min(1.0),
            Self::Div => {
                let divisor = nth(args, 1);
                if divisor == 0.0 {
                    0.0
                } else {
                    nth(args, 0) / divisor
                }
            }
            Self::Max => args.iter().copied().reduce(f64::max).unwrap_or(0.0),
            Self::Min => args.iter().copied().reduce(f64::min).unwrap_or(0.0),
            Self::Mul => args.iter().product(),
            Self::Neg => -nth(args, 0),
            Self::Sub => nth(args, 0) - nth(args, 1),
            Self::Sum => args.iter().sum(),
        }
    }
}

/// Argument at `index`, defaulting to 0 so evaluation stays total.
fn nth(args: &[f64], index: usize) -> f64 {
    args.get(index).copied().unwrap_or(0.0)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for op in FuncOp::ALL {
            assert_eq!(FuncOp::from_tag(op.tag()), Some(op));
        }
        assert_eq!(FuncOp::from_tag("bogus-kind"), None);
        assert_eq!(FuncOp::from_tag("test-result"), None);
    }

    #[test]
    fn serde_uses_wire_tags() {
        let json = serde_json::to_string(&FuncOp::Sub).unwrap();
        assert_eq!(json, "\"sub\"");
        let parsed: FuncOp = serde_json::from_str("\"avg\"").unwrap();
        assert_eq!(parsed, FuncOp::Avg);
    }

    #[test]
    fn arity_table() {
        assert_eq!(FuncOp::Clamp.min_children(), 1);
        assert_eq!(FuncOp::Clamp.max_children(), Some(1));
        assert_eq!(FuncOp::Neg.max_children(), Some(1));
        assert_eq!(FuncOp::Div.min_children(), 2);
        assert_eq!(FuncOp::Sub.max_children(), Some(2));
        for op in [FuncOp::Avg, FuncOp::Max, FuncOp::Min, FuncOp::Mul, FuncOp::Sum] {
            assert_eq!(op.min_children(), 1);
            assert_eq!(op.max_children(), None);
        }
    }

    #[test]
    fn commutativity_table() {
        for op in [FuncOp::Avg, FuncOp::Max, FuncOp::Min, FuncOp::Mul, FuncOp::Sum] {
            assert!(op.is_commutative());
        }
        for op in [FuncOp::Clamp, FuncOp::Div, FuncOp::Neg, FuncOp::Sub] {
            assert!(!op.is_commutative());
        }
    }

    #[test]
    fn avg_of_empty_is_zero() {
        assert_eq!(FuncOp::Avg.apply(&[]), 0.0);
        assert_eq!(FuncOp::Avg.apply(&[1.0, 2.0, 6.0]), 3.0);
    }

    #[test]
    fn clamp_bounds() {
        assert_eq!(FuncOp::Clamp.apply(&[1.5]), 1.0);
        assert_eq!(FuncOp::Clamp.apply(&[-0.5]), 0.0);
        assert_eq!(FuncOp::Clamp.apply(&[0.25]), 0.25);
    }

    #[test]
    fn division_by_zero_is_zero() {
        assert_eq!(FuncOp::Div.apply(&[5.0, 0.0]), 0.0);
        assert_eq!(FuncOp::Div.apply(&[5.0, 2.0]), 2.5);
    }

    #[test]
    fn min_max_handle_negatives() {
        assert_eq!(FuncOp::Max.apply(&[-3.0, -7.0]), -3.0);
        assert_eq!(FuncOp::Min.apply(&[-3.0, -7.0]), -7.0);
    }

    #[test]
    fn missing_arguments_default_to_zero() {
        assert_eq!(FuncOp::Sub.apply(&[4.0]), 4.0);
        assert_eq!(FuncOp::Neg.apply(&[]), -0.0);
        assert_eq!(FuncOp::Div.apply(&[]), 0.0);
    }

    #[test]
    fn product_and_total() {
        assert_eq!(FuncOp::Mul.apply(&[2.0, 3.0, 4.0]), 24.0);
        assert_eq!(FuncOp::Sum.apply(&[2.0, 3.0, 4.0]), 9.0);
        assert_eq!(FuncOp::Mul.apply(&[]), 1.0);
        assert_eq!(FuncOp::Sum.apply(&[]), 0.0);
    }
}
