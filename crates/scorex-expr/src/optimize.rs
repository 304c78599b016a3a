#![forbid(unsafe_code)]

//! Peephole simplification of serialized score expressions.
//!
//! [`optimize`] walks the tree bottom-up and applies a fixed, ordered rule
//! table to each node. At most one rule fires per node per call, so a
//! single pass may leave further opportunities behind; [`simplify`]
//! composes folding and optimization until nothing changes.
//!
//! Rule order:
//!
//! 1. `sub(x, 0)` → `x`
//! 2. `sub(0, x)` → `neg(x)`
//! 3. `div(x, 0)` → `0`
//! 4. `div(x, 1)` → `x`
//! 5. `neg(neg(x))` → `x`
//! 6. `clamp(clamp(x))` → `clamp(x)`
//! 7. `sum`: drop literal-0 children
//! 8. `mul` containing a literal 0 → `0`
//! 9. `mul`: drop literal-1 children
//! 10. variadic node with exactly one child → that child

use crate::expr::ScoreExpr;
use crate::fold::fold_constants;
use crate::op::FuncOp;

/// One bottom-up optimization pass; children are rewritten before their
/// parent's rules are tested.
#[must_use]
pub fn optimize(expr: ScoreExpr) -> ScoreExpr {
    let node = match expr {
        ScoreExpr::Literal(_) => return expr,
        ScoreExpr::Node(node) => node,
    };
    let (op, children) = match node.into_call() {
        Ok(call) => call,
        Err(leaf) => return ScoreExpr::Node(leaf),
    };
    let children: Vec<ScoreExpr> = children.into_iter().map(optimize).collect();
    rewrite(op, children)
}

/// Fold and optimize to a fixed point.
///
/// Terminates because every effective rewrite strictly shrinks the tree:
/// the pass count is bounded by the starting node count.
#[must_use]
pub fn simplify(expr: ScoreExpr) -> ScoreExpr {
    let mut current = expr;
    let mut budget = current.node_count() + 1;
    while budget > 0 {
        budget -= 1;
        let next = optimize(fold_constants(current.clone()));
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Apply the first matching rule for `op` over already-optimized children.
fn rewrite(op: FuncOp, mut children: Vec<ScoreExpr>) -> ScoreExpr {
    match op {
        FuncOp::Sub if children.len() == 2 => {
            if is_const(&children[1], 0.0) {
                return children.swap_remove(0);
            }
            if is_const(&children[0], 0.0) {
                let operand = children.swap_remove(1);
                return ScoreExpr::call(FuncOp::Neg, vec![operand]);
            }
        }
        FuncOp::Div if children.len() == 2 => {
            if is_const(&children[1], 0.0) {
                return ScoreExpr::literal(0.0);
            }
            if is_const(&children[1], 1.0) {
                return children.swap_remove(0);
            }
        }
        FuncOp::Neg if children.len() == 1 => {
            if children[0].op() == Some(FuncOp::Neg) && children[0].children().len() == 1 {
                if let ScoreExpr::Node(outer) = children.swap_remove(0)
                    && let Ok((_, mut inner_children)) = outer.into_call()
                {
                    return inner_children.swap_remove(0);
                }
            }
        }
        FuncOp::Clamp if children.len() == 1 => {
            if children[0].op() == Some(FuncOp::Clamp) {
                return children.swap_remove(0);
            }
        }
        FuncOp::Sum => {
            if children.iter().any(|c| is_const(c, 0.0)) {
                children.retain(|c| !is_const(c, 0.0));
                if children.is_empty() {
                    return ScoreExpr::literal(0.0);
                }
                return ScoreExpr::call(FuncOp::Sum, children);
            }
            if children.len() == 1 {
                return children.swap_remove(0);
            }
        }
        FuncOp::Mul => {
            if children.iter().any(|c| is_const(c, 0.0)) {
                return ScoreExpr::literal(0.0);
            }
            if children.iter().any(|c| is_const(c, 1.0)) {
                children.retain(|c| !is_const(c, 1.0));
                if children.is_empty() {
                    return ScoreExpr::literal(1.0);
                }
                return ScoreExpr::call(FuncOp::Mul, children);
            }
            if children.len() == 1 {
                return children.swap_remove(0);
            }
        }
        FuncOp::Avg | FuncOp::Max | FuncOp::Min => {
            if children.len() == 1 {
                return children.swap_remove(0);
            }
        }
        _ => {}
    }
    ScoreExpr::call(op, children)
}

fn is_const(expr: &ScoreExpr, value: f64) -> bool {
    expr.constant_value() == Some(value)
}

// ============================================================================
// Tests
// ============================================================================
