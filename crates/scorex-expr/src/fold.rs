#![forbid(unsafe_code)]

//! Constant folding over serialized score expressions.
//!
//! [`fold_constants`] collapses any subtree whose children are all numeric
//! constants into a single literal, using the operator rules from
//! [`FuncOp::apply`]. Commutative variadic operators additionally fold a
//! constant *subset* of their children into one literal while leaving the
//! symbolic rest in place.
//!
//! Folding is idempotent: after one pass, no node has two or more constant
//! children under a commutative operator and no node is fully constant, so
//! a second pass changes nothing.

use crate::expr::{ExprNode, ScoreExpr};
use crate::op::FuncOp;

/// Fold constant subtrees into literals, bottom-up.
///
/// An object-form `value` node is itself a constant and folds to its
/// bare-number spelling. Division by zero folds to 0, matching the
/// evaluation rules.
#[must_use]
pub fn fold_constants(expr: ScoreExpr) -> ScoreExpr {
    let node = match expr {
        ScoreExpr::Literal(_) => return expr,
        ScoreExpr::Node(ExprNode::Value { value }) => return ScoreExpr::Literal(value),
        ScoreExpr::Node(node) => node,
    };
    let (op, children) = match node.into_call() {
        Ok(call) => call,
        Err(leaf) => return ScoreExpr::Node(leaf),
    };

    let children: Vec<ScoreExpr> = children.into_iter().map(fold_constants).collect();

    // Fully constant: evaluate in place, preserving argument order.
    let constants: Option<Vec<f64>> = children.iter().map(ScoreExpr::constant_value).collect();
    if let Some(args) = constants {
        return ScoreExpr::Literal(op.apply(&args));
    }

    // Partially constant: only commutative operators may combine a subset.
    if op.is_commutative() {
        let constant_count = children.iter().filter(|c| c.is_constant()).count();
        if constant_count >= 2 {
            let mut symbolic = Vec::with_capacity(children.len() - constant_count + 1);
            let mut args = Vec::with_capacity(constant_count);
            for child in children {
                match child.constant_value() {
                    Some(n) => args.push(n),
                    None => symbolic.push(child),
                }
            }
            symbolic.push(ScoreExpr::Literal(op.apply(&args)));
            return ScoreExpr::call(op, symbolic);
        }
    }

    ScoreExpr::call(op, children)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::TestId;

    fn lit(n: f64) -> ScoreExpr {
        ScoreExpr::literal(n)
    }

    fn test(id: u64) -> ScoreExpr {
        ScoreExpr::test(TestId::new(id))
    }

    #[test]
    fn fully_constant_tree_folds_to_one_literal() {
        let expr = ScoreExpr::call(
            FuncOp::Sub,
            vec![
                ScoreExpr::call(FuncOp::Mul, vec![lit(2.0), lit(3.0)]),
                lit(1.0),
            ],
        );
        assert_eq!(fold_constants(expr), lit(5.0));
    }

    #[test]
    fn division_by_zero_folds_to_zero() {
        let expr = ScoreExpr::call(FuncOp::Div, vec![lit(5.0), lit(0.0)]);
        assert_eq!(fold_constants(expr), lit(0.0));
    }

    #[test]
    fn value_node_folds_to_bare_literal() {
        assert_eq!(fold_constants(ScoreExpr::value(0.5)), lit(0.5));
    }

    #[test]
    fn partial_fold_combines_constants_after_symbolic_children() {
        let expr = ScoreExpr::call(FuncOp::Sum, vec![lit(1.0), test(1), lit(4.0)]);
        let folded = fold_constants(expr);
        assert_eq!(folded, ScoreExpr::call(FuncOp::Sum, vec![test(1), lit(5.0)]));
    }

    #[test]
    fn partial_fold_skips_non_commutative_operators() {
        // sub is order-sensitive; a partial fold would scramble positions.
        let expr = ScoreExpr::call(FuncOp::Sub, vec![test(1), lit(3.0)]);
        assert_eq!(
            fold_constants(expr.clone()),
            expr,
            "symbolic sub must stay untouched"
        );
    }

    #[test]
    fn single_constant_among_symbolic_children_is_left_alone() {
        let expr = ScoreExpr::call(FuncOp::Sum, vec![test(1), lit(4.0)]);
        assert_eq!(fold_constants(expr.clone()), expr);
    }

    #[test]
    fn partial_fold_uses_operator_rules() {
        let expr = ScoreExpr::call(FuncOp::Mul, vec![lit(2.0), test(1), lit(3.0)]);
        assert_eq!(
            fold_constants(expr),
            ScoreExpr::call(FuncOp::Mul, vec![test(1), lit(6.0)])
        );

        let expr = ScoreExpr::call(FuncOp::Min, vec![lit(2.0), test(1), lit(-3.0)]);
        assert_eq!(
            fold_constants(expr),
            ScoreExpr::call(FuncOp::Min, vec![test(1), lit(-3.0)])
        );
    }

    #[test]
    fn folding_is_idempotent() {
        let exprs = [
            ScoreExpr::call(FuncOp::Sum, vec![lit(1.0), test(1), lit(4.0)]),
            ScoreExpr::call(FuncOp::Div, vec![test(1), lit(0.0)]),
            ScoreExpr::call(
                FuncOp::Avg,
                vec![test(1), ScoreExpr::call(FuncOp::Clamp, vec![lit(7.0)])],
            ),
        ];
        for expr in exprs {
            let once = fold_constants(expr);
            let twice = fold_constants(once.clone());
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_results_block_folding() {
        let expr = ScoreExpr::call(FuncOp::Clamp, vec![test(1)]);
        assert_eq!(fold_constants(expr.clone()), expr);
    }
}
