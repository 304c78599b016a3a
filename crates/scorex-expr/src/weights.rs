#![forbid(unsafe_code)]

//! Weight-map extraction and construction for test-based configurations.
//!
//! Many score configurations are really just a weighted (or plain) average
//! of test results. [`extract_weights`] recognizes those two shapes in an
//! arbitrary expression so an editor can offer a simplified per-test weight
//! view; [`weighted_average_expr`] and [`average_expr`] build the canonical
//! expressions back from a weight map.
//!
//! Extraction is deliberately conservative: an ambiguous or non-matching
//! tree yields `None` rather than a plausible-looking but wrong map.

use std::collections::BTreeMap;

use crate::expr::{ExprNode, ScoreExpr, TestId};
use crate::op::FuncOp;

/// Weight assigned to every test of a plain `avg` configuration, so plain
/// and weighted configurations are comparable on the same scale.
pub const PLAIN_AVERAGE_WEIGHT: f64 = 100.0;

/// Recover a `{test: weight}` map from an already-simplified expression.
///
/// Two shapes are recognized:
///
/// 1. **Weighted average**: exactly one `div` in the whole tree, dividing
///    a `sum` by a numeric divisor. Within the sum, `mul(test, weight)`
///    children (either operand order) contribute their weight and bare
///    `test-result` children contribute 1.
/// 2. **Plain average**: no `div` and exactly one `avg`; every direct
///    `test-result` child contributes [`PLAIN_AVERAGE_WEIGHT`].
///
/// Anything else (zero or several candidate nodes, an unexpected child
/// shape, no accumulated weights at all) returns `None`.
#[must_use]
pub fn extract_weights(expr: &ScoreExpr) -> Option<BTreeMap<TestId, f64>> {
    let mut divs = Vec::new();
    collect_calls(expr, FuncOp::Div, &mut divs);
    match divs.as_slice() {
        [] => {}
        [children] => return weighted_average(children),
        _ => return None,
    }

    let mut avgs = Vec::new();
    collect_calls(expr, FuncOp::Avg, &mut avgs);
    match avgs.as_slice() {
        [children] => plain_average(children),
        _ => None,
    }
}

/// Build the canonical weighted-average expression
/// `div(sum(mul(test, weight)...), total)`, `None` for an empty map.
#[must_use]
pub fn weighted_average_expr(weights: &BTreeMap<TestId, f64>) -> Option<ScoreExpr> {
    if weights.is_empty() {
        return None;
    }
    let terms: Vec<ScoreExpr> = weights
        .iter()
        .map(|(test, weight)| {
            ScoreExpr::call(
                FuncOp::Mul,
                vec![ScoreExpr::test(*test), ScoreExpr::literal(*weight)],
            )
        })
        .collect();
    let total: f64 = weights.values().sum();
    Some(ScoreExpr::call(
        FuncOp::Div,
        vec![
            ScoreExpr::call(FuncOp::Sum, terms),
            ScoreExpr::literal(total),
        ],
    ))
}

/// Build the plain-average expression `avg(test...)`, `None` for no tests.
#[must_use]
pub fn average_expr(tests: &[TestId]) -> Option<ScoreExpr> {
    if tests.is_empty() {
        return None;
    }
    let children = tests.iter().map(|t| ScoreExpr::test(*t)).collect();
    Some(ScoreExpr::call(FuncOp::Avg, children))
}

/// Collect the child slices of every `op` call in the tree, in DFS order.
fn collect_calls<'a>(expr: &'a ScoreExpr, op: FuncOp, out: &mut Vec<&'a [ScoreExpr]>) {
    if expr.op() == Some(op) {
        out.push(expr.children());
    }
    for child in expr.children() {
        collect_calls(child, op, out);
    }
}

fn weighted_average(div_children: &[ScoreExpr]) -> Option<BTreeMap<TestId, f64>> {
    let [numerator, divisor] = div_children else {
        return None;
    };
    if !divisor.is_constant() || numerator.op() != Some(FuncOp::Sum) {
        return None;
    }

    let mut weights = BTreeMap::new();
    for term in numerator.children() {
        match term {
            ScoreExpr::Node(ExprNode::TestResult { test }) => {
                weights.insert(*test, 1.0);
            }
            _ if term.op() == Some(FuncOp::Mul) => {
                let (test, weight) = weighted_term(term.children())?;
                weights.insert(test, weight);
            }
            _ => return None,
        }
    }
    if weights.is_empty() { None } else { Some(weights) }
}

/// Match `mul(test, weight)` with the operands in either order.
fn weighted_term(factors: &[ScoreExpr]) -> Option<(TestId, f64)> {
    let [a, b] = factors else {
        return None;
    };
    match (a, b) {
        (ScoreExpr::Node(ExprNode::TestResult { test }), weight)
        | (weight, ScoreExpr::Node(ExprNode::TestResult { test })) => {
            Some((*test, weight.constant_value()?))
        }
        _ => None,
    }
}

fn plain_average(avg_children: &[ScoreExpr]) -> Option<BTreeMap<TestId, f64>> {
    let mut weights = BTreeMap::new();
    for child in avg_children {
        if let ScoreExpr::Node(ExprNode::TestResult { test }) = child {
            weights.insert(*test, PLAIN_AVERAGE_WEIGHT);
        }
    }
    if weights.is_empty() { None } else { Some(weights) }
}

// ============================================================================
// Tests
// ============================================================================
