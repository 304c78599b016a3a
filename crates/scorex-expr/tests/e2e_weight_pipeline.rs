#![forbid(unsafe_code)]

//! End-to-end pipeline over persisted configurations: parse, simplify,
//! recover weights, evaluate, rebuild.

use std::collections::BTreeMap;

use scorex_expr::{
    FuncOp, ScoreExpr, TestId, extract_weights, fold_constants, simplify, weighted_average_expr,
};

#[test]
fn persisted_weighted_config_is_recognized() {
    let config = r#"{
        "type": "div",
        "children": [
            {"type": "sum", "children": [
                {"type": "mul", "children": [{"type": "test-result", "test": 1}, 30]},
                {"type": "mul", "children": [{"type": "test-result", "test": 2}, 70]}
            ]},
            100
        ]
    }"#;
    let expr = ScoreExpr::from_json(config).unwrap();
    let weights = extract_weights(&simplify(expr)).unwrap();
    assert_eq!(
        weights,
        BTreeMap::from([(TestId::new(1), 30.0), (TestId::new(2), 70.0)])
    );
}

#[test]
fn noisy_config_simplifies_into_the_weighted_shape() {
    // Editor leftovers: subtracted zeros, unit factors, a constant subtree
    // in the divisor. Simplification must strip them before extraction.
    let config = r#"{
        "type": "div",
        "children": [
            {"type": "sum", "children": [
                0,
                {"type": "mul", "children": [{"type": "test-result", "test": 1}, 30, 1]},
                {"type": "mul", "children": [{"type": "test-result", "test": 2}, 70]}
            ]},
            {"type": "sum", "children": [60, 40]}
        ]
    }"#;
    let expr = simplify(ScoreExpr::from_json(config).unwrap());
    let weights = extract_weights(&expr).unwrap();
    assert_eq!(
        weights,
        BTreeMap::from([(TestId::new(1), 30.0), (TestId::new(2), 70.0)])
    );
}

#[test]
fn extraction_and_construction_are_inverse() {
    let weights = BTreeMap::from([
        (TestId::new(1), 15.0),
        (TestId::new(2), 35.0),
        (TestId::new(3), 50.0),
    ]);
    let expr = weighted_average_expr(&weights).unwrap();

    // The canonical construction survives a serialization round trip and
    // still extracts to the same map.
    let json = expr.to_json().unwrap();
    let reparsed = ScoreExpr::from_json(&json).unwrap();
    assert_eq!(extract_weights(&reparsed), Some(weights.clone()));

    // And it evaluates to the weighted mean of the test results.
    let results = BTreeMap::from([
        (TestId::new(1), 1.0),
        (TestId::new(2), 0.0),
        (TestId::new(3), 0.5),
    ]);
    let score = reparsed.evaluate(&results);
    assert!((score - 0.40).abs() < 1e-12);
}

#[test]
fn fully_constant_config_folds_to_its_score() {
    let config = r#"{
        "type": "clamp",
        "children": [
            {"type": "sub", "children": [1, {"type": "div", "children": [1, 4]}]}
        ]
    }"#;
    let expr = ScoreExpr::from_json(config).unwrap();
    assert_eq!(fold_constants(expr), ScoreExpr::literal(0.75));
}

#[test]
fn root_value_object_form_is_preserved_by_parsing() {
    let expr = ScoreExpr::from_json(r#"{"type":"value","value":1}"#).unwrap();
    assert_eq!(expr, ScoreExpr::value(1.0));
    // Folding normalizes it to the bare-number spelling.
    assert_eq!(fold_constants(expr), ScoreExpr::literal(1.0));
}

#[test]
fn simplify_handles_a_deep_chain() {
    // neg(neg(...)) nesting 20 levels over one test result.
    let mut expr = ScoreExpr::test(TestId::new(1));
    for _ in 0..20 {
        expr = ScoreExpr::call(FuncOp::Neg, vec![expr]);
    }
    assert_eq!(simplify(expr), ScoreExpr::test(TestId::new(1)));
}
