//! Benchmarks for the rewrite pipeline.
//!
//! Run with: cargo bench -p scorex-expr

use std::collections::BTreeMap;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};

use scorex_expr::{FuncOp, ScoreExpr, TestId, extract_weights, fold_constants, simplify};

/// A weighted-average configuration over `n` tests, wrapped in editor
/// noise (unit factors and zero terms) so the rewrites have work to do.
fn noisy_weighted(n: u64) -> ScoreExpr {
    let mut terms: Vec<ScoreExpr> = (1..=n)
        .map(|t| {
            ScoreExpr::call(
                FuncOp::Mul,
                vec![
                    ScoreExpr::test(TestId::new(t)),
                    ScoreExpr::literal(t as f64),
                    ScoreExpr::literal(1.0),
                ],
            )
        })
        .collect();
    terms.push(ScoreExpr::literal(0.0));
    let total: f64 = (1..=n).map(|t| t as f64).sum();
    ScoreExpr::call(
        FuncOp::Div,
        vec![
            ScoreExpr::call(FuncOp::Sum, terms),
            ScoreExpr::call(FuncOp::Sum, vec![ScoreExpr::literal(total), ScoreExpr::literal(0.0)]),
        ],
    )
}

fn bench_fold(c: &mut Criterion) {
    let expr = noisy_weighted(100);
    c.bench_function("fold_constants/100_tests", |b| {
        b.iter(|| fold_constants(black_box(expr.clone())));
    });
}

fn bench_simplify(c: &mut Criterion) {
    let expr = noisy_weighted(100);
    c.bench_function("simplify/100_tests", |b| {
        b.iter(|| simplify(black_box(expr.clone())));
    });
}

fn bench_extract(c: &mut Criterion) {
    let expr = simplify(noisy_weighted(100));
    c.bench_function("extract_weights/100_tests", |b| {
        b.iter(|| extract_weights(black_box(&expr)));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let expr = noisy_weighted(100);
    let results: BTreeMap<TestId, f64> =
        (1..=100).map(|t| (TestId::new(t), 0.5)).collect();
    c.bench_function("evaluate/100_tests", |b| {
        b.iter(|| black_box(&expr).evaluate(black_box(&results)));
    });
}

criterion_group!(benches, bench_fold, bench_simplify, bench_extract, bench_evaluate);
criterion_main!(benches);
