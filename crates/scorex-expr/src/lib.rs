#![forbid(unsafe_code)]

//! Serialized score-expression model and pure rewrites.
//!
//! A score configuration describes how a solution's correctness is computed
//! from individual test results: a tree of function nodes (`avg`, `sum`,
//! `mul`, ...) over `test-result` references and numeric literals. This
//! crate models the persisted wire form of that tree and provides the
//! stateless rewrites an editor runs over it:
//!
//! - [`ScoreExpr`]: the typed wire model ([serde]-backed, round-trip
//!   compatible with persisted configurations).
//! - [`fold_constants`]: collapse constant subtrees into literals.
//! - [`optimize`] / [`simplify`]: peephole rules, once or to saturation.
//! - [`extract_weights`] / [`weighted_average_expr`] / [`average_expr`]:
//!   recognize and rebuild per-test weight maps.
//!
//! Everything here is a pure function over the serialized form; the live,
//! editable tree (placeholders, identity, undo) lives in `scorex-ast`.
//!
//! # Example
//!
//! ```
//! use scorex_expr::{extract_weights, simplify, ScoreExpr, TestId};
//!
//! let config = r#"{"type":"div","children":[
//!     {"type":"sum","children":[
//!         {"type":"mul","children":[{"type":"test-result","test":1},30]},
//!         {"type":"mul","children":[{"type":"test-result","test":2},70]}
//!     ]},
//!     100
//! ]}"#;
//! let expr = simplify(ScoreExpr::from_json(config).unwrap());
//! let weights = extract_weights(&expr).unwrap();
//! assert_eq!(weights[&TestId::new(1)], 30.0);
//! assert_eq!(weights[&TestId::new(2)], 70.0);
//! ```

pub mod expr;
pub mod fold;
pub mod op;
pub mod optimize;
pub mod weights;

pub use expr::{ExprNode, ScoreExpr, TestId};
pub use fold::fold_constants;
pub use op::FuncOp;
pub use optimize::{optimize, simplify};
pub use weights::{
    PLAIN_AVERAGE_WEIGHT, average_expr, extract_weights, weighted_average_expr,
};
