#![forbid(unsafe_code)]

//! Live, editable score-expression trees with undo/redo.
//!
//! `scorex-expr` models the persisted wire form of a score configuration;
//! this crate turns it into something an editor can work on:
//!
//! - **Arena + identity**: nodes live in a session-owned arena keyed by
//!   monotonic [`NodeId`]s. Identity is never reused, so ids are stable
//!   handles across tree states.
//! - **Lenient building**: [`ScoreAst::from_value`] never fails; malformed
//!   regions of a persisted configuration degrade to placeholders the user
//!   can fix, instead of aborting the whole load.
//! - **Clone-on-write mutations**: every edit re-creates only the path
//!   from the edited node to the root, leaving all other subtrees (and
//!   all previous tree states) untouched (see [`mutate`]).
//! - **Snapshot undo/redo**: the structural sharing above makes a history
//!   entry one root id; [`ScoreAst::undo`]/[`ScoreAst::redo`] restore
//!   states in O(restored tree) for the parent re-bind.
//! - **Gated serialization**: [`ScoreAst::to_expr`] refuses trees that
//!   still contain placeholders or payload-less leaves, naming the node to
//!   highlight.
//!
//! # Example
//!
//! ```
//! use scorex_ast::{NodeBody, ScoreAst};
//! use scorex_expr::TestId;
//!
//! let mut ast = ScoreAst::from_json(
//!     r#"{"type":"avg","children":[
//!         {"type":"test-result","test":1},
//!         {"type":"test-result","test":2}
//!     ]}"#,
//! ).unwrap();
//!
//! let extra = ast.new_node(NodeBody::test(Some(TestId::new(3))));
//! ast.append_child(ast.root(), extra).unwrap();
//! assert_eq!(ast.node(ast.root()).unwrap().children().len(), 3);
//!
//! ast.undo().unwrap();
//! assert_eq!(ast.node(ast.root()).unwrap().children().len(), 2);
//! ```

pub mod builder;
pub mod history;
pub mod mutate;
pub mod node;
pub mod tree;

pub use history::{EditHistory, EditOp, HistoryConfig, HistoryEntry};
pub use mutate::MutationError;
pub use node::{AstNode, GenericClass, NodeBody, NodeId, NodeKind, ParentLink};
pub use tree::{RootChangedFn, ScoreAst, SerializeError, TreeIter};
