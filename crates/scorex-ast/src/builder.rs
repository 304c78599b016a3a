#![forbid(unsafe_code)]

//! Lenient construction of live trees from persisted configurations.
//!
//! Persisted score configurations can be partially corrupt: an unknown
//! node type, a missing payload field, or a region that is not a node at
//! all. The builder never fails: each malformed region degrades to a
//! placeholder, isolating the damage to that subtree so the rest of the
//! configuration stays displayable and editable.

use serde_json::Value;

use crate::node::{NodeBody, NodeId, NodeKind, ParentLink};
use crate::tree::ScoreAst;

/// Context a child list is being fitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitMode {
    /// Deserialization: placeholders stay in place so corruption is visible.
    Build,
    /// Structural edit: commutative kinds shed stray placeholders.
    Mutate,
}

impl ScoreAst {
    /// Build a detached subtree from a raw configuration value.
    ///
    /// The returned node has no parent; the caller attaches or adopts it.
    pub(crate) fn build_subtree(&mut self, raw: &Value) -> NodeId {
        match raw {
            Value::Number(number) => {
                // Bare-number shorthand for a value node.
                self.insert_node(NodeBody::value(number.as_f64()), Vec::new())
            }
            Value::Object(fields) => {
                let Some(tag) = fields.get("type").and_then(Value::as_str) else {
                    tracing::warn!("node object without a type tag, degrading to placeholder");
                    return self.insert_node(NodeBody::Placeholder, Vec::new());
                };
                match NodeKind::from_tag(tag) {
                    Some(NodeKind::Func(op)) => {
                        let raw_children = fields
                            .get("children")
                            .and_then(Value::as_array)
                            .map_or(&[] as &[Value], Vec::as_slice);
                        let children: Vec<NodeId> = raw_children
                            .iter()
                            .map(|child| self.build_subtree(child))
                            .collect();
                        let children = self.fit_children(NodeKind::Func(op), children, FitMode::Build);
                        let id = self.insert_node(NodeBody::func(op), children);
                        self.bind_children(id);
                        id
                    }
                    Some(NodeKind::TestResult) => match fields.get("test").and_then(Value::as_u64)
                    {
                        Some(test) => self.insert_node(
                            NodeBody::test(Some(scorex_expr::TestId::new(test))),
                            Vec::new(),
                        ),
                        None => {
                            tracing::warn!(
                                "test-result node without a usable test id, degrading to placeholder"
                            );
                            self.insert_node(NodeBody::Placeholder, Vec::new())
                        }
                    },
                    Some(NodeKind::Value) => match fields.get("value").and_then(Value::as_f64) {
                        Some(value) => {
                            self.insert_node(NodeBody::value(Some(value)), Vec::new())
                        }
                        None => {
                            tracing::warn!(
                                "value node without a usable number, degrading to placeholder"
                            );
                            self.insert_node(NodeBody::Placeholder, Vec::new())
                        }
                    },
                    Some(NodeKind::Placeholder) | None => {
                        tracing::warn!(tag, "unknown node type, degrading to placeholder");
                        self.insert_node(NodeBody::Placeholder, Vec::new())
                    }
                }
            }
            _ => {
                tracing::warn!("configuration region is not a node, degrading to placeholder");
                self.insert_node(NodeBody::Placeholder, Vec::new())
            }
        }
    }

    /// Fit a child list to a kind's arity rules.
    ///
    /// Every kind is padded up to its minimum with placeholders and
    /// truncated beyond its maximum (truncation only arises from corrupt
    /// input or a narrowing replace). In [`FitMode::Mutate`], commutative
    /// kinds additionally keep placeholders only as minimum-fillers;
    /// [`FitMode::Build`] retains them so corrupt regions of a persisted
    /// configuration stay visible for the user to fix. Dropped children
    /// are left detached in the arena.
    pub(crate) fn fit_children(
        &mut self,
        kind: NodeKind,
        mut children: Vec<NodeId>,
        mode: FitMode,
    ) -> Vec<NodeId> {
        if mode == FitMode::Mutate && kind.is_commutative() {
            let mut kept = Vec::with_capacity(children.len());
            for child in children.drain(..) {
                if self.is_placeholder(child) {
                    self.detach(child);
                } else {
                    kept.push(child);
                }
            }
            children = kept;
        }
        if let Some(max) = kind.max_children()
            && children.len() > max
        {
            tracing::warn!(
                kind = kind.tag(),
                dropped = children.len() - max,
                "dropping surplus children beyond the kind's maximum"
            );
            for child in children.drain(max..) {
                self.detach(child);
            }
        }
        while children.len() < kind.min_children() {
            children.push(self.insert_node(NodeBody::Placeholder, Vec::new()));
        }
        children
    }

    /// Point every current child of `id` back at `id`.
    pub(crate) fn bind_children(&mut self, id: NodeId) {
        let children = match self.nodes.get(&id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = Some(ParentLink::Node(id));
            }
        }
    }

    /// Clear a node's parent link.
    pub(crate) fn detach(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::GenericClass;
    use scorex_expr::FuncOp;

    fn kinds_of(ast: &ScoreAst) -> Vec<NodeKind> {
        ast.iter().map(|node| node.kind()).collect()
    }

    #[test]
    fn bare_numbers_become_value_nodes() {
        let ast = ScoreAst::from_json(r#"{"type":"sum","children":[1,2]}"#).unwrap();
        let kinds = kinds_of(&ast);
        assert_eq!(
            kinds,
            vec![NodeKind::Func(FuncOp::Sum), NodeKind::Value, NodeKind::Value]
        );
    }

    #[test]
    fn unknown_type_degrades_to_placeholder_without_failing() {
        let ast = ScoreAst::from_json(
            r#"{"type":"sum","children":[{"type":"bogus-kind"},{"type":"test-result","test":1}]}"#,
        )
        .unwrap();
        // The corrupt child stays visible as a placeholder, which makes the
        // sum invalid until the user fills the slot in.
        assert_eq!(
            kinds_of(&ast),
            vec![
                NodeKind::Func(FuncOp::Sum),
                NodeKind::Placeholder,
                NodeKind::TestResult
            ]
        );
        assert!(!ast.is_node_valid(ast.root()));
    }

    #[test]
    fn lone_corrupt_child_is_kept_as_minimum_filler() {
        let ast = ScoreAst::from_json(r#"{"type":"sum","children":[{"type":"bogus-kind"}]}"#).unwrap();
        assert_eq!(
            kinds_of(&ast),
            vec![NodeKind::Func(FuncOp::Sum), NodeKind::Placeholder]
        );
        assert!(!ast.is_node_valid(ast.root()));
    }

    #[test]
    fn missing_children_are_padded_with_placeholders() {
        let ast = ScoreAst::from_json(r#"{"type":"sub","children":[1]}"#).unwrap();
        assert_eq!(
            kinds_of(&ast),
            vec![NodeKind::Func(FuncOp::Sub), NodeKind::Value, NodeKind::Placeholder]
        );
    }

    #[test]
    fn surplus_children_of_fixed_arity_kinds_are_dropped() {
        let ast = ScoreAst::from_json(r#"{"type":"neg","children":[1,2,3]}"#).unwrap();
        assert_eq!(
            kinds_of(&ast),
            vec![NodeKind::Func(FuncOp::Neg), NodeKind::Value]
        );
    }

    #[test]
    fn missing_payload_fields_degrade_to_placeholders() {
        let ast = ScoreAst::from_json(
            r#"{"type":"avg","children":[{"type":"test-result"},{"type":"value"},{"type":"test-result","test":3}]}"#,
        )
        .unwrap();
        assert_eq!(
            kinds_of(&ast),
            vec![
                NodeKind::Func(FuncOp::Avg),
                NodeKind::Placeholder,
                NodeKind::Placeholder,
                NodeKind::TestResult
            ]
        );
    }

    #[test]
    fn non_node_regions_degrade_to_placeholders() {
        let ast = ScoreAst::from_json(r#"{"type":"clamp","children":["what"]}"#).unwrap();
        assert_eq!(
            kinds_of(&ast),
            vec![NodeKind::Func(FuncOp::Clamp), NodeKind::Placeholder]
        );
    }

    #[test]
    fn root_corruption_degrades_to_a_placeholder_root() {
        let ast = ScoreAst::from_json(r#"{"no":"type"}"#).unwrap();
        assert!(ast.node(ast.root()).unwrap().is_placeholder());
        assert_eq!(ast.node(ast.root()).unwrap().kind().generic_class(), None);
    }

    #[test]
    fn order_sensitive_kinds_keep_placeholder_positions() {
        let ast = ScoreAst::from_json(
            r#"{"type":"sub","children":[{"type":"bogus-kind"},{"type":"test-result","test":1}]}"#,
        )
        .unwrap();
        // sub is order-sensitive: the corrupt first operand must stay a
        // placeholder in position rather than being stripped.
        assert_eq!(
            kinds_of(&ast),
            vec![
                NodeKind::Func(FuncOp::Sub),
                NodeKind::Placeholder,
                NodeKind::TestResult
            ]
        );
    }

    #[test]
    fn generic_class_of_built_nodes() {
        let ast = ScoreAst::from_json(r#"{"type":"avg","children":[{"type":"test-result","test":1},5]}"#)
            .unwrap();
        let classes: Vec<Option<GenericClass>> = ast
            .iter()
            .map(|node| node.kind().generic_class())
            .collect();
        assert_eq!(
            classes,
            vec![
                Some(GenericClass::Function),
                Some(GenericClass::Test),
                Some(GenericClass::Literal)
            ]
        );
    }
}
