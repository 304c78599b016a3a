#![forbid(unsafe_code)]

//! Snapshot history for undo/redo over tree roots.
//!
//! Because the mutation protocol never edits nodes in place, a history
//! entry is just the root id of one tree state: restoring it is O(1) on
//! the history side (the session re-binds parent links separately). Dual
//! stacks keep the current state at the back of the undo stack:
//!
//! ```text
//! edit -> push(r3)
//! ┌─────────────────────────────────────────────┐
//! │ Undo Stack: [r0, r1, r2, r3]   Redo: []     │
//! └─────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌─────────────────────────────────────────────┐
//! │ Undo Stack: [r0, r1]   Redo: [r2, r3]       │
//! └─────────────────────────────────────────────┘
//!
//! edit -> push(r4)   (new branch, redo discarded)
//! ┌─────────────────────────────────────────────┐
//! │ Undo Stack: [r0, r1, r4]   Redo: []         │
//! └─────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;

use crate::node::NodeId;

/// Label describing the edit that produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Initial tree, built from a persisted configuration or from scratch.
    Load,
    Append,
    Replace,
    /// Whole-subtree replacement (drag/drop supplant).
    Supplant,
    Delete,
    SetTest,
    SetValue,
}

impl EditOp {
    /// Short human-readable label for menus and logs.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Append => "append child",
            Self::Replace => "replace node",
            Self::Supplant => "replace subtree",
            Self::Delete => "delete node",
            Self::SetTest => "set test",
            Self::SetValue => "set value",
        }
    }
}

/// Configuration for the edit history.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of snapshots retained for undo; oldest entries are
    /// evicted beyond this (the current state is never evicted).
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

impl HistoryConfig {
    /// Custom depth limit.
    #[must_use]
    pub const fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Unlimited configuration (for testing).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// One recorded tree state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Root of the recorded tree.
    pub root: NodeId,
    /// Edit that produced it.
    pub op: EditOp,
}

/// Dual-stack history of root snapshots.
///
/// # Invariants
///
/// 1. After the first push the undo stack is never empty; its back entry
///    is the current tree state.
/// 2. `undo_stack.len() <= config.max_depth` after any operation.
/// 3. The redo stack is cleared on every push.
#[derive(Debug)]
pub struct EditHistory {
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: VecDeque<HistoryEntry>,
    config: HistoryConfig,
}

impl EditHistory {
    /// Create a history with the given configuration.
    #[must_use]
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            config,
        }
    }

    /// Create a history with the default configuration.
    #[must_use]
    pub fn with_default_config() -> Self {
        Self::new(HistoryConfig::default())
    }

    /// Record a new tree state, discarding any redo branch.
    pub fn push(&mut self, root: NodeId, op: EditOp) {
        self.redo_stack.clear();
        self.undo_stack.push_back(HistoryEntry { root, op });
        self.enforce_depth();
    }

    /// The entry for the current tree state.
    #[must_use]
    pub fn current(&self) -> Option<HistoryEntry> {
        self.undo_stack.back().copied()
    }

    /// Whether a prior state is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    /// Whether an undone state is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Step back one state and report the root to restore.
    pub fn undo(&mut self) -> Option<NodeId> {
        if !self.can_undo() {
            return None;
        }
        let entry = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(entry);
        self.undo_stack.back().map(|e| e.root)
    }

    /// Step forward one state and report the root to restore.
    pub fn redo(&mut self) -> Option<NodeId> {
        let entry = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(entry);
        Some(entry.root)
    }

    /// Number of states reachable by undo.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len().saturating_sub(1)
    }

    /// Number of states reachable by redo.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Edit that `undo()` would revert.
    #[must_use]
    pub fn next_undo_op(&self) -> Option<EditOp> {
        if self.can_undo() {
            self.undo_stack.back().map(|e| e.op)
        } else {
            None
        }
    }

    /// Edit that `redo()` would reapply.
    #[must_use]
    pub fn next_redo_op(&self) -> Option<EditOp> {
        self.redo_stack.back().map(|e| e.op)
    }

    /// Drop every entry except the current state.
    pub fn clear(&mut self) {
        let current = self.undo_stack.pop_back();
        self.undo_stack.clear();
        self.redo_stack.clear();
        if let Some(entry) = current {
            self.undo_stack.push_back(entry);
        }
    }

    fn enforce_depth(&mut self) {
        while self.undo_stack.len() > self.config.max_depth {
            self.undo_stack.pop_front();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> NodeId {
        NodeId::new(raw)
    }

    #[test]
    fn fresh_history_has_nothing_to_step() {
        let mut history = EditHistory::with_default_config();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo(), None);
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn single_state_cannot_be_undone() {
        let mut history = EditHistory::with_default_config();
        history.push(id(0), EditOp::Load);
        assert!(!history.can_undo());
        assert_eq!(history.undo(), None);
        assert_eq!(history.current().map(|e| e.root), Some(id(0)));
    }

    #[test]
    fn undo_reports_the_previous_root() {
        let mut history = EditHistory::with_default_config();
        history.push(id(0), EditOp::Load);
        history.push(id(1), EditOp::Append);
        assert_eq!(history.undo(), Some(id(0)));
        assert!(history.can_redo());
        assert_eq!(history.redo(), Some(id(1)));
    }

    #[test]
    fn push_discards_the_redo_branch() {
        let mut history = EditHistory::with_default_config();
        history.push(id(0), EditOp::Load);
        history.push(id(1), EditOp::Append);
        history.undo();
        history.push(id(2), EditOp::Delete);
        assert!(!history.can_redo());
        assert_eq!(history.redo(), None);
        assert_eq!(history.current().map(|e| e.root), Some(id(2)));
    }

    #[test]
    fn depth_limit_evicts_oldest_entries() {
        let mut history = EditHistory::new(HistoryConfig::new(3));
        for raw in 0..6 {
            history.push(id(raw), EditOp::Append);
        }
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo(), Some(id(4)));
        assert_eq!(history.undo(), Some(id(3)));
        assert_eq!(history.undo(), None);
    }

    #[test]
    fn ops_label_the_steps() {
        let mut history = EditHistory::with_default_config();
        history.push(id(0), EditOp::Load);
        history.push(id(1), EditOp::SetValue);
        assert_eq!(history.next_undo_op(), Some(EditOp::SetValue));
        assert_eq!(history.next_redo_op(), None);
        history.undo();
        assert_eq!(history.next_undo_op(), None);
        assert_eq!(history.next_redo_op(), Some(EditOp::SetValue));
    }

    #[test]
    fn clear_keeps_only_the_current_state() {
        let mut history = EditHistory::with_default_config();
        history.push(id(0), EditOp::Load);
        history.push(id(1), EditOp::Append);
        history.push(id(2), EditOp::Delete);
        history.undo();
        history.clear();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current().map(|e| e.root), Some(id(1)));
    }

    #[test]
    fn full_cycle_restores_every_state() {
        let mut history = EditHistory::new(HistoryConfig::unlimited());
        for raw in 0..5 {
            history.push(id(raw), EditOp::Append);
        }
        let mut seen = Vec::new();
        while let Some(root) = history.undo() {
            seen.push(root);
        }
        assert_eq!(seen, vec![id(3), id(2), id(1), id(0)]);
        let mut replayed = Vec::new();
        while let Some(root) = history.redo() {
            replayed.push(root);
        }
        assert_eq!(replayed, vec![id(1), id(2), id(3), id(4)]);
    }
}
