//! # Bounded Undo/Redo History
//!
//! Snapshot history of a [`DocumentStore`]: `past`, `present`, `future`.
//!
//! The manager observes the store through [`History::observe`]: whenever the
//! store reports a change, the current graph is captured and pushed. Two
//! mechanisms keep the timeline clean:
//!
//! - **Coalescing**: a snapshot equal to `present` is discarded. Selection is
//!   stripped at capture time, so selection-only changes never become steps.
//! - **Re-entrancy tag**: while undo or redo writes a snapshot back into the
//!   store, the tag is `ApplyingHistory`. The change notification that this
//!   write produces is consumed by the tag instead of being recorded. The tag
//!   is then settled back to `Idle`, so it cannot swallow a later edit.

use crate::document::DocumentStore;
use crate::primitives::HISTORY_LIMIT;
use crate::types::{Edge, Node};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// An immutable capture of a document's nodes and edges.
#[derive(Debug, Clone)]
pub struct HistorySnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    timestamp: DateTime<Utc>,
}

impl HistorySnapshot {
    /// Capture the graph with every selection flag cleared.
    #[must_use]
    pub fn capture(nodes: &[Node], edges: &[Edge]) -> Self {
        let nodes = nodes
            .iter()
            .map(|n| Node {
                selected: false,
                ..n.clone()
            })
            .collect();
        let edges = edges
            .iter()
            .map(|e| Edge {
                selected: false,
                ..e.clone()
            })
            .collect();
        Self {
            nodes,
            edges,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Structural equality of the captured graph. Timestamps are ignored.
    #[must_use]
    pub fn same_graph(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

// =============================================================================
// MANAGER
// =============================================================================

/// Whether the manager is currently writing a snapshot back into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyState {
    #[default]
    Idle,
    ApplyingHistory,
}

/// Bounded linear history with coalescing.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<HistorySnapshot>,
    present: Option<HistorySnapshot>,
    future: VecDeque<HistorySnapshot>,
    limit: usize,
    state: ApplyState,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_LIMIT)
    }
}

impl History {
    /// Create an empty history keeping at most `limit` undo steps.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: None,
            future: VecDeque::new(),
            limit: limit.max(1),
            state: ApplyState::Idle,
        }
    }

    /// Drop every step and adopt `baseline` as the present state.
    pub fn reset(&mut self, baseline: HistorySnapshot) {
        self.past.clear();
        self.future.clear();
        self.present = Some(baseline);
        self.state = ApplyState::Idle;
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn state(&self) -> ApplyState {
        self.state
    }

    #[must_use]
    pub fn present(&self) -> Option<&HistorySnapshot> {
        self.present.as_ref()
    }

    /// Record a new present state.
    ///
    /// Returns `false` when the push was absorbed: either by the
    /// re-entrancy tag, or because it equals the current present.
    pub fn push(&mut self, snapshot: HistorySnapshot) -> bool {
        if self.state == ApplyState::ApplyingHistory {
            self.state = ApplyState::Idle;
            return false;
        }

        match self.present.take() {
            Some(present) if present.same_graph(&snapshot) => {
                self.present = Some(present);
                false
            }
            Some(present) => {
                self.past.push_back(present);
                while self.past.len() > self.limit {
                    self.past.pop_front();
                }
                self.present = Some(snapshot);
                self.future.clear();
                true
            }
            None => {
                self.present = Some(snapshot);
                false
            }
        }
    }

    /// Drain the store's change flag and record its graph if it changed.
    pub fn observe(&mut self, store: &mut DocumentStore) -> bool {
        if store.take_change() {
            self.push(store.snapshot())
        } else {
            false
        }
    }

    /// Step back one state, writing it into `store`.
    pub fn undo(&mut self, store: &mut DocumentStore) -> bool {
        let Some(previous) = self.past.pop_back() else {
            return false;
        };
        if let Some(present) = self.present.take() {
            self.future.push_front(present);
        }
        self.apply(store, previous);
        true
    }

    /// Step forward one state, writing it into `store`.
    pub fn redo(&mut self, store: &mut DocumentStore) -> bool {
        let Some(next) = self.future.pop_front() else {
            return false;
        };
        if let Some(present) = self.present.take() {
            self.past.push_back(present);
        }
        self.apply(store, next);
        true
    }

    fn apply(&mut self, store: &mut DocumentStore, snapshot: HistorySnapshot) {
        self.state = ApplyState::ApplyingHistory;
        store.restore(&snapshot);
        self.present = Some(snapshot);
        // The restore notifies like any other mutation; the tag absorbs it.
        self.observe(store);
        self.settle();
    }

    /// Return the tag to `Idle` after an apply cycle.
    pub fn settle(&mut self) {
        self.state = ApplyState::Idle;
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, Position};

    fn tracked_store() -> (DocumentStore, History) {
        let store = DocumentStore::new("history");
        let mut history = History::new(HISTORY_LIMIT);
        history.reset(store.snapshot());
        (store, history)
    }

    #[test]
    fn undo_then_redo_restores_states() {
        let (mut store, mut history) = tracked_store();
        store.add_node(NodeKind::Corporation, Position::default());
        history.observe(&mut store);
        assert_eq!(history.undo_depth(), 1);

        assert!(history.undo(&mut store));
        assert!(store.nodes().is_empty());
        assert!(history.can_redo());

        assert!(history.redo(&mut store));
        assert_eq!(store.nodes().len(), 1);
        assert!(!history.can_redo());
        assert_eq!(history.state(), ApplyState::Idle);
    }

    #[test]
    fn empty_stacks_are_noops() {
        let (mut store, mut history) = tracked_store();
        assert!(!history.undo(&mut store));
        assert!(!history.redo(&mut store));
    }

    #[test]
    fn selection_only_changes_coalesce() {
        let (mut store, mut history) = tracked_store();
        let node = store.add_node(NodeKind::Trust, Position::default());
        history.observe(&mut store);

        store.select_node(Some(&node.id));
        assert!(!history.observe(&mut store));
        store.select_node(None);
        assert!(!history.observe(&mut store));

        assert_eq!(history.undo_depth(), 1);
    }

    #[test]
    fn new_push_clears_future() {
        let (mut store, mut history) = tracked_store();
        store.add_node(NodeKind::Fund, Position::default());
        history.observe(&mut store);
        history.undo(&mut store);
        assert!(history.can_redo());

        store.add_node(NodeKind::Note, Position::default());
        history.observe(&mut store);
        assert!(!history.can_redo());
    }

    #[test]
    fn limit_drops_oldest() {
        let mut store = DocumentStore::new("bounded");
        let mut history = History::new(3);
        history.reset(store.snapshot());

        for i in 0..5 {
            store.add_node(NodeKind::Llc, Position::new(f64::from(i), 0.0));
            history.observe(&mut store);
        }
        assert_eq!(history.undo_depth(), 3);

        while history.undo(&mut store) {}
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn tag_absorbs_exactly_one_push() {
        let (mut store, mut history) = tracked_store();
        store.add_node(NodeKind::Individual, Position::default());
        history.observe(&mut store);
        history.undo(&mut store);

        // The next genuine edit after an undo is recorded.
        store.add_node(NodeKind::Partnership, Position::default());
        assert!(history.observe(&mut store));
    }
}
