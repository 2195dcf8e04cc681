//! # Clipboard
//!
//! In-process copy, cut, paste and duplicate of node selections.
//!
//! Copy keeps the selected nodes plus every edge whose endpoints are both
//! selected. Paste mints fresh ids, remaps the edge endpoints through an
//! old-to-new map, offsets positions, and replaces the selection with the
//! pasted nodes. The buffer is never consumed by a paste.

use crate::document::{mint_edge_id, mint_node_id, DocumentStore};
use crate::primitives::PASTE_OFFSET;
use crate::types::{Edge, Node, NodeId};
use std::collections::{BTreeMap, BTreeSet};

/// Copied nodes and their internal edges.
#[derive(Debug, Clone)]
pub struct Clipboard {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    offset: f64,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self::with_offset(PASTE_OFFSET)
    }
}

impl Clipboard {
    #[must_use]
    pub fn new() -> Self {
        Self::with_offset(PASTE_OFFSET)
    }

    /// Clipboard that shifts pasted nodes by `offset` on both axes.
    #[must_use]
    pub fn with_offset(offset: f64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            offset,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Copy the current selection. With nothing selected the buffer is kept.
    pub fn copy(&mut self, store: &DocumentStore) -> bool {
        let nodes: Vec<Node> = store.selected_nodes().cloned().collect();
        if nodes.is_empty() {
            return false;
        }
        let ids: BTreeSet<&NodeId> = nodes.iter().map(|n| &n.id).collect();
        let edges: Vec<Edge> = store
            .edges()
            .iter()
            .filter(|e| ids.contains(&e.source) && ids.contains(&e.target))
            .cloned()
            .collect();

        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "copied selection");
        self.nodes = nodes;
        self.edges = edges;
        true
    }

    /// Copy, then delete the selection: selected nodes with their attached
    /// edges, plus any separately selected edges.
    pub fn cut(&mut self, store: &mut DocumentStore) -> bool {
        self.copy(store) && store.delete_selection()
    }

    /// Paste the buffer as fresh nodes, selecting only the pasted nodes.
    pub fn paste(&self, store: &mut DocumentStore) -> bool {
        if self.is_empty() {
            return false;
        }

        let mut remap: BTreeMap<&NodeId, NodeId> = BTreeMap::new();
        let pasted_nodes: Vec<Node> = self
            .nodes
            .iter()
            .map(|node| {
                let id = mint_node_id(node.kind);
                remap.insert(&node.id, id.clone());
                Node {
                    id,
                    position: node.position.offset(self.offset, self.offset),
                    selected: true,
                    ..node.clone()
                }
            })
            .collect();

        let pasted_edges: Vec<Edge> = self
            .edges
            .iter()
            .filter_map(|edge| {
                let source = remap.get(&edge.source)?.clone();
                let target = remap.get(&edge.target)?.clone();
                Some(Edge {
                    id: mint_edge_id(),
                    source,
                    target,
                    selected: false,
                    ..edge.clone()
                })
            })
            .collect();

        store.update_graph(move |nodes, edges| {
            for node in nodes.iter_mut() {
                node.selected = false;
            }
            for edge in edges.iter_mut() {
                edge.selected = false;
            }
            nodes.extend(pasted_nodes);
            edges.extend(pasted_edges);
        });
        true
    }

    /// Copy the selection and paste it immediately.
    pub fn duplicate(&mut self, store: &mut DocumentStore) -> bool {
        self.copy(store) && self.paste(store)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeKind, Position};

    fn selected_pair() -> (DocumentStore, NodeId, NodeId, NodeId) {
        let mut store = DocumentStore::new("clip");
        let a = store.add_node(NodeKind::Corporation, Position::new(0.0, 0.0)).id;
        let b = store.add_node(NodeKind::Llc, Position::new(0.0, 200.0)).id;
        let c = store.add_node(NodeKind::Fund, Position::new(300.0, 200.0)).id;
        store.add_edge(&a, &b).expect("a-b");
        store.add_edge(&a, &c).expect("a-c");
        store.select_nodes(&[a.clone(), b.clone()]);
        (store, a, b, c)
    }

    #[test]
    fn copy_keeps_only_internal_edges() {
        let (store, a, b, _) = selected_pair();
        let mut clipboard = Clipboard::new();
        assert!(clipboard.copy(&store));
        assert_eq!(clipboard.len(), 2);
        assert_eq!(clipboard.edges().len(), 1);
        assert_eq!(clipboard.edges()[0].source, a);
        assert_eq!(clipboard.edges()[0].target, b);
    }

    #[test]
    fn copy_with_empty_selection_keeps_buffer() {
        let (mut store, ..) = selected_pair();
        let mut clipboard = Clipboard::new();
        clipboard.copy(&store);
        store.select_node(None);
        assert!(!clipboard.copy(&store));
        assert_eq!(clipboard.len(), 2);
    }

    #[test]
    fn paste_remaps_ids_and_offsets() {
        let (mut store, a, b, _) = selected_pair();
        let mut clipboard = Clipboard::new();
        clipboard.copy(&store);
        assert!(clipboard.paste(&mut store));

        assert_eq!(store.nodes().len(), 5);
        assert_eq!(store.edges().len(), 3);

        let pasted: Vec<&Node> = store.selected_nodes().collect();
        assert_eq!(pasted.len(), 2);
        for node in &pasted {
            assert_ne!(node.id, a);
            assert_ne!(node.id, b);
        }
        assert_eq!(pasted[0].position, Position::new(30.0, 30.0));
        assert_eq!(pasted[1].position, Position::new(30.0, 230.0));

        let pasted_edge = store.edges().last().expect("pasted edge");
        assert_eq!(pasted_edge.source, pasted[0].id);
        assert_eq!(pasted_edge.target, pasted[1].id);
        store.document().check_invariants().expect("invariants hold");
    }

    #[test]
    fn paste_is_repeatable() {
        let (mut store, ..) = selected_pair();
        let mut clipboard = Clipboard::new();
        clipboard.copy(&store);
        assert!(clipboard.paste(&mut store));
        assert!(clipboard.paste(&mut store));
        assert_eq!(store.nodes().len(), 7);
        assert_eq!(clipboard.len(), 2);
    }

    #[test]
    fn cut_removes_selection_and_attached_edges() {
        let (mut store, _, _, c) = selected_pair();
        let mut clipboard = Clipboard::new();
        assert!(clipboard.cut(&mut store));
        assert_eq!(store.nodes().len(), 1);
        assert_eq!(store.nodes()[0].id, c);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn cut_also_removes_selected_edges() {
        let (mut store, _, _, c) = selected_pair();
        let d = store.add_node(NodeKind::Trust, Position::new(300.0, 400.0)).id;
        store.add_edge(&c, &d).expect("c-d");
        store.update_edges(|edges| {
            for edge in edges.iter_mut().filter(|e| e.source == c) {
                edge.selected = true;
            }
        });

        let mut clipboard = Clipboard::new();
        assert!(clipboard.cut(&mut store));
        assert_eq!(clipboard.len(), 2);
        assert_eq!(store.nodes().len(), 2);
        assert!(store.node(&c).is_some());
        assert!(store.node(&d).is_some());
        assert!(store.edges().is_empty());
    }

    #[test]
    fn paste_with_empty_buffer_is_noop() {
        let mut store = DocumentStore::new("clip");
        let clipboard = Clipboard::new();
        assert!(!clipboard.paste(&mut store));
        assert!(!store.is_dirty());
    }

    #[test]
    fn duplicate_selects_copies() {
        let (mut store, a, ..) = selected_pair();
        let mut clipboard = Clipboard::with_offset(10.0);
        assert!(clipboard.duplicate(&mut store));
        let selected: Vec<&Node> = store.selected_nodes().collect();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|n| n.id != a));
        assert_eq!(selected[0].position, Position::new(10.0, 10.0));
    }
}
