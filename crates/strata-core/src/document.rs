//! # Graph Document Store
//!
//! The canonical nodes and edges of one diagram, and the only sanctioned
//! mutation surface for them.
//!
//! Every setter marks the document dirty and bumps its revision. Changes are
//! reported to observers (the history manager) by draining the pending change
//! flag with [`DocumentStore::take_change`], so a compound operation such as a
//! paste produces one notification rather than one per internal step.
//!
//! ## Invariants
//!
//! - Node ids are unique within a document.
//! - Every edge endpoint references a live node. Deletion cascades to keep
//!   this true; construction paths that receive external data are validated
//!   at the import boundary instead.

use crate::history::HistorySnapshot;
use crate::types::{Edge, EdgeId, EdgePatch, Node, NodeDataPatch, NodeId, NodeKind, Position};
use crate::StrataError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

// =============================================================================
// ID MINTING
// =============================================================================

/// Mint a globally unique id: `<prefix>-<unix millis>-<random suffix>`.
fn mint_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{millis}-{}", &random[..9])
}

/// Mint a fresh id for a node of the given kind.
#[must_use]
pub fn mint_node_id(kind: NodeKind) -> NodeId {
    NodeId(mint_id(kind.as_str()))
}

/// Mint a fresh edge id.
#[must_use]
pub fn mint_edge_id() -> EdgeId {
    EdgeId(mint_id("edge"))
}

/// Mint a fresh document id.
#[must_use]
pub fn mint_document_id() -> String {
    mint_id("diagram")
}

// =============================================================================
// DOCUMENT
// =============================================================================

/// One diagram: its graph plus persistence bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramDocument {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Mutations not yet reflected in persisted storage.
    pub dirty: bool,
    pub created_at: DateTime<Utc>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl DiagramDocument {
    /// Create an empty, clean document with a fresh id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: mint_document_id(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            dirty: false,
            created_at: Utc::now(),
            last_saved_at: None,
        }
    }

    /// Find a node by id.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Find an edge by id.
    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    /// Verify id uniqueness and edge endpoint validity.
    pub fn check_invariants(&self) -> Result<(), StrataError> {
        let mut node_ids = BTreeSet::new();
        for node in &self.nodes {
            if !node_ids.insert(&node.id) {
                return Err(StrataError::InvariantViolation(format!(
                    "duplicate node id {}",
                    node.id
                )));
            }
        }

        let mut edge_ids = BTreeSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(&edge.id) {
                return Err(StrataError::InvariantViolation(format!(
                    "duplicate edge id {}",
                    edge.id
                )));
            }
            if !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target) {
                return Err(StrataError::InvariantViolation(format!(
                    "edge {} references a missing node ({} -> {})",
                    edge.id, edge.source, edge.target
                )));
            }
        }
        Ok(())
    }
}

impl Default for DiagramDocument {
    fn default() -> Self {
        Self::new("Untitled diagram")
    }
}

// =============================================================================
// DOCUMENT STORE
// =============================================================================

/// Owns a [`DiagramDocument`] and exposes every permitted mutation.
///
/// Updating or deleting a missing id is a no-op, never an error.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    doc: DiagramDocument,
    /// Incremented on every mutation; used to detect edits landing mid-save.
    revision: u64,
    /// Set by mutations, cleared by `take_change`.
    changed: bool,
}

impl DocumentStore {
    /// Create a store holding an empty document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_document(DiagramDocument::new(name))
    }

    /// Create a store around an existing document.
    #[must_use]
    pub fn with_document(doc: DiagramDocument) -> Self {
        Self {
            doc,
            revision: 0,
            changed: false,
        }
    }

    // =========================================================================
    // READ ACCESS
    // =========================================================================

    #[must_use]
    pub fn document(&self) -> &DiagramDocument {
        &self.doc
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.doc.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.doc.edges
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.doc.node(id)
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.doc.edge(id)
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.doc.dirty
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[must_use]
    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.doc.last_saved_at
    }

    /// Currently selected nodes, in document order.
    pub fn selected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.doc.nodes.iter().filter(|n| n.selected)
    }

    /// Capture an immutable snapshot of the graph for history.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::capture(&self.doc.nodes, &self.doc.edges)
    }

    // =========================================================================
    // CHANGE TRACKING
    // =========================================================================

    fn touch(&mut self) {
        self.doc.dirty = true;
        self.revision = self.revision.saturating_add(1);
        self.changed = true;
    }

    /// Consume the pending change notification, if any.
    pub fn take_change(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// Record a successful save of `revision`.
    ///
    /// The dirty flag is cleared only when no mutation landed after the saved
    /// revision was captured, so in-flight edits are never reported as saved.
    pub fn mark_saved(&mut self, revision: u64, saved_at: DateTime<Utc>) -> bool {
        self.doc.last_saved_at = Some(saved_at);
        if revision == self.revision {
            self.doc.dirty = false;
            true
        } else {
            false
        }
    }

    // =========================================================================
    // WHOLESALE SETTERS
    // =========================================================================

    /// Replace every node.
    pub fn set_nodes(&mut self, nodes: Vec<Node>) {
        self.doc.nodes = nodes;
        self.touch();
    }

    /// Replace every edge.
    pub fn set_edges(&mut self, edges: Vec<Edge>) {
        self.doc.edges = edges;
        self.touch();
    }

    /// Functional update of the node list.
    pub fn update_nodes<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Vec<Node>),
    {
        f(&mut self.doc.nodes);
        self.touch();
    }

    /// Functional update of the edge list.
    pub fn update_edges<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Vec<Edge>),
    {
        f(&mut self.doc.edges);
        self.touch();
    }

    /// Functional update of nodes and edges as one change.
    pub fn update_graph<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Vec<Node>, &mut Vec<Edge>),
    {
        f(&mut self.doc.nodes, &mut self.doc.edges);
        self.touch();
    }

    /// Replace the whole document (new document, load, import).
    ///
    /// Revision keeps counting so a save captured before the replacement can
    /// never clear the new document's dirty flag.
    pub fn replace_document(&mut self, doc: DiagramDocument) {
        self.doc = doc;
        self.revision = self.revision.saturating_add(1);
        self.changed = false;
    }

    /// Apply a history snapshot, keeping document identity.
    pub fn restore(&mut self, snapshot: &HistorySnapshot) {
        self.doc.nodes = snapshot.nodes().to_vec();
        self.doc.edges = snapshot.edges().to_vec();
        self.touch();
    }

    /// Rename the document.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.doc.name = name.into();
        self.touch();
    }

    // =========================================================================
    // NODE OPERATIONS
    // =========================================================================

    /// Add a node of `kind` at `position`, seeded with the kind defaults.
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Node {
        let node = Node::new(mint_node_id(kind), kind, position);
        self.doc.nodes.push(node.clone());
        self.touch();
        tracing::debug!(node = %node.id, kind = %kind, "node added");
        node
    }

    /// Merge a partial data update into a node. Missing ids are ignored.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodeDataPatch) -> bool {
        let Some(node) = self.doc.nodes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        node.data.apply(patch);
        self.touch();
        true
    }

    /// Move a node. Missing ids are ignored.
    pub fn move_node(&mut self, id: &NodeId, position: Position) -> bool {
        let Some(node) = self.doc.nodes.iter_mut().find(|n| &n.id == id) else {
            return false;
        };
        node.position = position;
        self.touch();
        true
    }

    /// Delete a node and every edge attached to it.
    pub fn delete_node(&mut self, id: &NodeId) -> bool {
        if self.doc.node(id).is_none() {
            return false;
        }
        let nodes: Vec<Node> = self
            .doc
            .nodes
            .iter()
            .filter(|n| &n.id != id)
            .cloned()
            .collect();
        let edges: Vec<Edge> = self
            .doc
            .edges
            .iter()
            .filter(|e| !e.touches(id))
            .cloned()
            .collect();

        if let Some(orphan) = edges.iter().find(|e| e.touches(id)) {
            tracing::error!(edge = %orphan.id, node = %id, "edge survived node deletion, rejecting");
            return false;
        }

        let removed_edges = self.doc.edges.len() - edges.len();
        self.doc.nodes = nodes;
        self.doc.edges = edges;
        self.touch();
        tracing::debug!(node = %id, removed_edges, "node deleted");
        true
    }

    /// Select exactly one node, or clear the selection with `None`.
    pub fn select_node(&mut self, id: Option<&NodeId>) {
        for node in &mut self.doc.nodes {
            node.selected = Some(&node.id) == id;
        }
        for edge in &mut self.doc.edges {
            edge.selected = false;
        }
        self.touch();
    }

    /// Select a set of nodes, replacing the current selection.
    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        for node in &mut self.doc.nodes {
            node.selected = ids.contains(&node.id);
        }
        for edge in &mut self.doc.edges {
            edge.selected = false;
        }
        self.touch();
    }

    // =========================================================================
    // EDGE OPERATIONS
    // =========================================================================

    /// Connect two distinct live nodes. Returns `None` when either endpoint
    /// is missing or both name the same node.
    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<Edge> {
        if source == target || self.doc.node(source).is_none() || self.doc.node(target).is_none() {
            return None;
        }
        let edge = Edge::new(mint_edge_id(), source.clone(), target.clone());
        self.doc.edges.push(edge.clone());
        self.touch();
        Some(edge)
    }

    /// Merge a partial update into an edge. Missing ids are ignored.
    pub fn update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> bool {
        let Some(edge) = self.doc.edges.iter_mut().find(|e| &e.id == id) else {
            return false;
        };
        edge.apply(patch);
        self.touch();
        true
    }

    /// Delete one edge. Missing ids are ignored.
    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        let before = self.doc.edges.len();
        self.doc.edges.retain(|e| &e.id != id);
        if self.doc.edges.len() == before {
            return false;
        }
        self.touch();
        true
    }

    /// Select one edge, clearing every other selection.
    pub fn select_edge(&mut self, id: &EdgeId) -> bool {
        if self.doc.edge(id).is_none() {
            return false;
        }
        for node in &mut self.doc.nodes {
            node.selected = false;
        }
        for edge in &mut self.doc.edges {
            edge.selected = &edge.id == id;
        }
        self.touch();
        true
    }

    /// Delete the selected nodes and edges, cascading to attached edges.
    pub fn delete_selection(&mut self) -> bool {
        let doomed: BTreeSet<NodeId> = self.selected_nodes().map(|n| n.id.clone()).collect();
        let any_edge = self.doc.edges.iter().any(|e| e.selected);
        if doomed.is_empty() && !any_edge {
            return false;
        }
        self.doc.nodes.retain(|n| !doomed.contains(&n.id));
        self.doc.edges.retain(|e| {
            !e.selected && !doomed.contains(&e.source) && !doomed.contains(&e.target)
        });
        self.touch();
        true
    }
}

// =============================================================================
// TESTS
// =============================================================================
