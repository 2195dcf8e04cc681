//! # Editor
//!
//! The application root of the editing core. An `Editor` owns one
//! [`DocumentStore`] and hands it by reference to the history manager,
//! clipboard, alignment and layout engines, and persistence coordinator.
//!
//! Every editing method runs to completion synchronously and then commits:
//! the store's pending change (if any) is offered to history as exactly one
//! snapshot. Compound operations therefore undo as a single step.

use crate::align::{self, AlignType, DistributeAxis};
use crate::clipboard::Clipboard;
use crate::document::{DiagramDocument, DocumentStore};
use crate::history::History;
use crate::layout::{self, LayoutOptions};
use crate::persistence::{DocumentMetadata, PersistedDocument, Persistence};
use crate::primitives::{HISTORY_LIMIT, PASTE_OFFSET};
use crate::query::Query;
use crate::storage::DocumentStorage;
use crate::types::{Edge, EdgeId, EdgePatch, Node, NodeDataPatch, NodeId, NodeKind, Position, Subgraph};
use crate::StrataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Editing behavior tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorOptions {
    /// Maximum retained undo steps.
    pub history_limit: usize,
    /// Offset applied on both axes to pasted nodes.
    pub paste_offset: f64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            history_limit: HISTORY_LIMIT,
            paste_offset: PASTE_OFFSET,
        }
    }
}

/// What an auto-layout pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOutcome {
    /// Nodes repositioned.
    pub nodes: usize,
    /// The edge set contains a cycle; ranks were broken deterministically.
    pub cyclic: bool,
}

/// Document store plus history, clipboard and the operations over them.
#[derive(Debug, Clone)]
pub struct Editor {
    store: DocumentStore,
    history: History,
    clipboard: Clipboard,
    options: EditorOptions,
}

impl Default for Editor {
    fn default() -> Self {
        Self::with_document(DiagramDocument::default(), EditorOptions::default())
    }
}

impl Editor {
    /// Editor on a fresh, empty document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_document(DiagramDocument::new(name), EditorOptions::default())
    }

    /// Editor on an existing document. History starts at that state.
    #[must_use]
    pub fn with_document(doc: DiagramDocument, options: EditorOptions) -> Self {
        let store = DocumentStore::with_document(doc);
        let mut history = History::new(options.history_limit);
        history.reset(store.snapshot());
        Self {
            store,
            history,
            clipboard: Clipboard::with_offset(options.paste_offset),
            options,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    #[must_use]
    pub fn document(&self) -> &DiagramDocument {
        self.store.document()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    #[must_use]
    pub fn options(&self) -> EditorOptions {
        self.options
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Offer the store's pending change to history.
    fn commit(&mut self) -> bool {
        self.history.observe(&mut self.store)
    }

    // =========================================================================
    // DOCUMENT LIFECYCLE
    // =========================================================================

    /// Replace the current document and start a fresh history.
    pub fn open(&mut self, doc: DiagramDocument) {
        tracing::info!(document = %doc.id, nodes = doc.nodes.len(), "opening document");
        self.store.replace_document(doc);
        self.history.reset(self.store.snapshot());
    }

    /// Open a loaded record as a clean document.
    pub fn open_record(&mut self, record: PersistedDocument) {
        self.open(record.into_document());
    }

    /// Open an imported record. It is dirty until first saved.
    pub fn open_import(&mut self, record: PersistedDocument) {
        let mut doc = record.into_document();
        doc.dirty = true;
        doc.last_saved_at = None;
        self.open(doc);
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.store.rename(name);
        self.commit();
    }

    /// Save through `persistence`, clearing dirty if nothing changed meanwhile.
    pub fn save_to<S: DocumentStorage>(
        &mut self,
        persistence: &mut Persistence<S>,
    ) -> Result<DocumentMetadata, StrataError> {
        let revision = self.store.revision();
        let metadata = persistence.save(self.store.document())?;
        self.store.mark_saved(revision, metadata.updated_at);
        Ok(metadata)
    }

    /// Record a save of `revision` completed elsewhere.
    pub fn mark_saved(&mut self, revision: u64, saved_at: DateTime<Utc>) -> bool {
        self.store.mark_saved(revision, saved_at)
    }

    pub fn check_invariants(&self) -> Result<(), StrataError> {
        self.store.document().check_invariants()
    }

    // =========================================================================
    // GRAPH EDITING
    // =========================================================================

    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Node {
        let node = self.store.add_node(kind, position);
        self.commit();
        node
    }

    pub fn add_edge(&mut self, source: &NodeId, target: &NodeId) -> Option<Edge> {
        let edge = self.store.add_edge(source, target);
        self.commit();
        edge
    }

    pub fn update_node(&mut self, id: &NodeId, patch: &NodeDataPatch) -> bool {
        let changed = self.store.update_node(id, patch);
        self.commit();
        changed
    }

    pub fn move_node(&mut self, id: &NodeId, position: Position) -> bool {
        let changed = self.store.move_node(id, position);
        self.commit();
        changed
    }

    pub fn update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> bool {
        let changed = self.store.update_edge(id, patch);
        self.commit();
        changed
    }

    pub fn delete_node(&mut self, id: &NodeId) -> bool {
        let changed = self.store.delete_node(id);
        self.commit();
        changed
    }

    pub fn delete_edge(&mut self, id: &EdgeId) -> bool {
        let changed = self.store.delete_edge(id);
        self.commit();
        changed
    }

    pub fn delete_selection(&mut self) -> bool {
        let changed = self.store.delete_selection();
        self.commit();
        changed
    }

    pub fn select_node(&mut self, id: Option<&NodeId>) {
        self.store.select_node(id);
        self.commit();
    }

    pub fn select_nodes(&mut self, ids: &[NodeId]) {
        self.store.select_nodes(ids);
        self.commit();
    }

    pub fn select_edge(&mut self, id: &EdgeId) -> bool {
        let changed = self.store.select_edge(id);
        self.commit();
        changed
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.store)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.store)
    }

    // =========================================================================
    // CLIPBOARD
    // =========================================================================

    pub fn copy(&mut self) -> bool {
        self.clipboard.copy(&self.store)
    }

    pub fn cut(&mut self) -> bool {
        let changed = self.clipboard.cut(&mut self.store);
        self.commit();
        changed
    }

    pub fn paste(&mut self) -> bool {
        let changed = self.clipboard.paste(&mut self.store);
        self.commit();
        changed
    }

    pub fn duplicate(&mut self) -> bool {
        let changed = self.clipboard.duplicate(&mut self.store);
        self.commit();
        changed
    }

    // =========================================================================
    // GEOMETRY
    // =========================================================================

    pub fn align(&mut self, ty: AlignType) -> bool {
        let changed = align::align(&mut self.store, ty);
        self.commit();
        changed
    }

    pub fn distribute(&mut self, axis: DistributeAxis) -> bool {
        let changed = align::distribute(&mut self.store, axis);
        self.commit();
        changed
    }

    /// Lay out the whole document as one undoable step.
    pub fn auto_layout(&mut self, options: &LayoutOptions) -> LayoutOutcome {
        let nodes = self.store.nodes();
        let edges = self.store.edges();
        let cyclic = layout::has_cycle(nodes, edges);
        if cyclic {
            tracing::warn!(document = %self.document().id, "graph contains a cycle; ranks are approximate");
        }
        if nodes.is_empty() {
            return LayoutOutcome { nodes: 0, cyclic };
        }

        let Subgraph { nodes, edges } = layout::auto_layout(nodes, edges, options);
        let count = nodes.len();
        self.store.update_graph(move |n, e| {
            *n = nodes;
            *e = edges;
        });
        self.commit();
        LayoutOutcome {
            nodes: count,
            cyclic,
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    #[must_use]
    pub fn query(&self, query: &Query) -> Subgraph {
        query.execute(self.store.document())
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        layout::has_cycle(self.store.nodes(), self.store.edges())
    }
}

// =============================================================================
// TESTS
// =============================================================================
