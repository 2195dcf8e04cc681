//! # strata-core
//!
//! The editing core of Strata, an editor for hierarchical ownership and
//! lineage diagrams.
//!
//! A diagram is a directed graph: nodes are entities (corporations, trusts,
//! individuals, funds...) and edges are ownership or lineage relationships.
//! This crate owns that graph and every operation on it.
//!
//! ## Architecture
//!
//! - `document`: the graph document store, the single mutation surface
//! - `history`: bounded snapshot undo/redo with coalescing
//! - `clipboard`: copy/cut/paste/duplicate with id remapping
//! - `align`: alignment and distribution of selections
//! - `layout`: hierarchical auto-layout, handle selection, cycle detection
//! - `storage` + `persistence`: keyed JSON records with a capacity quota
//! - `editor`: the application root that ties the above together
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-threaded: every operation runs to completion
//! - No async runtime and no network dependencies
//! - Deterministic: layout and id remapping never depend on hash order
//! - Editing never fails: a missing id is a no-op; errors are reserved for
//!   the persistence boundary

// =============================================================================
// MODULES
// =============================================================================

pub mod align;
pub mod clipboard;
pub mod document;
pub mod editor;
pub mod history;
pub mod layout;
pub mod persistence;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    Edge, EdgeData, EdgeId, EdgePatch, HandleId, HandleRole, HandleSide, KindDefaults, Node,
    NodeData, NodeDataPatch, NodeId, NodeKind, Position, Size, StrataError, Subgraph,
};

// =============================================================================
// RE-EXPORTS: Editing Engine
// =============================================================================

pub use align::{AlignType, DistributeAxis};
pub use clipboard::Clipboard;
pub use document::{DiagramDocument, DocumentStore};
pub use editor::{Editor, EditorOptions, LayoutOutcome};
pub use history::{ApplyState, History, HistorySnapshot};
pub use layout::{LayoutDirection, LayoutOptions, auto_layout, has_cycle};
pub use query::{Query, QueryType};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use persistence::{
    DocumentMetadata, PersistedDocument, Persistence, decode_record, export_document,
    import_document,
};
pub use storage::{DocumentStorage, MemoryStorage, RedbStorage, StorageBackend};
