//! # Core Type Definitions
//!
//! This module contains the value types shared by every part of the editing core:
//! - Identifiers (`NodeId`, `EdgeId`)
//! - Geometry (`Position`, `Size`)
//! - Graph entities (`Node`, `Edge`) and their kind-specific payloads
//! - Edge anchors (`HandleSide`, `HandleRole`, `HandleId`)
//! - Error types (`StrataError`)
//!
//! ## Wire Shape
//!
//! All entities serialize with camelCase keys so a persisted record reads the
//! same regardless of which storage backend wrote it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::primitives::{DEFAULT_NODE_HEIGHT, DEFAULT_NODE_WIDTH};

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier for a node within a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for an edge within a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Create an edge id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Top-left corner of a node in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Translate by an offset.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Rendered size of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_WIDTH, DEFAULT_NODE_HEIGHT)
    }
}

// =============================================================================
// NODE KINDS
// =============================================================================

/// The kind of entity a node represents on an ownership diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Corporation,
    Llc,
    Partnership,
    Trust,
    Individual,
    Fund,
    Foundation,
    Note,
}

/// Seed values applied to a freshly added node of a given kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindDefaults {
    pub label: &'static str,
    pub jurisdiction: Option<&'static str>,
    pub fill_color: &'static str,
    pub border_color: &'static str,
}

impl NodeKind {
    /// Every kind, in palette order.
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Corporation,
        NodeKind::Llc,
        NodeKind::Partnership,
        NodeKind::Trust,
        NodeKind::Individual,
        NodeKind::Fund,
        NodeKind::Foundation,
        NodeKind::Note,
    ];

    /// Default label and display metadata for this kind.
    #[must_use]
    pub const fn defaults(self) -> KindDefaults {
        match self {
            NodeKind::Corporation => KindDefaults {
                label: "New Corporation",
                jurisdiction: Some("Delaware"),
                fill_color: "#dbeafe",
                border_color: "#2563eb",
            },
            NodeKind::Llc => KindDefaults {
                label: "New LLC",
                jurisdiction: Some("Delaware"),
                fill_color: "#dcfce7",
                border_color: "#16a34a",
            },
            NodeKind::Partnership => KindDefaults {
                label: "New Partnership",
                jurisdiction: Some("Delaware"),
                fill_color: "#fef3c7",
                border_color: "#d97706",
            },
            NodeKind::Trust => KindDefaults {
                label: "New Trust",
                jurisdiction: None,
                fill_color: "#f3e8ff",
                border_color: "#9333ea",
            },
            NodeKind::Individual => KindDefaults {
                label: "New Individual",
                jurisdiction: None,
                fill_color: "#ffffff",
                border_color: "#475569",
            },
            NodeKind::Fund => KindDefaults {
                label: "New Fund",
                jurisdiction: Some("Cayman Islands"),
                fill_color: "#e0f2fe",
                border_color: "#0284c7",
            },
            NodeKind::Foundation => KindDefaults {
                label: "New Foundation",
                jurisdiction: None,
                fill_color: "#fce7f3",
                border_color: "#db2777",
            },
            NodeKind::Note => KindDefaults {
                label: "Note",
                jurisdiction: None,
                fill_color: "#fefce8",
                border_color: "#ca8a04",
            },
        }
    }

    /// Short stable name used in ids and on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Corporation => "corporation",
            NodeKind::Llc => "llc",
            NodeKind::Partnership => "partnership",
            NodeKind::Trust => "trust",
            NodeKind::Individual => "individual",
            NodeKind::Fund => "fund",
            NodeKind::Foundation => "foundation",
            NodeKind::Note => "note",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| StrataError::validation("kind", format!("unknown node kind '{s}'")))
    }
}

// =============================================================================
// HANDLES
// =============================================================================

/// One of the four sides of a node an edge may attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl HandleSide {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HandleSide::Top => "top",
            HandleSide::Right => "right",
            HandleSide::Bottom => "bottom",
            HandleSide::Left => "left",
        }
    }
}

/// Whether a handle emits (source) or receives (target) edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandleRole {
    Source,
    Target,
}

/// A concrete anchor point: side × role. Serialized as `"<side>-<role>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandleId {
    pub side: HandleSide,
    pub role: HandleRole,
}

impl HandleId {
    #[must_use]
    pub const fn source(side: HandleSide) -> Self {
        Self {
            side,
            role: HandleRole::Source,
        }
    }

    #[must_use]
    pub const fn target(side: HandleSide) -> Self {
        Self {
            side,
            role: HandleRole::Target,
        }
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self.role {
            HandleRole::Source => "source",
            HandleRole::Target => "target",
        };
        write!(f, "{}-{}", self.side.as_str(), role)
    }
}

impl FromStr for HandleId {
    type Err = StrataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StrataError::validation("handle", format!("invalid handle id '{s}'"));
        let (side, role) = s.split_once('-').ok_or_else(invalid)?;
        let side = match side {
            "top" => HandleSide::Top,
            "right" => HandleSide::Right,
            "bottom" => HandleSide::Bottom,
            "left" => HandleSide::Left,
            _ => return Err(invalid()),
        };
        let role = match role {
            "source" => HandleRole::Source,
            "target" => HandleRole::Target,
            _ => return Err(invalid()),
        };
        Ok(Self { side, role })
    }
}

impl TryFrom<String> for HandleId {
    type Error = StrataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HandleId> for String {
    fn from(handle: HandleId) -> Self {
        handle.to_string()
    }
}

// =============================================================================
// NODE
// =============================================================================

/// Kind-specific attributes of a node.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeData {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
}

impl NodeData {
    /// Seed data for a freshly added node of `kind`.
    #[must_use]
    pub fn for_kind(kind: NodeKind) -> Self {
        let defaults = kind.defaults();
        Self {
            label: defaults.label.to_string(),
            jurisdiction: defaults.jurisdiction.map(str::to_string),
            notes: None,
            fill_color: Some(defaults.fill_color.to_string()),
            border_color: Some(defaults.border_color.to_string()),
            text_color: None,
        }
    }

    /// Merge a partial update. Fields left as `None` in the patch are kept.
    pub fn apply(&mut self, patch: &NodeDataPatch) {
        if let Some(label) = &patch.label {
            self.label.clone_from(label);
        }
        if let Some(jurisdiction) = &patch.jurisdiction {
            self.jurisdiction = Some(jurisdiction.clone());
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(color) = &patch.fill_color {
            self.fill_color = Some(color.clone());
        }
        if let Some(color) = &patch.border_color {
            self.border_color = Some(color.clone());
        }
        if let Some(color) = &patch.text_color {
            self.text_color = Some(color.clone());
        }
    }
}

/// Partial update for [`NodeData`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeDataPatch {
    pub label: Option<String>,
    pub jurisdiction: Option<String>,
    pub notes: Option<String>,
    pub fill_color: Option<String>,
    pub border_color: Option<String>,
    pub text_color: Option<String>,
}

/// A diagram entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default)]
    pub data: NodeData,
    #[serde(default)]
    pub selected: bool,
    /// Side outgoing edges leave from, assigned by auto-layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<HandleSide>,
    /// Side incoming edges arrive at, assigned by auto-layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_position: Option<HandleSide>,
}

impl Node {
    /// Create an unselected node with kind defaults.
    #[must_use]
    pub fn new(id: NodeId, kind: NodeKind, position: Position) -> Self {
        Self {
            id,
            kind,
            position,
            size: None,
            data: NodeData::for_kind(kind),
            selected: false,
            source_position: None,
            target_position: None,
        }
    }

    /// Width, falling back to the default node width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.size.map_or(DEFAULT_NODE_WIDTH, |s| s.width)
    }

    /// Height, falling back to the default node height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.size.map_or(DEFAULT_NODE_HEIGHT, |s| s.height)
    }

    /// Center point of the node's bounding box.
    #[must_use]
    pub fn center(&self) -> Position {
        Position::new(
            self.position.x + self.width() / 2.0,
            self.position.y + self.height() / 2.0,
        )
    }
}

// =============================================================================
// EDGE
// =============================================================================

/// Ownership / lineage attributes of an edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeData {
    /// Ownership stake in percent (0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership: Option<f64>,
    /// Relationship kind, e.g. "owns", "controls", "derives".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Partial update for an [`Edge`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgePatch {
    pub label: Option<String>,
    pub source_handle: Option<HandleId>,
    pub target_handle: Option<HandleId>,
    pub ownership: Option<f64>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
}

/// A directed ownership or lineage relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<HandleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleId>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: EdgeData,
    #[serde(default)]
    pub selected: bool,
}

impl Edge {
    /// Create an unlabeled, unselected edge.
    #[must_use]
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            source_handle: None,
            target_handle: None,
            label: String::new(),
            data: EdgeData::default(),
            selected: false,
        }
    }

    /// Check whether the edge touches the given node.
    #[must_use]
    pub fn touches(&self, node: &NodeId) -> bool {
        &self.source == node || &self.target == node
    }

    /// Merge a partial update. Fields left as `None` in the patch are kept.
    pub fn apply(&mut self, patch: &EdgePatch) {
        if let Some(label) = &patch.label {
            self.label.clone_from(label);
        }
        if let Some(handle) = patch.source_handle {
            self.source_handle = Some(handle);
        }
        if let Some(handle) = patch.target_handle {
            self.target_handle = Some(handle);
        }
        if let Some(ownership) = patch.ownership {
            self.data.ownership = Some(ownership);
        }
        if let Some(relationship) = &patch.relationship {
            self.data.relationship = Some(relationship.clone());
        }
        if let Some(notes) = &patch.notes {
            self.data.notes = Some(notes.clone());
        }
    }
}

/// A set of nodes and the edges among them, detached from any document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    #[must_use]
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Strata editing core.
///
/// Ordinary editing never produces one of these: operating on a missing id is
/// a no-op and "nothing to do" is reported as `false`. Errors are reserved for
/// the persistence boundary and for internal guards.
#[derive(Debug, Error)]
pub enum StrataError {
    /// A malformed import or export payload. Names the offending field.
    #[error("Invalid field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// The storage area has no room for the record.
    #[error("Storage full: record needs {needed} bytes, {available} available")]
    StorageFull { needed: usize, available: usize },

    /// Persisted bytes are unreadable or structurally invalid.
    #[error("Stored document is corrupt: {0}")]
    StorageCorrupt(String),

    /// An internal invariant guard tripped; the operation was rejected.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred in a storage backend.
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StrataError {
    /// Shorthand for a [`StrataError::Validation`].
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field for validation errors.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
