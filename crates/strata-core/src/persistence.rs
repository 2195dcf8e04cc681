//! # Persistence Coordinator
//!
//! JSON records for documents, written to a [`DocumentStorage`] area under
//! `"<storage key>:<document id>"`.
//!
//! Record shape:
//!
//! ```text
//! { id, name, nodes: [...], edges: [...],
//!   metadata: { createdAt, updatedAt, version } }
//! ```
//!
//! ## Failure Model
//!
//! - `save` propagates [`StrataError::StorageFull`] distinctly from I/O errors.
//! - `load` treats a missing key and a corrupt record the same way: `None`.
//!   Corruption is logged so callers can fall back to an empty document
//!   without special-casing.
//! - `import_document` validates the payload field by field before decoding,
//!   in the order `id`, `name`, `nodes`, `edges`, `metadata`; the first
//!   failing check names the offending field.

use crate::document::DiagramDocument;
use crate::primitives::{FORMAT_VERSION, MAX_IMPORT_BYTES, MAX_IMPORT_EDGES, MAX_IMPORT_NODES};
use crate::storage::DocumentStorage;
use crate::types::{Edge, Node, NodeId};
use crate::StrataError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// RECORD TYPES
// =============================================================================

/// Bookkeeping stored alongside every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: String,
}

/// One persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub metadata: DocumentMetadata,
}

impl PersistedDocument {
    /// Build a record from a live document.
    #[must_use]
    pub fn from_document(doc: &DiagramDocument, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.name.clone(),
            nodes: doc.nodes.clone(),
            edges: doc.edges.clone(),
            metadata: DocumentMetadata {
                created_at,
                updated_at,
                version: FORMAT_VERSION.to_string(),
            },
        }
    }

    /// Turn a stored record back into a clean document.
    #[must_use]
    pub fn into_document(self) -> DiagramDocument {
        DiagramDocument {
            id: self.id,
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
            dirty: false,
            created_at: self.metadata.created_at,
            last_saved_at: Some(self.metadata.updated_at),
        }
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Decode stored bytes, reporting any failure as [`StrataError::StorageCorrupt`].
pub fn decode_record(bytes: &[u8]) -> Result<PersistedDocument, StrataError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StrataError::StorageCorrupt(e.to_string()))?;
    validate_record(value).map_err(|e| StrataError::StorageCorrupt(e.to_string()))
}

/// Pretty-printed JSON export of a document.
pub fn export_document(doc: &DiagramDocument) -> Result<String, StrataError> {
    let now = Utc::now();
    let record = PersistedDocument::from_document(doc, doc.created_at, doc.last_saved_at.unwrap_or(now));
    serde_json::to_string_pretty(&record).map_err(|e| StrataError::Serialization(e.to_string()))
}

/// Parse and validate an exported document.
pub fn import_document(text: &str) -> Result<PersistedDocument, StrataError> {
    if text.len() > MAX_IMPORT_BYTES {
        return Err(StrataError::validation(
            "document",
            format!("payload of {} bytes exceeds {MAX_IMPORT_BYTES}", text.len()),
        ));
    }
    let value: Value = serde_json::from_str(text)
        .map_err(|e| StrataError::validation("document", format!("not valid JSON: {e}")))?;
    validate_record(value)
}

fn validate_record(value: Value) -> Result<PersistedDocument, StrataError> {
    let Value::Object(mut map) = value else {
        return Err(StrataError::validation("document", "expected a JSON object"));
    };

    // Shape checks, in field order.
    let id = match map.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => return Err(StrataError::validation("id", "expected a non-empty string")),
    };
    let name = match map.remove("name") {
        Some(Value::String(name)) => name,
        _ => return Err(StrataError::validation("name", "expected a string")),
    };
    let Some(Value::Array(raw_nodes)) = map.remove("nodes") else {
        return Err(StrataError::validation("nodes", "expected an array"));
    };
    let Some(Value::Array(raw_edges)) = map.remove("edges") else {
        return Err(StrataError::validation("edges", "expected an array"));
    };
    let Some(Value::Object(raw_metadata)) = map.remove("metadata") else {
        return Err(StrataError::validation("metadata", "expected an object"));
    };

    if raw_nodes.len() > MAX_IMPORT_NODES {
        return Err(StrataError::validation(
            "nodes",
            format!("{} nodes exceeds limit {MAX_IMPORT_NODES}", raw_nodes.len()),
        ));
    }
    if raw_edges.len() > MAX_IMPORT_EDGES {
        return Err(StrataError::validation(
            "edges",
            format!("{} edges exceeds limit {MAX_IMPORT_EDGES}", raw_edges.len()),
        ));
    }

    // Entry decoding.
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    for (i, raw) in raw_nodes.into_iter().enumerate() {
        let node: Node = serde_json::from_value(raw)
            .map_err(|e| StrataError::validation("nodes", format!("entry {i}: {e}")))?;
        if !seen.insert(node.id.clone()) {
            return Err(StrataError::validation(
                "nodes",
                format!("duplicate node id {}", node.id),
            ));
        }
        nodes.push(node);
    }

    let mut edges = Vec::with_capacity(raw_edges.len());
    for (i, raw) in raw_edges.into_iter().enumerate() {
        let edge: Edge = serde_json::from_value(raw)
            .map_err(|e| StrataError::validation("edges", format!("entry {i}: {e}")))?;
        if seen.contains(&edge.source) && seen.contains(&edge.target) {
            edges.push(edge);
        } else {
            tracing::warn!(
                edge = %edge.id,
                source = %edge.source,
                target = %edge.target,
                "dropping edge with a missing endpoint"
            );
        }
    }

    let metadata = decode_metadata(&raw_metadata)?;
    Ok(PersistedDocument {
        id,
        name,
        nodes,
        edges,
        metadata,
    })
}

fn decode_metadata(raw: &serde_json::Map<String, Value>) -> Result<DocumentMetadata, StrataError> {
    let timestamp = |key: &str| -> Result<Option<DateTime<Utc>>, StrataError> {
        match raw.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => DateTime::parse_from_rfc3339(text)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| StrataError::validation("metadata", format!("{key}: {e}"))),
            Some(_) => Err(StrataError::validation("metadata", format!("{key}: expected a string"))),
        }
    };

    let now = Utc::now();
    let created_at = timestamp("createdAt")?.unwrap_or(now);
    let updated_at = timestamp("updatedAt")?.unwrap_or(created_at);
    let version = match raw.get("version") {
        None | Some(Value::Null) => FORMAT_VERSION.to_string(),
        Some(Value::String(v)) => v.clone(),
        Some(_) => return Err(StrataError::validation("metadata", "version: expected a string")),
    };
    Ok(DocumentMetadata {
        created_at,
        updated_at,
        version,
    })
}

// =============================================================================
// COORDINATOR
// =============================================================================

/// Saves, loads and lists documents in one storage area.
#[derive(Debug)]
pub struct Persistence<S: DocumentStorage> {
    storage: S,
    key: String,
}

impl<S: DocumentStorage> Persistence<S> {
    /// Coordinator writing under `key` in `storage`.
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:{id}", self.key)
    }

    /// Write `doc`, preserving `createdAt` from any existing record.
    pub fn save(&mut self, doc: &DiagramDocument) -> Result<DocumentMetadata, StrataError> {
        let key = self.record_key(&doc.id);
        let created_at = self
            .storage
            .read(&key)?
            .and_then(|bytes| decode_record(&bytes).ok())
            .map_or(doc.created_at, |existing| existing.metadata.created_at);

        let record = PersistedDocument::from_document(doc, created_at, Utc::now());
        let bytes =
            serde_json::to_vec(&record).map_err(|e| StrataError::Serialization(e.to_string()))?;
        self.storage.write(&key, &bytes)?;

        tracing::info!(
            document = %doc.id,
            nodes = record.nodes.len(),
            edges = record.edges.len(),
            bytes = bytes.len(),
            "document saved"
        );
        Ok(record.metadata)
    }

    /// Read a document. Missing and corrupt records both yield `None`.
    pub fn load(&self, id: &str) -> Result<Option<PersistedDocument>, StrataError> {
        let Some(bytes) = self.storage.read(&self.record_key(id))? else {
            return Ok(None);
        };
        match decode_record(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                tracing::warn!(document = %id, error = %err, "ignoring unreadable record");
                Ok(None)
            }
        }
    }

    /// Ids of every stored document.
    pub fn list(&self) -> Result<Vec<String>, StrataError> {
        let prefix = format!("{}:", self.key);
        Ok(self
            .storage
            .keys(&prefix)?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Remove a stored document. Returns whether it existed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StrataError> {
        let removed = self.storage.remove(&self.record_key(id))?;
        if removed {
            tracing::info!(document = %id, "document deleted");
        }
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
