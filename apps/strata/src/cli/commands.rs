//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Each
//! editing command loads the document, applies one operation through the
//! [`Editor`] and saves it back.

use crate::config::StrataConfig;
use std::path::{Path, PathBuf};
use strata_core::{
    AlignType, DiagramDocument, DistributeAxis, EdgePatch, Editor, LayoutDirection, Node,
    NodeDataPatch, NodeId, NodeKind, Persistence, PersistedDocument, Position, Query,
    StorageBackend, StrataError, Subgraph, export_document, import_document,
    primitives::MAX_IMPORT_BYTES,
};

// =============================================================================
// OUTPUT
// =============================================================================

/// Output mode shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Print a human-readable status line unless quiet or in JSON mode.
    pub fn info(self, message: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            println!("{message}");
        }
    }

    pub fn json(self, value: &serde_json::Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

// =============================================================================
// FILE VALIDATION
// =============================================================================

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: usize) -> Result<(), StrataError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| StrataError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size as u64 {
        return Err(StrataError::Serialization(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, StrataError> {
    let canonical = path.canonicalize().map_err(|e| {
        StrataError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(StrataError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must already exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, StrataError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        StrataError::Io(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(StrataError::Io(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| StrataError::Io("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// DOCUMENT HELPERS
// =============================================================================

/// Open the configured document store.
pub fn open_store(config: &StrataConfig) -> Result<Persistence<StorageBackend>, StrataError> {
    config.storage.open()
}

/// Load a stored record, failing when it is absent or unreadable.
pub fn load_record(
    persistence: &Persistence<StorageBackend>,
    id: &str,
) -> Result<PersistedDocument, StrataError> {
    persistence
        .load(id)?
        .ok_or_else(|| StrataError::validation("document", format!("no stored document '{id}'")))
}

/// Load a stored document into a fresh editor.
pub fn load_editor(
    config: &StrataConfig,
    persistence: &Persistence<StorageBackend>,
    id: &str,
) -> Result<Editor, StrataError> {
    let record = load_record(persistence, id)?;
    Ok(Editor::with_document(record.into_document(), config.editor))
}

/// Find a node by id, by 1-based `#n` index, or by a label matching exactly
/// one node (case-insensitive).
pub fn resolve_node(doc: &DiagramDocument, token: &str) -> Result<NodeId, StrataError> {
    if let Some(index) = token.strip_prefix('#') {
        let n: usize = index
            .parse()
            .map_err(|_| StrataError::validation("node", format!("bad index '{token}'")))?;
        return n
            .checked_sub(1)
            .and_then(|i| doc.nodes.get(i))
            .map(|node| node.id.clone())
            .ok_or_else(|| StrataError::validation("node", format!("no node at {token}")));
    }

    if let Some(node) = doc.nodes.iter().find(|n| n.id.as_str() == token) {
        return Ok(node.id.clone());
    }

    let mut matches = doc
        .nodes
        .iter()
        .filter(|n| n.data.label.eq_ignore_ascii_case(token));
    match (matches.next(), matches.next()) {
        (Some(node), None) => Ok(node.id.clone()),
        (Some(_), Some(_)) => Err(StrataError::validation(
            "node",
            format!("label '{token}' matches more than one node"),
        )),
        (None, _) => Err(StrataError::validation(
            "node",
            format!("no node matches '{token}'"),
        )),
    }
}

/// Resolve each token, or every node when none are given.
fn resolve_nodes(doc: &DiagramDocument, tokens: &[String]) -> Result<Vec<NodeId>, StrataError> {
    if tokens.is_empty() {
        return Ok(doc.nodes.iter().map(|n| n.id.clone()).collect());
    }
    tokens.iter().map(|t| resolve_node(doc, t)).collect()
}

/// One-line description of a node.
pub fn describe_node(index: usize, node: &Node) -> String {
    let mut line = format!(
        "#{:<3} {} ({}) at ({}, {})  [{}]",
        index + 1,
        node.data.label,
        node.kind,
        node.position.x,
        node.position.y,
        node.id
    );
    if let Some(jurisdiction) = &node.data.jurisdiction {
        line.push_str(&format!("  {jurisdiction}"));
    }
    line
}

fn label_of<'a>(doc: &'a DiagramDocument, id: &'a NodeId) -> &'a str {
    doc.node(id).map_or(id.as_str(), |n| n.data.label.as_str())
}

fn print_subgraph(doc: &DiagramDocument, result: &Subgraph, out: Output) {
    if out.json {
        out.json(&serde_json::json!({
            "nodes": result.nodes,
            "edges": result.edges,
        }));
        return;
    }
    if result.is_empty() {
        println!("No matching nodes");
        return;
    }
    for node in &result.nodes {
        let index = doc.nodes.iter().position(|n| n.id == node.id).unwrap_or_default();
        println!("{}", describe_node(index, node));
    }
    for edge in &result.edges {
        println!(
            "  {} -> {}",
            label_of(doc, &edge.source),
            label_of(doc, &edge.target)
        );
    }
}

/// Save an edited document back and report it.
fn store_editor(
    editor: &mut Editor,
    persistence: &mut Persistence<StorageBackend>,
) -> Result<(), StrataError> {
    let metadata = editor.save_to(persistence)?;
    tracing::debug!(document = %editor.document().id, updated = %metadata.updated_at, "stored");
    Ok(())
}

// =============================================================================
// DOCUMENT COMMANDS
// =============================================================================

/// Create an empty document.
pub fn cmd_new(config: &StrataConfig, out: Output, name: &str) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let mut editor = Editor::with_document(DiagramDocument::new(name), config.editor);
    let metadata = editor.save_to(&mut persistence)?;

    if out.json {
        out.json(&serde_json::json!({
            "id": editor.document().id,
            "name": editor.document().name,
            "createdAt": metadata.created_at,
        }));
    } else {
        println!("{}", editor.document().id);
        out.info(format!("Created '{}'", name));
    }
    Ok(())
}

/// List stored documents.
pub fn cmd_list(config: &StrataConfig, out: Output) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let ids = persistence.list()?;
    let records: Vec<PersistedDocument> = ids
        .iter()
        .filter_map(|id| persistence.load(id).ok().flatten())
        .collect();

    if out.json {
        let entries: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "name": r.name,
                    "nodes": r.nodes.len(),
                    "edges": r.edges.len(),
                    "updatedAt": r.metadata.updated_at,
                })
            })
            .collect();
        out.json(&serde_json::Value::Array(entries));
        return Ok(());
    }

    if records.is_empty() {
        out.info("No stored documents");
        return Ok(());
    }
    for r in &records {
        println!(
            "{}  {}  ({} nodes, {} edges, saved {})",
            r.id,
            r.name,
            r.nodes.len(),
            r.edges.len(),
            r.metadata.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

/// Print a document.
pub fn cmd_show(config: &StrataConfig, out: Output, id: &str) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let record = load_record(&persistence, id)?;

    if out.json {
        out.json(&serde_json::to_value(&record).map_err(|e| StrataError::Serialization(e.to_string()))?);
        return Ok(());
    }

    let metadata = record.metadata.clone();
    let doc = record.into_document();
    println!("{}", doc.name);
    println!("{}", "=".repeat(doc.name.chars().count().max(8)));
    println!("Id:      {}", doc.id);
    println!("Created: {}", metadata.created_at.to_rfc3339());
    println!("Saved:   {}", metadata.updated_at.to_rfc3339());
    println!();
    println!("Nodes ({}):", doc.nodes.len());
    for (i, node) in doc.nodes.iter().enumerate() {
        println!("  {}", describe_node(i, node));
    }
    println!();
    println!("Edges ({}):", doc.edges.len());
    for edge in &doc.edges {
        let stake = edge
            .data
            .ownership
            .map(|pct| format!("  {pct}%"))
            .unwrap_or_default();
        println!(
            "  {} -> {}{}  [{}]",
            label_of(&doc, &edge.source),
            label_of(&doc, &edge.target),
            stake,
            edge.id
        );
    }
    Ok(())
}

/// Remove a stored document.
pub fn cmd_delete(config: &StrataConfig, out: Output, id: &str) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let removed = persistence.delete(id)?;
    if out.json {
        out.json(&serde_json::json!({ "id": id, "deleted": removed }));
    } else if removed {
        out.info(format!("Deleted {id}"));
    } else {
        return Err(StrataError::validation("document", format!("no stored document '{id}'")));
    }
    Ok(())
}

// =============================================================================
// EDITING COMMANDS
// =============================================================================

/// Add a node.
pub fn cmd_add_node(
    config: &StrataConfig,
    out: Output,
    id: &str,
    kind: NodeKind,
    label: Option<String>,
    jurisdiction: Option<String>,
    x: f64,
    y: f64,
) -> Result<(), StrataError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(StrataError::validation("position", "coordinates must be finite"));
    }
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;

    let node = editor.add_node(kind, Position::new(x, y));
    if label.is_some() || jurisdiction.is_some() {
        let patch = NodeDataPatch {
            label,
            jurisdiction,
            ..NodeDataPatch::default()
        };
        editor.update_node(&node.id, &patch);
    }
    store_editor(&mut editor, &mut persistence)?;

    if out.json {
        out.json(&serde_json::json!({ "id": node.id }));
    } else {
        println!("{}", node.id);
    }
    Ok(())
}

/// Connect two nodes.
pub fn cmd_connect(
    config: &StrataConfig,
    out: Output,
    id: &str,
    source: &str,
    target: &str,
    ownership: Option<f64>,
    relationship: Option<String>,
) -> Result<(), StrataError> {
    if let Some(pct) = ownership {
        if !(0.0..=100.0).contains(&pct) {
            return Err(StrataError::validation(
                "ownership",
                format!("{pct} is outside 0-100"),
            ));
        }
    }
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;
    let source = resolve_node(editor.document(), source)?;
    let target = resolve_node(editor.document(), target)?;

    let edge = editor.add_edge(&source, &target).ok_or_else(|| {
        StrataError::validation("edge", "endpoints must be two distinct existing nodes")
    })?;
    if ownership.is_some() || relationship.is_some() {
        let patch = EdgePatch {
            ownership,
            relationship,
            ..EdgePatch::default()
        };
        editor.update_edge(&edge.id, &patch);
    }
    store_editor(&mut editor, &mut persistence)?;

    if out.json {
        out.json(&serde_json::json!({ "id": edge.id }));
    } else {
        println!("{}", edge.id);
    }
    Ok(())
}

/// Delete a node and every edge touching it.
pub fn cmd_delete_node(
    config: &StrataConfig,
    out: Output,
    id: &str,
    node: &str,
) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;
    let node = resolve_node(editor.document(), node)?;
    let edges_before = editor.document().edges.len();

    editor.delete_node(&node);
    let removed_edges = edges_before - editor.document().edges.len();
    store_editor(&mut editor, &mut persistence)?;

    if out.json {
        out.json(&serde_json::json!({ "deleted": node, "edges_removed": removed_edges }));
    } else {
        out.info(format!("Deleted {node} and {removed_edges} edge(s)"));
    }
    Ok(())
}

// =============================================================================
// ARRANGEMENT COMMANDS
// =============================================================================

/// Run auto-layout.
pub fn cmd_layout(
    config: &StrataConfig,
    out: Output,
    id: &str,
    direction: Option<LayoutDirection>,
) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;
    let options = direction.map_or(config.layout, |d| config.layout.directed(d));

    let outcome = editor.auto_layout(&options);
    store_editor(&mut editor, &mut persistence)?;

    if out.json {
        out.json(&serde_json::json!({
            "nodes": outcome.nodes,
            "direction": options.direction.as_str(),
            "cyclic": outcome.cyclic,
        }));
    } else {
        out.info(format!(
            "Laid out {} node(s) {}",
            outcome.nodes,
            options.direction.as_str()
        ));
        if outcome.cyclic {
            println!("warning: the graph contains a cycle; ranks are approximate");
        }
    }
    Ok(())
}

/// Align nodes.
pub fn cmd_align(
    config: &StrataConfig,
    out: Output,
    id: &str,
    alignment: AlignType,
    nodes: &[String],
) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;
    let targets = resolve_nodes(editor.document(), nodes)?;

    editor.select_nodes(&targets);
    let moved = editor.align(alignment);
    editor.select_node(None);
    store_editor(&mut editor, &mut persistence)?;

    report_arrangement(out, "aligned", alignment.as_str(), targets.len(), moved);
    Ok(())
}

/// Distribute nodes.
pub fn cmd_distribute(
    config: &StrataConfig,
    out: Output,
    id: &str,
    axis: DistributeAxis,
    nodes: &[String],
) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let mut editor = load_editor(config, &persistence, id)?;
    let targets = resolve_nodes(editor.document(), nodes)?;

    editor.select_nodes(&targets);
    let moved = editor.distribute(axis);
    editor.select_node(None);
    store_editor(&mut editor, &mut persistence)?;

    report_arrangement(out, "distributed", axis.as_str(), targets.len(), moved);
    Ok(())
}

fn report_arrangement(out: Output, verb: &str, how: &str, count: usize, applied: bool) {
    if out.json {
        out.json(&serde_json::json!({ "mode": how, "nodes": count, "applied": applied }));
    } else if applied {
        out.info(format!("{} {} node(s) {}", verb, count, how));
    } else {
        println!("Too few nodes to arrange ({count})");
    }
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Report cycles.
pub fn cmd_cycles(config: &StrataConfig, out: Output, id: &str) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let editor = load_editor(config, &persistence, id)?;
    let cyclic = editor.has_cycle();

    if out.json {
        out.json(&serde_json::json!({ "cyclic": cyclic }));
    } else if cyclic {
        println!("The ownership graph contains a cycle");
    } else {
        println!("No cycles");
    }
    Ok(())
}

/// Print the upstream or downstream lineage of a node.
pub fn cmd_lineage(
    config: &StrataConfig,
    out: Output,
    id: &str,
    node: &str,
    downstream: bool,
    depth: Option<usize>,
) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let editor = load_editor(config, &persistence, id)?;
    let start = resolve_node(editor.document(), node)?;

    let mut query = if downstream {
        Query::downstream(start)
    } else {
        Query::upstream(start)
    };
    if let Some(depth) = depth {
        query = query.with_depth(depth);
    }
    let result = editor.query(&query);
    print_subgraph(editor.document(), &result, out);
    Ok(())
}

/// Search labels and notes.
pub fn cmd_search(
    config: &StrataConfig,
    out: Output,
    id: &str,
    text: &str,
) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let editor = load_editor(config, &persistence, id)?;
    let result = editor.query(&Query::search(text));
    print_subgraph(editor.document(), &result, out);
    Ok(())
}

// =============================================================================
// EXCHANGE COMMANDS
// =============================================================================

/// Export a document as JSON.
pub fn cmd_export(
    config: &StrataConfig,
    out: Output,
    id: &str,
    output: Option<&Path>,
) -> Result<(), StrataError> {
    let persistence = open_store(config)?;
    let doc = load_record(&persistence, id)?.into_document();
    let text = export_document(&doc)?;

    match output {
        Some(path) => {
            let path = validate_output_path(path)?;
            std::fs::write(&path, &text)
                .map_err(|e| StrataError::Io(format!("Write '{}': {}", path.display(), e)))?;
            out.info(format!("Exported {} to {}", id, path.display()));
        }
        None => println!("{text}"),
    }
    Ok(())
}

/// Import a JSON document into the store.
pub fn cmd_import(config: &StrataConfig, out: Output, input: &Path) -> Result<(), StrataError> {
    let path = validate_file_path(input)?;
    validate_file_size(&path, MAX_IMPORT_BYTES)?;
    let text = std::fs::read_to_string(&path)
        .map_err(|e| StrataError::Io(format!("Read '{}': {}", path.display(), e)))?;
    let record = import_document(&text)?;

    let mut persistence = open_store(config)?;
    if persistence.load(&record.id)?.is_some() {
        tracing::warn!(document = %record.id, "import replaces a stored document");
    }
    let mut editor = Editor::with_document(DiagramDocument::default(), config.editor);
    editor.open_import(record);
    store_editor(&mut editor, &mut persistence)?;

    let doc = editor.document();
    if out.json {
        out.json(&serde_json::json!({
            "id": doc.id,
            "name": doc.name,
            "nodes": doc.nodes.len(),
            "edges": doc.edges.len(),
        }));
    } else {
        println!("{}", doc.id);
        out.info(format!(
            "Imported '{}' ({} nodes, {} edges)",
            doc.name,
            doc.nodes.len(),
            doc.edges.len()
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
