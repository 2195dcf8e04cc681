//! # Interactive Session
//!
//! A line-oriented editing session. Each input line is one command applied
//! to the shared editor under a short write lock; autosave runs alongside and
//! is nudged after every change.
//!
//! Node references are ids, `#n` indexes or single-word labels (see
//! [`resolve_node`]).

use super::commands::{Output, describe_node, load_editor, open_store, resolve_node};
use crate::autosave::{Autosaver, SaveOutcome, shared};
use crate::config::StrataConfig;
use std::str::FromStr;
use strata_core::{
    AlignType, DiagramDocument, DistributeAxis, DocumentStorage, Editor, LayoutDirection,
    LayoutOptions, NodeDataPatch, NodeId, NodeKind, Position, StrataError,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const HELP: &str = "\
commands:
  add <kind> [x y]          add a node (corporation, llc, partnership, trust,
                            individual, fund, foundation, note)
  connect <from> <to>       add an ownership edge
  select [<node>...|all]    replace the selection (no argument clears it)
  move <node> <x> <y>       move a node
  label <node> <text>       relabel a node
  delete [<node>]           delete a node, or the selection
  rename <name>             rename the document
  copy | cut | paste | duplicate
  undo | redo
  align <left|right|top|bottom|center-horizontal|center-vertical>
  distribute <horizontal|vertical>
  layout [TB|BT|LR|RL]
  show | save | help | quit";

// =============================================================================
// COMMANDS
// =============================================================================

/// One edit applied to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Add { kind: NodeKind, position: Position },
    Connect(String, String),
    /// Empty clears the selection.
    Select(Vec<String>),
    SelectAll,
    Move(String, Position),
    Label(String, String),
    /// `None` deletes the current selection.
    Delete(Option<String>),
    Rename(String),
    Copy,
    Cut,
    Paste,
    Duplicate,
    Undo,
    Redo,
    Align(AlignType),
    Distribute(DistributeAxis),
    Layout(Option<LayoutDirection>),
}

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Edit(Edit),
    Show,
    Save,
    Help,
    Quit,
}

fn coordinate(token: Option<&str>, field: &str) -> Result<f64, StrataError> {
    let token = token.ok_or_else(|| StrataError::validation(field, "missing coordinate"))?;
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StrataError::validation(field, format!("'{token}' is not a number")))
}

fn argument<'a>(token: Option<&'a str>, what: &str) -> Result<&'a str, StrataError> {
    token.ok_or_else(|| StrataError::validation(what, format!("missing {what}")))
}

fn rest(words: &[&str], what: &str) -> Result<String, StrataError> {
    if words.is_empty() {
        return Err(StrataError::validation(what, format!("missing {what}")));
    }
    Ok(words.join(" "))
}

impl FromStr for SessionCommand {
    type Err = StrataError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((verb, args)) = words.split_first() else {
            return Err(StrataError::validation("command", "empty line"));
        };
        let mut it = args.iter().copied();

        let edit = match verb.to_ascii_lowercase().as_str() {
            "show" => return Ok(Self::Show),
            "save" => return Ok(Self::Save),
            "help" | "?" => return Ok(Self::Help),
            "quit" | "exit" => return Ok(Self::Quit),
            "add" => {
                let kind = argument(it.next(), "kind")?.parse()?;
                let position = if args.len() > 1 {
                    Position::new(coordinate(it.next(), "x")?, coordinate(it.next(), "y")?)
                } else {
                    Position::default()
                };
                Edit::Add { kind, position }
            }
            "connect" => Edit::Connect(
                argument(it.next(), "source")?.to_string(),
                argument(it.next(), "target")?.to_string(),
            ),
            "select" => match args {
                ["all"] => Edit::SelectAll,
                ["none"] => Edit::Select(Vec::new()),
                _ => Edit::Select(args.iter().map(|s| (*s).to_string()).collect()),
            },
            "move" => {
                let node = argument(it.next(), "node")?.to_string();
                let x = coordinate(it.next(), "x")?;
                let y = coordinate(it.next(), "y")?;
                Edit::Move(node, Position::new(x, y))
            }
            "label" => {
                let node = argument(it.next(), "node")?.to_string();
                Edit::Label(node, rest(&args[1..], "label")?)
            }
            "delete" => Edit::Delete(it.next().map(str::to_string)),
            "rename" => Edit::Rename(rest(args, "name")?),
            "copy" => Edit::Copy,
            "cut" => Edit::Cut,
            "paste" => Edit::Paste,
            "duplicate" => Edit::Duplicate,
            "undo" => Edit::Undo,
            "redo" => Edit::Redo,
            "align" => Edit::Align(argument(it.next(), "align")?.parse()?),
            "distribute" => Edit::Distribute(argument(it.next(), "axis")?.parse()?),
            "layout" => Edit::Layout(it.next().map(str::parse).transpose()?),
            other => {
                return Err(StrataError::validation(
                    "command",
                    format!("unknown command '{other}' (try 'help')"),
                ));
            }
        };
        Ok(Self::Edit(edit))
    }
}

// =============================================================================
// APPLY
// =============================================================================

fn node_ref(editor: &Editor, token: &str) -> Result<NodeId, StrataError> {
    resolve_node(editor.document(), token)
}

/// Apply one edit and describe what happened.
pub fn apply(editor: &mut Editor, edit: Edit, layout: &LayoutOptions) -> Result<String, StrataError> {
    let message = match edit {
        Edit::Add { kind, position } => {
            let node = editor.add_node(kind, position);
            format!("added {} {}", kind, node.id)
        }
        Edit::Connect(source, target) => {
            let source = node_ref(editor, &source)?;
            let target = node_ref(editor, &target)?;
            let edge = editor.add_edge(&source, &target).ok_or_else(|| {
                StrataError::validation("edge", "endpoints must be two distinct nodes")
            })?;
            format!("connected {} -> {} ({})", source, target, edge.id)
        }
        Edit::Select(tokens) => {
            let ids = tokens
                .iter()
                .map(|t| node_ref(editor, t))
                .collect::<Result<Vec<_>, _>>()?;
            editor.select_nodes(&ids);
            format!("{} node(s) selected", ids.len())
        }
        Edit::SelectAll => {
            let ids: Vec<NodeId> = editor.document().nodes.iter().map(|n| n.id.clone()).collect();
            editor.select_nodes(&ids);
            format!("{} node(s) selected", ids.len())
        }
        Edit::Move(node, position) => {
            let id = node_ref(editor, &node)?;
            editor.move_node(&id, position);
            format!("moved {} to ({}, {})", id, position.x, position.y)
        }
        Edit::Label(node, label) => {
            let id = node_ref(editor, &node)?;
            let patch = NodeDataPatch {
                label: Some(label.clone()),
                ..NodeDataPatch::default()
            };
            editor.update_node(&id, &patch);
            format!("{id} is now '{label}'")
        }
        Edit::Delete(Some(node)) => {
            let id = node_ref(editor, &node)?;
            editor.delete_node(&id);
            format!("deleted {id}")
        }
        Edit::Delete(None) => {
            if editor.delete_selection() {
                "deleted selection".to_string()
            } else {
                "nothing selected".to_string()
            }
        }
        Edit::Rename(name) => {
            editor.rename(name.clone());
            format!("renamed to '{name}'")
        }
        Edit::Copy => {
            if editor.copy() {
                format!("copied {} node(s)", editor.clipboard().len())
            } else {
                "nothing selected".to_string()
            }
        }
        Edit::Cut => {
            if editor.cut() {
                format!("cut {} node(s)", editor.clipboard().len())
            } else {
                "nothing selected".to_string()
            }
        }
        Edit::Paste => {
            if editor.paste() {
                format!("pasted {} node(s)", editor.clipboard().len())
            } else {
                "clipboard is empty".to_string()
            }
        }
        Edit::Duplicate => {
            if editor.duplicate() {
                format!("duplicated {} node(s)", editor.clipboard().len())
            } else {
                "nothing selected".to_string()
            }
        }
        Edit::Undo => (if editor.undo() { "undone" } else { "nothing to undo" }).to_string(),
        Edit::Redo => (if editor.redo() { "redone" } else { "nothing to redo" }).to_string(),
        Edit::Align(ty) => {
            if editor.align(ty) {
                format!("aligned {ty}")
            } else {
                "select at least two nodes".to_string()
            }
        }
        Edit::Distribute(axis) => {
            if editor.distribute(axis) {
                format!("distributed {axis}")
            } else {
                "select at least three nodes".to_string()
            }
        }
        Edit::Layout(direction) => {
            let options = direction.map_or(*layout, |d| layout.directed(d));
            let outcome = editor.auto_layout(&options);
            let mut message = format!("laid out {} node(s) {}", outcome.nodes, options.direction.as_str());
            if outcome.cyclic {
                message.push_str(" (graph has a cycle)");
            }
            message
        }
    };
    Ok(message)
}

fn render(doc: &DiagramDocument, dirty: bool) -> String {
    let mut text = format!(
        "{} [{}]{}\n",
        doc.name,
        doc.id,
        if dirty { " *" } else { "" }
    );
    for (i, node) in doc.nodes.iter().enumerate() {
        let marker = if node.selected { '>' } else { ' ' };
        text.push_str(&format!("{marker} {}\n", describe_node(i, node)));
    }
    for edge in &doc.edges {
        text.push_str(&format!("    {} -> {}\n", edge.source, edge.target));
    }
    text
}

// =============================================================================
// LOOP
// =============================================================================

/// Read commands from `input` until EOF or `quit`.
pub async fn run<S, R>(
    saver: &Autosaver<S>,
    layout: LayoutOptions,
    input: R,
    out: Output,
) -> Result<(), StrataError>
where
    S: DocumentStorage + Send + 'static,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| StrataError::Io(format!("read input: {e}")))?
    {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        let command = match line.parse::<SessionCommand>() {
            Ok(command) => command,
            Err(err) => {
                eprintln!("error: {err}");
                continue;
            }
        };

        match command {
            SessionCommand::Quit => break,
            SessionCommand::Help => out.info(HELP),
            SessionCommand::Show => {
                let editor = saver.editor().read().await;
                print!("{}", render(editor.document(), editor.is_dirty()));
            }
            SessionCommand::Save => match saver.save_now().await {
                SaveOutcome::Saved => out.info("saved"),
                SaveOutcome::Clean => out.info("no unsaved changes"),
                SaveOutcome::Busy => out.info("a save is already running"),
                SaveOutcome::Failed => {
                    eprintln!(
                        "error: save failed: {}",
                        saver.last_error().unwrap_or_default()
                    );
                }
            },
            SessionCommand::Edit(edit) => {
                let (result, changed) = {
                    let mut editor = saver.editor().write().await;
                    let before = editor.revision();
                    let result = apply(&mut editor, edit, &layout);
                    (result, editor.revision() != before)
                };
                if changed {
                    saver.notify_dirty();
                }
                match result {
                    Ok(message) => out.info(message),
                    Err(err) => eprintln!("error: {err}"),
                }
            }
        }
    }
    Ok(())
}

/// Edit a stored (or new) document interactively from stdin.
pub async fn cmd_session(
    config: &StrataConfig,
    out: Output,
    id: Option<&str>,
    name: &str,
) -> Result<(), StrataError> {
    let mut persistence = open_store(config)?;
    let editor = match id {
        Some(id) => load_editor(config, &persistence, id)?,
        None => {
            let mut editor = Editor::with_document(DiagramDocument::new(name), config.editor);
            editor.save_to(&mut persistence)?;
            editor
        }
    };
    out.info(format!(
        "Editing '{}' [{}]. Type 'help' for commands.",
        editor.document().name,
        editor.document().id
    ));

    let saver = Autosaver::new(shared(editor), persistence, config.autosave);
    let handle = saver.start();
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let result = run(&saver, config.layout, input, out).await;

    match handle.shutdown().await {
        Ok(SaveOutcome::Saved) => out.info("saved"),
        Ok(SaveOutcome::Failed) => {
            tracing::warn!(error = ?saver.last_error(), "final save failed");
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "final save did not run"),
    }
    result
}

// =============================================================================
// TESTS
// =============================================================================
