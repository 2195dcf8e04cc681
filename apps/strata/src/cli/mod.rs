//! # Strata CLI Module
//!
//! This module implements the command-line interface for Strata.
//!
//! ## Available Commands
//!
//! - `new` - Create an empty document
//! - `list` - List stored documents
//! - `show` - Print a document
//! - `add-node` / `connect` / `delete-node` - Edit a stored document
//! - `layout` / `align` / `distribute` - Arrange nodes
//! - `cycles` - Check the ownership graph for cycles
//! - `lineage` / `search` - Query a document
//! - `export` / `import` - Exchange documents as JSON files
//! - `delete` - Remove a stored document
//! - `session` - Interactive editing with autosave
//!
//! Node arguments accept a node id, a 1-based `#n` index as printed by
//! `show`, or a label matching exactly one node.

mod commands;
pub mod session;

use crate::config::StrataConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strata_core::{AlignType, DistributeAxis, LayoutDirection, NodeKind, StrataError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Strata - ownership and lineage diagram editor
///
/// Documents live in a redb store; every command loads, edits and saves them.
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $STRATA_CONFIG, then ./strata.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the document store, overriding the configuration
    #[arg(short = 'S', long, global = true)]
    pub store: Option<PathBuf>,

    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty document
    New {
        /// Document name
        #[arg(short, long, default_value = "Untitled diagram")]
        name: String,
    },

    /// List stored documents
    List,

    /// Print a document's nodes and edges
    Show {
        /// Document id
        document: String,
    },

    /// Add a node to a document
    AddNode {
        /// Document id
        document: String,

        /// Node kind (corporation, llc, partnership, trust, individual, fund, foundation, note)
        #[arg(short, long)]
        kind: NodeKind,

        /// Label (defaults to the kind's placeholder)
        #[arg(short, long)]
        label: Option<String>,

        /// Jurisdiction
        #[arg(short, long)]
        jurisdiction: Option<String>,

        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        x: f64,

        #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
        y: f64,
    },

    /// Connect two nodes with an ownership edge
    Connect {
        /// Document id
        document: String,

        /// Owning node
        source: String,

        /// Owned node
        target: String,

        /// Ownership stake in percent
        #[arg(short, long)]
        ownership: Option<f64>,

        /// Relationship kind, e.g. "owns", "controls"
        #[arg(short, long)]
        relationship: Option<String>,
    },

    /// Delete a node and its edges
    DeleteNode {
        /// Document id
        document: String,

        /// Node to delete
        node: String,
    },

    /// Run hierarchical auto-layout
    Layout {
        /// Document id
        document: String,

        /// Flow direction (TB, BT, LR, RL); defaults to the configuration
        #[arg(short, long)]
        direction: Option<LayoutDirection>,
    },

    /// Align nodes along a shared edge or center line
    Align {
        /// Document id
        document: String,

        /// Alignment (left, right, top, bottom, center-horizontal, center-vertical)
        alignment: AlignType,

        /// Nodes to align (defaults to every node)
        nodes: Vec<String>,
    },

    /// Space nodes evenly between the outermost two
    Distribute {
        /// Document id
        document: String,

        /// Axis (horizontal, vertical)
        axis: DistributeAxis,

        /// Nodes to distribute (defaults to every node)
        nodes: Vec<String>,
    },

    /// Report whether the graph contains a cycle
    Cycles {
        /// Document id
        document: String,
    },

    /// Show everything a node owns, or everything that owns it
    Lineage {
        /// Document id
        document: String,

        /// Starting node
        node: String,

        /// Follow edges backward (owners) instead of forward
        #[arg(long)]
        downstream: bool,

        /// Maximum number of hops
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Find nodes by label or notes
    Search {
        /// Document id
        document: String,

        /// Case-insensitive text to look for
        text: String,
    },

    /// Export a document as pretty-printed JSON
    Export {
        /// Document id
        document: String,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a document from a JSON file and store it
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Remove a stored document
    Delete {
        /// Document id
        document: String,
    },

    /// Edit a document interactively, reading commands from stdin
    Session {
        /// Document id (a new document is created when omitted)
        document: Option<String>,

        /// Name for a new document
        #[arg(short, long, default_value = "Untitled diagram")]
        name: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StrataError> {
    let mut config = StrataConfig::load(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.storage.path = store;
    }
    let out = Output {
        json: cli.json_mode,
        quiet: cli.quiet,
    };

    match cli.command {
        Some(Commands::New { name }) => cmd_new(&config, out, &name),
        Some(Commands::List) | None => cmd_list(&config, out),
        Some(Commands::Show { document }) => cmd_show(&config, out, &document),
        Some(Commands::AddNode {
            document,
            kind,
            label,
            jurisdiction,
            x,
            y,
        }) => cmd_add_node(&config, out, &document, kind, label, jurisdiction, x, y),
        Some(Commands::Connect {
            document,
            source,
            target,
            ownership,
            relationship,
        }) => cmd_connect(
            &config,
            out,
            &document,
            &source,
            &target,
            ownership,
            relationship,
        ),
        Some(Commands::DeleteNode { document, node }) => {
            cmd_delete_node(&config, out, &document, &node)
        }
        Some(Commands::Layout {
            document,
            direction,
        }) => cmd_layout(&config, out, &document, direction),
        Some(Commands::Align {
            document,
            alignment,
            nodes,
        }) => cmd_align(&config, out, &document, alignment, &nodes),
        Some(Commands::Distribute {
            document,
            axis,
            nodes,
        }) => cmd_distribute(&config, out, &document, axis, &nodes),
        Some(Commands::Cycles { document }) => cmd_cycles(&config, out, &document),
        Some(Commands::Lineage {
            document,
            node,
            downstream,
            depth,
        }) => cmd_lineage(&config, out, &document, &node, downstream, depth),
        Some(Commands::Search { document, text }) => cmd_search(&config, out, &document, &text),
        Some(Commands::Export { document, output }) => {
            cmd_export(&config, out, &document, output.as_deref())
        }
        Some(Commands::Import { input }) => cmd_import(&config, out, &input),
        Some(Commands::Delete { document }) => cmd_delete(&config, out, &document),
        Some(Commands::Session { document, name }) => {
            session::cmd_session(&config, out, document.as_deref(), &name).await
        }
    }
}
