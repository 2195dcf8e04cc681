//! # Editing Primitives
//!
//! Hardcoded defaults for the Strata editing core.
//!
//! Runtime configuration (see the app's `strata.toml`) may override the
//! tunable ones; the geometry fallbacks are fixed.

/// Width assumed for a node that carries no explicit size.
pub const DEFAULT_NODE_WIDTH: f64 = 200.0;

/// Height assumed for a node that carries no explicit size.
pub const DEFAULT_NODE_HEIGHT: f64 = 100.0;

/// Maximum number of undo steps retained. Oldest entries are dropped first.
pub const HISTORY_LIMIT: usize = 50;

/// Offset applied to every pasted node, in canvas units (x and y).
pub const PASTE_OFFSET: f64 = 30.0;

// =============================================================================
// LAYOUT
// =============================================================================

/// Distance between adjacent ranks along the primary axis.
pub const RANK_SEP: f64 = 100.0;

/// Distance between neighbouring nodes inside one rank.
pub const NODE_SEP: f64 = 150.0;

/// Margin around a laid-out graph.
pub const LAYOUT_MARGIN: f64 = 20.0;

/// Offsets at or below this many units fall back to direction-implied handles.
pub const HANDLE_DEAD_ZONE: f64 = 50.0;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Format version written into every persisted record.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Storage key prefix used when the application does not pick one.
pub const DEFAULT_STORAGE_KEY: &str = "strata-diagram";

/// Capacity of the storage area (5 MiB), matching a browser-style quota.
pub const DEFAULT_STORAGE_CAPACITY: usize = 5 * 1024 * 1024;

/// Quiet period after the latest dirty mutation before autosave fires.
pub const AUTOSAVE_DEBOUNCE_MS: u64 = 2_000;

/// Period of the independent autosave interval timer.
pub const AUTOSAVE_INTERVAL_MS: u64 = 30_000;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of an import payload, checked before parsing.
pub const MAX_IMPORT_BYTES: usize = 50 * 1024 * 1024;

/// Maximum number of nodes accepted from an import.
pub const MAX_IMPORT_NODES: usize = 100_000;

/// Maximum number of edges accepted from an import.
pub const MAX_IMPORT_EDGES: usize = 500_000;
