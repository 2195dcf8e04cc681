//! # Configuration
//!
//! Application settings loaded from a TOML file.
//!
//! Search order:
//! 1. Explicit path (`--config`)
//! 2. `STRATA_CONFIG` environment variable
//! 3. `strata.toml` in the working directory
//! 4. Built-in defaults
//!
//! Every field has a default, so a partial file only overrides what it names:
//!
//! ```toml
//! [storage]
//! path = "diagrams.redb"
//!
//! [autosave]
//! debounce_ms = 1500
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_core::primitives::{
    AUTOSAVE_DEBOUNCE_MS, AUTOSAVE_INTERVAL_MS, DEFAULT_STORAGE_CAPACITY, DEFAULT_STORAGE_KEY,
};
use strata_core::{EditorOptions, LayoutOptions, Persistence, StorageBackend, StrataError};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "STRATA_CONFIG";

/// Configuration file picked up from the working directory.
pub const LOCAL_CONFIG: &str = "strata.toml";

// =============================================================================
// SETTINGS
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    pub storage: StorageSettings,
    pub autosave: AutosaveSettings,
    pub editor: EditorOptions,
    pub layout: LayoutOptions,
}

/// Where and how documents are stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// redb database file.
    pub path: PathBuf,
    /// Key prefix for document records.
    pub key: String,
    /// Quota for the whole storage area, in bytes.
    pub capacity_bytes: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("strata.redb"),
            key: DEFAULT_STORAGE_KEY.to_string(),
            capacity_bytes: DEFAULT_STORAGE_CAPACITY,
        }
    }
}

impl StorageSettings {
    /// Open the configured redb database.
    pub fn open(&self) -> Result<Persistence<StorageBackend>, StrataError> {
        tracing::debug!(path = %self.path.display(), key = %self.key, "opening storage");
        let backend = StorageBackend::redb(&self.path, self.capacity_bytes)?;
        Ok(Persistence::new(backend, self.key.clone()))
    }

    /// A scratch in-memory area with the configured key and quota.
    pub fn open_in_memory(&self) -> Persistence<StorageBackend> {
        let backend = StorageBackend::InMemory(strata_core::MemoryStorage::with_capacity(
            self.capacity_bytes,
        ));
        Persistence::new(backend, self.key.clone())
    }
}

/// Autosave timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    /// Quiet period after the latest edit before saving.
    pub debounce_ms: u64,
    /// Periodic save regardless of edit activity.
    pub interval_ms: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: AUTOSAVE_DEBOUNCE_MS,
            interval_ms: AUTOSAVE_INTERVAL_MS,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl StrataConfig {
    /// Find and load the configuration. See the module docs for search order.
    pub fn load(explicit: Option<&Path>) -> Result<Self, StrataError> {
        if let Some(path) = explicit {
            tracing::info!(path = %path.display(), "loading configuration from explicit path");
            return Self::from_file(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(path);
            tracing::info!(path = %path.display(), "loading configuration from {CONFIG_ENV}");
            return Self::from_file(&path);
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            tracing::info!(path = %local.display(), "loading configuration from working directory");
            return Self::from_file(local);
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load a specific file. A missing file is an error.
    pub fn from_file(path: &Path) -> Result<Self, StrataError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            StrataError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, StrataError> {
        let config: Self =
            toml::from_str(text).map_err(|e| StrataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), StrataError> {
        if self.storage.key.is_empty() {
            return Err(StrataError::Config("storage.key must not be empty".into()));
        }
        if self.storage.key.contains(':') {
            return Err(StrataError::Config("storage.key must not contain ':'".into()));
        }
        if self.storage.capacity_bytes == 0 {
            return Err(StrataError::Config("storage.capacity_bytes must be positive".into()));
        }
        if self.autosave.debounce_ms == 0 || self.autosave.interval_ms == 0 {
            return Err(StrataError::Config("autosave timers must be positive".into()));
        }
        if self.editor.history_limit == 0 {
            return Err(StrataError::Config("editor.history_limit must be positive".into()));
        }
        let layout = &self.layout;
        let spacing = [
            layout.node_width,
            layout.node_height,
            layout.rank_sep,
            layout.node_sep,
        ];
        if spacing.iter().any(|v| !v.is_finite() || *v <= 0.0) || !layout.margin.is_finite() {
            return Err(StrataError::Config("layout sizes must be positive and finite".into()));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::LayoutDirection;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = StrataConfig::from_toml("").expect("parse");
        assert_eq!(config, StrataConfig::default());
        assert_eq!(config.autosave.debounce_ms, 2_000);
        assert_eq!(config.autosave.interval_ms, 30_000);
        assert_eq!(config.editor.history_limit, 50);
    }

    #[test]
    fn partial_sections_override() {
        let config = StrataConfig::from_toml(
            r#"
            [storage]
            key = "lineage"

            [layout]
            direction = "LR"
            "#,
        )
        .expect("parse");
        assert_eq!(config.storage.key, "lineage");
        assert_eq!(config.storage.path, PathBuf::from("strata.redb"));
        assert_eq!(config.layout.direction, LayoutDirection::Lr);
        assert_eq!(config.layout.rank_sep, 100.0);
    }

    #[test]
    fn rejects_invalid_values() {
        for text in [
            "[storage]\nkey = \"\"",
            "[storage]\nkey = \"a:b\"",
            "[autosave]\ndebounce_ms = 0",
            "[editor]\nhistory_limit = 0",
            "[layout]\nnode_sep = -1.0",
        ] {
            let err = StrataConfig::from_toml(text).expect_err(text);
            assert!(matches!(err, StrataError::Config(_)), "{text}");
        }
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            StrataConfig::from_toml("[storage"),
            Err(StrataError::Config(_))
        ));
    }
}
