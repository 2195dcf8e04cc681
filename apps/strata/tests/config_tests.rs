//! Integration tests for configuration file loading.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::io::Write;
use std::path::PathBuf;
use strata::config::StrataConfig;
use strata_core::{LayoutDirection, StrataError};
use tempfile::NamedTempFile;

fn config_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_explicit_path_is_loaded() {
    let file = config_file(
        r#"
        [storage]
        path = "diagrams.redb"
        capacity_bytes = 1048576

        [autosave]
        enabled = false

        [editor]
        history_limit = 10
        paste_offset = 15.0

        [layout]
        direction = "BT"
        rank_sep = 80.0
        "#,
    );

    let config = StrataConfig::load(Some(file.path())).unwrap();
    assert_eq!(config.storage.path, PathBuf::from("diagrams.redb"));
    assert_eq!(config.storage.capacity_bytes, 1_048_576);
    assert!(!config.autosave.enabled);
    assert_eq!(config.autosave.debounce_ms, 2_000);
    assert_eq!(config.editor.history_limit, 10);
    assert_eq!(config.editor.paste_offset, 15.0);
    assert_eq!(config.layout.direction, LayoutDirection::Bt);
    assert_eq!(config.layout.rank_sep, 80.0);
    assert_eq!(config.layout.node_sep, 150.0);
}

#[test]
fn test_missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StrataConfig::load(Some(dir.path().join("absent.toml").as_path())).unwrap_err();
    assert!(matches!(err, StrataError::Config(_)));
}

#[test]
fn test_invalid_file_is_rejected() {
    let file = config_file("[autosave]\ninterval_ms = \"soon\"\n");
    assert!(matches!(
        StrataConfig::load(Some(file.path())),
        Err(StrataError::Config(_))
    ));
}

#[test]
fn test_configured_store_opens_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = StrataConfig::default();
    config.storage.path = dir.path().join("store.redb");

    let mut editor = strata_core::Editor::new("configured");
    {
        let mut persistence = config.storage.open().unwrap();
        editor.save_to(&mut persistence).unwrap();
    }
    let persistence = config.storage.open().unwrap();
    assert!(persistence.storage().is_persistent());
    assert_eq!(persistence.list().unwrap(), vec![editor.document().id.clone()]);
}

#[test]
fn test_in_memory_store_uses_configured_key() {
    let mut config = StrataConfig::default();
    config.storage.key = "scratch".into();
    let mut persistence = config.storage.open_in_memory();
    let mut editor = strata_core::Editor::new("scratch");
    editor.save_to(&mut persistence).unwrap();
    assert!(!persistence.storage().is_persistent());
    assert_eq!(persistence.list().unwrap().len(), 1);
}
