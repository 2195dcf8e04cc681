//! Integration tests for the interactive editing session.
//!
//! Scripts are fed through an in-memory reader; the autosave timers are not
//! started, so only explicit `save` commands write.

#![allow(clippy::unwrap_used, clippy::panic)]

use strata::autosave::{Autosaver, shared};
use strata::cli::Output;
use strata::cli::session::run;
use strata::config::AutosaveSettings;
use strata_core::{Editor, LayoutOptions, MemoryStorage, Persistence, Position, primitives};

fn saver() -> Autosaver<MemoryStorage> {
    let persistence = Persistence::new(MemoryStorage::new(), primitives::DEFAULT_STORAGE_KEY);
    Autosaver::new(
        shared(Editor::new("session")),
        persistence,
        AutosaveSettings::default(),
    )
}

const QUIET: Output = Output {
    json: false,
    quiet: true,
};

async fn run_script(saver: &Autosaver<MemoryStorage>, script: &str) {
    run(saver, LayoutOptions::default(), script.as_bytes(), QUIET)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_script_edits_and_saves() {
    let saver = saver();
    run_script(
        &saver,
        "add corporation\n\
         add llc 0 200\n\
         add fund 300 250\n\
         connect #1 #2\n\
         connect #1 #3\n\
         label #1 HoldCo\n\
         select #2 #3\n\
         align top\n\
         distribute horizontal\n\
         fly to the moon\n\
         save\n\
         layout\n\
         undo\n\
         quit\n\
         add trust\n",
    )
    .await;

    let editor = saver.editor().read().await;
    let doc = editor.document();
    assert_eq!(doc.nodes.len(), 3, "commands after quit must not run");
    assert_eq!(doc.edges.len(), 2);
    assert_eq!(doc.nodes[0].data.label, "HoldCo");
    assert_eq!(doc.nodes[1].position, Position::new(0.0, 200.0));
    assert_eq!(doc.nodes[2].position, Position::new(300.0, 200.0));

    assert_eq!(saver.save_count(), 1);
    let stored = saver.with_persistence(|p| p.load(&doc.id)).unwrap().unwrap();
    assert_eq!(stored.nodes.len(), 3);
    assert_eq!(stored.nodes[0].data.label, "HoldCo");
}

#[tokio::test]
async fn test_eof_ends_session() {
    let saver = saver();
    run_script(&saver, "add trust\n\n// comment\nshow\n").await;
    assert_eq!(saver.editor().read().await.document().nodes.len(), 1);
    assert_eq!(saver.save_count(), 0);
}

#[tokio::test]
async fn test_cut_then_paste_mints_new_ids() {
    let saver = saver();
    run_script(&saver, "add individual 10 10\nselect #1\ncut\n").await;
    assert!(saver.editor().read().await.document().nodes.is_empty());

    let original = saver.editor().read().await.clipboard().nodes()[0].id.clone();
    run_script(&saver, "paste\n").await;

    let editor = saver.editor().read().await;
    let doc = editor.document();
    assert_eq!(doc.nodes.len(), 1);
    assert_ne!(doc.nodes[0].id, original);
    assert_eq!(doc.nodes[0].position, Position::new(40.0, 40.0));
    assert!(doc.nodes[0].selected);
}

#[tokio::test]
async fn test_failed_edits_do_not_mark_dirty() {
    let saver = saver();
    run_script(&saver, "connect #1 #2\nmove nobody 1 1\nundo\n").await;
    assert!(!saver.editor().read().await.is_dirty());
}
