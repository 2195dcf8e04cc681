//! # Autosave Coordinator
//!
//! Saves the shared document in the background while it is being edited.
//!
//! Two timers drive saves:
//!
//! - **Debounce**: fires once edits have been quiet for `debounce_ms`. Every
//!   [`Autosaver::notify_dirty`] restarts the quiet period.
//! - **Interval**: fires every `interval_ms` whatever the edit activity.
//!
//! Both go through [`Autosaver::save_now`], which is single-flight: a request
//! arriving while a save is outstanding is dropped (`SaveOutcome::Busy`), not
//! queued. A save snapshots the document and its revision under a read lock,
//! writes it on the blocking pool, then clears the dirty flag only if no edit
//! landed in the meantime.

use crate::config::AutosaveSettings;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strata_core::{DocumentStorage, Editor, Persistence, StrataError};
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// The editor as shared between the editing loop and the autosave tasks.
pub type SharedEditor = Arc<RwLock<Editor>>;

/// Wrap an editor for sharing.
pub fn shared(editor: Editor) -> SharedEditor {
    Arc::new(RwLock::new(editor))
}

/// Result of one save attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to storage.
    Saved,
    /// Nothing to do: the document had no unsaved changes.
    Clean,
    /// Another save was outstanding.
    Busy,
    /// Storage rejected the write; see [`Autosaver::last_error`].
    Failed,
}

// =============================================================================
// AUTOSAVER
// =============================================================================

struct Inner<S: DocumentStorage> {
    editor: SharedEditor,
    persistence: Arc<Mutex<Persistence<S>>>,
    settings: AutosaveSettings,
    in_flight: Arc<AtomicBool>,
    dirty: Notify,
    saves: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Background saver for one shared editor. Cheap to clone.
pub struct Autosaver<S: DocumentStorage> {
    inner: Arc<Inner<S>>,
}

impl<S: DocumentStorage> Clone for Autosaver<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Clears the in-flight flag when dropped. Owned so it can ride along with
/// the blocking write and outlive a cancelled caller.
struct FlightGuard(Arc<AtomicBool>);

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S> Autosaver<S>
where
    S: DocumentStorage + Send + 'static,
{
    pub fn new(editor: SharedEditor, persistence: Persistence<S>, settings: AutosaveSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                editor,
                persistence: Arc::new(Mutex::new(persistence)),
                settings,
                in_flight: Arc::new(AtomicBool::new(false)),
                dirty: Notify::new(),
                saves: AtomicU64::new(0),
                last_error: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn editor(&self) -> &SharedEditor {
        &self.inner.editor
    }

    #[must_use]
    pub fn settings(&self) -> AutosaveSettings {
        self.inner.settings
    }

    /// Run `f` against the persistence coordinator on the calling thread.
    pub fn with_persistence<T>(
        &self,
        f: impl FnOnce(&mut Persistence<S>) -> Result<T, StrataError>,
    ) -> Result<T, StrataError> {
        let mut persistence = self
            .inner
            .persistence
            .lock()
            .map_err(|_| StrataError::Io("persistence lock poisoned".into()))?;
        f(&mut persistence)
    }

    /// Successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::Acquire)
    }

    /// Error from the most recent failed save, cleared by the next success.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner
            .last_error
            .lock()
            .map(|e| e.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_last_error(&self, error: Option<String>) {
        match self.inner.last_error.lock() {
            Ok(mut slot) => *slot = error,
            Err(poisoned) => *poisoned.into_inner() = error,
        }
    }

    /// Tell the debounce timer an edit happened.
    pub fn notify_dirty(&self) {
        self.inner.dirty.notify_one();
    }

    /// Save now if the document is dirty and no save is outstanding.
    pub async fn save_now(&self) -> SaveOutcome {
        if self
            .inner
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("save already in flight, skipping");
            return SaveOutcome::Busy;
        }
        let guard = FlightGuard(Arc::clone(&self.inner.in_flight));

        let (doc, revision) = {
            let editor = self.inner.editor.read().await;
            if !editor.is_dirty() {
                return SaveOutcome::Clean;
            }
            (editor.document().clone(), editor.revision())
        };

        let persistence = Arc::clone(&self.inner.persistence);
        // The guard is handed back once the write is done. If this future is
        // dropped first, it is released only when the write completes.
        let joined = tokio::task::spawn_blocking(move || {
            let written = persistence
                .lock()
                .map_err(|_| StrataError::Io("persistence lock poisoned".into()))
                .and_then(|mut persistence| persistence.save(&doc));
            (written, guard)
        })
        .await;
        let (written, _guard) = match joined {
            Ok((written, guard)) => (written, Some(guard)),
            Err(e) => (Err(StrataError::Io(format!("save task failed: {e}"))), None),
        };

        match written {
            Ok(metadata) => {
                let cleared = self.record_saved(revision, metadata.updated_at).await;
                self.inner.saves.fetch_add(1, Ordering::AcqRel);
                self.set_last_error(None);
                tracing::debug!(revision, cleared, "autosave complete");
                SaveOutcome::Saved
            }
            Err(err) => {
                tracing::warn!(error = %err, "autosave failed");
                self.set_last_error(Some(err.to_string()));
                SaveOutcome::Failed
            }
        }
    }

    async fn record_saved(&self, revision: u64, saved_at: DateTime<Utc>) -> bool {
        self.inner.editor.write().await.mark_saved(revision, saved_at)
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    /// Spawn the debounce and interval tasks. Disabled settings spawn nothing.
    pub fn start(&self) -> AutosaveHandle<S> {
        let mut tasks = Vec::new();
        if self.inner.settings.enabled {
            tracing::info!(
                debounce_ms = self.inner.settings.debounce_ms,
                interval_ms = self.inner.settings.interval_ms,
                "autosave started"
            );
            tasks.push(tokio::spawn(self.clone().debounce_loop()));
            tasks.push(tokio::spawn(self.clone().interval_loop()));
        }
        AutosaveHandle {
            saver: self.clone(),
            tasks,
        }
    }

    async fn debounce_loop(self) {
        let quiet = Duration::from_millis(self.inner.settings.debounce_ms);
        loop {
            self.inner.dirty.notified().await;
            loop {
                tokio::select! {
                    () = self.inner.dirty.notified() => {}
                    () = tokio::time::sleep(quiet) => break,
                }
            }
            self.save_now().await;
        }
    }

    async fn interval_loop(self) {
        let period = Duration::from_millis(self.inner.settings.interval_ms);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.save_now().await;
        }
    }
}

// =============================================================================
// HANDLE
// =============================================================================

/// Running autosave tasks. Dropping the handle stops them.
pub struct AutosaveHandle<S: DocumentStorage> {
    saver: Autosaver<S>,
    tasks: Vec<JoinHandle<()>>,
}

impl<S> AutosaveHandle<S>
where
    S: DocumentStorage + Send + 'static,
{
    #[must_use]
    pub fn saver(&self) -> &Autosaver<S> {
        &self.saver
    }

    /// Stop the timers and start a final save of any unsaved changes.
    ///
    /// The save runs on its own task; the returned handle may be awaited or
    /// dropped.
    pub fn shutdown(mut self) -> JoinHandle<SaveOutcome> {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        let saver = self.saver.clone();
        tracing::debug!("autosave stopped");
        tokio::spawn(async move { saver.save_now().await })
    }
}

impl<S: DocumentStorage> Drop for AutosaveHandle<S> {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{MemoryStorage, NodeKind, Position, primitives};

    fn dirty_saver() -> Autosaver<MemoryStorage> {
        let mut editor = Editor::new("flight");
        editor.add_node(NodeKind::Fund, Position::default());
        let persistence = Persistence::new(MemoryStorage::new(), primitives::DEFAULT_STORAGE_KEY);
        Autosaver::new(shared(editor), persistence, AutosaveSettings::default())
    }

    #[tokio::test]
    #[allow(clippy::await_holding_lock)]
    async fn cancelled_save_keeps_flag_until_write_finishes() {
        let saver = dirty_saver();
        let storage = saver.inner.persistence.lock().expect("lock");

        let task = tokio::spawn({
            let saver = saver.clone();
            async move { saver.save_now().await }
        });
        while !saver.inner.in_flight.load(Ordering::Acquire) {
            tokio::task::yield_now().await;
        }
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        task.abort();
        assert!(task.await.expect_err("aborted").is_cancelled());

        // The write is parked on the storage lock and still owns the flag.
        assert_eq!(saver.save_now().await, SaveOutcome::Busy);
        drop(storage);

        let mut outcome = SaveOutcome::Busy;
        for _ in 0..200 {
            outcome = saver.save_now().await;
            if outcome != SaveOutcome::Busy {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(saver.save_count(), 1);
    }
}
