//! # Keyed Document Storage
//!
//! The persistence coordinator writes opaque records into a keyed storage
//! area with a fixed capacity. Two backends are provided:
//!
//! - [`MemoryStorage`]: a process-local map, used by tests and scratch sessions.
//! - [`RedbStorage`]: a redb table on disk, used by the application.
//!
//! [`StorageBackend`] selects one of them at startup.
//!
//! Both enforce the same quota: a write whose key and value would push the
//! area past its capacity fails with [`StrataError::StorageFull`] and leaves
//! the previous record in place.

mod redb_storage;

pub use redb_storage::RedbStorage;

use crate::primitives::DEFAULT_STORAGE_CAPACITY;
use crate::StrataError;
use std::collections::BTreeMap;

/// A keyed byte store with a capacity quota.
pub trait DocumentStorage {
    /// Read the record under `key`, or `None` if absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StrataError>;

    /// Write (or overwrite) the record under `key`.
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StrataError>;

    /// Remove the record under `key`. Returns whether one existed.
    fn remove(&mut self, key: &str) -> Result<bool, StrataError>;

    /// Every key starting with `prefix`, in ascending order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StrataError>;

    /// Bytes currently occupied (keys plus values).
    fn used_bytes(&self) -> Result<usize, StrataError>;

    /// Total capacity in bytes.
    fn capacity(&self) -> usize;
}

/// Reject a write of `needed` bytes replacing `existing` bytes when it would
/// exceed `capacity` given `used` bytes already occupied.
pub(crate) fn ensure_capacity(
    capacity: usize,
    used: usize,
    existing: usize,
    needed: usize,
) -> Result<(), StrataError> {
    let available = capacity.saturating_sub(used.saturating_sub(existing));
    if needed > available {
        tracing::warn!(needed, available, "storage quota exceeded");
        return Err(StrataError::StorageFull { needed, available });
    }
    Ok(())
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Process-local storage area.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    records: BTreeMap<String, Vec<u8>>,
    capacity: usize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STORAGE_CAPACITY)
    }
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            capacity,
        }
    }

    /// Overwrite a record without any checks. Used to plant damaged bytes.
    pub fn insert_raw(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.records.insert(key.into(), bytes);
    }
}

impl DocumentStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StrataError> {
        Ok(self.records.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StrataError> {
        let existing = self.records.get(key).map_or(0, |v| key.len() + v.len());
        ensure_capacity(
            self.capacity,
            self.used_bytes()?,
            existing,
            key.len() + bytes.len(),
        )?;
        self.records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StrataError> {
        Ok(self.records.remove(key).is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StrataError> {
        Ok(self
            .records
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn used_bytes(&self) -> Result<usize, StrataError> {
        Ok(self.records.iter().map(|(k, v)| k.len() + v.len()).sum())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Storage backend chosen at startup.
#[derive(Debug)]
pub enum StorageBackend {
    /// Process-local map (volatile).
    InMemory(MemoryStorage),
    /// Disk-backed redb table (ACID, persistent).
    Persistent(RedbStorage),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStorage::default())
    }
}

impl StorageBackend {
    /// Open a redb-backed area at `path`.
    pub fn redb(path: impl AsRef<std::path::Path>, capacity: usize) -> Result<Self, StrataError> {
        RedbStorage::open_with_capacity(path, capacity).map(Self::Persistent)
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent(_))
    }

    fn inner(&self) -> &dyn DocumentStorage {
        match self {
            Self::InMemory(m) => m,
            Self::Persistent(r) => r,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn DocumentStorage {
        match self {
            Self::InMemory(m) => m,
            Self::Persistent(r) => r,
        }
    }
}

impl DocumentStorage for StorageBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StrataError> {
        self.inner().read(key)
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StrataError> {
        self.inner_mut().write(key, bytes)
    }

    fn remove(&mut self, key: &str) -> Result<bool, StrataError> {
        self.inner_mut().remove(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StrataError> {
        self.inner().keys(prefix)
    }

    fn used_bytes(&self) -> Result<usize, StrataError> {
        self.inner().used_bytes()
    }

    fn capacity(&self) -> usize {
        self.inner().capacity()
    }
}
