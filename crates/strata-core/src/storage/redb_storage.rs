//! # redb-backed Document Storage
//!
//! Persists document records in a single redb table keyed by
//! `"<storage key>:<document id>"`.
//!
//! Each write is one ACID transaction, so a failed or rejected write never
//! leaves a half-written record behind. The capacity quota is enforced before
//! the transaction commits; a disk that runs out of space underneath the
//! database is reported as [`StrataError::StorageFull`] as well.

use super::{ensure_capacity, DocumentStorage};
use crate::primitives::DEFAULT_STORAGE_CAPACITY;
use crate::StrataError;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::io::ErrorKind;
use std::path::Path;

/// Table for document records: storage key -> JSON bytes
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// Map a redb error, surfacing exhausted disk space as `StorageFull`.
fn storage_err<E>(err: E) -> StrataError
where
    E: std::error::Error + 'static,
{
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == ErrorKind::StorageFull {
                return StrataError::StorageFull {
                    needed: 0,
                    available: 0,
                };
            }
        }
        current = e.source();
    }
    StrataError::Io(err.to_string())
}

/// Disk-backed storage area.
pub struct RedbStorage {
    db: Database,
    capacity: usize,
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl RedbStorage {
    /// Open or create a storage database with the default capacity.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StrataError> {
        Self::open_with_capacity(path, DEFAULT_STORAGE_CAPACITY)
    }

    /// Open or create a storage database with an explicit capacity.
    pub fn open_with_capacity(path: impl AsRef<Path>, capacity: usize) -> Result<Self, StrataError> {
        let db = Database::create(path.as_ref()).map_err(storage_err)?;

        {
            let write_txn = db.begin_write().map_err(storage_err)?;
            let _ = write_txn.open_table(RECORDS).map_err(storage_err)?;
            write_txn.commit().map_err(storage_err)?;
        }

        tracing::debug!(path = %path.as_ref().display(), capacity, "opened redb storage");
        Ok(Self { db, capacity })
    }
}

impl DocumentStorage for RedbStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StrataError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        Ok(table
            .get(key)
            .map_err(storage_err)?
            .map(|guard| guard.value().to_vec()))
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StrataError> {
        let used = self.used_bytes()?;
        let existing = self.read(key)?.map_or(0, |v| key.len() + v.len());
        ensure_capacity(self.capacity, used, existing, key.len() + bytes.len())?;

        let write_txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = write_txn.open_table(RECORDS).map_err(storage_err)?;
            table.insert(key, bytes).map_err(storage_err)?;
        }
        write_txn.commit().map_err(storage_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, StrataError> {
        let write_txn = self.db.begin_write().map_err(storage_err)?;
        let existed = {
            let mut table = write_txn.open_table(RECORDS).map_err(storage_err)?;
            table.remove(key).map_err(storage_err)?.is_some()
        };
        write_txn.commit().map_err(storage_err)?;
        Ok(existed)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StrataError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        let mut keys = Vec::new();
        for entry in table.range(prefix..).map_err(storage_err)? {
            let (key, _) = entry.map_err(storage_err)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }

    fn used_bytes(&self) -> Result<usize, StrataError> {
        let read_txn = self.db.begin_read().map_err(storage_err)?;
        let table = read_txn.open_table(RECORDS).map_err(storage_err)?;
        let mut used = 0usize;
        for entry in table.iter().map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            used = used.saturating_add(key.value().len() + value.value().len());
        }
        Ok(used)
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
