//! In-memory versioned table heap.

use parking_lot::{RwLock, RwLockReadGuard};

use super::error::{StorageError, StorageResult};
use super::record::{Record, RowId, TxId};
use crate::catalog::{TableMeta, Value};

/// A table: metadata plus an append-only heap of record versions.
///
/// Updates and deletes never remove slots; they stamp `xmax` on the old
/// version and (for updates) append a new one. Shared between sessions via
/// `Arc<Table>`.
#[derive(Debug)]
pub struct Table {
    meta: RwLock<TableMeta>,
    records: RwLock<Vec<Record>>,
}

impl Table {
    pub fn new(meta: TableMeta) -> Self {
        Self {
            meta: RwLock::new(meta),
            records: RwLock::new(Vec::new()),
        }
    }

    /// Borrow the table metadata.
    pub fn meta(&self) -> RwLockReadGuard<'_, TableMeta> {
        self.meta.read()
    }

    pub fn name(&self) -> String {
        self.meta.read().name.clone()
    }

    pub(crate) fn set_name(&self, name: &str) {
        self.meta.write().name = name.to_string();
    }

    /// Number of record slots, including dead versions.
    pub fn slot_count(&self) -> usize {
        self.records.read().len()
    }

    /// Append a new record version created by `xmin`.
    pub fn insert(&self, values: Vec<Value>, xmin: TxId) -> StorageResult<RowId> {
        self.meta.read().validate_record(&values)?;

        let mut records = self.records.write();
        let rid = RowId::new(records.len() as u64);
        records.push(Record {
            rid,
            values,
            xmin,
            xmax: None,
        });
        Ok(rid)
    }

    /// Copy out the record stored at a slot. Used by scans as a cursor
    /// primitive; `None` past the end of the heap.
    pub fn record_at(&self, slot: usize) -> Option<Record> {
        self.records.read().get(slot).cloned()
    }

    /// Fetch a record by row id.
    pub fn get(&self, rid: RowId) -> StorageResult<Record> {
        self.record_at(rid.slot())
            .ok_or_else(|| self.not_found(rid))
    }

    /// Run `f` against a record while holding the heap write lock, so the
    /// caller can inspect and re-stamp the version atomically.
    pub fn with_record_mut<R>(
        &self,
        rid: RowId,
        f: impl FnOnce(&mut Record) -> R,
    ) -> StorageResult<R> {
        let mut records = self.records.write();
        if let Some(record) = records.get_mut(rid.slot()) {
            return Ok(f(record));
        }
        drop(records);
        Err(self.not_found(rid))
    }

    fn not_found(&self, rid: RowId) -> StorageError {
        StorageError::RecordNotFound {
            table: self.name(),
            rid,
        }
    }
}
