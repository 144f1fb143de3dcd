//! Catalog of opened tables.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::schema::TableMeta;
use super::types::FieldMeta;
use crate::storage::{StorageError, StorageResult, Table};

/// The catalog owns every table and hands out shared handles.
///
/// Cheap to clone; clones share the same table map.
#[derive(Clone, Default)]
pub struct Catalog {
    tables: Arc<RwLock<BTreeMap<String, Arc<Table>>>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new table.
    pub fn create_table(&self, name: &str, fields: Vec<FieldMeta>) -> StorageResult<Arc<Table>> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(StorageError::TableAlreadyExists(name.to_string()));
        }

        let meta = TableMeta::new(name, fields)?;
        let table = Arc::new(Table::new(meta));
        tables.insert(name.to_string(), table.clone());
        info!(table = name, "created table");
        Ok(table)
    }

    /// Look up a table handle.
    pub fn find_table(&self, name: &str) -> Option<Arc<Table>> {
        self.tables.read().get(name).cloned()
    }

    /// Look up a table handle, failing if it does not exist.
    pub fn table(&self, name: &str) -> StorageResult<Arc<Table>> {
        self.find_table(name)
            .ok_or_else(|| StorageError::TableNotFound(name.to_string()))
    }

    /// Check if a table exists.
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// Rename a table. Existing handles observe the new name.
    pub fn rename_table(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut tables = self.tables.write();
        if tables.contains_key(to) {
            return Err(StorageError::TableAlreadyExists(to.to_string()));
        }
        let table = tables
            .remove(from)
            .ok_or_else(|| StorageError::TableNotFound(from.to_string()))?;
        table.set_name(to);
        tables.insert(to.to_string(), table);
        info!(from, to, "renamed table");
        Ok(())
    }

    /// List table names in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }
}
