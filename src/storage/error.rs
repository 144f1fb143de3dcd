//! Storage layer error types.

use thiserror::Error;

use crate::catalog::SchemaError;
use crate::storage::record::RowId;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// The main error type for storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested table was not found.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// The table already exists.
    #[error("table already exists: {0}")]
    TableAlreadyExists(String),

    /// The requested record was not found.
    #[error("record not found: table={table}, {rid}")]
    RecordNotFound { table: String, rid: RowId },

    /// Record or table definition rejected by the schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::TableNotFound(_) | StorageError::RecordNotFound { .. }
        )
    }
}
