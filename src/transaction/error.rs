//! Transaction error types.

use thiserror::Error;

use crate::storage::{RowId, StorageError};

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Storage layer error, passed through untouched.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Another transaction holds or has changed the row.
    #[error("concurrency conflict on {table} {rid}")]
    Conflict { table: String, rid: RowId },

    /// Transaction was already committed or aborted.
    #[error("transaction {tx_id} is no longer active (state: {state})")]
    NotActive { tx_id: String, state: String },
}

impl TransactionError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransactionError::Conflict { .. })
    }

    /// Create a conflict error for a row.
    pub fn conflict(table: impl Into<String>, rid: RowId) -> Self {
        Self::Conflict {
            table: table.into(),
            rid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let conflict = TransactionError::conflict("users", RowId::new(3));
        assert!(conflict.is_retryable());
        assert_eq!(conflict.to_string(), "concurrency conflict on users rid:3");

        let not_active = TransactionError::NotActive {
            tx_id: "01h".to_string(),
            state: "committed".to_string(),
        };
        assert!(!not_active.is_retryable());
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err = TransactionError::from(StorageError::TableNotFound("t".into()));
        assert_eq!(err.to_string(), "table not found: t");
    }
}
