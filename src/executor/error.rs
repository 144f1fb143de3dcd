//! Query execution errors.

use thiserror::Error;

use crate::planner::PlanError;
use crate::storage::StorageError;
use crate::transaction::TransactionError;

/// Result type for query execution.
pub type ExecuteResult<T> = Result<T, ExecuteError>;

/// Query execution errors.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {0}")]
    Overflow(String),

    #[error("operator {0} has no current tuple")]
    NoCurrentTuple(&'static str),

    #[error("no active transaction")]
    NoTransaction,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ExecuteError {
    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExecuteError::Transaction(t) if t.is_retryable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RowId;

    #[test]
    fn test_transparent_wrapping() {
        let err = ExecuteError::from(TransactionError::conflict("t", RowId::new(1)));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "concurrency conflict on t rid:1");

        let err = ExecuteError::from(StorageError::TableNotFound("t".into()));
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "table not found: t");
    }
}
