//! Planning errors.

use thiserror::Error;

use crate::storage::StorageError;

/// Result type for planning operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Query planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A malformed tree reached a stage that should never see it.
    #[error("internal error: {0}")]
    Internal(String),
}
