//! Table metadata and record validation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{FieldMeta, Value};

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMeta {
    /// Table name.
    pub name: String,
    /// Field definitions, in storage order.
    pub fields: Vec<FieldMeta>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TableMeta {
    /// Create new table metadata, validating the field list.
    pub fn new(name: impl Into<String>, fields: Vec<FieldMeta>) -> Result<Self, SchemaError> {
        let meta = Self {
            name: name.into(),
            fields,
            created_at: Utc::now(),
        };
        meta.validate()?;
        Ok(meta)
    }

    /// Get a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Stable index of a field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_num(&self) -> usize {
        self.fields.len()
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::InvalidName(self.name.clone()));
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields(self.name.clone()));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(&field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        Ok(())
    }

    /// Validate a full record against this table.
    pub fn validate_record(&self, values: &[Value]) -> Result<(), SchemaError> {
        if values.len() != self.fields.len() {
            return Err(SchemaError::FieldCountMismatch {
                table: self.name.clone(),
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        for (field, value) in self.fields.iter().zip(values) {
            field.validate(value).map_err(SchemaError::InvalidRecord)?;
        }
        Ok(())
    }
}

/// Schema-related errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid table name: '{0}'")]
    InvalidName(String),

    #[error("table '{0}' has no fields")]
    NoFields(String),

    #[error("duplicate field: {0}")]
    DuplicateField(String),

    #[error("table '{table}' expects {expected} values, got {actual}")]
    FieldCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}
