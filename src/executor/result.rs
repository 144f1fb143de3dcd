//! Query result types.

use serde_json::{Map, Value as JsonValue};

use crate::catalog::Value;

/// Result of a query execution.
#[derive(Debug)]
pub enum QueryResult {
    /// Rows returned from SELECT, EXPLAIN, CALC and SHOW TABLES.
    Select(ResultSet),
    /// Number of rows affected by INSERT/UPDATE/DELETE.
    Modified { rows_affected: usize },
    /// DDL statement executed.
    Success { message: String },
    /// Transaction control result.
    Transaction { message: String },
}

impl QueryResult {
    /// Create a success result.
    pub fn success(message: impl Into<String>) -> Self {
        QueryResult::Success { message: message.into() }
    }

    /// Create a transaction result.
    pub fn transaction(message: impl Into<String>) -> Self {
        QueryResult::Transaction { message: message.into() }
    }

    /// Create a modified result.
    pub fn modified(rows: usize) -> Self {
        QueryResult::Modified { rows_affected: rows }
    }

    /// The result set, if this result carries rows.
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            QueryResult::Select(rs) => Some(rs),
            _ => None,
        }
    }
}

/// A set of rows from a SELECT query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// Column names in order.
    pub columns: Vec<String>,
    /// Rows, each with one value per column.
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    /// Create a new empty result set.
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Add a row.
    pub fn push(&mut self, row: Vec<Value>) {
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get a row by index.
    pub fn get(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Get a cell by row index and column name.
    pub fn cell(&self, index: usize, column: &str) -> Option<&Value> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(index)?.get(col)
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.rows.iter()
    }

    /// Render as a JSON array of objects keyed by column name.
    pub fn to_json(&self) -> serde_json::Result<JsonValue> {
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut object = Map::new();
            for (column, value) in self.columns.iter().zip(row) {
                object.insert(column.clone(), serde_json::to_value(value)?);
            }
            out.push(JsonValue::Object(object));
        }
        Ok(JsonValue::Array(out))
    }
}

impl IntoIterator for ResultSet {
    type Item = Vec<Value>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}
