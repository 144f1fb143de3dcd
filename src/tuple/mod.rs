//! Row views shared by every physical operator.
//!
//! A tuple is an ordered list of cells, each named by a [`TupleCellSpec`].
//! Operators never copy rows to pass them upward; they expose borrowed
//! views instead:
//!
//! ```text
//!   RowTuple        storage record + field indexes
//!   JoinedTuple     left ++ right, rebuilt per call
//!   ProjectTuple    expressions evaluated lazily over an inner tuple
//!   QualifiedTuple  inner tuple re-qualified under a sub-query alias
//!   ValueListTuple  owned, materialized row
//! ```

mod joined;
mod project;
mod qualified;
mod row;

use std::fmt;

use crate::catalog::Value;
use crate::executor::{ExecuteError, ExecuteResult};
use crate::storage::RowId;

pub use joined::JoinedTuple;
pub use project::ProjectTuple;
pub use qualified::QualifiedTuple;
pub use row::RowTuple;

/// Name of a tuple cell: an optional qualifier (table or alias) and a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleCellSpec {
    pub table: Option<String>,
    pub field: String,
}

impl TupleCellSpec {
    /// Unqualified spec, used for computed cells.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            table: None,
            field: field.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            field: field.into(),
        }
    }

    /// Whether this cell answers a lookup for `wanted`. An unqualified
    /// lookup matches on the name alone.
    pub fn answers(&self, wanted: &TupleCellSpec) -> bool {
        self.field == wanted.field
            && match &wanted.table {
                None => true,
                Some(table) => self.table.as_deref() == Some(table.as_str()),
            }
    }
}

impl fmt::Display for TupleCellSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.field),
            None => write!(f, "{}", self.field),
        }
    }
}

/// A row view.
pub trait Tuple {
    /// Number of cells.
    fn cell_num(&self) -> usize;

    /// Value of the cell at `index`.
    fn cell_at(&self, index: usize) -> ExecuteResult<Value>;

    /// Name of the cell at `index`.
    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec>;

    /// Find a cell by name. The first matching cell wins.
    fn find_cell(&self, spec: &TupleCellSpec) -> ExecuteResult<Option<Value>> {
        for i in 0..self.cell_num() {
            if self.spec_at(i)?.answers(spec) {
                return self.cell_at(i).map(Some);
            }
        }
        Ok(None)
    }

    /// Storage row id, for tuples that are a single stored record.
    fn row_id(&self) -> Option<RowId> {
        None
    }

    fn values(&self) -> ExecuteResult<Vec<Value>> {
        (0..self.cell_num()).map(|i| self.cell_at(i)).collect()
    }

    fn specs(&self) -> ExecuteResult<Vec<TupleCellSpec>> {
        (0..self.cell_num()).map(|i| self.spec_at(i)).collect()
    }
}

pub(crate) fn out_of_range(index: usize, len: usize) -> ExecuteError {
    ExecuteError::Internal(format!("cell index {} out of range ({} cells)", index, len))
}

/// The empty tuple. Used as the top-level environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyTuple;

impl Tuple for EmptyTuple {
    fn cell_num(&self) -> usize {
        0
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        Err(out_of_range(index, 0))
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        Err(out_of_range(index, 0))
    }
}

/// An owned row of values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueListTuple {
    specs: Vec<TupleCellSpec>,
    values: Vec<Value>,
    rid: Option<RowId>,
}

impl ValueListTuple {
    pub fn new(specs: Vec<TupleCellSpec>, values: Vec<Value>) -> Self {
        Self {
            specs,
            values,
            rid: None,
        }
    }

    /// Copy the current contents of any tuple.
    pub fn from_tuple(tuple: &dyn Tuple) -> ExecuteResult<Self> {
        Ok(Self {
            specs: tuple.specs()?,
            values: tuple.values()?,
            rid: tuple.row_id(),
        })
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl Tuple for ValueListTuple {
    fn cell_num(&self) -> usize {
        self.values.len()
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index, self.values.len()))
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        self.specs
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index, self.specs.len()))
    }

    fn row_id(&self) -> Option<RowId> {
        self.rid
    }
}
