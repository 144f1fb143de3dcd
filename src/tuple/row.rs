use super::{out_of_range, Tuple, TupleCellSpec};
use crate::catalog::Value;
use crate::executor::ExecuteResult;
use crate::storage::{Record, RowId};

/// A view of a stored record restricted to selected fields.
///
/// `specs[i]` names the cell backed by `record.values[indexes[i]]`.
#[derive(Debug, Clone, Copy)]
pub struct RowTuple<'a> {
    specs: &'a [TupleCellSpec],
    indexes: &'a [usize],
    record: &'a Record,
}

impl<'a> RowTuple<'a> {
    pub fn new(specs: &'a [TupleCellSpec], indexes: &'a [usize], record: &'a Record) -> Self {
        Self {
            specs,
            indexes,
            record,
        }
    }

    pub fn record(&self) -> &'a Record {
        self.record
    }
}

impl Tuple for RowTuple<'_> {
    fn cell_num(&self) -> usize {
        self.indexes.len()
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        self.indexes
            .get(index)
            .and_then(|&field| self.record.value(field))
            .cloned()
            .ok_or_else(|| out_of_range(index, self.indexes.len()))
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        self.specs
            .get(index)
            .cloned()
            .ok_or_else(|| out_of_range(index, self.specs.len()))
    }

    fn row_id(&self) -> Option<RowId> {
        Some(self.record.rid)
    }
}
