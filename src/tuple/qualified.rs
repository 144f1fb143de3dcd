use super::{Tuple, TupleCellSpec};
use crate::catalog::Value;
use crate::executor::ExecuteResult;
use crate::storage::RowId;

/// Exposes an inner tuple's cells under a sub-query alias: `id` and `t.id`
/// from inside `(SELECT ... ) AS s` both become `s.id`.
#[derive(Clone, Copy)]
pub struct QualifiedTuple<'a> {
    alias: &'a str,
    inner: &'a dyn Tuple,
}

impl<'a> QualifiedTuple<'a> {
    pub fn new(alias: &'a str, inner: &'a dyn Tuple) -> Self {
        Self { alias, inner }
    }
}

impl Tuple for QualifiedTuple<'_> {
    fn cell_num(&self) -> usize {
        self.inner.cell_num()
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        self.inner.cell_at(index)
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        let spec = self.inner.spec_at(index)?;
        Ok(TupleCellSpec::qualified(self.alias, spec.field))
    }

    fn row_id(&self) -> Option<RowId> {
        self.inner.row_id()
    }
}
