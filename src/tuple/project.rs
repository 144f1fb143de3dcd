use super::{out_of_range, Tuple, TupleCellSpec};
use crate::catalog::Value;
use crate::executor::{evaluate, ExecuteResult};
use crate::stmt::ProjectExpr;
use crate::storage::RowId;

/// Projection of an inner tuple. Cells are evaluated on access.
#[derive(Clone, Copy)]
pub struct ProjectTuple<'a> {
    exprs: &'a [ProjectExpr],
    inner: &'a dyn Tuple,
}

impl<'a> ProjectTuple<'a> {
    pub fn new(exprs: &'a [ProjectExpr], inner: &'a dyn Tuple) -> Self {
        Self { exprs, inner }
    }
}

impl Tuple for ProjectTuple<'_> {
    fn cell_num(&self) -> usize {
        self.exprs.len()
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        let project = self
            .exprs
            .get(index)
            .ok_or_else(|| out_of_range(index, self.exprs.len()))?;
        evaluate(&project.expr, self.inner)
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        self.exprs
            .get(index)
            .map(ProjectExpr::spec)
            .ok_or_else(|| out_of_range(index, self.exprs.len()))
    }

    fn row_id(&self) -> Option<RowId> {
        self.inner.row_id()
    }
}
