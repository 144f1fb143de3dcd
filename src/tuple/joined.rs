use super::{Tuple, TupleCellSpec};
use crate::catalog::Value;
use crate::executor::ExecuteResult;

/// Concatenation of two tuples. Cheap to build, so operators make a fresh
/// one per row instead of keeping one around.
#[derive(Clone, Copy)]
pub struct JoinedTuple<'a> {
    left: &'a dyn Tuple,
    right: &'a dyn Tuple,
}

impl<'a> JoinedTuple<'a> {
    pub fn new(left: &'a dyn Tuple, right: &'a dyn Tuple) -> Self {
        Self { left, right }
    }
}

impl Tuple for JoinedTuple<'_> {
    fn cell_num(&self) -> usize {
        self.left.cell_num() + self.right.cell_num()
    }

    fn cell_at(&self, index: usize) -> ExecuteResult<Value> {
        let left_num = self.left.cell_num();
        if index < left_num {
            self.left.cell_at(index)
        } else {
            self.right.cell_at(index - left_num)
        }
    }

    fn spec_at(&self, index: usize) -> ExecuteResult<TupleCellSpec> {
        let left_num = self.left.cell_num();
        if index < left_num {
            self.left.spec_at(index)
        } else {
            self.right.spec_at(index - left_num)
        }
    }

    fn find_cell(&self, spec: &TupleCellSpec) -> ExecuteResult<Option<Value>> {
        match self.left.find_cell(spec)? {
            Some(value) => Ok(Some(value)),
            None => self.right.find_cell(spec),
        }
    }
}
