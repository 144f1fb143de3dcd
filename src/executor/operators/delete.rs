use std::sync::Arc;

use tracing::debug;

use super::{check_children, close_children, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::storage::{RowId, Table};
use crate::transaction::{Transaction, TransactionError};
use crate::tuple::{EmptyTuple, Tuple};

/// Deletes the rows produced by its child.
///
/// Matching row ids are collected first and deleted afterwards, so the
/// scan never observes the statement's own changes. A contested row aborts
/// the statement with a retryable conflict error.
pub struct DeleteOperator {
    table: Arc<Table>,
    children: Vec<PhysicalOperator>,
    affected: Option<usize>,
}

impl DeleteOperator {
    pub fn new(table: Arc<Table>, child: PhysicalOperator) -> Self {
        Self {
            table,
            children: vec![child],
            affected: None,
        }
    }
}

/// Pull every row out of `child`, collecting row ids.
pub(crate) fn collect_row_ids(
    child: &mut PhysicalOperator,
    table: &Table,
) -> ExecuteResult<Vec<RowId>> {
    let mut rids = Vec::new();
    loop {
        let step = child.next(&EmptyTuple)?;
        if step == Step::Eof {
            return Ok(rids);
        }
        let rid = current_row_id(child)?;
        if step == Step::Conflict {
            return Err(TransactionError::conflict(table.name(), rid).into());
        }
        rids.push(rid);
    }
}

pub(crate) fn current_row_id(child: &PhysicalOperator) -> ExecuteResult<RowId> {
    let mut rid = None;
    child.visit_current(&mut |tuple| {
        rid = tuple.row_id();
        Ok(())
    })?;
    rid.ok_or_else(|| ExecuteError::Internal(format!("{} does not produce stored rows", child.name())))
}

impl Operator for DeleteOperator {
    fn name(&self) -> &'static str {
        "DELETE"
    }

    fn param(&self) -> String {
        self.table.name()
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        let child = &mut self.children[0];
        child.open(trx)?;
        let collected = collect_row_ids(child, &self.table);
        child.close()?;
        let rids = collected?;

        for rid in &rids {
            trx.delete_record(&self.table, *rid)?;
        }
        debug!(table = %self.table.name(), rows = rids.len(), tx = trx.label(), "deleted rows");
        self.affected = Some(rids.len());
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        Ok(Step::Eof)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        close_children(&mut self.children)
    }

    fn visit_current(&self, _visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        Err(ExecuteError::NoCurrentTuple(self.name()))
    }

    fn affected_rows(&self) -> Option<usize> {
        self.affected
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::PredicateOperator;
    use super::*;
    use crate::catalog::{DataType, Value};
    use crate::config::ConflictPolicy;
    use crate::stmt::{CompOp, Expression};

    fn delete_where_id_gt(f: &Fixture, n: i64) -> PhysicalOperator {
        let predicate = PredicateOperator::new(
            Expression::comparison(
                CompOp::Gt,
                Expression::field("t", "id", DataType::Integer),
                Expression::value(n),
            ),
            ConflictPolicy::default(),
        )
        .with_child(scan(&f.table, false));
        PhysicalOperator::Delete(DeleteOperator::new(
            f.table.clone(),
            PhysicalOperator::Predicate(predicate),
        ))
    }

    #[test]
    fn test_deletes_matching_rows() {
        let f = fixture(&[1, 6, 7]);
        let mut op = delete_where_id_gt(&f, 5);
        let trx = f.manager.begin();
        op.open(&trx).unwrap();
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
        assert_eq!(op.affected_rows(), Some(2));
        op.close().unwrap();
        trx.commit().unwrap();

        let mut remaining = scan(&f.table, true);
        remaining.open(&f.manager.begin()).unwrap();
        assert_eq!(collect_first(&mut remaining), vec![(Value::Integer(1), Step::Row)]);
    }

    #[test]
    fn test_conflict_aborts_with_retryable_error() {
        let f = fixture(&[1]);
        let writer = f.manager.begin();
        writer
            .insert_record(&f.table, vec![Value::Integer(7), Value::from("x")])
            .unwrap();

        let mut op = delete_where_id_gt(&f, 5);
        let err = op.open(&f.manager.begin()).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(op.affected_rows(), None);
    }

    #[test]
    fn test_unmatched_conflict_is_ignored() {
        let f = fixture(&[1]);
        let writer = f.manager.begin();
        writer
            .insert_record(&f.table, vec![Value::Integer(7), Value::from("x")])
            .unwrap();

        let mut op = delete_where_id_gt(&f, 10);
        op.open(&f.manager.begin()).unwrap();
        assert_eq!(op.affected_rows(), Some(0));
    }
}
