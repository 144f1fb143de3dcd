use std::sync::Arc;

use tracing::debug;

use super::{Operator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::storage::Table;
use crate::transaction::Transaction;
use crate::tuple::Tuple;

/// Inserts literal records. All work happens on open.
pub struct InsertOperator {
    table: Arc<Table>,
    records: Vec<Vec<Value>>,
    affected: Option<usize>,
}

impl InsertOperator {
    pub fn new(table: Arc<Table>, records: Vec<Vec<Value>>) -> Self {
        Self {
            table,
            records,
            affected: None,
        }
    }
}

impl Operator for InsertOperator {
    fn name(&self) -> &'static str {
        "INSERT"
    }

    fn param(&self) -> String {
        self.table.name()
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        for values in &self.records {
            trx.insert_record(&self.table, values.clone())?;
        }
        debug!(table = %self.table.name(), rows = self.records.len(), tx = trx.label(), "inserted rows");
        self.affected = Some(self.records.len());
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        Ok(Step::Eof)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        Ok(())
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
    use super::super::PhysicalOperator;
    use super::*;
    use crate::tuple::EmptyTuple;

    #[test]
    fn test_inserts_on_open() {
        let f = fixture(&[]);
        let mut op = PhysicalOperator::Insert(InsertOperator::new(
            f.table.clone(),
            vec![
                vec![Value::Integer(1), Value::from("a")],
                vec![Value::Integer(2), Value::Null],
            ],
        ));
        let trx = f.manager.begin();
        op.open(&trx).unwrap();

        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
        assert_eq!(op.affected_rows(), Some(2));
        assert_eq!(f.table.slot_count(), 2);
        assert_eq!(trx.write_count(), 2);
    }

    #[test]
    fn test_schema_violation_fails_open() {
        let f = fixture(&[]);
        let mut op = PhysicalOperator::Insert(InsertOperator::new(
            f.table.clone(),
            vec![vec![Value::from("not an int"), Value::Null]],
        ));
        let err = op.open(&f.manager.begin()).unwrap_err();
        assert!(matches!(err, ExecuteError::Transaction(_)));
        assert_eq!(op.affected_rows(), None);
    }
}
