use tracing::debug;

use super::{check_children, drain, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{EmptyTuple, Tuple, ValueListTuple};

/// Buffers its child's output on first open and replays it on later opens
/// under the same transaction. Used for the inner side of joins, which is
/// re-opened once per outer row.
///
/// The child is closed as soon as it is drained, so `close` leaves it alone.
pub struct CachedOperator {
    children: Vec<PhysicalOperator>,
    rows: Vec<(ValueListTuple, Step)>,
    owner: Option<Transaction>,
    position: usize,
    current: Option<usize>,
}

impl CachedOperator {
    pub fn new(child: PhysicalOperator) -> Self {
        Self {
            children: vec![child],
            rows: Vec::new(),
            owner: None,
            position: 0,
            current: None,
        }
    }

    fn is_valid_for(&self, trx: &Transaction) -> bool {
        self.owner.as_ref().is_some_and(|owner| owner.same_as(trx))
    }
}

impl Operator for CachedOperator {
    fn name(&self) -> &'static str {
        "CACHED"
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.position = 0;
        self.current = None;
        if self.is_valid_for(trx) {
            return Ok(());
        }

        let child = &mut self.children[0];
        child.open(trx)?;
        let drained = drain(child, &EmptyTuple);
        child.close()?;
        self.rows = drained?;
        self.owner = Some(trx.clone());
        debug!(rows = self.rows.len(), tx = trx.label(), "cached child output");
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        match self.rows.get(self.position) {
            Some((_, step)) => {
                self.current = Some(self.position);
                self.position += 1;
                Ok(*step)
            }
            None => {
                self.current = None;
                Ok(Step::Eof)
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.current = None;
        Ok(())
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match self.current.and_then(|i| self.rows.get(i)) {
            Some((row, _)) => visitor(row),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::catalog::Value;

    fn replay(op: &mut PhysicalOperator, trx: &Transaction) -> Vec<(Value, Step)> {
        op.open(trx).unwrap();
        let rows = collect_first(op);
        op.close().unwrap();
        rows
    }

    #[test]
    fn test_replays_under_same_transaction() {
        let f = fixture(&[1, 2]);
        let mut op = PhysicalOperator::Cached(CachedOperator::new(scan(&f.table, true)));
        let trx = f.manager.begin();

        let first = replay(&mut op, &trx);
        assert_eq!(first.len(), 2);

        // a new row is not seen by the replay
        trx.insert_record(&f.table, vec![Value::Integer(3), Value::Null]).unwrap();
        assert_eq!(replay(&mut op, &trx), first);
    }

    #[test]
    fn test_invalidated_by_other_transaction() {
        let f = fixture(&[1]);
        let mut op = PhysicalOperator::Cached(CachedOperator::new(scan(&f.table, true)));
        let trx = f.manager.begin();
        assert_eq!(replay(&mut op, &trx).len(), 1);
        trx.insert_record(&f.table, vec![Value::Integer(2), Value::Null]).unwrap();
        trx.commit().unwrap();

        let next = f.manager.begin();
        assert_eq!(replay(&mut op, &next).len(), 2);
    }

    #[test]
    fn test_keeps_conflict_status() {
        let f = fixture(&[]);
        let writer = f.manager.begin();
        writer.insert_record(&f.table, vec![Value::Integer(9), Value::Null]).unwrap();

        let mut op = PhysicalOperator::Cached(CachedOperator::new(scan(&f.table, false)));
        let trx = f.manager.begin();
        assert_eq!(replay(&mut op, &trx), vec![(Value::Integer(9), Step::Conflict)]);
        assert_eq!(replay(&mut op, &trx), vec![(Value::Integer(9), Step::Conflict)]);
    }
}
