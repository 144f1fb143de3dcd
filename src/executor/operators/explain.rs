use super::{check_children, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{Tuple, TupleCellSpec, ValueListTuple};

/// Name of the single output cell.
pub const QUERY_PLAN: &str = "Query Plan";

/// Describes the wrapped plan instead of running it. The child is never
/// opened.
pub struct ExplainOperator {
    children: Vec<PhysicalOperator>,
    current: Option<ValueListTuple>,
    emitted: bool,
}

impl ExplainOperator {
    pub fn new(child: PhysicalOperator) -> Self {
        Self {
            children: vec![child],
            current: None,
            emitted: false,
        }
    }
}

impl Operator for ExplainOperator {
    fn name(&self) -> &'static str {
        "EXPLAIN"
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, _trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.current = None;
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        if self.emitted {
            self.current = None;
            return Ok(Step::Eof);
        }
        let child = self
            .children
            .first()
            .ok_or(ExecuteError::NoCurrentTuple("EXPLAIN"))?;

        let plan = child.explain_lines().join("\n");
        self.current = Some(ValueListTuple::new(
            vec![TupleCellSpec::new(QUERY_PLAN)],
            vec![Value::Text(plan)],
        ));
        self.emitted = true;
        Ok(Step::Row)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.current = None;
        Ok(())
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match &self.current {
            Some(row) => visitor(row),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::super::PredicateOperator;
    use super::*;
    use crate::catalog::DataType;
    use crate::config::ConflictPolicy;
    use crate::stmt::{CompOp, Expression};
    use crate::tuple::EmptyTuple;

    #[test]
    fn test_describes_without_running() {
        let f = fixture(&[1, 2, 3]);
        // a predicate with no child would fail if it were ever opened
        let broken = PhysicalOperator::Predicate(PredicateOperator::new(
            Expression::comparison(
                CompOp::Eq,
                Expression::field("t", "id", DataType::Integer),
                Expression::value(1),
            ),
            ConflictPolicy::default(),
        ));
        let mut op = PhysicalOperator::Explain(ExplainOperator::new(broken));
        op.open(&f.manager.begin()).unwrap();

        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
        let row = op.current_row().unwrap();
        assert_eq!(row.spec_at(0).unwrap(), TupleCellSpec::new(QUERY_PLAN));
        assert_eq!(row.cell_at(0).unwrap(), Value::from("PREDICATE(t.id = 1)"));
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
        op.close().unwrap();
    }

    #[test]
    fn test_one_line_per_node() {
        let f = fixture(&[]);
        let predicate = PredicateOperator::new(Expression::value(true), ConflictPolicy::default())
            .with_child(scan(&f.table, true));
        let mut op = PhysicalOperator::Explain(ExplainOperator::new(PhysicalOperator::Predicate(
            predicate,
        )));
        op.open(&f.manager.begin()).unwrap();
        op.next(&EmptyTuple).unwrap();

        let plan = op.current_row().unwrap().cell_at(0).unwrap();
        assert_eq!(plan, Value::from("PREDICATE(true)\n└─TABLE_SCAN(t)"));
    }
}
