use super::{check_children, close_children, not_open, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{QualifiedTuple, Tuple};

/// `(SELECT ...) AS alias` in a FROM clause. Rows pass through unchanged
/// but their cells are renamed into the alias.
pub struct SubQueryOperator {
    alias: String,
    children: Vec<PhysicalOperator>,
}

impl SubQueryOperator {
    pub fn new(alias: impl Into<String>, child: PhysicalOperator) -> Self {
        Self {
            alias: alias.into(),
            children: vec![child],
        }
    }
}

impl Operator for SubQueryOperator {
    fn name(&self) -> &'static str {
        "SUB_QUERY"
    }

    fn param(&self) -> String {
        self.alias.clone()
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.children[0].open(trx)
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        match self.children.first_mut() {
            Some(child) => child.next(env),
            None => Err(not_open("SUB_QUERY")),
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        let child = self
            .children
            .first()
            .ok_or(ExecuteError::NoCurrentTuple("SUB_QUERY"))?;
        let alias = self.alias.as_str();
        child.visit_current(&mut |tuple| visitor(&QualifiedTuple::new(alias, tuple)))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;
    use crate::catalog::Value;
    use crate::tuple::{EmptyTuple, TupleCellSpec};

    #[test]
    fn test_requalifies_child_rows() {
        let f = fixture(&[3]);
        let mut op = PhysicalOperator::SubQuery(SubQueryOperator::new("s", scan(&f.table, true)));
        assert_eq!(op.label(), "SUB_QUERY(s)");
        op.open(&f.manager.begin()).unwrap();

        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Row);
        let row = op.current_row().unwrap();
        assert_eq!(
            row.find_cell(&TupleCellSpec::qualified("s", "id")).unwrap(),
            Some(Value::Integer(3))
        );
        assert_eq!(row.find_cell(&TupleCellSpec::qualified("t", "id")).unwrap(), None);
        assert_eq!(op.next(&EmptyTuple).unwrap(), Step::Eof);
    }
}
