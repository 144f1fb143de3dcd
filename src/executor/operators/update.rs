use std::sync::Arc;

use tracing::debug;

use super::delete::current_row_id;
use super::{check_children, close_children, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate;
use crate::stmt::Expression;
use crate::storage::{RowId, Table};
use crate::transaction::{Transaction, TransactionError};
use crate::tuple::{EmptyTuple, Tuple};

/// Rewrites the rows produced by its child.
///
/// The child must yield full stored rows. New values are computed for
/// every row before any is written.
pub struct UpdateOperator {
    table: Arc<Table>,
    /// `(field index, new value)` pairs.
    assignments: Vec<(usize, Expression)>,
    children: Vec<PhysicalOperator>,
    affected: Option<usize>,
}

impl UpdateOperator {
    pub fn new(
        table: Arc<Table>,
        assignments: Vec<(usize, Expression)>,
        child: PhysicalOperator,
    ) -> Self {
        Self {
            table,
            assignments,
            children: vec![child],
            affected: None,
        }
    }

    fn collect_changes(&mut self) -> ExecuteResult<Vec<(RowId, Vec<Value>)>> {
        let child = &mut self.children[0];
        let mut changes = Vec::new();
        loop {
            let step = child.next(&EmptyTuple)?;
            if step == Step::Eof {
                return Ok(changes);
            }
            let rid = current_row_id(child)?;
            if step == Step::Conflict {
                return Err(TransactionError::conflict(self.table.name(), rid).into());
            }

            let assignments = &self.assignments;
            let mut new_values = None;
            child.visit_current(&mut |tuple| {
                let mut values = tuple.values()?;
                for (index, expr) in assignments {
                    let value = evaluate(expr, tuple)?;
                    let slot = values.get_mut(*index).ok_or_else(|| {
                        ExecuteError::Internal(format!("update target #{} out of range", index))
                    })?;
                    *slot = value;
                }
                new_values = Some(values);
                Ok(())
            })?;

            let values = new_values.ok_or(ExecuteError::NoCurrentTuple("UPDATE"))?;
            changes.push((rid, values));
        }
    }
}

impl Operator for UpdateOperator {
    fn name(&self) -> &'static str {
        "UPDATE"
    }

    fn param(&self) -> String {
        let meta = self.table.meta();
        let sets: Vec<String> = self
            .assignments
            .iter()
            .map(|(index, expr)| {
                let field = meta.fields.get(*index).map_or("?", |f| f.name.as_str());
                format!("{}={}", field, expr)
            })
            .collect();
        format!("{} SET {}", meta.name, sets.join(", "))
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        self.children[0].open(trx)?;
        let collected = self.collect_changes();
        self.children[0].close()?;
        let changes = collected?;

        for (rid, values) in &changes {
            trx.update_record(&self.table, *rid, values.clone())?;
        }
        debug!(table = %self.table.name(), rows = changes.len(), tx = trx.label(), "updated rows");
        self.affected = Some(changes.len());
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
