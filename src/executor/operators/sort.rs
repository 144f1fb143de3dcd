use std::cmp::Ordering;

use super::{check_children, close_children, Operator, PhysicalOperator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate;
use crate::stmt::OrderBy;
use crate::transaction::Transaction;
use crate::tuple::{EmptyTuple, Tuple, ValueListTuple};

struct SortedRow {
    keys: Vec<Value>,
    row: ValueListTuple,
    step: Step,
}

/// Sort operator - materializes its input on open and emits it ordered.
/// Stable; NULLs sort first in either direction.
pub struct SortOperator {
    order_by: Vec<OrderBy>,
    children: Vec<PhysicalOperator>,
    rows: Vec<SortedRow>,
    position: usize,
    current: Option<usize>,
}

impl SortOperator {
    pub fn new(order_by: Vec<OrderBy>, child: PhysicalOperator) -> Self {
        Self {
            order_by,
            children: vec![child],
            rows: Vec::new(),
            position: 0,
            current: None,
        }
    }

    fn compare(&self, a: &SortedRow, b: &SortedRow) -> Ordering {
        for ((x, y), spec) in a.keys.iter().zip(&b.keys).zip(&self.order_by) {
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) if spec.ascending => x.total_cmp(y),
                (false, false) => y.total_cmp(x),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl Operator for SortOperator {
    fn name(&self) -> &'static str {
        "SORT"
    }

    fn param(&self) -> String {
        let keys: Vec<String> = self.order_by.iter().map(|o| o.to_string()).collect();
        keys.join(", ")
    }

    fn children(&self) -> &[PhysicalOperator] {
        &self.children
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        check_children(self.name(), &self.children, 1)?;
        let child = &mut self.children[0];
        child.open(trx)?;

        let order_by = &self.order_by;
        let mut rows = Vec::new();
        loop {
            let step = child.next(&EmptyTuple)?;
            if step == Step::Eof {
                break;
            }
            child.visit_current(&mut |tuple| {
                let keys = order_by
                    .iter()
                    .map(|o| evaluate(&o.expr, tuple))
                    .collect::<ExecuteResult<Vec<_>>>()?;
                rows.push(SortedRow {
                    keys,
                    row: ValueListTuple::from_tuple(tuple)?,
                    step,
                });
                Ok(())
            })?;
        }

        rows.sort_by(|a, b| self.compare(a, b));
        self.rows = rows;
        self.position = 0;
        self.current = None;
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        match self.rows.get(self.position) {
            Some(sorted) => {
                self.current = Some(self.position);
                self.position += 1;
                Ok(sorted.step)
            }
            None => {
                self.current = None;
                Ok(Step::Eof)
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.rows.clear();
        self.current = None;
        close_children(&mut self.children)
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match self.current.and_then(|i| self.rows.get(i)) {
            Some(sorted) => visitor(&sorted.row),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}
