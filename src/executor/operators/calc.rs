use super::{Operator, Step, TupleVisitor};
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate;
use crate::stmt::Expression;
use crate::transaction::Transaction;
use crate::tuple::{Tuple, TupleCellSpec, ValueListTuple};

/// Evaluates a list of expressions once, producing a single row.
pub struct CalcOperator {
    exprs: Vec<Expression>,
    emitted: bool,
    current: Option<ValueListTuple>,
}

impl CalcOperator {
    pub fn new(exprs: Vec<Expression>) -> Self {
        Self {
            exprs,
            emitted: false,
            current: None,
        }
    }
}

impl Operator for CalcOperator {
    fn name(&self) -> &'static str {
        "CALC"
    }

    fn param(&self) -> String {
        let exprs: Vec<String> = self.exprs.iter().map(|e| e.to_string()).collect();
        exprs.join(", ")
    }

    fn open(&mut self, _trx: &Transaction) -> ExecuteResult<()> {
        self.emitted = false;
        self.current = None;
        Ok(())
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        if self.emitted {
            self.current = None;
            return Ok(Step::Eof);
        }

        let specs = self
            .exprs
            .iter()
            .map(|e| TupleCellSpec::new(e.to_string()))
            .collect();
        let values = self
            .exprs
            .iter()
            .map(|e| evaluate(e, env))
            .collect::<ExecuteResult<Vec<_>>>()?;
        self.current = Some(ValueListTuple::new(specs, values));
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
