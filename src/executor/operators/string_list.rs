use super::{Operator, Step, TupleVisitor};
use crate::catalog::Value;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{Tuple, TupleCellSpec, ValueListTuple};

/// Literal row source. Never produced by lowering: projection builds one
/// when it has no input, and SHOW TABLES lists table names through it.
pub struct StringListOperator {
    rows: Vec<ValueListTuple>,
    position: usize,
    current: Option<usize>,
    closes: usize,
}

impl StringListOperator {
    /// One text column named `column`, one row per string.
    pub fn new(column: &str, strings: Vec<String>) -> Self {
        let spec = TupleCellSpec::new(column);
        let rows = strings
            .into_iter()
            .map(|s| ValueListTuple::new(vec![spec.clone()], vec![Value::Text(s)]))
            .collect();
        Self {
            rows,
            position: 0,
            current: None,
            closes: 0,
        }
    }

    /// A single row with a single empty string. Drives a projection that
    /// has no input so it yields exactly once.
    pub fn single_empty_row() -> Self {
        Self::new("", vec![String::new()])
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl Operator for StringListOperator {
    fn name(&self) -> &'static str {
        "STRING_LIST"
    }

    fn param(&self) -> String {
        format!("{} rows", self.rows.len())
    }

    fn open(&mut self, _trx: &Transaction) -> ExecuteResult<()> {
        self.position = 0;
        self.current = None;
        Ok(())
    }

    fn next(&mut self, _env: &dyn Tuple) -> ExecuteResult<Step> {
        if self.position >= self.rows.len() {
            self.current = None;
            return Ok(Step::Eof);
        }
        self.current = Some(self.position);
        self.position += 1;
        Ok(Step::Row)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.current = None;
        self.closes += 1;
        Ok(())
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        match self.current.and_then(|i| self.rows.get(i)) {
            Some(row) => visitor(row),
            None => Err(ExecuteError::NoCurrentTuple(self.name())),
        }
    }
}
