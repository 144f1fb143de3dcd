//! Volcano-style physical operators.
//!
//! Every operator implements the iterator model: `open` binds the tree to a
//! transaction, `next` advances one row, `close` releases resources. The
//! row an operator stopped on is reached through `visit_current`, which
//! lends a borrowed view instead of handing out a copy.
//!
//! `next` reports one of three outcomes: a row, a row whose visibility is
//! contested by another transaction (`Step::Conflict`), or end of stream.
//! Filtering operators skip non-matching rows of either kind.

mod aggregate;
mod cached;
mod calc;
mod create_table;
mod delete;
mod explain;
mod insert;
mod join;
mod predicate;
mod project;
mod rename;
mod sort;
mod string_list;
mod sub_query;
mod table_scan;
mod update;

use tracing::warn;

use super::error::{ExecuteError, ExecuteResult};
use crate::transaction::Transaction;
use crate::tuple::{Tuple, ValueListTuple};

pub use aggregate::AggregateOperator;
pub use cached::CachedOperator;
pub use calc::CalcOperator;
pub use create_table::CreateTableOperator;
pub use delete::DeleteOperator;
pub use explain::{ExplainOperator, QUERY_PLAN};
pub use insert::InsertOperator;
pub use join::NestedLoopJoinOperator;
pub use predicate::PredicateOperator;
pub use project::ProjectOperator;
pub use rename::RenameOperator;
pub use sort::SortOperator;
pub use string_list::StringListOperator;
pub use sub_query::SubQueryOperator;
pub use table_scan::TableScanOperator;
pub use update::UpdateOperator;

/// Outcome of a successful `next` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A row is current.
    Row,
    /// A row is current but another transaction is changing it.
    Conflict,
    /// The stream is exhausted.
    Eof,
}

impl Step {
    /// Status of a row built from two inputs.
    pub fn combine(self, other: Step) -> Step {
        if self == Step::Conflict || other == Step::Conflict {
            Step::Conflict
        } else {
            Step::Row
        }
    }
}

/// Borrowed-row callback used by [`Operator::visit_current`].
pub type TupleVisitor<'v> = dyn FnMut(&dyn Tuple) -> ExecuteResult<()> + 'v;

/// Trait for all physical operators.
pub trait Operator {
    /// Operator name, as shown by EXPLAIN.
    fn name(&self) -> &'static str;

    /// Short parameter description, as shown by EXPLAIN.
    fn param(&self) -> String {
        String::new()
    }

    fn children(&self) -> &[PhysicalOperator] {
        &[]
    }

    /// Prepare for iteration under `trx`. Opens children as needed.
    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()>;

    /// Advance to the next row. `env` is the tuple of the enclosing scope.
    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step>;

    /// Release resources and close children. Safe to call more than once.
    fn close(&mut self) -> ExecuteResult<()>;

    /// Lend the current row to `visitor`.
    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()>;

    /// Rows changed by a mutation operator.
    fn affected_rows(&self) -> Option<usize> {
        None
    }
}

/// The physical operator tree.
pub enum PhysicalOperator {
    TableScan(TableScanOperator),
    Predicate(PredicateOperator),
    Project(ProjectOperator),
    Calc(CalcOperator),
    Join(NestedLoopJoinOperator),
    Insert(InsertOperator),
    Delete(DeleteOperator),
    Update(UpdateOperator),
    Explain(ExplainOperator),
    CreateTable(CreateTableOperator),
    Rename(RenameOperator),
    Aggregate(AggregateOperator),
    Sort(SortOperator),
    SubQuery(SubQueryOperator),
    Cached(CachedOperator),
    StringList(StringListOperator),
}

impl PhysicalOperator {
    fn inner(&self) -> &dyn Operator {
        match self {
            PhysicalOperator::TableScan(op) => op,
            PhysicalOperator::Predicate(op) => op,
            PhysicalOperator::Project(op) => op,
            PhysicalOperator::Calc(op) => op,
            PhysicalOperator::Join(op) => op,
            PhysicalOperator::Insert(op) => op,
            PhysicalOperator::Delete(op) => op,
            PhysicalOperator::Update(op) => op,
            PhysicalOperator::Explain(op) => op,
            PhysicalOperator::CreateTable(op) => op,
            PhysicalOperator::Rename(op) => op,
            PhysicalOperator::Aggregate(op) => op,
            PhysicalOperator::Sort(op) => op,
            PhysicalOperator::SubQuery(op) => op,
            PhysicalOperator::Cached(op) => op,
            PhysicalOperator::StringList(op) => op,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Operator {
        match self {
            PhysicalOperator::TableScan(op) => op,
            PhysicalOperator::Predicate(op) => op,
            PhysicalOperator::Project(op) => op,
            PhysicalOperator::Calc(op) => op,
            PhysicalOperator::Join(op) => op,
            PhysicalOperator::Insert(op) => op,
            PhysicalOperator::Delete(op) => op,
            PhysicalOperator::Update(op) => op,
            PhysicalOperator::Explain(op) => op,
            PhysicalOperator::CreateTable(op) => op,
            PhysicalOperator::Rename(op) => op,
            PhysicalOperator::Aggregate(op) => op,
            PhysicalOperator::Sort(op) => op,
            PhysicalOperator::SubQuery(op) => op,
            PhysicalOperator::Cached(op) => op,
            PhysicalOperator::StringList(op) => op,
        }
    }

    /// EXPLAIN label: `NAME` or `NAME(param)`.
    pub fn label(&self) -> String {
        let param = self.param();
        if param.is_empty() {
            self.name().to_string()
        } else {
            format!("{}({})", self.name(), param)
        }
    }

    /// Render the tree, one line per node, children indented below their
    /// parent.
    pub fn explain_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        self.render(0, &mut lines);
        lines
    }

    fn render(&self, depth: usize, lines: &mut Vec<String>) {
        let line = if depth == 0 {
            self.label()
        } else {
            format!("{}└─{}", "  ".repeat(depth - 1), self.label())
        };
        lines.push(line);
        for child in self.children() {
            child.render(depth + 1, lines);
        }
    }

    /// Copy out the current row.
    pub fn current_row(&self) -> ExecuteResult<ValueListTuple> {
        let mut row = None;
        self.visit_current(&mut |tuple| {
            row = Some(ValueListTuple::from_tuple(tuple)?);
            Ok(())
        })?;
        row.ok_or(ExecuteError::NoCurrentTuple(self.name()))
    }
}

impl Operator for PhysicalOperator {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn param(&self) -> String {
        self.inner().param()
    }

    fn children(&self) -> &[PhysicalOperator] {
        self.inner().children()
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        let result = self.inner_mut().open(trx);
        if let Err(e) = &result {
            warn!(operator = self.name(), tx = trx.label(), error = %e, "failed to open operator");
        }
        result
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        self.inner_mut().next(env)
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.inner_mut().close()
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        self.inner().visit_current(visitor)
    }

    fn affected_rows(&self) -> Option<usize> {
        self.inner().affected_rows()
    }
}

/// Fail unless an operator has exactly `expected` children.
pub(crate) fn check_children(
    name: &'static str,
    children: &[PhysicalOperator],
    expected: usize,
) -> ExecuteResult<()> {
    if children.len() != expected {
        warn!(operator = name, expected, actual = children.len(), "wrong number of children");
        return Err(ExecuteError::Internal(format!(
            "{} expects {} child(ren), found {}",
            name,
            expected,
            children.len()
        )));
    }
    Ok(())
}

/// Close every child, reporting the first failure after trying them all.
pub(crate) fn close_children(children: &mut [PhysicalOperator]) -> ExecuteResult<()> {
    let mut first_err = None;
    for child in children.iter_mut() {
        if let Err(e) = child.close() {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

pub(crate) fn not_open(name: &'static str) -> ExecuteError {
    ExecuteError::Internal(format!("{} used before open", name))
}

/// Drain an opened child into owned rows, keeping each row's status.
pub(crate) fn drain(
    child: &mut PhysicalOperator,
    env: &dyn Tuple,
) -> ExecuteResult<Vec<(ValueListTuple, Step)>> {
    let mut rows = Vec::new();
    loop {
        let step = child.next(env)?;
        if step == Step::Eof {
            return Ok(rows);
        }
        rows.push((child.current_row()?, step));
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    //! Fixtures shared by operator tests.

    use std::sync::Arc;

    use super::*;
    use crate::catalog::{Catalog, DataType, FieldMeta, Value};
    use crate::storage::Table;
    use crate::transaction::TransactionManager;
    use crate::tuple::EmptyTuple;

    pub struct Fixture {
        pub catalog: Catalog,
        pub manager: TransactionManager,
        pub table: Arc<Table>,
    }

    /// Table `t(id INT, name CHAR)` with committed rows.
    pub fn fixture(ids: &[i64]) -> Fixture {
        let catalog = Catalog::new();
        let table = catalog
            .create_table(
                "t",
                vec![
                    FieldMeta::new("id", DataType::Integer),
                    FieldMeta::new("name", DataType::Text),
                ],
            )
            .unwrap();
        let manager = TransactionManager::new();
        let trx = manager.begin();
        for id in ids {
            trx.insert_record(&table, vec![Value::Integer(*id), Value::Text(format!("n{}", id))])
                .unwrap();
        }
        trx.commit().unwrap();
        Fixture {
            catalog,
            manager,
            table,
        }
    }

    pub fn scan(table: &Arc<Table>, readonly: bool) -> PhysicalOperator {
        PhysicalOperator::TableScan(
            TableScanOperator::new(table.clone(), vec![0, 1], readonly, Vec::new(), Default::default())
                .unwrap(),
        )
    }

    /// Drive an opened operator to the end, returning each row's first
    /// cell and status.
    pub fn collect_first(op: &mut PhysicalOperator) -> Vec<(Value, Step)> {
        let mut out = Vec::new();
        loop {
            let step = op.next(&EmptyTuple).unwrap();
            if step == Step::Eof {
                return out;
            }
            let row = op.current_row().unwrap();
            out.push((row.cell_at(0).unwrap(), step));
        }
    }
}
