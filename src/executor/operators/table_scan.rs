use std::sync::Arc;

use super::{not_open, Operator, Step, TupleVisitor};
use crate::config::ConflictPolicy;
use crate::executor::error::{ExecuteError, ExecuteResult};
use crate::executor::eval::evaluate_predicate;
use crate::planner::{PlanError, PlanResult};
use crate::stmt::Expression;
use crate::storage::{Record, Table};
use crate::transaction::{Snapshot, Transaction, Visibility};
use crate::tuple::{JoinedTuple, RowTuple, Tuple, TupleCellSpec};

/// Sequential scan over a table's record versions.
///
/// A readonly scan reads through the transaction's snapshot. A write
/// scan (the access path of DELETE and UPDATE) sees the latest committed
/// state and reports rows another transaction is changing as
/// `Step::Conflict`.
pub struct TableScanOperator {
    table: Arc<Table>,
    field_indexes: Vec<usize>,
    specs: Vec<TupleCellSpec>,
    readonly: bool,
    predicates: Vec<Expression>,
    conflict_policy: ConflictPolicy,
    trx: Option<Transaction>,
    snapshot: Option<Snapshot>,
    cursor: usize,
    current: Option<Record>,
}

impl TableScanOperator {
    pub fn new(
        table: Arc<Table>,
        field_indexes: Vec<usize>,
        readonly: bool,
        predicates: Vec<Expression>,
        conflict_policy: ConflictPolicy,
    ) -> PlanResult<Self> {
        let specs = {
            let meta = table.meta();
            field_indexes
                .iter()
                .map(|&i| {
                    meta.fields
                        .get(i)
                        .map(|field| TupleCellSpec::qualified(meta.name.clone(), field.name.clone()))
                        .ok_or_else(|| {
                            PlanError::Internal(format!("table {} has no field #{}", meta.name, i))
                        })
                })
                .collect::<PlanResult<Vec<_>>>()?
        };

        Ok(Self {
            table,
            field_indexes,
            specs,
            readonly,
            predicates,
            conflict_policy,
            trx: None,
            snapshot: None,
            cursor: 0,
            current: None,
        })
    }

    fn matches(&self, record: &Record, env: &dyn Tuple) -> ExecuteResult<bool> {
        let row = RowTuple::new(&self.specs, &self.field_indexes, record);
        let tuple = JoinedTuple::new(&row, env);
        for predicate in &self.predicates {
            if !evaluate_predicate(predicate, &tuple)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Operator for TableScanOperator {
    fn name(&self) -> &'static str {
        "TABLE_SCAN"
    }

    fn param(&self) -> String {
        let mut param = self.table.name();
        if !self.predicates.is_empty() {
            let preds: Vec<String> = self.predicates.iter().map(|p| p.to_string()).collect();
            param.push_str(&format!(" WHERE {}", preds.join(" AND ")));
        }
        param
    }

    fn open(&mut self, trx: &Transaction) -> ExecuteResult<()> {
        self.snapshot = Some(trx.read_snapshot()?);
        self.trx = Some(trx.clone());
        self.cursor = 0;
        self.current = None;
        Ok(())
    }

    fn next(&mut self, env: &dyn Tuple) -> ExecuteResult<Step> {
        let (Some(trx), Some(snapshot)) = (&self.trx, &self.snapshot) else {
            return Err(not_open(self.name()));
        };

        loop {
            let Some(record) = self.table.record_at(self.cursor) else {
                self.current = None;
                return Ok(Step::Eof);
            };
            self.cursor += 1;

            let step = match trx.visibility(&record, snapshot, self.readonly)? {
                Visibility::Invisible => continue,
                Visibility::Visible => Step::Row,
                Visibility::Conflict => Step::Conflict,
            };

            let matched = self.matches(&record, env)?;
            if matched || (step == Step::Conflict && self.conflict_policy == ConflictPolicy::SurfaceAll)
            {
                self.current = Some(record);
                return Ok(step);
            }
        }
    }

    fn close(&mut self) -> ExecuteResult<()> {
        self.trx = None;
        self.snapshot = None;
        self.current = None;
        Ok(())
    }

    fn visit_current(&self, visitor: &mut TupleVisitor<'_>) -> ExecuteResult<()> {
        let record = self
            .current
            .as_ref()
            .ok_or(ExecuteError::NoCurrentTuple(self.name()))?;
        visitor(&RowTuple::new(&self.specs, &self.field_indexes, record))
    }
}
