//! Statement to logical plan translation.
//!
//! Plan shape is a pure function of the statement and the planner
//! configuration:
//!
//! ```text
//! Project
//!   └─ Sort                 (ORDER BY)
//!        └─ Predicate       (HAVING)
//!             └─ Aggregate  (GROUP BY / aggregate calls)
//!                  └─ Predicate (WHERE, after pushdown)
//!                       └─ Join ... (left-deep, ON predicates above each join)
//! ```
//!
//! With a single FROM entry the WHERE clause stays one predicate node right
//! above the scan. With several, each AND-conjunct that reads exactly one
//! table is pushed into that table's scan and the rest stay above the
//! joins.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use super::error::{PlanError, PlanResult};
use super::logical::{LogicalNode, LogicalOperator};
use crate::catalog::DataType;
use crate::config::PlannerConfig;
use crate::stmt::{
    AggregateExpr, DeleteStmt, Expression, FieldExpr, FromItem, SelectStmt, Statement, TableSource,
    UpdateStmt,
};
use crate::storage::Table;

/// Builds logical plans from resolved statements.
#[derive(Debug, Clone, Default)]
pub struct LogicalPlanGenerator {
    config: PlannerConfig,
}

/// Fields a FROM entry offers to expressions.
enum Scope<'a> {
    Table(&'a Arc<Table>),
    /// Output names of a sub-query.
    Output(Vec<String>),
}

struct Source<'a> {
    name: String,
    scope: Scope<'a>,
}

impl LogicalPlanGenerator {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Build the logical plan of a statement.
    pub fn create(&self, stmt: &Statement) -> PlanResult<LogicalOperator> {
        let plan = match stmt {
            Statement::Calc(calc) => LogicalOperator::new(LogicalNode::Calc {
                exprs: calc.expressions.clone(),
            }),
            Statement::Select(select) => self.plan_select(select)?,
            Statement::Insert(insert) => LogicalOperator::new(LogicalNode::Insert {
                table: insert.table.clone(),
                records: insert.records.clone(),
            }),
            Statement::Delete(delete) => self.plan_delete(delete)?,
            Statement::Update(update) => self.plan_update(update)?,
            Statement::Explain(explain) => {
                LogicalOperator::new(LogicalNode::Explain).with_child(self.create(&explain.statement)?)
            }
            Statement::CreateTable(create) => LogicalOperator::new(LogicalNode::CreateTable {
                name: create.name.clone(),
                fields: create.fields.clone(),
            }),
            Statement::RenameTable(rename) => LogicalOperator::new(LogicalNode::Rename {
                table: rename.table.clone(),
                new_name: rename.new_name.clone(),
            }),
            Statement::ShowTables | Statement::Begin | Statement::Commit | Statement::Rollback => {
                return Err(PlanError::Unsupported(format!(
                    "{} is a command, not a plannable statement",
                    stmt.kind()
                )));
            }
        };

        debug!(kind = stmt.kind(), root = plan.kind(), tables = ?plan.tables(), "logical plan created");
        Ok(plan)
    }

    fn plan_select(&self, select: &SelectStmt) -> PlanResult<LogicalOperator> {
        if select.projections.is_empty() {
            return Err(PlanError::Unsupported("empty select list".into()));
        }
        if select.from.is_empty() {
            return self.plan_without_from(select);
        }

        let sources = sources(select);
        let needed = resolve_select(select, &sources)?;

        if let Some(filter) = &select.filter {
            check_condition(filter, "WHERE")?;
            if filter.has_aggregate() {
                return Err(PlanError::Unsupported("aggregate in WHERE".into()));
            }
        }

        // Split WHERE between the scans and one predicate above the joins.
        let mut pushed: Vec<Vec<Expression>> = vec![Vec::new(); select.from.len()];
        let mut residual = Vec::new();
        if let Some(filter) = &select.filter {
            if select.from.len() == 1 {
                residual.push(filter.clone());
            } else {
                for conjunct in filter.clone().into_conjuncts() {
                    match pushdown_target(&conjunct, &sources) {
                        Some(i) => pushed[i].push(conjunct),
                        None => residual.push(conjunct),
                    }
                }
            }
        }

        let mut plan: Option<LogicalOperator> = None;
        for ((item, fields), predicates) in select.from.iter().zip(needed).zip(pushed) {
            let mut source = self.plan_source(item, fields, predicates)?;
            let mut current = match plan.take() {
                None => source,
                Some(left) => {
                    if self.config.cache_join_inner && matches!(item.source, TableSource::Table(_)) {
                        source = LogicalOperator::new(LogicalNode::Cached).with_child(source);
                    }
                    LogicalOperator::new(LogicalNode::Join)
                        .with_child(left)
                        .with_child(source)
                }
            };
            if let Some(on) = &item.on {
                check_condition(on, "ON")?;
                current = predicate(on.clone(), current);
            }
            plan = Some(current);
        }
        let mut plan = plan.ok_or_else(|| PlanError::Internal("select without sources".into()))?;

        if let Some(residual) = Expression::from_conjuncts(residual) {
            plan = predicate(residual, plan);
        }

        if select.is_aggregate() {
            plan = self.plan_aggregate(select, plan)?;
        }

        if !select.order_by.is_empty() {
            plan = LogicalOperator::new(LogicalNode::Sort {
                order_by: select.order_by.clone(),
            })
            .with_child(plan);
        }

        Ok(LogicalOperator::new(LogicalNode::Project {
            exprs: select.projections.clone(),
        })
        .with_child(plan))
    }

    /// `SELECT 1+1`: a childless projection.
    fn plan_without_from(&self, select: &SelectStmt) -> PlanResult<LogicalOperator> {
        if select.filter.is_some()
            || !select.group_by.is_empty()
            || select.having.is_some()
            || !select.order_by.is_empty()
            || select.is_aggregate()
        {
            return Err(PlanError::Unsupported(
                "clauses other than the select list need a FROM".into(),
            ));
        }
        for projection in &select.projections {
            if let Some(table) = projection.expr.referenced_tables().into_iter().next() {
                return Err(PlanError::TableNotFound(table));
            }
        }
        Ok(LogicalOperator::new(LogicalNode::Project {
            exprs: select.projections.clone(),
        }))
    }

    /// Only table entries take pushed-down conjuncts.
    fn plan_source(
        &self,
        item: &FromItem,
        field_indexes: BTreeSet<usize>,
        predicates: Vec<Expression>,
    ) -> PlanResult<LogicalOperator> {
        match &item.source {
            TableSource::Table(table) => Ok(LogicalOperator::new(LogicalNode::TableGet {
                table: table.clone(),
                field_indexes: field_indexes.into_iter().collect(),
                readonly: true,
                predicates,
            })),
            TableSource::SubQuery { select, alias } => {
                let inner = self.plan_select(select)?;
                Ok(LogicalOperator::new(LogicalNode::SubQuery {
                    alias: alias.clone(),
                })
                .with_child(inner))
            }
        }
    }

    fn plan_aggregate(
        &self,
        select: &SelectStmt,
        child: LogicalOperator,
    ) -> PlanResult<LogicalOperator> {
        let grouped: Vec<&FieldExpr> = select
            .group_by
            .iter()
            .filter_map(|expr| match expr {
                Expression::Field(field) => Some(field),
                _ => None,
            })
            .collect();
        let above = select
            .projections
            .iter()
            .map(|p| &p.expr)
            .chain(select.having.iter())
            .chain(select.order_by.iter().map(|o| &o.expr));
        for expr in above {
            if let Some(field) = ungrouped_field(expr, &grouped) {
                return Err(PlanError::Unsupported(format!(
                    "{}.{} must appear in GROUP BY or inside an aggregate",
                    field.table, field.field
                )));
            }
        }
        for group in &select.group_by {
            if group.has_aggregate() {
                return Err(PlanError::Unsupported(format!("aggregate in GROUP BY: {}", group)));
            }
        }

        let mut aggregates: Vec<AggregateExpr> = Vec::new();
        for projection in &select.projections {
            projection.expr.collect_aggregates(&mut aggregates);
        }
        if let Some(having) = &select.having {
            having.collect_aggregates(&mut aggregates);
        }
        for order in &select.order_by {
            order.expr.collect_aggregates(&mut aggregates);
        }

        let mut plan = LogicalOperator::new(LogicalNode::Aggregate {
            group_by: select.group_by.clone(),
            aggregates,
        })
        .with_child(child);

        if let Some(having) = &select.having {
            check_condition(having, "HAVING")?;
            plan = predicate(having.clone(), plan);
        }
        Ok(plan)
    }

    fn plan_delete(&self, delete: &DeleteStmt) -> PlanResult<LogicalOperator> {
        let scan = self.write_scan(&delete.table, delete.filter.as_ref(), &[])?;
        Ok(LogicalOperator::new(LogicalNode::Delete {
            table: delete.table.clone(),
        })
        .with_child(scan))
    }

    fn plan_update(&self, update: &UpdateStmt) -> PlanResult<LogicalOperator> {
        let table = &update.table;
        let mut assignments = Vec::with_capacity(update.assignments.len());
        {
            let meta = table.meta();
            for assignment in &update.assignments {
                let index = meta.field_index(&assignment.field).ok_or_else(|| {
                    PlanError::FieldNotFound(format!("{}.{}", meta.name, assignment.field))
                })?;
                let field = &meta.fields[index];
                let value_type = assignment.value.value_type();
                if !assignable(field.data_type, value_type) {
                    return Err(PlanError::TypeMismatch(format!(
                        "cannot assign {} to {}.{} of type {}",
                        value_type, meta.name, field.name, field.data_type
                    )));
                }
                assignments.push((index, assignment.value.clone()));
            }
        }

        let values: Vec<&Expression> = update.assignments.iter().map(|a| &a.value).collect();
        let scan = self.write_scan(table, update.filter.as_ref(), &values)?;
        Ok(LogicalOperator::new(LogicalNode::Update {
            table: table.clone(),
            assignments,
        })
        .with_child(scan))
    }

    /// Write-visible scan of every field, with the optional filter above it.
    fn write_scan(
        &self,
        table: &Arc<Table>,
        filter: Option<&Expression>,
        extra: &[&Expression],
    ) -> PlanResult<LogicalOperator> {
        let sources = [Source {
            name: table.name(),
            scope: Scope::Table(table),
        }];
        let mut needed = vec![BTreeSet::new()];
        for expr in filter.into_iter().chain(extra.iter().copied()) {
            resolve(expr, &sources, &mut needed)?;
        }

        let field_num = table.meta().field_num();
        let scan = LogicalOperator::new(LogicalNode::TableGet {
            table: table.clone(),
            field_indexes: (0..field_num).collect(),
            readonly: false,
            predicates: Vec::new(),
        });
        match filter {
            Some(filter) => {
                check_condition(filter, "WHERE")?;
                Ok(predicate(filter.clone(), scan))
            }
            None => Ok(scan),
        }
    }
}

fn sources(select: &SelectStmt) -> Vec<Source<'_>> {
    select
        .from
        .iter()
        .map(|item| {
            let scope = match &item.source {
                TableSource::Table(table) => Scope::Table(table),
                TableSource::SubQuery { select: inner, .. } => {
                    Scope::Output(inner.projections.iter().map(|p| p.spec().field).collect())
                }
            };
            Source {
                name: item.source.name(),
                scope,
            }
        })
        .collect()
}

fn predicate(expr: Expression, child: LogicalOperator) -> LogicalOperator {
    LogicalOperator::new(LogicalNode::Predicate { expr }).with_child(child)
}

fn check_condition(expr: &Expression, clause: &str) -> PlanResult<()> {
    if expr.is_boolean() {
        Ok(())
    } else {
        Err(PlanError::TypeMismatch(format!(
            "{} condition {} is {}, not boolean",
            clause,
            expr,
            expr.value_type()
        )))
    }
}

fn assignable(field: DataType, value: DataType) -> bool {
    value == DataType::Undefined
        || value == field
        || (field == DataType::Float && value == DataType::Integer)
}

/// Index of the one table source a conjunct reads, if it reads exactly one.
fn pushdown_target(conjunct: &Expression, sources: &[Source<'_>]) -> Option<usize> {
    let tables = conjunct.referenced_tables();
    if tables.len() != 1 {
        return None;
    }
    let name = tables.iter().next()?;
    sources
        .iter()
        .position(|s| &s.name == name && matches!(s.scope, Scope::Table(_)))
}

/// Check every field reference of a select and collect, per FROM entry, the
/// field indexes the plan reads.
fn resolve_select(select: &SelectStmt, sources: &[Source<'_>]) -> PlanResult<Vec<BTreeSet<usize>>> {
    let mut needed = vec![BTreeSet::new(); sources.len()];
    let exprs = select
        .projections
        .iter()
        .map(|p| &p.expr)
        .chain(select.filter.iter())
        .chain(select.group_by.iter())
        .chain(select.having.iter())
        .chain(select.order_by.iter().map(|o| &o.expr));
    for expr in exprs {
        resolve(expr, sources, &mut needed)?;
    }
    // ON sits above the join that introduces its entry and sees nothing
    // joined later.
    for (i, item) in select.from.iter().enumerate() {
        if let Some(on) = &item.on {
            resolve(on, &sources[..=i], &mut needed[..=i])?;
        }
    }
    Ok(needed)
}

/// First field read outside aggregate calls that is not a grouped column.
fn ungrouped_field<'a>(expr: &'a Expression, grouped: &[&FieldExpr]) -> Option<&'a FieldExpr> {
    let mut found = None;
    expr.visit_ungrouped_fields(&mut |field| {
        let is_grouped = grouped
            .iter()
            .any(|g| g.table == field.table && g.field == field.field);
        if found.is_none() && !is_grouped {
            found = Some(field);
        }
    });
    found
}

fn resolve(
    expr: &Expression,
    sources: &[Source<'_>],
    needed: &mut [BTreeSet<usize>],
) -> PlanResult<()> {
    let mut fields: Vec<&FieldExpr> = Vec::new();
    expr.visit_fields(&mut |field| fields.push(field));

    for field in fields {
        let (i, source) = sources
            .iter()
            .enumerate()
            .find(|(_, s)| s.name == field.table)
            .ok_or_else(|| PlanError::TableNotFound(field.table.clone()))?;
        let missing = || PlanError::FieldNotFound(format!("{}.{}", field.table, field.field));
        match &source.scope {
            Scope::Table(table) => {
                let index = table.meta().field_index(&field.field).ok_or_else(missing)?;
                needed[i].insert(index);
            }
            Scope::Output(names) => {
                if !names.contains(&field.field) {
                    return Err(missing());
                }
            }
        }
    }
    Ok(())
}
