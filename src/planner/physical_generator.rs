//! Logical to physical lowering.
//!
//! One physical operator per logical node kind. No rewriting, no costing.

use tracing::{debug, warn};

use super::error::{PlanError, PlanResult};
use super::logical::{LogicalNode, LogicalOperator};
use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::executor::operators::{
    AggregateOperator, CachedOperator, CalcOperator, CreateTableOperator, DeleteOperator,
    ExplainOperator, InsertOperator, NestedLoopJoinOperator, Operator, PhysicalOperator,
    PredicateOperator, ProjectOperator, RenameOperator, SortOperator, SubQueryOperator,
    TableScanOperator, UpdateOperator,
};

/// Lowers logical plans into executable operator trees.
pub struct PhysicalPlanGenerator {
    catalog: Catalog,
    config: PlannerConfig,
}

impl PhysicalPlanGenerator {
    pub fn new(catalog: Catalog, config: PlannerConfig) -> Self {
        Self { catalog, config }
    }

    /// Lower a logical plan, children first.
    pub fn create(&self, logical: LogicalOperator) -> PlanResult<PhysicalOperator> {
        let (node, children) = logical.into_parts();
        let kind = node.kind();
        let mut children = children
            .into_iter()
            .map(|child| self.create(child))
            .collect::<PlanResult<Vec<_>>>()?;

        let policy = self.config.conflict_policy;
        let op = match node {
            LogicalNode::TableGet {
                table,
                field_indexes,
                readonly,
                predicates,
            } => {
                expect_children(kind, &children, 0)?;
                for p in &predicates {
                    expect_boolean(kind, p)?;
                }
                PhysicalOperator::TableScan(TableScanOperator::new(
                    table,
                    field_indexes,
                    readonly,
                    predicates,
                    policy,
                )?)
            }
            LogicalNode::Predicate { expr } => {
                expect_children(kind, &children, 1)?;
                expect_boolean(kind, &expr)?;
                PhysicalOperator::Predicate(
                    PredicateOperator::new(expr, policy).with_child(single(&mut children)?),
                )
            }
            LogicalNode::Project { exprs } => {
                let project = ProjectOperator::new(exprs);
                match children.len() {
                    0 => PhysicalOperator::Project(project),
                    1 => PhysicalOperator::Project(project.with_child(single(&mut children)?)),
                    n => return Err(wrong_children(kind, "0 or 1", n)),
                }
            }
            LogicalNode::Join => {
                expect_children(kind, &children, 2)?;
                let right = single(&mut children)?;
                let left = single(&mut children)?;
                PhysicalOperator::Join(NestedLoopJoinOperator::new(left, right))
            }
            LogicalNode::Calc { exprs } => {
                expect_children(kind, &children, 0)?;
                PhysicalOperator::Calc(CalcOperator::new(exprs))
            }
            LogicalNode::Insert { table, records } => {
                expect_children(kind, &children, 0)?;
                PhysicalOperator::Insert(InsertOperator::new(table, records))
            }
            LogicalNode::Delete { table } => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Delete(DeleteOperator::new(table, single(&mut children)?))
            }
            LogicalNode::Update { table, assignments } => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Update(UpdateOperator::new(
                    table,
                    assignments,
                    single(&mut children)?,
                ))
            }
            LogicalNode::Explain => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Explain(ExplainOperator::new(single(&mut children)?))
            }
            LogicalNode::CreateTable { name, fields } => {
                expect_children(kind, &children, 0)?;
                PhysicalOperator::CreateTable(CreateTableOperator::new(
                    self.catalog.clone(),
                    name,
                    fields,
                ))
            }
            LogicalNode::Rename { table, new_name } => {
                expect_children(kind, &children, 0)?;
                PhysicalOperator::Rename(RenameOperator::new(self.catalog.clone(), table, new_name))
            }
            LogicalNode::Aggregate {
                group_by,
                aggregates,
            } => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Aggregate(AggregateOperator::new(
                    group_by,
                    aggregates,
                    single(&mut children)?,
                ))
            }
            LogicalNode::Sort { order_by } => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Sort(SortOperator::new(order_by, single(&mut children)?))
            }
            LogicalNode::SubQuery { alias } => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::SubQuery(SubQueryOperator::new(alias, single(&mut children)?))
            }
            LogicalNode::Cached => {
                expect_children(kind, &children, 1)?;
                PhysicalOperator::Cached(CachedOperator::new(single(&mut children)?))
            }
        };

        debug!(kind, operator = op.name(), "lowered logical node");
        Ok(op)
    }
}

fn expect_children(kind: &'static str, children: &[PhysicalOperator], expected: usize) -> PlanResult<()> {
    if children.len() == expected {
        Ok(())
    } else {
        Err(wrong_children(kind, &expected.to_string(), children.len()))
    }
}

fn wrong_children(kind: &'static str, expected: &str, actual: usize) -> PlanError {
    warn!(kind, expected, actual, "logical node has wrong number of children");
    PlanError::Internal(format!(
        "{} node expects {} child(ren), found {}",
        kind, expected, actual
    ))
}

fn expect_boolean(kind: &'static str, expr: &crate::stmt::Expression) -> PlanResult<()> {
    if expr.is_boolean() {
        Ok(())
    } else {
        Err(PlanError::Internal(format!(
            "{} node carries non-boolean condition {}",
            kind, expr
        )))
    }
}

/// Pop the last lowered child.
fn single(children: &mut Vec<PhysicalOperator>) -> PlanResult<PhysicalOperator> {
    children
        .pop()
        .ok_or_else(|| PlanError::Internal("missing child operator".into()))
}
