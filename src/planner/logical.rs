//! Logical query plan representation.
//!
//! Logical plans represent *what* the query does, not *how* it will be
//! executed. Every node owns its children and the set of table names read
//! beneath it, which is recomputed whenever the children change.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::catalog::{FieldMeta, Value};
use crate::stmt::{AggregateExpr, Expression, OrderBy, ProjectExpr};
use crate::storage::Table;

/// The kind-specific payload of a logical node.
#[derive(Debug, Clone)]
pub enum LogicalNode {
    /// Scan a table.
    TableGet {
        table: Arc<Table>,
        /// Fields read by the rest of the plan, in storage order.
        field_indexes: Vec<usize>,
        /// Readonly scans read a snapshot; write scans report conflicts.
        readonly: bool,
        /// Conjuncts evaluated by the scan itself.
        predicates: Vec<Expression>,
    },

    /// Keep rows for which the expression holds.
    Predicate { expr: Expression },

    /// Map rows through the SELECT list. Childless for `SELECT 1+1`.
    Project { exprs: Vec<ProjectExpr> },

    /// Nested-loop cross product of two inputs.
    Join,

    /// Evaluate expressions once, without input.
    Calc { exprs: Vec<Expression> },

    Insert {
        table: Arc<Table>,
        records: Vec<Vec<Value>>,
    },

    Delete { table: Arc<Table> },

    Update {
        table: Arc<Table>,
        /// `(field index, new value)` pairs.
        assignments: Vec<(usize, Expression)>,
    },

    /// Describe the child plan instead of running it.
    Explain,

    CreateTable {
        name: String,
        fields: Vec<FieldMeta>,
    },

    Rename {
        table: Arc<Table>,
        new_name: String,
    },

    /// GROUP BY and aggregate calls.
    Aggregate {
        group_by: Vec<Expression>,
        aggregates: Vec<AggregateExpr>,
    },

    Sort { order_by: Vec<OrderBy> },

    /// Re-qualify the child's output under an alias.
    SubQuery { alias: String },

    /// Buffer the child's output for replay.
    Cached,
}

impl LogicalNode {
    /// Short kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            LogicalNode::TableGet { .. } => "table_get",
            LogicalNode::Predicate { .. } => "predicate",
            LogicalNode::Project { .. } => "project",
            LogicalNode::Join => "join",
            LogicalNode::Calc { .. } => "calc",
            LogicalNode::Insert { .. } => "insert",
            LogicalNode::Delete { .. } => "delete",
            LogicalNode::Update { .. } => "update",
            LogicalNode::Explain => "explain",
            LogicalNode::CreateTable { .. } => "create_table",
            LogicalNode::Rename { .. } => "rename",
            LogicalNode::Aggregate { .. } => "aggregate",
            LogicalNode::Sort { .. } => "sort",
            LogicalNode::SubQuery { .. } => "sub_query",
            LogicalNode::Cached => "cached",
        }
    }

    /// The table a leaf contributes to the table set, if any.
    fn seed_table(&self) -> Option<String> {
        match self {
            LogicalNode::TableGet { table, .. }
            | LogicalNode::Insert { table, .. }
            | LogicalNode::Rename { table, .. } => Some(table.name()),
            LogicalNode::CreateTable { name, .. } => Some(name.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalNode::TableGet {
                table,
                readonly,
                predicates,
                ..
            } => {
                let mode = if *readonly { "read" } else { "write" };
                write!(f, "TableGet: {} ({})", table.name(), mode)?;
                if !predicates.is_empty() {
                    let preds: Vec<String> = predicates.iter().map(|p| p.to_string()).collect();
                    write!(f, " [{}]", preds.join(" AND "))?;
                }
                Ok(())
            }
            LogicalNode::Predicate { expr } => write!(f, "Predicate: {}", expr),
            LogicalNode::Project { exprs } => {
                let cols: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "Project: {}", cols.join(", "))
            }
            LogicalNode::Join => write!(f, "Join"),
            LogicalNode::Calc { exprs } => {
                let cols: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
                write!(f, "Calc: {}", cols.join(", "))
            }
            LogicalNode::Insert { table, records } => {
                write!(f, "Insert: {} ({} records)", table.name(), records.len())
            }
            LogicalNode::Delete { table } => write!(f, "Delete: {}", table.name()),
            LogicalNode::Update { table, assignments } => {
                write!(f, "Update: {} ({} fields)", table.name(), assignments.len())
            }
            LogicalNode::Explain => write!(f, "Explain"),
            LogicalNode::CreateTable { name, .. } => write!(f, "CreateTable: {}", name),
            LogicalNode::Rename { table, new_name } => {
                write!(f, "Rename: {} -> {}", table.name(), new_name)
            }
            LogicalNode::Aggregate {
                group_by,
                aggregates,
            } => {
                let aggs: Vec<String> = aggregates.iter().map(|a| a.to_string()).collect();
                write!(f, "Aggregate: {}", aggs.join(", "))?;
                if !group_by.is_empty() {
                    let groups: Vec<String> = group_by.iter().map(|g| g.to_string()).collect();
                    write!(f, " GROUP BY {}", groups.join(", "))?;
                }
                Ok(())
            }
            LogicalNode::Sort { order_by } => {
                let keys: Vec<String> = order_by.iter().map(|o| o.to_string()).collect();
                write!(f, "Sort: {}", keys.join(", "))
            }
            LogicalNode::SubQuery { alias } => write!(f, "SubQuery: {}", alias),
            LogicalNode::Cached => write!(f, "Cached"),
        }
    }
}

/// A node of the logical plan tree.
#[derive(Debug, Clone)]
pub struct LogicalOperator {
    node: LogicalNode,
    children: Vec<LogicalOperator>,
    tables: BTreeSet<String>,
}

impl LogicalOperator {
    /// Create a node without children.
    pub fn new(node: LogicalNode) -> Self {
        let mut op = Self {
            node,
            children: Vec::new(),
            tables: BTreeSet::new(),
        };
        op.refresh_tables();
        op
    }

    /// Append a child, builder style.
    pub fn with_child(mut self, child: LogicalOperator) -> Self {
        self.add_child(child);
        self
    }

    pub fn add_child(&mut self, child: LogicalOperator) {
        self.children.push(child);
        self.refresh_tables();
    }

    /// Replace all children.
    pub fn set_children(&mut self, children: Vec<LogicalOperator>) {
        self.children = children;
        self.refresh_tables();
    }

    /// Detach and return the children.
    pub fn take_children(&mut self) -> Vec<LogicalOperator> {
        let children = std::mem::take(&mut self.children);
        self.refresh_tables();
        children
    }

    pub fn node(&self) -> &LogicalNode {
        &self.node
    }

    pub fn children(&self) -> &[LogicalOperator] {
        &self.children
    }

    /// Names of the tables read by this subtree.
    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    pub fn kind(&self) -> &'static str {
        self.node.kind()
    }

    /// Split into payload and children.
    pub fn into_parts(self) -> (LogicalNode, Vec<LogicalOperator>) {
        (self.node, self.children)
    }

    fn refresh_tables(&mut self) {
        let mut tables: BTreeSet<String> = self.node.seed_table().into_iter().collect();
        for child in &self.children {
            tables.extend(child.tables.iter().cloned());
        }
        self.tables = tables;
    }

    fn fmt_indent(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{}", "  ".repeat(depth), self.node)?;
        for child in &self.children {
            child.fmt_indent(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indent(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DataType};

    fn table(catalog: &Catalog, name: &str) -> Arc<Table> {
        catalog
            .create_table(name, vec![FieldMeta::new("id", DataType::Integer)])
            .unwrap()
    }

    fn get(table: &Arc<Table>) -> LogicalOperator {
        LogicalOperator::new(LogicalNode::TableGet {
            table: table.clone(),
            field_indexes: vec![0],
            readonly: true,
            predicates: Vec::new(),
        })
    }

    fn names(op: &LogicalOperator) -> Vec<&str> {
        op.tables().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_tables_bottom_up() {
        let catalog = Catalog::new();
        let a = table(&catalog, "a");
        let b = table(&catalog, "b");

        let join = LogicalOperator::new(LogicalNode::Join)
            .with_child(get(&a))
            .with_child(LogicalOperator::new(LogicalNode::Cached).with_child(get(&b)));
        assert_eq!(names(&join), vec!["a", "b"]);

        let explain = LogicalOperator::new(LogicalNode::Explain).with_child(join);
        assert_eq!(names(&explain), vec!["a", "b"]);
    }

    #[test]
    fn test_tables_follow_mutation() {
        let catalog = Catalog::new();
        let a = table(&catalog, "a");
        let b = table(&catalog, "b");

        let mut join = LogicalOperator::new(LogicalNode::Join);
        assert!(join.tables().is_empty());

        join.add_child(get(&a));
        assert_eq!(names(&join), vec!["a"]);

        let taken = join.take_children();
        assert_eq!(taken.len(), 1);
        assert!(join.tables().is_empty());

        join.set_children(vec![get(&b)]);
        assert_eq!(names(&join), vec!["b"]);
    }

    #[test]
    fn test_target_leaves_seed_table() {
        let catalog = Catalog::new();
        let a = table(&catalog, "a");

        let insert = LogicalOperator::new(LogicalNode::Insert {
            table: a.clone(),
            records: vec![vec![Value::Integer(1)]],
        });
        assert_eq!(names(&insert), vec!["a"]);

        let create = LogicalOperator::new(LogicalNode::CreateTable {
            name: "fresh".into(),
            fields: vec![FieldMeta::new("k", DataType::Integer)],
        });
        assert_eq!(names(&create), vec!["fresh"]);

        let calc = LogicalOperator::new(LogicalNode::Calc {
            exprs: vec![Expression::value(1)],
        });
        assert!(calc.tables().is_empty());
    }

    #[test]
    fn test_display_tree() {
        let catalog = Catalog::new();
        let a = table(&catalog, "a");
        let plan = LogicalOperator::new(LogicalNode::Project {
            exprs: vec![ProjectExpr::new(Expression::field("a", "id", DataType::Integer))],
        })
        .with_child(get(&a));

        assert_eq!(plan.to_string(), "Project: a.id\n  TableGet: a (read)\n");
    }
}
