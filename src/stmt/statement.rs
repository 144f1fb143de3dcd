//! Resolved statements.
//!
//! These are the output of name resolution: table references are live
//! catalog handles and every expression is already bound.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::expr::Expression;
use crate::catalog::{FieldMeta, Value};
use crate::storage::Table;
use crate::tuple::TupleCellSpec;

/// A resolved statement.
#[derive(Debug, Clone)]
pub enum Statement {
    /// SELECT without FROM that only evaluates expressions.
    Calc(CalcStmt),
    Select(SelectStmt),
    Insert(InsertStmt),
    Delete(DeleteStmt),
    Update(UpdateStmt),
    Explain(ExplainStmt),
    CreateTable(CreateTableStmt),
    RenameTable(RenameTableStmt),
    ShowTables,
    Begin,
    Commit,
    Rollback,
}

impl Statement {
    /// Short kind name, used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Calc(_) => "calc",
            Statement::Select(_) => "select",
            Statement::Insert(_) => "insert",
            Statement::Delete(_) => "delete",
            Statement::Update(_) => "update",
            Statement::Explain(_) => "explain",
            Statement::CreateTable(_) => "create_table",
            Statement::RenameTable(_) => "rename_table",
            Statement::ShowTables => "show_tables",
            Statement::Begin => "begin",
            Statement::Commit => "commit",
            Statement::Rollback => "rollback",
        }
    }

    /// Names of every catalog table the statement touches.
    pub fn referenced_tables(&self) -> BTreeSet<String> {
        let mut tables = BTreeSet::new();
        match self {
            Statement::Select(select) => select.collect_tables(&mut tables),
            Statement::Insert(insert) => {
                tables.insert(insert.table.name());
            }
            Statement::Delete(delete) => {
                tables.insert(delete.table.name());
            }
            Statement::Update(update) => {
                tables.insert(update.table.name());
            }
            Statement::Explain(explain) => return explain.statement.referenced_tables(),
            Statement::CreateTable(create) => {
                tables.insert(create.name.clone());
            }
            Statement::RenameTable(rename) => {
                tables.insert(rename.table.name());
            }
            Statement::Calc(_)
            | Statement::ShowTables
            | Statement::Begin
            | Statement::Commit
            | Statement::Rollback => {}
        }
        tables
    }
}

/// `SELECT expr, ...` with no table reference.
#[derive(Debug, Clone)]
pub struct CalcStmt {
    pub expressions: Vec<Expression>,
}

/// A SELECT list entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectExpr {
    pub expr: Expression,
    pub alias: Option<String>,
}

impl ProjectExpr {
    pub fn new(expr: Expression) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Output cell spec. Plain field references keep their qualifier so
    /// `t.id` can still be looked up by an outer query.
    pub fn spec(&self) -> TupleCellSpec {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => TupleCellSpec::new(alias.clone()),
            (None, Expression::Field(field)) => {
                TupleCellSpec::qualified(field.table.clone(), field.field.clone())
            }
            (None, expr) => TupleCellSpec::new(expr.to_string()),
        }
    }
}

impl fmt::Display for ProjectExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.expr, alias),
            None => write!(f, "{}", self.expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expression,
    pub ascending: bool,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "ASC" } else { "DESC" };
        write!(f, "{} {}", self.expr, dir)
    }
}

/// Source of rows in a FROM clause.
#[derive(Debug, Clone)]
pub enum TableSource {
    Table(Arc<Table>),
    SubQuery { select: Box<SelectStmt>, alias: String },
}

impl TableSource {
    /// Name expressions use to qualify this source's fields.
    pub fn name(&self) -> String {
        match self {
            TableSource::Table(table) => table.name(),
            TableSource::SubQuery { alias, .. } => alias.clone(),
        }
    }
}

/// One FROM entry. `on` is the condition of the JOIN that introduced it.
#[derive(Debug, Clone)]
pub struct FromItem {
    pub source: TableSource,
    pub on: Option<Expression>,
}

impl FromItem {
    pub fn table(table: Arc<Table>) -> Self {
        Self {
            source: TableSource::Table(table),
            on: None,
        }
    }

    pub fn join(table: Arc<Table>, on: Expression) -> Self {
        Self {
            source: TableSource::Table(table),
            on: Some(on),
        }
    }

    pub fn sub_query(select: SelectStmt, alias: impl Into<String>) -> Self {
        Self {
            source: TableSource::SubQuery {
                select: Box::new(select),
                alias: alias.into(),
            },
            on: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectStmt {
    pub projections: Vec<ProjectExpr>,
    pub from: Vec<FromItem>,
    pub filter: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderBy>,
}

impl SelectStmt {
    /// Whether the query needs an aggregate operator.
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty()
            || self.having.is_some()
            || self.projections.iter().any(|p| p.expr.has_aggregate())
            || self.order_by.iter().any(|o| o.expr.has_aggregate())
    }

    fn collect_tables(&self, out: &mut BTreeSet<String>) {
        for item in &self.from {
            match &item.source {
                TableSource::Table(table) => {
                    out.insert(table.name());
                }
                TableSource::SubQuery { select, .. } => select.collect_tables(out),
            }
        }
    }
}

/// INSERT of one or more literal records.
#[derive(Debug, Clone)]
pub struct InsertStmt {
    pub table: Arc<Table>,
    pub records: Vec<Vec<Value>>,
}

#[derive(Debug, Clone)]
pub struct DeleteStmt {
    pub table: Arc<Table>,
    pub filter: Option<Expression>,
}

/// `SET field = value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub struct UpdateStmt {
    pub table: Arc<Table>,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct ExplainStmt {
    pub statement: Box<Statement>,
}

#[derive(Debug, Clone)]
pub struct CreateTableStmt {
    pub name: String,
    pub fields: Vec<FieldMeta>,
}

#[derive(Debug, Clone)]
pub struct RenameTableStmt {
    pub table: Arc<Table>,
    pub new_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, DataType};
    use crate::stmt::{AggregateFunc, CompOp};

    fn catalog() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .create_table("t", vec![FieldMeta::new("id", DataType::Integer)])
            .unwrap();
        catalog
            .create_table("u", vec![FieldMeta::new("id", DataType::Integer)])
            .unwrap();
        catalog
    }

    #[test]
    fn test_referenced_tables_through_sub_query_and_explain() {
        let catalog = catalog();
        let inner = SelectStmt {
            projections: vec![ProjectExpr::new(Expression::field("u", "id", DataType::Integer))],
            from: vec![FromItem::table(catalog.table("u").unwrap())],
            ..Default::default()
        };
        let outer = SelectStmt {
            projections: vec![ProjectExpr::new(Expression::field("s", "id", DataType::Integer))],
            from: vec![
                FromItem::table(catalog.table("t").unwrap()),
                FromItem::sub_query(inner, "s"),
            ],
            ..Default::default()
        };
        let explain = Statement::Explain(ExplainStmt {
            statement: Box::new(Statement::Select(outer)),
        });

        let tables: Vec<String> = explain.referenced_tables().into_iter().collect();
        assert_eq!(tables, vec!["t".to_string(), "u".to_string()]);
        assert!(Statement::Begin.referenced_tables().is_empty());
    }

    #[test]
    fn test_project_spec() {
        let field = ProjectExpr::new(Expression::field("t", "id", DataType::Integer));
        assert_eq!(field.spec(), TupleCellSpec::qualified("t", "id"));

        let aliased = field.clone().with_alias("k");
        assert_eq!(aliased.spec(), TupleCellSpec::new("k"));

        let count = ProjectExpr::new(Expression::aggregate(AggregateFunc::Count, None));
        assert_eq!(count.spec(), TupleCellSpec::new("COUNT(*)"));
    }

    #[test]
    fn test_is_aggregate() {
        let mut select = SelectStmt {
            projections: vec![ProjectExpr::new(Expression::field("t", "id", DataType::Integer))],
            ..Default::default()
        };
        assert!(!select.is_aggregate());

        select.having = Some(Expression::comparison(
            CompOp::Gt,
            Expression::aggregate(AggregateFunc::Count, None),
            Expression::value(1),
        ));
        assert!(select.is_aggregate());
    }
}
