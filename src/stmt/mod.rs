//! Resolved statement model consumed by the planner.

mod expr;
mod statement;

pub use expr::{
    AggregateExpr, AggregateFunc, ArithmeticOp, CompOp, ConjunctionKind, Expression, FieldExpr,
};
pub use statement::{
    Assignment, CalcStmt, CreateTableStmt, DeleteStmt, ExplainStmt, FromItem, InsertStmt, OrderBy,
    ProjectExpr, RenameTableStmt, SelectStmt, Statement, TableSource, UpdateStmt,
};
