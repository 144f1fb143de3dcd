//! qplan - a rule-based relational plan compiler and pull-based execution
//! engine.
//!
//! A resolved statement is planned into a tree of logical operators,
//! lowered into a tree of physical operators, and driven row by row inside
//! a transaction. Rows another transaction is changing surface as a
//! conflict outcome instead of an error, so writers can decide whether to
//! abort.
//!
//! # Example
//!
//! ```
//! use qplan::catalog::{Catalog, DataType, FieldMeta, Value};
//! use qplan::executor::QueryExecutor;
//! use qplan::stmt::{Expression, FromItem, InsertStmt, ProjectExpr, SelectStmt, Statement};
//! use qplan::transaction::TransactionManager;
//!
//! let catalog = Catalog::new();
//! let table = catalog
//!     .create_table("t", vec![FieldMeta::new("id", DataType::Integer)])
//!     .unwrap();
//! let mut exec = QueryExecutor::new(catalog, TransactionManager::new());
//!
//! exec.execute(&Statement::Insert(InsertStmt {
//!     table: table.clone(),
//!     records: vec![vec![Value::Integer(7)]],
//! }))
//! .unwrap();
//!
//! let select = SelectStmt {
//!     projections: vec![ProjectExpr::new(Expression::field("t", "id", DataType::Integer))],
//!     from: vec![FromItem::table(table)],
//!     ..Default::default()
//! };
//! let result = exec.execute(&Statement::Select(select)).unwrap();
//! assert_eq!(result.rows().unwrap().rows, vec![vec![Value::Integer(7)]]);
//! ```

pub mod catalog;
pub mod config;
pub mod executor;
pub mod planner;
pub mod stmt;
pub mod storage;
pub mod transaction;
pub mod tuple;
