//! Query execution engine.
//!
//! Uses the Volcano/Iterator model where each operator produces
//! rows one at a time.

mod error;
mod eval;
mod executor;
pub mod operators;
mod result;

pub use error::{ExecuteError, ExecuteResult};
pub use eval::{evaluate, evaluate_predicate};
pub use executor::{QueryExecutor, TABLES_COLUMN};
pub use result::{QueryResult, ResultSet};
