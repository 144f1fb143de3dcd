//! Main query executor.
//!
//! Plays the part of a session: it owns the session's transaction state,
//! plans each statement, drives the physical tree and collects the rows.

use tracing::{debug, info, warn};

use super::error::{ExecuteError, ExecuteResult};
use super::operators::{Operator, PhysicalOperator, Step, StringListOperator, QUERY_PLAN};
use super::result::{QueryResult, ResultSet};
use crate::catalog::Catalog;
use crate::config::ExecutorConfig;
use crate::planner::{LogicalPlanGenerator, PhysicalPlanGenerator};
use crate::stmt::Statement;
use crate::transaction::{Transaction, TransactionError, TransactionManager};
use crate::tuple::{EmptyTuple, Tuple};

/// Column name of SHOW TABLES output.
pub const TABLES_COLUMN: &str = "Tables";

/// How the session's open transaction came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxMode {
    /// Started by BEGIN.
    Explicit,
    /// Started by a statement while auto-commit is off.
    Implicit,
}

/// The query executor.
///
/// Several executors may share one catalog and transaction manager; each
/// acts as an independent session.
pub struct QueryExecutor {
    catalog: Catalog,
    tx_manager: TransactionManager,
    config: ExecutorConfig,
    current_tx: Option<(Transaction, TxMode)>,
}

impl QueryExecutor {
    /// Create a new executor with the default configuration.
    pub fn new(catalog: Catalog, tx_manager: TransactionManager) -> Self {
        Self::with_config(catalog, tx_manager, ExecutorConfig::default())
    }

    pub fn with_config(catalog: Catalog, tx_manager: TransactionManager, config: ExecutorConfig) -> Self {
        Self {
            catalog,
            tx_manager,
            config,
            current_tx: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Whether a transaction is open in this session.
    pub fn in_transaction(&self) -> bool {
        self.current_tx.is_some()
    }

    /// Execute a resolved statement.
    pub fn execute(&mut self, stmt: &Statement) -> ExecuteResult<QueryResult> {
        debug!(kind = stmt.kind(), "executing statement");
        match stmt {
            Statement::Begin => self.execute_begin(),
            Statement::Commit => self.execute_commit(),
            Statement::Rollback => self.execute_rollback(),
            Statement::ShowTables => {
                let names = self.catalog.table_names();
                let op = PhysicalOperator::StringList(StringListOperator::new(TABLES_COLUMN, names));
                self.run(stmt, op)
            }
            _ => {
                let op = self.plan(stmt)?;
                self.run(stmt, op)
            }
        }
    }

    /// Build the physical plan of a statement without running it.
    pub fn plan(&self, stmt: &Statement) -> ExecuteResult<PhysicalOperator> {
        let planner_config = self.config.planner();
        let logical = LogicalPlanGenerator::new(planner_config.clone()).create(stmt)?;
        let physical = PhysicalPlanGenerator::new(self.catalog.clone(), planner_config).create(logical)?;
        Ok(physical)
    }

    fn execute_begin(&mut self) -> ExecuteResult<QueryResult> {
        match &mut self.current_tx {
            Some((_, TxMode::Explicit)) => {
                return Err(ExecuteError::Internal("transaction already active".into()));
            }
            // BEGIN adopts the implicit transaction and its pending work.
            Some((_, mode)) => *mode = TxMode::Explicit,
            None => {
                let trx = self.tx_manager.begin_with_isolation(self.config.isolation);
                self.current_tx = Some((trx, TxMode::Explicit));
            }
        }
        if let Some((trx, _)) = &self.current_tx {
            info!(tx = trx.label(), "transaction begun");
        }
        Ok(QueryResult::transaction("BEGIN"))
    }

    fn execute_commit(&mut self) -> ExecuteResult<QueryResult> {
        let (trx, _) = self.current_tx.take().ok_or(ExecuteError::NoTransaction)?;
        trx.commit()?;
        Ok(QueryResult::transaction("COMMIT"))
    }

    fn execute_rollback(&mut self) -> ExecuteResult<QueryResult> {
        let (trx, _) = self.current_tx.take().ok_or(ExecuteError::NoTransaction)?;
        trx.rollback()?;
        Ok(QueryResult::transaction("ROLLBACK"))
    }

    /// The transaction a statement runs in, and whether the statement
    /// owns it (commits or rolls back when done).
    fn statement_transaction(&mut self) -> (Transaction, bool) {
        if let Some((trx, _)) = &self.current_tx {
            return (trx.clone(), false);
        }
        let trx = self.tx_manager.begin_with_isolation(self.config.isolation);
        if self.config.auto_commit {
            (trx, true)
        } else {
            self.current_tx = Some((trx.clone(), TxMode::Implicit));
            (trx, false)
        }
    }

    fn run(&mut self, stmt: &Statement, mut op: PhysicalOperator) -> ExecuteResult<QueryResult> {
        let (trx, owned) = self.statement_transaction();
        let result = drive(stmt, &mut op, &trx);

        if !owned {
            return result;
        }
        match result {
            Ok(result) => {
                trx.commit()?;
                Ok(result)
            }
            Err(e) => {
                warn!(kind = stmt.kind(), tx = trx.label(), error = %e, "statement failed, rolling back");
                if let Err(rollback) = trx.rollback() {
                    warn!(tx = trx.label(), error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Open, drain and close a plan, turning its output into a result.
fn drive(stmt: &Statement, op: &mut PhysicalOperator, trx: &Transaction) -> ExecuteResult<QueryResult> {
    op.open(trx)?;
    let collected = collect(stmt, op);
    let closed = op.close();
    let result = collected?;
    closed?;
    Ok(result)
}

fn collect(stmt: &Statement, op: &mut PhysicalOperator) -> ExecuteResult<QueryResult> {
    match stmt {
        Statement::Insert(_) | Statement::Delete(_) | Statement::Update(_) => {
            Ok(QueryResult::modified(op.affected_rows().unwrap_or(0)))
        }
        Statement::CreateTable(create) => Ok(QueryResult::success(format!("Created table '{}'", create.name))),
        Statement::RenameTable(rename) => Ok(QueryResult::success(format!(
            "Renamed table to '{}'",
            rename.new_name
        ))),
        _ => {
            let mut rs = ResultSet::new(column_names(stmt));
            loop {
                match op.next(&EmptyTuple)? {
                    Step::Eof => break,
                    Step::Row => rs.push(op.current_row()?.into_values()),
                    Step::Conflict => return Err(root_conflict(stmt, op)),
                }
            }
            Ok(QueryResult::Select(rs))
        }
    }
}

/// A contested row reached the client; report it as a retryable conflict.
fn root_conflict(stmt: &Statement, op: &PhysicalOperator) -> ExecuteError {
    let tables: Vec<String> = stmt.referenced_tables().into_iter().collect();
    match op.current_row().map(|row| row.row_id()) {
        Ok(Some(rid)) => TransactionError::conflict(tables.join(","), rid).into(),
        Ok(None) => ExecuteError::Internal(format!("conflict on a derived row of {}", tables.join(","))),
        Err(e) => e,
    }
}

fn column_names(stmt: &Statement) -> Vec<String> {
    match stmt {
        Statement::Select(select) => select.projections.iter().map(|p| p.spec().to_string()).collect(),
        Statement::Calc(calc) => calc.expressions.iter().map(|e| e.to_string()).collect(),
        Statement::Explain(_) => vec![QUERY_PLAN.to_string()],
        Statement::ShowTables => vec![TABLES_COLUMN.to_string()],
        _ => Vec::new(),
    }
}
