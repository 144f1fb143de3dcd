//! Transaction isolation levels.
//!
//! Two levels are supported:
//! - ReadCommitted: each statement reads from a fresh snapshot
//! - RepeatableRead: every statement reads from the snapshot taken at start

use std::fmt;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read Committed isolation.
    ///
    /// Read-only scans see everything committed before the statement opened
    /// its plan. Two statements in one transaction may see different data.
    #[default]
    ReadCommitted,

    /// Repeatable Read isolation (Snapshot Isolation).
    ///
    /// Read-only scans see the database as of the transaction's start, plus
    /// the transaction's own writes.
    RepeatableRead,
}

impl IsolationLevel {
    /// Check if this isolation level pins one snapshot for the whole transaction.
    pub fn uses_snapshot(&self) -> bool {
        matches!(self, IsolationLevel::RepeatableRead)
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationLevel::ReadCommitted => write!(f, "READ COMMITTED"),
            IsolationLevel::RepeatableRead => write!(f, "REPEATABLE READ"),
        }
    }
}

/// Parse isolation level from string (SQL syntax).
impl std::str::FromStr for IsolationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "READ COMMITTED" | "READ_COMMITTED" | "READCOMMITTED" => {
                Ok(IsolationLevel::ReadCommitted)
            }
            "REPEATABLE READ" | "REPEATABLE_READ" | "REPEATABLEREAD" | "SNAPSHOT" => {
                Ok(IsolationLevel::RepeatableRead)
            }
            _ => Err(format!("unknown isolation level: {}", s)),
        }
    }
}
