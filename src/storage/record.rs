//! Row identifiers and versioned records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Value;

/// Identifies a record slot inside one table. Slots are never reused, so a
/// row id stays valid for the lifetime of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowId(pub(crate) u64);

impl RowId {
    pub fn new(slot: u64) -> Self {
        Self(slot)
    }

    pub(crate) fn slot(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rid:{}", self.0)
    }
}

/// Numeric transaction identifier stamped on record versions. Ids grow
/// monotonically, which snapshots rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxId(pub(crate) u64);

impl TxId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx:{}", self.0)
    }
}

/// One version of a row.
///
/// `xmin` is the transaction that created the version and `xmax` the one
/// that deleted (or is deleting) it. Visibility is decided by the
/// transaction layer; storage only keeps the stamps.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub rid: RowId,
    pub values: Vec<Value>,
    pub xmin: TxId,
    pub xmax: Option<TxId>,
}

impl Record {
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}
