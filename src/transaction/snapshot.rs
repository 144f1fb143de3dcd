//! Read snapshots.

use std::collections::BTreeSet;

use crate::storage::TxId;

/// The set of transactions whose effects a read-only scan may observe.
///
/// A transaction is visible when it was assigned before the snapshot
/// (`id < high`) and was not still in progress at that moment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    high: TxId,
    in_progress: BTreeSet<TxId>,
}

impl Snapshot {
    pub(crate) fn new(high: TxId, in_progress: BTreeSet<TxId>) -> Self {
        Self { high, in_progress }
    }

    /// Check whether the effects of `tx` are visible in this snapshot.
    pub fn sees(&self, tx: TxId) -> bool {
        tx < self.high && !self.in_progress.contains(&tx)
    }
}
