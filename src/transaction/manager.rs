//! Transaction manager - coordinates transaction ids and states.
//!
//! The manager hands out transaction handles, assigns ids when a
//! transaction actually starts, and answers "what state is transaction X
//! in" for visibility checks.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::storage::TxId;
use crate::transaction::context::Transaction;
use crate::transaction::isolation::IsolationLevel;
use crate::transaction::snapshot::Snapshot;

/// Lifecycle state of a started transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committed,
    Aborted,
}

/// Transaction manager.
///
/// Thread-safe: can be shared across sessions via Clone (uses Arc internally).
#[derive(Clone, Default)]
pub struct TransactionManager {
    inner: Arc<TransactionManagerInner>,
}

#[derive(Default)]
struct TransactionManagerInner {
    /// Last id handed out.
    last_id: Mutex<u64>,
    /// State of every started transaction.
    states: RwLock<HashMap<TxId, TxState>>,
}

impl TransactionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transaction handle with the default isolation level.
    /// Nothing is registered until the transaction starts.
    pub fn begin(&self) -> Transaction {
        self.begin_with_isolation(IsolationLevel::default())
    }

    /// Create a transaction handle with a specific isolation level.
    pub fn begin_with_isolation(&self, isolation: IsolationLevel) -> Transaction {
        Transaction::new(self.clone(), isolation)
    }

    /// Assign the next id and register it as active.
    pub(crate) fn register(&self) -> TxId {
        let mut last = self.inner.last_id.lock();
        *last += 1;
        let id = TxId::new(*last);
        self.inner.states.write().insert(id, TxState::Active);
        id
    }

    pub(crate) fn set_state(&self, id: TxId, state: TxState) {
        self.inner.states.write().insert(id, state);
    }

    /// State of a transaction. Unknown ids are reported as committed.
    pub fn state(&self, id: TxId) -> TxState {
        self.inner
            .states
            .read()
            .get(&id)
            .copied()
            .unwrap_or(TxState::Committed)
    }

    /// Take a snapshot of the currently committed world.
    pub fn snapshot(&self) -> Snapshot {
        // Holding the id lock keeps `high` and the active set consistent.
        let last = self.inner.last_id.lock();
        let in_progress: BTreeSet<TxId> = self
            .inner
            .states
            .read()
            .iter()
            .filter(|(_, state)| **state == TxState::Active)
            .map(|(id, _)| *id)
            .collect();
        Snapshot::new(TxId::new(*last + 1), in_progress)
    }

    /// Number of active transactions.
    pub fn active_count(&self) -> usize {
        self.inner
            .states
            .read()
            .values()
            .filter(|state| **state == TxState::Active)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let manager = TransactionManager::new();
        let a = manager.register();
        let b = manager.register();
        assert!(a < b);
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn test_snapshot_excludes_active() {
        let manager = TransactionManager::new();
        let committed = manager.register();
        manager.set_state(committed, TxState::Committed);
        let active = manager.register();

        let snapshot = manager.snapshot();
        assert!(snapshot.sees(committed));
        assert!(!snapshot.sees(active));

        let later = manager.register();
        assert!(!snapshot.sees(later));
    }

    #[test]
    fn test_unknown_state_is_committed() {
        let manager = TransactionManager::new();
        assert_eq!(manager.state(TxId::new(42)), TxState::Committed);
    }
}
