//! Transaction handle and record visibility.
//!
//! A `Transaction` is a cheap, cloneable handle. Physical operators keep a
//! clone for the duration of one execution; all clones observe the same
//! state, so committing through any of them finishes the transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info};
use ulid::Ulid;

use crate::catalog::Value;
use crate::storage::{Record, RowId, Table, TxId};
use crate::transaction::error::{TransactionError, TransactionResult};
use crate::transaction::isolation::IsolationLevel;
use crate::transaction::manager::{TransactionManager, TxState};
use crate::transaction::snapshot::Snapshot;

/// What a transaction may do with a record version it came across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// The version is part of this transaction's view.
    Visible,
    /// The version does not exist for this transaction.
    Invisible,
    /// The version exists but a concurrent writer holds or changed it.
    Conflict,
}

/// A database transaction.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

struct TransactionInner {
    manager: TransactionManager,
    /// Human-readable unique label, used in logs and errors.
    label: String,
    isolation: IsolationLevel,
    created_at: DateTime<Utc>,
    context: Mutex<TxContext>,
}

#[derive(Default)]
struct TxContext {
    id: Option<TxId>,
    start_snapshot: Option<Snapshot>,
    finished: Option<TxState>,
    writes: usize,
}

impl Transaction {
    pub(crate) fn new(manager: TransactionManager, isolation: IsolationLevel) -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                manager,
                label: Ulid::new().to_string().to_lowercase(),
                isolation,
                created_at: Utc::now(),
                context: Mutex::new(TxContext::default()),
            }),
        }
    }

    /// Get the transaction label.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Get the numeric id, if the transaction has started.
    pub fn id(&self) -> Option<TxId> {
        self.inner.context.lock().id
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.inner.isolation
    }

    /// Whether the transaction can still perform operations.
    pub fn is_active(&self) -> bool {
        self.inner.context.lock().finished.is_none()
    }

    /// Number of row versions written so far.
    pub fn write_count(&self) -> usize {
        self.inner.context.lock().writes
    }

    /// Whether two handles refer to the same transaction.
    pub fn same_as(&self, other: &Transaction) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Start the transaction unless it already has been, returning its id.
    pub fn start_if_needed(&self) -> TransactionResult<TxId> {
        let mut ctx = self.inner.context.lock();
        if let Some(state) = ctx.finished {
            return Err(self.not_active(state));
        }
        if let Some(id) = ctx.id {
            return Ok(id);
        }

        let id = self.inner.manager.register();
        ctx.id = Some(id);
        ctx.start_snapshot = Some(self.inner.manager.snapshot());
        debug!(tx = %self.inner.label, id = %id, isolation = %self.inner.isolation, "transaction started");
        Ok(id)
    }

    /// Snapshot a read-only scan should use right now.
    pub fn read_snapshot(&self) -> TransactionResult<Snapshot> {
        self.start_if_needed()?;
        if self.inner.isolation.uses_snapshot() {
            if let Some(snapshot) = &self.inner.context.lock().start_snapshot {
                return Ok(snapshot.clone());
            }
        }
        Ok(self.inner.manager.snapshot())
    }

    /// Decide how this transaction sees a record version.
    ///
    /// Read-only access resolves everything against `snapshot` and never
    /// conflicts. Write access sees the latest committed state and reports
    /// versions that a concurrent writer is creating or deleting (or deleted
    /// after our snapshot) as `Conflict`.
    pub fn visibility(
        &self,
        record: &Record,
        snapshot: &Snapshot,
        readonly: bool,
    ) -> TransactionResult<Visibility> {
        let me = self.start_if_needed()?;
        let manager = &self.inner.manager;

        if record.xmin != me {
            match manager.state(record.xmin) {
                TxState::Aborted => return Ok(Visibility::Invisible),
                TxState::Active if readonly => return Ok(Visibility::Invisible),
                TxState::Active => return Ok(Visibility::Conflict),
                TxState::Committed if readonly && !snapshot.sees(record.xmin) => {
                    return Ok(Visibility::Invisible)
                }
                TxState::Committed => {}
            }
        }

        let xmax = match record.xmax {
            None => return Ok(Visibility::Visible),
            Some(xmax) if xmax == me => return Ok(Visibility::Invisible),
            Some(xmax) => xmax,
        };

        let visibility = match (manager.state(xmax), readonly) {
            (TxState::Aborted, _) => Visibility::Visible,
            (TxState::Active, true) => Visibility::Visible,
            (TxState::Active, false) => Visibility::Conflict,
            (TxState::Committed, true) if snapshot.sees(xmax) => Visibility::Invisible,
            (TxState::Committed, true) => Visibility::Visible,
            (TxState::Committed, false) if snapshot.sees(xmax) => Visibility::Invisible,
            (TxState::Committed, false) => Visibility::Conflict,
        };
        Ok(visibility)
    }

    // ==================== Row Operations ====================

    /// Insert a new record version.
    pub fn insert_record(&self, table: &Table, values: Vec<Value>) -> TransactionResult<RowId> {
        let me = self.start_if_needed()?;
        let rid = table.insert(values, me)?;
        self.inner.context.lock().writes += 1;
        Ok(rid)
    }

    /// Delete a record by stamping it with this transaction's id.
    pub fn delete_record(&self, table: &Table, rid: RowId) -> TransactionResult<()> {
        let me = self.start_if_needed()?;
        let manager = &self.inner.manager;

        let stamped = table.with_record_mut(rid, |record| {
            if record.xmin != me && manager.state(record.xmin) == TxState::Active {
                return false;
            }
            match record.xmax {
                Some(xmax) if xmax == me => true,
                Some(xmax) if manager.state(xmax) != TxState::Aborted => false,
                _ => {
                    record.xmax = Some(me);
                    true
                }
            }
        })?;

        if !stamped {
            return Err(TransactionError::conflict(table.name(), rid));
        }
        self.inner.context.lock().writes += 1;
        Ok(())
    }

    /// Replace a record with a new version, returning the new row id.
    pub fn update_record(
        &self,
        table: &Table,
        rid: RowId,
        values: Vec<Value>,
    ) -> TransactionResult<RowId> {
        table
            .meta()
            .validate_record(&values)
            .map_err(crate::storage::StorageError::from)?;
        self.delete_record(table, rid)?;
        self.insert_record(table, values)
    }

    // ==================== Transaction Control ====================

    /// Commit the transaction. Committing a transaction that never started
    /// is a no-op.
    pub fn commit(&self) -> TransactionResult<()> {
        self.finish(TxState::Committed)
    }

    /// Roll back the transaction, discarding its writes.
    pub fn rollback(&self) -> TransactionResult<()> {
        self.finish(TxState::Aborted)
    }

    fn finish(&self, state: TxState) -> TransactionResult<()> {
        let mut ctx = self.inner.context.lock();
        if let Some(previous) = ctx.finished {
            return Err(self.not_active(previous));
        }
        ctx.finished = Some(state);

        if let Some(id) = ctx.id {
            self.inner.manager.set_state(id, state);
            let elapsed = Utc::now() - self.inner.created_at;
            info!(
                tx = %self.inner.label,
                id = %id,
                state = ?state,
                writes = ctx.writes,
                elapsed_ms = elapsed.num_milliseconds(),
                "transaction finished"
            );
        }
        Ok(())
    }

    fn not_active(&self, state: TxState) -> TransactionError {
        TransactionError::NotActive {
            tx_id: self.inner.label.clone(),
            state: format!("{:?}", state).to_lowercase(),
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("label", &self.inner.label)
            .field("id", &self.id())
            .field("isolation", &self.inner.isolation)
            .finish()
    }
}
