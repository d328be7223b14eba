use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};

use common::Row;
use dashmap::DashMap;

use crate::error::{MvccError, MvccResult};
use crate::transaction::{IsolationLevel, Transaction, TransactionId, TransactionState, WriteValue};
use crate::version::VersionStore;

/// Owns every in-flight transaction plus the committed version history,
/// per spec.md §5's "MVCC manager serialises commit-order decisions
/// through a single mutex; reads consult snapshots without blocking
/// commits". The single-mutex design mirrors the teacher's
/// `common::schema::schema::Metadata::write_lock`: a `Mutex<()>` guards
/// only the ordering decision (which commit gets which sequence
/// number), not the reads that consult already-committed state.
pub struct TransactionManager {
    transactions: DashMap<TransactionId, RwLock<Transaction>>,
    versions: VersionStore,
    next_id: AtomicU32,
    wrap_threshold: u32,
    commit_seq: AtomicU64,
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    pub fn new(wrap_threshold: u32) -> Self {
        TransactionManager {
            transactions: DashMap::new(),
            versions: VersionStore::new(),
            next_id: AtomicU32::new(1),
            wrap_threshold: wrap_threshold.max(1),
            commit_seq: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        }
    }

    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// Allocates a fresh id, wrapping back to 1 once `wrap_threshold` is
    /// passed. Ids of transactions still tracked (not yet GC'd) are
    /// skipped so a wrapped id never collides with a live transaction.
    fn allocate_id(&self) -> TransactionId {
        loop {
            let candidate = self.next_id.fetch_add(1, Ordering::Relaxed);
            let candidate = if candidate >= self.wrap_threshold { candidate % self.wrap_threshold + 1 } else { candidate };
            if !self.transactions.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    pub fn begin(&self, isolation: IsolationLevel) -> TransactionId {
        let id = self.allocate_id();
        let start_seq = self.commit_seq.load(Ordering::SeqCst);
        self.transactions.insert(id, RwLock::new(Transaction::new(id, isolation, start_seq)));
        id
    }

    fn transaction(&self, id: TransactionId) -> MvccResult<dashmap::mapref::one::Ref<'_, TransactionId, RwLock<Transaction>>> {
        self.transactions.get(&id).ok_or(MvccError::UnknownTransaction(id))
    }

    pub fn isolation(&self, id: TransactionId) -> MvccResult<IsolationLevel> {
        Ok(self.transaction(id)?.read().unwrap().isolation)
    }

    pub fn record_read(&self, id: TransactionId, table: &str, key: &str) -> MvccResult<()> {
        self.transaction(id)?.write().unwrap().record_read(table, key);
        Ok(())
    }

    pub fn record_write(&self, id: TransactionId, table: &str, key: &str, value: WriteValue) -> MvccResult<()> {
        self.transaction(id)?.write().unwrap().record_write(table, key, value);
        Ok(())
    }

    /// The write this transaction itself made to `(table, key)`, if any
    /// — consulted before falling back to committed version history, so
    /// a transaction always sees its own uncommitted writes.
    pub fn pending_write(&self, id: TransactionId, table: &str, key: &str) -> MvccResult<Option<WriteValue>> {
        Ok(self.transaction(id)?.read().unwrap().pending_write(table, key).cloned())
    }

    /// The committed value visible to this transaction's snapshot, not
    /// counting its own pending writes: `Some(value)` if version history
    /// exists for the key, `None` if no MVCC write has ever touched it
    /// (the caller should fall back to the backend's raw current value).
    pub fn visible_committed(&self, id: TransactionId, table: &str, key: &str) -> MvccResult<Option<Option<Row>>> {
        let txn = self.transaction(id)?;
        let txn = txn.read().unwrap();
        let as_of = match txn.isolation {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => self.commit_seq.load(Ordering::SeqCst),
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable => txn.start_seq,
        };
        Ok(self.versions.visible_as_of(table, key, as_of))
    }

    /// Commits the transaction's buffered writes, returning them in
    /// insertion-arbitrary order for the caller to apply to the backend.
    /// Each write is recorded into the version store under a single
    /// freshly allocated commit sequence, so every write in the
    /// transaction becomes visible atomically to later snapshots.
    pub fn commit(&self, id: TransactionId) -> MvccResult<Vec<((String, String), WriteValue)>> {
        let txn = self.transaction(id)?;
        let mut txn = txn.write().unwrap();
        if txn.state != TransactionState::Active {
            return Err(MvccError::InvalidState(format!("transaction {id} is not active")));
        }
        let _guard = self.commit_lock.lock().unwrap();
        let seq = self.commit_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let writes: Vec<((String, String), WriteValue)> = txn.write_set.drain().collect();
        for ((table, key), value) in &writes {
            let recorded = match value {
                WriteValue::Row(row) => Some(row.clone()),
                WriteValue::Tombstone => None,
            };
            self.versions.record(table, key, seq, recorded);
        }
        txn.state = TransactionState::Committed;
        drop(txn);
        self.transactions.remove(&id);
        Ok(writes)
    }

    pub fn abort(&self, id: TransactionId) -> MvccResult<()> {
        let txn = self.transaction(id)?;
        txn.write().unwrap().state = TransactionState::Aborted;
        drop(txn);
        self.transactions.remove(&id);
        Ok(())
    }

    /// Prunes version history nothing currently active can still see.
    /// Safe to call periodically from a background task; transactions
    /// that finish between the snapshot of active ids and the gc pass
    /// simply mean the bound is more conservative than strictly needed.
    pub fn gc(&self) {
        let floor = self
            .transactions
            .iter()
            .map(|entry| entry.value().read().unwrap().start_seq)
            .min()
            .unwrap_or_else(|| self.commit_seq.load(Ordering::SeqCst));
        self.versions.gc_before(floor);
    }
}

#[cfg(test)]
mod tests {
    use common::{RowBuilder, Value};

    use super::*;

    fn row(v: i64) -> Row {
        let mut b = RowBuilder::new();
        b.push("id", Value::Int(v));
        b.build()
    }

    #[test]
    fn repeatable_read_does_not_see_a_commit_made_after_it_started() {
        let mgr = TransactionManager::new(1000);
        let reader = mgr.begin(IsolationLevel::RepeatableRead);

        let writer = mgr.begin(IsolationLevel::RepeatableRead);
        mgr.record_write(writer, "t", "1", WriteValue::Row(row(1))).unwrap();
        mgr.commit(writer).unwrap();

        assert!(mgr.visible_committed(reader, "t", "1").unwrap().is_none(), "no history existed before the writer's commit");
    }

    #[test]
    fn a_new_transaction_sees_a_prior_commit() {
        let mgr = TransactionManager::new(1000);
        let writer = mgr.begin(IsolationLevel::RepeatableRead);
        mgr.record_write(writer, "t", "1", WriteValue::Row(row(7))).unwrap();
        mgr.commit(writer).unwrap();

        let reader = mgr.begin(IsolationLevel::RepeatableRead);
        let visible = mgr.visible_committed(reader, "t", "1").unwrap().flatten();
        assert_eq!(visible.and_then(|r| r.get("id").cloned()), Some(Value::Int(7)));
    }

    #[test]
    fn read_committed_sees_a_commit_that_happened_after_it_started() {
        let mgr = TransactionManager::new(1000);
        let reader = mgr.begin(IsolationLevel::ReadCommitted);

        let writer = mgr.begin(IsolationLevel::ReadCommitted);
        mgr.record_write(writer, "t", "1", WriteValue::Row(row(3))).unwrap();
        mgr.commit(writer).unwrap();

        let visible = mgr.visible_committed(reader, "t", "1").unwrap().flatten();
        assert_eq!(visible.and_then(|r| r.get("id").cloned()), Some(Value::Int(3)));
    }

    #[test]
    fn ids_are_recycled_once_freed() {
        let mgr = TransactionManager::new(2);
        let a = mgr.begin(IsolationLevel::ReadCommitted);
        mgr.abort(a).unwrap();
        let b = mgr.begin(IsolationLevel::ReadCommitted);
        let c = mgr.begin(IsolationLevel::ReadCommitted);
        assert_ne!(b, c);
    }

    #[test]
    fn committing_twice_is_rejected() {
        let mgr = TransactionManager::new(1000);
        let id = mgr.begin(IsolationLevel::ReadCommitted);
        mgr.commit(id).unwrap();
        assert!(mgr.commit(id).is_err());
    }
}
