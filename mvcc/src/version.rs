use std::sync::RwLock;

use common::Row;
use dashmap::DashMap;

/// One committed version of a row: the commit sequence it became
/// visible at, and its value (`None` for a delete).
#[derive(Debug, Clone)]
struct Version {
    commit_seq: u64,
    value: Option<Row>,
}

/// Per (table, key) history of committed values, consulted for snapshot
/// visibility once a write has gone through the transaction manager.
/// Writes never touch the backend until commit (see
/// [`crate::manager::TransactionManager::commit`]), so the backend's raw
/// current value is always correct for any snapshot reading before the
/// first MVCC-tracked write to a key; this store only needs to start
/// carrying history once that first write happens, bootstrapped with
/// the backend's pre-write value at sequence zero so older snapshots
/// keep resolving to it after the backend itself moves on.
#[derive(Default)]
pub struct VersionStore {
    versions: DashMap<(String, String), RwLock<Vec<Version>>>,
}

impl VersionStore {
    pub fn new() -> Self {
        VersionStore::default()
    }

    pub fn record(&self, table: &str, key: &str, commit_seq: u64, value: Option<Row>) {
        let entry = self.versions.entry((table.to_string(), key.to_string())).or_insert_with(|| RwLock::new(Vec::new()));
        entry.write().unwrap().push(Version { commit_seq, value });
    }

    /// Seeds the history for a key the first time it's written through
    /// MVCC, with the backend's value from just before that write. A
    /// no-op if history already exists, since that bootstrap value was
    /// already recorded by an earlier commit.
    pub fn bootstrap_if_absent(&self, table: &str, key: &str, pre_write_value: impl FnOnce() -> Option<Row>) {
        let key = (table.to_string(), key.to_string());
        if self.versions.contains_key(&key) {
            return;
        }
        self.versions.entry(key).or_insert_with(|| RwLock::new(Vec::new())).write().unwrap().push(Version { commit_seq: 0, value: pre_write_value() });
    }

    /// The value visible to a snapshot starting at `start_seq`: the
    /// newest committed version at or before that point, or `None` if
    /// no MVCC write has ever touched this key (the caller should fall
    /// back to the backend's raw current value in that case).
    pub fn visible_as_of(&self, table: &str, key: &str, start_seq: u64) -> Option<Option<Row>> {
        let entry = self.versions.get(&(table.to_string(), key.to_string()))?;
        let versions = entry.read().unwrap();
        versions.iter().rev().find(|v| v.commit_seq <= start_seq).map(|v| v.value.clone())
    }

    /// Drops version history no active transaction could still need:
    /// every entry for a key older than the newest one at or before
    /// `min_active_start_seq`, since nothing currently running can see
    /// further back than that.
    pub fn gc_before(&self, min_active_start_seq: u64) {
        for entry in self.versions.iter() {
            let mut versions = entry.write().unwrap();
            if let Some(cutoff) = versions.iter().rposition(|v| v.commit_seq <= min_active_start_seq) {
                versions.drain(..cutoff);
            }
        }
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

    fn id_of(row: &Option<Row>) -> Option<Value> {
        row.as_ref().and_then(|r| r.get("id")).cloned()
    }

    #[test]
    fn absent_key_reports_no_history() {
        let store = VersionStore::new();
        assert!(store.visible_as_of("t", "1", 100).is_none());
    }

    #[test]
    fn older_snapshot_sees_the_bootstrapped_pre_write_value() {
        let store = VersionStore::new();
        store.bootstrap_if_absent("t", "1", || Some(row(1)));
        store.record("t", "1", 5, Some(row(2)));
        assert_eq!(id_of(&store.visible_as_of("t", "1", 0).unwrap()), Some(Value::Int(1)));
        assert_eq!(id_of(&store.visible_as_of("t", "1", 5).unwrap()), Some(Value::Int(2)));
    }

    #[test]
    fn gc_drops_versions_no_active_snapshot_can_reach() {
        let store = VersionStore::new();
        store.bootstrap_if_absent("t", "1", || None);
        store.record("t", "1", 1, Some(row(1)));
        store.record("t", "1", 2, Some(row(2)));
        store.gc_before(2);
        assert_eq!(id_of(&store.visible_as_of("t", "1", 2).unwrap()), Some(Value::Int(2)));
        assert!(store.visible_as_of("t", "1", 0).is_none(), "history before the gc floor is gone");
    }
}
