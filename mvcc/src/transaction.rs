use std::collections::{HashMap, HashSet};

use common::Row;

/// Transaction identifiers wrap at a configurable threshold
/// (`GatewayConfig::mvcc_wrap_threshold`) once recycled, per the
/// Transaction data model's id-recycling rule; the manager owns
/// allocation and wrap-around, this is just the wire/storage shape.
pub type TransactionId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// What a buffered write resolves to once applied: either a full row
/// value or a tombstone recording a delete, per the Transaction data
/// model's "write set (table:key -> new row or tombstone)".
#[derive(Debug, Clone)]
pub enum WriteValue {
    Row(Row),
    Tombstone,
}

/// One in-flight (or just-finished) transaction: its isolation level,
/// the commit sequence it started at, and the read/write sets the
/// manager consults for visibility and garbage collection.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub isolation: IsolationLevel,
    pub start_seq: u64,
    pub state: TransactionState,
    pub read_set: HashSet<(String, String)>,
    pub write_set: HashMap<(String, String), WriteValue>,
}

impl Transaction {
    pub(crate) fn new(id: TransactionId, isolation: IsolationLevel, start_seq: u64) -> Self {
        Transaction { id, isolation, start_seq, state: TransactionState::Active, read_set: HashSet::new(), write_set: HashMap::new() }
    }

    pub fn record_read(&mut self, table: &str, key: &str) {
        self.read_set.insert((table.to_string(), key.to_string()));
    }

    pub fn record_write(&mut self, table: &str, key: &str, value: WriteValue) {
        self.write_set.insert((table.to_string(), key.to_string()), value);
    }

    pub fn pending_write(&self, table: &str, key: &str) -> Option<&WriteValue> {
        self.write_set.get(&(table.to_string(), key.to_string()))
    }
}
