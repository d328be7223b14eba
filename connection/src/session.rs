use std::collections::{HashMap, VecDeque};

use common::Row;

use crate::declar::{CapabilityFlags, StatusFlags};
use crate::engine::{ColumnDescriptor, PreparedDescriptor};

/// Rows materialized by a cursor-flagged STMT_EXECUTE, paged out by
/// subsequent STMT_FETCH commands.
#[derive(Debug)]
pub struct OpenCursor {
    pub columns: Vec<ColumnDescriptor>,
    pub remaining: VecDeque<Row>,
}

/// Per-connection state: everything the dispatch loop needs to answer a
/// command without reaching into the query engine for bookkeeping.
#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub capabilities: CapabilityFlags,
    pub current_database: Option<String>,
    pub status: StatusFlags,
    pub sequence_id: u8,
    next_statement_id: u32,
    prepared: HashMap<u32, PreparedDescriptor>,
    long_data: HashMap<(u32, u16), Vec<u8>>,
    cursors: HashMap<u32, OpenCursor>,
}

impl Session {
    pub fn new(id: u32) -> Self {
        Session {
            id,
            capabilities: CapabilityFlags::default_server(),
            current_database: None,
            status: StatusFlags::SERVER_STATUS_AUTOCOMMIT,
            sequence_id: 0,
            next_statement_id: 1,
            prepared: HashMap::new(),
            long_data: HashMap::new(),
            cursors: HashMap::new(),
        }
    }

    pub fn append_long_data(&mut self, statement_id: u32, param_index: u16, chunk: &[u8]) {
        self.long_data.entry((statement_id, param_index)).or_default().extend_from_slice(chunk);
    }

    pub fn take_long_data(&mut self, statement_id: u32, param_index: u16) -> Option<Vec<u8>> {
        self.long_data.remove(&(statement_id, param_index))
    }

    pub fn clear_long_data(&mut self, statement_id: u32) {
        self.long_data.retain(|(id, _), _| *id != statement_id);
    }

    pub fn open_cursor(&mut self, statement_id: u32, cursor: OpenCursor) {
        self.cursors.insert(statement_id, cursor);
    }

    pub fn cursor_mut(&mut self, statement_id: u32) -> Option<&mut OpenCursor> {
        self.cursors.get_mut(&statement_id)
    }

    pub fn close_cursor(&mut self, statement_id: u32) {
        self.cursors.remove(&statement_id);
    }

    pub fn is_in_transaction(&self) -> bool {
        self.status.contains(StatusFlags::SERVER_STATUS_IN_TRANS)
    }

    pub fn begin_transaction(&mut self) {
        self.status.insert(StatusFlags::SERVER_STATUS_IN_TRANS);
    }

    pub fn end_transaction(&mut self) {
        self.status.remove(StatusFlags::SERVER_STATUS_IN_TRANS);
    }

    pub fn reserve_statement_id(&mut self) -> u32 {
        let id = self.next_statement_id;
        self.next_statement_id += 1;
        id
    }

    pub fn register_prepared(&mut self, descriptor: PreparedDescriptor) {
        self.prepared.insert(descriptor.statement_id, descriptor);
    }

    pub fn prepared(&self, statement_id: u32) -> Option<&PreparedDescriptor> {
        self.prepared.get(&statement_id)
    }

    pub fn forget_prepared(&mut self, statement_id: u32) {
        self.prepared.remove(&statement_id);
        self.clear_long_data(statement_id);
        self.close_cursor(statement_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_autocommit_without_a_transaction() {
        let session = Session::new(1);
        assert!(!session.is_in_transaction());
        assert!(session.status.contains(StatusFlags::SERVER_STATUS_AUTOCOMMIT));
    }

    #[test]
    fn statement_ids_increase_monotonically() {
        let mut session = Session::new(1);
        assert_eq!(session.reserve_statement_id(), 1);
        assert_eq!(session.reserve_statement_id(), 2);
    }
}
