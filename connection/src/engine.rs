use common::err::CResult;
use common::value::{ColumnType, Value};
use common::Row;

use crate::session::Session;

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDescriptor { name: name.into(), column_type }
    }
}

/// What running a statement produced: either a result set or a
/// plain acknowledgement of rows changed.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Rows { columns: Vec<ColumnDescriptor>, rows: Vec<Row> },
    Affected { rows_affected: u64, last_insert_id: u64, warnings: u16 },
}

/// The seam between the wire-protocol layer and the query core: a
/// session hands every statement it receives to one of these methods
/// and turns the result into wire packets. Implemented by the gateway
/// binary atop the planner, executor, datasource and mvcc crates, so
/// that this crate itself only knows about bytes and packets.
pub trait QueryEngine: Send + Sync {
    fn execute_query(&self, session: &mut Session, sql: &str) -> CResult<Vec<QueryOutcome>>;

    fn prepare(&self, session: &mut Session, sql: &str) -> CResult<PreparedDescriptor>;

    fn execute_prepared(&self, session: &mut Session, stmt_id: u32, params: &[Value]) -> CResult<QueryOutcome>;

    fn close_prepared(&self, session: &mut Session, stmt_id: u32);

    fn use_database(&self, session: &mut Session, name: &str) -> CResult<()>;
}

#[derive(Debug, Clone)]
pub struct PreparedDescriptor {
    pub statement_id: u32,
    pub param_count: u16,
    pub column_count: u16,
    pub columns: Vec<ColumnDescriptor>,
}
