pub mod csv_backend;
pub mod error;
pub mod index;
pub mod json_backend;
pub mod memory;
pub mod parquet_backend;
pub mod relational;

pub use error::{DataSourceError, DsResult};

use common::schema::TableRef;
use common::Row;

/// The logical operator joining sibling [`Filter`]s at one nesting
/// level within a [`Filter`] tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

/// A comparison a [`Filter`] leaf applies between a column and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    In,
}

/// One node of a filter tree: either a leaf comparison, or a logical
/// combination of nested sub-filters evaluated strictly left-to-right
/// within the level (no operator-precedence reordering).
#[derive(Debug, Clone)]
pub enum Filter {
    Compare { column: String, op: FilterOp, value: common::Value },
    In { column: String, values: Vec<common::Value> },
    Group { op: LogicalOp, filters: Vec<Filter> },
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: common::Value) -> Self {
        Filter::Compare { column: column.into(), op: FilterOp::Eq, value }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Compare { column, op, value } => {
                let Some(actual) = row.get(column) else { return false };
                match op {
                    FilterOp::Eq => actual.sql_eq(value).unwrap_or(false),
                    FilterOp::NotEq => !actual.sql_eq(value).unwrap_or(true),
                    FilterOp::Lt => actual.sql_cmp(value).is_some_and(|o| o.is_lt()),
                    FilterOp::LtEq => actual.sql_cmp(value).is_some_and(|o| o.is_le()),
                    FilterOp::Gt => actual.sql_cmp(value).is_some_and(|o| o.is_gt()),
                    FilterOp::GtEq => actual.sql_cmp(value).is_some_and(|o| o.is_ge()),
                    FilterOp::Like => actual.like(&value.as_str_lossy()),
                    FilterOp::In => false,
                }
            }
            Filter::In { column, values } => {
                let Some(actual) = row.get(column) else { return false };
                values.iter().any(|v| actual.sql_eq(v).unwrap_or(false))
            }
            Filter::Group { op, filters } => {
                let mut iter = filters.iter();
                let Some(first) = iter.next() else { return true };
                let mut acc = first.matches(row);
                for filter in iter {
                    acc = match op {
                        LogicalOp::And => acc && filter.matches(row),
                        LogicalOp::Or => acc || filter.matches(row),
                    };
                }
                acc
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// The recognised set of query options a backend's `query` accepts:
/// filters, an optional single-column ordering, a limit/offset pair,
/// and a `select_all` escape hatch for `SELECT *`.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub order_by: Option<String>,
    pub order: Option<SortOrder>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub select_all: bool,
    pub columns: Option<Vec<String>>,
}

impl QueryOptions {
    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// What callers learn about a table without materialising it.
#[derive(Debug, Clone)]
pub struct TableInfo {
    pub name: String,
    pub schema: TableRef,
    pub row_count_hint: Option<u64>,
}

/// The uniform surface every backend (in-memory, file, relational)
/// implements: connection lifecycle, table discovery, query/mutate,
/// and DDL. Blocking by design — each call runs to completion on
/// whatever thread invokes it; the executor is responsible for
/// offloading to `spawn_blocking` where a backend may block on I/O.
pub trait DataSource: Send + Sync {
    fn connect(&self) -> DsResult<()>;
    fn close(&self) -> DsResult<()>;
    fn is_connected(&self) -> bool;
    fn is_writable(&self) -> bool;

    fn list_tables(&self) -> DsResult<Vec<String>>;
    fn table_info(&self, table: &str) -> DsResult<TableInfo>;

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>>;

    fn insert(&self, table: &str, row: Row) -> DsResult<Row>;
    fn update(&self, table: &str, options: &QueryOptions, changes: &[(String, common::Value)]) -> DsResult<u64>;
    fn delete(&self, table: &str, options: &QueryOptions) -> DsResult<u64>;

    fn create_table(&self, table: common::schema::Table) -> DsResult<()>;
    fn drop_table(&self, table: &str) -> DsResult<()>;
    fn truncate_table(&self, table: &str) -> DsResult<()>;

    /// Executes a raw backend-native statement where that's meaningful
    /// (the relational backend); other backends reject it.
    fn execute(&self, statement: &str) -> DsResult<u64>;
}

/// Applies ordering, offset and limit to an already-filtered row set;
/// shared by every backend so the semantics (stable sort, offset then
/// limit) stay identical regardless of where the rows came from.
pub fn apply_order_and_paging(mut rows: Vec<Row>, options: &QueryOptions) -> Vec<Row> {
    if let Some(column) = &options.order_by {
        let desc = matches!(options.order, Some(SortOrder::Desc));
        rows.sort_by(|a, b| {
            let ordering = match (a.get(column), b.get(column)) {
                (Some(x), Some(y)) => x.compare(y),
                (None, None) => std::cmp::Ordering::Equal,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (Some(_), None) => std::cmp::Ordering::Greater,
            };
            if desc {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }
    let offset = options.offset.unwrap_or(0);
    let rows: Vec<Row> = rows.into_iter().skip(offset).collect();
    match options.limit {
        Some(limit) => rows.into_iter().take(limit).collect(),
        None => rows,
    }
}
