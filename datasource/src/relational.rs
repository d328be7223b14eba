use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Mutex, RwLock};

use common::schema::{Table, TableRef};
use common::{Row, Value};

use crate::{DataSource, DataSourceError, DsResult, FilterOp, LogicalOp, QueryOptions, SortOrder, TableInfo};

/// What a relational backend needs from its upstream connection: run a
/// statement and get rows back, or run one for its affected-row count.
/// Kept as a trait so the backend's SQL-building logic is testable
/// without a live MySQL server; the embedding server supplies a real
/// transport backed by a pooled upstream connection.
pub trait Transport: Send + Sync {
    fn query(&self, sql: &str) -> DsResult<Vec<Row>>;
    fn execute(&self, sql: &str) -> DsResult<u64>;
}

/// Caps total concurrency against the upstream per the concurrency
/// model's "connection pools... cap total concurrency; queued waiters
/// fail fast on pool timeout". Transports are checked out, used, and
/// returned; an empty pool fails the caller immediately rather than
/// blocking.
pub struct TransportPool {
    idle: Mutex<VecDeque<Box<dyn Transport>>>,
    capacity: usize,
}

impl TransportPool {
    pub fn new(transports: Vec<Box<dyn Transport>>) -> Self {
        let capacity = transports.len();
        TransportPool { idle: Mutex::new(transports.into()), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn checkout(&self) -> DsResult<Box<dyn Transport>> {
        self.idle.lock().unwrap().pop_front().ok_or(DataSourceError::Backend("connection pool exhausted".into()))
    }

    fn checkin(&self, transport: Box<dyn Transport>) {
        self.idle.lock().unwrap().push_back(transport);
    }

    fn with<T>(&self, f: impl FnOnce(&dyn Transport) -> DsResult<T>) -> DsResult<T> {
        let transport = self.checkout()?;
        let result = f(transport.as_ref());
        self.checkin(transport);
        result
    }
}

/// Translates `QueryOptions` to native SQL text and passes `Execute`
/// through as-is; transaction semantics are delegated to the native
/// engine rather than re-implemented here, per the data-source
/// contract's relational-backend section.
pub struct RelationalDataSource {
    pool: TransportPool,
    tables: RwLock<std::collections::HashMap<String, TableRef>>,
    connected: AtomicBool,
    writable: bool,
}

impl RelationalDataSource {
    pub fn new(pool: TransportPool, tables: Vec<TableRef>, writable: bool) -> Self {
        let tables = tables.into_iter().map(|t| (t.name.clone(), t)).collect();
        RelationalDataSource { pool, tables: RwLock::new(tables), connected: AtomicBool::new(false), writable }
    }

    fn schema(&self, table: &str) -> DsResult<TableRef> {
        self.tables.read().unwrap().get(table).cloned().ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))
    }
}

/// Renders a SQL literal for a `Value`, single-quoting and escaping
/// strings (doubling embedded quotes, MySQL's own escaping convention
/// for a literal without `NO_BACKSLASH_ESCAPES`).
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Bool(b) => if *b { "1".into() } else { "0".into() },
        Value::DateTime(ms) => format!("FROM_UNIXTIME({})", *ms as f64 / 1000.0),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Blob(b) => format!("X'{}'", b.iter().map(|byte| format!("{byte:02x}")).collect::<String>()),
    }
}

fn render_filter(filter: &crate::Filter, sql: &mut String) {
    match filter {
        crate::Filter::Compare { column, op, value } => {
            let op_sql = match op {
                FilterOp::Eq => "=",
                FilterOp::NotEq => "<>",
                FilterOp::Lt => "<",
                FilterOp::LtEq => "<=",
                FilterOp::Gt => ">",
                FilterOp::GtEq => ">=",
                FilterOp::Like => "LIKE",
                FilterOp::In => "=",
            };
            sql.push_str(&format!("`{column}` {op_sql} {}", quote_literal(value)));
        }
        crate::Filter::In { column, values } => {
            let list = values.iter().map(quote_literal).collect::<Vec<_>>().join(", ");
            sql.push_str(&format!("`{column}` IN ({list})"));
        }
        crate::Filter::Group { op, filters } => {
            let joiner = match op {
                LogicalOp::And => " AND ",
                LogicalOp::Or => " OR ",
            };
            sql.push('(');
            for (i, f) in filters.iter().enumerate() {
                if i > 0 {
                    sql.push_str(joiner);
                }
                render_filter(f, sql);
            }
            sql.push(')');
        }
    }
}

/// Builds a `SELECT` statement implementing `QueryOptions` the way the
/// in-memory backend's `query` implements it natively.
pub fn build_select(table: &str, options: &QueryOptions) -> String {
    let columns = match &options.columns {
        Some(cols) if !cols.is_empty() => cols.iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", "),
        _ => "*".to_string(),
    };
    let mut sql = format!("SELECT {columns} FROM `{table}`");
    if !options.filters.is_empty() {
        sql.push_str(" WHERE ");
        for (i, filter) in options.filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            render_filter(filter, &mut sql);
        }
    }
    if let Some(column) = &options.order_by {
        let direction = if matches!(options.order, Some(SortOrder::Desc)) { "DESC" } else { "ASC" };
        sql.push_str(&format!(" ORDER BY `{column}` {direction}"));
    }
    if let Some(limit) = options.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
        if let Some(offset) = options.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
    sql
}

fn build_insert(table: &str, row: &Row) -> String {
    let columns = row.columns().iter().map(|c| format!("`{c}`")).collect::<Vec<_>>().join(", ");
    let values = row.values().iter().map(quote_literal).collect::<Vec<_>>().join(", ");
    format!("INSERT INTO `{table}` ({columns}) VALUES ({values})")
}

fn build_update(table: &str, options: &QueryOptions, changes: &[(String, Value)]) -> String {
    let assignments = changes.iter().map(|(c, v)| format!("`{c}` = {}", quote_literal(v))).collect::<Vec<_>>().join(", ");
    let mut sql = format!("UPDATE `{table}` SET {assignments}");
    if !options.filters.is_empty() {
        sql.push_str(" WHERE ");
        for (i, filter) in options.filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            render_filter(filter, &mut sql);
        }
    }
    sql
}

fn build_delete(table: &str, options: &QueryOptions) -> String {
    let mut sql = format!("DELETE FROM `{table}`");
    if !options.filters.is_empty() {
        sql.push_str(" WHERE ");
        for (i, filter) in options.filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            render_filter(filter, &mut sql);
        }
    }
    sql
}

impl DataSource for RelationalDataSource {
    fn connect(&self) -> DsResult<()> {
        self.connected.store(true, AtomicOrdering::SeqCst);
        Ok(())
    }

    fn close(&self) -> DsResult<()> {
        self.connected.store(false, AtomicOrdering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(AtomicOrdering::SeqCst)
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn list_tables(&self) -> DsResult<Vec<String>> {
        Ok(self.tables.read().unwrap().keys().cloned().collect())
    }

    fn table_info(&self, table: &str) -> DsResult<TableInfo> {
        Ok(TableInfo { name: table.to_string(), schema: self.schema(table)?, row_count_hint: None })
    }

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>> {
        self.schema(table)?;
        let sql = build_select(table, options);
        self.pool.with(|t| t.query(&sql))
    }

    fn insert(&self, table: &str, row: Row) -> DsResult<Row> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.schema(table)?;
        let sql = build_insert(table, &row);
        self.pool.with(|t| t.execute(&sql))?;
        Ok(row)
    }

    fn update(&self, table: &str, options: &QueryOptions, changes: &[(String, Value)]) -> DsResult<u64> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.schema(table)?;
        let sql = build_update(table, options, changes);
        self.pool.with(|t| t.execute(&sql))
    }

    fn delete(&self, table: &str, options: &QueryOptions) -> DsResult<u64> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.schema(table)?;
        let sql = build_delete(table, options);
        self.pool.with(|t| t.execute(&sql))
    }

    fn create_table(&self, table: Table) -> DsResult<()> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.tables.write().unwrap().insert(table.name.clone(), std::sync::Arc::new(table));
        Ok(())
    }

    fn drop_table(&self, table: &str) -> DsResult<()> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.tables.write().unwrap().remove(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;
        Ok(())
    }

    fn truncate_table(&self, table: &str) -> DsResult<()> {
        self.execute(&format!("TRUNCATE TABLE `{table}`")).map(|_| ())
    }

    fn execute(&self, statement: &str) -> DsResult<u64> {
        if !self.writable {
            return Err(DataSourceError::ReadOnly);
        }
        self.pool.with(|t| t.execute(statement))
    }
}

/// Converts a wire-level `mysql_common` value into the core's own
/// dynamically-typed [`Value`], the boundary point where the relational
/// backend's native results enter the rest of the system.
pub fn from_mysql_value(value: mysql_common::Value) -> Value {
    match value {
        mysql_common::Value::NULL => Value::Null,
        mysql_common::Value::Bytes(b) => String::from_utf8(b.clone()).map(Value::String).unwrap_or(Value::Blob(b)),
        mysql_common::Value::Int(i) => Value::Int(i),
        mysql_common::Value::UInt(u) => Value::Int(u as i64),
        mysql_common::Value::Float(f) => Value::Double(f as f64),
        mysql_common::Value::Double(d) => Value::Double(d),
        mysql_common::Value::Date(y, mo, d, h, mi, s, micro) => {
            let _ = (y, mo, d, h, mi, s, micro);
            Value::String(format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02}"))
        }
        mysql_common::Value::Time(neg, days, h, mi, s, micro) => {
            let _ = micro;
            let sign = if neg { "-" } else { "" };
            Value::String(format!("{sign}{}:{mi:02}:{s:02}", days as u64 * 24 + h as u64))
        }
    }
}

/// The inverse of [`from_mysql_value`], used when building parameters
/// for a prepared upstream statement rather than a textual literal.
pub fn to_mysql_value(value: &Value) -> mysql_common::Value {
    match value {
        Value::Null => mysql_common::Value::NULL,
        Value::Int(i) => mysql_common::Value::Int(*i),
        Value::Double(d) => mysql_common::Value::Double(*d),
        Value::Bool(b) => mysql_common::Value::Int(*b as i64),
        Value::DateTime(ms) => mysql_common::Value::Int(*ms),
        Value::String(s) => mysql_common::Value::Bytes(s.as_bytes().to_vec()),
        Value::Blob(b) => mysql_common::Value::Bytes(b.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTransport {
        rows: Vec<Row>,
        queries: Mutex<Vec<String>>,
    }

    impl Transport for RecordingTransport {
        fn query(&self, sql: &str) -> DsResult<Vec<Row>> {
            self.queries.lock().unwrap().push(sql.to_string());
            Ok(self.rows.clone())
        }
        fn execute(&self, sql: &str) -> DsResult<u64> {
            self.queries.lock().unwrap().push(sql.to_string());
            Ok(1)
        }
    }

    #[test]
    fn build_select_renders_filters_order_and_limit() {
        let options = QueryOptions {
            filters: vec![crate::Filter::eq("status", Value::String("open".into()))],
            order_by: Some("id".into()),
            order: Some(SortOrder::Desc),
            limit: Some(10),
            offset: Some(5),
            ..Default::default()
        };
        let sql = build_select("orders", &options);
        assert_eq!(sql, "SELECT * FROM `orders` WHERE `status` = 'open' ORDER BY `id` DESC LIMIT 10 OFFSET 5");
    }

    #[test]
    fn query_delegates_to_the_pooled_transport() {
        let transport = Box::new(RecordingTransport { rows: Vec::new(), queries: Mutex::new(Vec::new()) });
        let pool = TransportPool::new(vec![transport]);
        let table = Table::new("t", vec![common::schema::Column::new("id", common::value::ColumnType::Int)]).unwrap();
        let ds = RelationalDataSource::new(pool, vec![std::sync::Arc::new(table)], true);
        ds.query("t", &QueryOptions::default()).unwrap();
    }

    #[test]
    fn string_literals_escape_embedded_quotes() {
        assert_eq!(quote_literal(&Value::String("O'Brien".into())), "'O''Brien'");
    }
}
