use std::sync::Arc;

use common::schema::Table;
use common::Row;
use datasource::{DataSource, DsResult, Filter, QueryOptions};

use crate::downgrade::Downgrader;
use crate::error::MvccResult;
use crate::manager::TransactionManager;
use crate::transaction::{IsolationLevel, TransactionId, WriteValue};

/// The active transaction a call runs under, or `None` for autocommit.
/// Autocommit is not a downgrade — it's simply not asking for MVCC at
/// all, so calls pass straight through to the backend with no version
/// bookkeeping whatsoever.
pub type TxnContext = Option<(TransactionId, IsolationLevel)>;

/// Wraps an arbitrary [`DataSource`] with snapshot-isolated reads and
/// deferred-until-commit writes, per spec.md §4.1's transaction manager
/// and §4.4's per-backend downgrade rule. Writes made inside a
/// transaction are buffered in the [`TransactionManager`]'s write set
/// and never reach `inner` until [`TransactionalDataSource::commit`]
/// runs; reads resolve against that write set first, then committed
/// version history, then fall back to `inner`'s raw current value when
/// no MVCC write has ever touched the key.
pub struct TransactionalDataSource {
    backend_name: String,
    inner: Arc<dyn DataSource>,
    manager: Arc<TransactionManager>,
    downgrader: Arc<dyn Downgrader>,
}

impl TransactionalDataSource {
    pub fn new(backend_name: impl Into<String>, inner: Arc<dyn DataSource>, manager: Arc<TransactionManager>, downgrader: Arc<dyn Downgrader>) -> Self {
        TransactionalDataSource { backend_name: backend_name.into(), inner, manager, downgrader }
    }

    pub fn begin(&self, isolation: IsolationLevel) -> TransactionId {
        self.manager.begin(isolation)
    }

    fn wraps(&self, isolation: IsolationLevel) -> bool {
        self.downgrader.supports(&self.backend_name, isolation)
    }

    /// The row key MVCC tracks for a table: the primary key column's
    /// value when the table has one, else a full-row rendering. Matches
    /// the Transaction data model's "write set (table:key -> ...)"
    /// shape, which assumes a stable per-row identity.
    fn row_key(&self, table: &str, row: &Row) -> DsResult<String> {
        let info = self.inner.table_info(table)?;
        let pk_columns: Vec<String> = info.schema.columns.iter().filter(|c| c.primary_key).map(|c| c.name.clone()).collect();
        if pk_columns.is_empty() {
            return Ok(row.values().iter().map(|v| v.as_str_lossy()).collect::<Vec<_>>().join("\u{1}"));
        }
        Ok(pk_columns.iter().filter_map(|c| row.get(c)).map(|v| v.as_str_lossy()).collect::<Vec<_>>().join("\u{1}"))
    }

    pub fn query(&self, table: &str, options: &QueryOptions, txn: TxnContext) -> DsResult<Vec<Row>> {
        let Some((id, isolation)) = txn else {
            return self.inner.query(table, options);
        };
        if !self.wraps(isolation) {
            tracing::debug!(backend = %self.backend_name, "transaction downgraded to an untransacted read");
            return self.inner.query(table, options);
        }
        let mut rows = self.inner.query(table, options)?;
        for row in rows.iter_mut() {
            let key = self.row_key(table, row).unwrap_or_default();
            if let Some(pending) = self.manager.pending_write(id, table, &key).ok().flatten() {
                if let WriteValue::Row(pending_row) = pending {
                    *row = pending_row;
                }
                continue;
            }
            if let Some(visible) = self.manager.visible_committed(id, table, &key).ok().flatten() {
                if let Some(visible_row) = visible {
                    *row = visible_row;
                }
            }
        }
        rows.retain(|row| {
            let key = self.row_key(table, row).unwrap_or_default();
            !matches!(self.manager.pending_write(id, table, &key).ok().flatten(), Some(WriteValue::Tombstone))
        });
        Ok(rows)
    }

    pub fn insert(&self, table: &str, row: Row, txn: TxnContext) -> DsResult<Row> {
        let Some((id, isolation)) = txn else {
            return self.inner.insert(table, row);
        };
        if !self.wraps(isolation) {
            return Err(datasource::DataSourceError::ReadOnly);
        }
        let key = self.row_key(table, &row).unwrap_or_default();
        self.bootstrap_key(table, &key);
        self.manager.record_write(id, table, &key, WriteValue::Row(row.clone()))?;
        Ok(row)
    }

    pub fn update(&self, table: &str, options: &QueryOptions, changes: &[(String, common::Value)], txn: TxnContext) -> DsResult<u64> {
        let Some((id, isolation)) = txn else {
            return self.inner.update(table, options, changes);
        };
        if !self.wraps(isolation) {
            return Err(datasource::DataSourceError::ReadOnly);
        }
        let matching = self.inner.query(table, &QueryOptions { select_all: true, filters: options.filters.clone(), ..Default::default() })?;
        let mut updated = 0u64;
        for mut row in matching {
            let key = self.row_key(table, &row).unwrap_or_default();
            self.bootstrap_key(table, &key);
            let columns = row.columns().to_vec();
            let mut values = row.values().to_vec();
            for (name, value) in changes {
                if let Some(idx) = columns.iter().position(|c| c == name) {
                    values[idx] = value.clone();
                }
            }
            row = common::Row::new(columns.into(), values);
            self.manager.record_write(id, table, &key, WriteValue::Row(row))?;
            updated += 1;
        }
        Ok(updated)
    }

    pub fn delete(&self, table: &str, options: &QueryOptions, txn: TxnContext) -> DsResult<u64> {
        let Some((id, isolation)) = txn else {
            return self.inner.delete(table, options);
        };
        if !self.wraps(isolation) {
            return Err(datasource::DataSourceError::ReadOnly);
        }
        let matching = self.inner.query(table, &QueryOptions { select_all: true, filters: options.filters.clone(), ..Default::default() })?;
        let mut removed = 0u64;
        for row in matching {
            let key = self.row_key(table, &row).unwrap_or_default();
            self.bootstrap_key(table, &key);
            self.manager.record_write(id, table, &key, WriteValue::Tombstone)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Seeds version history for a key the first time MVCC touches it,
    /// with whatever `inner` currently holds — so a transaction that
    /// started before this write can still resolve the key back to its
    /// pre-write value even after `commit` eventually applies the write
    /// to `inner` and overwrites that raw value.
    fn bootstrap_key(&self, table: &str, key: &str) {
        let pre_write = self.raw_row(table, key);
        self.manager.versions().bootstrap_if_absent(table, key, || pre_write);
    }

    fn raw_row(&self, table: &str, key: &str) -> Option<Row> {
        let options = QueryOptions { select_all: true, ..Default::default() };
        self.inner.query(table, &options).ok()?.into_iter().find(|row| self.row_key(table, row).ok().as_deref() == Some(key))
    }

    /// Applies a committed transaction's buffered writes to the
    /// backend and releases its tracked state. Bridges the generic
    /// row/tombstone write set onto the [`DataSource`] trait's existing
    /// `insert`/`update`/`delete` primitives, keyed on the primary key
    /// where the table has one.
    pub fn commit(&self, id: TransactionId) -> MvccResult<()> {
        let writes = self.manager.commit(id)?;
        for ((table, key), value) in writes {
            match value {
                WriteValue::Row(row) => {
                    let pk_filter = self.pk_filter_for(&table, &key);
                    match pk_filter {
                        Some(filter) => {
                            let options = QueryOptions { select_all: true, filters: vec![filter], ..Default::default() };
                            let changes: Vec<(String, common::Value)> = row.columns().iter().cloned().zip(row.values().iter().cloned()).collect();
                            if self.inner.update(&table, &options, &changes).unwrap_or(0) == 0 {
                                let _ = self.inner.insert(&table, row);
                            }
                        }
                        None => {
                            let _ = self.inner.insert(&table, row);
                        }
                    }
                }
                WriteValue::Tombstone => {
                    if let Some(filter) = self.pk_filter_for(&table, &key) {
                        let options = QueryOptions { select_all: true, filters: vec![filter], ..Default::default() };
                        let _ = self.inner.delete(&table, &options);
                    }
                }
            }
        }
        Ok(())
    }

    fn pk_filter_for(&self, table: &str, key: &str) -> Option<Filter> {
        let info = self.inner.table_info(table).ok()?;
        let pk_names: Vec<String> = info.schema.columns.iter().filter(|c| c.primary_key).map(|c| c.name.clone()).collect();
        if pk_names.len() != 1 {
            return None;
        }
        Some(Filter::eq(pk_names[0].clone(), common::Value::String(key.to_string())))
    }

    pub fn abort(&self, id: TransactionId) -> MvccResult<()> {
        self.manager.abort(id)
    }

    /// A [`DataSource`]-implementing view of this adapter fixed to one
    /// transaction context, for the duration of a single statement.
    /// Each statement builds its own `ScopedDataSource` rather than the
    /// adapter carrying mutable "current transaction" state directly,
    /// so concurrent sessions sharing the same backend never race on
    /// which transaction a call runs under.
    pub fn scoped(self: &Arc<Self>, txn: TxnContext) -> ScopedDataSource {
        ScopedDataSource { adapter: Arc::clone(self), txn }
    }
}

/// Binds a [`TransactionalDataSource`] to one transaction context so it
/// can be handed to code (like the executor) that only knows the plain
/// [`DataSource`] trait.
pub struct ScopedDataSource {
    adapter: Arc<TransactionalDataSource>,
    txn: TxnContext,
}

impl DataSource for ScopedDataSource {
    fn connect(&self) -> DsResult<()> {
        self.adapter.inner.connect()
    }

    fn close(&self) -> DsResult<()> {
        self.adapter.inner.close()
    }

    fn is_connected(&self) -> bool {
        self.adapter.inner.is_connected()
    }

    fn is_writable(&self) -> bool {
        self.adapter.inner.is_writable()
    }

    fn list_tables(&self) -> DsResult<Vec<String>> {
        self.adapter.inner.list_tables()
    }

    fn table_info(&self, table: &str) -> DsResult<datasource::TableInfo> {
        self.adapter.inner.table_info(table)
    }

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>> {
        self.adapter.query(table, options, self.txn)
    }

    fn insert(&self, table: &str, row: Row) -> DsResult<Row> {
        self.adapter.insert(table, row, self.txn)
    }

    fn update(&self, table: &str, options: &QueryOptions, changes: &[(String, common::Value)]) -> DsResult<u64> {
        self.adapter.update(table, options, changes, self.txn)
    }

    fn delete(&self, table: &str, options: &QueryOptions) -> DsResult<u64> {
        self.adapter.delete(table, options, self.txn)
    }

    fn create_table(&self, table: Table) -> DsResult<()> {
        self.adapter.inner.create_table(table)
    }

    fn drop_table(&self, table: &str) -> DsResult<()> {
        self.adapter.inner.drop_table(table)
    }

    fn truncate_table(&self, table: &str) -> DsResult<()> {
        self.adapter.inner.truncate_table(table)
    }

    fn execute(&self, statement: &str) -> DsResult<u64> {
        self.adapter.inner.execute(statement)
    }
}

#[cfg(test)]
mod tests {
    use common::schema::Column;
    use common::{RowBuilder, Value};
    use common::value::ColumnType;
    use datasource::memory::MemoryDataSource;

    use super::*;
    use crate::downgrade::DefaultDowngrader;

    fn source_with_table() -> Arc<dyn DataSource> {
        let source = MemoryDataSource::new();
        source.connect().unwrap();
        let columns = vec![Column::new("id", ColumnType::VarChar).primary(), Column::new("name", ColumnType::VarChar)];
        let table = Table::new("widgets", columns).unwrap();
        source.create_table(table).unwrap();
        let mut row = RowBuilder::new();
        row.push("id", Value::String("1".into())).push("name", Value::String("widget".into()));
        source.insert("widgets", row.build()).unwrap();
        Arc::new(source)
    }

    #[test]
    fn write_inside_a_transaction_is_invisible_until_commit() {
        let inner = source_with_table();
        let manager = Arc::new(TransactionManager::new(1000));
        let downgrader = Arc::new(DefaultDowngrader);
        let ds = TransactionalDataSource::new("memory", inner.clone(), manager.clone(), downgrader);

        let writer = ds.begin(IsolationLevel::RepeatableRead);
        let mut row = RowBuilder::new();
        row.push("id", Value::String("1".into())).push("name", Value::String("updated".into()));
        ds.update("widgets", &QueryOptions { select_all: true, filters: vec![Filter::eq("id", Value::String("1".into()))], ..Default::default() }, &[("name".into(), Value::String("updated".into()))], Some((writer, IsolationLevel::RepeatableRead))).unwrap();

        let raw = inner.query("widgets", &QueryOptions { select_all: true, ..Default::default() }).unwrap();
        assert_eq!(raw[0].get("name").cloned(), Some(Value::String("widget".into())), "backend untouched pre-commit");

        ds.commit(writer).unwrap();
        let raw = inner.query("widgets", &QueryOptions { select_all: true, ..Default::default() }).unwrap();
        assert_eq!(raw[0].get("name").cloned(), Some(Value::String("updated".into())));
    }

    #[test]
    fn relational_backend_downgrades_writes_to_an_error() {
        let inner = source_with_table();
        let manager = Arc::new(TransactionManager::new(1000));
        let downgrader = Arc::new(DefaultDowngrader);
        let ds = TransactionalDataSource::new("relational", inner, manager, downgrader);

        let txn = ds.begin(IsolationLevel::RepeatableRead);
        let mut row = RowBuilder::new();
        row.push("id", Value::String("2".into())).push("name", Value::String("x".into()));
        let result = ds.insert("widgets", row.build(), Some((txn, IsolationLevel::RepeatableRead)));
        assert!(result.is_err());
    }
}
