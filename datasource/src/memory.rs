use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;

use common::schema::{OnDelete, Table, TableRef};
use common::{GatewayError, Row, RowBuilder, Value};

use crate::index::IndexManager;
use crate::{apply_order_and_paging, DataSource, DataSourceError, DsResult, QueryOptions, TableInfo};

/// One table's authoritative row store plus the bookkeeping needed to
/// enforce CREATE TABLE constraints: a per-unique-column value set, an
/// auto-increment counter, and an index manager covering every
/// unique/primary-key column.
struct TableStore {
    schema: TableRef,
    rows: RwLock<Vec<Option<Row>>>,
    unique_values: RwLock<std::collections::HashMap<String, HashSet<String>>>,
    auto_increment: AtomicU64,
    indexes: RwLock<IndexManager>,
}

impl TableStore {
    fn new(schema: TableRef) -> Self {
        let mut indexes = IndexManager::new();
        let mut unique_values = std::collections::HashMap::new();
        for column in schema.unique_columns() {
            indexes.ensure_hash(&column.name);
            unique_values.insert(column.name.clone(), HashSet::new());
        }
        TableStore {
            schema,
            rows: RwLock::new(Vec::new()),
            unique_values: RwLock::new(unique_values),
            auto_increment: AtomicU64::new(1),
            indexes: RwLock::new(indexes),
        }
    }

    fn live_rows(&self) -> Vec<Row> {
        self.rows.read().unwrap().iter().flatten().cloned().collect()
    }
}

/// The in-memory reference backend: authoritative semantics for every
/// constraint CREATE TABLE can declare, per the data-source contract's
/// "In-memory backend (reference)" section. Reads observed through this
/// type are the raw (non-MVCC) view; [`crate::relational`] and the
/// transaction adapter wrap it for snapshot isolation.
pub struct MemoryDataSource {
    catalog: RwLock<std::collections::HashMap<String, TableStore>>,
    connected: AtomicBool,
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataSource {
    pub fn new() -> Self {
        MemoryDataSource { catalog: RwLock::new(std::collections::HashMap::new()), connected: AtomicBool::new(false) }
    }

    fn store(&self, table: &str) -> DsResult<std::sync::RwLockReadGuard<'_, std::collections::HashMap<String, TableStore>>> {
        let guard = self.catalog.read().unwrap();
        if !guard.contains_key(table) {
            return Err(DataSourceError::UnknownTable(table.to_string()));
        }
        Ok(guard)
    }

    fn check_unique(&self, store: &TableStore, column: &str, value: &Value, skip_row_id: Option<usize>) -> DsResult<()> {
        if value.is_null() {
            return Ok(());
        }
        let unique_values = store.unique_values.read().unwrap();
        let Some(seen) = unique_values.get(column) else { return Ok(()) };
        let key = value.as_str_lossy();
        if seen.contains(&key) {
            if let Some(skip) = skip_row_id {
                let rows = store.rows.read().unwrap();
                if rows.get(skip).and_then(|r| r.as_ref()).and_then(|r| r.get(column)).is_some_and(|v| v.sql_eq(value).unwrap_or(false)) {
                    return Ok(());
                }
            }
            return Err(DataSourceError::Constraint(GatewayError::UniqueViolation { column: column.to_string(), value: key }));
        }
        Ok(())
    }

    fn check_foreign_keys(&self, row: &Row) -> DsResult<()> {
        let catalog = self.catalog.read().unwrap();
        for store in catalog.values() {
            for column in &store.schema.columns {
                let Some(fk) = &column.foreign_key else { continue };
                let Some(value) = row.get(&column.name) else { continue };
                if value.is_null() {
                    continue;
                }
                let Some(referenced) = catalog.get(&fk.referenced_table) else { continue };
                let exists = referenced.live_rows().iter().any(|r| r.get(&fk.referenced_column).is_some_and(|v| v.sql_eq(value).unwrap_or(false)));
                if !exists {
                    return Err(DataSourceError::Constraint(GatewayError::ForeignKeyViolation(format!(
                        "no row in '{}' with {} = {}",
                        fk.referenced_table, fk.referenced_column, value
                    ))));
                }
            }
        }
        Ok(())
    }

    /// On delete of `table`'s rows matching `deleted_values` (keyed by
    /// the primary key column), enforces RESTRICT/CASCADE/SET NULL on
    /// every other table's foreign key referencing it.
    fn cascade_delete(&self, table: &str, deleted: &[Row]) -> DsResult<()> {
        let pk_column = {
            let catalog = self.catalog.read().unwrap();
            let Some(store) = catalog.get(table) else { return Ok(()) };
            store.schema.primary_key_columns().first().map(|c| c.name.clone())
        };
        let Some(pk_column) = pk_column else { return Ok(()) };
        let deleted_keys: Vec<&Value> = deleted.iter().filter_map(|r| r.get(&pk_column)).collect();
        if deleted_keys.is_empty() {
            return Ok(());
        }

        let catalog = self.catalog.read().unwrap();
        for (dependent_name, dependent) in catalog.iter() {
            for column in &dependent.schema.columns {
                let Some(fk) = &column.foreign_key else { continue };
                if fk.referenced_table != table {
                    continue;
                }
                let referencing_rows: Vec<(usize, Row)> = dependent
                    .rows
                    .read()
                    .unwrap()
                    .iter()
                    .enumerate()
                    .filter_map(|(i, r)| r.clone().map(|r| (i, r)))
                    .filter(|(_, r)| r.get(&column.name).is_some_and(|v| deleted_keys.iter().any(|k| k.sql_eq(v).unwrap_or(false))))
                    .collect();
                if referencing_rows.is_empty() {
                    continue;
                }
                match fk.on_delete {
                    OnDelete::Restrict => {
                        return Err(DataSourceError::Constraint(GatewayError::ForeignKeyViolation(format!(
                            "row referenced from '{dependent_name}'"
                        ))));
                    }
                    OnDelete::Cascade => {
                        let mut rows = dependent.rows.write().unwrap();
                        for (i, _) in &referencing_rows {
                            rows[*i] = None;
                        }
                    }
                    OnDelete::SetNull => {
                        let mut rows = dependent.rows.write().unwrap();
                        for (i, row) in &referencing_rows {
                            let mut builder = RowBuilder::new();
                            for (name, value) in row.columns().iter().zip(row.values()) {
                                if name == &column.name {
                                    builder.push(name.clone(), Value::Null);
                                } else {
                                    builder.push(name.clone(), value.clone());
                                }
                            }
                            rows[*i] = Some(builder.build());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl DataSource for MemoryDataSource {
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
        true
    }

    fn list_tables(&self) -> DsResult<Vec<String>> {
        Ok(self.catalog.read().unwrap().keys().cloned().collect())
    }

    fn table_info(&self, table: &str) -> DsResult<TableInfo> {
        let catalog = self.store(table)?;
        let store = &catalog[table];
        Ok(TableInfo { name: table.to_string(), schema: store.schema.clone(), row_count_hint: Some(store.live_rows().len() as u64) })
    }

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>> {
        let catalog = self.store(table)?;
        let rows: Vec<Row> = catalog[table].live_rows().into_iter().filter(|row| options.matches(row)).collect();
        Ok(apply_order_and_paging(rows, options))
    }

    fn insert(&self, table: &str, mut row: Row) -> DsResult<Row> {
        let catalog = self.catalog.read().unwrap();
        let store = catalog.get(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;

        let mut builder = RowBuilder::new();
        for column in &store.schema.columns {
            let mut value = row.get(&column.name).cloned().unwrap_or(Value::Null);
            if value.is_null() && column.auto_increment {
                let next = store.auto_increment.fetch_add(1, AtomicOrdering::SeqCst);
                value = Value::Int(next as i64);
            }
            if value.is_null() && !column.nullable {
                if let Some(default) = &column.default {
                    value = Value::String(default.clone());
                } else {
                    return Err(DataSourceError::Constraint(GatewayError::NotNullViolation(column.name.clone())));
                }
            }
            self.check_unique(store, &column.name, &value, None)?;
            builder.push(column.name.clone(), value);
        }
        row = builder.build();
        drop(catalog);
        self.check_foreign_keys(&row)?;

        let catalog = self.catalog.read().unwrap();
        let store = &catalog[table];
        let mut rows = store.rows.write().unwrap();
        let row_id = rows.len();
        rows.push(Some(row.clone()));
        drop(rows);

        let mut unique_values = store.unique_values.write().unwrap();
        for (column, seen) in unique_values.iter_mut() {
            if let Some(value) = row.get(column) {
                if !value.is_null() {
                    seen.insert(value.as_str_lossy());
                }
            }
        }
        drop(unique_values);

        let mut indexes = store.indexes.write().unwrap();
        for column in &store.schema.columns {
            if indexes.has_index(&column.name) {
                if let Some(value) = row.get(&column.name) {
                    indexes.insert(&column.name, value, row_id);
                }
            }
        }
        Ok(row)
    }

    fn update(&self, table: &str, options: &QueryOptions, changes: &[(String, Value)]) -> DsResult<u64> {
        let catalog = self.catalog.read().unwrap();
        let store = catalog.get(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;

        let matching: Vec<usize> = {
            let rows = store.rows.read().unwrap();
            rows.iter().enumerate().filter_map(|(i, r)| r.as_ref().filter(|r| options.matches(r)).map(|_| i)).collect()
        };

        for (column, value) in changes {
            for &row_id in &matching {
                self.check_unique(store, column, value, Some(row_id))?;
            }
        }

        let mut count = 0u64;
        for row_id in matching {
            let mut rows = store.rows.write().unwrap();
            let Some(current) = rows.get(row_id).and_then(|r| r.clone()) else { continue };
            let mut builder = RowBuilder::new();
            for (name, old_value) in current.columns().iter().zip(current.values()) {
                let new_value = changes.iter().find(|(c, _)| c == name).map(|(_, v)| v.clone()).unwrap_or_else(|| old_value.clone());
                builder.push(name.clone(), new_value);
            }
            let updated = builder.build();
            rows[row_id] = Some(updated.clone());
            drop(rows);
            self.check_foreign_keys(&updated)?;

            let mut unique_values = store.unique_values.write().unwrap();
            for (column, seen) in unique_values.iter_mut() {
                if let Some(value) = updated.get(column) {
                    if !value.is_null() {
                        seen.insert(value.as_str_lossy());
                    }
                }
            }
            count += 1;
        }
        Ok(count)
    }

    fn delete(&self, table: &str, options: &QueryOptions) -> DsResult<u64> {
        let catalog = self.catalog.read().unwrap();
        let store = catalog.get(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;

        let (ids, deleted): (Vec<usize>, Vec<Row>) = {
            let rows = store.rows.read().unwrap();
            rows.iter()
                .enumerate()
                .filter_map(|(i, r)| r.as_ref().filter(|r| options.matches(r)).map(|r| (i, r.clone())))
                .unzip()
        };
        drop(catalog);

        self.cascade_delete(table, &deleted)?;

        let catalog = self.catalog.read().unwrap();
        let store = &catalog[table];
        let mut rows = store.rows.write().unwrap();
        for &id in &ids {
            rows[id] = None;
        }
        Ok(ids.len() as u64)
    }

    fn create_table(&self, table: Table) -> DsResult<()> {
        let mut catalog = self.catalog.write().unwrap();
        if catalog.contains_key(&table.name) {
            return Err(DataSourceError::Backend(format!("table '{}' already exists", table.name)));
        }
        let name = table.name.clone();
        catalog.insert(name, TableStore::new(std::sync::Arc::new(table)));
        Ok(())
    }

    fn drop_table(&self, table: &str) -> DsResult<()> {
        let mut catalog = self.catalog.write().unwrap();
        catalog.remove(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;
        Ok(())
    }

    fn truncate_table(&self, table: &str) -> DsResult<()> {
        let catalog = self.catalog.read().unwrap();
        let store = catalog.get(table).ok_or_else(|| DataSourceError::UnknownTable(table.to_string()))?;
        store.rows.write().unwrap().clear();
        for seen in store.unique_values.write().unwrap().values_mut() {
            seen.clear();
        }
        Ok(())
    }

    fn execute(&self, _statement: &str) -> DsResult<u64> {
        Err(DataSourceError::Backend("the in-memory backend has no native SQL dialect to execute".into()))
    }
}

#[cfg(test)]
mod tests {
    use common::schema::Column;
    use common::value::ColumnType;

    use super::*;

    fn table(name: &str, columns: Vec<Column>) -> Table {
        Table::new(name, columns).unwrap()
    }

    #[test]
    fn rejects_duplicate_unique_values() {
        let ds = MemoryDataSource::new();
        ds.create_table(table("t", vec![Column::new("id", ColumnType::Int).primary()])).unwrap();
        let mut b = RowBuilder::new();
        b.push("id", Value::Int(1));
        ds.insert("t", b.build()).unwrap();

        let mut b = RowBuilder::new();
        b.push("id", Value::Int(1));
        assert!(ds.insert("t", b.build()).is_err());
    }

    #[test]
    fn auto_increment_issues_monotonic_ids_when_omitted() {
        let ds = MemoryDataSource::new();
        ds.create_table(table("t", vec![Column::new("id", ColumnType::Int).primary().auto_increment()])).unwrap();
        let first = ds.insert("t", RowBuilder::new().build()).unwrap();
        let second = ds.insert("t", RowBuilder::new().build()).unwrap();
        assert_eq!(first.get("id"), Some(&Value::Int(1)));
        assert_eq!(second.get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn not_null_violation_rejects_missing_required_column() {
        let ds = MemoryDataSource::new();
        ds.create_table(table("t", vec![Column::new("name", ColumnType::VarChar).not_null()])).unwrap();
        assert!(ds.insert("t", RowBuilder::new().build()).is_err());
    }

    #[test]
    fn foreign_key_restrict_blocks_delete_of_a_referenced_row() {
        let ds = MemoryDataSource::new();
        ds.create_table(table("customers", vec![Column::new("id", ColumnType::Int).primary()])).unwrap();
        let mut orders_fk = Column::new("customer_id", ColumnType::Int);
        orders_fk.foreign_key = Some(common::schema::ForeignKey {
            referenced_table: "customers".into(),
            referenced_column: "id".into(),
            on_delete: OnDelete::Restrict,
        });
        ds.create_table(table("orders", vec![Column::new("id", ColumnType::Int).primary(), orders_fk])).unwrap();

        ds.insert("customers", { let mut b = RowBuilder::new(); b.push("id", Value::Int(1)); b.build() }).unwrap();
        ds.insert("orders", {
            let mut b = RowBuilder::new();
            b.push("id", Value::Int(1));
            b.push("customer_id", Value::Int(1));
            b.build()
        })
        .unwrap();

        let options = QueryOptions { filters: vec![crate::Filter::eq("id", Value::Int(1))], ..Default::default() };
        assert!(ds.delete("customers", &options).is_err());
    }
}
