use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use common::schema::{Column, Table, TableRef};
use common::value::ColumnType;
use common::{Row, RowBuilder, Value};
use serde_json::Value as JsonValue;

use crate::{apply_order_and_paging, DataSource, DataSourceError, DsResult, QueryOptions, TableInfo};

const SAMPLE_LINES: usize = 100;

/// Read-only newline-delimited JSON backend: one JSON object per line.
/// Schema is inferred the same way the CSV backend does — sampling the
/// first lines to establish the column set and types — since neither
/// format carries its own schema metadata.
pub struct JsonDataSource {
    path: PathBuf,
    table_name: String,
    schema: RwLock<Option<TableRef>>,
    connected: AtomicBool,
}

impl JsonDataSource {
    pub fn new(table_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        JsonDataSource { path: path.into(), table_name: table_name.into(), schema: RwLock::new(None), connected: AtomicBool::new(false) }
    }

    fn schema(&self) -> DsResult<TableRef> {
        self.schema.read().unwrap().clone().ok_or(DataSourceError::NotConnected)
    }

    fn infer_schema(&self) -> DsResult<TableRef> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut order: Vec<String> = Vec::new();
        let mut types: std::collections::HashMap<String, ColumnType> = std::collections::HashMap::new();

        for (sampled, line) in reader.lines().enumerate() {
            if sampled >= SAMPLE_LINES {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: JsonValue = serde_json::from_str(&line).map_err(|e| DataSourceError::Backend(e.to_string()))?;
            let JsonValue::Object(map) = parsed else {
                return Err(DataSourceError::Backend("each line must be a JSON object".into()));
            };
            for (key, value) in map {
                if !types.contains_key(&key) {
                    order.push(key.clone());
                }
                let inferred = json_type(&value);
                types.entry(key).and_modify(|t| *t = widen(*t, inferred)).or_insert(inferred);
            }
        }

        let columns = order.into_iter().map(|name| { let ty = types[&name]; Column::new(name, ty) }).collect();
        let table = Table::new(self.table_name.clone(), columns).map_err(DataSourceError::Constraint)?;
        Ok(std::sync::Arc::new(table))
    }
}

fn json_type(value: &JsonValue) -> ColumnType {
    match value {
        JsonValue::Null => ColumnType::VarChar,
        JsonValue::Bool(_) => ColumnType::Boolean,
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Int,
        JsonValue::Number(_) => ColumnType::Double,
        JsonValue::String(_) => ColumnType::VarChar,
        JsonValue::Array(_) | JsonValue::Object(_) => ColumnType::Json,
    }
}

fn widen(current: ColumnType, observed: ColumnType) -> ColumnType {
    use ColumnType::*;
    match (current, observed) {
        (a, b) if a == b => a,
        (Int, Double) | (Double, Int) => Double,
        _ => VarChar,
    }
}

fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => n.as_i64().map(Value::Int).unwrap_or_else(|| Value::Double(n.as_f64().unwrap_or(0.0))),
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(_) | JsonValue::Object(_) => Value::String(value.to_string()),
    }
}

impl DataSource for JsonDataSource {
    fn connect(&self) -> DsResult<()> {
        let schema = self.infer_schema()?;
        *self.schema.write().unwrap() = Some(schema);
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
        false
    }

    fn list_tables(&self) -> DsResult<Vec<String>> {
        Ok(vec![self.table_name.clone()])
    }

    fn table_info(&self, table: &str) -> DsResult<TableInfo> {
        if table != self.table_name {
            return Err(DataSourceError::UnknownTable(table.to_string()));
        }
        Ok(TableInfo { name: table.to_string(), schema: self.schema()?, row_count_hint: None })
    }

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>> {
        if table != self.table_name {
            return Err(DataSourceError::UnknownTable(table.to_string()));
        }
        let schema = self.schema()?;
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);

        let mut rows = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: JsonValue = serde_json::from_str(&line).map_err(|e| DataSourceError::Backend(e.to_string()))?;
            let JsonValue::Object(map) = parsed else { continue };
            let mut builder = RowBuilder::new();
            for name in schema.column_names() {
                let value = map.get(&name).map(json_to_value).unwrap_or(Value::Null);
                builder.push(name, value);
            }
            let row = builder.build();
            if options.matches(&row) {
                rows.push(row);
            }
        }
        Ok(apply_order_and_paging(rows, options))
    }

    fn insert(&self, _table: &str, _row: Row) -> DsResult<Row> {
        Err(DataSourceError::ReadOnly)
    }

    fn update(&self, _table: &str, _options: &QueryOptions, _changes: &[(String, Value)]) -> DsResult<u64> {
        Err(DataSourceError::ReadOnly)
    }

    fn delete(&self, _table: &str, _options: &QueryOptions) -> DsResult<u64> {
        Err(DataSourceError::ReadOnly)
    }

    fn create_table(&self, _table: Table) -> DsResult<()> {
        Err(DataSourceError::ReadOnly)
    }

    fn drop_table(&self, _table: &str) -> DsResult<()> {
        Err(DataSourceError::ReadOnly)
    }

    fn truncate_table(&self, _table: &str) -> DsResult<()> {
        Err(DataSourceError::ReadOnly)
    }

    fn execute(&self, _statement: &str) -> DsResult<u64> {
        Err(DataSourceError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_ndjson(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[test]
    fn infers_columns_from_sampled_lines() {
        let file = write_ndjson(&[r#"{"id":1,"name":"a"}"#, r#"{"id":2,"name":"b"}"#]);
        let ds = JsonDataSource::new("t", file.path());
        ds.connect().unwrap();
        let info = ds.table_info("t").unwrap();
        assert_eq!(info.schema.column("id").unwrap().data_type, ColumnType::Int);
    }

    #[test]
    fn query_decodes_every_line() {
        let file = write_ndjson(&[r#"{"id":1}"#, r#"{"id":2}"#, r#"{"id":3}"#]);
        let ds = JsonDataSource::new("t", file.path());
        ds.connect().unwrap();
        let rows = ds.query("t", &QueryOptions::default()).unwrap();
        assert_eq!(rows.len(), 3);
    }
}
