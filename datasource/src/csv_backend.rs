use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use common::schema::{Column, Table, TableRef};
use common::value::ColumnType;
use common::{Row, RowBuilder, Value};

use crate::{apply_order_and_paging, DataSource, DataSourceError, DsResult, QueryOptions, TableInfo};

/// Lines sampled on connect to infer each column's type, per the file
/// backend's "inference of schema on Connect by sampling" contract.
const SAMPLE_LINES: usize = 100;
/// Upper bound on concurrently decoding chunk-readers for one query, so
/// a very large file doesn't spawn an unbounded number of threads.
const MAX_PARALLEL_CHUNKS: usize = 8;
/// Target bytes per decoding chunk before boundaries are realigned to
/// the next newline.
const CHUNK_SIZE_BYTES: u64 = 8 * 1024 * 1024;

/// Read-only CSV backend. Schema is inferred once on `connect` by
/// sampling; `query` splits the file into byte-range chunks realigned
/// to line boundaries and decodes them on a bounded set of OS threads.
pub struct CsvDataSource {
    path: PathBuf,
    table_name: String,
    schema: RwLock<Option<TableRef>>,
    connected: AtomicBool,
}

impl CsvDataSource {
    pub fn new(table_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        CsvDataSource { path: path.into(), table_name: table_name.into(), schema: RwLock::new(None), connected: AtomicBool::new(false) }
    }

    fn infer_schema(&self) -> DsResult<TableRef> {
        let file = File::open(&self.path)?;
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(BufReader::new(file));
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut candidate_types: Vec<ColumnType> = vec![ColumnType::Int; headers.len()];
        let mut seen_any: Vec<bool> = vec![false; headers.len()];

        for (sampled, record) in reader.records().enumerate() {
            if sampled >= SAMPLE_LINES {
                break;
            }
            let record = record?;
            for (i, field) in record.iter().enumerate() {
                if i >= candidate_types.len() {
                    continue;
                }
                let inferred = infer_field_type(field);
                candidate_types[i] = widen(candidate_types[i], inferred, seen_any[i]);
                seen_any[i] = true;
            }
        }

        let columns = headers.into_iter().zip(candidate_types).map(|(name, ty)| Column::new(name, ty)).collect();
        let table = Table::new(self.table_name.clone(), columns).map_err(DataSourceError::Constraint)?;
        Ok(std::sync::Arc::new(table))
    }

    fn schema(&self) -> DsResult<TableRef> {
        if let Some(schema) = self.schema.read().unwrap().clone() {
            return Ok(schema);
        }
        Err(DataSourceError::NotConnected)
    }

    fn chunk_boundaries(&self) -> DsResult<Vec<(u64, u64)>> {
        let mut file = File::open(&self.path)?;
        let total_len = file.seek(SeekFrom::End(0))?;
        if total_len == 0 {
            return Ok(Vec::new());
        }
        let target_chunks = ((total_len / CHUNK_SIZE_BYTES).max(1) as usize).min(MAX_PARALLEL_CHUNKS);
        let nominal = total_len / target_chunks as u64;

        let mut boundaries = Vec::new();
        let mut start = 0u64;
        for i in 0..target_chunks {
            let mut end = if i + 1 == target_chunks { total_len } else { (start + nominal).min(total_len) };
            if i + 1 != target_chunks {
                end = realign_to_newline(&mut file, end, total_len)?;
            }
            if end > start {
                boundaries.push((start, end));
            }
            start = end;
        }
        Ok(boundaries)
    }
}

fn realign_to_newline(file: &mut File, mut pos: u64, total_len: u64) -> DsResult<u64> {
    let mut buf = [0u8; 1];
    while pos < total_len {
        file.seek(SeekFrom::Start(pos))?;
        if file.read(&mut buf)? == 0 {
            break;
        }
        pos += 1;
        if buf[0] == b'\n' {
            break;
        }
    }
    Ok(pos)
}

fn infer_field_type(field: &str) -> ColumnType {
    if field.is_empty() {
        return ColumnType::VarChar;
    }
    if field.parse::<i64>().is_ok() {
        ColumnType::Int
    } else if field.parse::<f64>().is_ok() {
        ColumnType::Double
    } else if field.eq_ignore_ascii_case("true") || field.eq_ignore_ascii_case("false") {
        ColumnType::Boolean
    } else {
        ColumnType::VarChar
    }
}

/// Combines a running candidate type with a newly observed one: once
/// any row disagrees, the column widens toward the more permissive
/// type (Int < Double < VarChar), matching how a human reading a
/// sample would decide a column is "really" text once one row doesn't
/// parse as a number.
fn widen(current: ColumnType, observed: ColumnType, seen_any: bool) -> ColumnType {
    if !seen_any {
        return observed;
    }
    use ColumnType::*;
    match (current, observed) {
        (VarChar, _) | (_, VarChar) if current != observed => VarChar,
        (Boolean, Boolean) => Boolean,
        (Int, Int) => Int,
        (Double, Double) => Double,
        (Int, Double) | (Double, Int) => Double,
        (a, b) if a == b => a,
        _ => VarChar,
    }
}

fn parse_value(field: &str, column_type: ColumnType) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match column_type {
        ColumnType::Int => field.parse::<i64>().map(Value::Int).unwrap_or_else(|_| Value::String(field.to_string())),
        ColumnType::Double => field.parse::<f64>().map(Value::Double).unwrap_or_else(|_| Value::String(field.to_string())),
        ColumnType::Boolean => field.parse::<bool>().map(Value::Bool).unwrap_or_else(|_| Value::String(field.to_string())),
        _ => Value::String(field.to_string()),
    }
}

fn decode_chunk(path: &std::path::Path, start: u64, end: u64, schema: &TableRef, options: &QueryOptions) -> DsResult<Vec<Row>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(start))?;
    let len = end - start;
    let mut buf = vec![0u8; len as usize];
    std::io::Read::read_exact(&mut file, &mut buf)?;

    let needs_header = start == 0;
    let mut reader = csv::ReaderBuilder::new().has_headers(needs_header).from_reader(buf.as_slice());
    let column_names = schema.column_names();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut builder = RowBuilder::new();
        for (i, name) in column_names.iter().enumerate() {
            let field = record.get(i).unwrap_or("");
            let column_type = schema.column(name).map(|c| c.data_type).unwrap_or(ColumnType::VarChar);
            builder.push(name.clone(), parse_value(field, column_type));
        }
        let row = builder.build();
        if options.matches(&row) {
            rows.push(row);
        }
    }
    Ok(rows)
}

impl DataSource for CsvDataSource {
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
        let boundaries = self.chunk_boundaries()?;

        let mut rows = std::thread::scope(|scope| -> DsResult<Vec<Row>> {
            let handles: Vec<_> = boundaries
                .iter()
                .map(|&(start, end)| {
                    let schema = schema.clone();
                    scope.spawn(move || decode_chunk(&self.path, start, end, &schema, options))
                })
                .collect();
            let mut collected = Vec::new();
            for handle in handles {
                collected.extend(handle.join().map_err(|_| DataSourceError::Backend("csv decode thread panicked".into()))??);
            }
            Ok(collected)
        })?;

        if let Some(wanted) = &options.columns {
            rows = rows
                .into_iter()
                .map(|row| {
                    let mut builder = RowBuilder::new();
                    for name in wanted {
                        builder.push(name.clone(), row.get(name).cloned().unwrap_or(Value::Null));
                    }
                    builder.build()
                })
                .collect();
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

impl From<csv::Error> for DataSourceError {
    fn from(err: csv::Error) -> Self {
        DataSourceError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn infers_integer_and_string_columns() {
        let file = write_csv("id,name\n1,alice\n2,bob\n");
        let ds = CsvDataSource::new("people", file.path());
        ds.connect().unwrap();
        let info = ds.table_info("people").unwrap();
        assert_eq!(info.schema.column("id").unwrap().data_type, ColumnType::Int);
        assert_eq!(info.schema.column("name").unwrap().data_type, ColumnType::VarChar);
    }

    #[test]
    fn query_returns_every_row_across_chunk_boundaries() {
        let mut contents = String::from("id,name\n");
        for i in 0..500 {
            contents.push_str(&format!("{i},name{i}\n"));
        }
        let file = write_csv(&contents);
        let ds = CsvDataSource::new("people", file.path());
        ds.connect().unwrap();
        let rows = ds.query("people", &QueryOptions::default()).unwrap();
        assert_eq!(rows.len(), 500);
    }

    #[test]
    fn writes_are_rejected() {
        let file = write_csv("id\n1\n");
        let ds = CsvDataSource::new("t", file.path());
        ds.connect().unwrap();
        assert!(ds.insert("t", RowBuilder::new().build()).is_err());
    }
}
