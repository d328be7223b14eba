use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::RwLock;

use common::schema::{Column, Table, TableRef};
use common::value::ColumnType;
use common::{Row, RowBuilder, Value};
use parquet::basic::Type as PhysicalType;
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::RowAccessor;

use crate::{apply_order_and_paging, DataSource, DataSourceError, DsResult, QueryOptions, TableInfo};

/// Read-only Parquet backend. Parquet carries its own column metadata,
/// so unlike the CSV/JSON backends no sampling is needed to infer a
/// schema — it's read directly from the file's footer on `connect`.
pub struct ParquetDataSource {
    path: PathBuf,
    table_name: String,
    schema: RwLock<Option<TableRef>>,
    connected: AtomicBool,
}

impl ParquetDataSource {
    pub fn new(table_name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        ParquetDataSource { path: path.into(), table_name: table_name.into(), schema: RwLock::new(None), connected: AtomicBool::new(false) }
    }

    fn open(&self) -> DsResult<SerializedFileReader<File>> {
        let file = File::open(&self.path)?;
        SerializedFileReader::new(file).map_err(|e| DataSourceError::Backend(e.to_string()))
    }

    fn schema(&self) -> DsResult<TableRef> {
        self.schema.read().unwrap().clone().ok_or(DataSourceError::NotConnected)
    }
}

fn column_type(physical: PhysicalType) -> ColumnType {
    match physical {
        PhysicalType::BOOLEAN => ColumnType::Boolean,
        PhysicalType::INT32 => ColumnType::Int,
        PhysicalType::INT64 => ColumnType::BigInt,
        PhysicalType::FLOAT => ColumnType::Float,
        PhysicalType::DOUBLE => ColumnType::Double,
        PhysicalType::BYTE_ARRAY | PhysicalType::FIXED_LEN_BYTE_ARRAY => ColumnType::VarChar,
        PhysicalType::INT96 => ColumnType::DateTime,
    }
}

impl DataSource for ParquetDataSource {
    fn connect(&self) -> DsResult<()> {
        let reader = self.open()?;
        let descriptor = reader.metadata().file_metadata().schema_descr();
        let columns = descriptor
            .columns()
            .iter()
            .map(|col| Column::new(col.name().to_string(), column_type(col.physical_type())))
            .collect();
        let table = Table::new(self.table_name.clone(), columns).map_err(DataSourceError::Constraint)?;
        *self.schema.write().unwrap() = Some(std::sync::Arc::new(table));
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
        let reader = self.open()?;
        let row_count_hint = Some(reader.metadata().file_metadata().num_rows().max(0) as u64);
        Ok(TableInfo { name: table.to_string(), schema: self.schema()?, row_count_hint })
    }

    fn query(&self, table: &str, options: &QueryOptions) -> DsResult<Vec<Row>> {
        if table != self.table_name {
            return Err(DataSourceError::UnknownTable(table.to_string()));
        }
        let schema = self.schema()?;
        let reader = self.open()?;
        let column_names = schema.column_names();
        let requested: Vec<String> = options.columns.clone().unwrap_or_else(|| column_names.clone());

        let iter = reader.get_row_iter(None).map_err(|e| DataSourceError::Backend(e.to_string()))?;
        let mut rows = Vec::new();
        for record in iter {
            let record = record.map_err(|e| DataSourceError::Backend(e.to_string()))?;
            let mut builder = RowBuilder::new();
            for name in &requested {
                let Some(index) = column_names.iter().position(|c| c == name) else {
                    builder.push(name.clone(), Value::Null);
                    continue;
                };
                let column_type = schema.column(name).map(|c| c.data_type).unwrap_or(ColumnType::VarChar);
                let value = parquet_field(&record, index, column_type);
                builder.push(name.clone(), value);
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

/// Reads one field by index and declared type. `RowAccessor`'s getters
/// return an error both for a type mismatch and for a null field (the
/// underlying `Field::Null` doesn't match any getter's expected
/// variant), so either case falls back to SQL NULL.
fn parquet_field(record: &parquet::record::Row, index: usize, column_type: ColumnType) -> Value {
    match column_type {
        ColumnType::Boolean => record.get_bool(index).map(Value::Bool).unwrap_or(Value::Null),
        ColumnType::Int | ColumnType::SmallInt | ColumnType::TinyInt => record.get_int(index).map(|v| Value::Int(v as i64)).unwrap_or(Value::Null),
        ColumnType::BigInt => record.get_long(index).map(Value::Int).unwrap_or(Value::Null),
        ColumnType::Float => record.get_float(index).map(|v| Value::Double(v as f64)).unwrap_or(Value::Null),
        ColumnType::Double => record.get_double(index).map(Value::Double).unwrap_or(Value::Null),
        ColumnType::DateTime | ColumnType::Date | ColumnType::Time | ColumnType::Timestamp => {
            record.get_long(index).map(Value::DateTime).unwrap_or(Value::Null)
        }
        _ => record.get_string(index).map(|s| Value::String(s.clone())).unwrap_or(Value::Null),
    }
}
