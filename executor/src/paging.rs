use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use common::{Row, RowBuilder, Value};
use serde::{Deserialize, Serialize};

use crate::error::ExecResult;

/// Row shape serializable independently of [`common::Row`], which has no
/// `serde` impl of its own (its `Arc<[String]>` column list is shared
/// across every row of a result and isn't meant to round-trip through a
/// format built for one row at a time).
#[derive(Serialize, Deserialize)]
struct SpilledRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl From<&Row> for SpilledRow {
    fn from(row: &Row) -> Self {
        SpilledRow { columns: row.columns().to_vec(), values: row.values().to_vec() }
    }
}

impl From<SpilledRow> for Row {
    fn from(spilled: SpilledRow) -> Self {
        let mut builder = RowBuilder::new();
        for (column, value) in spilled.columns.into_iter().zip(spilled.values) {
            builder.push(column, value);
        }
        builder.build()
    }
}

/// The paging subsystem's configuration: a byte budget for in-memory row
/// materialization before an operator starts spilling to disk, and the
/// directory spilled pages land in. `budget_bytes: None` disables
/// paging — operators just keep accumulating in process memory.
#[derive(Debug, Clone)]
pub struct PagingConfig {
    pub budget_bytes: Option<usize>,
    pub spill_dir: PathBuf,
}

impl Default for PagingConfig {
    fn default() -> Self {
        PagingConfig { budget_bytes: None, spill_dir: std::env::temp_dir() }
    }
}

/// A rough per-row size estimate used only to decide when to spill, not
/// an exact byte count.
fn estimate_row_bytes(row: &Row) -> usize {
    row.values().iter().map(value_bytes).sum::<usize>() + row.columns().len() * 16
}

fn value_bytes(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 1,
        Value::Int(_) | Value::Double(_) | Value::DateTime(_) => 8,
        Value::String(s) => s.len(),
        Value::Blob(b) => b.len(),
    }
}

/// Accumulates rows for an operator that needs the whole input before it
/// can produce output (Sort, HashAggregate, a hash join's build side).
/// Below the configured budget, rows simply stay in a `Vec`; crossing it
/// flushes the buffer to a length-prefix-free, line-delimited spill file
/// and resets the in-memory vector, so peak memory stays bounded by the
/// budget rather than by the operator's total input size.
pub struct RowBuffer {
    budget_bytes: Option<usize>,
    spill_dir: PathBuf,
    in_memory: Vec<Row>,
    in_memory_bytes: usize,
    spill_files: Vec<PathBuf>,
}

impl RowBuffer {
    pub fn new(config: &PagingConfig) -> Self {
        RowBuffer { budget_bytes: config.budget_bytes, spill_dir: config.spill_dir.clone(), in_memory: Vec::new(), in_memory_bytes: 0, spill_files: Vec::new() }
    }

    pub fn push(&mut self, row: Row) -> ExecResult<()> {
        self.in_memory_bytes += estimate_row_bytes(&row);
        self.in_memory.push(row);
        if let Some(budget) = self.budget_bytes {
            if self.in_memory_bytes >= budget {
                self.spill()?;
            }
        }
        Ok(())
    }

    fn spill(&mut self) -> ExecResult<()> {
        let path = self.spill_dir.join(format!("gateway-spill-{:x}.ndjson", spill_id()));
        tracing::debug!(path = %path.display(), rows = self.in_memory.len(), "spilling row buffer to disk");
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        for row in self.in_memory.drain(..) {
            let encoded = serde_json::to_string(&SpilledRow::from(&row)).map_err(|e| crate::error::ExecError::TypeError(e.to_string()))?;
            writeln!(writer, "{encoded}")?;
        }
        writer.flush()?;
        self.in_memory_bytes = 0;
        self.spill_files.push(path);
        Ok(())
    }

    /// Drains every buffered row, in-memory rows first then each spilled
    /// page in the order it was written, removing spill files as they're
    /// consumed.
    pub fn drain(mut self) -> ExecResult<Vec<Row>> {
        let mut rows = std::mem::take(&mut self.in_memory);
        for path in self.spill_files.drain(..) {
            rows.extend(read_spill_file(&path)?);
            let _ = std::fs::remove_file(&path);
        }
        Ok(rows)
    }

    pub fn len_hint(&self) -> usize {
        self.in_memory.len()
    }
}

fn read_spill_file(path: &Path) -> ExecResult<Vec<Row>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut rows = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let spilled: SpilledRow = serde_json::from_str(&line).map_err(|e| crate::error::ExecError::TypeError(e.to_string()))?;
        rows.push(Row::from(spilled));
    }
    Ok(rows)
}

/// A process-unique-enough id for a spill file name. Not a hash of
/// anything meaningful — just avoids collisions between concurrently
/// spilling operators in the same temp directory.
fn spill_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_below_budget_never_spills() {
        let dir = tempfile::tempdir().unwrap();
        let config = PagingConfig { budget_bytes: Some(1_000_000), spill_dir: dir.path().to_path_buf() };
        let mut buffer = RowBuffer::new(&config);
        let mut builder = RowBuilder::new();
        builder.push("id", Value::Int(1));
        buffer.push(builder.build()).unwrap();
        assert!(buffer.spill_files.is_empty());
        let rows = buffer.drain().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn buffer_spills_and_drains_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = PagingConfig { budget_bytes: Some(1), spill_dir: dir.path().to_path_buf() };
        let mut buffer = RowBuffer::new(&config);
        for i in 0..20 {
            let mut builder = RowBuilder::new();
            builder.push("id", Value::Int(i));
            buffer.push(builder.build()).unwrap();
        }
        assert!(!buffer.spill_files.is_empty());
        let rows = buffer.drain().unwrap();
        assert_eq!(rows.len(), 20);
    }
}
