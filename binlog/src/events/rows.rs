use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};
use common::value::Value;

use crate::event_type::EventType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowsEventKind {
    Write,
    Update,
    Delete,
}

impl RowsEventKind {
    pub fn event_type(self) -> EventType {
        match self {
            RowsEventKind::Write => EventType::WriteRowsEventV2,
            RowsEventKind::Update => EventType::UpdateRowsEventV2,
            RowsEventKind::Delete => EventType::DeleteRowsEventV2,
        }
    }
}

/// A row-change event (INSERT/UPDATE/DELETE) carrying the table id it
/// applies to and the affected rows' values. `UPDATE` rows carry
/// before/after pairs; `WRITE`/`DELETE` carry a single row each.
#[derive(Debug, Clone)]
pub struct RowsEvent {
    pub kind: RowsEventKind,
    pub table_id: u64,
    pub rows: Vec<Vec<Value>>,
}

fn write_value(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(0),
        Value::Int(i) => {
            buf.push(1);
            buf.write_i64::<LittleEndian>(*i).unwrap();
        }
        Value::Double(d) => {
            buf.push(2);
            buf.write_f64::<LittleEndian>(*d).unwrap();
        }
        Value::String(s) => {
            buf.push(3);
            buf.write_u32::<LittleEndian>(s.len() as u32).unwrap();
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Bool(b) => {
            buf.push(4);
            buf.push(*b as u8);
        }
        Value::DateTime(ms) => {
            buf.push(5);
            buf.write_i64::<LittleEndian>(*ms).unwrap();
        }
        Value::Blob(b) => {
            buf.push(6);
            buf.write_u32::<LittleEndian>(b.len() as u32).unwrap();
            buf.extend_from_slice(b);
        }
    }
}

fn read_value(cursor: &mut &[u8]) -> CResult<Value> {
    let tag = cursor.read_u8()?;
    Ok(match tag {
        0 => Value::Null,
        1 => Value::Int(cursor.read_i64::<LittleEndian>()?),
        2 => Value::Double(cursor.read_f64::<LittleEndian>()?),
        3 => {
            let len = cursor.read_u32::<LittleEndian>()? as usize;
            let s = String::from_utf8_lossy(&cursor[..len]).into_owned();
            *cursor = &cursor[len..];
            Value::String(s)
        }
        4 => Value::Bool(cursor.read_u8()? != 0),
        5 => Value::DateTime(cursor.read_i64::<LittleEndian>()?),
        6 => {
            let len = cursor.read_u32::<LittleEndian>()? as usize;
            let b = cursor[..len].to_vec();
            *cursor = &cursor[len..];
            Value::Blob(b)
        }
        other => return Err(GatewayError::Protocol(format!("unknown row value tag {other}"))),
    })
}

impl RowsEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u48::<LittleEndian>(self.table_id).unwrap();
        buf.write_u32::<LittleEndian>(self.rows.len() as u32).unwrap();
        for row in &self.rows {
            buf.write_u32::<LittleEndian>(row.len() as u32).unwrap();
            for value in row {
                write_value(&mut buf, value);
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8], kind: RowsEventKind) -> CResult<Self> {
        let mut cursor = bytes;
        if cursor.len() < 10 {
            return Err(GatewayError::Protocol("truncated ROWS_EVENT".into()));
        }
        let table_id = cursor.read_u48::<LittleEndian>()?;
        let row_count = cursor.read_u32::<LittleEndian>()? as usize;
        let mut rows = Vec::with_capacity(row_count);
        for _ in 0..row_count {
            let col_count = cursor.read_u32::<LittleEndian>()? as usize;
            let mut row = Vec::with_capacity(col_count);
            for _ in 0..col_count {
                row.push(read_value(&mut cursor)?);
            }
            rows.push(row);
        }
        Ok(RowsEvent { kind, table_id, rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_write_rows() {
        let event = RowsEvent {
            kind: RowsEventKind::Write,
            table_id: 1,
            rows: vec![vec![Value::Int(1), Value::String("a".into())], vec![
                Value::Int(2),
                Value::Null,
            ]],
        };
        let decoded = RowsEvent::decode(&event.encode(), RowsEventKind::Write).unwrap();
        assert_eq!(decoded.rows.len(), 2);
        assert_eq!(decoded.rows[1][1], Value::Null);
    }
}
