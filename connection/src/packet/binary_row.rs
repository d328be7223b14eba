use chrono::{Datelike, NaiveDateTime, Timelike};
use common::value::{ColumnType, Value};

use crate::packet::codec::{null_bitmap_len, null_bitmap_set, write_len_enc_string};

/// NULL-bitmap bit offset for binary-protocol rows and STMT_EXECUTE
/// parameters alike: the first two bits are reserved.
pub const NULL_BITMAP_OFFSET: usize = 2;

/// Encodes one row of the binary result-set protocol used by
/// COM_STMT_EXECUTE: a leading `0x00` packet header, a NULL bitmap, then
/// each non-null value in its type-specific binary form.
pub fn encode_binary_row(column_types: &[ColumnType], values: &[Value]) -> Vec<u8> {
    let mut buf = vec![0x00u8];
    let mut bitmap = vec![0u8; null_bitmap_len(values.len(), NULL_BITMAP_OFFSET)];
    for (i, value) in values.iter().enumerate() {
        if matches!(value, Value::Null) {
            null_bitmap_set(&mut bitmap, i, NULL_BITMAP_OFFSET);
        }
    }
    buf.extend_from_slice(&bitmap);

    for (value, column_type) in values.iter().zip(column_types.iter()) {
        if matches!(value, Value::Null) {
            continue;
        }
        encode_binary_value(&mut buf, value, *column_type);
    }
    buf
}

fn encode_binary_value(buf: &mut Vec<u8>, value: &Value, column_type: ColumnType) {
    match column_type {
        ColumnType::Boolean | ColumnType::TinyInt => buf.push(value.as_f64().unwrap_or(0.0) as i64 as u8),
        ColumnType::SmallInt => buf.extend_from_slice(&(value.as_f64().unwrap_or(0.0) as i64 as i16).to_le_bytes()),
        ColumnType::Int => buf.extend_from_slice(&(value.as_f64().unwrap_or(0.0) as i64 as i32).to_le_bytes()),
        ColumnType::BigInt => buf.extend_from_slice(&(value.as_f64().unwrap_or(0.0) as i64).to_le_bytes()),
        ColumnType::Float => buf.extend_from_slice(&(value.as_f64().unwrap_or(0.0) as f32).to_le_bytes()),
        ColumnType::Double => buf.extend_from_slice(&value.as_f64().unwrap_or(0.0).to_le_bytes()),
        ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Date | ColumnType::Time => {
            encode_binary_datetime(buf, value)
        }
        ColumnType::Decimal | ColumnType::VarChar | ColumnType::Text | ColumnType::Blob | ColumnType::Json => {
            write_len_enc_string(buf, &value.as_str_lossy())
        }
        ColumnType::Null => {}
    }
}

/// Encodes a timestamp as MySQL's variable-length binary date: a
/// leading length byte (0, 4, 7 or 11) followed by year/month/day and
/// optionally hour/minute/second/microsecond. This gateway always emits
/// the 7-byte form (no microsecond precision) for non-zero timestamps.
fn encode_binary_datetime(buf: &mut Vec<u8>, value: &Value) {
    let millis = match value {
        Value::DateTime(ms) => *ms,
        _ => 0,
    };
    if millis == 0 {
        buf.push(0);
        return;
    }
    let Some(datetime) = NaiveDateTime::from_timestamp_millis(millis) else {
        buf.push(0);
        return;
    };

    buf.push(7);
    buf.extend_from_slice(&(datetime.year() as u16).to_le_bytes());
    buf.push(datetime.month() as u8);
    buf.push(datetime.day() as u8);
    buf.push(datetime.hour() as u8);
    buf.push(datetime.minute() as u8);
    buf.push(datetime.second() as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_values_set_the_bitmap_and_are_skipped() {
        let types = [ColumnType::Int, ColumnType::VarChar];
        let values = [Value::Null, Value::String("hi".into())];
        let encoded = encode_binary_row(&types, &values);
        assert_eq!(encoded[0], 0x00);
        // bit 2 (index 0, offset 2) set in the first bitmap byte.
        assert_eq!(encoded[1] & 0b0000_0100, 0b0000_0100);
    }

    #[test]
    fn epoch_millis_encode_to_1970_01_01() {
        let mut buf = Vec::new();
        encode_binary_datetime(&mut buf, &Value::DateTime(60_000));
        assert_eq!(buf, vec![7, 0xB2, 0x07, 1, 1, 0, 1, 0]);
    }
}
