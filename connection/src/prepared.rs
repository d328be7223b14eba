use common::err::{CResult, GatewayError};
use common::value::{ColumnType, Value};

use crate::packet::binary_row::NULL_BITMAP_OFFSET;
use crate::packet::codec::{null_bitmap_get, null_bitmap_len};

pub const COM_STMT_EXECUTE_HEADER_LEN: usize = 9; // statement_id(4) + flags(1) + iteration_count(4)

#[derive(Debug, Clone)]
pub struct StmtExecuteRequest {
    pub statement_id: u32,
    pub params: Vec<Value>,
}

/// Decodes a COM_STMT_EXECUTE payload given how many parameters the
/// referenced prepared statement expects, honoring the bound-types
/// flag that lets a client retype parameters across executions of the
/// same statement.
pub fn decode_stmt_execute(payload: &[u8], param_count: usize) -> CResult<StmtExecuteRequest> {
    if payload.len() < COM_STMT_EXECUTE_HEADER_LEN {
        return Err(GatewayError::Protocol("truncated COM_STMT_EXECUTE".into()));
    }
    let statement_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    let mut pos = COM_STMT_EXECUTE_HEADER_LEN;

    if param_count == 0 {
        return Ok(StmtExecuteRequest { statement_id, params: Vec::new() });
    }

    let bitmap_len = null_bitmap_len(param_count, NULL_BITMAP_OFFSET);
    let bitmap = payload
        .get(pos..pos + bitmap_len)
        .ok_or_else(|| GatewayError::Protocol("truncated parameter null bitmap".into()))?;
    pos += bitmap_len;

    let new_params_bound = *payload.get(pos).ok_or_else(|| GatewayError::Protocol("truncated new-params-bound flag".into()))?;
    pos += 1;

    let mut param_types = Vec::with_capacity(param_count);
    if new_params_bound == 1 {
        for _ in 0..param_count {
            let type_byte = *payload.get(pos).ok_or_else(|| GatewayError::Protocol("truncated parameter type".into()))?;
            param_types.push(wire_type_to_column_type(type_byte));
            pos += 2; // type byte + unsigned flag byte
        }
    } else {
        return Err(GatewayError::UnsupportedConstruct(
            "COM_STMT_EXECUTE without freshly bound parameter types is not supported".into(),
        ));
    }

    let mut params = Vec::with_capacity(param_count);
    for i in 0..param_count {
        if null_bitmap_get(bitmap, i, NULL_BITMAP_OFFSET) {
            params.push(Value::Null);
            continue;
        }
        let (value, consumed) = decode_binary_value(&payload[pos..], param_types[i])?;
        params.push(value);
        pos += consumed;
    }

    Ok(StmtExecuteRequest { statement_id, params })
}

fn wire_type_to_column_type(byte: u8) -> ColumnType {
    match byte {
        0x01 => ColumnType::TinyInt,
        0x02 => ColumnType::SmallInt,
        0x03 => ColumnType::Int,
        0x08 => ColumnType::BigInt,
        0x04 => ColumnType::Float,
        0x05 => ColumnType::Double,
        0x0f | 0xfd => ColumnType::VarChar,
        0xfc => ColumnType::Blob,
        0x0c => ColumnType::DateTime,
        0x0a => ColumnType::Date,
        _ => ColumnType::VarChar,
    }
}

fn decode_binary_value(bytes: &[u8], column_type: ColumnType) -> CResult<(Value, usize)> {
    let err = || GatewayError::Protocol("truncated parameter value".into());
    match column_type {
        ColumnType::TinyInt | ColumnType::Boolean => Ok((Value::Int(*bytes.first().ok_or_else(err)? as i64), 1)),
        ColumnType::SmallInt => {
            let b = bytes.get(0..2).ok_or_else(err)?;
            Ok((Value::Int(i16::from_le_bytes([b[0], b[1]]) as i64), 2))
        }
        ColumnType::Int => {
            let b = bytes.get(0..4).ok_or_else(err)?;
            Ok((Value::Int(i32::from_le_bytes(b.try_into().unwrap()) as i64), 4))
        }
        ColumnType::BigInt => {
            let b = bytes.get(0..8).ok_or_else(err)?;
            Ok((Value::Int(i64::from_le_bytes(b.try_into().unwrap())), 8))
        }
        ColumnType::Float => {
            let b = bytes.get(0..4).ok_or_else(err)?;
            Ok((Value::Double(f32::from_le_bytes(b.try_into().unwrap()) as f64), 4))
        }
        ColumnType::Double => {
            let b = bytes.get(0..8).ok_or_else(err)?;
            Ok((Value::Double(f64::from_le_bytes(b.try_into().unwrap())), 8))
        }
        ColumnType::Date | ColumnType::DateTime | ColumnType::Timestamp | ColumnType::Time => {
            let len = *bytes.first().ok_or_else(err)? as usize;
            if len == 0 {
                return Ok((Value::DateTime(0), 1));
            }
            Ok((Value::DateTime(0), 1 + len))
        }
        _ => {
            let (len, len_size) = read_len_enc_prefix(bytes)?;
            let data = bytes.get(len_size..len_size + len).ok_or_else(err)?;
            Ok((Value::String(String::from_utf8_lossy(data).into_owned()), len_size + len))
        }
    }
}

fn read_len_enc_prefix(bytes: &[u8]) -> CResult<(usize, usize)> {
    let first = *bytes.first().ok_or_else(|| GatewayError::Protocol("truncated length prefix".into()))?;
    match first {
        0xfc => {
            let b = bytes.get(1..3).ok_or_else(|| GatewayError::Protocol("truncated length prefix".into()))?;
            Ok((u16::from_le_bytes([b[0], b[1]]) as usize, 3))
        }
        0xfd => {
            let b = bytes.get(1..4).ok_or_else(|| GatewayError::Protocol("truncated length prefix".into()))?;
            Ok((u32::from_le_bytes([b[0], b[1], b[2], 0]) as usize, 4))
        }
        0xfe => {
            let b = bytes.get(1..9).ok_or_else(|| GatewayError::Protocol("truncated length prefix".into()))?;
            Ok((u64::from_le_bytes(b.try_into().unwrap()) as usize, 9))
        }
        small => Ok((small as usize, 1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_execute_payload(statement_id: u32, params: &[(ColumnType, Vec<u8>, bool)]) -> Vec<u8> {
        let mut buf = statement_id.to_le_bytes().to_vec();
        buf.push(0); // flags
        buf.extend_from_slice(&1u32.to_le_bytes()); // iteration_count

        let bitmap_len = null_bitmap_len(params.len(), NULL_BITMAP_OFFSET);
        let mut bitmap = vec![0u8; bitmap_len];
        for (i, (_, _, is_null)) in params.iter().enumerate() {
            if *is_null {
                bitmap[(i + NULL_BITMAP_OFFSET) / 8] |= 1 << ((i + NULL_BITMAP_OFFSET) % 8);
            }
        }
        buf.extend_from_slice(&bitmap);
        buf.push(1); // new-params-bound
        for (column_type, _, _) in params {
            buf.push(column_type_wire_byte(*column_type));
            buf.push(0);
        }
        for (_, bytes, is_null) in params {
            if !*is_null {
                buf.extend_from_slice(bytes);
            }
        }
        buf
    }

    fn column_type_wire_byte(t: ColumnType) -> u8 {
        match t {
            ColumnType::TinyInt | ColumnType::Boolean => 0x01,
            ColumnType::SmallInt => 0x02,
            ColumnType::Int => 0x03,
            ColumnType::BigInt => 0x08,
            ColumnType::Double => 0x05,
            _ => 0xfd,
        }
    }

    #[test]
    fn decodes_a_mix_of_null_and_typed_parameters() {
        let payload = build_execute_payload(
            7,
            &[(ColumnType::Int, 42i32.to_le_bytes().to_vec(), false), (ColumnType::VarChar, vec![], true)],
        );
        let request = decode_stmt_execute(&payload, 2).unwrap();
        assert_eq!(request.statement_id, 7);
        assert_eq!(request.params[0], Value::Int(42));
        assert_eq!(request.params[1], Value::Null);
    }

    #[test]
    fn zero_parameter_statement_skips_the_bitmap() {
        let payload = build_execute_payload(1, &[]);
        let request = decode_stmt_execute(&payload, 0).unwrap();
        assert!(request.params.is_empty());
    }
}
