use common::value::ColumnType;

use crate::declar::ColumnFlags;
use crate::packet::codec::write_len_enc_string;

/// The protocol-41 column-definition packet describing one field of a
/// result set.
#[derive(Debug, Clone)]
pub struct ColumnDefPacket {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub column_type: ColumnType,
    pub flags: ColumnFlags,
    pub decimals: u8,
}

impl ColumnDefPacket {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnDefPacket {
            schema: String::new(),
            table: String::new(),
            name: name.into(),
            column_type,
            flags: ColumnFlags::empty(),
            decimals: 0,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_len_enc_string(&mut buf, "def");
        write_len_enc_string(&mut buf, &self.schema);
        write_len_enc_string(&mut buf, &self.table);
        write_len_enc_string(&mut buf, &self.table);
        write_len_enc_string(&mut buf, &self.name);
        write_len_enc_string(&mut buf, &self.name);
        buf.push(0x0c); // length of the fixed-length fields that follow
        buf.extend_from_slice(&45u16.to_le_bytes()); // utf8mb4_general_ci
        buf.extend_from_slice(&column_display_length(self.column_type).to_le_bytes());
        buf.push(self.column_type.wire_type());
        buf.extend_from_slice(&self.flags.bits().to_le_bytes());
        buf.push(self.decimals);
        buf.extend_from_slice(&[0u8; 2]); // filler
        buf
    }
}

fn column_display_length(column_type: ColumnType) -> u32 {
    match column_type {
        ColumnType::Boolean | ColumnType::TinyInt => 4,
        ColumnType::SmallInt => 6,
        ColumnType::Int => 11,
        ColumnType::BigInt => 20,
        ColumnType::Float => 12,
        ColumnType::Double | ColumnType::Decimal => 22,
        ColumnType::Date => 10,
        ColumnType::Time => 10,
        ColumnType::DateTime | ColumnType::Timestamp => 19,
        ColumnType::VarChar | ColumnType::Text | ColumnType::Json => 1024,
        ColumnType::Blob => 65535,
        ColumnType::Null => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_wire_type_byte() {
        let packet = ColumnDefPacket::new("id", ColumnType::BigInt);
        let bytes = packet.encode();
        assert_eq!(*bytes.last().unwrap(), 0);
        assert!(bytes.len() > 10);
    }
}
