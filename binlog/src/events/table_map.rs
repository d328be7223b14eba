use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

/// Maps a numeric table id to a schema/table name and its column-type
/// byte list, so a following ROWS event can be decoded without a
/// separate schema lookup.
#[derive(Debug, Clone)]
pub struct TableMapEvent {
    pub table_id: u64,
    pub database: String,
    pub table: String,
    pub column_types: Vec<u8>,
}

impl TableMapEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u48::<LittleEndian>(self.table_id).unwrap();
        buf.write_u16::<LittleEndian>(0).unwrap(); // flags
        buf.write_u8(self.database.len() as u8).unwrap();
        buf.extend_from_slice(self.database.as_bytes());
        buf.push(0);
        buf.write_u8(self.table.len() as u8).unwrap();
        buf.extend_from_slice(self.table.as_bytes());
        buf.push(0);
        buf.write_u8(self.column_types.len() as u8).unwrap();
        buf.extend_from_slice(&self.column_types);
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        let mut cursor = bytes;
        if cursor.len() < 9 {
            return Err(GatewayError::Protocol("truncated TABLE_MAP_EVENT".into()));
        }
        let table_id = cursor.read_u48::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let db_len = cursor.read_u8()? as usize;
        let database = String::from_utf8_lossy(&cursor[..db_len]).into_owned();
        cursor = &cursor[db_len + 1..];
        let table_len = cursor.read_u8()? as usize;
        let table = String::from_utf8_lossy(&cursor[..table_len]).into_owned();
        cursor = &cursor[table_len + 1..];
        let col_count = cursor.read_u8()? as usize;
        let column_types = cursor[..col_count.min(cursor.len())].to_vec();
        Ok(TableMapEvent { table_id, database, table, column_types })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let event = TableMapEvent {
            table_id: 99,
            database: "main".into(),
            table: "t".into(),
            column_types: vec![3, 15],
        };
        let decoded = TableMapEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded.table_id, 99);
        assert_eq!(decoded.table, "t");
        assert_eq!(decoded.column_types, vec![3, 15]);
    }
}
