use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

/// A DDL or transaction-control statement (BEGIN/COMMIT/CREATE TABLE/...)
/// replicated verbatim.
#[derive(Debug, Clone)]
pub struct QueryEvent {
    pub thread_id: u32,
    pub elapsed_secs: u32,
    pub error_code: u16,
    pub database: String,
    pub sql: String,
}

impl QueryEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(self.thread_id).unwrap();
        buf.write_u32::<LittleEndian>(self.elapsed_secs).unwrap();
        buf.write_u8(self.database.len() as u8).unwrap();
        buf.write_u16::<LittleEndian>(self.error_code).unwrap();
        // status-variable block length, always empty here.
        buf.write_u16::<LittleEndian>(0).unwrap();
        buf.extend_from_slice(self.database.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.sql.as_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 13 {
            return Err(GatewayError::Protocol("truncated QUERY_EVENT".into()));
        }
        let mut cursor = bytes;
        let thread_id = cursor.read_u32::<LittleEndian>()?;
        let elapsed_secs = cursor.read_u32::<LittleEndian>()?;
        let db_len = cursor.read_u8()? as usize;
        let error_code = cursor.read_u16::<LittleEndian>()?;
        let status_var_len = cursor.read_u16::<LittleEndian>()? as usize;
        if cursor.len() < status_var_len + db_len + 1 {
            return Err(GatewayError::Protocol("truncated QUERY_EVENT body".into()));
        }
        cursor = &cursor[status_var_len..];
        let database = String::from_utf8_lossy(&cursor[..db_len]).into_owned();
        cursor = &cursor[db_len + 1..]; // skip the database name's NUL terminator
        let sql = String::from_utf8_lossy(cursor).into_owned();
        Ok(QueryEvent { thread_id, elapsed_secs, error_code, database, sql })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let event = QueryEvent {
            thread_id: 7,
            elapsed_secs: 0,
            error_code: 0,
            database: "main".into(),
            sql: "CREATE TABLE t (id INT)".into(),
        };
        let decoded = QueryEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded.database, "main");
        assert_eq!(decoded.sql, "CREATE TABLE t (id INT)");
    }
}
