use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

use crate::event_type::EventType;

/// Size of the fixed binlog event header, per the data model.
pub const HEADER_LEN: usize = 19;

/// The 19-byte header every binlog event carries: timestamp, event-type,
/// server-id, event-size, next-log-position, flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub timestamp: u32,
    pub event_type: EventType,
    pub server_id: u32,
    /// Total event size: header + body (+ checksum trailer, if enabled).
    pub event_size: u32,
    pub next_position: u32,
    pub flags: u16,
}

impl Header {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.write_u32::<LittleEndian>(self.timestamp).unwrap();
        buf.write_u8(self.event_type.code()).unwrap();
        buf.write_u32::<LittleEndian>(self.server_id).unwrap();
        buf.write_u32::<LittleEndian>(self.event_size).unwrap();
        buf.write_u32::<LittleEndian>(self.next_position).unwrap();
        buf.write_u16::<LittleEndian>(self.flags).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(GatewayError::Protocol(format!(
                "binlog event header needs {HEADER_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut cursor = bytes;
        let timestamp = cursor.read_u32::<LittleEndian>()?;
        let event_type = EventType::from_code(cursor.read_u8()?);
        let server_id = cursor.read_u32::<LittleEndian>()?;
        let event_size = cursor.read_u32::<LittleEndian>()?;
        let next_position = cursor.read_u32::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        Ok(Header { timestamp, event_type, server_id, event_size, next_position, flags })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header {
            timestamp: 100,
            event_type: EventType::FormatDescriptionEvent,
            server_id: 1,
            event_size: 91,
            next_position: 123,
            flags: 0,
        };
        let bytes = header.encode();
        assert_eq!(bytes.len(), HEADER_LEN);
        let decoded = Header::decode(&bytes).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert!(Header::decode(&[0u8; 10]).is_err());
    }
}
