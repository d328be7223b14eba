use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

/// Signals the end of the current binlog file and names its successor.
#[derive(Debug, Clone)]
pub struct RotateEvent {
    pub next_position: u64,
    pub next_file_name: String,
}

impl RotateEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(self.next_position).unwrap();
        buf.extend_from_slice(self.next_file_name.as_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 8 {
            return Err(GatewayError::Protocol("truncated ROTATE_EVENT".into()));
        }
        let mut cursor = bytes;
        let next_position = cursor.read_u64::<LittleEndian>()?;
        let next_file_name = String::from_utf8_lossy(cursor).into_owned();
        Ok(RotateEvent { next_position, next_file_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let event = RotateEvent { next_position: 4, next_file_name: "bin.000002".into() };
        let decoded = RotateEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded.next_position, 4);
        assert_eq!(decoded.next_file_name, "bin.000002");
    }
}
