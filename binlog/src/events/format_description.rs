use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

use crate::checksum::CHECKSUM_ALG_DESC_LEN;

/// The first event of every binlog: describes the binlog format version
/// and the checksum algorithm in use, per the six end-to-end scenarios
/// (scenario 6: REGISTER_SLAVE/BINLOG_DUMP's first event is this one).
#[derive(Debug, Clone)]
pub struct FormatDescriptionEvent {
    pub binlog_version: u16,
    pub server_version: String,
    pub create_timestamp: u32,
    pub header_length: u8,
    pub checksum_algorithm: u8,
}

impl Default for FormatDescriptionEvent {
    fn default() -> Self {
        FormatDescriptionEvent {
            binlog_version: 4,
            server_version: "8.0.34-gateway".to_string(),
            create_timestamp: 0,
            header_length: crate::header::HEADER_LEN as u8,
            checksum_algorithm: 1, // CRC32, per the mandatory-checksum design note
        }
    }
}

impl FormatDescriptionEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(self.binlog_version).unwrap();
        let mut version_bytes = [0u8; 50];
        let src = self.server_version.as_bytes();
        let len = src.len().min(49);
        version_bytes[..len].copy_from_slice(&src[..len]);
        buf.extend_from_slice(&version_bytes);
        buf.write_u32::<LittleEndian>(self.create_timestamp).unwrap();
        buf.write_u8(self.header_length).unwrap();
        // Post-header lengths for each event type are omitted: this
        // gateway's replicas only need the checksum algorithm byte that
        // trails the fixed FORMAT_DESCRIPTION payload.
        buf.write_u8(CHECKSUM_ALG_DESC_LEN as u8).unwrap();
        buf.write_u8(self.checksum_algorithm).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 57 {
            return Err(GatewayError::Protocol("truncated FORMAT_DESCRIPTION_EVENT".into()));
        }
        let mut cursor = bytes;
        let binlog_version = cursor.read_u16::<LittleEndian>()?;
        let version_bytes = &cursor[..50];
        cursor = &cursor[50..];
        let end = version_bytes.iter().position(|&b| b == 0).unwrap_or(version_bytes.len());
        let server_version = String::from_utf8_lossy(&version_bytes[..end]).into_owned();
        let create_timestamp = cursor.read_u32::<LittleEndian>()?;
        let header_length = cursor.read_u8()?;
        let _desc_len = cursor.read_u8()?;
        let checksum_algorithm = cursor.read_u8().unwrap_or(0);
        Ok(FormatDescriptionEvent {
            binlog_version,
            server_version,
            create_timestamp,
            header_length,
            checksum_algorithm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let event = FormatDescriptionEvent::default();
        let decoded = FormatDescriptionEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded.binlog_version, 4);
        assert_eq!(decoded.server_version, "8.0.34-gateway");
        assert_eq!(decoded.checksum_algorithm, 1);
    }
}
