use byteorder::{ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

/// A GTID assigned to the following transaction: a 16-byte source UUID
/// plus a monotonic per-source transaction number.
#[derive(Debug, Clone)]
pub struct GtidLogEvent {
    pub commit_flag: u8,
    pub source_uuid: [u8; 16],
    pub transaction_id: u64,
}

impl GtidLogEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u8(self.commit_flag).unwrap();
        buf.extend_from_slice(&self.source_uuid);
        buf.extend_from_slice(&self.transaction_id.to_le_bytes());
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 25 {
            return Err(GatewayError::Protocol("truncated GTID_LOG_EVENT".into()));
        }
        let mut cursor = bytes;
        let commit_flag = cursor.read_u8()?;
        let mut source_uuid = [0u8; 16];
        source_uuid.copy_from_slice(&cursor[..16]);
        cursor = &cursor[16..];
        let mut txn_bytes = [0u8; 8];
        txn_bytes.copy_from_slice(&cursor[..8]);
        let transaction_id = u64::from_le_bytes(txn_bytes);
        Ok(GtidLogEvent { commit_flag, source_uuid, transaction_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let event = GtidLogEvent { commit_flag: 1, source_uuid: [7; 16], transaction_id: 42 };
        let decoded = GtidLogEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded.transaction_id, 42);
        assert_eq!(decoded.source_uuid, [7; 16]);
    }
}
