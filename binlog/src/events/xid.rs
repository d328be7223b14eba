use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::err::{CResult, GatewayError};

/// Marks the commit of a transaction by its internal transaction id.
#[derive(Debug, Clone)]
pub struct XidEvent {
    pub xid: u64,
}

impl XidEvent {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u64::<LittleEndian>(self.xid).unwrap();
        buf
    }

    pub fn decode(bytes: &[u8]) -> CResult<Self> {
        if bytes.len() < 8 {
            return Err(GatewayError::Protocol("truncated XID_EVENT".into()));
        }
        let mut cursor = bytes;
        Ok(XidEvent { xid: cursor.read_u64::<LittleEndian>()? })
    }
}
