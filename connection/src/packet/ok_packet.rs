use crate::declar::StatusFlags;
use crate::packet::codec::write_len_enc_int;

pub const OK_HEADER: u8 = 0x00;

/// Sent after any command that succeeds without returning a result set.
#[derive(Debug, Clone)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: StatusFlags,
    pub warnings: u16,
    pub info: String,
}

impl OkPacket {
    pub fn new(affected_rows: u64, last_insert_id: u64, status_flags: StatusFlags) -> Self {
        OkPacket { affected_rows, last_insert_id, status_flags, warnings: 0, info: String::new() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![OK_HEADER];
        write_len_enc_int(&mut buf, self.affected_rows);
        write_len_enc_int(&mut buf, self.last_insert_id);
        buf.extend_from_slice(&self.status_flags.bits().to_le_bytes());
        buf.extend_from_slice(&self.warnings.to_le_bytes());
        buf.extend_from_slice(self.info.as_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_ok_header() {
        let packet = OkPacket::new(3, 0, StatusFlags::SERVER_STATUS_AUTOCOMMIT);
        let bytes = packet.encode();
        assert_eq!(bytes[0], OK_HEADER);
    }
}
