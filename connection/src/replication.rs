use binlog::encode::{initial_format_description, wrap_dump_packet};
use binlog::ChecksumType;
use common::err::{CResult, GatewayError};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::packet::codec::{read_len_enc_string, write_packet};

/// The REGISTER_SLAVE command's fixed-then-variable payload.
#[derive(Debug, Clone)]
pub struct RegisterSlaveRequest {
    pub server_id: u32,
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub port: u16,
}

impl RegisterSlaveRequest {
    pub fn decode(payload: &[u8]) -> CResult<Self> {
        if payload.len() < 4 {
            return Err(GatewayError::Protocol("truncated REGISTER_SLAVE".into()));
        }
        let server_id = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let mut pos = 4;
        let hostname = read_len_enc_string(payload, &mut pos)?;
        let username = read_len_enc_string(payload, &mut pos)?;
        let password = read_len_enc_string(payload, &mut pos)?;
        let port = u16::from_le_bytes(payload.get(pos..pos + 2).ok_or_else(|| GatewayError::Protocol("truncated REGISTER_SLAVE port".into()))?.try_into().unwrap());
        Ok(RegisterSlaveRequest { server_id, hostname, username, password, port })
    }
}

/// The BINLOG_DUMP command's payload: starting position, dump flags,
/// the replica's own server id and the binlog file it wants to tail.
#[derive(Debug, Clone)]
pub struct BinlogDumpRequest {
    pub position: u32,
    pub flags: u16,
    pub server_id: u32,
    pub filename: String,
}

/// Set when the replica does not want the server to block waiting for
/// new events once it catches up; this gateway always behaves as if it
/// were set, since no persisted log exists to tail.
pub const BINLOG_DUMP_NON_BLOCK: u16 = 0x0001;

impl BinlogDumpRequest {
    pub fn decode(payload: &[u8]) -> CResult<Self> {
        if payload.len() < 10 {
            return Err(GatewayError::Protocol("truncated BINLOG_DUMP".into()));
        }
        let position = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let flags = u16::from_le_bytes([payload[4], payload[5]]);
        let server_id = u32::from_le_bytes([payload[6], payload[7], payload[8], payload[9]]);
        let filename = String::from_utf8_lossy(&payload[10..]).into_owned();
        Ok(BinlogDumpRequest { position, flags, server_id, filename })
    }
}

/// Streams the mandatory FORMAT_DESCRIPTION_EVENT and then closes the
/// stream with an EOF packet: this gateway never persists a relay log,
/// so it has nothing further to tail regardless of the dump flags.
pub async fn handle_binlog_dump<W>(
    stream: &mut W,
    mut seq: u8,
    request: &BinlogDumpRequest,
    checksum: ChecksumType,
) -> CResult<()>
where
    W: AsyncWriteExt + Unpin,
{
    info!(file = %request.filename, position = request.position, "starting binlog dump");
    let event = initial_format_description(request.server_id, request.position, checksum);
    seq = write_packet(stream, &wrap_dump_packet(&event), seq).await?;
    write_packet(stream, &[0xfe, 0x00, 0x00], seq).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_the_fixed_binlog_dump_header() {
        let mut payload = vec![4, 0, 0, 0]; // position 4
        payload.extend_from_slice(&0u16.to_le_bytes());
        payload.extend_from_slice(&7u32.to_le_bytes());
        payload.extend_from_slice(b"bin.000001");
        let request = BinlogDumpRequest::decode(&payload).unwrap();
        assert_eq!(request.position, 4);
        assert_eq!(request.filename, "bin.000001");
    }
}
