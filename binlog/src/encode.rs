//! Helpers for the replication sub-protocol's BINLOG_DUMP loop: every
//! streamed packet carries a leading `0x00` marker followed by one
//! binlog event (spec §4.1, scenario 6).

use crate::checksum::ChecksumType;
use crate::events::{BinlogEvent, EventBody, FormatDescriptionEvent};

/// The leading byte every BINLOG_DUMP response packet carries before the
/// event bytes.
pub const DUMP_PACKET_MARKER: u8 = 0x00;

pub fn wrap_dump_packet(event: &BinlogEvent) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + 64);
    out.push(DUMP_PACKET_MARKER);
    out.extend_from_slice(&event.encode());
    out
}

/// Builds the mandatory first event of any binlog stream: a
/// FORMAT_DESCRIPTION_EVENT reporting this server's checksum algorithm.
pub fn initial_format_description(server_id: u32, next_position: u32, checksum: ChecksumType) -> BinlogEvent {
    let body = FormatDescriptionEvent {
        checksum_algorithm: checksum.code(),
        ..FormatDescriptionEvent::default()
    };
    BinlogEvent::new(0, server_id, next_position, EventBody::FormatDescription(body), checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_packet_has_leading_marker() {
        let event = initial_format_description(1, 4, ChecksumType::Crc32);
        let packet = wrap_dump_packet(&event);
        assert_eq!(packet[0], DUMP_PACKET_MARKER);
        assert_eq!(packet.len(), 1 + event.encode().len());
    }
}
