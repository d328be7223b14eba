mod format_description;
mod gtid;
mod query;
mod rotate;
mod rows;
mod table_map;
mod xid;

pub use format_description::FormatDescriptionEvent;
pub use gtid::GtidLogEvent;
pub use query::QueryEvent;
pub use rotate::RotateEvent;
pub use rows::{RowsEvent, RowsEventKind};
pub use table_map::TableMapEvent;
pub use xid::XidEvent;

use common::err::{CResult, GatewayError};

use crate::checksum::ChecksumType;
use crate::event_type::EventType;
use crate::header::{Header, HEADER_LEN};

/// The body of a binlog event, tagged by its wire event-type.
#[derive(Debug, Clone)]
pub enum EventBody {
    FormatDescription(FormatDescriptionEvent),
    Rotate(RotateEvent),
    Query(QueryEvent),
    TableMap(TableMapEvent),
    Rows(RowsEvent),
    Xid(XidEvent),
    Gtid(GtidLogEvent),
}

impl EventBody {
    pub fn event_type(&self) -> EventType {
        match self {
            EventBody::FormatDescription(_) => EventType::FormatDescriptionEvent,
            EventBody::Rotate(_) => EventType::RotateEvent,
            EventBody::Query(_) => EventType::QueryEvent,
            EventBody::TableMap(_) => EventType::TableMapEvent,
            EventBody::Rows(r) => r.kind.event_type(),
            EventBody::Xid(_) => EventType::XidEvent,
            EventBody::Gtid(_) => EventType::GtidLogEvent,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            EventBody::FormatDescription(e) => e.encode(),
            EventBody::Rotate(e) => e.encode(),
            EventBody::Query(e) => e.encode(),
            EventBody::TableMap(e) => e.encode(),
            EventBody::Rows(e) => e.encode(),
            EventBody::Xid(e) => e.encode(),
            EventBody::Gtid(e) => e.encode(),
        }
    }
}

/// A complete binlog event: header, type-specific body, and an optional
/// CRC32 trailer when the server's checksum setting is CRC32.
#[derive(Debug, Clone)]
pub struct BinlogEvent {
    pub header: Header,
    pub body: EventBody,
    pub checksum: ChecksumType,
}

impl BinlogEvent {
    /// Builds an event; `header.event_size` is filled in correctly by
    /// [`Self::encode`], since it depends on the checksum trailer length.
    pub fn new(
        timestamp: u32,
        server_id: u32,
        next_position: u32,
        body: EventBody,
        checksum: ChecksumType,
    ) -> Self {
        BinlogEvent {
            header: Header {
                timestamp,
                event_type: body.event_type(),
                server_id,
                event_size: 0,
                next_position,
                flags: 0,
            },
            body,
            checksum,
        }
    }

    /// Serializes header + body + checksum trailer, maintaining the
    /// invariant that the header's `event_size` field equals the total
    /// encoded length of the event.
    pub fn encode(&self) -> Vec<u8> {
        let body_bytes = self.body.encode();
        let total_len = HEADER_LEN + body_bytes.len() + self.checksum.trailer_len();

        let mut header = self.header.clone();
        header.event_size = total_len as u32;

        let mut out = header.encode();
        out.extend_from_slice(&body_bytes);
        let trailer = self.checksum.compute(&out);
        out.extend_from_slice(&trailer);
        out
    }

    pub fn decode(bytes: &[u8], checksum: ChecksumType) -> CResult<Self> {
        let header = Header::decode(bytes)?;
        let trailer_len = checksum.trailer_len();
        if bytes.len() < header.event_size as usize {
            return Err(GatewayError::Protocol("truncated binlog event".into()));
        }
        let body_start = HEADER_LEN;
        let body_end = bytes.len() - trailer_len;
        let body_bytes = &bytes[body_start..body_end];
        let body = match header.event_type {
            EventType::FormatDescriptionEvent => {
                EventBody::FormatDescription(FormatDescriptionEvent::decode(body_bytes)?)
            }
            EventType::RotateEvent => EventBody::Rotate(RotateEvent::decode(body_bytes)?),
            EventType::QueryEvent => EventBody::Query(QueryEvent::decode(body_bytes)?),
            EventType::TableMapEvent => EventBody::TableMap(TableMapEvent::decode(body_bytes)?),
            EventType::WriteRowsEventV2 => {
                EventBody::Rows(RowsEvent::decode(body_bytes, RowsEventKind::Write)?)
            }
            EventType::UpdateRowsEventV2 => {
                EventBody::Rows(RowsEvent::decode(body_bytes, RowsEventKind::Update)?)
            }
            EventType::DeleteRowsEventV2 => {
                EventBody::Rows(RowsEvent::decode(body_bytes, RowsEventKind::Delete)?)
            }
            EventType::XidEvent => EventBody::Xid(XidEvent::decode(body_bytes)?),
            EventType::GtidLogEvent | EventType::AnonymousGtidLogEvent => {
                EventBody::Gtid(GtidLogEvent::decode(body_bytes)?)
            }
            other => {
                return Err(GatewayError::UnsupportedConstruct(format!(
                    "binlog event type {other:?} is not decodable by this gateway"
                )))
            }
        };
        Ok(BinlogEvent { header, body, checksum })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_description_round_trips_with_checksum() {
        let event = BinlogEvent::new(
            1_700_000_000,
            1,
            200,
            EventBody::FormatDescription(FormatDescriptionEvent::default()),
            ChecksumType::Crc32,
        );
        let bytes = event.encode();
        let decoded = BinlogEvent::decode(&bytes, ChecksumType::Crc32).unwrap();
        assert_eq!(decoded.header.event_type, EventType::FormatDescriptionEvent);
        assert_eq!(decoded.header.event_size as usize, bytes.len());
    }

    #[test]
    fn xid_round_trips_without_checksum() {
        let event = BinlogEvent::new(1, 1, 50, EventBody::Xid(XidEvent { xid: 42 }), ChecksumType::None);
        let bytes = event.encode();
        let decoded = BinlogEvent::decode(&bytes, ChecksumType::None).unwrap();
        match decoded.body {
            EventBody::Xid(x) => assert_eq!(x.xid, 42),
            _ => panic!("wrong body variant"),
        }
    }
}
