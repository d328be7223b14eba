/// The binlog event-type byte, per the event catalogue this gateway's
/// dump loop can emit to a registered replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    Unknown = 0x00,
    StartEventV3 = 0x01,
    QueryEvent = 0x02,
    StopEvent = 0x03,
    RotateEvent = 0x04,
    IntVarEvent = 0x05,
    XidEvent = 0x10,
    TableMapEvent = 0x13,
    WriteRowsEventV1 = 0x17,
    UpdateRowsEventV1 = 0x18,
    DeleteRowsEventV1 = 0x19,
    FormatDescriptionEvent = 0x0f,
    WriteRowsEventV2 = 0x1e,
    UpdateRowsEventV2 = 0x1f,
    DeleteRowsEventV2 = 0x20,
    GtidLogEvent = 0x21,
    AnonymousGtidLogEvent = 0x22,
    PreviousGtidsEvent = 0x23,
}

impl EventType {
    pub fn from_code(code: u8) -> EventType {
        match code {
            0x01 => EventType::StartEventV3,
            0x02 => EventType::QueryEvent,
            0x03 => EventType::StopEvent,
            0x04 => EventType::RotateEvent,
            0x05 => EventType::IntVarEvent,
            0x0f => EventType::FormatDescriptionEvent,
            0x10 => EventType::XidEvent,
            0x13 => EventType::TableMapEvent,
            0x17 => EventType::WriteRowsEventV1,
            0x18 => EventType::UpdateRowsEventV1,
            0x19 => EventType::DeleteRowsEventV1,
            0x1e => EventType::WriteRowsEventV2,
            0x1f => EventType::UpdateRowsEventV2,
            0x20 => EventType::DeleteRowsEventV2,
            0x21 => EventType::GtidLogEvent,
            0x22 => EventType::AnonymousGtidLogEvent,
            0x23 => EventType::PreviousGtidsEvent,
            _ => EventType::Unknown,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}
