pub mod declar;
pub mod dispatch;
pub mod engine;
pub mod handshake;
pub mod packet;
pub mod prepared;
pub mod replication;
pub mod session;

pub use engine::{ColumnDescriptor, QueryEngine, QueryOutcome};
pub use session::Session;

/// Length of the 3-byte packet-length + 1-byte sequence-id framing header.
pub const PACKET_HEADER_LEN: usize = 4;
/// Largest payload a single physical packet may carry before it must be
/// split across several packets sharing one logical payload.
pub const MAX_PACKET_PAYLOAD: usize = 0x00FF_FFFF;
