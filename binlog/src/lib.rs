pub mod checksum;
pub mod encode;
pub mod event_type;
pub mod events;
pub mod header;

pub use checksum::ChecksumType;
pub use event_type::EventType;
pub use header::Header;
