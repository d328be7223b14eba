pub mod capability_flags;
pub mod column_flags;
pub mod status_flags;

pub use capability_flags::CapabilityFlags;
pub use column_flags::ColumnFlags;
pub use status_flags::StatusFlags;
