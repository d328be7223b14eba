pub mod config;
pub mod err;
pub mod log;
pub mod row;
pub mod schema;
pub mod value;

pub use err::{CResult, GatewayError};
pub use row::{Row, RowBuilder};
pub use value::Value;
