pub mod binary_row;
pub mod codec;
pub mod column_def;
pub mod eof_packet;
pub mod err_packet;
pub mod ok_packet;
pub mod text_row;

pub use binary_row::encode_binary_row;
pub use codec::{read_packet, write_packet};
pub use column_def::ColumnDefPacket;
pub use eof_packet::EofPacket;
pub use err_packet::ErrPacket;
pub use ok_packet::OkPacket;
pub use text_row::encode_text_row;
