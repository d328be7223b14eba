use common::err::GatewayError;

pub const ERR_HEADER: u8 = 0xff;

/// The single point in this gateway where a [`GatewayError`] is converted
/// to wire bytes, per the one-place error-to-ERR-packet contract.
#[derive(Debug, Clone)]
pub struct ErrPacket {
    pub error_code: u16,
    pub sql_state: [u8; 5],
    pub message: String,
}

impl ErrPacket {
    pub fn from_error(err: &GatewayError) -> Self {
        let mut sql_state = [0u8; 5];
        let state = err.sql_state();
        sql_state.copy_from_slice(state.as_bytes());
        ErrPacket { error_code: err.mysql_code(), sql_state, message: err.to_string() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![ERR_HEADER];
        buf.extend_from_slice(&self.error_code.to_le_bytes());
        buf.push(b'#');
        buf.extend_from_slice(&self.sql_state);
        buf.extend_from_slice(self.message.as_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_table_maps_to_1146() {
        let err = GatewayError::UnknownTable("widgets".into());
        let packet = ErrPacket::from_error(&err);
        assert_eq!(packet.error_code, 1146);
        assert_eq!(&packet.sql_state, b"42S02");
        assert_eq!(packet.encode()[0], ERR_HEADER);
    }
}
