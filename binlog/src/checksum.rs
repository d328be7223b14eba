use common::err::GatewayError;

/// 1-byte checksum-algorithm descriptor size in a FORMAT_DESCRIPTION event.
pub const CHECKSUM_ALG_DESC_LEN: usize = 1;
/// 4-byte CRC32 trailer size when checksums are enabled.
pub const CHECKSUM_LEN: usize = 4;

/// Checksum algorithm used in a binlog stream. Per the design notes,
/// CRC32 support is mandatory in a conformant implementation; disabling
/// it is a deployment-time `BinlogConfig` choice, never a compiled-in
/// default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    None = 0,
    Crc32 = 1,
}

impl ChecksumType {
    pub fn from_code(code: u8) -> Result<Self, GatewayError> {
        match code {
            0 => Ok(ChecksumType::None),
            1 => Ok(ChecksumType::Crc32),
            other => Err(GatewayError::Protocol(format!(
                "unsupported binlog checksum algorithm: {other}"
            ))),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn trailer_len(self) -> usize {
        match self {
            ChecksumType::None => 0,
            ChecksumType::Crc32 => CHECKSUM_LEN,
        }
    }

    /// Computes the trailer for an event body (header + type-specific
    /// body, checksum byte excluded) ready to append to the wire.
    pub fn compute(self, event_bytes: &[u8]) -> Vec<u8> {
        match self {
            ChecksumType::None => Vec::new(),
            ChecksumType::Crc32 => crc32fast::hash(event_bytes).to_le_bytes().to_vec(),
        }
    }

    pub fn verify(self, event_bytes: &[u8], trailer: &[u8]) -> bool {
        match self {
            ChecksumType::None => trailer.is_empty(),
            ChecksumType::Crc32 => {
                trailer.len() == CHECKSUM_LEN
                    && crc32fast::hash(event_bytes).to_le_bytes() == trailer[..4]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_round_trips() {
        let data = b"format description payload";
        let trailer = ChecksumType::Crc32.compute(data);
        assert!(ChecksumType::Crc32.verify(data, &trailer));
        assert!(!ChecksumType::Crc32.verify(b"other", &trailer));
    }

    #[test]
    fn none_has_empty_trailer() {
        assert_eq!(ChecksumType::None.compute(b"x").len(), 0);
        assert_eq!(ChecksumType::None.trailer_len(), 0);
    }
}
