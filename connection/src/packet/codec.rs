use byteorder::{LittleEndian, WriteBytesExt};
use common::err::{CResult, GatewayError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::{MAX_PACKET_PAYLOAD, PACKET_HEADER_LEN};

/// Reads one physical packet (3-byte little-endian length + 1-byte
/// sequence id, followed by the payload) from an async stream.
pub async fn read_packet<R>(stream: &mut R) -> CResult<(Vec<u8>, u8)>
where
    R: AsyncReadExt + Unpin,
{
    let mut header = [0u8; PACKET_HEADER_LEN];
    stream.read_exact(&mut header).await?;
    let len = u32::from_le_bytes([header[0], header[1], header[2], 0]) as usize;
    let seq = header[3];
    let mut payload = vec![0u8; len];
    if len > 0 {
        stream.read_exact(&mut payload).await?;
    }
    Ok((payload, seq))
}

/// Writes one physical packet, splitting it across several physical
/// packets if its payload exceeds [`MAX_PACKET_PAYLOAD`] (a payload
/// that is an exact multiple of the limit is terminated by a
/// zero-length packet, matching the wire protocol's framing rule).
pub async fn write_packet<W>(stream: &mut W, payload: &[u8], mut seq: u8) -> CResult<u8>
where
    W: AsyncWriteExt + Unpin,
{
    let mut offset = 0;
    loop {
        let remaining = payload.len() - offset;
        let chunk_len = remaining.min(MAX_PACKET_PAYLOAD);
        let chunk = &payload[offset..offset + chunk_len];

        let mut header = Vec::with_capacity(PACKET_HEADER_LEN);
        header.write_u24::<LittleEndian>(chunk_len as u32)?;
        WriteBytesExt::write_u8(&mut header, seq)?;

        stream.write_all(&header).await?;
        stream.write_all(chunk).await?;

        seq = seq.wrapping_add(1);
        offset += chunk_len;
        if chunk_len < MAX_PACKET_PAYLOAD {
            break;
        }
    }
    stream.flush().await?;
    Ok(seq)
}

/// Decodes a length-encoded integer starting at `buf[*pos]`, advancing
/// `pos` past it.
pub fn read_len_enc_int(buf: &[u8], pos: &mut usize) -> CResult<u64> {
    let first = *buf.get(*pos).ok_or_else(|| GatewayError::Protocol("truncated length-encoded integer".into()))?;
    *pos += 1;
    match first {
        0xfb => Err(GatewayError::Protocol("length-encoded integer is NULL".into())),
        0xfc => {
            let bytes = read_n(buf, pos, 2)?;
            Ok(u16::from_le_bytes([bytes[0], bytes[1]]) as u64)
        }
        0xfd => {
            let bytes = read_n(buf, pos, 3)?;
            Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]) as u64)
        }
        0xfe => {
            let bytes = read_n(buf, pos, 8)?;
            Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
        }
        small => Ok(small as u64),
    }
}

fn read_n<'a>(buf: &'a [u8], pos: &mut usize, n: usize) -> CResult<&'a [u8]> {
    let end = *pos + n;
    let slice = buf.get(*pos..end).ok_or_else(|| GatewayError::Protocol("truncated field".into()))?;
    *pos = end;
    Ok(slice)
}

pub fn write_len_enc_int(buf: &mut Vec<u8>, value: u64) {
    if value < 251 {
        buf.push(value as u8);
    } else if value < 0x1_0000 {
        buf.push(0xfc);
        buf.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value < 0x100_0000 {
        buf.push(0xfd);
        buf.extend_from_slice(&(value as u32).to_le_bytes()[..3]);
    } else {
        buf.push(0xfe);
        buf.extend_from_slice(&value.to_le_bytes());
    }
}

pub fn read_len_enc_string(buf: &[u8], pos: &mut usize) -> CResult<String> {
    let len = read_len_enc_int(buf, pos)? as usize;
    let bytes = read_n(buf, pos, len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// NULL is signalled on the wire by the `0xfb` length-encoding prefix.
pub fn read_len_enc_string_or_null(buf: &[u8], pos: &mut usize) -> CResult<Option<String>> {
    if buf.get(*pos) == Some(&0xfb) {
        *pos += 1;
        return Ok(None);
    }
    read_len_enc_string(buf, pos).map(Some)
}

pub fn write_len_enc_string(buf: &mut Vec<u8>, value: &str) {
    write_len_enc_int(buf, value.len() as u64);
    buf.extend_from_slice(value.as_bytes());
}

pub fn write_len_enc_string_or_null(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        Some(v) => write_len_enc_string(buf, v),
        None => buf.push(0xfb),
    }
}

pub fn write_null_terminated_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(value.as_bytes());
    buf.push(0);
}

/// Reads a NUL-terminated string, advancing `pos` past the terminator.
pub fn read_null_terminated_string(buf: &[u8], pos: &mut usize) -> CResult<String> {
    let end = buf[*pos..]
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| GatewayError::Protocol("unterminated string".into()))?;
    let s = String::from_utf8_lossy(&buf[*pos..*pos + end]).into_owned();
    *pos += end + 1;
    Ok(s)
}

/// Length in bytes of a NULL bitmap covering `n` fields, with bits
/// mapped starting at `bit_offset` (2 for STMT_EXECUTE parameters and
/// binary result-set rows, 0 for STMT_FETCH-less long-data markers).
pub fn null_bitmap_len(n: usize, bit_offset: usize) -> usize {
    (n + bit_offset + 7) / 8
}

pub fn null_bitmap_get(bitmap: &[u8], index: usize, bit_offset: usize) -> bool {
    let bit = index + bit_offset;
    let byte = bitmap[bit / 8];
    (byte >> (bit % 8)) & 1 != 0
}

pub fn null_bitmap_set(bitmap: &mut [u8], index: usize, bit_offset: usize) {
    let bit = index + bit_offset;
    bitmap[bit / 8] |= 1 << (bit % 8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bitmap_len_matches_the_ceiling_formula() {
        for (n, expected) in [(1, 1usize), (2, 1), (8, 2), (9, 2), (15, 3)] {
            assert_eq!(null_bitmap_len(n, 2), expected, "n={n}");
        }
    }

    #[test]
    fn null_bitmap_bits_start_at_offset_two() {
        let mut bitmap = vec![0u8; null_bitmap_len(3, 2)];
        null_bitmap_set(&mut bitmap, 0, 2);
        assert_eq!(bitmap[0], 0b0000_0100);
        assert!(null_bitmap_get(&bitmap, 0, 2));
        assert!(!null_bitmap_get(&bitmap, 1, 2));
    }

    #[tokio::test]
    async fn packet_round_trips_through_a_duplex_stream() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        write_packet(&mut a, b"select 1", 0).await.unwrap();
        let (payload, seq) = read_packet(&mut b).await.unwrap();
        assert_eq!(payload, b"select 1");
        assert_eq!(seq, 0);
    }

    #[tokio::test]
    async fn oversized_payload_splits_across_packets() {
        let (mut a, mut b) = tokio::io::duplex(8 * 1024 * 1024);
        let payload = vec![0x42u8; MAX_PACKET_PAYLOAD + 10];
        write_packet(&mut a, &payload, 0).await.unwrap();
        let (first, seq0) = read_packet(&mut b).await.unwrap();
        assert_eq!(first.len(), MAX_PACKET_PAYLOAD);
        assert_eq!(seq0, 0);
        let (second, seq1) = read_packet(&mut b).await.unwrap();
        assert_eq!(second.len(), 10);
        assert_eq!(seq1, 1);
    }

    #[test]
    fn len_enc_int_round_trips_across_all_prefix_widths() {
        for value in [0u64, 250, 251, 65535, 65536, 16_777_215, 16_777_216, u64::MAX] {
            let mut buf = Vec::new();
            write_len_enc_int(&mut buf, value);
            let mut pos = 0;
            assert_eq!(read_len_enc_int(&buf, &mut pos).unwrap(), value);
            assert_eq!(pos, buf.len());
        }
    }

    #[test]
    fn len_enc_string_or_null_round_trips_null() {
        let mut buf = Vec::new();
        write_len_enc_string_or_null(&mut buf, None);
        let mut pos = 0;
        assert_eq!(read_len_enc_string_or_null(&buf, &mut pos).unwrap(), None);
    }
}
