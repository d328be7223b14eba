use common::value::Value;

use crate::packet::codec::write_len_enc_string_or_null;

/// Encodes one row of the text result-set protocol: every value, NULL
/// included, rendered as a length-encoded string.
pub fn encode_text_row(values: &[Value]) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in values {
        match value {
            Value::Null => write_len_enc_string_or_null(&mut buf, None),
            other => write_len_enc_string_or_null(&mut buf, Some(&other.to_string())),
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_becomes_the_0xfb_marker() {
        let bytes = encode_text_row(&[Value::Null, Value::Int(7)]);
        assert_eq!(bytes[0], 0xfb);
    }
}
