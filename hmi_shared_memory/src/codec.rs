//! Slot value encoding
//!
//! Numerics are little-endian fixed width. Strings occupy the whole slot:
//! UTF-8 bytes truncated at a character boundary, right-padded with NUL.

use hmi_common::value::{TagType, TagValue, ValueError};

/// Encode `value` into exactly `size` bytes for a slot of type `tag_type`.
///
/// The value is coerced to `tag_type` first.
pub fn encode(tag_type: TagType, size: usize, value: &TagValue) -> Result<Vec<u8>, ValueError> {
    let coerced = value.coerce(tag_type)?;
    let mut out = match coerced {
        TagValue::Bool(v) => vec![u8::from(v)],
        TagValue::Int8(v) => v.to_le_bytes().to_vec(),
        TagValue::UInt8(v) => v.to_le_bytes().to_vec(),
        TagValue::Int16(v) => v.to_le_bytes().to_vec(),
        TagValue::UInt16(v) => v.to_le_bytes().to_vec(),
        TagValue::Int32(v) => v.to_le_bytes().to_vec(),
        TagValue::UInt32(v) => v.to_le_bytes().to_vec(),
        TagValue::Int64(v) => v.to_le_bytes().to_vec(),
        TagValue::UInt64(v) => v.to_le_bytes().to_vec(),
        TagValue::Float32(v) => v.to_le_bytes().to_vec(),
        TagValue::Float64(v) => v.to_le_bytes().to_vec(),
        TagValue::String(s) => truncate_utf8(&s, size).as_bytes().to_vec(),
    };
    out.resize(size, 0);
    Ok(out)
}

/// Decode slot bytes of type `tag_type`.
///
/// `bytes` must be at least the fixed size of the type.
pub fn decode(tag_type: TagType, bytes: &[u8]) -> TagValue {
    fn arr<const N: usize>(bytes: &[u8]) -> [u8; N] {
        let mut out = [0u8; N];
        let n = bytes.len().min(N);
        out[..n].copy_from_slice(&bytes[..n]);
        out
    }

    match tag_type {
        TagType::Bool => TagValue::Bool(bytes.first().is_some_and(|b| *b != 0)),
        TagType::Int8 => TagValue::Int8(i8::from_le_bytes(arr(bytes))),
        TagType::UInt8 => TagValue::UInt8(u8::from_le_bytes(arr(bytes))),
        TagType::Int16 => TagValue::Int16(i16::from_le_bytes(arr(bytes))),
        TagType::UInt16 => TagValue::UInt16(u16::from_le_bytes(arr(bytes))),
        TagType::Int32 => TagValue::Int32(i32::from_le_bytes(arr(bytes))),
        TagType::UInt32 => TagValue::UInt32(u32::from_le_bytes(arr(bytes))),
        TagType::Int64 => TagValue::Int64(i64::from_le_bytes(arr(bytes))),
        TagType::UInt64 => TagValue::UInt64(u64::from_le_bytes(arr(bytes))),
        TagType::Float32 => TagValue::Float32(f32::from_le_bytes(arr(bytes))),
        TagType::Float64 => TagValue::Float64(f64::from_le_bytes(arr(bytes))),
        TagType::String => {
            let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
            TagValue::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
        }
    }
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_little_endian_layout() {
        let bytes = encode(TagType::UInt16, 2, &TagValue::UInt16(0x1234)).unwrap();
        assert_eq!(bytes, [0x34, 0x12]);

        let bytes = encode(TagType::Int32, 4, &TagValue::Int64(-2)).unwrap();
        assert_eq!(bytes, [0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bool_from_number() {
        assert_eq!(encode(TagType::Bool, 1, &TagValue::Int64(5)).unwrap(), [1]);
        assert_eq!(encode(TagType::Bool, 1, &TagValue::Float64(0.0)).unwrap(), [0]);
        assert_eq!(decode(TagType::Bool, &[7]), TagValue::Bool(true));
    }

    #[test]
    fn test_string_padding_and_decode() {
        let bytes = encode(TagType::String, 8, &TagValue::from("abc")).unwrap();
        assert_eq!(bytes, b"abc\0\0\0\0\0");
        assert_eq!(decode(TagType::String, &bytes), TagValue::from("abc"));
    }

    #[test]
    fn test_string_truncates_on_char_boundary() {
        // "é" is 2 bytes; the third byte of the slot would split it.
        let bytes = encode(TagType::String, 3, &TagValue::from("aéb")).unwrap();
        assert_eq!(bytes, [b'a', 0xC3, 0xA9]);

        let bytes = encode(TagType::String, 2, &TagValue::from("aé")).unwrap();
        assert_eq!(bytes, [b'a', 0]);
        assert_eq!(decode(TagType::String, &bytes), TagValue::from("a"));
    }

    #[test]
    fn test_string_without_nul_uses_full_slot() {
        assert_eq!(decode(TagType::String, b"full"), TagValue::from("full"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(
            decode(TagType::String, &[b'o', 0xFF, b'k', 0]),
            TagValue::from("o\u{FFFD}k")
        );
    }

    #[test]
    fn test_incompatible_value() {
        assert!(encode(TagType::Float64, 8, &TagValue::from("fast")).is_err());
    }

    proptest! {
        #[test]
        fn prop_string_fits_and_is_prefix(s in "\\PC{0,40}", size in 1usize..48) {
            let bytes = encode(TagType::String, size, &TagValue::from(s.as_str())).unwrap();
            prop_assert_eq!(bytes.len(), size);
            match decode(TagType::String, &bytes) {
                TagValue::String(back) => prop_assert!(s.starts_with(&back)),
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn prop_int32_wraps_like_cast(v in any::<i64>()) {
            let bytes = encode(TagType::Int32, 4, &TagValue::Int64(v)).unwrap();
            prop_assert_eq!(decode(TagType::Int32, &bytes), TagValue::Int32(v as i32));
        }

        #[test]
        fn prop_float64_exact(v in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let bytes = encode(TagType::Float64, 8, &TagValue::Float64(v)).unwrap();
            prop_assert_eq!(decode(TagType::Float64, &bytes), TagValue::Float64(v));
        }
    }
}
