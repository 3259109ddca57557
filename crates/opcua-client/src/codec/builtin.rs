// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codecs for Rust primitives and sequences.

use super::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecResult};

macro_rules! impl_scalar {
    ($type:ty, $read:ident, $write:ident) => {
        impl BinaryEncode for $type {
            fn encode(&self, writer: &mut BinaryWriter) {
                writer.$write(*self);
            }
        }

        impl BinaryDecode for $type {
            fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
                reader.$read()
            }
        }
    };
}

impl_scalar!(u8, read_u8, write_u8);
impl_scalar!(i8, read_i8, write_i8);
impl_scalar!(u16, read_u16, write_u16);
impl_scalar!(i16, read_i16, write_i16);
impl_scalar!(u32, read_u32, write_u32);
impl_scalar!(i32, read_i32, write_i32);
impl_scalar!(u64, read_u64, write_u64);
impl_scalar!(i64, read_i64, write_i64);
impl_scalar!(f32, read_f32, write_f32);
impl_scalar!(f64, read_f64, write_f64);

// Boolean is one byte; any non-zero value decodes as true.
impl BinaryEncode for bool {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u8(u8::from(*self));
    }
}

impl BinaryDecode for bool {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl<T: BinaryEncode> BinaryEncode for Vec<T> {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_length(Some(self.len()));
        for item in self {
            item.encode(writer);
        }
    }
}

/// A null array decodes as an empty `Vec`.
impl<T: BinaryDecode> BinaryDecode for Vec<T> {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        Ok(decode_array(reader)?.unwrap_or_default())
    }
}

impl<T: BinaryEncode> BinaryEncode for Option<Vec<T>> {
    fn encode(&self, writer: &mut BinaryWriter) {
        match self {
            Some(items) => items.encode(writer),
            None => writer.write_length(None),
        }
    }
}

impl<T: BinaryDecode> BinaryDecode for Option<Vec<T>> {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        decode_array(reader)
    }
}

/// Decode an Int32-prefixed array, keeping null distinct from empty.
pub(crate) fn decode_array<T: BinaryDecode>(
    reader: &mut BinaryReader<'_>,
) -> CodecResult<Option<Vec<T>>> {
    let limit = reader.options().max_array_length;
    let Some(len) = reader.read_length("array", limit, 1)? else {
        return Ok(None);
    };
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(T::decode(reader)?);
    }
    Ok(Some(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, DecodingOptions};

    #[test]
    fn test_bool_encoding() {
        assert_eq!(true.encode_to_vec(), vec![1]);
        assert_eq!(false.encode_to_vec(), vec![0]);
        assert!(bool::decode_from_slice(&[7]).unwrap());
    }

    #[test]
    fn test_array_null_vs_empty() {
        let null: Option<Vec<u32>> = None;
        assert_eq!(null.encode_to_vec(), (-1i32).to_le_bytes().to_vec());
        assert_eq!(Option::<Vec<u32>>::decode_from_slice(&null.encode_to_vec()).unwrap(), None);

        let empty: Option<Vec<u32>> = Some(Vec::new());
        assert_eq!(
            Option::<Vec<u32>>::decode_from_slice(&empty.encode_to_vec()).unwrap(),
            Some(Vec::new())
        );

        // Plain Vec collapses null to empty.
        assert!(Vec::<u32>::decode_from_slice(&null.encode_to_vec()).unwrap().is_empty());
    }

    #[test]
    fn test_array_layout() {
        let values: Vec<u16> = vec![1, 0x0203];
        assert_eq!(values.encode_to_vec(), vec![2, 0, 0, 0, 1, 0, 3, 2]);
        assert_eq!(values.byte_len(), 8);
    }

    #[test]
    fn test_array_length_limit() {
        let values: Vec<u8> = vec![0; 16];
        let options = DecodingOptions {
            max_array_length: 8,
            ..DecodingOptions::default()
        };
        assert!(matches!(
            Vec::<u8>::decode_with_options(&values.encode_to_vec(), options),
            Err(CodecError::LengthExceeded { kind: "array", .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert!(matches!(
            u16::decode_from_slice(&[1, 2, 3]),
            Err(CodecError::TrailingBytes { remaining: 1 })
        ));
    }
}
