// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Code generation for structure and enumeration codecs.

/// Implement `BinaryEncode`/`BinaryDecode` for a structure whose wire form is
/// the concatenation of its fields in the listed order.
macro_rules! impl_binary_struct {
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::codec::BinaryEncode for $ty {
            #[allow(unused_variables)]
            fn encode(&self, writer: &mut $crate::codec::BinaryWriter) {
                $( $crate::codec::BinaryEncode::encode(&self.$field, writer); )*
            }
        }

        impl $crate::codec::BinaryDecode for $ty {
            #[allow(unused_variables)]
            fn decode(
                reader: &mut $crate::codec::BinaryReader<'_>,
            ) -> $crate::codec::CodecResult<Self> {
                Ok(Self {
                    $( $field: $crate::codec::BinaryDecode::decode(reader)?, )*
                })
            }
        }
    };
}

/// Implement `BinaryEncode`/`BinaryDecode` for a field-less enumeration
/// encoded as Int32 (or Byte/UInt32 when a representation is given).
macro_rules! impl_binary_enum {
    ($ty:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        $crate::codec::impl_binary_enum!($ty : i32, read_i32, write_i32 { $($variant = $value),+ });
    };
    ($ty:ident : $repr:ty, $read:ident, $write:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        impl $ty {
            /// Map a wire value to the enumeration.
            pub fn from_repr(value: $repr) -> Option<Self> {
                match value {
                    $( v if v == $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Wire value of the enumeration.
            pub fn repr(self) -> $repr {
                match self {
                    $( Self::$variant => $value, )+
                }
            }
        }

        impl $crate::codec::BinaryEncode for $ty {
            fn encode(&self, writer: &mut $crate::codec::BinaryWriter) {
                writer.$write(self.repr());
            }
        }

        impl $crate::codec::BinaryDecode for $ty {
            fn decode(
                reader: &mut $crate::codec::BinaryReader<'_>,
            ) -> $crate::codec::CodecResult<Self> {
                let raw = reader.$read()?;
                Self::from_repr(raw).ok_or($crate::codec::CodecError::UnknownEncoding {
                    what: stringify!($ty),
                    value: raw as u32,
                })
            }
        }
    };
}

pub(crate) use impl_binary_enum;
pub(crate) use impl_binary_struct;
