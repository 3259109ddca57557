// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA binary encoding (Part 6 Sec.5.2).
//!
//! Every wire type implements [`BinaryEncode`] and [`BinaryDecode`]:
//!
//! - fixed-width scalars are little-endian,
//! - strings, byte strings and arrays carry an Int32 length prefix where `-1`
//!   is the null marker,
//! - structures are the concatenation of their fields in declaration order.
//!
//! Encoding is deterministic: the same logical value always yields the same
//! bytes. Decoding either returns a complete value or a [`CodecError`]; a
//! truncated or malformed buffer never produces a partially filled value.
//!
//! # Example
//!
//! ```
//! use opcua_client::codec::{BinaryDecode, BinaryEncode};
//! use opcua_client::types::NodeId;
//!
//! let id = NodeId::string(2, "Boiler.Temperature");
//! let bytes = id.encode_to_vec();
//! assert_eq!(NodeId::decode_from_slice(&bytes).unwrap(), id);
//! ```

mod builtin;
mod cursor;
mod macros;

pub use cursor::{BinaryReader, BinaryWriter};
pub(crate) use macros::{impl_binary_enum, impl_binary_struct};

use std::fmt;

/// Default maximum length of a decoded String (1 MiB).
pub const DEFAULT_MAX_STRING_LENGTH: usize = 1024 * 1024;

/// Default maximum length of a decoded ByteString (16 MiB).
pub const DEFAULT_MAX_BYTE_STRING_LENGTH: usize = 16 * 1024 * 1024;

/// Default maximum number of array elements.
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 100_000;

/// Default nesting limit for recursive types (Variant, DiagnosticInfo).
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodingOptions {
    pub max_string_length: usize,
    pub max_byte_string_length: usize,
    pub max_array_length: usize,
    pub max_recursion_depth: usize,
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self {
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_byte_string_length: DEFAULT_MAX_BYTE_STRING_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

/// Errors raised while decoding OPC UA binary data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer ended before the value was complete.
    UnexpectedEof { offset: usize, needed: usize },
    /// Length prefix below the null marker.
    InvalidLength { offset: usize, length: i32 },
    /// Length prefix above the configured limit.
    LengthExceeded {
        kind: &'static str,
        length: usize,
        limit: usize,
    },
    /// String payload is not valid UTF-8.
    InvalidUtf8 { offset: usize },
    /// Encoding byte, enumeration value or type id not known to this stack.
    UnknownEncoding { what: &'static str, value: u32 },
    /// Nesting deeper than `DecodingOptions::max_recursion_depth`.
    RecursionLimit { limit: usize },
    /// Bytes left over after a complete top-level value.
    TrailingBytes { remaining: usize },
    /// Structurally invalid data.
    InvalidData(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof { offset, needed } => write!(
                f,
                "unexpected end of buffer at offset {} ({} more bytes needed)",
                offset, needed
            ),
            Self::InvalidLength { offset, length } => {
                write!(f, "invalid length {} at offset {}", length, offset)
            }
            Self::LengthExceeded {
                kind,
                length,
                limit,
            } => write!(f, "{} length {} exceeds limit {}", kind, length, limit),
            Self::InvalidUtf8 { offset } => write!(f, "invalid UTF-8 string at offset {}", offset),
            Self::UnknownEncoding { what, value } => {
                write!(f, "unknown {} 0x{:x}", what, value)
            }
            Self::RecursionLimit { limit } => write!(f, "nesting deeper than {}", limit),
            Self::TrailingBytes { remaining } => {
                write!(f, "{} trailing bytes after complete value", remaining)
            }
            Self::InvalidData(reason) => write!(f, "invalid data: {}", reason),
        }
    }
}

impl std::error::Error for CodecError {}

pub type CodecResult<T> = Result<T, CodecError>;

/// Types that can be written in OPC UA binary form.
pub trait BinaryEncode {
    fn encode(&self, writer: &mut BinaryWriter);

    /// Encode into a fresh buffer.
    fn encode_to_vec(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::new();
        self.encode(&mut writer);
        writer.into_inner()
    }

    /// Encoded size in bytes.
    fn byte_len(&self) -> usize {
        let mut writer = BinaryWriter::new();
        self.encode(&mut writer);
        writer.len()
    }
}

/// Types that can be read from OPC UA binary form.
pub trait BinaryDecode: Sized {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self>;

    /// Decode a complete value from `buf` with default limits.
    ///
    /// Fails with [`CodecError::TrailingBytes`] if `buf` holds more than one value.
    fn decode_from_slice(buf: &[u8]) -> CodecResult<Self> {
        Self::decode_with_options(buf, DecodingOptions::default())
    }

    /// Decode a complete value from `buf` with explicit limits.
    fn decode_with_options(buf: &[u8], options: DecodingOptions) -> CodecResult<Self> {
        let mut reader = BinaryReader::with_options(buf, options);
        let value = Self::decode(&mut reader)?;
        if !reader.is_eof() {
            return Err(CodecError::TrailingBytes {
                remaining: reader.remaining(),
            });
        }
        Ok(value)
    }
}
