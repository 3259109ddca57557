// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String, ByteString and XmlElement.

use std::fmt;

use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult};

/// UTF-8 string whose null value is distinct from the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UaString(Option<String>);

impl UaString {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// True for null and for `""`.
    pub fn is_empty(&self) -> bool {
        self.0.as_deref().map_or(true, str::is_empty)
    }

    /// Contents, with null mapped to `""`.
    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }

    pub fn as_option(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn into_option(self) -> Option<String> {
        self.0
    }
}

impl From<&str> for UaString {
    fn from(value: &str) -> Self {
        Self(Some(value.to_owned()))
    }
}

impl From<String> for UaString {
    fn from(value: String) -> Self {
        Self(Some(value))
    }
}

impl From<Option<String>> for UaString {
    fn from(value: Option<String>) -> Self {
        Self(value)
    }
}

impl fmt::Display for UaString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl BinaryEncode for UaString {
    fn encode(&self, writer: &mut BinaryWriter) {
        match &self.0 {
            Some(s) => {
                writer.write_length(Some(s.len()));
                writer.write_bytes(s.as_bytes());
            }
            None => writer.write_length(None),
        }
    }
}

impl BinaryDecode for UaString {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let limit = reader.options().max_string_length;
        let Some(len) = reader.read_length("string", limit, 1)? else {
            return Ok(Self(None));
        };
        let offset = reader.offset();
        let bytes = reader.read_bytes(len)?;
        let s = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8 { offset })?;
        Ok(Self(Some(s.to_owned())))
    }
}

/// Non-null strings for fields where null carries no meaning (locale ids,
/// namespace tables). Null decodes as `""`.
impl BinaryEncode for String {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_length(Some(self.len()));
        writer.write_bytes(self.as_bytes());
    }
}

impl BinaryDecode for String {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        Ok(UaString::decode(reader)?.into_option().unwrap_or_default())
    }
}

/// Opaque byte sequence whose null value is distinct from empty.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteString(Option<Vec<u8>>);

impl ByteString {
    pub const fn null() -> Self {
        Self(None)
    }

    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_ref().map_or(true, Vec::is_empty)
    }

    /// Contents, with null mapped to an empty slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn into_option(self) -> Option<Vec<u8>> {
        self.0
    }
}

impl From<Vec<u8>> for ByteString {
    fn from(value: Vec<u8>) -> Self {
        Self(Some(value))
    }
}

impl From<&[u8]> for ByteString {
    fn from(value: &[u8]) -> Self {
        Self(Some(value.to_vec()))
    }
}

impl fmt::Debug for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(bytes) => write!(f, "ByteString({} bytes)", bytes.len()),
            None => f.write_str("ByteString(null)"),
        }
    }
}

impl BinaryEncode for ByteString {
    fn encode(&self, writer: &mut BinaryWriter) {
        match &self.0 {
            Some(bytes) => {
                writer.write_length(Some(bytes.len()));
                writer.write_bytes(bytes);
            }
            None => writer.write_length(None),
        }
    }
}

impl BinaryDecode for ByteString {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let limit = reader.options().max_byte_string_length;
        let Some(len) = reader.read_length("byte string", limit, 1)? else {
            return Ok(Self(None));
        };
        Ok(Self(Some(reader.read_bytes(len)?.to_vec())))
    }
}

/// XML fragment; encoded like a String.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct XmlElement(pub UaString);

impl BinaryEncode for XmlElement {
    fn encode(&self, writer: &mut BinaryWriter) {
        self.0.encode(writer);
    }
}

impl BinaryDecode for XmlElement {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        UaString::decode(reader).map(Self)
    }
}
