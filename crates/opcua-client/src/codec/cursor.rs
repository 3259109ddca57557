// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounds-checked reader and growable writer for OPC UA binary buffers.
//!

use super::{CodecError, CodecResult, DecodingOptions};

/// Generate write methods for primitive types
///
/// Each generated method appends the little-endian bytes of the value.
macro_rules! impl_write_le {
    ($name:ident, $type:ty) => {
        pub fn $name(&mut self, value: $type) {
            self.buffer.extend_from_slice(&value.to_le_bytes());
        }
    };
}

/// Generate read methods for primitive types
///
/// Each generated method:
/// 1. Checks buffer bounds (returns `CodecError::UnexpectedEof` if overflow)
/// 2. Reads N bytes from buffer
/// 3. Converts bytes to value via `from_le_bytes()`
/// 4. Advances offset
macro_rules! impl_read_le {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> CodecResult<$type> {
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(self.read_bytes($size)?);
            Ok(<$type>::from_le_bytes(bytes))
        }
    };
}

/// Growable writer. Encoding into a `Vec` never fails, so every write is infallible.
#[derive(Debug, Default, Clone)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    impl_write_le!(write_u8, u8);
    impl_write_le!(write_i8, i8);
    impl_write_le!(write_u16, u16);
    impl_write_le!(write_i16, i16);
    impl_write_le!(write_u32, u32);
    impl_write_le!(write_i32, i32);
    impl_write_le!(write_u64, u64);
    impl_write_le!(write_i64, i64);
    impl_write_le!(write_f32, f32);
    impl_write_le!(write_f64, f64);

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Write an Int32 length prefix; `None` encodes the null marker `-1`.
    pub fn write_length(&mut self, len: Option<usize>) {
        match len {
            Some(len) => self.write_i32(i32::try_from(len).unwrap_or(i32::MAX)),
            None => self.write_i32(-1),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }
}

/// Immutable cursor for reading (bounds-checked, zero-copy)
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buffer: &'a [u8],
    offset: usize,
    options: DecodingOptions,
    depth: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self::with_options(buffer, DecodingOptions::default())
    }

    pub fn with_options(buffer: &'a [u8], options: DecodingOptions) -> Self {
        Self {
            buffer,
            offset: 0,
            options,
            depth: 0,
        }
    }

    impl_read_le!(read_u8, u8, 1);
    impl_read_le!(read_i8, i8, 1);
    impl_read_le!(read_u16, u16, 2);
    impl_read_le!(read_i16, i16, 2);
    impl_read_le!(read_u32, u32, 4);
    impl_read_le!(read_i32, i32, 4);
    impl_read_le!(read_u64, u64, 8);
    impl_read_le!(read_i64, i64, 8);
    impl_read_le!(read_f32, f32, 4);
    impl_read_le!(read_f64, f64, 8);

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.buffer.len())
            .ok_or(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: len,
            })?;
        let slice = &self.buffer[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Read an Int32 length prefix.
    ///
    /// Returns `None` for the null marker `-1`. The length is checked against
    /// `limit` and against the bytes left in the buffer (every element takes at
    /// least `min_element_size` bytes), so a hostile prefix cannot trigger a
    /// huge allocation.
    pub fn read_length(
        &mut self,
        kind: &'static str,
        limit: usize,
        min_element_size: usize,
    ) -> CodecResult<Option<usize>> {
        let offset = self.offset;
        let raw = self.read_i32()?;
        if raw == -1 {
            return Ok(None);
        }
        if raw < -1 {
            return Err(CodecError::InvalidLength {
                offset,
                length: raw,
            });
        }
        let len = raw as usize;
        if len > limit {
            return Err(CodecError::LengthExceeded {
                kind,
                length: len,
                limit,
            });
        }
        if len.saturating_mul(min_element_size) > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
                needed: len.saturating_mul(min_element_size),
            });
        }
        Ok(Some(len))
    }

    /// Enter a nested structure (Variant in Variant, DiagnosticInfo chains).
    pub fn enter_nested(&mut self) -> CodecResult<()> {
        if self.depth >= self.options.max_recursion_depth {
            return Err(CodecError::RecursionLimit {
                limit: self.options.max_recursion_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave_nested(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn options(&self) -> &DecodingOptions {
        &self.options
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }

    /// Bytes not consumed yet.
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.offset.min(self.buffer.len())..]
    }
}
