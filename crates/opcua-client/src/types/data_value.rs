// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{DateTime, StatusCode, Variant};
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecResult};

const VALUE: u8 = 0x01;
const STATUS: u8 = 0x02;
const SOURCE_TIMESTAMP: u8 = 0x04;
const SERVER_TIMESTAMP: u8 = 0x08;
const SOURCE_PICOSECONDS: u8 = 0x10;
const SERVER_PICOSECONDS: u8 = 0x20;

/// Attribute value with quality and timestamps. Absent fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataValue {
    pub value: Option<Variant>,
    pub status: Option<StatusCode>,
    pub source_timestamp: Option<DateTime>,
    pub source_picoseconds: Option<u16>,
    pub server_timestamp: Option<DateTime>,
    pub server_picoseconds: Option<u16>,
}

impl DataValue {
    pub fn new(value: impl Into<Variant>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Status of the value; an absent status means Good.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }

    /// The value, or `Variant::Empty` when absent.
    pub fn value(&self) -> &Variant {
        const EMPTY: &Variant = &Variant::Empty;
        self.value.as_ref().unwrap_or(EMPTY)
    }

    fn mask(&self) -> u8 {
        let mut mask = 0;
        if self.value.is_some() {
            mask |= VALUE;
        }
        if self.status.is_some() {
            mask |= STATUS;
        }
        if self.source_timestamp.is_some() {
            mask |= SOURCE_TIMESTAMP;
        }
        if self.server_timestamp.is_some() {
            mask |= SERVER_TIMESTAMP;
        }
        if self.source_picoseconds.is_some() {
            mask |= SOURCE_PICOSECONDS;
        }
        if self.server_picoseconds.is_some() {
            mask |= SERVER_PICOSECONDS;
        }
        mask
    }
}

impl BinaryEncode for DataValue {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.mask());
        if let Some(value) = &self.value {
            value.encode(writer);
        }
        if let Some(status) = self.status {
            status.encode(writer);
        }
        if let Some(ts) = self.source_timestamp {
            ts.encode(writer);
        }
        if let Some(ps) = self.source_picoseconds {
            writer.write_u16(ps);
        }
        if let Some(ts) = self.server_timestamp {
            ts.encode(writer);
        }
        if let Some(ps) = self.server_picoseconds {
            writer.write_u16(ps);
        }
    }
}

impl BinaryDecode for DataValue {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let mask = reader.read_u8()?;
        let value = if mask & VALUE != 0 {
            Some(Variant::decode(reader)?)
        } else {
            None
        };
        let status = if mask & STATUS != 0 {
            Some(StatusCode::decode(reader)?)
        } else {
            None
        };
        let source_timestamp = if mask & SOURCE_TIMESTAMP != 0 {
            Some(DateTime::decode(reader)?)
        } else {
            None
        };
        let source_picoseconds = if mask & SOURCE_PICOSECONDS != 0 {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let server_timestamp = if mask & SERVER_TIMESTAMP != 0 {
            Some(DateTime::decode(reader)?)
        } else {
            None
        };
        let server_picoseconds = if mask & SERVER_PICOSECONDS != 0 {
            Some(reader.read_u16()?)
        } else {
            None
        };
        Ok(Self {
            value,
            status,
            source_timestamp,
            source_picoseconds,
            server_timestamp,
            server_picoseconds,
        })
    }
}
