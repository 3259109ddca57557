// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{StatusCode, UaString};
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecResult};

const SYMBOLIC_ID: u8 = 0x01;
const NAMESPACE_URI: u8 = 0x02;
const LOCALIZED_TEXT: u8 = 0x04;
const LOCALE: u8 = 0x08;
const ADDITIONAL_INFO: u8 = 0x10;
const INNER_STATUS_CODE: u8 = 0x20;
const INNER_DIAGNOSTIC_INFO: u8 = 0x40;

/// Vendor diagnostics attached to a result. Indices point into the
/// response header's string table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticInfo {
    pub symbolic_id: Option<i32>,
    pub namespace_uri: Option<i32>,
    pub locale: Option<i32>,
    pub localized_text: Option<i32>,
    pub additional_info: Option<UaString>,
    pub inner_status_code: Option<StatusCode>,
    pub inner_diagnostic_info: Option<Box<DiagnosticInfo>>,
}

impl DiagnosticInfo {
    fn mask(&self) -> u8 {
        let mut mask = 0;
        let bits = [
            (self.symbolic_id.is_some(), SYMBOLIC_ID),
            (self.namespace_uri.is_some(), NAMESPACE_URI),
            (self.localized_text.is_some(), LOCALIZED_TEXT),
            (self.locale.is_some(), LOCALE),
            (self.additional_info.is_some(), ADDITIONAL_INFO),
            (self.inner_status_code.is_some(), INNER_STATUS_CODE),
            (self.inner_diagnostic_info.is_some(), INNER_DIAGNOSTIC_INFO),
        ];
        for (present, bit) in bits {
            if present {
                mask |= bit;
            }
        }
        mask
    }
}

impl BinaryEncode for DiagnosticInfo {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u8(self.mask());
        // Wire order differs from bit order: locale precedes localized text.
        let ints = [self.symbolic_id, self.namespace_uri, self.locale, self.localized_text];
        for value in ints.into_iter().flatten() {
            writer.write_i32(value);
        }
        if let Some(info) = &self.additional_info {
            info.encode(writer);
        }
        if let Some(status) = self.inner_status_code {
            status.encode(writer);
        }
        if let Some(inner) = &self.inner_diagnostic_info {
            inner.encode(writer);
        }
    }
}

impl BinaryDecode for DiagnosticInfo {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let mask = reader.read_u8()?;
        let symbolic_id = read_masked_int(reader, mask, SYMBOLIC_ID)?;
        let namespace_uri = read_masked_int(reader, mask, NAMESPACE_URI)?;
        let locale = read_masked_int(reader, mask, LOCALE)?;
        let localized_text = read_masked_int(reader, mask, LOCALIZED_TEXT)?;
        let additional_info = if mask & ADDITIONAL_INFO != 0 {
            Some(UaString::decode(reader)?)
        } else {
            None
        };
        let inner_status_code = if mask & INNER_STATUS_CODE != 0 {
            Some(StatusCode::decode(reader)?)
        } else {
            None
        };
        let inner_diagnostic_info = if mask & INNER_DIAGNOSTIC_INFO != 0 {
            reader.enter_nested()?;
            let inner = DiagnosticInfo::decode(reader);
            reader.leave_nested();
            Some(Box::new(inner?))
        } else {
            None
        };
        Ok(Self {
            symbolic_id,
            namespace_uri,
            locale,
            localized_text,
            additional_info,
            inner_status_code,
            inner_diagnostic_info,
        })
    }
}

fn read_masked_int(reader: &mut BinaryReader<'_>, mask: u8, bit: u8) -> CodecResult<Option<i32>> {
    if mask & bit != 0 {
        reader.read_i32().map(Some)
    } else {
        Ok(None)
    }
}
