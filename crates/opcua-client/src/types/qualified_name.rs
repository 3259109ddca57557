// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::str::FromStr;

use super::UaString;
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult};

/// Name qualified by a namespace index (browse names).
///
/// Text form is `"<ns>:<name>"`, or just `"<name>"` in namespace 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub namespace_index: u16,
    pub name: UaString,
}

impl QualifiedName {
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: UaString::from(name.into()),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "{}:", self.namespace_index)?;
        }
        f.write_str(self.name.as_str())
    }
}

impl FromStr for QualifiedName {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A leading integer before ':' is the namespace; anything else is part of the name.
        match s.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && ns.bytes().all(|b| b.is_ascii_digit()) => {
                let namespace_index = ns.parse().map_err(|_| {
                    CodecError::InvalidData(format!("namespace index out of range in '{}'", s))
                })?;
                Ok(Self::new(namespace_index, name))
            }
            _ => Ok(Self::new(0, s)),
        }
    }
}

impl BinaryEncode for QualifiedName {
    fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_u16(self.namespace_index);
        self.name.encode(writer);
    }
}

impl BinaryDecode for QualifiedName {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        Ok(Self {
            namespace_index: reader.read_u16()?,
            name: UaString::decode(reader)?,
        })
    }
}

const LOCALE_BIT: u8 = 0x01;
const TEXT_BIT: u8 = 0x02;

/// Human-readable text with an optional locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocalizedText {
    pub locale: UaString,
    pub text: UaString,
}

impl LocalizedText {
    pub fn new(locale: &str, text: &str) -> Self {
        Self {
            locale: UaString::from(locale),
            text: UaString::from(text),
        }
    }
}

impl From<&str> for LocalizedText {
    fn from(text: &str) -> Self {
        Self {
            locale: UaString::null(),
            text: UaString::from(text),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.as_str())
    }
}

impl BinaryEncode for LocalizedText {
    fn encode(&self, writer: &mut BinaryWriter) {
        let mut mask = 0;
        if !self.locale.is_null() {
            mask |= LOCALE_BIT;
        }
        if !self.text.is_null() {
            mask |= TEXT_BIT;
        }
        writer.write_u8(mask);
        if mask & LOCALE_BIT != 0 {
            self.locale.encode(writer);
        }
        if mask & TEXT_BIT != 0 {
            self.text.encode(writer);
        }
    }
}

impl BinaryDecode for LocalizedText {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let mask = reader.read_u8()?;
        let locale = if mask & LOCALE_BIT != 0 {
            UaString::decode(reader)?
        } else {
            UaString::null()
        };
        let text = if mask & TEXT_BIT != 0 {
            UaString::decode(reader)?
        } else {
            UaString::null()
        };
        Ok(Self { locale, text })
    }
}
