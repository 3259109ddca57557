// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! NodeId and ExpandedNodeId.
//!
//! Text form follows the OPC UA convention: `ns=2;s=Boiler`, `i=2253`,
//! `ns=1;g=72962B91-FA75-4AE6-8D28-B404DC7DAF63`, `ns=3;b=AAEC`. The
//! namespace prefix is omitted for namespace 0.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use super::{ByteString, Guid, UaString};
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult};

const ENCODING_TWO_BYTE: u8 = 0x00;
const ENCODING_FOUR_BYTE: u8 = 0x01;
const ENCODING_NUMERIC: u8 = 0x02;
const ENCODING_STRING: u8 = 0x03;
const ENCODING_GUID: u8 = 0x04;
const ENCODING_BYTE_STRING: u8 = 0x05;
const ENCODING_MASK: u8 = 0x3F;

const FLAG_NAMESPACE_URI: u8 = 0x80;
const FLAG_SERVER_INDEX: u8 = 0x40;

/// Identifier part of a NodeId.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identifier {
    Numeric(u32),
    String(String),
    Guid(Guid),
    Opaque(Vec<u8>),
}

/// Address-space node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub namespace: u16,
    pub identifier: Identifier,
}

impl NodeId {
    pub fn numeric(namespace: u16, id: u32) -> Self {
        Self {
            namespace,
            identifier: Identifier::Numeric(id),
        }
    }

    pub fn string(namespace: u16, id: impl Into<String>) -> Self {
        Self {
            namespace,
            identifier: Identifier::String(id.into()),
        }
    }

    pub fn guid(namespace: u16, id: Guid) -> Self {
        Self {
            namespace,
            identifier: Identifier::Guid(id),
        }
    }

    pub fn opaque(namespace: u16, id: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace,
            identifier: Identifier::Opaque(id.into()),
        }
    }

    /// Numeric node in namespace 0 (standard nodes, encoding ids).
    pub const fn ns0(id: u32) -> Self {
        Self {
            namespace: 0,
            identifier: Identifier::Numeric(id),
        }
    }

    pub const fn null() -> Self {
        Self::ns0(0)
    }

    pub fn is_null(&self) -> bool {
        self.namespace == 0
            && match &self.identifier {
                Identifier::Numeric(id) => *id == 0,
                Identifier::String(s) => s.is_empty(),
                Identifier::Guid(g) => g.is_null(),
                Identifier::Opaque(b) => b.is_empty(),
            }
    }

    /// Numeric identifier in namespace 0, if this is one.
    pub fn as_ns0(&self) -> Option<u32> {
        match (&self.identifier, self.namespace) {
            (Identifier::Numeric(id), 0) => Some(*id),
            _ => None,
        }
    }

    fn encode_with_flags(&self, writer: &mut BinaryWriter, flags: u8) {
        match &self.identifier {
            Identifier::Numeric(id) if self.namespace == 0 && *id <= 0xFF => {
                writer.write_u8(ENCODING_TWO_BYTE | flags);
                writer.write_u8(*id as u8);
            }
            Identifier::Numeric(id) if self.namespace <= 0xFF && *id <= 0xFFFF => {
                writer.write_u8(ENCODING_FOUR_BYTE | flags);
                writer.write_u8(self.namespace as u8);
                writer.write_u16(*id as u16);
            }
            Identifier::Numeric(id) => {
                writer.write_u8(ENCODING_NUMERIC | flags);
                writer.write_u16(self.namespace);
                writer.write_u32(*id);
            }
            Identifier::String(s) => {
                writer.write_u8(ENCODING_STRING | flags);
                writer.write_u16(self.namespace);
                s.encode(writer);
            }
            Identifier::Guid(g) => {
                writer.write_u8(ENCODING_GUID | flags);
                writer.write_u16(self.namespace);
                g.encode(writer);
            }
            Identifier::Opaque(b) => {
                writer.write_u8(ENCODING_BYTE_STRING | flags);
                writer.write_u16(self.namespace);
                writer.write_length(Some(b.len()));
                writer.write_bytes(b);
            }
        }
    }

    fn decode_body(reader: &mut BinaryReader<'_>, encoding: u8) -> CodecResult<Self> {
        match encoding & ENCODING_MASK {
            ENCODING_TWO_BYTE => Ok(Self::numeric(0, u32::from(reader.read_u8()?))),
            ENCODING_FOUR_BYTE => {
                let namespace = u16::from(reader.read_u8()?);
                Ok(Self::numeric(namespace, u32::from(reader.read_u16()?)))
            }
            ENCODING_NUMERIC => {
                let namespace = reader.read_u16()?;
                Ok(Self::numeric(namespace, reader.read_u32()?))
            }
            ENCODING_STRING => {
                let namespace = reader.read_u16()?;
                Ok(Self::string(namespace, String::decode(reader)?))
            }
            ENCODING_GUID => {
                let namespace = reader.read_u16()?;
                Ok(Self::guid(namespace, Guid::decode(reader)?))
            }
            ENCODING_BYTE_STRING => {
                let namespace = reader.read_u16()?;
                let bytes = ByteString::decode(reader)?.into_option().unwrap_or_default();
                Ok(Self::opaque(namespace, bytes))
            }
            other => Err(CodecError::UnknownEncoding {
                what: "NodeId encoding",
                value: u32::from(other),
            }),
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self::ns0(id)
    }
}

impl From<(u16, u32)> for NodeId {
    fn from((namespace, id): (u16, u32)) -> Self {
        Self::numeric(namespace, id)
    }
}

impl From<(u16, &str)> for NodeId {
    fn from((namespace, id): (u16, &str)) -> Self {
        Self::string(namespace, id)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(id) => write!(f, "i={}", id),
            Self::String(s) => write!(f, "s={}", s),
            Self::Guid(g) => write!(f, "g={}", g),
            Self::Opaque(b) => write!(f, "b={}", BASE64.encode(b)),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace != 0 {
            write!(f, "ns={};", self.namespace)?;
        }
        write!(f, "{}", self.identifier)
    }
}

fn parse_identifier(text: &str, original: &str) -> Result<Identifier, CodecError> {
    let invalid = || CodecError::InvalidData(format!("invalid NodeId '{}'", original));
    let (kind, value) = text.split_once('=').ok_or_else(invalid)?;
    match kind {
        "i" => value.parse().map(Identifier::Numeric).map_err(|_| invalid()),
        "s" => Ok(Identifier::String(value.to_owned())),
        "g" => value.parse().map(Identifier::Guid),
        "b" => BASE64
            .decode(value)
            .map(Identifier::Opaque)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

impl FromStr for NodeId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        match text.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, identifier) = rest
                    .split_once(';')
                    .ok_or_else(|| CodecError::InvalidData(format!("invalid NodeId '{}'", s)))?;
                let namespace = ns
                    .parse()
                    .map_err(|_| CodecError::InvalidData(format!("invalid namespace in '{}'", s)))?;
                Ok(Self {
                    namespace,
                    identifier: parse_identifier(identifier, s)?,
                })
            }
            None => Ok(Self {
                namespace: 0,
                identifier: parse_identifier(text, s)?,
            }),
        }
    }
}

impl BinaryEncode for NodeId {
    fn encode(&self, writer: &mut BinaryWriter) {
        self.encode_with_flags(writer, 0);
    }
}

impl BinaryDecode for NodeId {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let encoding = reader.read_u8()?;
        if encoding & (FLAG_NAMESPACE_URI | FLAG_SERVER_INDEX) != 0 {
            return Err(CodecError::UnknownEncoding {
                what: "NodeId encoding",
                value: u32::from(encoding),
            });
        }
        Self::decode_body(reader, encoding)
    }
}

/// NodeId qualified with an optional namespace URI and server index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpandedNodeId {
    pub node_id: NodeId,
    pub namespace_uri: UaString,
    pub server_index: u32,
}

impl ExpandedNodeId {
    /// Local NodeId when the reference does not point into another server.
    pub fn as_local(&self) -> Option<&NodeId> {
        (self.server_index == 0 && self.namespace_uri.is_null()).then_some(&self.node_id)
    }
}

impl From<NodeId> for ExpandedNodeId {
    fn from(node_id: NodeId) -> Self {
        Self {
            node_id,
            namespace_uri: UaString::null(),
            server_index: 0,
        }
    }
}

impl fmt::Display for ExpandedNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.server_index != 0 {
            write!(f, "svr={};", self.server_index)?;
        }
        match self.namespace_uri.as_option() {
            Some(uri) => write!(f, "nsu={};{}", uri, self.node_id.identifier),
            None => write!(f, "{}", self.node_id),
        }
    }
}

impl BinaryEncode for ExpandedNodeId {
    fn encode(&self, writer: &mut BinaryWriter) {
        let mut flags = 0;
        if !self.namespace_uri.is_null() {
            flags |= FLAG_NAMESPACE_URI;
        }
        if self.server_index != 0 {
            flags |= FLAG_SERVER_INDEX;
        }
        self.node_id.encode_with_flags(writer, flags);
        if !self.namespace_uri.is_null() {
            self.namespace_uri.encode(writer);
        }
        if self.server_index != 0 {
            writer.write_u32(self.server_index);
        }
    }
}

impl BinaryDecode for ExpandedNodeId {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let encoding = reader.read_u8()?;
        let node_id = NodeId::decode_body(reader, encoding)?;
        let namespace_uri = if encoding & FLAG_NAMESPACE_URI != 0 {
            UaString::decode(reader)?
        } else {
            UaString::null()
        };
        let server_index = if encoding & FLAG_SERVER_INDEX != 0 {
            reader.read_u32()?
        } else {
            0
        };
        Ok(Self {
            node_id,
            namespace_uri,
            server_index,
        })
    }
}
