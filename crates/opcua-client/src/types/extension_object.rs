// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{ByteString, NodeId, UaString};
use crate::codec::{
    BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult,
    DecodingOptions,
};

const BODY_NONE: u8 = 0;
const BODY_BYTE_STRING: u8 = 1;
const BODY_XML: u8 = 2;

/// Body of an [`ExtensionObject`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExtensionObjectBody {
    #[default]
    None,
    Binary(Vec<u8>),
    Xml(UaString),
}

/// Structure tagged by the NodeId of its encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionObject {
    pub type_id: NodeId,
    pub body: ExtensionObjectBody,
}

impl ExtensionObject {
    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.type_id.is_null() && self.body == ExtensionObjectBody::None
    }

    /// Wrap a value in a binary body tagged with `type_id`.
    pub fn from_encodable<T: BinaryEncode>(type_id: NodeId, value: &T) -> Self {
        Self {
            type_id,
            body: ExtensionObjectBody::Binary(value.encode_to_vec()),
        }
    }

    /// Decode the binary body as `T`. The caller checks `type_id` first.
    pub fn decode_inner<T: BinaryDecode>(&self, options: DecodingOptions) -> CodecResult<T> {
        match &self.body {
            ExtensionObjectBody::Binary(bytes) => T::decode_with_options(bytes, options),
            ExtensionObjectBody::None => Err(CodecError::InvalidData(format!(
                "extension object {} has no body",
                self.type_id
            ))),
            ExtensionObjectBody::Xml(_) => Err(CodecError::UnknownEncoding {
                what: "extension object body",
                value: u32::from(BODY_XML),
            }),
        }
    }

    /// Numeric encoding id in namespace 0, if any.
    pub fn encoding_id(&self) -> Option<u32> {
        self.type_id.as_ns0()
    }
}

impl BinaryEncode for ExtensionObject {
    fn encode(&self, writer: &mut BinaryWriter) {
        self.type_id.encode(writer);
        match &self.body {
            ExtensionObjectBody::None => writer.write_u8(BODY_NONE),
            ExtensionObjectBody::Binary(bytes) => {
                writer.write_u8(BODY_BYTE_STRING);
                writer.write_length(Some(bytes.len()));
                writer.write_bytes(bytes);
            }
            ExtensionObjectBody::Xml(xml) => {
                writer.write_u8(BODY_XML);
                xml.encode(writer);
            }
        }
    }
}

impl BinaryDecode for ExtensionObject {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let type_id = NodeId::decode(reader)?;
        let body = match reader.read_u8()? {
            BODY_NONE => ExtensionObjectBody::None,
            BODY_BYTE_STRING => {
                ExtensionObjectBody::Binary(ByteString::decode(reader)?.into_option().unwrap_or_default())
            }
            BODY_XML => ExtensionObjectBody::Xml(UaString::decode(reader)?),
            other => {
                return Err(CodecError::UnknownEncoding {
                    what: "extension object body",
                    value: u32::from(other),
                })
            }
        };
        Ok(Self { type_id, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QualifiedName;

    #[test]
    fn test_null_object_layout() {
        assert_eq!(ExtensionObject::null().encode_to_vec(), vec![0, 0, 0]);
        assert!(ExtensionObject::decode_from_slice(&[0, 0, 0]).unwrap().is_null());
    }

    #[test]
    fn test_typed_body_roundtrip() {
        let name = QualifiedName::new(2, "Pump");
        let object = ExtensionObject::from_encodable(NodeId::ns0(862), &name);
        let decoded = ExtensionObject::decode_from_slice(&object.encode_to_vec()).unwrap();
        assert_eq!(decoded.encoding_id(), Some(862));
        let inner: QualifiedName = decoded.decode_inner(DecodingOptions::default()).unwrap();
        assert_eq!(inner, name);
    }

    #[test]
    fn test_unknown_body_encoding() {
        assert!(matches!(
            ExtensionObject::decode_from_slice(&[0, 1, 7]),
            Err(CodecError::UnknownEncoding { value: 7, .. })
        ));
    }
}
