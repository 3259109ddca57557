// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Variant: a value of any built-in type, scalar or array.
//!
//! Wire form is one encoding byte (type id in the low 6 bits, `0x80` array
//! flag, `0x40` dimensions flag) followed by the value. Arrays carry an
//! Int32 element count and, when flagged, a trailing Int32 dimensions array.

use std::fmt;

use super::{
    ByteString, DataValue, DateTime, DiagnosticInfo, ExpandedNodeId, ExtensionObject, Guid,
    LocalizedText, NodeId, QualifiedName, StatusCode, UaString, XmlElement,
};
use crate::codec::{BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, CodecError, CodecResult};

const TYPE_MASK: u8 = 0x3F;
const ARRAY_FLAG: u8 = 0x80;
const DIMENSIONS_FLAG: u8 = 0x40;

/// Built-in type ids (Part 6 Table 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariantTypeId {
    Boolean = 1,
    SByte = 2,
    Byte = 3,
    Int16 = 4,
    UInt16 = 5,
    Int32 = 6,
    UInt32 = 7,
    Int64 = 8,
    UInt64 = 9,
    Float = 10,
    Double = 11,
    String = 12,
    DateTime = 13,
    Guid = 14,
    ByteString = 15,
    XmlElement = 16,
    NodeId = 17,
    ExpandedNodeId = 18,
    StatusCode = 19,
    QualifiedName = 20,
    LocalizedText = 21,
    ExtensionObject = 22,
    DataValue = 23,
    Variant = 24,
    DiagnosticInfo = 25,
}

impl VariantTypeId {
    pub fn from_u8(value: u8) -> Option<Self> {
        use VariantTypeId::*;
        const ALL: [VariantTypeId; 25] = [
            Boolean,
            SByte,
            Byte,
            Int16,
            UInt16,
            Int32,
            UInt32,
            Int64,
            UInt64,
            Float,
            Double,
            String,
            DateTime,
            Guid,
            ByteString,
            XmlElement,
            NodeId,
            ExpandedNodeId,
            StatusCode,
            QualifiedName,
            LocalizedText,
            ExtensionObject,
            DataValue,
            Variant,
            DiagnosticInfo,
        ];
        ALL.get(usize::from(value).checked_sub(1)?).copied()
    }
}

/// Any OPC UA built-in value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Variant {
    #[default]
    Empty,
    Boolean(bool),
    SByte(i8),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(UaString),
    DateTime(DateTime),
    Guid(Guid),
    ByteString(ByteString),
    XmlElement(XmlElement),
    NodeId(NodeId),
    ExpandedNodeId(ExpandedNodeId),
    StatusCode(StatusCode),
    QualifiedName(QualifiedName),
    LocalizedText(LocalizedText),
    ExtensionObject(ExtensionObject),
    DataValue(Box<DataValue>),
    Variant(Box<Variant>),
    DiagnosticInfo(DiagnosticInfo),
    Array(Box<VariantArray>),
}

/// Homogeneous array, optionally multi-dimensional.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantArray {
    pub value_type: VariantTypeId,
    pub values: Vec<Variant>,
    pub dimensions: Option<Vec<i32>>,
}

impl VariantArray {
    /// Build a one-dimensional array; every element must be a scalar of `value_type`.
    pub fn new(value_type: VariantTypeId, values: Vec<Variant>) -> CodecResult<Self> {
        if let Some(bad) = values.iter().find(|v| v.scalar_type_id() != Some(value_type)) {
            return Err(CodecError::InvalidData(format!(
                "array of {:?} contains {:?}",
                value_type,
                bad.scalar_type_id()
            )));
        }
        Ok(Self {
            value_type,
            values,
            dimensions: None,
        })
    }
}

impl Variant {
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Variant::Array(_))
    }

    /// Type of the value, or of the elements for an array.
    pub fn type_id(&self) -> Option<VariantTypeId> {
        match self {
            Variant::Array(array) => Some(array.value_type),
            other => other.scalar_type_id(),
        }
    }

    fn scalar_type_id(&self) -> Option<VariantTypeId> {
        Some(match self {
            Variant::Empty | Variant::Array(_) => return None,
            Variant::Boolean(_) => VariantTypeId::Boolean,
            Variant::SByte(_) => VariantTypeId::SByte,
            Variant::Byte(_) => VariantTypeId::Byte,
            Variant::Int16(_) => VariantTypeId::Int16,
            Variant::UInt16(_) => VariantTypeId::UInt16,
            Variant::Int32(_) => VariantTypeId::Int32,
            Variant::UInt32(_) => VariantTypeId::UInt32,
            Variant::Int64(_) => VariantTypeId::Int64,
            Variant::UInt64(_) => VariantTypeId::UInt64,
            Variant::Float(_) => VariantTypeId::Float,
            Variant::Double(_) => VariantTypeId::Double,
            Variant::String(_) => VariantTypeId::String,
            Variant::DateTime(_) => VariantTypeId::DateTime,
            Variant::Guid(_) => VariantTypeId::Guid,
            Variant::ByteString(_) => VariantTypeId::ByteString,
            Variant::XmlElement(_) => VariantTypeId::XmlElement,
            Variant::NodeId(_) => VariantTypeId::NodeId,
            Variant::ExpandedNodeId(_) => VariantTypeId::ExpandedNodeId,
            Variant::StatusCode(_) => VariantTypeId::StatusCode,
            Variant::QualifiedName(_) => VariantTypeId::QualifiedName,
            Variant::LocalizedText(_) => VariantTypeId::LocalizedText,
            Variant::ExtensionObject(_) => VariantTypeId::ExtensionObject,
            Variant::DataValue(_) => VariantTypeId::DataValue,
            Variant::Variant(_) => VariantTypeId::Variant,
            Variant::DiagnosticInfo(_) => VariantTypeId::DiagnosticInfo,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Any integer type widened to i64 (UInt64 above i64::MAX excluded).
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Variant::SByte(v) => Some(i64::from(v)),
            Variant::Byte(v) => Some(i64::from(v)),
            Variant::Int16(v) => Some(i64::from(v)),
            Variant::UInt16(v) => Some(i64::from(v)),
            Variant::Int32(v) => Some(i64::from(v)),
            Variant::UInt32(v) => Some(i64::from(v)),
            Variant::Int64(v) => Some(v),
            Variant::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any numeric type as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Variant::Float(v) => Some(f64::from(v)),
            Variant::Double(v) => Some(v),
            Variant::UInt64(v) => Some(v as f64),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(s) => Some(s.as_str()),
            Variant::LocalizedText(t) => Some(t.text.as_str()),
            _ => None,
        }
    }

    pub fn as_node_id(&self) -> Option<&NodeId> {
        match self {
            Variant::NodeId(id) => Some(id),
            _ => None,
        }
    }

    fn encode_body(&self, writer: &mut BinaryWriter) {
        match self {
            Variant::Empty | Variant::Array(_) => {}
            Variant::Boolean(v) => v.encode(writer),
            Variant::SByte(v) => v.encode(writer),
            Variant::Byte(v) => v.encode(writer),
            Variant::Int16(v) => v.encode(writer),
            Variant::UInt16(v) => v.encode(writer),
            Variant::Int32(v) => v.encode(writer),
            Variant::UInt32(v) => v.encode(writer),
            Variant::Int64(v) => v.encode(writer),
            Variant::UInt64(v) => v.encode(writer),
            Variant::Float(v) => v.encode(writer),
            Variant::Double(v) => v.encode(writer),
            Variant::String(v) => v.encode(writer),
            Variant::DateTime(v) => v.encode(writer),
            Variant::Guid(v) => v.encode(writer),
            Variant::ByteString(v) => v.encode(writer),
            Variant::XmlElement(v) => v.encode(writer),
            Variant::NodeId(v) => v.encode(writer),
            Variant::ExpandedNodeId(v) => v.encode(writer),
            Variant::StatusCode(v) => v.encode(writer),
            Variant::QualifiedName(v) => v.encode(writer),
            Variant::LocalizedText(v) => v.encode(writer),
            Variant::ExtensionObject(v) => v.encode(writer),
            Variant::DataValue(v) => v.encode(writer),
            Variant::Variant(v) => v.encode(writer),
            Variant::DiagnosticInfo(v) => v.encode(writer),
        }
    }

    fn decode_body(reader: &mut BinaryReader<'_>, type_id: VariantTypeId) -> CodecResult<Self> {
        Ok(match type_id {
            VariantTypeId::Boolean => Variant::Boolean(bool::decode(reader)?),
            VariantTypeId::SByte => Variant::SByte(reader.read_i8()?),
            VariantTypeId::Byte => Variant::Byte(reader.read_u8()?),
            VariantTypeId::Int16 => Variant::Int16(reader.read_i16()?),
            VariantTypeId::UInt16 => Variant::UInt16(reader.read_u16()?),
            VariantTypeId::Int32 => Variant::Int32(reader.read_i32()?),
            VariantTypeId::UInt32 => Variant::UInt32(reader.read_u32()?),
            VariantTypeId::Int64 => Variant::Int64(reader.read_i64()?),
            VariantTypeId::UInt64 => Variant::UInt64(reader.read_u64()?),
            VariantTypeId::Float => Variant::Float(reader.read_f32()?),
            VariantTypeId::Double => Variant::Double(reader.read_f64()?),
            VariantTypeId::String => Variant::String(UaString::decode(reader)?),
            VariantTypeId::DateTime => Variant::DateTime(DateTime::decode(reader)?),
            VariantTypeId::Guid => Variant::Guid(Guid::decode(reader)?),
            VariantTypeId::ByteString => Variant::ByteString(ByteString::decode(reader)?),
            VariantTypeId::XmlElement => Variant::XmlElement(XmlElement::decode(reader)?),
            VariantTypeId::NodeId => Variant::NodeId(NodeId::decode(reader)?),
            VariantTypeId::ExpandedNodeId => {
                Variant::ExpandedNodeId(ExpandedNodeId::decode(reader)?)
            }
            VariantTypeId::StatusCode => Variant::StatusCode(StatusCode::decode(reader)?),
            VariantTypeId::QualifiedName => Variant::QualifiedName(QualifiedName::decode(reader)?),
            VariantTypeId::LocalizedText => Variant::LocalizedText(LocalizedText::decode(reader)?),
            VariantTypeId::ExtensionObject => {
                Variant::ExtensionObject(ExtensionObject::decode(reader)?)
            }
            VariantTypeId::DataValue => {
                reader.enter_nested()?;
                let value = DataValue::decode(reader);
                reader.leave_nested();
                Variant::DataValue(Box::new(value?))
            }
            VariantTypeId::Variant => {
                reader.enter_nested()?;
                let value = Variant::decode(reader);
                reader.leave_nested();
                Variant::Variant(Box::new(value?))
            }
            VariantTypeId::DiagnosticInfo => {
                Variant::DiagnosticInfo(DiagnosticInfo::decode(reader)?)
            }
        })
    }
}

impl BinaryEncode for Variant {
    fn encode(&self, writer: &mut BinaryWriter) {
        match self {
            Variant::Empty => writer.write_u8(0),
            Variant::Array(array) => {
                let mut encoding = array.value_type as u8 | ARRAY_FLAG;
                if array.dimensions.is_some() {
                    encoding |= DIMENSIONS_FLAG;
                }
                writer.write_u8(encoding);
                writer.write_length(Some(array.values.len()));
                for value in &array.values {
                    value.encode_body(writer);
                }
                if let Some(dimensions) = &array.dimensions {
                    dimensions.encode(writer);
                }
            }
            scalar => {
                if let Some(type_id) = scalar.scalar_type_id() {
                    writer.write_u8(type_id as u8);
                    scalar.encode_body(writer);
                }
            }
        }
    }
}

impl BinaryDecode for Variant {
    fn decode(reader: &mut BinaryReader<'_>) -> CodecResult<Self> {
        let encoding = reader.read_u8()?;
        let raw_type = encoding & TYPE_MASK;
        if raw_type == 0 {
            return Ok(Variant::Empty);
        }
        let type_id = VariantTypeId::from_u8(raw_type).ok_or(CodecError::UnknownEncoding {
            what: "variant type",
            value: u32::from(raw_type),
        })?;
        if encoding & ARRAY_FLAG == 0 {
            return Self::decode_body(reader, type_id);
        }
        let limit = reader.options().max_array_length;
        let len = reader.read_length("array", limit, 1)?.unwrap_or(0);
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(Self::decode_body(reader, type_id)?);
        }
        let dimensions = if encoding & DIMENSIONS_FLAG != 0 {
            Some(Vec::<i32>::decode(reader)?)
        } else {
            None
        };
        Ok(Variant::Array(Box::new(VariantArray {
            value_type: type_id,
            values,
            dimensions,
        })))
    }
}

macro_rules! impl_from_scalar {
    ($($type:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$type> for Variant {
                fn from(value: $type) -> Self {
                    Variant::$variant(value.into())
                }
            }
        )+
    };
}

impl_from_scalar! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    &str => String,
    String => String,
    UaString => String,
    DateTime => DateTime,
    Guid => Guid,
    ByteString => ByteString,
    NodeId => NodeId,
    StatusCode => StatusCode,
    QualifiedName => QualifiedName,
    LocalizedText => LocalizedText,
    ExtensionObject => ExtensionObject,
}

impl From<VariantArray> for Variant {
    fn from(array: VariantArray) -> Self {
        Variant::Array(Box::new(array))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => f.write_str("(empty)"),
            Variant::Boolean(v) => write!(f, "{}", v),
            Variant::String(v) => write!(f, "{}", v),
            Variant::NodeId(v) => write!(f, "{}", v),
            Variant::StatusCode(v) => write!(f, "{}", v),
            Variant::QualifiedName(v) => write!(f, "{}", v),
            Variant::LocalizedText(v) => write!(f, "{}", v),
            Variant::DateTime(v) => write!(f, "{}", v),
            Variant::Guid(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Double(v) => write!(f, "{}", v),
            Variant::UInt64(v) => write!(f, "{}", v),
            Variant::Array(array) => {
                f.write_str("[")?;
                for (i, value) in array.values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            other => match other.as_i64() {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "{:?}", other),
            },
        }
    }
}
