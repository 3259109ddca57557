// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA built-in types.

mod data_value;
mod date_time;
mod diagnostic_info;
mod enums;
mod extension_object;
mod guid;
pub mod ids;
mod node_id;
mod qualified_name;
mod status_code;
mod string;
mod variant;

pub use data_value::DataValue;
pub use date_time::DateTime;
pub use diagnostic_info::DiagnosticInfo;
pub use enums::{
    ApplicationType, BrowseDirection, DataChangeTrigger, DeadbandType, MessageSecurityMode,
    MonitoringMode, NodeClass, SecurityTokenRequestType, TimestampsToReturn, UserTokenType,
};
pub use extension_object::{ExtensionObject, ExtensionObjectBody};
pub use guid::Guid;
pub use ids::AttributeId;
pub use node_id::{ExpandedNodeId, Identifier, NodeId};
pub use qualified_name::{LocalizedText, QualifiedName};
pub use status_code::StatusCode;
pub use string::{ByteString, UaString, XmlElement};
pub use variant::{Variant, VariantArray, VariantTypeId};
