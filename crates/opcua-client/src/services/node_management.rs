// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! AddNodes and the node attribute structures it carries.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{
    DiagnosticInfo, ExpandedNodeId, ExtensionObject, LocalizedText, NodeClass, NodeId,
    QualifiedName, StatusCode, Variant,
};

/// `specified_attributes` bits (Part 4, NodeAttributesMask).
pub mod attributes_mask {
    pub const ACCESS_LEVEL: u32 = 1;
    pub const DATA_TYPE: u32 = 1 << 4;
    pub const DESCRIPTION: u32 = 1 << 5;
    pub const DISPLAY_NAME: u32 = 1 << 6;
    pub const USER_ACCESS_LEVEL: u32 = 1 << 16;
    pub const VALUE_RANK: u32 = 1 << 19;
    pub const VALUE: u32 = 1 << 21;
}

/// AccessLevel bits.
pub const ACCESS_LEVEL_CURRENT_READ: u8 = 1;
pub const ACCESS_LEVEL_CURRENT_WRITE: u8 = 2;

/// ValueRank of a scalar.
pub const VALUE_RANK_SCALAR: i32 = -1;
/// ValueRank of a one-dimensional array.
pub const VALUE_RANK_ONE_DIMENSION: i32 = 1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectAttributes {
    pub specified_attributes: u32,
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
    pub event_notifier: u8,
}

impl_binary_struct!(ObjectAttributes {
    specified_attributes,
    display_name,
    description,
    write_mask,
    user_write_mask,
    event_notifier,
});

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAttributes {
    pub specified_attributes: u32,
    pub display_name: LocalizedText,
    pub description: LocalizedText,
    pub write_mask: u32,
    pub user_write_mask: u32,
    pub value: Variant,
    pub data_type: NodeId,
    pub value_rank: i32,
    pub array_dimensions: Vec<u32>,
    pub access_level: u8,
    pub user_access_level: u8,
    /// Milliseconds.
    pub minimum_sampling_interval: f64,
    pub historizing: bool,
}

impl_binary_struct!(VariableAttributes {
    specified_attributes,
    display_name,
    description,
    write_mask,
    user_write_mask,
    value,
    data_type,
    value_rank,
    array_dimensions,
    access_level,
    user_access_level,
    minimum_sampling_interval,
    historizing,
});

#[derive(Debug, Clone, PartialEq)]
pub struct AddNodesItem {
    pub parent_node_id: ExpandedNodeId,
    pub reference_type_id: NodeId,
    /// Null lets the server pick the id.
    pub requested_new_node_id: ExpandedNodeId,
    pub browse_name: QualifiedName,
    pub node_class: NodeClass,
    /// `ObjectAttributes` or `VariableAttributes`, matching `node_class`.
    pub node_attributes: ExtensionObject,
    pub type_definition: ExpandedNodeId,
}

impl_binary_struct!(AddNodesItem {
    parent_node_id,
    reference_type_id,
    requested_new_node_id,
    browse_name,
    node_class,
    node_attributes,
    type_definition,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddNodesResult {
    pub status_code: StatusCode,
    pub added_node_id: NodeId,
}

impl_binary_struct!(AddNodesResult {
    status_code,
    added_node_id,
});

#[derive(Debug, Clone, PartialEq)]
pub struct AddNodesRequest {
    pub request_header: RequestHeader,
    pub nodes_to_add: Vec<AddNodesItem>,
}

impl_binary_struct!(AddNodesRequest {
    request_header,
    nodes_to_add,
});

#[derive(Debug, Clone, PartialEq)]
pub struct AddNodesResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<AddNodesResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(AddNodesResponse {
    response_header,
    results,
    diagnostic_infos,
});
