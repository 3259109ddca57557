// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Browse / BrowseNext.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{
    ids, BrowseDirection, ByteString, DateTime, DiagnosticInfo, ExpandedNodeId, LocalizedText,
    NodeClass, NodeId, QualifiedName, StatusCode,
};

/// All ReferenceDescription fields.
pub const BROWSE_RESULT_MASK_ALL: u32 = 0x3F;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewDescription {
    pub view_id: NodeId,
    pub timestamp: DateTime,
    pub view_version: u32,
}

impl_binary_struct!(ViewDescription {
    view_id,
    timestamp,
    view_version,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseDescription {
    pub node_id: NodeId,
    pub browse_direction: BrowseDirection,
    pub reference_type_id: NodeId,
    pub include_subtypes: bool,
    /// Zero selects every node class.
    pub node_class_mask: u32,
    pub result_mask: u32,
}

impl_binary_struct!(BrowseDescription {
    node_id,
    browse_direction,
    reference_type_id,
    include_subtypes,
    node_class_mask,
    result_mask,
});

impl BrowseDescription {
    /// Forward hierarchical references of `node_id`, all node classes, all fields.
    pub fn children_of(node_id: NodeId) -> Self {
        Self {
            node_id,
            browse_direction: BrowseDirection::Forward,
            reference_type_id: NodeId::ns0(ids::reference_type::HIERARCHICAL_REFERENCES),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: BROWSE_RESULT_MASK_ALL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDescription {
    pub reference_type_id: NodeId,
    pub is_forward: bool,
    pub node_id: ExpandedNodeId,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub node_class: NodeClass,
    pub type_definition: ExpandedNodeId,
}

impl_binary_struct!(ReferenceDescription {
    reference_type_id,
    is_forward,
    node_id,
    browse_name,
    display_name,
    node_class,
    type_definition,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseResult {
    pub status_code: StatusCode,
    /// Non-null when more references remain; pass to BrowseNext.
    pub continuation_point: ByteString,
    pub references: Vec<ReferenceDescription>,
}

impl_binary_struct!(BrowseResult {
    status_code,
    continuation_point,
    references,
});

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseRequest {
    pub request_header: RequestHeader,
    pub view: ViewDescription,
    pub requested_max_references_per_node: u32,
    pub nodes_to_browse: Vec<BrowseDescription>,
}

impl_binary_struct!(BrowseRequest {
    request_header,
    view,
    requested_max_references_per_node,
    nodes_to_browse,
});

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<BrowseResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(BrowseResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseNextRequest {
    pub request_header: RequestHeader,
    pub release_continuation_points: bool,
    pub continuation_points: Vec<ByteString>,
}

impl_binary_struct!(BrowseNextRequest {
    request_header,
    release_continuation_points,
    continuation_points,
});

#[derive(Debug, Clone, PartialEq)]
pub struct BrowseNextResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<BrowseResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(BrowseNextResponse {
    response_header,
    results,
    diagnostic_infos,
});
