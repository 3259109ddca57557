// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read / Write.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{
    AttributeId, DataValue, DiagnosticInfo, NodeId, QualifiedName, StatusCode,
    TimestampsToReturn, UaString,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: u32,
    pub index_range: UaString,
    pub data_encoding: QualifiedName,
}

impl_binary_struct!(ReadValueId {
    node_id,
    attribute_id,
    index_range,
    data_encoding,
});

impl ReadValueId {
    pub fn new(node_id: NodeId, attribute: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id: attribute.id(),
            index_range: UaString::null(),
            data_encoding: QualifiedName::default(),
        }
    }
}

impl From<NodeId> for ReadValueId {
    /// Reads the Value attribute.
    fn from(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadRequest {
    pub request_header: RequestHeader,
    /// Milliseconds; 0 asks for a fresh value.
    pub max_age: f64,
    pub timestamps_to_return: TimestampsToReturn,
    pub nodes_to_read: Vec<ReadValueId>,
}

impl_binary_struct!(ReadRequest {
    request_header,
    max_age,
    timestamps_to_return,
    nodes_to_read,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ReadResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<DataValue>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(ReadResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    pub node_id: NodeId,
    pub attribute_id: u32,
    pub index_range: UaString,
    pub value: DataValue,
}

impl_binary_struct!(WriteValue {
    node_id,
    attribute_id,
    index_range,
    value,
});

impl WriteValue {
    pub fn new(node_id: NodeId, attribute: AttributeId, value: DataValue) -> Self {
        Self {
            node_id,
            attribute_id: attribute.id(),
            index_range: UaString::null(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub request_header: RequestHeader,
    pub nodes_to_write: Vec<WriteValue>,
}

impl_binary_struct!(WriteRequest {
    request_header,
    nodes_to_write,
});

#[derive(Debug, Clone, PartialEq)]
pub struct WriteResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(WriteResponse {
    response_header,
    results,
    diagnostic_infos,
});
