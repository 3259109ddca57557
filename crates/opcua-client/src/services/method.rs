// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{DiagnosticInfo, NodeId, StatusCode, Variant};

#[derive(Debug, Clone, PartialEq)]
pub struct CallMethodRequest {
    pub object_id: NodeId,
    pub method_id: NodeId,
    pub input_arguments: Vec<Variant>,
}

impl_binary_struct!(CallMethodRequest {
    object_id,
    method_id,
    input_arguments,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CallMethodResult {
    pub status_code: StatusCode,
    pub input_argument_results: Vec<StatusCode>,
    pub input_argument_diagnostic_infos: Vec<DiagnosticInfo>,
    pub output_arguments: Vec<Variant>,
}

impl_binary_struct!(CallMethodResult {
    status_code,
    input_argument_results,
    input_argument_diagnostic_infos,
    output_arguments,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    pub request_header: RequestHeader,
    pub methods_to_call: Vec<CallMethodRequest>,
}

impl_binary_struct!(CallRequest {
    request_header,
    methods_to_call,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<CallMethodResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(CallResponse {
    response_header,
    results,
    diagnostic_infos,
});
