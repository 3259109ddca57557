// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Monitored item services.

use super::{ReadValueId, RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{
    DataChangeTrigger, DeadbandType, DiagnosticInfo, ExtensionObject, MonitoringMode, NodeId,
    StatusCode, TimestampsToReturn, ids,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringParameters {
    pub client_handle: u32,
    /// Milliseconds; -1 uses the publishing interval.
    pub sampling_interval: f64,
    pub filter: ExtensionObject,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

impl_binary_struct!(MonitoringParameters {
    client_handle,
    sampling_interval,
    filter,
    queue_size,
    discard_oldest,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateRequest {
    pub item_to_monitor: ReadValueId,
    pub monitoring_mode: MonitoringMode,
    pub requested_parameters: MonitoringParameters,
}

impl_binary_struct!(MonitoredItemCreateRequest {
    item_to_monitor,
    monitoring_mode,
    requested_parameters,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemCreateResult {
    pub status_code: StatusCode,
    pub monitored_item_id: u32,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
    pub filter_result: ExtensionObject,
}

impl_binary_struct!(MonitoredItemCreateResult {
    status_code,
    monitored_item_id,
    revised_sampling_interval,
    revised_queue_size,
    filter_result,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

impl_binary_struct!(CreateMonitoredItemsRequest {
    request_header,
    subscription_id,
    timestamps_to_return,
    items_to_create,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CreateMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<MonitoredItemCreateResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(CreateMonitoredItemsResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemModifyRequest {
    pub monitored_item_id: u32,
    pub requested_parameters: MonitoringParameters,
}

impl_binary_struct!(MonitoredItemModifyRequest {
    monitored_item_id,
    requested_parameters,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemModifyResult {
    pub status_code: StatusCode,
    pub revised_sampling_interval: f64,
    pub revised_queue_size: u32,
    pub filter_result: ExtensionObject,
}

impl_binary_struct!(MonitoredItemModifyResult {
    status_code,
    revised_sampling_interval,
    revised_queue_size,
    filter_result,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub timestamps_to_return: TimestampsToReturn,
    pub items_to_modify: Vec<MonitoredItemModifyRequest>,
}

impl_binary_struct!(ModifyMonitoredItemsRequest {
    request_header,
    subscription_id,
    timestamps_to_return,
    items_to_modify,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<MonitoredItemModifyResult>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(ModifyMonitoredItemsResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct SetMonitoringModeRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub monitoring_mode: MonitoringMode,
    pub monitored_item_ids: Vec<u32>,
}

impl_binary_struct!(SetMonitoringModeRequest {
    request_header,
    subscription_id,
    monitoring_mode,
    monitored_item_ids,
});

#[derive(Debug, Clone, PartialEq)]
pub struct SetMonitoringModeResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(SetMonitoringModeResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMonitoredItemsRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub monitored_item_ids: Vec<u32>,
}

impl_binary_struct!(DeleteMonitoredItemsRequest {
    request_header,
    subscription_id,
    monitored_item_ids,
});

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteMonitoredItemsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(DeleteMonitoredItemsResponse {
    response_header,
    results,
    diagnostic_infos,
});

/// Filter reporting a data change only when the trigger condition holds and
/// the value moved by more than the deadband.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataChangeFilter {
    pub trigger: DataChangeTrigger,
    pub deadband_type: DeadbandType,
    pub deadband_value: f64,
}

impl_binary_struct!(DataChangeFilter {
    trigger,
    deadband_type,
    deadband_value,
});

impl DataChangeFilter {
    pub fn to_extension_object(&self) -> ExtensionObject {
        ExtensionObject::from_encodable(NodeId::ns0(ids::encoding::DATA_CHANGE_FILTER), self)
    }
}
