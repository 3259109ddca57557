// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription services, Publish / Republish and notification payloads.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{DataValue, DateTime, DiagnosticInfo, ExtensionObject, StatusCode, Variant};

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionRequest {
    pub request_header: RequestHeader,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

impl_binary_struct!(CreateSubscriptionRequest {
    request_header,
    requested_publishing_interval,
    requested_lifetime_count,
    requested_max_keep_alive_count,
    max_notifications_per_publish,
    publishing_enabled,
    priority,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSubscriptionResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

impl_binary_struct!(CreateSubscriptionResponse {
    response_header,
    subscription_id,
    revised_publishing_interval,
    revised_lifetime_count,
    revised_max_keep_alive_count,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub requested_publishing_interval: f64,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub priority: u8,
}

impl_binary_struct!(ModifySubscriptionRequest {
    request_header,
    subscription_id,
    requested_publishing_interval,
    requested_lifetime_count,
    requested_max_keep_alive_count,
    max_notifications_per_publish,
    priority,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ModifySubscriptionResponse {
    pub response_header: ResponseHeader,
    pub revised_publishing_interval: f64,
    pub revised_lifetime_count: u32,
    pub revised_max_keep_alive_count: u32,
}

impl_binary_struct!(ModifySubscriptionResponse {
    response_header,
    revised_publishing_interval,
    revised_lifetime_count,
    revised_max_keep_alive_count,
});

#[derive(Debug, Clone, PartialEq)]
pub struct SetPublishingModeRequest {
    pub request_header: RequestHeader,
    pub publishing_enabled: bool,
    pub subscription_ids: Vec<u32>,
}

impl_binary_struct!(SetPublishingModeRequest {
    request_header,
    publishing_enabled,
    subscription_ids,
});

#[derive(Debug, Clone, PartialEq)]
pub struct SetPublishingModeResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(SetPublishingModeResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSubscriptionsRequest {
    pub request_header: RequestHeader,
    pub subscription_ids: Vec<u32>,
}

impl_binary_struct!(DeleteSubscriptionsRequest {
    request_header,
    subscription_ids,
});

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteSubscriptionsResponse {
    pub response_header: ResponseHeader,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(DeleteSubscriptionsResponse {
    response_header,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionAcknowledgement {
    pub subscription_id: u32,
    pub sequence_number: u32,
}

impl_binary_struct!(SubscriptionAcknowledgement {
    subscription_id,
    sequence_number,
});

#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub request_header: RequestHeader,
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

impl_binary_struct!(PublishRequest {
    request_header,
    subscription_acknowledgements,
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationMessage {
    pub sequence_number: u32,
    pub publish_time: DateTime,
    pub notification_data: Vec<ExtensionObject>,
}

impl_binary_struct!(NotificationMessage {
    sequence_number,
    publish_time,
    notification_data,
});

impl NotificationMessage {
    /// A keep-alive message carries no notification data.
    pub fn is_keep_alive(&self) -> bool {
        self.notification_data.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishResponse {
    pub response_header: ResponseHeader,
    pub subscription_id: u32,
    pub available_sequence_numbers: Vec<u32>,
    pub more_notifications: bool,
    pub notification_message: NotificationMessage,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(PublishResponse {
    response_header,
    subscription_id,
    available_sequence_numbers,
    more_notifications,
    notification_message,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct RepublishRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub retransmit_sequence_number: u32,
}

impl_binary_struct!(RepublishRequest {
    request_header,
    subscription_id,
    retransmit_sequence_number,
});

#[derive(Debug, Clone, PartialEq)]
pub struct RepublishResponse {
    pub response_header: ResponseHeader,
    pub notification_message: NotificationMessage,
}

impl_binary_struct!(RepublishResponse {
    response_header,
    notification_message,
});

#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemNotification {
    pub client_handle: u32,
    pub value: DataValue,
}

impl_binary_struct!(MonitoredItemNotification {
    client_handle,
    value,
});

#[derive(Debug, Clone, PartialEq)]
pub struct DataChangeNotification {
    pub monitored_items: Vec<MonitoredItemNotification>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(DataChangeNotification {
    monitored_items,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct EventFieldList {
    pub client_handle: u32,
    pub event_fields: Vec<Variant>,
}

impl_binary_struct!(EventFieldList {
    client_handle,
    event_fields,
});

#[derive(Debug, Clone, PartialEq)]
pub struct EventNotificationList {
    pub events: Vec<EventFieldList>,
}

impl_binary_struct!(EventNotificationList { events });

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChangeNotification {
    pub status: StatusCode,
    pub diagnostic_info: DiagnosticInfo,
}

impl_binary_struct!(StatusChangeNotification {
    status,
    diagnostic_info,
});
