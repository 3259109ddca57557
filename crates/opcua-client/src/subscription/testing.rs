// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scripted subscription server for publish-loop tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{ClientConfig, IdentityToken};
use crate::secure_channel::testing::{MockServer, ServerOptions};
use crate::secure_channel::{ChannelParams, SecureChannel};
use crate::services::{
    CreateMonitoredItemsResponse, CreateSubscriptionResponse, DataChangeNotification,
    DeleteMonitoredItemsResponse, DeleteSubscriptionsResponse, MonitoredItemCreateResult,
    MonitoredItemNotification, NotificationMessage, PublishResponse, RepublishResponse,
    RequestMessage, ResponseHeader, ResponseMessage, ServiceFault,
};
use crate::session::testing::{header, session_handler};
use crate::session::Session;
use crate::types::{ids, DataValue, DateTime, ExtensionObject, NodeId, StatusCode, Variant};

pub const SUBSCRIPTION_ID: u32 = 11;

/// Data change message carrying `value` for client handle 1.
pub fn data_message(sequence_number: u32, value: i32) -> NotificationMessage {
    let change = DataChangeNotification {
        monitored_items: vec![MonitoredItemNotification {
            client_handle: 1,
            value: DataValue::new(Variant::Int32(value)),
        }],
        diagnostic_infos: Vec::new(),
    };
    NotificationMessage {
        sequence_number,
        publish_time: DateTime::now(),
        notification_data: vec![ExtensionObject::from_encodable(
            NodeId::ns0(ids::encoding::DATA_CHANGE_NOTIFICATION),
            &change,
        )],
    }
}

pub fn keep_alive(sequence_number: u32) -> NotificationMessage {
    NotificationMessage {
        sequence_number,
        publish_time: DateTime::now(),
        notification_data: Vec::new(),
    }
}

/// Publish answers in order; Republish served from `archive`.
#[derive(Default)]
pub struct Script {
    pub publishes: Mutex<VecDeque<NotificationMessage>>,
    pub archive: Mutex<HashMap<u32, NotificationMessage>>,
    pub republished: Mutex<Vec<u32>>,
    pub acknowledged: Mutex<Vec<u32>>,
    /// Status returned for Publish once `publishes` is empty; `None` holds the request.
    pub exhausted: Mutex<Option<StatusCode>>,
}

impl Script {
    pub fn new(publishes: Vec<NotificationMessage>) -> Arc<Self> {
        Arc::new(Self {
            publishes: Mutex::new(publishes.into()),
            ..Self::default()
        })
    }

    pub fn archive(&self, message: NotificationMessage) {
        self.archive.lock().insert(message.sequence_number, message);
    }

    fn handle(&self, request: &RequestMessage) -> Option<ResponseMessage> {
        let response: ResponseMessage = match request {
            RequestMessage::CreateSubscription(_) => CreateSubscriptionResponse {
                response_header: header(request),
                subscription_id: SUBSCRIPTION_ID,
                revised_publishing_interval: 50.0,
                revised_lifetime_count: 200,
                revised_max_keep_alive_count: 10,
            }
            .into(),
            RequestMessage::DeleteSubscriptions(delete) => DeleteSubscriptionsResponse {
                response_header: header(request),
                results: delete
                    .subscription_ids
                    .iter()
                    .map(|id| {
                        if *id == SUBSCRIPTION_ID {
                            StatusCode::Good
                        } else {
                            StatusCode::BadSubscriptionIdInvalid
                        }
                    })
                    .collect(),
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::CreateMonitoredItems(create) => CreateMonitoredItemsResponse {
                response_header: header(request),
                results: create
                    .items_to_create
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        if item.item_to_monitor.node_id.is_null() {
                            MonitoredItemCreateResult {
                                status_code: StatusCode::BadNodeIdUnknown,
                                monitored_item_id: 0,
                                revised_sampling_interval: 0.0,
                                revised_queue_size: 0,
                                filter_result: ExtensionObject::null(),
                            }
                        } else {
                            MonitoredItemCreateResult {
                                status_code: StatusCode::Good,
                                monitored_item_id: 100 + i as u32,
                                revised_sampling_interval: 250.0,
                                revised_queue_size: item.requested_parameters.queue_size,
                                filter_result: ExtensionObject::null(),
                            }
                        }
                    })
                    .collect(),
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::DeleteMonitoredItems(delete) => DeleteMonitoredItemsResponse {
                response_header: header(request),
                results: vec![StatusCode::Good; delete.monitored_item_ids.len()],
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::Publish(publish) => {
                self.acknowledged.lock().extend(
                    publish
                        .subscription_acknowledgements
                        .iter()
                        .map(|a| a.sequence_number),
                );
                let next = self.publishes.lock().pop_front();
                match next {
                    Some(message) => PublishResponse {
                        response_header: header(request),
                        subscription_id: SUBSCRIPTION_ID,
                        available_sequence_numbers: Vec::new(),
                        more_notifications: false,
                        notification_message: message,
                        results: vec![
                            StatusCode::Good;
                            publish.subscription_acknowledgements.len()
                        ],
                        diagnostic_infos: Vec::new(),
                    }
                    .into(),
                    None => {
                        let status = (*self.exhausted.lock())?;
                        ServiceFault {
                            response_header: ResponseHeader::new(
                                request.header().request_handle,
                                status,
                            ),
                        }
                        .into()
                    }
                }
            }
            RequestMessage::Republish(republish) => {
                let number = republish.retransmit_sequence_number;
                self.republished.lock().push(number);
                match self.archive.lock().get(&number) {
                    Some(message) => RepublishResponse {
                        response_header: header(request),
                        notification_message: message.clone(),
                    }
                    .into(),
                    None => ServiceFault {
                        response_header: ResponseHeader::new(
                            request.header().request_handle,
                            StatusCode::BadMessageNotAvailable,
                        ),
                    }
                    .into(),
                }
            }
            _ => return session_handler(request),
        };
        Some(response)
    }
}

/// Activated session against the scripted server, one Publish at a time.
pub async fn open_session(script: Arc<Script>) -> (Arc<Session>, MockServer) {
    let (client, server) = MockServer::pair(ServerOptions::default(), move |request| {
        script.handle(request)
    });
    let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
        .await
        .unwrap();
    let mut config =
        ClientConfig::new("opc.tcp://mock:4840").with_keep_alive(Duration::ZERO, 3);
    config.max_inflight_publish = 1;
    let session = Session::create(channel, &config).await.unwrap();
    session.activate(&IdentityToken::Anonymous).await.unwrap();
    (session, server)
}
