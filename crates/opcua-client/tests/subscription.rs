// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscriptions through the client façade.

mod common;

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{config, fault, ok_header, session_reply, MockServer, Reply, ServerOptions};
use opcua_client::services::{
    CreateMonitoredItemsResponse, CreateSubscriptionResponse, DataChangeNotification,
    DeleteSubscriptionsResponse, MonitoredItemCreateResult, MonitoredItemNotification,
    NotificationMessage, PublishResponse, RepublishResponse, RequestMessage, ResponseMessage,
};
use opcua_client::types::{ids, ExtensionObject};
use opcua_client::{
    Client, DataValue, DateTime, MonitoredItemRequest, Notification, NotificationBatch, NodeId,
    StatusCode, SubscriptionSettings, Variant,
};

const SUBSCRIPTION_ID: u32 = 5;

fn data_message(sequence_number: u32, value: i32) -> NotificationMessage {
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

/// Scripted Publish answers; Republish served from an archive.
#[derive(Default)]
struct Feed {
    publishes: Mutex<VecDeque<NotificationMessage>>,
    archive: Mutex<HashMap<u32, NotificationMessage>>,
    acknowledged: Mutex<Vec<u32>>,
}

impl Feed {
    fn new(publishes: Vec<NotificationMessage>, archive: Vec<NotificationMessage>) -> Arc<Self> {
        Arc::new(Self {
            publishes: Mutex::new(publishes.into()),
            archive: Mutex::new(archive.into_iter().map(|m| (m.sequence_number, m)).collect()),
            acknowledged: Mutex::new(Vec::new()),
        })
    }

    fn handle(&self, request: &RequestMessage) -> Reply {
        if let Some(response) = session_reply(request) {
            return response.into();
        }
        let response: ResponseMessage = match request {
            RequestMessage::CreateSubscription(_) => CreateSubscriptionResponse {
                response_header: ok_header(request),
                subscription_id: SUBSCRIPTION_ID,
                revised_publishing_interval: 100.0,
                revised_lifetime_count: 300,
                revised_max_keep_alive_count: 10,
            }
            .into(),
            RequestMessage::CreateMonitoredItems(create) => CreateMonitoredItemsResponse {
                response_header: ok_header(request),
                results: create
                    .items_to_create
                    .iter()
                    .enumerate()
                    .map(|(i, item)| MonitoredItemCreateResult {
                        status_code: if item.item_to_monitor.node_id.is_null() {
                            StatusCode::BadNodeIdUnknown
                        } else {
                            StatusCode::Good
                        },
                        monitored_item_id: 1 + i as u32,
                        revised_sampling_interval: 100.0,
                        revised_queue_size: 1,
                        filter_result: ExtensionObject::null(),
                    })
                    .collect(),
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::DeleteSubscriptions(delete) => DeleteSubscriptionsResponse {
                response_header: ok_header(request),
                results: vec![StatusCode::Good; delete.subscription_ids.len()],
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::Publish(publish) => {
                self.acknowledged.lock().unwrap().extend(
                    publish
                        .subscription_acknowledgements
                        .iter()
                        .map(|a| a.sequence_number),
                );
                let Some(message) = self.publishes.lock().unwrap().pop_front() else {
                    return Reply::Never;
                };
                PublishResponse {
                    response_header: ok_header(request),
                    subscription_id: SUBSCRIPTION_ID,
                    available_sequence_numbers: Vec::new(),
                    more_notifications: false,
                    notification_message: message,
                    results: vec![StatusCode::Good; publish.subscription_acknowledgements.len()],
                    diagnostic_infos: Vec::new(),
                }
                .into()
            }
            RequestMessage::Republish(republish) => {
                match self
                    .archive
                    .lock()
                    .unwrap()
                    .get(&republish.retransmit_sequence_number)
                {
                    Some(message) => RepublishResponse {
                        response_header: ok_header(request),
                        notification_message: message.clone(),
                    }
                    .into(),
                    None => fault(request, StatusCode::BadMessageNotAvailable),
                }
            }
            _ => fault(request, StatusCode::BadServiceUnsupported),
        };
        response.into()
    }
}

async fn connect(feed: Arc<Feed>) -> (Client, MockServer) {
    let (stream, server) =
        MockServer::start(ServerOptions::default(), move |request| feed.handle(request));
    let mut config = config();
    config.max_inflight_publish = 1;
    let client = Client::new(config).unwrap();
    client.connect_with(stream).await.unwrap();
    (client, server)
}

fn values(batch: &NotificationBatch) -> Vec<i32> {
    batch
        .notifications
        .iter()
        .filter_map(|n| match n {
            Notification::DataChange { value, .. } => match value.value() {
                Variant::Int32(v) => Some(*v),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_missing_notification_is_republished_in_order() {
    let feed = Feed::new(
        vec![
            data_message(1, 10),
            data_message(2, 20),
            data_message(4, 40),
        ],
        vec![data_message(3, 30)],
    );
    let (client, _server) = connect(Arc::clone(&feed)).await;

    let (id, mut stream) = client
        .create_subscription(&SubscriptionSettings::with_interval(Duration::from_millis(100)))
        .await
        .unwrap();
    assert_eq!(id, SUBSCRIPTION_ID);
    let info = client.subscription_info(id).unwrap();
    assert_eq!(info.publishing_interval, Duration::from_millis(100));
    assert_eq!(info.lifetime_count, 300);

    let mut received = Vec::new();
    while received.len() < 4 {
        let batch = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("notification timed out")
            .expect("stream ended");
        received.push((batch.sequence_number, values(&batch)));
    }
    assert_eq!(
        received,
        vec![
            (1, vec![10]),
            (2, vec![20]),
            (3, vec![30]),
            (4, vec![40]),
        ]
    );

    client.delete_subscriptions(&[id]).await.unwrap();
    let end = tokio::time::timeout(Duration::from_secs(1), stream.recv())
        .await
        .unwrap();
    assert!(end.is_none());
    assert!(client.subscription_info(id).is_none());
}

#[tokio::test]
async fn test_callback_and_monitored_items() {
    let feed = Feed::new(vec![data_message(1, 1), data_message(2, 2)], Vec::new());
    let (client, _server) = connect(feed).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let id = client
        .create_subscription_with_callback(&client.subscription_settings(), move |batch| {
            sink.lock().unwrap().push(batch.sequence_number);
        })
        .await
        .unwrap();

    let results = client
        .create_monitored_items(
            id,
            &[
                MonitoredItemRequest::value(NodeId::numeric(2, 1001)),
                MonitoredItemRequest::value(NodeId::null()),
            ],
        )
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    let item = results[0].as_ref().unwrap();
    assert_eq!(item.node_id, NodeId::numeric(2, 1001));
    assert_eq!(item.sampling_interval, Duration::from_millis(100));
    assert_eq!(results[1], Err(StatusCode::BadNodeIdUnknown));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while seen.lock().unwrap().len() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "callback not invoked");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_unknown_subscription_rejected() {
    let (client, _server) = connect(Feed::new(Vec::new(), Vec::new())).await;
    let result = client
        .create_monitored_items(99, &[MonitoredItemRequest::value(NodeId::numeric(2, 1))])
        .await;
    assert_eq!(
        result,
        Err(opcua_client::Error::ServiceFault(
            StatusCode::BadSubscriptionIdInvalid
        ))
    );
}
