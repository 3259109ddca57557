// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoded notifications and the consumer side of a subscription.

use tokio::sync::mpsc;

use super::SubscriptionId;
use crate::codec::DecodingOptions;
use crate::services::{
    DataChangeNotification, EventNotificationList, NotificationMessage, StatusChangeNotification,
};
use crate::types::{ids, DataValue, DateTime, StatusCode, Variant};

/// One notification of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    DataChange { client_handle: u32, value: DataValue },
    Event { client_handle: u32, fields: Vec<Variant> },
    /// Subscription state change; a bad status ends the subscription.
    StatusChange(StatusCode),
}

/// Notifications of one NotificationMessage, in server order.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationBatch {
    pub subscription_id: SubscriptionId,
    pub sequence_number: u32,
    pub publish_time: DateTime,
    pub notifications: Vec<Notification>,
}

impl NotificationBatch {
    /// Decode the extension objects of `message`. Unknown or undecodable
    /// payloads are logged and skipped.
    pub fn decode(
        subscription_id: SubscriptionId,
        message: &NotificationMessage,
        options: DecodingOptions,
    ) -> Self {
        let mut notifications = Vec::new();
        for data in &message.notification_data {
            match data.encoding_id() {
                Some(ids::encoding::DATA_CHANGE_NOTIFICATION) => {
                    match data.decode_inner::<DataChangeNotification>(options) {
                        Ok(change) => notifications.extend(change.monitored_items.into_iter().map(
                            |item| Notification::DataChange {
                                client_handle: item.client_handle,
                                value: item.value,
                            },
                        )),
                        Err(e) => log::warn!("[Publish] bad DataChangeNotification: {}", e),
                    }
                }
                Some(ids::encoding::EVENT_NOTIFICATION_LIST) => {
                    match data.decode_inner::<EventNotificationList>(options) {
                        Ok(list) => {
                            notifications.extend(list.events.into_iter().map(|event| {
                                Notification::Event {
                                    client_handle: event.client_handle,
                                    fields: event.event_fields,
                                }
                            }))
                        }
                        Err(e) => log::warn!("[Publish] bad EventNotificationList: {}", e),
                    }
                }
                Some(ids::encoding::STATUS_CHANGE_NOTIFICATION) => {
                    match data.decode_inner::<StatusChangeNotification>(options) {
                        Ok(change) => notifications.push(Notification::StatusChange(change.status)),
                        Err(e) => log::warn!("[Publish] bad StatusChangeNotification: {}", e),
                    }
                }
                other => {
                    log::warn!("[Publish] skipping notification type {:?}", other);
                }
            }
        }
        Self {
            subscription_id,
            sequence_number: message.sequence_number,
            publish_time: message.publish_time,
            notifications,
        }
    }

    /// Batch synthesized by the client (no sequence number).
    pub(crate) fn status_change(subscription_id: SubscriptionId, status: StatusCode) -> Self {
        Self {
            subscription_id,
            sequence_number: 0,
            publish_time: DateTime::now(),
            notifications: vec![Notification::StatusChange(status)],
        }
    }

    /// First bad StatusChange, if any.
    pub fn terminal_status(&self) -> Option<StatusCode> {
        self.notifications.iter().find_map(|n| match n {
            Notification::StatusChange(status) if status.is_bad() => Some(*status),
            _ => None,
        })
    }
}

/// Receiving end of one subscription's notification queue.
///
/// Batches arrive in strictly increasing sequence order. `recv` returns
/// `None` once the subscription is deleted (or the session closes) and the
/// queue is drained.
#[derive(Debug)]
pub struct NotificationStream {
    subscription_id: SubscriptionId,
    receiver: mpsc::UnboundedReceiver<NotificationBatch>,
}

impl NotificationStream {
    pub(crate) fn new(
        subscription_id: SubscriptionId,
        receiver: mpsc::UnboundedReceiver<NotificationBatch>,
    ) -> Self {
        Self {
            subscription_id,
            receiver,
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub async fn recv(&mut self) -> Option<NotificationBatch> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NotificationBatch> {
        self.receiver.try_recv().ok()
    }

    /// Hand every batch to `callback` on a spawned task, in order.
    pub fn spawn_callback<F>(mut self, mut callback: F) -> tokio::task::JoinHandle<()>
    where
        F: FnMut(NotificationBatch) + Send + 'static,
    {
        tokio::spawn(async move {
            while let Some(batch) = self.receiver.recv().await {
                callback(batch);
            }
            log::debug!(
                "[Publish] callback drain for subscription {} finished",
                self.subscription_id
            );
        })
    }
}
