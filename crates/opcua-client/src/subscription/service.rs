// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription and monitored item services.

use std::sync::Arc;

use super::{
    ItemResult, MonitoredItem, MonitoredItemRequest, MonitoringSettings, NotificationStream,
    SubscriptionId, SubscriptionInfo, SubscriptionSettings,
};
use crate::codec::CodecError;
use crate::config::{duration_from_ms, ms_from_duration};
use crate::error::{Error, Result};
use crate::services::{
    CreateMonitoredItemsRequest, CreateSubscriptionRequest, DeleteMonitoredItemsRequest,
    DeleteSubscriptionsRequest, ModifyMonitoredItemsRequest, ModifySubscriptionRequest,
    MonitoredItemCreateRequest, MonitoredItemModifyRequest, MonitoringParameters, RequestHeader,
    SetMonitoringModeRequest, SetPublishingModeRequest,
};
use crate::session::Session;
use crate::types::{ExtensionObject, MonitoringMode, StatusCode, TimestampsToReturn};

fn check_count(service: &str, got: usize, expected: usize) -> Result<()> {
    if got == expected {
        Ok(())
    } else {
        Err(Error::Decoding(CodecError::InvalidData(format!(
            "{} returned {} results for {} operations",
            service, got, expected
        ))))
    }
}

fn parameters(client_handle: u32, settings: &MonitoringSettings) -> MonitoringParameters {
    MonitoringParameters {
        client_handle,
        sampling_interval: settings.sampling_interval.map_or(-1.0, ms_from_duration),
        filter: settings
            .filter
            .as_ref()
            .map_or_else(ExtensionObject::null, |f| f.to_extension_object()),
        queue_size: settings.queue_size,
        discard_oldest: settings.discard_oldest,
    }
}

impl Session {
    fn known_subscription(&self, id: SubscriptionId) -> Result<()> {
        if self.subscriptions().contains(id) {
            Ok(())
        } else {
            Err(Error::ServiceFault(StatusCode::BadSubscriptionIdInvalid))
        }
    }

    /// Revised parameters of a live subscription.
    pub fn subscription_info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.subscriptions().info(id)
    }

    /// Monitored items of a subscription, ordered by item id.
    pub fn monitored_items(&self, id: SubscriptionId) -> Vec<MonitoredItem> {
        self.subscriptions().items(id)
    }

    /// CreateSubscription. Notifications arrive on the returned stream once
    /// monitored items are added.
    pub async fn create_subscription(
        self: &Arc<Self>,
        settings: &SubscriptionSettings,
    ) -> Result<(SubscriptionId, NotificationStream)> {
        let response = self
            .send(CreateSubscriptionRequest {
                request_header: RequestHeader::default(),
                requested_publishing_interval: ms_from_duration(settings.publishing_interval),
                requested_lifetime_count: settings.lifetime_count,
                requested_max_keep_alive_count: settings.max_keep_alive_count,
                max_notifications_per_publish: settings.max_notifications_per_publish,
                publishing_enabled: settings.publishing_enabled,
                priority: settings.priority,
            })
            .await?;

        let info = SubscriptionInfo {
            id: response.subscription_id,
            publishing_interval: duration_from_ms(response.revised_publishing_interval),
            lifetime_count: response.revised_lifetime_count,
            max_keep_alive_count: response.revised_max_keep_alive_count,
            max_notifications_per_publish: settings.max_notifications_per_publish,
            priority: settings.priority,
            publishing_enabled: settings.publishing_enabled,
        };
        log::info!(
            "[Subscription] created {} (interval {:?}, lifetime {}, keep-alive {})",
            info.id,
            info.publishing_interval,
            info.lifetime_count,
            info.max_keep_alive_count
        );
        let stream = self.subscriptions().insert(info);
        self.start_publishing();
        Ok((info.id, stream))
    }

    pub async fn modify_subscription(
        &self,
        id: SubscriptionId,
        settings: &SubscriptionSettings,
    ) -> Result<SubscriptionInfo> {
        self.known_subscription(id)?;
        let response = self
            .send(ModifySubscriptionRequest {
                request_header: RequestHeader::default(),
                subscription_id: id,
                requested_publishing_interval: ms_from_duration(settings.publishing_interval),
                requested_lifetime_count: settings.lifetime_count,
                requested_max_keep_alive_count: settings.max_keep_alive_count,
                max_notifications_per_publish: settings.max_notifications_per_publish,
                priority: settings.priority,
            })
            .await?;

        let publishing_enabled = self
            .subscriptions()
            .info(id)
            .map_or(settings.publishing_enabled, |i| i.publishing_enabled);
        let info = SubscriptionInfo {
            id,
            publishing_interval: duration_from_ms(response.revised_publishing_interval),
            lifetime_count: response.revised_lifetime_count,
            max_keep_alive_count: response.revised_max_keep_alive_count,
            max_notifications_per_publish: settings.max_notifications_per_publish,
            priority: settings.priority,
            publishing_enabled,
        };
        self.subscriptions().update_info(info);
        log::debug!("[Subscription] modified {}: {:?}", id, info.publishing_interval);
        Ok(info)
    }

    pub async fn set_publishing_mode(
        &self,
        enabled: bool,
        ids: &[SubscriptionId],
    ) -> Result<Vec<StatusCode>> {
        let response = self
            .send(SetPublishingModeRequest {
                request_header: RequestHeader::default(),
                publishing_enabled: enabled,
                subscription_ids: ids.to_vec(),
            })
            .await?;
        check_count("SetPublishingMode", response.results.len(), ids.len())?;
        for (id, status) in ids.iter().zip(&response.results) {
            if status.is_good() {
                self.subscriptions().set_publishing_enabled(*id, enabled);
            }
        }
        Ok(response.results)
    }

    /// DeleteSubscriptions. Subscriptions the server accepted, or no longer
    /// knows, are dropped locally and their streams end.
    pub async fn delete_subscriptions(&self, ids: &[SubscriptionId]) -> Result<Vec<StatusCode>> {
        let response = self
            .send(DeleteSubscriptionsRequest {
                request_header: RequestHeader::default(),
                subscription_ids: ids.to_vec(),
            })
            .await?;
        check_count("DeleteSubscriptions", response.results.len(), ids.len())?;
        for (id, status) in ids.iter().zip(&response.results) {
            if status.is_good() || *status == StatusCode::BadSubscriptionIdInvalid {
                self.subscriptions().remove(*id);
                log::info!("[Subscription] deleted {}", id);
            } else {
                log::warn!("[Subscription] delete of {} failed: {}", id, status);
            }
        }
        Ok(response.results)
    }

    pub async fn create_monitored_items(
        &self,
        id: SubscriptionId,
        timestamps: TimestampsToReturn,
        items: &[MonitoredItemRequest],
    ) -> Result<Vec<ItemResult<MonitoredItem>>> {
        self.known_subscription(id)?;
        let registry = self.subscriptions();
        let handles: Vec<u32> = items.iter().map(|_| registry.next_client_handle()).collect();
        let items_to_create = items
            .iter()
            .zip(&handles)
            .map(|(item, handle)| MonitoredItemCreateRequest {
                item_to_monitor: item.read_value_id(),
                monitoring_mode: item.mode,
                requested_parameters: parameters(*handle, &item.settings),
            })
            .collect();

        let response = self
            .send(CreateMonitoredItemsRequest {
                request_header: RequestHeader::default(),
                subscription_id: id,
                timestamps_to_return: timestamps,
                items_to_create,
            })
            .await?;
        check_count("CreateMonitoredItems", response.results.len(), items.len())?;

        let results: Vec<ItemResult<MonitoredItem>> = response
            .results
            .into_iter()
            .zip(items.iter().zip(handles))
            .map(|(result, (request, client_handle))| {
                if result.status_code.is_bad() {
                    return Err(result.status_code);
                }
                Ok(MonitoredItem {
                    id: result.monitored_item_id,
                    client_handle,
                    node_id: request.node_id.clone(),
                    attribute: request.attribute,
                    index_range: request.index_range.clone(),
                    mode: request.mode,
                    sampling_interval: duration_from_ms(result.revised_sampling_interval),
                    queue_size: result.revised_queue_size,
                    discard_oldest: request.settings.discard_oldest,
                    filter: request.settings.filter,
                })
            })
            .collect();

        let accepted: Vec<MonitoredItem> = results.iter().filter_map(|r| r.clone().ok()).collect();
        log::debug!(
            "[Subscription] {} of {} monitored items created in {}",
            accepted.len(),
            items.len(),
            id
        );
        registry.insert_items(id, accepted);
        Ok(results)
    }

    /// ModifyMonitoredItems. Items unknown to this session are answered
    /// locally with `BadMonitoredItemIdInvalid`.
    pub async fn modify_monitored_items(
        &self,
        id: SubscriptionId,
        timestamps: TimestampsToReturn,
        items: &[(u32, MonitoringSettings)],
    ) -> Result<Vec<ItemResult<MonitoredItem>>> {
        self.known_subscription(id)?;
        let registry = self.subscriptions();
        let current: Vec<Option<MonitoredItem>> = items
            .iter()
            .map(|(item_id, _)| registry.item(id, *item_id))
            .collect();

        let items_to_modify: Vec<MonitoredItemModifyRequest> = items
            .iter()
            .zip(&current)
            .filter_map(|((item_id, settings), existing)| {
                existing.as_ref().map(|item| MonitoredItemModifyRequest {
                    monitored_item_id: *item_id,
                    requested_parameters: parameters(item.client_handle, settings),
                })
            })
            .collect();

        let mut server_results = if items_to_modify.is_empty() {
            Vec::new()
        } else {
            let expected = items_to_modify.len();
            let response = self
                .send(ModifyMonitoredItemsRequest {
                    request_header: RequestHeader::default(),
                    subscription_id: id,
                    timestamps_to_return: timestamps,
                    items_to_modify,
                })
                .await?;
            check_count("ModifyMonitoredItems", response.results.len(), expected)?;
            response.results
        }
        .into_iter();

        let mut results = Vec::with_capacity(items.len());
        let mut updated = Vec::new();
        for ((_, settings), existing) in items.iter().zip(current) {
            let Some(mut item) = existing else {
                results.push(Err(StatusCode::BadMonitoredItemIdInvalid));
                continue;
            };
            let Some(result) = server_results.next() else {
                results.push(Err(StatusCode::BadUnexpectedError));
                continue;
            };
            if result.status_code.is_bad() {
                results.push(Err(result.status_code));
                continue;
            }
            item.sampling_interval = duration_from_ms(result.revised_sampling_interval);
            item.queue_size = result.revised_queue_size;
            item.discard_oldest = settings.discard_oldest;
            item.filter = settings.filter;
            updated.push(item.clone());
            results.push(Ok(item));
        }
        registry.insert_items(id, updated);
        Ok(results)
    }

    pub async fn set_monitoring_mode(
        &self,
        id: SubscriptionId,
        mode: MonitoringMode,
        item_ids: &[u32],
    ) -> Result<Vec<StatusCode>> {
        self.known_subscription(id)?;
        let response = self
            .send(SetMonitoringModeRequest {
                request_header: RequestHeader::default(),
                subscription_id: id,
                monitoring_mode: mode,
                monitored_item_ids: item_ids.to_vec(),
            })
            .await?;
        check_count("SetMonitoringMode", response.results.len(), item_ids.len())?;
        let changed: Vec<u32> = item_ids
            .iter()
            .zip(&response.results)
            .filter(|(_, status)| status.is_good())
            .map(|(item_id, _)| *item_id)
            .collect();
        self.subscriptions().set_item_mode(id, &changed, mode);
        Ok(response.results)
    }

    pub async fn delete_monitored_items(
        &self,
        id: SubscriptionId,
        item_ids: &[u32],
    ) -> Result<Vec<StatusCode>> {
        self.known_subscription(id)?;
        let response = self
            .send(DeleteMonitoredItemsRequest {
                request_header: RequestHeader::default(),
                subscription_id: id,
                monitored_item_ids: item_ids.to_vec(),
            })
            .await?;
        check_count("DeleteMonitoredItems", response.results.len(), item_ids.len())?;
        let removed: Vec<u32> = item_ids
            .iter()
            .zip(&response.results)
            .filter(|(_, status)| {
                status.is_good() || **status == StatusCode::BadMonitoredItemIdInvalid
            })
            .map(|(item_id, _)| *item_id)
            .collect();
        self.subscriptions().remove_items(id, &removed);
        Ok(response.results)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::super::testing::{open_session, Script, SUBSCRIPTION_ID};
    use super::*;
    use crate::types::NodeId;

    #[tokio::test]
    async fn test_create_subscription_uses_revised_values() {
        let (session, _server) = open_session(Script::new(Vec::new())).await;
        let settings = SubscriptionSettings::with_interval(Duration::from_millis(20));
        let (id, stream) = session.create_subscription(&settings).await.unwrap();
        assert_eq!(id, SUBSCRIPTION_ID);
        assert_eq!(stream.subscription_id(), SUBSCRIPTION_ID);

        let info = session.subscription_info(id).unwrap();
        assert_eq!(info.publishing_interval, Duration::from_millis(50));
        assert_eq!(info.lifetime_count, 200);
        assert_eq!(info.max_keep_alive_count, 10);
    }

    #[tokio::test]
    async fn test_monitored_items_per_item_results() {
        let (session, _server) = open_session(Script::new(Vec::new())).await;
        let (id, _stream) = session
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();

        let requests = vec![
            MonitoredItemRequest::value(NodeId::numeric(2, 10)).with_queue_size(5, false),
            MonitoredItemRequest::value(NodeId::null()),
        ];
        let results = session
            .create_monitored_items(id, TimestampsToReturn::Both, &requests)
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        let item = results[0].as_ref().unwrap();
        assert_eq!(item.id, 100);
        assert_eq!(item.queue_size, 5);
        assert_eq!(item.sampling_interval, Duration::from_millis(250));
        assert_eq!(results[1], Err(StatusCode::BadNodeIdUnknown));

        assert_eq!(session.monitored_items(id).len(), 1);
        let deleted = session.delete_monitored_items(id, &[100]).await.unwrap();
        assert_eq!(deleted, vec![StatusCode::Good]);
        assert!(session.monitored_items(id).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_subscription_rejected_locally() {
        let (session, _server) = open_session(Script::new(Vec::new())).await;
        let result = session
            .create_monitored_items(
                42,
                TimestampsToReturn::Both,
                &[MonitoredItemRequest::value(NodeId::numeric(2, 1))],
            )
            .await;
        assert_eq!(
            result.unwrap_err(),
            Error::ServiceFault(StatusCode::BadSubscriptionIdInvalid)
        );
    }

    #[tokio::test]
    async fn test_delete_subscription_ends_stream() {
        let (session, _server) = open_session(Script::new(Vec::new())).await;
        let (id, mut stream) = session
            .create_subscription(&SubscriptionSettings::default())
            .await
            .unwrap();
        let results = session.delete_subscriptions(&[id, 99]).await.unwrap();
        assert_eq!(
            results,
            vec![StatusCode::Good, StatusCode::BadSubscriptionIdInvalid]
        );
        assert!(session.subscription_info(id).is_none());
        let end = tokio::time::timeout(Duration::from_secs(1), stream.recv())
            .await
            .unwrap();
        assert!(end.is_none());
    }
}
