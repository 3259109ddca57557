// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Subscription engine.
//!
//! ```text
//!  Session::create_subscription ---> SubscriptionRegistry <--- publisher task
//!                                        |   (acks, trackers)      |  Publish / Republish
//!                                        v                         v
//!                              NotificationStream            SecureChannel
//! ```
//!
//! The registry is the only state shared between service calls and the
//! publish loop. Each subscription has its own unbounded queue, so a slow
//! consumer never blocks the loop.

pub(crate) mod publisher;
mod notification;
mod registry;
mod sequence;
mod service;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use crate::config::{
    DEFAULT_LIFETIME_COUNT, DEFAULT_MAX_KEEP_ALIVE_COUNT, DEFAULT_PUBLISHING_INTERVAL_MS,
};
use crate::services::{DataChangeFilter, ReadValueId};
use crate::types::{AttributeId, MonitoringMode, NodeId, StatusCode, UaString};

pub use notification::{Notification, NotificationBatch, NotificationStream};
pub use registry::SubscriptionRegistry;
pub use sequence::{next_sequence, SequenceCheck, SequenceTracker, MAX_REPUBLISH_GAP};

/// Server-assigned subscription id.
pub type SubscriptionId = u32;

/// Per-item outcome of a monitored item service.
pub type ItemResult<T> = std::result::Result<T, StatusCode>;

/// Requested subscription parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionSettings {
    pub publishing_interval: Duration,
    pub lifetime_count: u32,
    pub max_keep_alive_count: u32,
    /// 0 means no limit.
    pub max_notifications_per_publish: u32,
    pub priority: u8,
    pub publishing_enabled: bool,
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            publishing_interval: Duration::from_millis(DEFAULT_PUBLISHING_INTERVAL_MS),
            lifetime_count: DEFAULT_LIFETIME_COUNT,
            max_keep_alive_count: DEFAULT_MAX_KEEP_ALIVE_COUNT,
            max_notifications_per_publish: 0,
            priority: 0,
            publishing_enabled: true,
        }
    }
}

impl SubscriptionSettings {
    pub fn with_interval(publishing_interval: Duration) -> Self {
        Self {
            publishing_interval,
            ..Self::default()
        }
    }

    pub fn with_counts(mut self, lifetime_count: u32, max_keep_alive_count: u32) -> Self {
        self.lifetime_count = lifetime_count;
        self.max_keep_alive_count = max_keep_alive_count;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// Subscription parameters as revised by the server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionInfo {
    pub id: SubscriptionId,
    pub publishing_interval: Duration,
    pub lifetime_count: u32,
    pub max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub priority: u8,
    pub publishing_enabled: bool,
}

impl SubscriptionInfo {
    /// Silence after which the server drops the subscription.
    pub fn lifetime(&self) -> Duration {
        self.publishing_interval.saturating_mul(self.lifetime_count.max(1))
    }

    /// Longest wait for a keep-alive message.
    pub fn keep_alive_period(&self) -> Duration {
        self.publishing_interval.saturating_mul(self.max_keep_alive_count.max(1))
    }
}

/// Sampling parameters shared by create and modify.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringSettings {
    /// `None` samples at the publishing interval.
    pub sampling_interval: Option<Duration>,
    pub queue_size: u32,
    pub discard_oldest: bool,
    pub filter: Option<DataChangeFilter>,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            sampling_interval: None,
            queue_size: 1,
            discard_oldest: true,
            filter: None,
        }
    }
}

/// Item to create in a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItemRequest {
    pub node_id: NodeId,
    pub attribute: AttributeId,
    pub index_range: Option<String>,
    pub mode: MonitoringMode,
    pub settings: MonitoringSettings,
}

impl MonitoredItemRequest {
    /// Report changes of the Value attribute.
    pub fn value(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute: AttributeId::Value,
            index_range: None,
            mode: MonitoringMode::Reporting,
            settings: MonitoringSettings::default(),
        }
    }

    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.settings.sampling_interval = Some(interval);
        self
    }

    pub fn with_queue_size(mut self, queue_size: u32, discard_oldest: bool) -> Self {
        self.settings.queue_size = queue_size;
        self.settings.discard_oldest = discard_oldest;
        self
    }

    pub fn with_filter(mut self, filter: DataChangeFilter) -> Self {
        self.settings.filter = Some(filter);
        self
    }

    pub fn with_mode(mut self, mode: MonitoringMode) -> Self {
        self.mode = mode;
        self
    }

    pub(crate) fn read_value_id(&self) -> ReadValueId {
        let mut id = ReadValueId::new(self.node_id.clone(), self.attribute);
        if let Some(range) = &self.index_range {
            id.index_range = UaString::from(range.as_str());
        }
        id
    }
}

/// Monitored item accepted by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoredItem {
    pub id: u32,
    /// Matches `client_handle` of the notifications for this item.
    pub client_handle: u32,
    pub node_id: NodeId,
    pub attribute: AttributeId,
    pub index_range: Option<String>,
    pub mode: MonitoringMode,
    pub sampling_interval: Duration,
    pub queue_size: u32,
    pub discard_oldest: bool,
    pub filter: Option<DataChangeFilter>,
}
