// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-session subscription table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;

use super::notification::{NotificationBatch, NotificationStream};
use super::sequence::{SequenceCheck, SequenceTracker};
use super::{MonitoredItem, SubscriptionId, SubscriptionInfo};
use crate::codec::DecodingOptions;
use crate::services::{NotificationMessage, SubscriptionAcknowledgement};
use crate::types::{MonitoringMode, StatusCode};

struct Entry {
    info: SubscriptionInfo,
    items: HashMap<u32, MonitoredItem>,
    tracker: SequenceTracker,
    /// Last message plus the subscription lifetime.
    deadline: Instant,
    sender: mpsc::UnboundedSender<NotificationBatch>,
}

impl Entry {
    fn touch(&mut self) {
        self.deadline = Instant::now() + self.info.lifetime();
    }
}

/// Subscriptions of one session, their monitored items and the
/// acknowledgements owed to the server.
pub struct SubscriptionRegistry {
    entries: Mutex<HashMap<SubscriptionId, Entry>>,
    acks: Mutex<Vec<SubscriptionAcknowledgement>>,
    next_handle: AtomicU32,
    changed: Notify,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            acks: Mutex::new(Vec::new()),
            next_handle: AtomicU32::new(1),
            changed: Notify::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Subscription ids in ascending order.
    pub fn ids(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<_> = self.entries.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.entries.lock().get(&id).map(|e| e.info)
    }

    /// Monitored items of a subscription, ordered by item id.
    pub fn items(&self, id: SubscriptionId) -> Vec<MonitoredItem> {
        let entries = self.entries.lock();
        let mut items: Vec<_> = entries
            .get(&id)
            .map(|e| e.items.values().cloned().collect())
            .unwrap_or_default();
        items.sort_unstable_by_key(|item| item.id);
        items
    }

    pub fn item(&self, id: SubscriptionId, item_id: u32) -> Option<MonitoredItem> {
        self.entries
            .lock()
            .get(&id)
            .and_then(|e| e.items.get(&item_id).cloned())
    }

    pub(crate) fn insert(&self, info: SubscriptionInfo) -> NotificationStream {
        let (sender, receiver) = mpsc::unbounded_channel();
        let entry = Entry {
            info,
            items: HashMap::new(),
            tracker: SequenceTracker::new(),
            deadline: Instant::now() + info.lifetime(),
            sender,
        };
        self.entries.lock().insert(info.id, entry);
        self.changed.notify_one();
        NotificationStream::new(info.id, receiver)
    }

    pub(crate) fn update_info(&self, info: SubscriptionInfo) {
        if let Some(entry) = self.entries.lock().get_mut(&info.id) {
            entry.info = info;
            entry.touch();
        }
        self.changed.notify_one();
    }

    pub(crate) fn set_publishing_enabled(&self, id: SubscriptionId, enabled: bool) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.info.publishing_enabled = enabled;
        }
    }

    /// Drop a subscription; its stream ends once drained.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let removed = self.entries.lock().remove(&id).is_some();
        if removed {
            self.acks.lock().retain(|ack| ack.subscription_id != id);
            self.changed.notify_one();
        }
        removed
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().clear();
        self.acks.lock().clear();
        self.changed.notify_one();
    }

    pub(crate) fn next_client_handle(&self) -> u32 {
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert_items(
        &self,
        id: SubscriptionId,
        items: impl IntoIterator<Item = MonitoredItem>,
    ) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.items.extend(items.into_iter().map(|item| (item.id, item)));
        }
    }

    pub(crate) fn set_item_mode(&self, id: SubscriptionId, item_ids: &[u32], mode: MonitoringMode) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            for item_id in item_ids {
                if let Some(item) = entry.items.get_mut(item_id) {
                    item.mode = mode;
                }
            }
        }
    }

    pub(crate) fn remove_items(&self, id: SubscriptionId, item_ids: &[u32]) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            for item_id in item_ids {
                entry.items.remove(item_id);
            }
        }
    }

    /// Acknowledgements to piggy-back on the next PublishRequest.
    pub(crate) fn take_acks(&self) -> Vec<SubscriptionAcknowledgement> {
        std::mem::take(&mut *self.acks.lock())
    }

    /// Put back acknowledgements of a Publish that did not go through.
    pub(crate) fn requeue_acks(&self, acks: Vec<SubscriptionAcknowledgement>) {
        if acks.is_empty() {
            return;
        }
        let entries = self.entries.lock();
        let mut pending = self.acks.lock();
        for ack in acks {
            if entries.contains_key(&ack.subscription_id) && !pending.contains(&ack) {
                pending.push(ack);
            }
        }
    }

    /// Publish timeout: the request timeout plus the longest keep-alive period.
    pub(crate) fn publish_timeout(&self, request_timeout: Duration) -> Duration {
        let longest = self
            .entries
            .lock()
            .values()
            .map(|e| e.info.keep_alive_period())
            .max()
            .unwrap_or_default();
        request_timeout.saturating_add(longest)
    }

    pub(crate) fn check(&self, id: SubscriptionId, sequence_number: u32) -> Option<SequenceCheck> {
        self.entries
            .lock()
            .get(&id)
            .map(|e| e.tracker.check(sequence_number))
    }

    /// Keep-alive received.
    pub(crate) fn touch(&self, id: SubscriptionId) -> bool {
        match self.entries.lock().get_mut(&id) {
            Some(entry) => {
                entry.touch();
                true
            }
            None => false,
        }
    }

    /// Give up on a sequence number the server can no longer supply.
    pub(crate) fn skip(&self, id: SubscriptionId, sequence_number: u32) {
        if let Some(entry) = self.entries.lock().get_mut(&id) {
            entry.tracker.advance(sequence_number);
        }
    }

    /// Queue an acknowledgement without delivering anything.
    pub(crate) fn acknowledge(&self, subscription_id: SubscriptionId, sequence_number: u32) {
        let ack = SubscriptionAcknowledgement {
            subscription_id,
            sequence_number,
        };
        let mut pending = self.acks.lock();
        if !pending.contains(&ack) {
            pending.push(ack);
        }
    }

    /// Decode `message` and push it to the consumer. Returns false for an
    /// unknown subscription.
    pub(crate) fn deliver(
        &self,
        id: SubscriptionId,
        message: &NotificationMessage,
        options: DecodingOptions,
    ) -> bool {
        let batch = NotificationBatch::decode(id, message, options);
        let terminal = batch.terminal_status();
        {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&id) else {
                return false;
            };
            entry.tracker.advance(message.sequence_number);
            entry.touch();
            if entry.sender.send(batch).is_err() {
                log::debug!("[Publish] consumer of subscription {} is gone", id);
            }
        }
        self.acknowledge(id, message.sequence_number);

        if let Some(status) = terminal {
            log::warn!("[Publish] subscription {} ended by server: {}", id, status);
            self.remove(id);
        }
        true
    }

    /// Earliest lifetime deadline.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.entries.lock().values().map(|e| e.deadline).min()
    }

    /// Deliver `StatusChange(BadTimeout)` to, and drop, every subscription
    /// silent past its lifetime.
    pub(crate) fn expire(&self, now: Instant) -> Vec<SubscriptionId> {
        let expired: Vec<Entry> = {
            let mut entries = self.entries.lock();
            let ids: Vec<_> = entries
                .iter()
                .filter(|(_, e)| e.deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| entries.remove(id)).collect()
        };
        let mut ids = Vec::with_capacity(expired.len());
        for entry in expired {
            let id = entry.info.id;
            log::warn!(
                "[Publish] subscription {} silent for {:?}, giving up",
                id,
                entry.info.lifetime()
            );
            let _ = entry
                .sender
                .send(NotificationBatch::status_change(id, StatusCode::BadTimeout));
            self.acks.lock().retain(|ack| ack.subscription_id != id);
            ids.push(id);
        }
        if !ids.is_empty() {
            self.changed.notify_one();
        }
        ids
    }

    /// Resolves after the next insert or removal.
    pub(crate) fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscriptions", &self.ids())
            .field("pending_acks", &self.acks.lock().len())
            .finish()
    }
}
