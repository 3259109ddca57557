// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outstanding requests of a channel, keyed by request handle.
//!
//! The reader task completes a slot exactly once; the caller owns a
//! [`PendingRequest`] that removes the slot when dropped, so timeouts and
//! abandoned futures never leave entries behind.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::services::ResponseMessage;

type Reply = Result<ResponseMessage>;

struct PendingSlot {
    sender: oneshot::Sender<Reply>,
    service: &'static str,
}

/// Request handle -> reply slot.
pub struct PendingRequests {
    slots: DashMap<u32, PendingSlot>,
    /// Set once the channel is closed or faulted; later registrations fail with it.
    closed: Mutex<Option<Error>>,
}

impl PendingRequests {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slots: DashMap::new(),
            closed: Mutex::new(None),
        })
    }

    pub fn register(
        self: &Arc<Self>,
        handle: u32,
        service: &'static str,
        deadline: Instant,
    ) -> Result<PendingRequest> {
        let (sender, receiver) = oneshot::channel();
        {
            let closed = self.closed.lock();
            if let Some(err) = closed.as_ref() {
                return Err(err.clone());
            }
            self.slots.insert(handle, PendingSlot { sender, service });
        }
        Ok(PendingRequest {
            table: Arc::clone(self),
            handle,
            deadline,
            receiver: Some(receiver),
        })
    }

    /// Deliver a reply. Returns false when nobody waits for `handle` any more.
    pub fn complete(&self, handle: u32, reply: Reply) -> bool {
        match self.slots.remove(&handle) {
            Some((_, slot)) => {
                log::debug!("[SecureChannel] {} response for handle {}", slot.service, handle);
                slot.sender.send(reply).is_ok()
            }
            None => false,
        }
    }

    /// Fail every outstanding request and refuse new ones.
    pub fn fail_all(&self, err: Error) {
        {
            let mut closed = self.closed.lock();
            if closed.is_none() {
                *closed = Some(err.clone());
            }
        }
        let handles: Vec<u32> = self.slots.iter().map(|entry| *entry.key()).collect();
        for handle in handles {
            if let Some((_, slot)) = self.slots.remove(&handle) {
                log::debug!("[SecureChannel] failing {} handle {}: {}", slot.service, handle, err);
                drop(slot.sender.send(Err(err.clone())));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn remove(&self, handle: u32) {
        self.slots.remove(&handle);
    }
}

/// Caller side of a pending request.
pub struct PendingRequest {
    table: Arc<PendingRequests>,
    handle: u32,
    deadline: Instant,
    receiver: Option<oneshot::Receiver<Reply>>,
}

impl PendingRequest {
    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// Wait for the reply until the deadline.
    pub async fn wait(mut self) -> Result<ResponseMessage> {
        let receiver = self.receiver.take().ok_or(Error::Cancelled)?;
        match tokio::time::timeout_at(self.deadline, receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(Error::Cancelled),
            Err(_) => {
                log::warn!("[SecureChannel] request {} timed out", self.handle);
                Err(Error::RequestTimedOut {
                    request_handle: self.handle,
                })
            }
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.table.remove(self.handle);
    }
}
