// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synchronous wrapper for callers without an async runtime.
//!
//! Owns a multi-threaded tokio runtime; the channel reader, keep-alive and
//! publish tasks keep running on it between calls. Must not be used from
//! inside another runtime.

use std::time::Duration;

use super::Client as AsyncClient;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::services::{EndpointDescription, ReadValueId, WriteValue};
use crate::session::SessionState;
use crate::subscription::{
    ItemResult, MonitoredItem, MonitoredItemRequest, NotificationBatch, NotificationStream,
    SubscriptionId, SubscriptionSettings,
};
use crate::types::{DataValue, NodeId, StatusCode, TimestampsToReturn, Variant};

pub struct Client {
    // Dropped before the runtime so session tasks are aborted first.
    inner: AsyncClient,
    runtime: tokio::runtime::Runtime,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("opcua-client")
            .enable_all()
            .build()
            .map_err(|e| Error::Config(format!("cannot start runtime: {}", e)))?;
        Ok(Self {
            inner: AsyncClient::new(config)?,
            runtime,
        })
    }

    /// The async client, for calls not mirrored here.
    pub fn inner(&self) -> &AsyncClient {
        &self.inner
    }

    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn connect(&self) -> Result<()> {
        self.block_on(self.inner.connect())
    }

    pub fn disconnect(&self) -> Result<()> {
        self.block_on(self.inner.disconnect())
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn get_endpoints(&self) -> Result<Vec<EndpointDescription>> {
        self.block_on(self.inner.get_endpoints())
    }

    pub fn read(&self, nodes: &[ReadValueId]) -> Result<Vec<DataValue>> {
        self.block_on(self.inner.read(nodes, TimestampsToReturn::Both))
    }

    pub fn read_value(&self, node_id: &NodeId) -> Result<DataValue> {
        self.block_on(self.inner.read_value(node_id))
    }

    pub fn write(&self, values: &[WriteValue]) -> Result<Vec<StatusCode>> {
        self.block_on(self.inner.write(values))
    }

    pub fn write_value(&self, node_id: &NodeId, value: impl Into<Variant>) -> Result<()> {
        self.block_on(self.inner.write_value(node_id, value))
    }

    pub fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        input_arguments: Vec<Variant>,
    ) -> Result<Vec<Variant>> {
        self.block_on(self.inner.call_method(object_id, method_id, input_arguments))
    }

    pub fn create_subscription(
        &self,
        settings: &SubscriptionSettings,
    ) -> Result<(SubscriptionId, Subscription)> {
        let (id, stream) = self.block_on(self.inner.create_subscription(settings))?;
        Ok((
            id,
            Subscription {
                handle: self.runtime.handle().clone(),
                stream,
            },
        ))
    }

    pub fn create_monitored_items(
        &self,
        id: SubscriptionId,
        items: &[MonitoredItemRequest],
    ) -> Result<Vec<ItemResult<MonitoredItem>>> {
        self.block_on(self.inner.create_monitored_items(id, items))
    }

    pub fn delete_subscriptions(&self, ids: &[SubscriptionId]) -> Result<Vec<StatusCode>> {
        self.block_on(self.inner.delete_subscriptions(ids))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("blocking::Client").field(&self.inner).finish()
    }
}

/// Blocking receiver of one subscription's batches.
#[derive(Debug)]
pub struct Subscription {
    handle: tokio::runtime::Handle,
    stream: NotificationStream,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.stream.subscription_id()
    }

    /// Next batch; `None` once the subscription ended.
    pub fn recv(&mut self) -> Option<NotificationBatch> {
        self.handle.block_on(self.stream.recv())
    }

    /// `None` on timeout or when the subscription ended.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Option<NotificationBatch> {
        let stream = &mut self.stream;
        self.handle
            .block_on(async { tokio::time::timeout(timeout, stream.recv()).await })
            .ok()
            .flatten()
    }

    pub fn try_recv(&mut self) -> Option<NotificationBatch> {
        self.stream.try_recv()
    }
}
