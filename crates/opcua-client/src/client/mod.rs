// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client façade.
//!
//! [`Client`] owns at most one live [`Session`]. Every service call checks
//! the session, builds the request, submits it and maps bad service results
//! to [`Error::ServiceFault`]. Without a session the calls fail with
//! `ServiceFault(BadServerNotConnected)`.
//!
//! ```rust,no_run
//! use opcua_client::{Client, ClientConfig, NodeId, Result};
//!
//! # async fn run() -> Result<()> {
//! let client = Client::new(ClientConfig::new("opc.tcp://localhost:4840"))?;
//! client.connect().await?;
//! let value = client.read_value(&NodeId::numeric(2, 1001)).await?;
//! println!("{:?}", value.value());
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod discovery;
mod node;

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::secure_channel::{Certificate, ChannelParams, ClientPki, SecureChannel};
use crate::services::{
    AddNodesItem, AddNodesRequest, AddNodesResult, BrowseDescription, BrowseNextRequest,
    BrowseRequest, BrowseResult, CallMethodRequest, CallMethodResult, CallRequest,
    EndpointDescription, ReadRequest, ReadValueId, ReferenceDescription, RequestHeader,
    ViewDescription, WriteRequest, WriteValue,
};
use crate::session::{Session, SessionState};
use crate::subscription::{
    ItemResult, MonitoredItem, MonitoredItemRequest, MonitoringSettings, NotificationBatch,
    NotificationStream, SubscriptionId, SubscriptionInfo, SubscriptionSettings,
};
use crate::transport::Transport;
use crate::types::{
    ids, AttributeId, ByteString, DataValue, MonitoringMode, NodeId, StatusCode,
    TimestampsToReturn, Variant,
};

pub use node::Node;

/// Upper bound on BrowseNext rounds when following continuation points.
const MAX_BROWSE_CONTINUATIONS: usize = 1000;

/// Async OPC UA client.
pub struct Client {
    config: ClientConfig,
    session: ArcSwapOption<Session>,
    connecting: tokio::sync::Mutex<()>,
}

impl Client {
    /// Validate `config`; no connection is made yet.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            session: ArcSwapOption::empty(),
            connecting: tokio::sync::Mutex::new(()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Connect over TCP, create and activate a session.
    ///
    /// A secured policy without a configured server certificate first asks
    /// the server for its endpoints over an unsecured channel.
    pub async fn connect(&self) -> Result<()> {
        let _guard = self.connecting.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        let mut params = self.channel_params()?;
        if params.security_policy.is_secured() && params.server_certificate.is_none() {
            let endpoints = discovery::get_endpoints(&self.config).await?;
            params.server_certificate = Some(discovery::server_certificate(
                &endpoints,
                params.security_policy,
                params.security_mode,
            )?);
        }
        let channel = SecureChannel::connect(params).await?;
        self.establish(channel).await
    }

    /// Like [`connect`](Self::connect), over an already connected stream.
    /// Secured policies need a configured server certificate.
    pub async fn connect_with<S: Transport>(&self, stream: S) -> Result<()> {
        let _guard = self.connecting.lock().await;
        if self.is_connected() {
            return Ok(());
        }
        let channel = SecureChannel::open(stream, self.channel_params()?).await?;
        self.establish(channel).await
    }

    fn channel_params(&self) -> Result<ChannelParams> {
        let mut params = ChannelParams::from_config(&self.config);
        if params.security_policy.is_secured() {
            let (Some(certificate), Some(key)) = (
                self.config.client_certificate_path.as_ref(),
                self.config.client_private_key_path.as_ref(),
            ) else {
                return Err(Error::Config(
                    "secured endpoints need a client certificate and private key".into(),
                ));
            };
            params.client_pki = Some(Arc::new(ClientPki::load(certificate, key)?));
            if let Some(path) = &self.config.server_certificate_path {
                params.server_certificate = Some(Certificate::load(path)?);
            }
        }
        Ok(params)
    }

    async fn establish(&self, channel: Arc<SecureChannel>) -> Result<()> {
        let session = match Session::create(Arc::clone(&channel), &self.config).await {
            Ok(session) => session,
            Err(e) => {
                let _ = channel.close().await;
                return Err(e);
            }
        };
        if let Err(e) = session.activate(&self.config.identity).await {
            let _ = session.close(true).await;
            let _ = channel.close().await;
            return Err(e);
        }
        log::info!(
            "[Client] connected to {} (session {})",
            self.config.endpoint_url,
            session.session_id()
        );
        if let Some(old) = self.session.swap(Some(session)) {
            old.stop_tasks();
        }
        Ok(())
    }

    /// Close the session (deleting its subscriptions) and the channel.
    pub async fn disconnect(&self) -> Result<()> {
        let _guard = self.connecting.lock().await;
        let Some(session) = self.session.swap(None) else {
            return Ok(());
        };
        session.close(true).await?;
        session.channel().close().await?;
        log::info!("[Client] disconnected from {}", self.config.endpoint_url);
        Ok(())
    }

    /// State of the current session; `Closed` when there is none.
    pub fn state(&self) -> SessionState {
        self.session
            .load()
            .as_ref()
            .map_or(SessionState::Closed, |s| s.state())
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Activated
    }

    /// Current session, or `ServiceFault(BadServerNotConnected)`.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.session
            .load_full()
            .ok_or(Error::ServiceFault(StatusCode::BadServerNotConnected))
    }

    // ------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------

    /// Endpoints of the configured server. Uses the open channel when
    /// connected, otherwise a temporary unsecured one.
    pub async fn get_endpoints(&self) -> Result<Vec<EndpointDescription>> {
        match self.session.load_full() {
            Some(session) if session.channel().state().is_operational() => {
                discovery::get_endpoints_on(
                    session.channel(),
                    &self.config.endpoint_url,
                    self.config.request_timeout(),
                )
                .await
            }
            _ => discovery::get_endpoints(&self.config).await,
        }
    }

    // ------------------------------------------------------------------
    // Attribute services
    // ------------------------------------------------------------------

    /// Read; one DataValue per id, in order.
    pub async fn read(
        &self,
        nodes: &[ReadValueId],
        timestamps: TimestampsToReturn,
    ) -> Result<Vec<DataValue>> {
        let response = self
            .session()?
            .send(ReadRequest {
                request_header: RequestHeader::default(),
                max_age: 0.0,
                timestamps_to_return: timestamps,
                nodes_to_read: nodes.to_vec(),
            })
            .await?;
        expect_results("Read", response.results.len(), nodes.len())?;
        Ok(response.results)
    }

    /// Value attribute of one node.
    pub async fn read_value(&self, node_id: &NodeId) -> Result<DataValue> {
        self.read_attribute(node_id, AttributeId::Value).await
    }

    pub async fn read_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
    ) -> Result<DataValue> {
        let mut values = self
            .read(
                &[ReadValueId::new(node_id.clone(), attribute)],
                TimestampsToReturn::Both,
            )
            .await?;
        values
            .pop()
            .ok_or(Error::ServiceFault(StatusCode::BadUnexpectedError))
    }

    /// Write; one StatusCode per value, in order.
    pub async fn write(&self, values: &[WriteValue]) -> Result<Vec<StatusCode>> {
        let response = self
            .session()?
            .send(WriteRequest {
                request_header: RequestHeader::default(),
                nodes_to_write: values.to_vec(),
            })
            .await?;
        expect_results("Write", response.results.len(), values.len())?;
        Ok(response.results)
    }

    /// Write the Value attribute; a bad result becomes `ServiceFault`.
    pub async fn write_value(&self, node_id: &NodeId, value: impl Into<Variant>) -> Result<()> {
        self.write_attribute(node_id, AttributeId::Value, DataValue::new(value))
            .await
    }

    pub async fn write_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
        value: DataValue,
    ) -> Result<()> {
        let results = self
            .write(&[WriteValue::new(node_id.clone(), attribute, value)])
            .await?;
        match results.first() {
            Some(status) if status.is_bad() => Err(Error::ServiceFault(*status)),
            Some(_) => Ok(()),
            None => Err(Error::ServiceFault(StatusCode::BadUnexpectedError)),
        }
    }

    // ------------------------------------------------------------------
    // View services
    // ------------------------------------------------------------------

    pub async fn browse(&self, nodes: &[BrowseDescription]) -> Result<Vec<BrowseResult>> {
        let response = self
            .session()?
            .send(BrowseRequest {
                request_header: RequestHeader::default(),
                view: ViewDescription::default(),
                requested_max_references_per_node: 0,
                nodes_to_browse: nodes.to_vec(),
            })
            .await?;
        expect_results("Browse", response.results.len(), nodes.len())?;
        Ok(response.results)
    }

    /// Continue (or, with `release`, abandon) earlier browse results.
    pub async fn browse_next(
        &self,
        release: bool,
        continuation_points: &[ByteString],
    ) -> Result<Vec<BrowseResult>> {
        let response = self
            .session()?
            .send(BrowseNextRequest {
                request_header: RequestHeader::default(),
                release_continuation_points: release,
                continuation_points: continuation_points.to_vec(),
            })
            .await?;
        if !release {
            expect_results("BrowseNext", response.results.len(), continuation_points.len())?;
        }
        Ok(response.results)
    }

    /// Every reference of one node, following continuation points.
    pub async fn browse_all(&self, node: BrowseDescription) -> Result<Vec<ReferenceDescription>> {
        let mut result = self
            .browse(std::slice::from_ref(&node))
            .await?
            .pop()
            .ok_or(Error::ServiceFault(StatusCode::BadUnexpectedError))?;
        let mut references = Vec::new();
        for _ in 0..MAX_BROWSE_CONTINUATIONS {
            if result.status_code.is_bad() {
                return Err(Error::ServiceFault(result.status_code));
            }
            references.append(&mut result.references);
            if result.continuation_point.is_empty() {
                return Ok(references);
            }
            let point = std::mem::take(&mut result.continuation_point);
            result = self
                .browse_next(false, &[point])
                .await?
                .pop()
                .ok_or(Error::ServiceFault(StatusCode::BadUnexpectedError))?;
        }
        log::warn!("[Client] browse of {} did not finish, releasing", node.node_id);
        if !result.continuation_point.is_empty() {
            let _ = self.browse_next(true, &[result.continuation_point]).await;
        }
        Ok(references)
    }

    // ------------------------------------------------------------------
    // Method service
    // ------------------------------------------------------------------

    pub async fn call(&self, methods: &[CallMethodRequest]) -> Result<Vec<CallMethodResult>> {
        let response = self
            .session()?
            .send(CallRequest {
                request_header: RequestHeader::default(),
                methods_to_call: methods.to_vec(),
            })
            .await?;
        expect_results("Call", response.results.len(), methods.len())?;
        Ok(response.results)
    }

    /// Call one method; a bad result becomes `ServiceFault`.
    pub async fn call_method(
        &self,
        object_id: &NodeId,
        method_id: &NodeId,
        input_arguments: Vec<Variant>,
    ) -> Result<Vec<Variant>> {
        let request = CallMethodRequest {
            object_id: object_id.clone(),
            method_id: method_id.clone(),
            input_arguments,
        };
        let result = self
            .call(std::slice::from_ref(&request))
            .await?
            .pop()
            .ok_or(Error::ServiceFault(StatusCode::BadUnexpectedError))?;
        if result.status_code.is_bad() {
            return Err(Error::ServiceFault(result.status_code));
        }
        Ok(result.output_arguments)
    }

    /// AddNodes; per-item results in request order.
    pub async fn add_nodes(&self, items: &[AddNodesItem]) -> Result<Vec<AddNodesResult>> {
        let response = self
            .session()?
            .send(AddNodesRequest {
                request_header: RequestHeader::default(),
                nodes_to_add: items.to_vec(),
            })
            .await?;
        expect_results("AddNodes", response.results.len(), items.len())?;
        Ok(response.results)
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscription settings using the configured publishing interval.
    pub fn subscription_settings(&self) -> SubscriptionSettings {
        SubscriptionSettings::with_interval(self.config.publishing_interval())
    }

    pub async fn create_subscription(
        &self,
        settings: &SubscriptionSettings,
    ) -> Result<(SubscriptionId, NotificationStream)> {
        self.session()?.create_subscription(settings).await
    }

    /// Create a subscription whose batches are handed to `callback`, in
    /// order, on a spawned task.
    pub async fn create_subscription_with_callback<F>(
        &self,
        settings: &SubscriptionSettings,
        callback: F,
    ) -> Result<SubscriptionId>
    where
        F: FnMut(NotificationBatch) + Send + 'static,
    {
        let (id, stream) = self.create_subscription(settings).await?;
        stream.spawn_callback(callback);
        Ok(id)
    }

    pub async fn modify_subscription(
        &self,
        id: SubscriptionId,
        settings: &SubscriptionSettings,
    ) -> Result<SubscriptionInfo> {
        self.session()?.modify_subscription(id, settings).await
    }

    pub async fn set_publishing_mode(
        &self,
        enabled: bool,
        ids: &[SubscriptionId],
    ) -> Result<Vec<StatusCode>> {
        self.session()?.set_publishing_mode(enabled, ids).await
    }

    pub async fn delete_subscriptions(&self, ids: &[SubscriptionId]) -> Result<Vec<StatusCode>> {
        self.session()?.delete_subscriptions(ids).await
    }

    pub fn subscription_info(&self, id: SubscriptionId) -> Option<SubscriptionInfo> {
        self.session().ok()?.subscription_info(id)
    }

    pub async fn create_monitored_items(
        &self,
        id: SubscriptionId,
        items: &[MonitoredItemRequest],
    ) -> Result<Vec<ItemResult<MonitoredItem>>> {
        self.session()?
            .create_monitored_items(id, TimestampsToReturn::Both, items)
            .await
    }

    pub async fn modify_monitored_items(
        &self,
        id: SubscriptionId,
        items: &[(u32, MonitoringSettings)],
    ) -> Result<Vec<ItemResult<MonitoredItem>>> {
        self.session()?
            .modify_monitored_items(id, TimestampsToReturn::Both, items)
            .await
    }

    pub async fn set_monitoring_mode(
        &self,
        id: SubscriptionId,
        mode: MonitoringMode,
        item_ids: &[u32],
    ) -> Result<Vec<StatusCode>> {
        self.session()?.set_monitoring_mode(id, mode, item_ids).await
    }

    pub async fn delete_monitored_items(
        &self,
        id: SubscriptionId,
        item_ids: &[u32],
    ) -> Result<Vec<StatusCode>> {
        self.session()?.delete_monitored_items(id, item_ids).await
    }

    // ------------------------------------------------------------------
    // Node handles
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Node<'_> {
        Node::new(self, id)
    }

    pub fn root_node(&self) -> Node<'_> {
        self.node(NodeId::ns0(ids::object::ROOT_FOLDER))
    }

    pub fn objects_node(&self) -> Node<'_> {
        self.node(NodeId::ns0(ids::object::OBJECTS_FOLDER))
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(session) = self.session.swap(None) {
            session.stop_tasks();
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint_url", &self.config.endpoint_url)
            .field("state", &self.state())
            .finish()
    }
}

fn expect_results(service: &str, got: usize, expected: usize) -> Result<()> {
    if got == expected {
        return Ok(());
    }
    log::warn!(
        "[Client] {} returned {} results for {} operations",
        service,
        got,
        expected
    );
    Err(Error::ServiceFault(StatusCode::BadUnexpectedError))
}
