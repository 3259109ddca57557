// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OPC UA session bound to one secure channel.
//!
//! ```text
//!   create()            activate()             close()
//! ----------> Created -------------> Activated ---------> Closed
//!                |                       |
//!                +-----------+-----------+
//!                            | channel fault, keep-alive timeout,
//!                            v BadSessionIdInvalid
//!                         Faulted
//! ```
//!
//! The session owns its subscription registry and two background tasks:
//! the keep-alive probe and the publish loop. Both hold weak references and
//! are aborted on close or fault.

mod identity;
mod keep_alive;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::{duration_from_ms, ClientConfig, IdentityToken, NONCE_LENGTH};
use crate::error::{Error, Result};
use crate::secure_channel::crypto::{random_bytes, rsa_sign, rsa_verify};
use crate::secure_channel::{Certificate, SecureChannel};
use crate::services::{
    ActivateSessionRequest, ActivateSessionResponse, ApplicationDescription, CloseSessionRequest,
    CloseSessionResponse, CreateSessionRequest, CreateSessionResponse, EndpointDescription,
    RequestHeader, RequestMessage, ResponseMessage, ServiceRequest, SignatureData,
};
use crate::subscription::SubscriptionRegistry;
use crate::types::{ApplicationType, ByteString, LocalizedText, NodeId, StatusCode, UaString};

use identity::{identity_token, TokenContext};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Created,
    Activated,
    Closed,
    Faulted,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "Created",
            SessionState::Activated => "Activated",
            SessionState::Closed => "Closed",
            SessionState::Faulted => "Faulted",
        };
        write!(f, "{}", s)
    }
}

/// What the server told us in CreateSession.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: NodeId,
    pub authentication_token: NodeId,
    pub revised_timeout: Duration,
    pub server_endpoints: Vec<EndpointDescription>,
    pub max_request_message_size: u32,
}

#[derive(Default)]
struct SessionTasks {
    keep_alive: Option<JoinHandle<()>>,
    publisher: Option<JoinHandle<()>>,
}

impl SessionTasks {
    fn abort(&mut self) {
        for task in [self.keep_alive.take(), self.publisher.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

pub struct Session {
    channel: Arc<SecureChannel>,
    info: SessionInfo,
    server_nonce: Mutex<Vec<u8>>,
    state: watch::Sender<SessionState>,
    request_timeout: Duration,
    keep_alive: Option<(Duration, u32)>,
    max_inflight_publish: usize,
    subscriptions: SubscriptionRegistry,
    tasks: Mutex<SessionTasks>,
}

impl Session {
    /// CreateSession on `channel`.
    ///
    /// On secured channels the server signature over our certificate and
    /// nonce is verified.
    pub async fn create(channel: Arc<SecureChannel>, config: &ClientConfig) -> Result<Arc<Self>> {
        let client_nonce = random_bytes(NONCE_LENGTH)?;
        let client_certificate = channel
            .client_pki()
            .map(|pki| ByteString::from(pki.certificate.der()))
            .unwrap_or_default();
        let request = CreateSessionRequest {
            request_header: RequestHeader::default(),
            client_description: ApplicationDescription {
                application_uri: UaString::from(config.application_uri.as_str()),
                product_uri: UaString::from(config.product_uri.as_str()),
                application_name: LocalizedText::from(config.application_name.as_str()),
                application_type: ApplicationType::Client,
                ..ApplicationDescription::default()
            },
            server_uri: UaString::null(),
            endpoint_url: UaString::from(channel.endpoint_url()),
            session_name: UaString::from(config.session_name.as_str()),
            client_nonce: ByteString::from(client_nonce.as_slice()),
            client_certificate,
            requested_session_timeout: config.session_timeout_ms as f64,
            max_response_message_size: channel.limits().receive_max_message_size,
        };
        let response: CreateSessionResponse = channel
            .send_request(request.into(), config.request_timeout())
            .await?
            .into_response()?;

        let policy = channel.security_policy();
        if policy.is_secured() {
            let server = channel.server_certificate().ok_or_else(|| {
                Error::SecurityViolation("secured channel without server certificate".into())
            })?;
            if !response.server_certificate.is_null()
                && !response.server_certificate.as_bytes().starts_with(server.der())
            {
                return Err(Error::SecurityViolation(
                    "CreateSession returned a different server certificate".into(),
                ));
            }
            if response.server_nonce.as_bytes().len() < NONCE_LENGTH {
                return Err(Error::SecurityViolation(format!(
                    "server nonce has {} bytes",
                    response.server_nonce.as_bytes().len()
                )));
            }
            let client_certificate = channel
                .client_pki()
                .map(|pki| pki.certificate.der())
                .unwrap_or_default();
            let signed = [client_certificate, client_nonce.as_slice()].concat();
            rsa_verify(
                server.public_key(),
                policy.asymmetric_hash(),
                &signed,
                response.server_signature.signature.as_bytes(),
            )
            .map_err(|_| Error::SecurityViolation("server signature does not verify".into()))?;
        }

        let info = SessionInfo {
            session_id: response.session_id,
            authentication_token: response.authentication_token,
            revised_timeout: duration_from_ms(response.revised_session_timeout),
            server_endpoints: response.server_endpoints,
            max_request_message_size: response.max_request_message_size,
        };
        log::info!(
            "[Session] created {} (timeout {:?})",
            info.session_id,
            info.revised_timeout
        );
        Ok(Arc::new(Session {
            channel,
            info,
            server_nonce: Mutex::new(response.server_nonce.as_bytes().to_vec()),
            state: watch::channel(SessionState::Created).0,
            request_timeout: config.request_timeout(),
            keep_alive: config
                .keep_alive_interval()
                .map(|interval| (interval, config.keep_alive_grace)),
            max_inflight_publish: config.max_inflight_publish,
            subscriptions: SubscriptionRegistry::new(),
            tasks: Mutex::new(SessionTasks::default()),
        }))
    }

    /// ActivateSession with `identity`.
    ///
    /// A rejection is reported as [`Error::ActivationFailed`] and leaves the
    /// session in `Created`.
    pub async fn activate(self: &Arc<Self>, identity: &IdentityToken) -> Result<()> {
        if self.state() != SessionState::Created {
            return Err(Error::ServiceFault(StatusCode::BadInvalidState));
        }
        let policy = self.channel.security_policy();
        let server_nonce = self.server_nonce.lock().clone();
        let server_certificate = self.channel.server_certificate();

        let client_signature = match (self.channel.client_pki(), server_certificate) {
            (Some(pki), Some(server)) if policy.is_secured() => {
                let signed = [server.der(), server_nonce.as_slice()].concat();
                SignatureData {
                    algorithm: UaString::from(policy.asymmetric_signature_uri()),
                    signature: ByteString::from(rsa_sign(
                        pki.private_key.rsa(),
                        policy.asymmetric_hash(),
                        &signed,
                    )?),
                }
            }
            _ => SignatureData::default(),
        };
        let context = TokenContext {
            endpoints: &self.info.server_endpoints,
            channel_policy: policy,
            channel_mode: self.channel.security_mode(),
            server_key: server_certificate.map(Certificate::public_key),
            server_nonce: &server_nonce,
        };
        let request = ActivateSessionRequest {
            request_header: RequestHeader::default(),
            client_signature,
            client_software_certificates: Vec::new(),
            locale_ids: Vec::new(),
            user_identity_token: identity_token(identity, &context)?,
            user_token_signature: SignatureData::default(),
        };

        let response: ActivateSessionResponse = match self
            .send_raw(request.into(), self.request_timeout)
            .await
            .and_then(ResponseMessage::into_response)
        {
            Ok(response) => response,
            Err(Error::ServiceFault(status)) => {
                log::warn!("[Session] activation rejected: {}", status);
                return Err(Error::ActivationFailed(status));
            }
            Err(e) => return Err(e),
        };
        if !response.server_nonce.is_null() {
            *self.server_nonce.lock() = response.server_nonce.as_bytes().to_vec();
        }

        let activated = self.state.send_if_modified(|state| {
            if *state == SessionState::Created {
                *state = SessionState::Activated;
                true
            } else {
                false
            }
        });
        if !activated {
            return Err(Error::Cancelled);
        }
        log::info!("[Session] {} activated ({:?})", self.info.session_id, identity);

        if let Some((interval, grace)) = self.keep_alive {
            let task = tokio::spawn(keep_alive::run(Arc::downgrade(self), interval, grace));
            self.tasks.lock().keep_alive = Some(task);
        }
        if !self.subscriptions.is_empty() {
            self.start_publishing();
        }
        Ok(())
    }

    /// CloseSession; stops keep-alive and publishing. Idempotent.
    ///
    /// Requests still waiting for a response fail with [`Error::Cancelled`].
    pub async fn close(&self, delete_subscriptions: bool) -> Result<()> {
        let was_open = self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Created | SessionState::Activated) {
                *state = SessionState::Closed;
                true
            } else {
                false
            }
        });
        self.tasks.lock().abort();
        self.subscriptions.clear();
        if !was_open || !self.channel.state().is_operational() {
            return Ok(());
        }

        let request = CloseSessionRequest {
            request_header: RequestHeader::default(),
            delete_subscriptions,
        };
        let result = self
            .send_unguarded(request.into(), self.request_timeout)
            .await
            .and_then(|r| r.into_response::<CloseSessionResponse>());
        match result {
            Ok(_) => log::info!("[Session] {} closed", self.info.session_id),
            Err(e) => log::warn!(
                "[Session] CloseSession for {} failed: {}",
                self.info.session_id,
                e
            ),
        }
        Ok(())
    }

    /// Send a service request with the default timeout.
    pub async fn send<R: ServiceRequest>(&self, request: R) -> Result<R::Response> {
        self.send_with_timeout(request, self.request_timeout).await
    }

    /// Send a service request; ServiceFaults and bad service results become
    /// [`Error::ServiceFault`].
    pub async fn send_with_timeout<R: ServiceRequest>(
        &self,
        request: R,
        timeout: Duration,
    ) -> Result<R::Response> {
        self.check_active()?;
        self.send_raw(request.into(), timeout)
            .await?
            .into_response()
    }

    /// Send on the channel; gives up with [`Error::Cancelled`] as soon as the
    /// session is closed or faulted. The dropped send releases its pending slot.
    async fn send_raw(
        &self,
        request: RequestMessage,
        timeout: Duration,
    ) -> Result<ResponseMessage> {
        let mut state = self.state.subscribe();
        tokio::select! {
            result = self.send_unguarded(request, timeout) => result,
            _ = state.wait_for(|s| matches!(s, SessionState::Closed | SessionState::Faulted)) => {
                log::debug!("[Session] {} request cancelled", self.info.session_id);
                Err(Error::Cancelled)
            }
        }
    }

    async fn send_unguarded(
        &self,
        mut request: RequestMessage,
        timeout: Duration,
    ) -> Result<ResponseMessage> {
        request.header_mut().authentication_token = self.info.authentication_token.clone();
        match self.channel.send_request(request, timeout).await {
            Ok(response) => {
                let status = response.service_result();
                if status == StatusCode::BadSessionIdInvalid
                    || status == StatusCode::BadSessionClosed
                {
                    self.fault(Error::ServiceFault(status));
                }
                Ok(response)
            }
            Err(e) => {
                if e.is_fatal() {
                    self.fault(e.clone());
                }
                Err(e)
            }
        }
    }

    pub fn state(&self) -> SessionState {
        let state = *self.state.borrow();
        match state {
            SessionState::Created | SessionState::Activated
                if self.channel.state().is_terminal() =>
            {
                SessionState::Faulted
            }
            other => other,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Activated
    }

    /// Receiver notified on every explicit state change.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn session_id(&self) -> &NodeId {
        &self.info.session_id
    }

    pub fn channel(&self) -> &Arc<SecureChannel> {
        &self.channel
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub(crate) fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub(crate) fn max_inflight_publish(&self) -> usize {
        self.max_inflight_publish
    }

    /// Spawn the publish loop unless it is already running.
    pub(crate) fn start_publishing(self: &Arc<Self>) {
        if !self.is_active() {
            return;
        }
        let mut tasks = self.tasks.lock();
        let running = tasks.publisher.as_ref().is_some_and(|t| !t.is_finished());
        if !running {
            tasks.publisher = Some(tokio::spawn(crate::subscription::publisher::run(
                Arc::downgrade(self),
            )));
        }
    }

    /// Abort keep-alive and publishing without talking to the server.
    pub(crate) fn stop_tasks(&self) {
        self.tasks.lock().abort();
    }

    /// Mark the session faulted and stop its tasks.
    pub(crate) fn fault(&self, err: Error) {
        let faulted = self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Created | SessionState::Activated) {
                *state = SessionState::Faulted;
                true
            } else {
                false
            }
        });
        if faulted {
            log::error!("[Session] {} faulted: {}", self.info.session_id, err);
            self.tasks.lock().abort();
        }
    }

    fn check_active(&self) -> Result<()> {
        match self.state() {
            SessionState::Activated => Ok(()),
            SessionState::Created => Err(Error::ServiceFault(StatusCode::BadSessionNotActivated)),
            SessionState::Closed => Err(Error::ServiceFault(StatusCode::BadSessionClosed)),
            SessionState::Faulted => Err(self
                .channel
                .fault_error()
                .unwrap_or(Error::ServiceFault(StatusCode::BadServerNotConnected))),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.tasks.lock().abort();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.info.session_id)
            .field("state", &self.state())
            .field("channel", &self.channel)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Request handlers for the in-process server.

    use super::*;
    use crate::services::{ReadResponse, ResponseHeader};
    use crate::types::{DataValue, DateTime, Variant};

    pub fn header(request: &RequestMessage) -> ResponseHeader {
        ResponseHeader::new(request.header().request_handle, StatusCode::Good)
    }

    /// CreateSession, ActivateSession, CloseSession and Read of any node.
    pub fn session_handler(request: &RequestMessage) -> Option<ResponseMessage> {
        let response: ResponseMessage = match request {
            RequestMessage::CreateSession(_) => CreateSessionResponse {
                response_header: header(request),
                session_id: NodeId::numeric(1, 1001),
                authentication_token: NodeId::opaque(0, vec![0xAB; 16]),
                revised_session_timeout: 30_000.0,
                server_nonce: ByteString::from(vec![1u8; 32]),
                server_certificate: ByteString::null(),
                server_endpoints: Vec::new(),
                server_software_certificates: Vec::new(),
                server_signature: SignatureData::default(),
                max_request_message_size: 0,
            }
            .into(),
            RequestMessage::ActivateSession(_) => ActivateSessionResponse {
                response_header: header(request),
                server_nonce: ByteString::from(vec![2u8; 32]),
                results: Vec::new(),
                diagnostic_infos: Vec::new(),
            }
            .into(),
            RequestMessage::CloseSession(_) => CloseSessionResponse {
                response_header: header(request),
            }
            .into(),
            RequestMessage::Read(read) => ReadResponse {
                response_header: header(request),
                results: read
                    .nodes_to_read
                    .iter()
                    .map(|_| DataValue {
                        server_timestamp: Some(DateTime::now()),
                        ..DataValue::new(Variant::Int32(0))
                    })
                    .collect(),
                diagnostic_infos: Vec::new(),
            }
            .into(),
            _ => return None,
        };
        Some(response)
    }
}
