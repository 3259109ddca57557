// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Secure channel over one transport connection.
//!
//! # Tasks
//!
//! - **Reader**: the only consumer of the read half. Verifies and reassembles
//!   chunks, then completes the matching [`PendingRequest`]. Any transport,
//!   decoding or security error faults the channel and fails every
//!   outstanding request with that error.
//! - **Renewal**: sleeps until 75% of the token lifetime and issues a Renew
//!   OpenSecureChannel. Holds only a weak reference, so dropping the last
//!   handle stops it.
//!
//! Writers serialize on an async mutex around the write half; sequence
//! numbers are drawn under that lock so they hit the wire in order.
//!
//! [`PendingRequest`]: super::pending::PendingRequest

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rsa::RsaPublicKey;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::chunk::{
    encode_chunks, split_plain, Assembled, AsymmetricSecurityHeader, ChunkAssembler, ChunkPrefix,
    OutboundMessage, SecurityHeader, SequenceCounter,
};
use super::crypto::{random_bytes, ChannelKeys};
use super::pending::PendingRequests;
use super::pki::{Certificate, ClientPki, PrivateKey};
use super::policy::SecurityPolicy;
use super::security::Protection;
use super::state::ChannelState;
use super::token::{SecurityToken, TokenSet};
use crate::codec::{BinaryDecode, BinaryEncode, CodecError, DecodingOptions};
use crate::config::{ClientConfig, TransportLimits, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::services::{
    CloseSecureChannelRequest, OpenSecureChannelRequest, OpenSecureChannelResponse, RequestHeader,
    RequestMessage, ResponseMessage,
};
use crate::transport::frame::{read_frame, ErrorMessage};
use crate::transport::{self, hello, ConnectionLimits, EndpointUrl, Frame, MessageType, Transport};
use crate::types::{
    ByteString, DateTime, MessageSecurityMode, SecurityTokenRequestType, StatusCode, UaString,
};

/// Everything needed to open a channel.
#[derive(Debug, Clone)]
pub struct ChannelParams {
    pub endpoint_url: String,
    pub security_policy: SecurityPolicy,
    pub security_mode: MessageSecurityMode,
    /// Required unless the policy is None.
    pub client_pki: Option<Arc<ClientPki>>,
    /// Required unless the policy is None.
    pub server_certificate: Option<Certificate>,
    pub limits: TransportLimits,
    /// Used for OPN and as the default deadline of [`SecureChannel::send_request`] callers.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub requested_lifetime: Duration,
}

impl ChannelParams {
    /// Unsecured parameters with default limits and timeouts.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self::from_config(&ClientConfig::new(endpoint_url))
    }

    /// Parameters taken from `config`; PKI material is attached by the caller.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            endpoint_url: config.endpoint_url.clone(),
            security_policy: config.security_policy,
            security_mode: config.security_mode,
            client_pki: None,
            server_certificate: None,
            limits: config.limits.clone(),
            request_timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            requested_lifetime: Duration::from_millis(u64::from(config.channel_lifetime_ms)),
        }
    }

    /// Same endpoint, SecurityPolicy None. Used for discovery.
    pub fn unsecured(&self) -> Self {
        Self {
            security_policy: SecurityPolicy::None,
            security_mode: MessageSecurityMode::None,
            server_certificate: None,
            ..self.clone()
        }
    }

    fn effective_mode(&self) -> MessageSecurityMode {
        if self.security_policy.is_secured() {
            self.security_mode
        } else {
            MessageSecurityMode::None
        }
    }
}

/// State shared with the reader task.
struct Shared {
    endpoint_url: String,
    policy: SecurityPolicy,
    mode: MessageSecurityMode,
    client_pki: Option<Arc<ClientPki>>,
    server_certificate: Option<Certificate>,
    limits: ConnectionLimits,
    decoding: DecodingOptions,
    state: watch::Sender<ChannelState>,
    /// First fatal error; reported to later callers.
    fault: Mutex<Option<Error>>,
    pending: Arc<PendingRequests>,
    tokens: ArcSwap<TokenSet>,
    last_activity: Mutex<Instant>,
}

impl Shared {
    /// Move to `to` if the current state is one of `from`.
    fn transition(&self, from: &[ChannelState], to: ChannelState) -> bool {
        self.state.send_if_modified(|state| {
            if from.contains(state) {
                log::debug!("[SecureChannel] {} -> {}", state, to);
                *state = to;
                true
            } else {
                false
            }
        })
    }

    /// Fault the channel: record `err`, fail every pending request with it.
    ///
    /// No-op once the channel is closing or already terminal.
    fn fault(&self, err: Error) {
        let faulted = self.state.send_if_modified(|state| {
            if state.is_terminal() || *state == ChannelState::Closing {
                false
            } else {
                *state = ChannelState::Faulted;
                true
            }
        });
        if !faulted {
            log::debug!("[SecureChannel] ignoring error after close: {}", err);
            return;
        }
        log::error!("[SecureChannel] channel to {} faulted: {}", self.endpoint_url, err);
        {
            let mut fault = self.fault.lock();
            if fault.is_none() {
                *fault = Some(err.clone());
            }
        }
        self.pending.fail_all(err);
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn asymmetric_keys(&self) -> Result<(&PrivateKey, &RsaPublicKey)> {
        match (&self.client_pki, &self.server_certificate) {
            (Some(pki), Some(server)) => Ok((&pki.private_key, server.public_key())),
            _ => Err(Error::SecurityViolation(format!(
                "policy {} needs client and server certificates",
                self.policy
            ))),
        }
    }

    fn asymmetric_header(&self) -> SecurityHeader {
        let (sender_certificate, receiver_certificate_thumbprint) = if self.policy.is_secured() {
            (
                self.client_pki
                    .as_ref()
                    .map(|pki| ByteString::from(pki.certificate.der()))
                    .unwrap_or_default(),
                self.server_certificate
                    .as_ref()
                    .map(|cert| ByteString::from(&cert.thumbprint()[..]))
                    .unwrap_or_default(),
            )
        } else {
            (ByteString::null(), ByteString::null())
        };
        SecurityHeader::Asymmetric(AsymmetricSecurityHeader {
            security_policy_uri: UaString::from(self.policy.uri()),
            sender_certificate,
            receiver_certificate_thumbprint,
        })
    }

    fn symmetric_protection<'a>(
        &self,
        token: &'a SecurityToken,
        outbound: bool,
    ) -> Result<Protection<'a>> {
        if self.mode == MessageSecurityMode::None {
            return Ok(Protection::None);
        }
        let keys = token.keys.as_ref().ok_or_else(|| {
            Error::SecurityViolation(format!("token {} has no keys", token.token_id))
        })?;
        Ok(Protection::Symmetric {
            policy: self.policy,
            keys: if outbound { &keys.client } else { &keys.server },
            encrypt: self.mode == MessageSecurityMode::SignAndEncrypt,
        })
    }

    /// Verify one inbound frame and feed it to the assembler.
    fn handle_frame(&self, frame: Frame, assembler: &mut ChunkAssembler) -> Result<()> {
        self.touch();
        match frame.header.message_type {
            MessageType::Error => {
                let err = ErrorMessage::decode_from_slice(&frame.body)?;
                return Err(Error::Transport(format!(
                    "server closed the connection: {} {}",
                    err.error,
                    err.reason.as_str()
                )));
            }
            t if !t.is_secure() => {
                return Err(Error::Decoding(CodecError::InvalidData(format!(
                    "unexpected {} message on an open channel",
                    t
                ))));
            }
            _ => {}
        }

        let bytes = frame.to_bytes();
        let prefix = ChunkPrefix::parse(&bytes, &self.decoding)?;
        let tokens = self.tokens.load_full();
        let plain = match &prefix.security_header {
            SecurityHeader::Asymmetric(header) => {
                if header.security_policy_uri.as_str() != self.policy.uri() {
                    return Err(Error::SecurityViolation(format!(
                        "response uses policy {}",
                        header.security_policy_uri.as_str()
                    )));
                }
                if self.policy.is_secured() {
                    let (local, remote) = self.asymmetric_keys()?;
                    let expected = self
                        .client_pki
                        .as_ref()
                        .map(|pki| &pki.certificate.thumbprint()[..]);
                    let thumbprint = &header.receiver_certificate_thumbprint;
                    if !thumbprint.is_null() && Some(thumbprint.as_bytes()) != expected {
                        return Err(Error::SecurityViolation(
                            "response is encrypted for another certificate".into(),
                        ));
                    }
                    Protection::AsymmetricReceive {
                        policy: self.policy,
                        local,
                        remote,
                    }
                    .unprotect(&bytes, prefix.len)?
                } else {
                    Protection::None.unprotect(&bytes, prefix.len)?
                }
            }
            SecurityHeader::Symmetric { token_id } => {
                let token = tokens.inbound(*token_id, Instant::now()).ok_or_else(|| {
                    Error::SecurityViolation(format!("unknown or expired token {}", token_id))
                })?;
                if prefix.channel_id != token.channel_id {
                    return Err(Error::SecurityViolation(format!(
                        "chunk for channel {} on channel {}",
                        prefix.channel_id, token.channel_id
                    )));
                }
                self.symmetric_protection(token, false)?
                    .unprotect(&bytes, prefix.len)?
            }
        };

        let (sequence, body) = split_plain(&plain, prefix.len)?;
        match assembler.push(prefix.header.chunk_type, sequence, body)? {
            Assembled::Incomplete => {}
            Assembled::Complete { request_id, body } => {
                let response = ResponseMessage::decode_with_options(&body, self.decoding)?;
                if !self.pending.complete(request_id, Ok(response)) {
                    log::debug!(
                        "[SecureChannel] dropping late response for request {}",
                        request_id
                    );
                }
            }
            Assembled::Aborted {
                request_id,
                status,
                reason,
            } => {
                log::warn!(
                    "[SecureChannel] server aborted response {}: {} {}",
                    request_id,
                    status,
                    reason
                );
                self.pending.complete(request_id, Err(Error::ServiceFault(status)));
            }
            Assembled::TooLarge {
                request_id,
                size,
                limit,
            } => {
                log::warn!(
                    "[SecureChannel] response {} exceeds limit ({} > {})",
                    request_id,
                    size,
                    limit
                );
                self.pending
                    .complete(request_id, Err(Error::MessageTooLarge { size, limit }));
            }
        }
        Ok(())
    }
}

struct ChannelWriter {
    stream: WriteHalf<Box<dyn Transport>>,
    sequence: SequenceCounter,
}

/// An open secure channel. Cheap to share behind `Arc`.
pub struct SecureChannel {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<ChannelWriter>,
    next_handle: AtomicU32,
    request_timeout: Duration,
    requested_lifetime: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SecureChannel {
    /// Connect over TCP and open the channel.
    pub async fn connect(params: ChannelParams) -> Result<Arc<Self>> {
        let url = EndpointUrl::parse(&params.endpoint_url)?;
        let stream = transport::connect(&url, params.connect_timeout).await?;
        Self::open(stream, params).await
    }

    /// Run HEL/ACK and OpenSecureChannel(Issue) over `stream`.
    ///
    /// Every failure is reported as [`Error::ChannelOpenFailed`].
    pub async fn open<S: Transport>(mut stream: S, params: ChannelParams) -> Result<Arc<Self>> {
        if params.security_policy.is_secured()
            && (params.client_pki.is_none() || params.server_certificate.is_none())
        {
            return Err(Error::ChannelOpenFailed(format!(
                "policy {} needs a client certificate and the server certificate",
                params.security_policy
            )));
        }

        let limits = hello::handshake(
            &mut stream,
            &params.endpoint_url,
            &params.limits,
            params.request_timeout,
        )
        .await
        .map_err(open_failed)?;

        let boxed: Box<dyn Transport> = Box::new(stream);
        let (read_half, write_half) = tokio::io::split(boxed);
        let (state, _) = watch::channel(ChannelState::Opening);
        let mode = params.effective_mode();
        let shared = Arc::new(Shared {
            endpoint_url: params.endpoint_url.clone(),
            policy: params.security_policy,
            mode,
            client_pki: params.client_pki.clone(),
            server_certificate: params.server_certificate.clone(),
            limits,
            decoding: params.limits.decoding_options(),
            state,
            fault: Mutex::new(None),
            pending: PendingRequests::new(),
            tokens: ArcSwap::from_pointee(TokenSet::default()),
            last_activity: Mutex::new(Instant::now()),
        });
        let channel = Arc::new(SecureChannel {
            shared: Arc::clone(&shared),
            writer: tokio::sync::Mutex::new(ChannelWriter {
                stream: write_half,
                sequence: SequenceCounter::new(1),
            }),
            next_handle: AtomicU32::new(1),
            request_timeout: params.request_timeout,
            requested_lifetime: params.requested_lifetime,
            tasks: Mutex::new(Vec::new()),
        });
        channel.tasks.lock().push(tokio::spawn(read_loop(shared, read_half)));

        log::info!(
            "[SecureChannel] opening {} ({} / {:?})",
            params.endpoint_url,
            params.security_policy,
            mode
        );
        if let Err(e) = channel
            .request_token(SecurityTokenRequestType::Issue, params.request_timeout)
            .await
        {
            let err = open_failed(e);
            channel.shared.fault(err.clone());
            channel.abort_tasks();
            return Err(err);
        }
        channel
            .shared
            .transition(&[ChannelState::Opening], ChannelState::Open);
        let renewal = tokio::spawn(renewal_loop(Arc::downgrade(&channel)));
        channel.tasks.lock().push(renewal);
        log::info!(
            "[SecureChannel] channel {} open, token {}",
            channel.channel_id(),
            channel.token_id()
        );
        Ok(channel)
    }

    /// Send `request` and wait for its response until `timeout`.
    ///
    /// Assigns the request handle and timestamp. The returned response may
    /// be a ServiceFault; mapping it is up to the caller.
    pub async fn send_request(
        &self,
        mut request: RequestMessage,
        timeout: Duration,
    ) -> Result<ResponseMessage> {
        let message_type = match request {
            RequestMessage::OpenSecureChannel(_) => MessageType::OpenSecureChannel,
            RequestMessage::CloseSecureChannel(_) => MessageType::CloseSecureChannel,
            _ => MessageType::Message,
        };
        self.check_can_send(message_type)?;

        let handle = self.next_request_handle();
        {
            let header = request.header_mut();
            header.request_handle = handle;
            header.timestamp = DateTime::now();
            header.timeout_hint = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        }
        let pending = self
            .shared
            .pending
            .register(handle, request.name(), Instant::now() + timeout)?;
        log::debug!("[SecureChannel] -> {} handle {}", request.name(), pending.handle());
        self.write_message(message_type, handle, &request).await?;
        pending.wait().await
    }

    /// Send CloseSecureChannel and release the connection. Idempotent.
    ///
    /// Requests still pending fail with [`Error::Cancelled`].
    pub async fn close(&self) -> Result<()> {
        let closing = self.shared.transition(
            &[
                ChannelState::Opening,
                ChannelState::Open,
                ChannelState::Renewing,
            ],
            ChannelState::Closing,
        );
        if !closing {
            self.abort_tasks();
            return Ok(());
        }
        log::info!("[SecureChannel] closing channel {}", self.channel_id());

        let handle = self.next_request_handle();
        let request = RequestMessage::from(CloseSecureChannelRequest {
            request_header: RequestHeader {
                request_handle: handle,
                timestamp: DateTime::now(),
                ..RequestHeader::default()
            },
        });
        if let Err(e) = self
            .write_message(MessageType::CloseSecureChannel, handle, &request)
            .await
        {
            log::debug!("[SecureChannel] CloseSecureChannel not sent: {}", e);
        }
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.stream.shutdown().await {
                log::debug!("[SecureChannel] shutdown: {}", e);
            }
        }
        if !self.shared.pending.is_empty() {
            log::debug!(
                "[SecureChannel] cancelling {} pending requests",
                self.shared.pending.len()
            );
        }
        self.shared.pending.fail_all(Error::Cancelled);
        self.abort_tasks();
        self.shared.state.send_replace(ChannelState::Closed);
        Ok(())
    }

    pub fn state(&self) -> ChannelState {
        *self.shared.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe_state(&self) -> watch::Receiver<ChannelState> {
        self.shared.state.subscribe()
    }

    /// Error that faulted the channel, if any.
    pub fn fault_error(&self) -> Option<Error> {
        self.shared.fault.lock().clone()
    }

    pub fn security_policy(&self) -> SecurityPolicy {
        self.shared.policy
    }

    pub fn security_mode(&self) -> MessageSecurityMode {
        self.shared.mode
    }

    pub fn endpoint_url(&self) -> &str {
        &self.shared.endpoint_url
    }

    pub fn client_pki(&self) -> Option<&Arc<ClientPki>> {
        self.shared.client_pki.as_ref()
    }

    pub fn server_certificate(&self) -> Option<&Certificate> {
        self.shared.server_certificate.as_ref()
    }

    pub fn channel_id(&self) -> u32 {
        self.shared
            .tokens
            .load()
            .current
            .as_ref()
            .map_or(0, |t| t.channel_id)
    }

    pub fn token_id(&self) -> u32 {
        self.shared
            .tokens
            .load()
            .current
            .as_ref()
            .map_or(0, |t| t.token_id)
    }

    /// Negotiated connection limits.
    pub fn limits(&self) -> &ConnectionLimits {
        &self.shared.limits
    }

    pub fn decoding_options(&self) -> DecodingOptions {
        self.shared.decoding
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    /// Time since the last frame was sent or received.
    pub fn idle_for(&self) -> Duration {
        self.shared.last_activity.lock().elapsed()
    }

    /// Fault the channel from outside, e.g. when keep-alive gives up.
    pub fn fault(&self, err: Error) {
        self.shared.fault(err);
    }

    fn next_request_handle(&self) -> u32 {
        loop {
            let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
            if handle != 0 {
                return handle;
            }
        }
    }

    fn check_can_send(&self, message_type: MessageType) -> Result<()> {
        let state = self.state();
        if state.is_operational()
            || (state == ChannelState::Opening && message_type == MessageType::OpenSecureChannel)
        {
            return Ok(());
        }
        Err(self
            .fault_error()
            .unwrap_or(Error::ServiceFault(StatusCode::BadSecureChannelClosed)))
    }

    /// Encode, protect and write one message under the writer lock.
    async fn write_message(
        &self,
        message_type: MessageType,
        request_id: u32,
        request: &RequestMessage,
    ) -> Result<()> {
        let shared = &self.shared;
        let body = request.encode_to_vec();
        let mut writer = self.writer.lock().await;
        let tokens = shared.tokens.load_full();
        let ChannelWriter { stream, sequence } = &mut *writer;

        let chunks = if message_type == MessageType::OpenSecureChannel {
            let header = shared.asymmetric_header();
            let protection = if shared.policy.is_secured() {
                let (local, remote) = shared.asymmetric_keys()?;
                Protection::AsymmetricSend {
                    policy: shared.policy,
                    local,
                    remote,
                }
            } else {
                Protection::None
            };
            let message = OutboundMessage {
                message_type,
                channel_id: tokens.current.as_ref().map_or(0, |t| t.channel_id),
                security_header: &header,
                request_id,
                body: &body,
            };
            encode_chunks(&message, &shared.limits, protection, sequence)?
        } else {
            let token = tokens
                .current
                .as_ref()
                .ok_or_else(|| Error::Transport("secure channel has no token".into()))?;
            let header = SecurityHeader::Symmetric {
                token_id: token.token_id,
            };
            let message = OutboundMessage {
                message_type,
                channel_id: token.channel_id,
                security_header: &header,
                request_id,
                body: &body,
            };
            encode_chunks(
                &message,
                &shared.limits,
                shared.symmetric_protection(token, true)?,
                sequence,
            )?
        };

        for chunk in &chunks {
            if let Err(e) = stream.write_all(chunk).await {
                let err = Error::from(e);
                shared.fault(err.clone());
                return Err(err);
            }
        }
        if let Err(e) = stream.flush().await {
            let err = Error::from(e);
            shared.fault(err.clone());
            return Err(err);
        }
        shared.touch();
        Ok(())
    }

    /// Issue or renew the security token.
    async fn request_token(
        &self,
        request_type: SecurityTokenRequestType,
        timeout: Duration,
    ) -> Result<()> {
        let policy = self.shared.policy;
        let client_nonce = if policy.is_secured() {
            random_bytes(policy.nonce_length())?
        } else {
            Vec::new()
        };
        let request = OpenSecureChannelRequest {
            request_header: RequestHeader::default(),
            client_protocol_version: PROTOCOL_VERSION,
            request_type,
            security_mode: self.shared.mode,
            client_nonce: if policy.is_secured() {
                ByteString::from(client_nonce.as_slice())
            } else {
                ByteString::null()
            },
            requested_lifetime: u32::try_from(self.requested_lifetime.as_millis())
                .unwrap_or(u32::MAX),
        };
        let response: OpenSecureChannelResponse = self
            .send_request(request.into(), timeout)
            .await?
            .into_response()?;

        let keys = if policy.is_secured() {
            let server_nonce = response.server_nonce.as_bytes();
            if server_nonce.len() != policy.nonce_length() {
                return Err(Error::SecurityViolation(format!(
                    "server nonce has {} bytes, expected {}",
                    server_nonce.len(),
                    policy.nonce_length()
                )));
            }
            Some(ChannelKeys::derive(policy, &client_nonce, server_nonce))
        } else {
            None
        };
        let token = SecurityToken::new(&response.security_token, keys);
        log::info!(
            "[SecureChannel] {:?} token {} on channel {}, lifetime {:?}",
            request_type,
            token.token_id,
            token.channel_id,
            token.lifetime
        );
        let rotated = self.shared.tokens.load().rotate(token);
        self.shared.tokens.store(Arc::new(rotated));
        Ok(())
    }

    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for SecureChannel {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("endpoint_url", &self.shared.endpoint_url)
            .field("policy", &self.shared.policy)
            .field("mode", &self.shared.mode)
            .field("state", &self.state())
            .field("channel_id", &self.channel_id())
            .finish()
    }
}

fn open_failed(err: Error) -> Error {
    match err {
        Error::ChannelOpenFailed(_) => err,
        other => Error::ChannelOpenFailed(other.to_string()),
    }
}

async fn read_loop(shared: Arc<Shared>, mut reader: ReadHalf<Box<dyn Transport>>) {
    let mut assembler = ChunkAssembler::new(
        shared.limits.receive_max_message_size,
        shared.limits.receive_max_chunk_count,
    );
    loop {
        let result = match read_frame(&mut reader, shared.limits.receive_buffer_size).await {
            Ok(frame) => shared.handle_frame(frame, &mut assembler),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            shared.fault(e);
            return;
        }
    }
}

async fn renewal_loop(channel: Weak<SecureChannel>) {
    loop {
        let schedule = match channel.upgrade() {
            Some(strong) => {
                let tokens = strong.shared.tokens.load_full();
                tokens
                    .current
                    .as_ref()
                    .map(|t| (t.renew_at(), t.expires_at()))
            }
            None => return,
        };
        let Some((renew_at, expires_at)) = schedule else {
            return;
        };
        tokio::time::sleep_until(renew_at).await;

        let Some(strong) = channel.upgrade() else {
            return;
        };
        if !strong
            .shared
            .transition(&[ChannelState::Open], ChannelState::Renewing)
        {
            return;
        }
        let timeout = strong
            .request_timeout
            .min(expires_at.saturating_duration_since(Instant::now()));
        match strong
            .request_token(SecurityTokenRequestType::Renew, timeout)
            .await
        {
            Ok(()) => {
                strong
                    .shared
                    .transition(&[ChannelState::Renewing], ChannelState::Open);
            }
            Err(e) => {
                strong
                    .shared
                    .fault(Error::SecurityViolation(format!("token renewal failed: {}", e)));
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_channel::pki::test_fixtures;
    use crate::secure_channel::testing::{MockServer, ServerOptions};
    use crate::services::{ReadRequest, ReadResponse, ResponseHeader, ServiceFault};
    use crate::types::{DataValue, Variant};

    fn read_request() -> RequestMessage {
        ReadRequest::default().into()
    }

    fn reply_read(request: &RequestMessage) -> Option<ResponseMessage> {
        match request {
            RequestMessage::Read(read) => Some(
                ReadResponse {
                    response_header: ResponseHeader::new(
                        read.request_header.request_handle,
                        StatusCode::Good,
                    ),
                    results: vec![DataValue::new(Variant::Int32(42))],
                    diagnostic_infos: Vec::new(),
                }
                .into(),
            ),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_open_and_read_unsecured() {
        let (client, server) = MockServer::pair(ServerOptions::default(), reply_read);
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        assert_eq!(channel.state(), ChannelState::Open);
        assert_eq!(channel.channel_id(), server.channel_id());

        let response: ReadResponse = channel
            .send_request(read_request(), Duration::from_secs(1))
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.results[0].value, Some(Variant::Int32(42)));

        channel.close().await.unwrap();
        assert_eq!(channel.state(), ChannelState::Closed);
        assert!(server.received_close().await);
    }

    async fn secured_round_trip(policy: SecurityPolicy, mode: MessageSecurityMode) {
        let options = ServerOptions {
            policy,
            mode,
            ..ServerOptions::default()
        };
        let (client, _server) = MockServer::pair(options, reply_read);
        let mut params = ChannelParams::new("opc.tcp://mock:4840");
        params.security_policy = policy;
        params.security_mode = mode;
        params.client_pki = Some(Arc::new(test_fixtures::client_pki()));
        params.server_certificate = Some(test_fixtures::server_pki().certificate);

        let channel = SecureChannel::open(client, params).await.unwrap();
        let response: ReadResponse = channel
            .send_request(read_request(), Duration::from_secs(5))
            .await
            .unwrap()
            .into_response()
            .unwrap();
        assert_eq!(response.results.len(), 1);
        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_secured_basic256sha256_sign_and_encrypt() {
        secured_round_trip(
            SecurityPolicy::Basic256Sha256,
            MessageSecurityMode::SignAndEncrypt,
        )
        .await;
    }

    #[tokio::test]
    async fn test_secured_basic128rsa15_sign() {
        secured_round_trip(SecurityPolicy::Basic128Rsa15, MessageSecurityMode::Sign).await;
    }

    #[tokio::test]
    async fn test_secured_without_certificates_fails() {
        let (client, _server) = MockServer::pair(ServerOptions::default(), reply_read);
        let mut params = ChannelParams::new("opc.tcp://mock:4840");
        params.security_policy = SecurityPolicy::Basic256;
        params.security_mode = MessageSecurityMode::Sign;
        assert!(matches!(
            SecureChannel::open(client, params).await,
            Err(Error::ChannelOpenFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_open_is_channel_open_failed() {
        let options = ServerOptions {
            reject_open: Some(StatusCode::BadSecurityChecksFailed),
            ..ServerOptions::default()
        };
        let (client, _server) = MockServer::pair(options, reply_read);
        let result = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840")).await;
        assert!(matches!(result, Err(Error::ChannelOpenFailed(_))));
    }

    #[tokio::test]
    async fn test_service_fault_returned_to_caller_only() {
        let (client, _server) = MockServer::pair(ServerOptions::default(), |request| {
            Some(
                ServiceFault {
                    response_header: ResponseHeader::new(
                        request.header().request_handle,
                        StatusCode::BadNodeIdUnknown,
                    ),
                }
                .into(),
            )
        });
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let reply = channel
            .send_request(read_request(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            reply.into_response::<ReadResponse>(),
            Err(Error::ServiceFault(StatusCode::BadNodeIdUnknown))
        );
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_timeout_leaves_channel_open() {
        // Server never answers Read.
        let (client, _server) = MockServer::pair(ServerOptions::default(), |_| None);
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let result = channel
            .send_request(read_request(), Duration::from_millis(50))
            .await;
        assert!(matches!(result, Err(Error::RequestTimedOut { .. })));
        assert_eq!(channel.pending_count(), 0);
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_connection_loss_faults_pending_requests() {
        let (client, server) = MockServer::pair(ServerOptions::default(), |_| None);
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let mut state = channel.subscribe_state();
        let waiting = {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move {
                channel
                    .send_request(read_request(), Duration::from_secs(5))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        server.disconnect();

        let result = waiting.await.unwrap();
        assert!(matches!(result, Err(Error::Transport(_))));
        state
            .wait_for(|s| *s == ChannelState::Faulted)
            .await
            .unwrap();
        assert!(matches!(
            channel
                .send_request(read_request(), Duration::from_secs(1))
                .await,
            Err(Error::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_token_renewal() {
        let options = ServerOptions {
            revised_lifetime_ms: 200,
            ..ServerOptions::default()
        };
        let (client, server) = MockServer::pair(options, reply_read);
        let channel = SecureChannel::open(client, ChannelParams::new("opc.tcp://mock:4840"))
            .await
            .unwrap();
        let first = channel.token_id();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(channel.token_id() > first);
        assert!(server.open_count() >= 2);
        assert!(channel.state().is_operational());
        // Traffic still flows on the renewed token.
        channel
            .send_request(read_request(), Duration::from_secs(1))
            .await
            .unwrap();
    }
}
