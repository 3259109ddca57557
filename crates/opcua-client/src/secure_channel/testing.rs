// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process server end of a duplex pipe, for channel and session tests.
//!
//! Speaks HEL/ACK and OPN (all policies, using the fixture server key),
//! then hands each decoded request to a handler. A handler returning `None`
//! leaves the request unanswered.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::DuplexStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::chunk::{
    encode_chunks, split_plain, AsymmetricSecurityHeader, ChunkPrefix, OutboundMessage,
    SecurityHeader, SequenceCounter,
};
use super::crypto::{random_bytes, ChannelKeys};
use super::pki::{test_fixtures, Certificate};
use super::policy::SecurityPolicy;
use super::security::Protection;
use crate::codec::{BinaryDecode, BinaryEncode, CodecError, DecodingOptions};
use crate::config::{TransportLimits, DEFAULT_BUFFER_SIZE};
use crate::error::{Error, Result};
use crate::services::{
    ChannelSecurityToken, OpenSecureChannelResponse, RequestMessage, ResponseHeader,
    ResponseMessage, ServiceFault,
};
use crate::transport::frame::{
    encode_frame, read_frame, write_frame, AcknowledgeMessage, HelloMessage,
};
use crate::transport::{ChunkType, ConnectionLimits, MessageType};
use crate::types::{ByteString, DateTime, MessageSecurityMode, StatusCode, UaString};

const CHANNEL_ID: u32 = 7;

#[derive(Debug, Clone)]
pub(crate) struct ServerOptions {
    pub policy: SecurityPolicy,
    pub mode: MessageSecurityMode,
    pub revised_lifetime_ms: u32,
    /// Answer OPN with a ServiceFault carrying this code.
    pub reject_open: Option<StatusCode>,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            policy: SecurityPolicy::None,
            mode: MessageSecurityMode::None,
            revised_lifetime_ms: 60_000,
            reject_open: None,
        }
    }
}

type Handler = dyn Fn(&RequestMessage) -> Option<ResponseMessage> + Send + Sync;

struct ServerState {
    opens: AtomicUsize,
    closed: watch::Sender<bool>,
}

pub(crate) struct MockServer {
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Client stream plus the running server.
    pub fn pair<F>(options: ServerOptions, handler: F) -> (DuplexStream, MockServer)
    where
        F: Fn(&RequestMessage) -> Option<ResponseMessage> + Send + Sync + 'static,
    {
        let (client, server) = tokio::io::duplex(1 << 20);
        let state = Arc::new(ServerState {
            opens: AtomicUsize::new(0),
            closed: watch::channel(false).0,
        });
        let task = tokio::spawn(serve(server, options, Arc::new(handler), Arc::clone(&state)));
        (client, MockServer { state, task })
    }

    pub fn channel_id(&self) -> u32 {
        CHANNEL_ID
    }

    /// OpenSecureChannel requests seen so far (Issue and Renew).
    pub fn open_count(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    /// Wait up to a second for CloseSecureChannel.
    pub async fn received_close(&self) -> bool {
        let mut closed = self.state.closed.subscribe();
        let result = tokio::time::timeout(Duration::from_secs(1), closed.wait_for(|c| *c)).await;
        matches!(result, Ok(Ok(_)))
    }

    /// Drop the server end of the pipe.
    pub fn disconnect(&self) {
        self.task.abort();
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    stream: DuplexStream,
    options: ServerOptions,
    handler: Arc<Handler>,
    state: Arc<ServerState>,
) {
    let mut connection = Connection {
        stream,
        sequence: SequenceCounter::new(1),
        limits: ConnectionLimits::local(&TransportLimits::default()),
    };
    if let Err(e) = run(&mut connection, &options, &*handler, &state).await {
        log::debug!("[MockServer] stopped: {}", e);
    }
}

struct Connection {
    stream: DuplexStream,
    sequence: SequenceCounter,
    limits: ConnectionLimits,
}

impl Connection {
    async fn send(
        &mut self,
        message_type: MessageType,
        security_header: &SecurityHeader,
        request_id: u32,
        response: &ResponseMessage,
        protection: Protection<'_>,
    ) -> Result<()> {
        let body = response.encode_to_vec();
        let message = OutboundMessage {
            message_type,
            channel_id: CHANNEL_ID,
            security_header,
            request_id,
            body: &body,
        };
        for chunk in encode_chunks(&message, &self.limits, protection, &mut self.sequence)? {
            write_frame(&mut self.stream, &chunk).await?;
        }
        Ok(())
    }
}

fn symmetric<'a>(
    options: &ServerOptions,
    keys: Option<&'a ChannelKeys>,
    outbound: bool,
) -> Protection<'a> {
    match keys {
        Some(keys) if options.mode != MessageSecurityMode::None => Protection::Symmetric {
            policy: options.policy,
            keys: if outbound { &keys.server } else { &keys.client },
            encrypt: options.mode == MessageSecurityMode::SignAndEncrypt,
        },
        _ => Protection::None,
    }
}

fn invalid(message: &str) -> Error {
    Error::Decoding(CodecError::InvalidData(message.into()))
}

async fn run(
    connection: &mut Connection,
    options: &ServerOptions,
    handler: &Handler,
    state: &ServerState,
) -> Result<()> {
    let hello = read_frame(&mut connection.stream, 1 << 20).await?;
    if hello.header.message_type != MessageType::Hello {
        return Err(invalid("expected HEL"));
    }
    HelloMessage::decode_from_slice(&hello.body)?;
    let ack = AcknowledgeMessage {
        protocol_version: 0,
        receive_buffer_size: DEFAULT_BUFFER_SIZE,
        send_buffer_size: DEFAULT_BUFFER_SIZE,
        max_message_size: 0,
        max_chunk_count: 0,
    };
    let ack = encode_frame(MessageType::Acknowledge, ChunkType::Final, &ack.encode_to_vec());
    write_frame(&mut connection.stream, &ack).await?;

    let policy = options.policy;
    let secured = policy.is_secured();
    let server_pki = test_fixtures::server_pki();
    let decoding = DecodingOptions::default();
    let mut client_certificate: Option<Certificate> = None;
    let mut tokens: Vec<(u32, Option<ChannelKeys>)> = Vec::new();

    loop {
        let frame = read_frame(&mut connection.stream, 1 << 20).await?;
        let bytes = frame.to_bytes();
        let prefix = ChunkPrefix::parse(&bytes, &decoding)?;
        match &prefix.security_header {
            SecurityHeader::Asymmetric(header) => {
                let plain = if secured {
                    let certificate =
                        Certificate::from_der(header.sender_certificate.as_bytes().to_vec())?;
                    let plain = Protection::AsymmetricReceive {
                        policy,
                        local: &server_pki.private_key,
                        remote: certificate.public_key(),
                    }
                    .unprotect(&bytes, prefix.len)?;
                    client_certificate = Some(certificate);
                    plain
                } else {
                    Protection::None.unprotect(&bytes, prefix.len)?
                };
                let (sequence, body) = split_plain(&plain, prefix.len)?;
                let RequestMessage::OpenSecureChannel(request) =
                    RequestMessage::decode_from_slice(body)?
                else {
                    return Err(invalid("expected OpenSecureChannel"));
                };
                state.opens.fetch_add(1, Ordering::SeqCst);

                let handle = request.request_header.request_handle;
                let response: ResponseMessage = match options.reject_open {
                    Some(status) => ServiceFault {
                        response_header: ResponseHeader::new(handle, status),
                    }
                    .into(),
                    None => {
                        let token_id = tokens.len() as u32 + 1;
                        let (server_nonce, keys) = if secured {
                            let nonce = random_bytes(policy.nonce_length())?;
                            let keys =
                                ChannelKeys::derive(policy, request.client_nonce.as_bytes(), &nonce);
                            (ByteString::from(nonce), Some(keys))
                        } else {
                            (ByteString::null(), None)
                        };
                        tokens.push((token_id, keys));
                        OpenSecureChannelResponse {
                            response_header: ResponseHeader::new(handle, StatusCode::Good),
                            server_protocol_version: 0,
                            security_token: ChannelSecurityToken {
                                channel_id: CHANNEL_ID,
                                token_id,
                                created_at: DateTime::now(),
                                revised_lifetime: options.revised_lifetime_ms,
                            },
                            server_nonce,
                        }
                        .into()
                    }
                };

                let (header, protection) = match client_certificate.as_ref() {
                    Some(client) if secured => (
                        AsymmetricSecurityHeader {
                            security_policy_uri: UaString::from(policy.uri()),
                            sender_certificate: ByteString::from(server_pki.certificate.der()),
                            receiver_certificate_thumbprint: ByteString::from(
                                &client.thumbprint()[..],
                            ),
                        },
                        Protection::AsymmetricSend {
                            policy,
                            local: &server_pki.private_key,
                            remote: client.public_key(),
                        },
                    ),
                    _ => (
                        AsymmetricSecurityHeader {
                            security_policy_uri: UaString::from(policy.uri()),
                            ..AsymmetricSecurityHeader::default()
                        },
                        Protection::None,
                    ),
                };
                connection
                    .send(
                        MessageType::OpenSecureChannel,
                        &SecurityHeader::Asymmetric(header),
                        sequence.request_id,
                        &response,
                        protection,
                    )
                    .await?;
            }
            SecurityHeader::Symmetric { token_id } => {
                let keys = tokens
                    .iter()
                    .find(|(id, _)| id == token_id)
                    .map(|(_, keys)| keys.as_ref())
                    .ok_or_else(|| invalid("unknown token"))?;
                let plain = symmetric(options, keys, false).unprotect(&bytes, prefix.len)?;
                if prefix.header.message_type == MessageType::CloseSecureChannel {
                    state.closed.send_replace(true);
                    return Ok(());
                }
                let (sequence, body) = split_plain(&plain, prefix.len)?;
                let request = RequestMessage::decode_from_slice(body)?;
                if let Some(response) = handler(&request) {
                    connection
                        .send(
                            MessageType::Message,
                            &SecurityHeader::Symmetric {
                                token_id: *token_id,
                            },
                            sequence.request_id,
                            &response,
                            symmetric(options, keys, true),
                        )
                        .await?;
                }
            }
        }
    }
}
