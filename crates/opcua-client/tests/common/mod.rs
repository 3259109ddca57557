// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unsecured in-process OPC UA server for integration tests.
//!
//! Built only on the crate's public framing and chunking API. Each request
//! is handed to a handler that answers now, later or never.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opcua_client::codec::{BinaryDecode, BinaryEncode, DecodingOptions};
use opcua_client::config::DEFAULT_BUFFER_SIZE;
use opcua_client::secure_channel::chunk::{
    encode_chunks, split_plain, AsymmetricSecurityHeader, ChunkPrefix, OutboundMessage,
    SecurityHeader, SequenceCounter,
};
use opcua_client::secure_channel::security::Protection;
use opcua_client::secure_channel::SecurityPolicy;
use opcua_client::services::{
    ActivateSessionResponse, ChannelSecurityToken, CloseSessionResponse, CreateSessionResponse,
    OpenSecureChannelResponse, RequestMessage, ResponseHeader, ResponseMessage, ServiceFault,
    SignatureData,
};
use opcua_client::transport::frame::{
    encode_frame, read_frame, write_frame, AcknowledgeMessage, HelloMessage,
};
use opcua_client::transport::{ChunkType, ConnectionLimits, MessageType};
use opcua_client::types::{ByteString, DateTime, NodeId, StatusCode, UaString};
use opcua_client::ClientConfig;
use tokio::io::{DuplexStream, WriteHalf};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const ENDPOINT: &str = "opc.tcp://mock:4840";
const CHANNEL_ID: u32 = 21;

/// What the server does with one request.
pub enum Reply {
    Now(ResponseMessage),
    After(Duration, ResponseMessage),
    Never,
}

impl From<ResponseMessage> for Reply {
    fn from(response: ResponseMessage) -> Self {
        Reply::Now(response)
    }
}

pub struct ServerOptions {
    /// Largest chunk the server sends; small values force multi-chunk responses.
    pub send_buffer_size: u32,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            send_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Client configuration matching the mock: no keep-alive, short timeouts.
pub fn config() -> ClientConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    ClientConfig::new(ENDPOINT)
        .with_keep_alive(Duration::ZERO, 3)
        .with_request_timeout(Duration::from_secs(2))
}

pub fn ok_header(request: &RequestMessage) -> ResponseHeader {
    ResponseHeader::new(request.header().request_handle, StatusCode::Good)
}

pub fn fault(request: &RequestMessage, status: StatusCode) -> ResponseMessage {
    ServiceFault {
        response_header: ResponseHeader::new(request.header().request_handle, status),
    }
    .into()
}

/// Answers for the session services; `None` for anything else.
pub fn session_reply(request: &RequestMessage) -> Option<ResponseMessage> {
    let response: ResponseMessage = match request {
        RequestMessage::CreateSession(_) => CreateSessionResponse {
            response_header: ok_header(request),
            session_id: NodeId::numeric(1, 42),
            authentication_token: NodeId::opaque(0, vec![0x5A; 16]),
            revised_session_timeout: 30_000.0,
            server_nonce: ByteString::from(vec![3u8; 32]),
            server_certificate: ByteString::null(),
            server_endpoints: Vec::new(),
            server_software_certificates: Vec::new(),
            server_signature: SignatureData::default(),
            max_request_message_size: 0,
        }
        .into(),
        RequestMessage::ActivateSession(_) => ActivateSessionResponse {
            response_header: ok_header(request),
            server_nonce: ByteString::from(vec![4u8; 32]),
            results: Vec::new(),
            diagnostic_infos: Vec::new(),
        }
        .into(),
        RequestMessage::CloseSession(_) => CloseSessionResponse {
            response_header: ok_header(request),
        }
        .into(),
        _ => return None,
    };
    Some(response)
}

struct Writer {
    stream: WriteHalf<DuplexStream>,
    sequence: SequenceCounter,
    limits: ConnectionLimits,
}

impl Writer {
    async fn send(
        &mut self,
        message_type: MessageType,
        security_header: &SecurityHeader,
        request_id: u32,
        response: &ResponseMessage,
    ) -> opcua_client::Result<()> {
        let body = response.encode_to_vec();
        let message = OutboundMessage {
            message_type,
            channel_id: CHANNEL_ID,
            security_header,
            request_id,
            body: &body,
        };
        let chunks = encode_chunks(&message, &self.limits, Protection::None, &mut self.sequence)?;
        for chunk in chunks {
            write_frame(&mut self.stream, &chunk).await?;
        }
        Ok(())
    }
}

type Handler = dyn Fn(&RequestMessage) -> Reply + Send + Sync;

pub struct MockServer {
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Client end of a pipe plus the server serving the other end.
    pub fn start<F>(options: ServerOptions, handler: F) -> (DuplexStream, MockServer)
    where
        F: Fn(&RequestMessage) -> Reply + Send + Sync + 'static,
    {
        let (client, server) = tokio::io::duplex(1 << 20);
        let requests = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn(serve(
            server,
            options,
            Arc::new(handler),
            Arc::clone(&requests),
        ));
        (client, MockServer { requests, task })
    }

    /// Service requests received after the channel opened.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
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
    requests: Arc<AtomicUsize>,
) {
    if let Err(e) = run(stream, options, handler, requests).await {
        log::debug!("[MockServer] stopped: {}", e);
    }
}

async fn run(
    stream: DuplexStream,
    options: ServerOptions,
    handler: Arc<Handler>,
    requests: Arc<AtomicUsize>,
) -> opcua_client::Result<()> {
    let (mut reader, mut write_half) = tokio::io::split(stream);

    let hello = read_frame(&mut reader, 1 << 20).await?;
    let hello = HelloMessage::decode_from_slice(&hello.body)?;
    let ack = AcknowledgeMessage {
        protocol_version: 0,
        receive_buffer_size: DEFAULT_BUFFER_SIZE,
        send_buffer_size: options.send_buffer_size,
        max_message_size: 0,
        max_chunk_count: 0,
    };
    let ack = encode_frame(MessageType::Acknowledge, ChunkType::Final, &ack.encode_to_vec());
    write_frame(&mut write_half, &ack).await?;

    let writer = Arc::new(Mutex::new(Writer {
        stream: write_half,
        sequence: SequenceCounter::new(1),
        limits: ConnectionLimits {
            send_buffer_size: options.send_buffer_size.min(hello.receive_buffer_size),
            receive_buffer_size: DEFAULT_BUFFER_SIZE,
            send_max_message_size: hello.max_message_size,
            send_max_chunk_count: hello.max_chunk_count,
            receive_max_message_size: 0,
            receive_max_chunk_count: 0,
        },
    }));
    let decoding = DecodingOptions::default();

    loop {
        let frame = read_frame(&mut reader, 1 << 20).await?;
        let bytes = frame.to_bytes();
        let prefix = ChunkPrefix::parse(&bytes, &decoding)?;
        let plain = Protection::None.unprotect(&bytes, prefix.len)?;
        if prefix.header.message_type == MessageType::CloseSecureChannel {
            return Ok(());
        }
        let (sequence, body) = split_plain(&plain, prefix.len)?;
        let request = RequestMessage::decode_from_slice(body)?;

        if let RequestMessage::OpenSecureChannel(open) = &request {
            let response: ResponseMessage = OpenSecureChannelResponse {
                response_header: ResponseHeader::new(
                    open.request_header.request_handle,
                    StatusCode::Good,
                ),
                server_protocol_version: 0,
                security_token: ChannelSecurityToken {
                    channel_id: CHANNEL_ID,
                    token_id: 1,
                    created_at: DateTime::now(),
                    revised_lifetime: 600_000,
                },
                server_nonce: ByteString::null(),
            }
            .into();
            let header = SecurityHeader::Asymmetric(AsymmetricSecurityHeader {
                security_policy_uri: UaString::from(SecurityPolicy::None.uri()),
                ..AsymmetricSecurityHeader::default()
            });
            writer
                .lock()
                .await
                .send(
                    MessageType::OpenSecureChannel,
                    &header,
                    sequence.request_id,
                    &response,
                )
                .await?;
            continue;
        }

        requests.fetch_add(1, Ordering::SeqCst);
        let header = SecurityHeader::Symmetric { token_id: 1 };
        match handler(&request) {
            Reply::Now(response) => {
                writer
                    .lock()
                    .await
                    .send(MessageType::Message, &header, sequence.request_id, &response)
                    .await?;
            }
            Reply::After(delay, response) => {
                let writer = Arc::clone(&writer);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let result = writer
                        .lock()
                        .await
                        .send(MessageType::Message, &header, sequence.request_id, &response)
                        .await;
                    if let Err(e) = result {
                        log::debug!("[MockServer] delayed reply failed: {}", e);
                    }
                });
            }
            Reply::Never => {}
        }
    }
}
