// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! HEL/ACK handshake and negotiated connection limits.

use std::time::Duration;

use super::frame::{
    encode_frame, read_frame, write_frame, AcknowledgeMessage, ChunkType, ErrorMessage,
    HelloMessage, MessageType, MESSAGE_HEADER_SIZE,
};
use super::Transport;
use crate::codec::{BinaryDecode, BinaryEncode};
use crate::config::{TransportLimits, MIN_BUFFER_SIZE, PROTOCOL_VERSION};
use crate::error::{Error, Result};
use crate::types::UaString;

/// Limits agreed with the server.
///
/// Zero in a message size or chunk count means "no limit".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionLimits {
    /// Largest chunk this side may send.
    pub send_buffer_size: u32,
    /// Largest chunk this side accepts.
    pub receive_buffer_size: u32,
    /// Largest message the server accepts.
    pub send_max_message_size: u32,
    pub send_max_chunk_count: u32,
    /// Largest message this side accepts.
    pub receive_max_message_size: u32,
    pub receive_max_chunk_count: u32,
}

impl ConnectionLimits {
    /// Limits before negotiation (used by tests and the fuzz targets).
    pub fn local(limits: &TransportLimits) -> Self {
        Self {
            send_buffer_size: limits.send_buffer_size,
            receive_buffer_size: limits.receive_buffer_size,
            send_max_message_size: limits.max_message_size,
            send_max_chunk_count: limits.max_chunk_count,
            receive_max_message_size: limits.max_message_size,
            receive_max_chunk_count: limits.max_chunk_count,
        }
    }

    /// Combine local limits with the server's ACK.
    pub fn negotiate(local: &TransportLimits, ack: &AcknowledgeMessage) -> Result<Self> {
        if ack.receive_buffer_size < MIN_BUFFER_SIZE || ack.send_buffer_size < MIN_BUFFER_SIZE {
            return Err(Error::ChannelOpenFailed(format!(
                "server buffer sizes {}/{} below minimum {}",
                ack.receive_buffer_size, ack.send_buffer_size, MIN_BUFFER_SIZE
            )));
        }
        Ok(Self {
            send_buffer_size: local.send_buffer_size.min(ack.receive_buffer_size),
            receive_buffer_size: local.receive_buffer_size.min(ack.send_buffer_size),
            send_max_message_size: min_nonzero(local.max_message_size, ack.max_message_size),
            send_max_chunk_count: min_nonzero(local.max_chunk_count, ack.max_chunk_count),
            receive_max_message_size: local.max_message_size,
            receive_max_chunk_count: local.max_chunk_count,
        })
    }
}

/// Minimum where 0 means unlimited.
fn min_nonzero(a: u32, b: u32) -> u32 {
    match (a, b) {
        (0, x) | (x, 0) => x,
        (a, b) => a.min(b),
    }
}

/// Send HEL and wait for ACK.
///
/// An ERR reply, a timeout or a malformed ACK fail with `ChannelOpenFailed`.
pub async fn handshake<S: Transport>(
    stream: &mut S,
    endpoint_url: &str,
    limits: &TransportLimits,
    timeout: Duration,
) -> Result<ConnectionLimits> {
    let hello = HelloMessage {
        protocol_version: PROTOCOL_VERSION,
        receive_buffer_size: limits.receive_buffer_size,
        send_buffer_size: limits.send_buffer_size,
        max_message_size: limits.max_message_size,
        max_chunk_count: limits.max_chunk_count,
        endpoint_url: UaString::from(endpoint_url),
    };
    let bytes = encode_frame(MessageType::Hello, ChunkType::Final, &hello.encode_to_vec());
    write_frame(stream, &bytes).await?;
    log::debug!("[Transport] HEL sent to {}", endpoint_url);

    let frame = tokio::time::timeout(timeout, read_frame(stream, limits.receive_buffer_size))
        .await
        .map_err(|_| Error::ChannelOpenFailed("no Acknowledge before timeout".into()))??;

    match frame.header.message_type {
        MessageType::Acknowledge => {
            let ack = AcknowledgeMessage::decode_from_slice(&frame.body)?;
            let negotiated = ConnectionLimits::negotiate(limits, &ack)?;
            log::debug!(
                "[Transport] ACK: send_buffer={} receive_buffer={} max_message={} max_chunks={}",
                negotiated.send_buffer_size,
                negotiated.receive_buffer_size,
                negotiated.send_max_message_size,
                negotiated.send_max_chunk_count
            );
            Ok(negotiated)
        }
        MessageType::Error => {
            let err = ErrorMessage::decode_from_slice(&frame.body)?;
            Err(Error::ChannelOpenFailed(format!(
                "server rejected Hello: {} {}",
                err.error,
                err.reason.as_str()
            )))
        }
        other => Err(Error::ChannelOpenFailed(format!(
            "expected ACK, got {} ({} bytes)",
            other,
            frame.body.len() + MESSAGE_HEADER_SIZE
        ))),
    }
}
