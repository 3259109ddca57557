// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message chunking and reassembly.
//!
//! Outbound messages are split into chunks that fit the peer's receive
//! buffer; every chunk carries its own sequence number and the request id of
//! the message. Inbound chunks are collected per request id until the final
//! (`F`) chunk arrives, or dropped when an abort (`A`) chunk arrives.

use std::collections::{HashMap, HashSet};

use super::security::Protection;
use crate::codec::{
    impl_binary_struct, BinaryDecode, BinaryEncode, BinaryReader, BinaryWriter, DecodingOptions,
};
use crate::error::{Error, Result};
use crate::transport::frame::ErrorMessage;
use crate::transport::{ChunkType, ConnectionLimits, MessageHeader, MessageType, MESSAGE_HEADER_SIZE};
use crate::types::{ByteString, StatusCode, UaString};

/// Sequence number + request id.
pub const SEQUENCE_HEADER_SIZE: usize = 8;

/// Sequence numbers wrap once they pass this value.
const SEQUENCE_WRAP_LIMIT: u32 = u32::MAX - 1024;

/// Values allowed right after a wrap.
const SEQUENCE_WRAP_RESTART: u32 = 1024;

/// Security header of OPN chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsymmetricSecurityHeader {
    pub security_policy_uri: UaString,
    pub sender_certificate: ByteString,
    pub receiver_certificate_thumbprint: ByteString,
}

impl_binary_struct!(AsymmetricSecurityHeader {
    security_policy_uri,
    sender_certificate,
    receiver_certificate_thumbprint,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityHeader {
    Asymmetric(AsymmetricSecurityHeader),
    Symmetric { token_id: u32 },
}

impl SecurityHeader {
    pub fn encode(&self, writer: &mut BinaryWriter) {
        match self {
            Self::Asymmetric(header) => header.encode(writer),
            Self::Symmetric { token_id } => writer.write_u32(*token_id),
        }
    }

    pub fn byte_len(&self) -> usize {
        match self {
            Self::Asymmetric(header) => header.byte_len(),
            Self::Symmetric { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceHeader {
    pub sequence_number: u32,
    pub request_id: u32,
}

impl_binary_struct!(SequenceHeader {
    sequence_number,
    request_id,
});

/// Outbound sequence numbers, shared by every message of a channel.
#[derive(Debug)]
pub struct SequenceCounter {
    next: u32,
}

impl SequenceCounter {
    pub fn new(start: u32) -> Self {
        Self { next: start }
    }

    pub fn next(&mut self) -> u32 {
        let current = self.next;
        self.next = if current >= SEQUENCE_WRAP_LIMIT {
            1
        } else {
            current + 1
        };
        current
    }
}

/// True when `next` may follow `previous`.
pub fn is_successor(previous: u32, next: u32) -> bool {
    next == previous.wrapping_add(1)
        || (previous >= SEQUENCE_WRAP_LIMIT && next < SEQUENCE_WRAP_RESTART)
}

/// Unencrypted part of a received chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPrefix {
    pub header: MessageHeader,
    pub channel_id: u32,
    pub security_header: SecurityHeader,
    /// Bytes up to the end of the security header.
    pub len: usize,
}

impl ChunkPrefix {
    pub fn parse(chunk: &[u8], options: &DecodingOptions) -> Result<Self> {
        let header_bytes: &[u8; MESSAGE_HEADER_SIZE] = chunk
            .get(..MESSAGE_HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::Decoding(crate::codec::CodecError::UnexpectedEof {
                offset: 0,
                needed: MESSAGE_HEADER_SIZE,
            }))?;
        let header = MessageHeader::decode(header_bytes)?;
        if !header.message_type.is_secure() {
            return Err(Error::Decoding(crate::codec::CodecError::InvalidData(format!(
                "{} is not a secure channel message",
                header.message_type
            ))));
        }
        let mut reader = BinaryReader::with_options(chunk, *options);
        reader.read_bytes(MESSAGE_HEADER_SIZE)?;
        let channel_id = reader.read_u32()?;
        let security_header = match header.message_type {
            MessageType::OpenSecureChannel => {
                SecurityHeader::Asymmetric(AsymmetricSecurityHeader::decode(&mut reader)?)
            }
            _ => SecurityHeader::Symmetric {
                token_id: reader.read_u32()?,
            },
        };
        Ok(Self {
            header,
            channel_id,
            security_header,
            len: reader.offset(),
        })
    }
}

/// Sequence header and body of a verified plaintext chunk.
pub fn split_plain(plain: &[u8], prefix_len: usize) -> Result<(SequenceHeader, &[u8])> {
    let rest = plain.get(prefix_len..).unwrap_or_default();
    let mut reader = BinaryReader::new(rest);
    let sequence = SequenceHeader::decode(&mut reader)?;
    Ok((sequence, reader.rest()))
}

/// A message ready to be chunked.
#[derive(Debug, Clone, Copy)]
pub struct OutboundMessage<'a> {
    pub message_type: MessageType,
    pub channel_id: u32,
    pub security_header: &'a SecurityHeader,
    pub request_id: u32,
    pub body: &'a [u8],
}

/// Split and secure a message. Nothing is consumed from `sequence` when
/// the message exceeds the peer's limits.
pub fn encode_chunks(
    message: &OutboundMessage<'_>,
    limits: &ConnectionLimits,
    protection: Protection<'_>,
    sequence: &mut SequenceCounter,
) -> Result<Vec<Vec<u8>>> {
    let body_len = message.body.len();
    let max_message = limits.send_max_message_size as usize;
    if max_message != 0 && body_len > max_message {
        return Err(Error::MessageTooLarge {
            size: body_len,
            limit: max_message,
        });
    }

    let prefix_len = MESSAGE_HEADER_SIZE + 4 + message.security_header.byte_len();
    let buffer_size = limits.send_buffer_size as usize;
    let max_body = protection.max_body_size(prefix_len, buffer_size);
    if max_body == 0 {
        return Err(Error::MessageTooLarge {
            size: prefix_len,
            limit: buffer_size,
        });
    }
    let chunk_count = body_len.div_ceil(max_body).max(1);
    let max_chunks = limits.send_max_chunk_count as usize;
    if max_chunks != 0 && chunk_count > max_chunks {
        return Err(Error::MessageTooLarge {
            size: body_len,
            limit: max_body * max_chunks,
        });
    }

    let mut chunks = Vec::with_capacity(chunk_count);
    for index in 0..chunk_count {
        let start = index * max_body;
        let end = (start + max_body).min(body_len);
        let piece = &message.body[start..end];
        let chunk_type = if index + 1 == chunk_count {
            ChunkType::Final
        } else {
            ChunkType::Intermediate
        };

        let mut writer = BinaryWriter::with_capacity(prefix_len + SEQUENCE_HEADER_SIZE + piece.len());
        MessageHeader {
            message_type: message.message_type,
            chunk_type,
            message_size: 0,
        }
        .encode(&mut writer);
        writer.write_u32(message.channel_id);
        message.security_header.encode(&mut writer);
        SequenceHeader {
            sequence_number: sequence.next(),
            request_id: message.request_id,
        }
        .encode(&mut writer);
        writer.write_bytes(piece);

        chunks.push(protection.protect(writer.into_inner(), prefix_len)?);
    }
    Ok(chunks)
}

/// Outcome of feeding one chunk to the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// More chunks expected for this request.
    Incomplete,
    Complete { request_id: u32, body: Vec<u8> },
    /// Peer aborted the message.
    Aborted {
        request_id: u32,
        status: StatusCode,
        reason: String,
    },
    /// Limits exceeded; the rest of this message is discarded.
    TooLarge {
        request_id: u32,
        size: usize,
        limit: usize,
    },
}

#[derive(Debug, Default)]
struct Partial {
    body: Vec<u8>,
    chunks: usize,
}

/// Reassembles inbound chunks by request id.
#[derive(Debug)]
pub struct ChunkAssembler {
    partial: HashMap<u32, Partial>,
    discarded: HashSet<u32>,
    max_message_size: usize,
    max_chunk_count: usize,
    last_sequence: Option<u32>,
}

impl ChunkAssembler {
    /// Zero limits mean unlimited.
    pub fn new(max_message_size: u32, max_chunk_count: u32) -> Self {
        Self {
            partial: HashMap::new(),
            discarded: HashSet::new(),
            max_message_size: max_message_size as usize,
            max_chunk_count: max_chunk_count as usize,
            last_sequence: None,
        }
    }

    /// Messages currently being reassembled.
    pub fn in_progress(&self) -> usize {
        self.partial.len()
    }

    fn check_sequence(&mut self, sequence_number: u32) -> Result<()> {
        if let Some(previous) = self.last_sequence {
            if !is_successor(previous, sequence_number) {
                return Err(Error::SecurityViolation(format!(
                    "sequence number {} does not follow {}",
                    sequence_number, previous
                )));
            }
        }
        self.last_sequence = Some(sequence_number);
        Ok(())
    }

    pub fn push(
        &mut self,
        chunk_type: ChunkType,
        sequence: SequenceHeader,
        body: &[u8],
    ) -> Result<Assembled> {
        self.check_sequence(sequence.sequence_number)?;
        let request_id = sequence.request_id;

        if self.discarded.contains(&request_id) {
            if chunk_type != ChunkType::Intermediate {
                self.discarded.remove(&request_id);
            }
            return Ok(Assembled::Incomplete);
        }

        if chunk_type == ChunkType::Abort {
            self.partial.remove(&request_id);
            let abort = ErrorMessage::decode_from_slice(body)?;
            return Ok(Assembled::Aborted {
                request_id,
                status: abort.error,
                reason: abort.reason.as_str().to_string(),
            });
        }

        let partial = self.partial.entry(request_id).or_default();
        partial.chunks += 1;
        let size = partial.body.len() + body.len();
        let too_large = if self.max_message_size != 0 && size > self.max_message_size {
            Some((size, self.max_message_size))
        } else if self.max_chunk_count != 0 && partial.chunks > self.max_chunk_count {
            Some((partial.chunks, self.max_chunk_count))
        } else {
            None
        };
        if let Some((size, limit)) = too_large {
            self.partial.remove(&request_id);
            if chunk_type == ChunkType::Intermediate {
                self.discarded.insert(request_id);
            }
            return Ok(Assembled::TooLarge {
                request_id,
                size,
                limit,
            });
        }

        partial.body.extend_from_slice(body);
        if chunk_type == ChunkType::Final {
            let done = self.partial.remove(&request_id).unwrap_or_default();
            Ok(Assembled::Complete {
                request_id,
                body: done.body,
            })
        } else {
            Ok(Assembled::Incomplete)
        }
    }
}
