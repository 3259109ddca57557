// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UA TCP message framing.
//!
//! Every message on the stream starts with an 8-byte header:
//!
//! ```text
//! +-----------------+-------------+------------------+
//! | Type (3B ASCII) | Chunk (1B)  | Size (u32 LE)    |
//! +-----------------+-------------+------------------+
//! ```
//!
//! `Size` counts the whole frame including the header. Type is one of
//! `HEL`, `ACK`, `ERR`, `RHE`, `OPN`, `CLO`, `MSG`; chunk is `F` (final),
//! `C` (intermediate) or `A` (abort).

use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::{impl_binary_struct, BinaryWriter, CodecError};
use crate::error::{Error, Result};
use crate::types::{StatusCode, UaString};

/// Frame header size.
pub const MESSAGE_HEADER_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    Acknowledge,
    Error,
    ReverseHello,
    OpenSecureChannel,
    CloseSecureChannel,
    Message,
}

impl MessageType {
    pub fn tag(self) -> &'static [u8; 3] {
        match self {
            Self::Hello => b"HEL",
            Self::Acknowledge => b"ACK",
            Self::Error => b"ERR",
            Self::ReverseHello => b"RHE",
            Self::OpenSecureChannel => b"OPN",
            Self::CloseSecureChannel => b"CLO",
            Self::Message => b"MSG",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"HEL" => Some(Self::Hello),
            b"ACK" => Some(Self::Acknowledge),
            b"ERR" => Some(Self::Error),
            b"RHE" => Some(Self::ReverseHello),
            b"OPN" => Some(Self::OpenSecureChannel),
            b"CLO" => Some(Self::CloseSecureChannel),
            b"MSG" => Some(Self::Message),
            _ => None,
        }
    }

    /// Types carried inside a secure channel (they have a channel id and sequence header).
    pub fn is_secure(self) -> bool {
        matches!(
            self,
            Self::OpenSecureChannel | Self::CloseSecureChannel | Self::Message
        )
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(std::str::from_utf8(self.tag()).unwrap_or("???"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkType {
    Final,
    Intermediate,
    Abort,
}

impl ChunkType {
    pub fn tag(self) -> u8 {
        match self {
            Self::Final => b'F',
            Self::Intermediate => b'C',
            Self::Abort => b'A',
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'F' => Some(Self::Final),
            b'C' => Some(Self::Intermediate),
            b'A' => Some(Self::Abort),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub chunk_type: ChunkType,
    /// Whole frame size including this header.
    pub message_size: u32,
}

impl MessageHeader {
    pub fn encode(&self, writer: &mut BinaryWriter) {
        writer.write_bytes(self.message_type.tag());
        writer.write_u8(self.chunk_type.tag());
        writer.write_u32(self.message_size);
    }

    pub fn decode(bytes: &[u8; MESSAGE_HEADER_SIZE]) -> Result<Self> {
        let message_type = MessageType::from_tag(&bytes[..3]).ok_or_else(|| {
            Error::Decoding(CodecError::InvalidData(format!(
                "unknown message type {:?}",
                String::from_utf8_lossy(&bytes[..3])
            )))
        })?;
        let chunk_type = ChunkType::from_tag(bytes[3]).ok_or(Error::Decoding(
            CodecError::UnknownEncoding {
                what: "chunk type",
                value: u32::from(bytes[3]),
            },
        ))?;
        let message_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if (message_size as usize) < MESSAGE_HEADER_SIZE {
            return Err(Error::Decoding(CodecError::InvalidData(format!(
                "frame size {} smaller than header",
                message_size
            ))));
        }
        Ok(Self {
            message_type,
            chunk_type,
            message_size,
        })
    }
}

/// One frame read from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: MessageHeader,
    /// Bytes following the header.
    pub body: Vec<u8>,
}

impl Frame {
    /// Full frame bytes (header + body).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(MESSAGE_HEADER_SIZE + self.body.len());
        self.header.encode(&mut writer);
        writer.write_bytes(&self.body);
        writer.into_inner()
    }
}

/// Build a frame around `body`.
pub fn encode_frame(message_type: MessageType, chunk_type: ChunkType, body: &[u8]) -> Vec<u8> {
    let header = MessageHeader {
        message_type,
        chunk_type,
        message_size: (MESSAGE_HEADER_SIZE + body.len()) as u32,
    };
    let mut writer = BinaryWriter::with_capacity(MESSAGE_HEADER_SIZE + body.len());
    header.encode(&mut writer);
    writer.write_bytes(body);
    writer.into_inner()
}

/// Read one frame. Frames above `max_size` bytes fail with `MessageTooLarge`
/// before the body is read.
pub async fn read_frame<R>(reader: &mut R, max_size: u32) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header_bytes = [0u8; MESSAGE_HEADER_SIZE];
    reader.read_exact(&mut header_bytes).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::Transport("connection closed by peer".into())
        } else {
            Error::from(e)
        }
    })?;
    let header = MessageHeader::decode(&header_bytes)?;
    if header.message_size > max_size {
        return Err(Error::MessageTooLarge {
            size: header.message_size as usize,
            limit: max_size as usize,
        });
    }
    let mut body = vec![0u8; header.message_size as usize - MESSAGE_HEADER_SIZE];
    reader.read_exact(&mut body).await?;
    Ok(Frame { header, body })
}

/// Write raw frame bytes and flush.
pub async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// HEL body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloMessage {
    pub protocol_version: u32,
    pub receive_buffer_size: u32,
    pub send_buffer_size: u32,
    pub max_message_size: u32,
    pub max_chunk_count: u32,
    pub endpoint_url: UaString,
}

impl_binary_struct!(HelloMessage {
    protocol_version,
    receive_buffer_size,
    send_buffer_size,
    max_message_size,
    max_chunk_count,
    endpoint_url,
});

/// ACK body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgeMessage {
    pub protocol_version: u32,
    pub receive_buffer_size: u32,
    pub send_buffer_size: u32,
    pub max_message_size: u32,
    pub max_chunk_count: u32,
}

impl_binary_struct!(AcknowledgeMessage {
    protocol_version,
    receive_buffer_size,
    send_buffer_size,
    max_message_size,
    max_chunk_count,
});

/// ERR body; the server closes the connection after sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    pub error: StatusCode,
    pub reason: UaString,
}

impl_binary_struct!(ErrorMessage { error, reason });
