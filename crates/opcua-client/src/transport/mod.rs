// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! opc.tcp transport: byte streams, framing and the HEL/ACK handshake.
//!
//! The secure channel works over any [`Transport`]; production code uses a
//! TCP stream from [`connect`], tests plug in `tokio::io::duplex` pipes.

pub mod frame;
pub mod hello;
mod url;

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{Error, Result};

pub use frame::{ChunkType, Frame, MessageHeader, MessageType, MESSAGE_HEADER_SIZE};
pub use hello::ConnectionLimits;
pub use url::{EndpointUrl, DEFAULT_PORT};

/// Byte stream the secure channel runs over.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> Transport for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// Open a TCP connection to `url` with Nagle disabled.
pub async fn connect(url: &EndpointUrl, timeout: Duration) -> Result<TcpStream> {
    let address = url.socket_address();
    log::debug!("[Transport] connecting to {}", address);
    let stream = tokio::time::timeout(timeout, TcpStream::connect(&address))
        .await
        .map_err(|_| Error::Transport(format!("connect to {} timed out", address)))?
        .map_err(|e| Error::Transport(format!("connect to {} failed: {}", address, e)))?;
    stream.set_nodelay(true)?;
    log::info!("[Transport] connected to {}", address);
    Ok(stream)
}
