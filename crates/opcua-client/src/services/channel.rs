// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! OpenSecureChannel / CloseSecureChannel.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{ByteString, DateTime, MessageSecurityMode, SecurityTokenRequestType};

/// Token issued by the server for one secure channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSecurityToken {
    pub channel_id: u32,
    pub token_id: u32,
    pub created_at: DateTime,
    /// Milliseconds.
    pub revised_lifetime: u32,
}

impl_binary_struct!(ChannelSecurityToken {
    channel_id,
    token_id,
    created_at,
    revised_lifetime,
});

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSecureChannelRequest {
    pub request_header: RequestHeader,
    pub client_protocol_version: u32,
    pub request_type: SecurityTokenRequestType,
    pub security_mode: MessageSecurityMode,
    pub client_nonce: ByteString,
    /// Milliseconds.
    pub requested_lifetime: u32,
}

impl_binary_struct!(OpenSecureChannelRequest {
    request_header,
    client_protocol_version,
    request_type,
    security_mode,
    client_nonce,
    requested_lifetime,
});

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSecureChannelResponse {
    pub response_header: ResponseHeader,
    pub server_protocol_version: u32,
    pub security_token: ChannelSecurityToken,
    pub server_nonce: ByteString,
}

impl_binary_struct!(OpenSecureChannelResponse {
    response_header,
    server_protocol_version,
    security_token,
    server_nonce,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CloseSecureChannelRequest {
    pub request_header: RequestHeader,
}

impl_binary_struct!(CloseSecureChannelRequest { request_header });

#[derive(Debug, Clone, PartialEq)]
pub struct CloseSecureChannelResponse {
    pub response_header: ResponseHeader,
}

impl_binary_struct!(CloseSecureChannelResponse { response_header });
