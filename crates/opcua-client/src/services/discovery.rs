// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! GetEndpoints and the descriptions it returns.

use super::{RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{
    ApplicationType, ByteString, LocalizedText, MessageSecurityMode, UaString, UserTokenType,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDescription {
    pub application_uri: UaString,
    pub product_uri: UaString,
    pub application_name: LocalizedText,
    pub application_type: ApplicationType,
    pub gateway_server_uri: UaString,
    pub discovery_profile_uri: UaString,
    pub discovery_urls: Vec<UaString>,
}

impl_binary_struct!(ApplicationDescription {
    application_uri,
    product_uri,
    application_name,
    application_type,
    gateway_server_uri,
    discovery_profile_uri,
    discovery_urls,
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTokenPolicy {
    pub policy_id: UaString,
    pub token_type: UserTokenType,
    pub issued_token_type: UaString,
    pub issuer_endpoint_url: UaString,
    /// Empty means the channel's policy applies.
    pub security_policy_uri: UaString,
}

impl_binary_struct!(UserTokenPolicy {
    policy_id,
    token_type,
    issued_token_type,
    issuer_endpoint_url,
    security_policy_uri,
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointDescription {
    pub endpoint_url: UaString,
    pub server: ApplicationDescription,
    pub server_certificate: ByteString,
    pub security_mode: MessageSecurityMode,
    pub security_policy_uri: UaString,
    pub user_identity_tokens: Vec<UserTokenPolicy>,
    pub transport_profile_uri: UaString,
    pub security_level: u8,
}

impl_binary_struct!(EndpointDescription {
    endpoint_url,
    server,
    server_certificate,
    security_mode,
    security_policy_uri,
    user_identity_tokens,
    transport_profile_uri,
    security_level,
});

impl EndpointDescription {
    /// First user token policy of the given type.
    pub fn find_token_policy(&self, token_type: UserTokenType) -> Option<&UserTokenPolicy> {
        self.user_identity_tokens
            .iter()
            .find(|policy| policy.token_type == token_type)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetEndpointsRequest {
    pub request_header: RequestHeader,
    pub endpoint_url: UaString,
    pub locale_ids: Vec<UaString>,
    pub profile_uris: Vec<UaString>,
}

impl_binary_struct!(GetEndpointsRequest {
    request_header,
    endpoint_url,
    locale_ids,
    profile_uris,
});

#[derive(Debug, Clone, PartialEq)]
pub struct GetEndpointsResponse {
    pub response_header: ResponseHeader,
    pub endpoints: Vec<EndpointDescription>,
}

impl_binary_struct!(GetEndpointsResponse {
    response_header,
    endpoints,
});
