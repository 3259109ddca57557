// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CreateSession / ActivateSession / CloseSession and identity tokens.

use super::{ApplicationDescription, EndpointDescription, RequestHeader, ResponseHeader};
use crate::codec::impl_binary_struct;
use crate::types::{ByteString, DiagnosticInfo, ExtensionObject, NodeId, StatusCode, UaString};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureData {
    pub algorithm: UaString,
    pub signature: ByteString,
}

impl_binary_struct!(SignatureData {
    algorithm,
    signature,
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedSoftwareCertificate {
    pub certificate_data: ByteString,
    pub signature: ByteString,
}

impl_binary_struct!(SignedSoftwareCertificate {
    certificate_data,
    signature,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionRequest {
    pub request_header: RequestHeader,
    pub client_description: ApplicationDescription,
    pub server_uri: UaString,
    pub endpoint_url: UaString,
    pub session_name: UaString,
    pub client_nonce: ByteString,
    pub client_certificate: ByteString,
    /// Milliseconds.
    pub requested_session_timeout: f64,
    pub max_response_message_size: u32,
}

impl_binary_struct!(CreateSessionRequest {
    request_header,
    client_description,
    server_uri,
    endpoint_url,
    session_name,
    client_nonce,
    client_certificate,
    requested_session_timeout,
    max_response_message_size,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CreateSessionResponse {
    pub response_header: ResponseHeader,
    pub session_id: NodeId,
    pub authentication_token: NodeId,
    pub revised_session_timeout: f64,
    pub server_nonce: ByteString,
    pub server_certificate: ByteString,
    pub server_endpoints: Vec<EndpointDescription>,
    pub server_software_certificates: Vec<SignedSoftwareCertificate>,
    pub server_signature: SignatureData,
    pub max_request_message_size: u32,
}

impl_binary_struct!(CreateSessionResponse {
    response_header,
    session_id,
    authentication_token,
    revised_session_timeout,
    server_nonce,
    server_certificate,
    server_endpoints,
    server_software_certificates,
    server_signature,
    max_request_message_size,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSessionRequest {
    pub request_header: RequestHeader,
    pub client_signature: SignatureData,
    pub client_software_certificates: Vec<SignedSoftwareCertificate>,
    pub locale_ids: Vec<UaString>,
    pub user_identity_token: ExtensionObject,
    pub user_token_signature: SignatureData,
}

impl_binary_struct!(ActivateSessionRequest {
    request_header,
    client_signature,
    client_software_certificates,
    locale_ids,
    user_identity_token,
    user_token_signature,
});

#[derive(Debug, Clone, PartialEq)]
pub struct ActivateSessionResponse {
    pub response_header: ResponseHeader,
    pub server_nonce: ByteString,
    pub results: Vec<StatusCode>,
    pub diagnostic_infos: Vec<DiagnosticInfo>,
}

impl_binary_struct!(ActivateSessionResponse {
    response_header,
    server_nonce,
    results,
    diagnostic_infos,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CloseSessionRequest {
    pub request_header: RequestHeader,
    pub delete_subscriptions: bool,
}

impl_binary_struct!(CloseSessionRequest {
    request_header,
    delete_subscriptions,
});

#[derive(Debug, Clone, PartialEq)]
pub struct CloseSessionResponse {
    pub response_header: ResponseHeader,
}

impl_binary_struct!(CloseSessionResponse { response_header });

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnonymousIdentityToken {
    pub policy_id: UaString,
}

impl_binary_struct!(AnonymousIdentityToken { policy_id });

/// `password` holds either the UTF-8 password or the encrypted secret
/// named by `encryption_algorithm`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserNameIdentityToken {
    pub policy_id: UaString,
    pub user_name: UaString,
    pub password: ByteString,
    pub encryption_algorithm: UaString,
}

impl_binary_struct!(UserNameIdentityToken {
    policy_id,
    user_name,
    password,
    encryption_algorithm,
});
