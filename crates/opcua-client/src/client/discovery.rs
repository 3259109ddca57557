// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint discovery over a short-lived unsecured channel.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::secure_channel::{Certificate, ChannelParams, SecureChannel, SecurityPolicy};
use crate::services::{
    EndpointDescription, GetEndpointsRequest, GetEndpointsResponse, RequestHeader,
};
use crate::types::{MessageSecurityMode, UaString};

/// GetEndpoints on an already open channel. No session is needed.
pub async fn get_endpoints_on(
    channel: &SecureChannel,
    endpoint_url: &str,
    timeout: Duration,
) -> Result<Vec<EndpointDescription>> {
    let request = GetEndpointsRequest {
        request_header: RequestHeader::default(),
        endpoint_url: UaString::from(endpoint_url),
        locale_ids: Vec::new(),
        profile_uris: Vec::new(),
    };
    let response: GetEndpointsResponse = channel
        .send_request(request.into(), timeout)
        .await?
        .into_response()?;
    log::debug!(
        "[Discovery] {} offers {} endpoints",
        endpoint_url,
        response.endpoints.len()
    );
    Ok(response.endpoints)
}

/// Open an unsecured channel to the configured endpoint, ask for its
/// endpoints, then close the channel.
pub async fn get_endpoints(config: &ClientConfig) -> Result<Vec<EndpointDescription>> {
    let params = ChannelParams::from_config(config).unsecured();
    let channel: Arc<SecureChannel> = SecureChannel::connect(params).await?;
    let result = get_endpoints_on(&channel, &config.endpoint_url, config.request_timeout()).await;
    if let Err(e) = channel.close().await {
        log::debug!("[Discovery] closing discovery channel failed: {}", e);
    }
    result
}

/// Server certificate of the endpoint matching `policy` and `mode`.
pub fn server_certificate(
    endpoints: &[EndpointDescription],
    policy: SecurityPolicy,
    mode: MessageSecurityMode,
) -> Result<Certificate> {
    let endpoint = endpoints
        .iter()
        .filter(|e| e.security_policy_uri.as_str() == policy.uri())
        .max_by_key(|e| (e.security_mode == mode, e.security_level))
        .ok_or_else(|| {
            Error::Config(format!("server offers no endpoint for {} / {:?}", policy, mode))
        })?;
    if endpoint.server_certificate.is_empty() {
        return Err(Error::SecurityViolation(
            "endpoint carries no server certificate".into(),
        ));
    }
    Certificate::from_der(endpoint.server_certificate.as_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_channel::pki::test_fixtures;
    use crate::services::ApplicationDescription;
    use crate::types::ByteString;

    fn endpoint(
        policy: SecurityPolicy,
        mode: MessageSecurityMode,
        level: u8,
    ) -> EndpointDescription {
        EndpointDescription {
            endpoint_url: UaString::from("opc.tcp://mock:4840"),
            server: ApplicationDescription::default(),
            server_certificate: ByteString::from(test_fixtures::server_pki().certificate.der()),
            security_mode: mode,
            security_policy_uri: UaString::from(policy.uri()),
            user_identity_tokens: Vec::new(),
            transport_profile_uri: UaString::null(),
            security_level: level,
        }
    }

    #[test]
    fn test_certificate_from_matching_endpoint() {
        let endpoints = vec![
            endpoint(SecurityPolicy::None, MessageSecurityMode::None, 0),
            endpoint(SecurityPolicy::Basic256Sha256, MessageSecurityMode::Sign, 5),
            endpoint(SecurityPolicy::Basic256Sha256, MessageSecurityMode::SignAndEncrypt, 3),
        ];
        let certificate = server_certificate(
            &endpoints,
            SecurityPolicy::Basic256Sha256,
            MessageSecurityMode::SignAndEncrypt,
        )
        .unwrap();
        assert_eq!(certificate, test_fixtures::server_pki().certificate);
    }

    #[test]
    fn test_missing_policy_is_config_error() {
        let endpoints = vec![endpoint(SecurityPolicy::None, MessageSecurityMode::None, 0)];
        assert!(matches!(
            server_certificate(
                &endpoints,
                SecurityPolicy::Basic256Sha256,
                MessageSecurityMode::Sign
            ),
            Err(Error::Config(_))
        ));
    }
}
