// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! User identity tokens for ActivateSession.
//!
//! The policy id comes from the server's endpoint description. A UserName
//! password is encrypted with the server's public key whenever the token
//! policy (or, if it names none, the channel policy) is secured:
//!
//! ```text
//! secret = u32 length (password + nonce) || password || server nonce
//! ```

use rsa::RsaPublicKey;

use crate::codec::BinaryWriter;
use crate::config::IdentityToken;
use crate::error::{Error, Result};
use crate::secure_channel::crypto::rsa_encrypt;
use crate::secure_channel::SecurityPolicy;
use crate::services::{
    AnonymousIdentityToken, EndpointDescription, UserNameIdentityToken, UserTokenPolicy,
};
use crate::types::{
    ids, ByteString, ExtensionObject, MessageSecurityMode, NodeId, UaString, UserTokenType,
};

const DEFAULT_ANONYMOUS_POLICY_ID: &str = "anonymous";
const DEFAULT_USER_NAME_POLICY_ID: &str = "username";

/// Server data the token depends on.
pub(crate) struct TokenContext<'a> {
    pub endpoints: &'a [EndpointDescription],
    pub channel_policy: SecurityPolicy,
    pub channel_mode: MessageSecurityMode,
    pub server_key: Option<&'a RsaPublicKey>,
    pub server_nonce: &'a [u8],
}

impl<'a> TokenContext<'a> {
    /// Token policy of the given type, preferring the endpoint we are connected to.
    fn find_policy(&self, token_type: UserTokenType) -> Option<&'a UserTokenPolicy> {
        let matching = |e: &&EndpointDescription| {
            e.security_policy_uri.as_str() == self.channel_policy.uri()
                && e.security_mode == self.channel_mode
        };
        let pick = |e: &'a EndpointDescription| e.find_token_policy(token_type);
        self.endpoints
            .iter()
            .filter(matching)
            .find_map(pick)
            .or_else(|| self.endpoints.iter().find_map(pick))
    }
}

/// Build the identity token extension object for `identity`.
pub(crate) fn identity_token(
    identity: &IdentityToken,
    context: &TokenContext<'_>,
) -> Result<ExtensionObject> {
    match identity {
        IdentityToken::Anonymous => {
            let policy_id = context
                .find_policy(UserTokenType::Anonymous)
                .map_or_else(
                    || UaString::from(DEFAULT_ANONYMOUS_POLICY_ID),
                    |p| p.policy_id.clone(),
                );
            Ok(ExtensionObject::from_encodable(
                NodeId::ns0(ids::encoding::ANONYMOUS_IDENTITY_TOKEN),
                &AnonymousIdentityToken { policy_id },
            ))
        }
        IdentityToken::UserName { username, password } => {
            let policy = context.find_policy(UserTokenType::UserName);
            if policy.is_none() && !context.endpoints.is_empty() {
                return Err(Error::Config(
                    "server offers no UserName token policy".into(),
                ));
            }
            let policy_id = policy.map_or_else(
                || UaString::from(DEFAULT_USER_NAME_POLICY_ID),
                |p| p.policy_id.clone(),
            );
            let security_policy = match policy {
                Some(p) if !p.security_policy_uri.is_empty() => {
                    SecurityPolicy::from_uri(p.security_policy_uri.as_str()).ok_or_else(|| {
                        Error::Config(format!(
                            "unsupported user token policy {}",
                            p.security_policy_uri
                        ))
                    })?
                }
                _ => context.channel_policy,
            };

            let (secret, encryption_algorithm) = if security_policy.is_secured() {
                let key = context.server_key.ok_or_else(|| {
                    Error::SecurityViolation(
                        "password encryption needs the server certificate".into(),
                    )
                })?;
                let padding = security_policy.asymmetric_padding();
                let secret = encrypt_secret(
                    key,
                    security_policy,
                    password.as_bytes(),
                    context.server_nonce,
                )?;
                (secret, UaString::from(padding.uri()))
            } else {
                (password.as_bytes().to_vec(), UaString::null())
            };
            log::debug!(
                "[Session] UserName token for {} (policy {}, {})",
                username,
                policy_id,
                security_policy
            );
            Ok(ExtensionObject::from_encodable(
                NodeId::ns0(ids::encoding::USER_NAME_IDENTITY_TOKEN),
                &UserNameIdentityToken {
                    policy_id,
                    user_name: UaString::from(username.as_str()),
                    password: ByteString::from(secret),
                    encryption_algorithm,
                },
            ))
        }
    }
}

fn encrypt_secret(
    key: &RsaPublicKey,
    policy: SecurityPolicy,
    password: &[u8],
    server_nonce: &[u8],
) -> Result<Vec<u8>> {
    let length = u32::try_from(password.len() + server_nonce.len())
        .map_err(|_| Error::Config("password too long".into()))?;
    let mut writer = BinaryWriter::with_capacity(4 + password.len() + server_nonce.len());
    writer.write_u32(length);
    writer.write_bytes(password);
    writer.write_bytes(server_nonce);
    rsa_encrypt(key, policy.asymmetric_padding(), &writer.into_inner())
}
