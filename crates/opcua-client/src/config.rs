// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client configuration and protocol constants.
//!
//! All defaults live here; other modules read them through [`ClientConfig`].
//!
//! # Example YAML
//!
//! ```yaml
//! endpoint_url: opc.tcp://plc.local:4840/
//! security_policy: Basic256Sha256
//! security_mode: SignAndEncrypt
//! client_certificate_path: pki/own/cert.der
//! client_private_key_path: pki/own/private.pem
//! identity:
//!   type: user_name
//!   username: operator
//!   password: secret
//! request_timeout_ms: 5000
//! limits:
//!   max_message_size: 4194304
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::codec::{
    DecodingOptions, DEFAULT_MAX_ARRAY_LENGTH, DEFAULT_MAX_BYTE_STRING_LENGTH,
    DEFAULT_MAX_RECURSION_DEPTH, DEFAULT_MAX_STRING_LENGTH,
};
use crate::error::{Error, Result};
use crate::secure_channel::SecurityPolicy;
use crate::transport::EndpointUrl;
use crate::types::MessageSecurityMode;

// =======================================================================
// Protocol constants (OPC UA Part 6)
// =======================================================================

/// UA TCP protocol version sent in Hello.
pub const PROTOCOL_VERSION: u32 = 0;

/// Smallest buffer size a peer may announce.
pub const MIN_BUFFER_SIZE: u32 = 8192;

/// Local receive/send buffer size (one chunk).
pub const DEFAULT_BUFFER_SIZE: u32 = 65_535;

/// Largest reassembled message accepted or sent (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Largest number of chunks per message.
pub const DEFAULT_MAX_CHUNK_COUNT: u32 = 4096;

// =======================================================================
// Client defaults
// =======================================================================

pub const DEFAULT_APPLICATION_NAME: &str = "OPC UA Rust Client";
pub const DEFAULT_APPLICATION_URI: &str = "urn:opcua-client:application";
pub const DEFAULT_PRODUCT_URI: &str = "urn:opcua-client";
pub const DEFAULT_SESSION_NAME: &str = "opcua-client session";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Requested secure channel token lifetime (1 hour).
pub const DEFAULT_CHANNEL_LIFETIME_MS: u32 = 3_600_000;

/// Token renewal starts at this fraction of the revised lifetime.
pub const TOKEN_RENEWAL_RATIO: f64 = 0.75;

pub const DEFAULT_KEEP_ALIVE_INTERVAL_MS: u64 = 5_000;

/// Session faults after `interval x grace` without any response.
pub const DEFAULT_KEEP_ALIVE_GRACE: u32 = 3;

pub const DEFAULT_PUBLISHING_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_LIFETIME_COUNT: u32 = 60;
pub const DEFAULT_MAX_KEEP_ALIVE_COUNT: u32 = 10;

/// PublishRequests kept outstanding while subscriptions exist.
pub const DEFAULT_MAX_INFLIGHT_PUBLISH: usize = 2;

/// Back-off after `BadTooManyPublishRequests`.
pub const PUBLISH_BACKOFF: Duration = Duration::from_millis(100);

/// Length of client nonces (session and channel).
pub const NONCE_LENGTH: usize = 32;

/// Identity presented in ActivateSession.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IdentityToken {
    #[default]
    Anonymous,
    UserName { username: String, password: String },
}

impl IdentityToken {
    pub fn user_name(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::UserName {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// Transport and decoding limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransportLimits {
    pub receive_buffer_size: u32,
    pub send_buffer_size: u32,
    /// 0 = no limit announced.
    pub max_message_size: u32,
    /// 0 = no limit announced.
    pub max_chunk_count: u32,
    pub max_string_length: usize,
    pub max_byte_string_length: usize,
    pub max_array_length: usize,
    pub max_recursion_depth: usize,
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            receive_buffer_size: DEFAULT_BUFFER_SIZE,
            send_buffer_size: DEFAULT_BUFFER_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunk_count: DEFAULT_MAX_CHUNK_COUNT,
            max_string_length: DEFAULT_MAX_STRING_LENGTH,
            max_byte_string_length: DEFAULT_MAX_BYTE_STRING_LENGTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
        }
    }
}

impl TransportLimits {
    pub fn decoding_options(&self) -> DecodingOptions {
        DecodingOptions {
            max_string_length: self.max_string_length,
            max_byte_string_length: self.max_byte_string_length,
            max_array_length: self.max_array_length,
            max_recursion_depth: self.max_recursion_depth,
        }
    }
}

/// Client configuration.
///
/// Every field has a default, so a YAML document only needs `endpoint_url`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    // === Endpoint ===
    /// `opc.tcp://host[:port][/path]`
    pub endpoint_url: String,
    pub security_policy: SecurityPolicy,
    pub security_mode: MessageSecurityMode,

    // === Application description ===
    pub application_name: String,
    pub application_uri: String,
    pub product_uri: String,
    pub session_name: String,

    // === Identity and PKI ===
    pub identity: IdentityToken,
    /// DER or PEM X.509 certificate of this client.
    pub client_certificate_path: Option<PathBuf>,
    /// PKCS#8 or PKCS#1 PEM/DER RSA private key.
    pub client_private_key_path: Option<PathBuf>,
    /// Server certificate; when absent it is discovered through GetEndpoints.
    pub server_certificate_path: Option<PathBuf>,

    // === Timing ===
    pub session_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub channel_lifetime_ms: u32,
    /// 0 disables the session keep-alive.
    pub keep_alive_interval_ms: u64,
    pub keep_alive_grace: u32,

    // === Subscriptions ===
    pub publishing_interval_ms: u64,
    pub max_inflight_publish: usize,

    // === Limits ===
    pub limits: TransportLimits,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            security_policy: SecurityPolicy::None,
            security_mode: MessageSecurityMode::None,
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            application_uri: DEFAULT_APPLICATION_URI.to_string(),
            product_uri: DEFAULT_PRODUCT_URI.to_string(),
            session_name: DEFAULT_SESSION_NAME.to_string(),
            identity: IdentityToken::Anonymous,
            client_certificate_path: None,
            client_private_key_path: None,
            server_certificate_path: None,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            channel_lifetime_ms: DEFAULT_CHANNEL_LIFETIME_MS,
            keep_alive_interval_ms: DEFAULT_KEEP_ALIVE_INTERVAL_MS,
            keep_alive_grace: DEFAULT_KEEP_ALIVE_GRACE,
            publishing_interval_ms: DEFAULT_PUBLISHING_INTERVAL_MS,
            max_inflight_publish: DEFAULT_MAX_INFLIGHT_PUBLISH,
            limits: TransportLimits::default(),
        }
    }
}

impl ClientConfig {
    /// Unsecured, anonymous configuration for `endpoint_url`.
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Default::default()
        }
    }

    /// Builder: set security policy and mode
    pub fn with_security(mut self, policy: SecurityPolicy, mode: MessageSecurityMode) -> Self {
        self.security_policy = policy;
        self.security_mode = mode;
        self
    }

    /// Builder: set client certificate and private key files
    pub fn with_client_pki(
        mut self,
        certificate: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        self.client_certificate_path = Some(certificate.into());
        self.client_private_key_path = Some(key.into());
        self
    }

    /// Builder: pin the server certificate instead of discovering it
    pub fn with_server_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.server_certificate_path = Some(path.into());
        self
    }

    /// Builder: set user identity
    pub fn with_identity(mut self, identity: IdentityToken) -> Self {
        self.identity = identity;
        self
    }

    /// Builder: set default request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = duration_ms(timeout);
        self
    }

    /// Builder: set keep-alive interval (zero disables)
    pub fn with_keep_alive(mut self, interval: Duration, grace: u32) -> Self {
        self.keep_alive_interval_ms = duration_ms(interval);
        self.keep_alive_grace = grace;
        self
    }

    /// Builder: set default publishing interval
    pub fn with_publishing_interval(mut self, interval: Duration) -> Self {
        self.publishing_interval_ms = duration_ms(interval);
        self
    }

    /// Builder: set session name
    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn keep_alive_interval(&self) -> Option<Duration> {
        (self.keep_alive_interval_ms > 0).then(|| Duration::from_millis(self.keep_alive_interval_ms))
    }

    pub fn publishing_interval(&self) -> Duration {
        Duration::from_millis(self.publishing_interval_ms)
    }

    pub fn decoding_options(&self) -> DecodingOptions {
        self.limits.decoding_options()
    }

    /// Parse and validate a YAML document.
    #[cfg(feature = "config-loaders")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    #[cfg(feature = "config-loaders")]
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Check consistency of the configuration.
    pub fn validate(&self) -> Result<()> {
        EndpointUrl::parse(&self.endpoint_url)?;

        let secured = self.security_policy != SecurityPolicy::None;
        match (secured, self.security_mode) {
            (_, MessageSecurityMode::Invalid) => {
                return Err(Error::Config("security_mode must not be Invalid".into()));
            }
            (false, MessageSecurityMode::None) | (true, MessageSecurityMode::Sign)
            | (true, MessageSecurityMode::SignAndEncrypt) => {}
            (false, mode) => {
                return Err(Error::Config(format!(
                    "security_mode {:?} requires a security policy other than None",
                    mode
                )));
            }
            (true, MessageSecurityMode::None) => {
                return Err(Error::Config(format!(
                    "security_policy {} requires security_mode Sign or SignAndEncrypt",
                    self.security_policy
                )));
            }
        }
        if secured
            && (self.client_certificate_path.is_none() || self.client_private_key_path.is_none())
        {
            return Err(Error::Config(
                "secured endpoints need client_certificate_path and client_private_key_path".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be positive".into()));
        }
        if self.keep_alive_interval_ms > 0 && self.keep_alive_grace == 0 {
            return Err(Error::Config("keep_alive_grace must be at least 1".into()));
        }
        if self.max_inflight_publish == 0 {
            return Err(Error::Config("max_inflight_publish must be at least 1".into()));
        }
        if self.limits.receive_buffer_size < MIN_BUFFER_SIZE
            || self.limits.send_buffer_size < MIN_BUFFER_SIZE
        {
            return Err(Error::Config(format!(
                "buffer sizes must be at least {} bytes",
                MIN_BUFFER_SIZE
            )));
        }
        if self.limits.max_message_size != 0
            && self.limits.max_message_size < self.limits.receive_buffer_size
        {
            return Err(Error::Config(
                "max_message_size must not be smaller than receive_buffer_size".into(),
            ));
        }
        Ok(())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Server-supplied milliseconds; NaN and negatives map to zero.
pub(crate) fn duration_from_ms(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value.min(1e12) / 1000.0)
    } else {
        Duration::ZERO
    }
}

pub(crate) fn ms_from_duration(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
