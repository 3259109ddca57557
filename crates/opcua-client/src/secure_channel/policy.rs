// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Security policies and their algorithm suites.
//!
//! | Policy          | Symmetric sig | Keys (sig/enc) | Asym encryption | Asym sig   | KDF     |
//! |-----------------|---------------|----------------|-----------------|------------|---------|
//! | Basic128Rsa15   | HMAC-SHA1     | 16 / 16        | RSA PKCS#1 v1.5 | RSA-SHA1   | P_SHA1  |
//! | Basic256        | HMAC-SHA1     | 24 / 32        | RSA-OAEP (SHA1) | RSA-SHA1   | P_SHA1  |
//! | Basic256Sha256  | HMAC-SHA256   | 32 / 32        | RSA-OAEP (SHA1) | RSA-SHA256 | P_SHA256|

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

const URI_PREFIX: &str = "http://opcfoundation.org/UA/SecurityPolicy#";

/// AES block size, also the IV length.
pub const AES_BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum SecurityPolicy {
    #[default]
    None,
    Basic128Rsa15,
    Basic256,
    Basic256Sha256,
}

/// Hash used by HMAC, P_hash and RSA signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl HashAlgorithm {
    pub fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

/// RSA encryption padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsaPadding {
    Pkcs1v15,
    OaepSha1,
}

impl RsaPadding {
    /// Bytes of each RSA block consumed by the padding scheme.
    pub fn overhead(self) -> usize {
        match self {
            Self::Pkcs1v15 => 11,
            // 2 * SHA1 length + 2
            Self::OaepSha1 => 42,
        }
    }

    /// XML encryption URI carried in UserNameIdentityToken.
    pub fn uri(self) -> &'static str {
        match self {
            Self::Pkcs1v15 => "http://www.w3.org/2001/04/xmlenc#rsa-1_5",
            Self::OaepSha1 => "http://www.w3.org/2001/04/xmlenc#rsa-oaep",
        }
    }
}

impl SecurityPolicy {
    pub const ALL: [SecurityPolicy; 4] = [
        Self::None,
        Self::Basic128Rsa15,
        Self::Basic256,
        Self::Basic256Sha256,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic128Rsa15 => "Basic128Rsa15",
            Self::Basic256 => "Basic256",
            Self::Basic256Sha256 => "Basic256Sha256",
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.uri() == uri)
    }

    pub fn is_secured(self) -> bool {
        self != Self::None
    }

    /// HMAC / P_hash digest.
    pub fn symmetric_hash(self) -> HashAlgorithm {
        match self {
            Self::Basic256Sha256 => HashAlgorithm::Sha256,
            _ => HashAlgorithm::Sha1,
        }
    }

    /// RSA signature digest.
    pub fn asymmetric_hash(self) -> HashAlgorithm {
        self.symmetric_hash()
    }

    pub fn symmetric_signature_size(self) -> usize {
        match self {
            Self::None => 0,
            _ => self.symmetric_hash().output_len(),
        }
    }

    pub fn signing_key_length(self) -> usize {
        match self {
            Self::None => 0,
            Self::Basic128Rsa15 => 16,
            Self::Basic256 => 24,
            Self::Basic256Sha256 => 32,
        }
    }

    pub fn encryption_key_length(self) -> usize {
        match self {
            Self::None => 0,
            Self::Basic128Rsa15 => 16,
            Self::Basic256 | Self::Basic256Sha256 => 32,
        }
    }

    /// Length of client and server nonces.
    pub fn nonce_length(self) -> usize {
        match self {
            Self::None => 0,
            Self::Basic128Rsa15 => 16,
            Self::Basic256 | Self::Basic256Sha256 => 32,
        }
    }

    pub fn asymmetric_padding(self) -> RsaPadding {
        match self {
            Self::Basic128Rsa15 => RsaPadding::Pkcs1v15,
            _ => RsaPadding::OaepSha1,
        }
    }

    /// XML signature URI used in SignatureData.
    pub fn asymmetric_signature_uri(self) -> &'static str {
        match self.asymmetric_hash() {
            HashAlgorithm::Sha1 => "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
            HashAlgorithm::Sha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
        }
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for SecurityPolicy {
    type Err = Error;

    /// Accepts the short name (`Basic256Sha256`) or the full URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(URI_PREFIX).unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|p| p.short_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Config(format!("unknown security policy '{}'", s)))
    }
}

impl TryFrom<String> for SecurityPolicy {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
