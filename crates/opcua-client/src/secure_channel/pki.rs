// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Application instance certificates and private keys.
//!
//! Certificates are accepted as DER or PEM; private keys as PKCS#8 or
//! PKCS#1 (PEM or DER). Trust-list validation of the server certificate is
//! not performed.

use std::fmt;
use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use super::crypto::sha1;
use crate::error::{Error, Result};

fn looks_like_pem(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(b"-----BEGIN"))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// X.509 certificate with an RSA public key.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: RsaPublicKey,
    thumbprint: [u8; 20],
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(&der)
            .map_err(|e| Error::Config(format!("Invalid certificate: {}", e)))?;
        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| Error::Config(format!("Certificate key is not RSA: {}", e)))?;
        let thumbprint = sha1(&der);
        Ok(Self {
            der,
            public_key,
            thumbprint,
        })
    }

    pub fn from_pem(text: &str) -> Result<Self> {
        let block =
            pem::parse(text).map_err(|e| Error::Config(format!("Invalid PEM certificate: {}", e)))?;
        if block.tag() != "CERTIFICATE" {
            return Err(Error::Config(format!(
                "Expected CERTIFICATE PEM block, found {}",
                block.tag()
            )));
        }
        Self::from_der(block.contents().to_vec())
    }

    /// Load a DER or PEM file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = read_file(path.as_ref())?;
        if looks_like_pem(&bytes) {
            let text = String::from_utf8(bytes)
                .map_err(|_| Error::Config("PEM certificate is not UTF-8".into()))?;
            Self::from_pem(&text)
        } else {
            Self::from_der(bytes)
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// SHA-1 of the DER encoding.
    pub fn thumbprint(&self) -> &[u8; 20] {
        &self.thumbprint
    }

    /// Modulus length in bytes.
    pub fn key_size(&self) -> usize {
        self.public_key.size()
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex: String = self.thumbprint.iter().map(|b| format!("{:02x}", b)).collect();
        f.debug_struct("Certificate")
            .field("thumbprint", &hex)
            .field("key_bits", &(self.key_size() * 8))
            .finish()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

/// RSA private key. Zeroized on drop by the `rsa` crate.
#[derive(Clone)]
pub struct PrivateKey {
    key: RsaPrivateKey,
}

impl PrivateKey {
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_der(der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(der))
            .map_err(|e| Error::Config(format!("Invalid RSA private key: {}", e)))?;
        Ok(Self { key })
    }

    pub fn from_pem(text: &str) -> Result<Self> {
        let block =
            pem::parse(text).map_err(|e| Error::Config(format!("Invalid PEM key: {}", e)))?;
        match block.tag() {
            "PRIVATE KEY" | "RSA PRIVATE KEY" => Self::from_der(block.contents()),
            other => Err(Error::Config(format!("Unsupported key PEM block {}", other))),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = zeroize::Zeroizing::new(read_file(path.as_ref())?);
        if looks_like_pem(&bytes) {
            let text = std::str::from_utf8(&bytes)
                .map_err(|_| Error::Config("PEM key is not UTF-8".into()))?;
            Self::from_pem(text)
        } else {
            Self::from_der(&bytes)
        }
    }

    pub fn rsa(&self) -> &RsaPrivateKey {
        &self.key
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }

    /// Modulus length in bytes.
    pub fn size(&self) -> usize {
        self.key.size()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({} bits)", self.size() * 8)
    }
}

/// The client's own certificate and key.
#[derive(Debug, Clone)]
pub struct ClientPki {
    pub certificate: Certificate,
    pub private_key: PrivateKey,
}

impl ClientPki {
    pub fn new(certificate: Certificate, private_key: PrivateKey) -> Result<Self> {
        if certificate.public_key() != &private_key.public_key() {
            return Err(Error::Config(
                "client private key does not match the certificate".into(),
            ));
        }
        Ok(Self {
            certificate,
            private_key,
        })
    }

    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(certificate: P, private_key: Q) -> Result<Self> {
        Self::new(Certificate::load(certificate)?, PrivateKey::load(private_key)?)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thumbprint() {
        let pki = test_fixtures::client_pki();
        let hex: String = pki
            .certificate
            .thumbprint()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        assert_eq!(hex, "568d705e7a615ab80beb729868b6e8bc29b42080");
        assert_eq!(pki.certificate.key_size(), 256);
    }

    #[test]
    fn test_pem_and_der_agree() {
        let der = Certificate::from_der(
            include_bytes!("../../tests/fixtures/pki/client_cert.der").to_vec(),
        )
        .unwrap();
        let pem = Certificate::from_pem(include_str!("../../tests/fixtures/pki/client_cert.pem"))
            .unwrap();
        assert_eq!(der, pem);
    }

    #[test]
    fn test_pkcs1_key() {
        let key =
            PrivateKey::from_pem(include_str!("../../tests/fixtures/pki/client_key_pkcs1.pem"))
                .unwrap();
        assert_eq!(key.size(), 256);
    }

    #[test]
    fn test_mismatched_key_rejected() {
        let client = test_fixtures::client_pki();
        let server = test_fixtures::server_pki();
        assert!(matches!(
            ClientPki::new(client.certificate, server.private_key),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/pki");
        let pki = ClientPki::load(
            format!("{}/server_cert.der", dir),
            format!("{}/server_key.pem", dir),
        )
        .unwrap();
        assert_eq!(pki.certificate, test_fixtures::server_pki().certificate);
        assert!(Certificate::load(format!("{}/missing.der", dir)).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(Certificate::from_der(vec![0x30, 0x03, 0x01, 0x02, 0x03]).is_err());
        assert!(PrivateKey::from_der(&[1, 2, 3]).is_err());
        assert!(Certificate::from_pem("-----BEGIN FOO-----\nAAAA\n-----END FOO-----\n").is_err());
    }
}
