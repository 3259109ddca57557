// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-chunk signing, padding and encryption.
//!
//! # Chunk layout
//!
//! ```text
//! +--------+------------+-----------------+-----------------+------+---------+-----------+
//! | Header | Channel id | Security header | Sequence header | Body | Padding | Signature |
//! +--------+------------+-----------------+-----------------+------+---------+-----------+
//! |<------------- prefix ---------------->|<------------- encrypted -------------------->|
//! |<------------------------------- signed -------------------------------->|
//! ```
//!
//! Padding is one PaddingSize byte, PaddingSize bytes of that value, and an
//! ExtraPaddingSize byte (high byte of the size) when the encrypting RSA key
//! is larger than 2048 bits.

use rsa::RsaPublicKey;

use super::chunk::SEQUENCE_HEADER_SIZE;
use super::crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, hmac_sign, hmac_verify, rsa_decrypt, rsa_encrypt,
    rsa_plain_block_size, rsa_sign, rsa_verify, SymmetricKeys,
};
use super::pki::PrivateKey;
use super::policy::{SecurityPolicy, AES_BLOCK_SIZE};
use crate::error::{Error, Result};
use crate::transport::MESSAGE_HEADER_SIZE;

/// Key size above which the extra padding byte is present.
const EXTRA_PADDING_THRESHOLD: usize = 256;

/// Protection applied to one chunk.
#[derive(Clone, Copy)]
pub enum Protection<'a> {
    /// No signature, no encryption.
    None,
    /// MSG/CLO chunks. `encrypt` is false in Sign mode.
    Symmetric {
        policy: SecurityPolicy,
        keys: &'a SymmetricKeys,
        encrypt: bool,
    },
    /// Outbound OPN: signed with our key, encrypted for the peer.
    AsymmetricSend {
        policy: SecurityPolicy,
        local: &'a PrivateKey,
        remote: &'a RsaPublicKey,
    },
    /// Inbound OPN: decrypted with our key, signed by the peer.
    AsymmetricReceive {
        policy: SecurityPolicy,
        local: &'a PrivateKey,
        remote: &'a RsaPublicKey,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    signature_size: usize,
    encrypted: bool,
    plain_block: usize,
    cipher_block: usize,
    extra_padding: bool,
}

impl Layout {
    const CLEAR: Layout = Layout {
        signature_size: 0,
        encrypted: false,
        plain_block: 1,
        cipher_block: 1,
        extra_padding: false,
    };

    fn padding_overhead(&self) -> usize {
        if self.encrypted {
            1 + usize::from(self.extra_padding)
        } else {
            0
        }
    }
}

impl<'a> Protection<'a> {
    fn layout(&self) -> Layout {
        match *self {
            Self::None => Layout::CLEAR,
            Self::Symmetric {
                policy, encrypt, ..
            } => Layout {
                signature_size: policy.symmetric_signature_size(),
                encrypted: encrypt,
                plain_block: AES_BLOCK_SIZE,
                cipher_block: AES_BLOCK_SIZE,
                extra_padding: false,
            },
            Self::AsymmetricSend {
                policy,
                local,
                remote,
            } => {
                let cipher_block = rsa::traits::PublicKeyParts::size(remote);
                Layout {
                    signature_size: local.size(),
                    encrypted: true,
                    plain_block: rsa_plain_block_size(remote, policy.asymmetric_padding()),
                    cipher_block,
                    extra_padding: cipher_block > EXTRA_PADDING_THRESHOLD,
                }
            }
            Self::AsymmetricReceive {
                policy,
                local,
                remote,
            } => {
                let cipher_block = local.size();
                Layout {
                    signature_size: rsa::traits::PublicKeyParts::size(remote),
                    encrypted: true,
                    plain_block: cipher_block.saturating_sub(policy.asymmetric_padding().overhead()),
                    cipher_block,
                    extra_padding: cipher_block > EXTRA_PADDING_THRESHOLD,
                }
            }
        }
    }

    /// Largest body that fits in a chunk of `buffer_size` bytes.
    pub fn max_body_size(&self, prefix_len: usize, buffer_size: usize) -> usize {
        let layout = self.layout();
        let fixed = SEQUENCE_HEADER_SIZE + layout.signature_size + layout.padding_overhead();
        if layout.encrypted {
            let blocks = buffer_size.saturating_sub(prefix_len) / layout.cipher_block;
            (blocks * layout.plain_block).saturating_sub(fixed)
        } else {
            buffer_size.saturating_sub(prefix_len + fixed)
        }
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        match *self {
            Self::None => Ok(Vec::new()),
            Self::Symmetric { policy, keys, .. } => {
                Ok(hmac_sign(policy.symmetric_hash(), &keys.signing_key, data))
            }
            Self::AsymmetricSend { policy, local, .. } => {
                rsa_sign(local.rsa(), policy.asymmetric_hash(), data)
            }
            Self::AsymmetricReceive { .. } => Err(Error::SecurityViolation(
                "receive protection cannot sign".into(),
            )),
        }
    }

    fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        match *self {
            Self::None => Ok(()),
            Self::Symmetric { policy, keys, .. } => {
                hmac_verify(policy.symmetric_hash(), &keys.signing_key, data, signature)
            }
            Self::AsymmetricReceive { policy, remote, .. } => {
                rsa_verify(remote, policy.asymmetric_hash(), data, signature)
            }
            Self::AsymmetricSend { .. } => Err(Error::SecurityViolation(
                "send protection cannot verify".into(),
            )),
        }
    }

    fn encrypt(&self, data: &mut Vec<u8>) -> Result<()> {
        match *self {
            Self::Symmetric { keys, .. } => aes_cbc_encrypt(&keys.encryption_key, &keys.iv, data),
            Self::AsymmetricSend { policy, remote, .. } => {
                *data = rsa_encrypt(remote, policy.asymmetric_padding(), data)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn decrypt(&self, data: &mut Vec<u8>) -> Result<()> {
        match *self {
            Self::Symmetric { keys, .. } => aes_cbc_decrypt(&keys.encryption_key, &keys.iv, data),
            Self::AsymmetricReceive { policy, local, .. } => {
                *data = rsa_decrypt(local.rsa(), policy.asymmetric_padding(), data)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Secure a plaintext chunk (header, prefix, sequence header, body).
    ///
    /// Fills in the final message size, appends padding and signature, and
    /// encrypts everything after the prefix.
    pub fn protect(&self, mut chunk: Vec<u8>, prefix_len: usize) -> Result<Vec<u8>> {
        let layout = self.layout();
        let total = if layout.encrypted {
            let unpadded = chunk.len() - prefix_len + layout.signature_size + layout.padding_overhead();
            let padding = (layout.plain_block - unpadded % layout.plain_block) % layout.plain_block;
            let low = (padding & 0xFF) as u8;
            chunk.push(low);
            chunk.resize(chunk.len() + padding, low);
            if layout.extra_padding {
                chunk.push((padding >> 8) as u8);
            }
            let plain_len = unpadded + padding;
            prefix_len + plain_len / layout.plain_block * layout.cipher_block
        } else {
            chunk.len() + layout.signature_size
        };
        write_message_size(&mut chunk, total)?;

        let signature = self.sign(&chunk)?;
        chunk.extend_from_slice(&signature);

        if layout.encrypted {
            let mut encrypted = chunk.split_off(prefix_len);
            self.encrypt(&mut encrypted)?;
            chunk.extend_from_slice(&encrypted);
        }
        debug_assert_eq!(chunk.len(), total);
        Ok(chunk)
    }

    /// Verify and decrypt a received chunk.
    ///
    /// Returns the chunk without padding and signature: header, prefix,
    /// sequence header and body.
    pub fn unprotect(&self, chunk: &[u8], prefix_len: usize) -> Result<Vec<u8>> {
        let layout = self.layout();
        if chunk.len() < prefix_len {
            return Err(Error::SecurityViolation("chunk shorter than its prefix".into()));
        }
        let mut plain = chunk[..prefix_len].to_vec();
        let mut encrypted = chunk[prefix_len..].to_vec();
        if layout.encrypted {
            self.decrypt(&mut encrypted)?;
        }
        plain.extend_from_slice(&encrypted);

        let minimum = prefix_len + SEQUENCE_HEADER_SIZE + layout.signature_size + layout.padding_overhead();
        if plain.len() < minimum {
            return Err(Error::SecurityViolation(format!(
                "chunk of {} bytes too short for its security overhead",
                plain.len()
            )));
        }
        let signed_len = plain.len() - layout.signature_size;
        self.verify(&plain[..signed_len], &plain[signed_len..])?;
        plain.truncate(signed_len);

        if layout.encrypted {
            let extra = usize::from(layout.extra_padding);
            let end = plain.len();
            let low = plain[end - 1 - extra];
            let high = if layout.extra_padding { plain[end - 1] } else { 0 };
            let padding = usize::from(low) | usize::from(high) << 8;
            let section = 1 + padding + extra;
            if prefix_len + SEQUENCE_HEADER_SIZE + section > end {
                return Err(Error::SecurityViolation("invalid padding size".into()));
            }
            let start = end - section;
            if plain[start..end - extra].iter().any(|&b| b != low) {
                return Err(Error::SecurityViolation("invalid padding bytes".into()));
            }
            plain.truncate(start);
        }
        Ok(plain)
    }
}

fn write_message_size(chunk: &mut [u8], size: usize) -> Result<()> {
    let size = u32::try_from(size).map_err(|_| Error::MessageTooLarge {
        size,
        limit: u32::MAX as usize,
    })?;
    chunk
        .get_mut(4..MESSAGE_HEADER_SIZE)
        .ok_or_else(|| Error::SecurityViolation("chunk without message header".into()))?
        .copy_from_slice(&size.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_channel::crypto::ChannelKeys;
    use crate::secure_channel::pki::test_fixtures::{client_pki, server_pki};

    /// Header + 12-byte prefix + sequence header + body.
    fn plain_chunk(body: &[u8]) -> Vec<u8> {
        let mut chunk = b"MSGF\0\0\0\0".to_vec();
        chunk.extend_from_slice(&[0xAA; 8]);
        chunk.extend_from_slice(&[1, 0, 0, 0, 7, 0, 0, 0]);
        chunk.extend_from_slice(body);
        chunk
    }

    const PREFIX: usize = 16;

    #[test]
    fn test_none_only_sets_size() {
        let chunk = plain_chunk(b"hello");
        let out = Protection::None.protect(chunk.clone(), PREFIX).unwrap();
        assert_eq!(&out[4..8], &(chunk.len() as u32).to_le_bytes());
        assert_eq!(Protection::None.unprotect(&out, PREFIX).unwrap(), out);
    }

    #[test]
    fn test_symmetric_round_trip() {
        for policy in [
            SecurityPolicy::Basic128Rsa15,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
        ] {
            let keys = ChannelKeys::derive(policy, &[1; 32], &[2; 32]);
            for encrypt in [false, true] {
                for body_len in [0usize, 1, 15, 16, 17, 300] {
                    let body: Vec<u8> = (0..body_len).map(|i| i as u8).collect();
                    let chunk = plain_chunk(&body);
                    let protection = Protection::Symmetric {
                        policy,
                        keys: &keys.client,
                        encrypt,
                    };
                    let out = protection.protect(chunk.clone(), PREFIX).unwrap();
                    let size = u32::from_le_bytes([out[4], out[5], out[6], out[7]]);
                    assert_eq!(size as usize, out.len());
                    if encrypt {
                        assert_eq!((out.len() - PREFIX) % AES_BLOCK_SIZE, 0);
                    }
                    let mut back = protection.unprotect(&out, PREFIX).unwrap();
                    back[4..8].copy_from_slice(&[0; 4]);
                    assert_eq!(back, chunk, "{} encrypt={} len={}", policy, encrypt, body_len);
                }
            }
        }
    }

    #[test]
    fn test_symmetric_tamper_detected() {
        let keys = ChannelKeys::derive(SecurityPolicy::Basic256Sha256, &[3; 32], &[4; 32]);
        let protection = Protection::Symmetric {
            policy: SecurityPolicy::Basic256Sha256,
            keys: &keys.client,
            encrypt: true,
        };
        let out = protection.protect(plain_chunk(b"payload"), PREFIX).unwrap();
        for index in [2, PREFIX + 3, out.len() - 1] {
            let mut tampered = out.clone();
            tampered[index] ^= 0x01;
            assert!(matches!(
                protection.unprotect(&tampered, PREFIX),
                Err(Error::SecurityViolation(_))
            ));
        }
        // Keys of the other direction do not verify.
        let other = Protection::Symmetric {
            policy: SecurityPolicy::Basic256Sha256,
            keys: &keys.server,
            encrypt: true,
        };
        assert!(other.unprotect(&out, PREFIX).is_err());
    }

    #[test]
    fn test_asymmetric_round_trip() {
        let client = client_pki();
        let server = server_pki();
        let client_public = client.private_key.public_key();
        for policy in [SecurityPolicy::Basic128Rsa15, SecurityPolicy::Basic256Sha256] {
            let send = Protection::AsymmetricSend {
                policy,
                local: &client.private_key,
                remote: server.certificate.public_key(),
            };
            // The server's view of the same chunk.
            let receive = Protection::AsymmetricReceive {
                policy,
                local: &server.private_key,
                remote: &client_public,
            };
            let body = vec![0x42u8; 700];
            let chunk = plain_chunk(&body);
            let out = send.protect(chunk.clone(), PREFIX).unwrap();
            assert_eq!((out.len() - PREFIX) % 256, 0);
            let mut back = receive.unprotect(&out, PREFIX).unwrap();
            back[4..8].copy_from_slice(&[0; 4]);
            assert_eq!(back, chunk);

            let mut tampered = out.clone();
            tampered[10] ^= 0xFF;
            assert!(receive.unprotect(&tampered, PREFIX).is_err());
        }
    }

    #[test]
    fn test_max_body_fits_buffer() {
        let keys = ChannelKeys::derive(SecurityPolicy::Basic256, &[5; 32], &[6; 32]);
        let protection = Protection::Symmetric {
            policy: SecurityPolicy::Basic256,
            keys: &keys.client,
            encrypt: true,
        };
        let buffer = 8192;
        let max = protection.max_body_size(PREFIX, buffer);
        let out = protection.protect(plain_chunk(&vec![0u8; max]), PREFIX).unwrap();
        assert!(out.len() <= buffer);
        let out = protection.protect(plain_chunk(&vec![0u8; max + 1]), PREFIX).unwrap();
        assert!(out.len() > buffer);

        assert_eq!(Protection::None.max_body_size(PREFIX, buffer), buffer - PREFIX - 8);
    }
}
