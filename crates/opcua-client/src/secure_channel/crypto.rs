// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cryptographic primitives used by the security policies.
//!
//! - HMAC and P_hash key derivation via `ring`
//! - AES-CBC (no padding, the chunk layer pads) via `aes` + `cbc`
//! - RSA PKCS#1 v1.5 / OAEP encryption and PKCS#1 v1.5 signatures via `rsa`
//!
//! # Key Derivation Flow
//!
//! ```text
//! client nonce, server nonce
//!   v
//! P_hash(secret = server nonce, seed = client nonce) -> client signing key | encryption key | IV
//! P_hash(secret = client nonce, seed = server nonce) -> server signing key | encryption key | IV
//! ```

use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, Pkcs1v15Encrypt, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::policy::{HashAlgorithm, RsaPadding, SecurityPolicy, AES_BLOCK_SIZE};
use crate::error::{Error, Result};

fn violation(what: impl std::fmt::Display) -> Error {
    Error::SecurityViolation(what.to_string())
}

fn hmac_algorithm(hash: HashAlgorithm) -> hmac::Algorithm {
    match hash {
        HashAlgorithm::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
        HashAlgorithm::Sha256 => hmac::HMAC_SHA256,
    }
}

// ============================================================================
// Random
// ============================================================================

/// Cryptographically random bytes (nonces).
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| violation("system random generator failed"))?;
    Ok(buf)
}

// ============================================================================
// HMAC / P_hash
// ============================================================================

pub fn hmac_sign(hash: HashAlgorithm, key: &[u8], data: &[u8]) -> Vec<u8> {
    let key = hmac::Key::new(hmac_algorithm(hash), key);
    hmac::sign(&key, data).as_ref().to_vec()
}

/// Constant-time HMAC check.
pub fn hmac_verify(hash: HashAlgorithm, key: &[u8], data: &[u8], signature: &[u8]) -> Result<()> {
    let key = hmac::Key::new(hmac_algorithm(hash), key);
    hmac::verify(&key, data, signature).map_err(|_| violation("symmetric signature mismatch"))
}

/// P_hash from RFC 2246 section 5.
pub fn p_hash(hash: HashAlgorithm, secret: &[u8], seed: &[u8], length: usize) -> Zeroizing<Vec<u8>> {
    let key = hmac::Key::new(hmac_algorithm(hash), secret);
    let mut output = Zeroizing::new(Vec::with_capacity(length + hash.output_len()));
    // A(1) = HMAC(secret, seed)
    let mut a = hmac::sign(&key, seed);
    while output.len() < length {
        let mut ctx = hmac::Context::with_key(&key);
        ctx.update(a.as_ref());
        ctx.update(seed);
        output.extend_from_slice(ctx.sign().as_ref());
        a = hmac::sign(&key, a.as_ref());
    }
    output.truncate(length);
    output
}

/// Signing key, encryption key and IV for one direction of a channel.
pub struct SymmetricKeys {
    pub signing_key: Zeroizing<Vec<u8>>,
    pub encryption_key: Zeroizing<Vec<u8>>,
    pub iv: Zeroizing<Vec<u8>>,
}

impl SymmetricKeys {
    fn derive(policy: SecurityPolicy, secret: &[u8], seed: &[u8]) -> Self {
        let sig_len = policy.signing_key_length();
        let enc_len = policy.encryption_key_length();
        let material = p_hash(
            policy.symmetric_hash(),
            secret,
            seed,
            sig_len + enc_len + AES_BLOCK_SIZE,
        );
        Self {
            signing_key: Zeroizing::new(material[..sig_len].to_vec()),
            encryption_key: Zeroizing::new(material[sig_len..sig_len + enc_len].to_vec()),
            iv: Zeroizing::new(material[sig_len + enc_len..].to_vec()),
        }
    }
}

impl std::fmt::Debug for SymmetricKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKeys")
            .field("signing_key", &format_args!("[{} bytes]", self.signing_key.len()))
            .field("encryption_key", &format_args!("[{} bytes]", self.encryption_key.len()))
            .finish()
    }
}

/// Keys of both directions, derived from the nonce exchange.
#[derive(Debug)]
pub struct ChannelKeys {
    /// Outbound (client -> server).
    pub client: SymmetricKeys,
    /// Inbound (server -> client).
    pub server: SymmetricKeys,
}

impl ChannelKeys {
    pub fn derive(policy: SecurityPolicy, client_nonce: &[u8], server_nonce: &[u8]) -> Self {
        Self {
            client: SymmetricKeys::derive(policy, server_nonce, client_nonce),
            server: SymmetricKeys::derive(policy, client_nonce, server_nonce),
        }
    }
}

// ============================================================================
// AES-CBC
// ============================================================================

/// Encrypt `buf` in place. Its length must be a multiple of the block size.
pub fn aes_cbc_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    if buf.len() % AES_BLOCK_SIZE != 0 {
        return Err(violation(format!("plaintext length {} not block aligned", buf.len())));
    }
    let len = buf.len();
    match key.len() {
        16 => {
            cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(violation)?
                .encrypt_padded_mut::<NoPadding>(buf, len)
                .map_err(|_| violation("AES encryption failed"))?;
        }
        32 => {
            cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map_err(violation)?
                .encrypt_padded_mut::<NoPadding>(buf, len)
                .map_err(|_| violation("AES encryption failed"))?;
        }
        n => return Err(violation(format!("unsupported AES key length {}", n))),
    }
    Ok(())
}

/// Decrypt `buf` in place.
pub fn aes_cbc_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    if buf.len() % AES_BLOCK_SIZE != 0 {
        return Err(violation(format!("ciphertext length {} not block aligned", buf.len())));
    }
    match key.len() {
        16 => {
            cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
                .map_err(violation)?
                .decrypt_padded_mut::<NoPadding>(buf)
                .map_err(|_| violation("AES decryption failed"))?;
        }
        32 => {
            cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
                .map_err(violation)?
                .decrypt_padded_mut::<NoPadding>(buf)
                .map_err(|_| violation("AES decryption failed"))?;
        }
        n => return Err(violation(format!("unsupported AES key length {}", n))),
    }
    Ok(())
}

// ============================================================================
// RSA
// ============================================================================

pub fn rsa_sign(key: &RsaPrivateKey, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
    let signed = match hash {
        HashAlgorithm::Sha1 => key.sign(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data)),
        HashAlgorithm::Sha256 => key.sign(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data)),
    };
    signed.map_err(|e| violation(format!("RSA signing failed: {}", e)))
}

pub fn rsa_verify(
    key: &RsaPublicKey,
    hash: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> Result<()> {
    let verified = match hash {
        HashAlgorithm::Sha1 => {
            key.verify(Pkcs1v15Sign::new::<Sha1>(), &Sha1::digest(data), signature)
        }
        HashAlgorithm::Sha256 => {
            key.verify(Pkcs1v15Sign::new::<Sha256>(), &Sha256::digest(data), signature)
        }
    };
    verified.map_err(|_| violation("asymmetric signature mismatch"))
}

/// Plaintext bytes that fit in one RSA block.
pub fn rsa_plain_block_size(key: &RsaPublicKey, padding: RsaPadding) -> usize {
    key.size().saturating_sub(padding.overhead())
}

/// Encrypt `data` block by block; output length is a multiple of the key size.
pub fn rsa_encrypt(key: &RsaPublicKey, padding: RsaPadding, data: &[u8]) -> Result<Vec<u8>> {
    let plain_block = rsa_plain_block_size(key, padding);
    if plain_block == 0 {
        return Err(violation("RSA key too small for padding scheme"));
    }
    let mut rng = rand::thread_rng();
    let mut out = Vec::with_capacity(data.len().div_ceil(plain_block) * key.size());
    for block in data.chunks(plain_block) {
        let encrypted = match padding {
            RsaPadding::Pkcs1v15 => key.encrypt(&mut rng, Pkcs1v15Encrypt, block),
            RsaPadding::OaepSha1 => key.encrypt(&mut rng, Oaep::new::<Sha1>(), block),
        }
        .map_err(|e| violation(format!("RSA encryption failed: {}", e)))?;
        out.extend_from_slice(&encrypted);
    }
    Ok(out)
}

pub fn rsa_decrypt(key: &RsaPrivateKey, padding: RsaPadding, data: &[u8]) -> Result<Vec<u8>> {
    let block = key.size();
    if data.is_empty() || data.len() % block != 0 {
        return Err(violation(format!(
            "ciphertext length {} not a multiple of key size {}",
            data.len(),
            block
        )));
    }
    let mut out = Vec::with_capacity(data.len());
    for chunk in data.chunks(block) {
        let decrypted = match padding {
            RsaPadding::Pkcs1v15 => key.decrypt(Pkcs1v15Encrypt, chunk),
            RsaPadding::OaepSha1 => key.decrypt(Oaep::new::<Sha1>(), chunk),
        }
        .map_err(|_| violation("RSA decryption failed"))?;
        out.extend_from_slice(&decrypted);
    }
    Ok(out)
}

/// SHA-1 digest (certificate thumbprints).
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_channel::pki::PrivateKey;

    #[test]
    fn test_p_sha256_known_vector() {
        // Widely published TLS 1.2 PRF test vector (SHA-256), without the label.
        let secret = [
            0x9b, 0xbe, 0x43, 0x6b, 0xa9, 0x40, 0xf0, 0x17, 0xb1, 0x76, 0x52, 0x84, 0x9a, 0x71,
            0xdb, 0x35,
        ];
        let mut seed = b"test label".to_vec();
        seed.extend_from_slice(&[
            0xa0, 0xba, 0x9f, 0x93, 0x6c, 0xda, 0x31, 0x18, 0x27, 0xa6, 0xf7, 0x96, 0xff, 0xd5,
            0x19, 0x8c,
        ]);
        let out = p_hash(HashAlgorithm::Sha256, &secret, &seed, 16);
        assert_eq!(
            &out[..],
            &[
                0xe3, 0xf2, 0x29, 0xba, 0x72, 0x7b, 0xe1, 0x7b, 0x8d, 0x12, 0x26, 0x20, 0x55, 0x7c,
                0xd4, 0x53
            ]
        );
    }

    #[test]
    fn test_p_hash_prefix_stable() {
        let long = p_hash(HashAlgorithm::Sha1, b"secret", b"seed", 80);
        let short = p_hash(HashAlgorithm::Sha1, b"secret", b"seed", 33);
        assert_eq!(long.len(), 80);
        assert_eq!(&long[..33], &short[..]);
    }

    #[test]
    fn test_channel_keys_are_directional() {
        let client_nonce = [1u8; 32];
        let server_nonce = [2u8; 32];
        let keys = ChannelKeys::derive(SecurityPolicy::Basic256, &client_nonce, &server_nonce);
        assert_eq!(keys.client.signing_key.len(), 24);
        assert_eq!(keys.client.encryption_key.len(), 32);
        assert_eq!(keys.client.iv.len(), AES_BLOCK_SIZE);
        assert_ne!(keys.client.signing_key, keys.server.signing_key);

        // The server derives the same keys with the roles swapped.
        let mirrored = ChannelKeys::derive(SecurityPolicy::Basic256, &server_nonce, &client_nonce);
        assert_eq!(keys.client.encryption_key, mirrored.server.encryption_key);
    }

    #[test]
    fn test_hmac_verify_detects_tamper() {
        let sig = hmac_sign(HashAlgorithm::Sha256, b"key", b"payload");
        assert_eq!(sig.len(), 32);
        hmac_verify(HashAlgorithm::Sha256, b"key", b"payload", &sig).unwrap();
        assert!(hmac_verify(HashAlgorithm::Sha256, b"key", b"payloaD", &sig).is_err());
    }

    #[test]
    fn test_aes_cbc_round_trip() {
        for key_len in [16, 32] {
            let key = vec![7u8; key_len];
            let iv = [9u8; AES_BLOCK_SIZE];
            let plain: Vec<u8> = (0..64u8).collect();
            let mut buf = plain.clone();
            aes_cbc_encrypt(&key, &iv, &mut buf).unwrap();
            assert_ne!(buf, plain);
            aes_cbc_decrypt(&key, &iv, &mut buf).unwrap();
            assert_eq!(buf, plain);
        }
        assert!(aes_cbc_encrypt(&[0u8; 16], &[0u8; 16], &mut [0u8; 15]).is_err());
        assert!(aes_cbc_encrypt(&[0u8; 24], &[0u8; 16], &mut [0u8; 16]).is_err());
    }

    #[test]
    fn test_rsa_round_trip() {
        let key = PrivateKey::from_pem(include_str!("../../tests/fixtures/pki/client_key.pem"))
            .unwrap();
        let public = key.public_key();
        let data = vec![0x5au8; 500];
        for padding in [RsaPadding::Pkcs1v15, RsaPadding::OaepSha1] {
            let encrypted = rsa_encrypt(&public, padding, &data).unwrap();
            assert_eq!(encrypted.len() % 256, 0);
            assert_eq!(rsa_decrypt(key.rsa(), padding, &encrypted).unwrap(), data);
        }
        for hash in [HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
            let sig = rsa_sign(key.rsa(), hash, &data).unwrap();
            assert_eq!(sig.len(), 256);
            rsa_verify(&public, hash, &data, &sig).unwrap();
            assert!(rsa_verify(&public, hash, &data[1..], &sig).is_err());
        }
    }
}
