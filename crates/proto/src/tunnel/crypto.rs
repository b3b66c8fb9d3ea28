//! Cryptographic primitives for the envelope codec
//!
//! All envelope protection goes through a single AEAD seal/open pair:
//! confidentiality and integrity in one primitive, with the envelope header
//! (SPI and sequence number) bound in as associated data.
//!
//! # Nonce construction
//!
//! Nonces are never random. Each SA derives a secret 4-byte salt from its
//! authentication key at provisioning time; the per-packet nonce is
//!
//! ```text
//! | salt (4) | sequence number as u64, big-endian (8) |
//! ```
//!
//! Sequence numbers never repeat within an SA's lifetime (the counter fails
//! closed at its maximum), so nonce uniqueness holds by construction and the
//! whole run stays reproducible.

use crate::tunnel::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes128Gcm, Aes256Gcm, Nonce as AesGcmNonce,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// AEAD nonce length in bytes (salt + sequence)
pub const NONCE_LEN: usize = 12;

/// Length of the per-SA secret nonce salt
pub const SALT_LEN: usize = 4;

/// Authentication tag length in bytes
pub const TAG_LEN: usize = 16;

/// AEAD cipher used to protect envelope payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    /// AES-GCM with 128-bit key
    AesGcm128,
    /// AES-GCM with 256-bit key
    AesGcm256,
    /// ChaCha20-Poly1305
    ChaCha20Poly1305,
}

impl CipherAlgorithm {
    /// Get key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            CipherAlgorithm::AesGcm128 => 16,
            CipherAlgorithm::AesGcm256 => 32,
            CipherAlgorithm::ChaCha20Poly1305 => 32,
        }
    }

    /// Get authentication tag length in bytes
    pub fn tag_len(self) -> usize {
        TAG_LEN
    }

    /// Encrypt and authenticate `plaintext`
    ///
    /// # Arguments
    ///
    /// * `key` - SA encryption key
    /// * `nonce` - 12-byte deterministic nonce (see module docs)
    /// * `plaintext` - Data to protect
    /// * `aad` - Associated data (envelope SPI and sequence number)
    ///
    /// # Returns
    ///
    /// Returns ciphertext with the 16-byte authentication tag appended
    pub fn seal(self, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.check_lengths(key, nonce)?;

        let payload = Payload {
            msg: plaintext,
            aad,
        };

        match self {
            CipherAlgorithm::AesGcm128 => {
                let cipher = Aes128Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create AES-GCM cipher".into()))?;
                cipher
                    .encrypt(AesGcmNonce::from_slice(nonce), payload)
                    .map_err(|_| Error::Internal("AES-GCM encryption failed".into()))
            }
            CipherAlgorithm::AesGcm256 => {
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create AES-GCM cipher".into()))?;
                cipher
                    .encrypt(AesGcmNonce::from_slice(nonce), payload)
                    .map_err(|_| Error::Internal("AES-GCM encryption failed".into()))
            }
            CipherAlgorithm::ChaCha20Poly1305 => {
                let cipher = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create ChaCha20 cipher".into()))?;
                cipher
                    .encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                    .map_err(|_| Error::Internal("ChaCha20-Poly1305 encryption failed".into()))
            }
        }
    }

    /// Verify and decrypt `ciphertext` (which carries its trailing tag)
    ///
    /// # Arguments
    ///
    /// * `key` - SA encryption key
    /// * `nonce` - 12-byte deterministic nonce
    /// * `ciphertext` - Ciphertext with trailing authentication tag
    /// * `aad` - Associated data (envelope SPI and sequence number)
    ///
    /// # Errors
    ///
    /// Fails with `IntegrityCheckFailed` if the tag does not verify; the
    /// caller never sees partially-decrypted data.
    pub fn open(self, key: &[u8], nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        self.check_lengths(key, nonce)?;

        if ciphertext.len() < self.tag_len() {
            return Err(Error::BufferTooShort {
                required: self.tag_len(),
                available: ciphertext.len(),
            });
        }

        let payload = Payload {
            msg: ciphertext,
            aad,
        };

        // The aead crate reports any tag/AAD mismatch as one opaque failure,
        // which is exactly the granularity the drop policy wants.
        match self {
            CipherAlgorithm::AesGcm128 => {
                let cipher = Aes128Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create AES-GCM cipher".into()))?;
                cipher
                    .decrypt(AesGcmNonce::from_slice(nonce), payload)
                    .map_err(|_| Error::IntegrityCheckFailed(0))
            }
            CipherAlgorithm::AesGcm256 => {
                let cipher = Aes256Gcm::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create AES-GCM cipher".into()))?;
                cipher
                    .decrypt(AesGcmNonce::from_slice(nonce), payload)
                    .map_err(|_| Error::IntegrityCheckFailed(0))
            }
            CipherAlgorithm::ChaCha20Poly1305 => {
                let cipher = chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
                    .map_err(|_| Error::Internal("Failed to create ChaCha20 cipher".into()))?;
                cipher
                    .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                    .map_err(|_| Error::IntegrityCheckFailed(0))
            }
        }
    }

    fn check_lengths(self, key: &[u8], nonce: &[u8]) -> Result<()> {
        if key.len() != self.key_len() {
            return Err(Error::InvalidKeyLength {
                expected: self.key_len(),
                actual: key.len(),
            });
        }
        if nonce.len() != NONCE_LEN {
            return Err(Error::InvalidParameter(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce.len()
            )));
        }
        Ok(())
    }
}

/// Compute HMAC-SHA256 over `data`
pub fn prf(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Expand key material with prf+ (chained HMAC blocks, RFC 7296 style)
///
/// ```text
/// prf+ (K,S) = T1 | T2 | T3 | ...
/// T1 = prf (K, S | 0x01)
/// T2 = prf (K, T1 | S | 0x02)
/// ...
/// ```
pub fn prf_plus(key: &[u8], seed: &[u8], output_len: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(output_len);
    let mut t = Vec::new();
    let mut counter: u8 = 1;

    while output.len() < output_len {
        let mut input = Vec::new();
        input.extend_from_slice(&t);
        input.extend_from_slice(seed);
        input.push(counter);

        t = prf(key, &input);
        output.extend_from_slice(&t);

        counter += 1;
    }

    output.truncate(output_len);
    output
}

/// Derive the per-SA nonce salt from the authentication key
///
/// The salt is secret keyed material: a passive observer who knows the SPI
/// and sequence number of every envelope still cannot reconstruct nonces.
pub fn derive_nonce_salt(authentication_key: &[u8], spi: u32) -> [u8; SALT_LEN] {
    let mut seed = Vec::with_capacity(10 + 4);
    seed.extend_from_slice(b"nonce-salt");
    seed.extend_from_slice(&spi.to_be_bytes());

    let digest = prf(authentication_key, &seed);
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&digest[..SALT_LEN]);
    salt
}

/// Build the 12-byte AEAD nonce for one envelope
pub fn build_nonce(salt: &[u8; SALT_LEN], sequence: u32) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..SALT_LEN].copy_from_slice(salt);
    nonce[SALT_LEN..].copy_from_slice(&u64::from(sequence).to_be_bytes());
    nonce
}

/// Derive an SA key pair from one out-of-band pre-shared secret
///
/// Both gateways of a tunnel can be provisioned from the same secret: the
/// SPI and direction-independent labels keep the encryption and
/// authentication keys distinct.
///
/// # Arguments
///
/// * `secret` - Pre-shared secret for the gateway pair
/// * `spi` - SPI of the association being provisioned
/// * `cipher` - Cipher the association will use (fixes the key length)
///
/// # Returns
///
/// Tuple of (encryption_key, authentication_key); the authentication key is
/// always 32 bytes (one HMAC-SHA256 block).
pub fn derive_sa_keys(secret: &[u8], spi: u32, cipher: CipherAlgorithm) -> (Vec<u8>, Vec<u8>) {
    let mut seed = Vec::new();
    seed.extend_from_slice(b"espgate-sa");
    seed.extend_from_slice(&spi.to_be_bytes());

    let auth_key_len = 32;
    let keymat = prf_plus(secret, &seed, cipher.key_len() + auth_key_len);

    let encryption_key = keymat[..cipher.key_len()].to_vec();
    let authentication_key = keymat[cipher.key_len()..].to_vec();
    (encryption_key, authentication_key)
}
