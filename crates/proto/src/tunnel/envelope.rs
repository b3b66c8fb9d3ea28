//! Envelope wire format
//!
//! Every protected packet crossing the transit network is an envelope:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |               Security Parameters Index (SPI)                 |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                      Sequence Number                          |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                    Ciphertext (variable)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                 Integrity Tag (16 bytes)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! All integer fields are big-endian. The SPI and sequence number travel in
//! the clear so the receiver can select the SA and run the replay check
//! before decrypting, but both are covered by the integrity tag as
//! associated data, so a forged header fails authentication.

use crate::tunnel::crypto::TAG_LEN;
use crate::tunnel::{Error, Result};

/// Envelope header length in bytes (SPI + sequence number)
pub const ENVELOPE_HEADER_LEN: usize = 8;

/// Minimum length of a parseable envelope (header plus bare tag)
pub const ENVELOPE_MIN_LEN: usize = ENVELOPE_HEADER_LEN + TAG_LEN;

/// A protected packet as it appears on the transit network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Security Parameters Index selecting the receiver's SA
    pub spi: u32,
    /// Anti-replay sequence number
    pub sequence_number: u32,
    /// AEAD output: ciphertext with the 16-byte integrity tag appended
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    /// Create a new envelope
    pub fn new(spi: u32, sequence_number: u32, ciphertext: Vec<u8>) -> Self {
        Envelope {
            spi,
            sequence_number,
            ciphertext,
        }
    }

    /// Associated data bound into the integrity tag: the header fields
    pub fn aad(spi: u32, sequence_number: u32) -> [u8; ENVELOPE_HEADER_LEN] {
        let mut aad = [0u8; ENVELOPE_HEADER_LEN];
        aad[..4].copy_from_slice(&spi.to_be_bytes());
        aad[4..].copy_from_slice(&sequence_number.to_be_bytes());
        aad
    }

    /// Serialize to wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(ENVELOPE_HEADER_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.spi.to_be_bytes());
        bytes.extend_from_slice(&self.sequence_number.to_be_bytes());
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Parse from wire format
    ///
    /// # Errors
    ///
    /// Fails with `MalformedEnvelope` when the buffer is too short to hold
    /// the header and a full integrity tag.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < ENVELOPE_MIN_LEN {
            return Err(Error::MalformedEnvelope(format!(
                "envelope too short: {} bytes, need at least {}",
                bytes.len(),
                ENVELOPE_MIN_LEN
            )));
        }

        let spi = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let sequence_number = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let ciphertext = bytes[ENVELOPE_HEADER_LEN..].to_vec();

        Ok(Envelope {
            spi,
            sequence_number,
            ciphertext,
        })
    }

    /// Total serialized length in bytes
    pub fn wire_len(&self) -> usize {
        ENVELOPE_HEADER_LEN + self.ciphertext.len()
    }
}
