//! Security Association state
//!
//! An SA is unidirectional: a tunnel between two gateways needs one outbound
//! and one inbound SA on each side, and the pair sharing an SPI must also
//! share keys. Outbound SAs own the transmit sequence counter; inbound SAs
//! own the anti-replay window. Key material is zeroized on drop and never
//! appears in `Debug` output or logs.

use crate::tunnel::crypto::{self, CipherAlgorithm, SALT_LEN};
use crate::tunnel::replay::ReplayWindow;
use crate::tunnel::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;
use zeroize::Zeroizing;

/// Direction of traffic an SA protects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Local plaintext is encapsulated and sent to the peer
    Outbound,
    /// Envelopes from the peer are decapsulated locally
    Inbound,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outbound => write!(f, "outbound"),
            Direction::Inbound => write!(f, "inbound"),
        }
    }
}

/// A unidirectional Security Association
pub struct SecurityAssociation {
    spi: u32,
    direction: Direction,
    peer: Ipv4Addr,
    cipher: CipherAlgorithm,
    encryption_key: Zeroizing<Vec<u8>>,
    nonce_salt: [u8; SALT_LEN],
    sequence_counter: u32,
    replay_window: ReplayWindow,
}

impl SecurityAssociation {
    /// Create a new Security Association
    ///
    /// # Arguments
    ///
    /// * `spi` - Security Parameters Index, unique per inbound SA on a gateway
    /// * `direction` - Whether this SA encapsulates or decapsulates
    /// * `peer` - Tunnel endpoint address of the remote gateway
    /// * `cipher` - AEAD cipher for this SA
    /// * `encryption_key` - Key of exactly `cipher.key_len()` bytes
    /// * `authentication_key` - Keys the secret nonce salt; any length
    /// * `window_size` - Anti-replay window width (1..=64)
    ///
    /// # Errors
    ///
    /// Fails with `InvalidKeyLength` if the encryption key does not match the
    /// cipher, or `InvalidParameter` for a bad window size or empty
    /// authentication key.
    pub fn new(
        spi: u32,
        direction: Direction,
        peer: Ipv4Addr,
        cipher: CipherAlgorithm,
        encryption_key: Vec<u8>,
        authentication_key: Vec<u8>,
        window_size: u32,
    ) -> Result<Self> {
        if encryption_key.len() != cipher.key_len() {
            return Err(Error::InvalidKeyLength {
                expected: cipher.key_len(),
                actual: encryption_key.len(),
            });
        }
        if authentication_key.is_empty() {
            return Err(Error::InvalidParameter(
                "authentication key must not be empty".into(),
            ));
        }

        let nonce_salt = crypto::derive_nonce_salt(&authentication_key, spi);
        // The salt is the only thing the authentication key feeds; drop the
        // key itself zeroized rather than retaining it.
        drop(Zeroizing::new(authentication_key));

        Ok(SecurityAssociation {
            spi,
            direction,
            peer,
            cipher,
            encryption_key: Zeroizing::new(encryption_key),
            nonce_salt,
            sequence_counter: 0,
            replay_window: ReplayWindow::new(window_size)?,
        })
    }

    /// Security Parameters Index
    pub fn spi(&self) -> u32 {
        self.spi
    }

    /// Traffic direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Remote tunnel endpoint
    pub fn peer(&self) -> Ipv4Addr {
        self.peer
    }

    /// AEAD cipher
    pub fn cipher(&self) -> CipherAlgorithm {
        self.cipher
    }

    /// Encryption key bytes
    pub(crate) fn encryption_key(&self) -> &[u8] {
        &self.encryption_key
    }

    /// Last sequence number issued (0 before the first envelope)
    pub fn sequence_counter(&self) -> u32 {
        self.sequence_counter
    }

    /// Anti-replay window state (inbound SAs)
    pub fn replay_window(&self) -> &ReplayWindow {
        &self.replay_window
    }

    /// Mutable anti-replay window (inbound SAs)
    pub(crate) fn replay_window_mut(&mut self) -> &mut ReplayWindow {
        &mut self.replay_window
    }

    /// Issue the next transmit sequence number
    ///
    /// The counter is incremented before use, so the first envelope carries
    /// sequence number 1.
    ///
    /// # Errors
    ///
    /// Fails with `SequenceExhausted` once the counter reaches `u32::MAX`;
    /// the SA is then permanently unusable for transmission rather than
    /// wrapping and reusing nonces.
    pub fn next_sequence(&mut self) -> Result<u32> {
        if self.sequence_counter == u32::MAX {
            return Err(Error::SequenceExhausted(self.spi));
        }
        self.sequence_counter += 1;
        Ok(self.sequence_counter)
    }

    /// Resume the transmit counter at `value`
    ///
    /// Used when an SA is re-provisioned from saved state: the counter must
    /// never restart below a value already used on the wire, or nonces would
    /// repeat. A value of `u32::MAX` yields an SA that is already exhausted.
    pub fn with_sequence_counter(mut self, value: u32) -> Self {
        self.sequence_counter = value;
        self
    }

    /// Build the AEAD nonce for a given sequence number
    pub(crate) fn nonce(&self, sequence: u32) -> [u8; crypto::NONCE_LEN] {
        crypto::build_nonce(&self.nonce_salt, sequence)
    }
}

// Manual impl so key material never reaches log output.
impl fmt::Debug for SecurityAssociation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityAssociation")
            .field("spi", &format_args!("0x{:08x}", self.spi))
            .field("direction", &self.direction)
            .field("peer", &self.peer)
            .field("cipher", &self.cipher)
            .field("sequence_counter", &self.sequence_counter)
            .finish_non_exhaustive()
    }
}
