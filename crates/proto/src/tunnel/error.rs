//! Error types for tunnel-layer operations
//!
//! One unified error type covers the association store, the envelope codec,
//! the replay tracker, and gateway configuration. Traffic-path variants map
//! one-to-one onto the diagnostic drop counters in [`crate::tunnel::policy`].

use std::fmt;

/// Result type for tunnel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tunnel-layer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No security association exists for the given peer or SPI
    AssociationNotFound(String),

    /// Outbound sequence counter reached its maximum; the SA must be rekeyed
    SequenceExhausted(u32),

    /// Authentication tag verification failed
    IntegrityCheckFailed(u32),

    /// Duplicate or stale sequence number
    ReplayDetected(u32),

    /// Envelope or inner packet could not be decoded
    MalformedEnvelope(String),

    /// Buffer too short for operation
    BufferTooShort {
        /// Required length
        required: usize,
        /// Available length
        available: usize,
    },

    /// Key has the wrong length for the selected cipher
    InvalidKeyLength {
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Two associations were provisioned with the same SPI
    DuplicateSpi(u32),

    /// Two outbound associations were provisioned for the same peer
    DuplicatePeer(String),

    /// Invalid configuration parameter
    InvalidParameter(String),

    /// Internal error (should not happen)
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::AssociationNotFound(what) => {
                write!(f, "Security association not found: {}", what)
            }
            Error::SequenceExhausted(spi) => {
                write!(
                    f,
                    "Sequence counter exhausted on SPI 0x{:08x} - SA must be rekeyed",
                    spi
                )
            }
            Error::IntegrityCheckFailed(spi) => {
                write!(f, "Integrity check failed on SPI 0x{:08x}", spi)
            }
            Error::ReplayDetected(seq) => {
                write!(f, "Replay detected (sequence: {})", seq)
            }
            Error::MalformedEnvelope(msg) => write!(f, "Malformed envelope: {}", msg),
            Error::BufferTooShort {
                required,
                available,
            } => {
                write!(
                    f,
                    "Buffer too short: need {} bytes, have {}",
                    required, available
                )
            }
            Error::InvalidKeyLength { expected, actual } => {
                write!(
                    f,
                    "Invalid key length: expected {}, got {}",
                    expected, actual
                )
            }
            Error::DuplicateSpi(spi) => write!(f, "Duplicate SPI: 0x{:08x}", spi),
            Error::DuplicatePeer(peer) => {
                write!(f, "Duplicate outbound association for peer {}", peer)
            }
            Error::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
