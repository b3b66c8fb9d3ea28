//! Fault handling policy and drop diagnostics
//!
//! Traffic faults never abort the simulation and never produce error
//! packets on the wire: the offending packet is dropped silently and a
//! per-kind counter records it. Counters are the only observable trace of a
//! dropped packet besides the log line.
//!
//! The one configurable case is egress traffic with no matching SA, where
//! [`MissingSaPolicy`] selects between dropping (default) and forwarding
//! the packet unprotected.

use crate::tunnel::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// What to do with egress traffic that matches no outbound SA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingSaPolicy {
    /// Drop the packet and count it (fail closed)
    #[default]
    Drop,
    /// Forward the packet unprotected
    Bypass,
}

impl fmt::Display for MissingSaPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingSaPolicy::Drop => write!(f, "drop"),
            MissingSaPolicy::Bypass => write!(f, "bypass"),
        }
    }
}

/// Classification of a dropped packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// No SA matched the packet or envelope
    AssociationNotFound,
    /// Outbound SA's sequence counter is spent
    SequenceExhausted,
    /// Envelope failed AEAD verification
    IntegrityCheckFailed,
    /// Sequence number rejected by the anti-replay window
    ReplayDetected,
    /// Bytes on the tunnel port did not parse as an envelope
    MalformedEnvelope,
    /// Anything else (internal faults, bad state)
    Other,
}

impl DropKind {
    /// Classify a processing error into its drop counter
    pub fn from_error(err: &Error) -> Self {
        match err {
            Error::AssociationNotFound(_) => DropKind::AssociationNotFound,
            Error::SequenceExhausted(_) => DropKind::SequenceExhausted,
            Error::IntegrityCheckFailed(_) => DropKind::IntegrityCheckFailed,
            Error::ReplayDetected(_) => DropKind::ReplayDetected,
            Error::MalformedEnvelope(_) | Error::BufferTooShort { .. } => {
                DropKind::MalformedEnvelope
            }
            _ => DropKind::Other,
        }
    }
}

impl fmt::Display for DropKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropKind::AssociationNotFound => write!(f, "association_not_found"),
            DropKind::SequenceExhausted => write!(f, "sequence_exhausted"),
            DropKind::IntegrityCheckFailed => write!(f, "integrity_check_failed"),
            DropKind::ReplayDetected => write!(f, "replay_detected"),
            DropKind::MalformedEnvelope => write!(f, "malformed_envelope"),
            DropKind::Other => write!(f, "other"),
        }
    }
}

/// Per-kind drop counters for one gateway
#[derive(Debug, Default)]
pub struct DropCounters {
    association_not_found: AtomicU64,
    sequence_exhausted: AtomicU64,
    integrity_check_failed: AtomicU64,
    replay_detected: AtomicU64,
    malformed_envelope: AtomicU64,
    other: AtomicU64,
}

impl DropCounters {
    /// Create counters at zero
    pub fn new() -> Self {
        DropCounters::default()
    }

    /// Record one dropped packet
    pub fn record(&self, kind: DropKind) {
        let counter = match kind {
            DropKind::AssociationNotFound => &self.association_not_found,
            DropKind::SequenceExhausted => &self.sequence_exhausted,
            DropKind::IntegrityCheckFailed => &self.integrity_check_failed,
            DropKind::ReplayDetected => &self.replay_detected,
            DropKind::MalformedEnvelope => &self.malformed_envelope,
            DropKind::Other => &self.other,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the counter for one kind
    pub fn get(&self, kind: DropKind) -> u64 {
        let counter = match kind {
            DropKind::AssociationNotFound => &self.association_not_found,
            DropKind::SequenceExhausted => &self.sequence_exhausted,
            DropKind::IntegrityCheckFailed => &self.integrity_check_failed,
            DropKind::ReplayDetected => &self.replay_detected,
            DropKind::MalformedEnvelope => &self.malformed_envelope,
            DropKind::Other => &self.other,
        };
        counter.load(Ordering::Relaxed)
    }

    /// Take a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> DropSnapshot {
        DropSnapshot {
            association_not_found: self.association_not_found.load(Ordering::Relaxed),
            sequence_exhausted: self.sequence_exhausted.load(Ordering::Relaxed),
            integrity_check_failed: self.integrity_check_failed.load(Ordering::Relaxed),
            replay_detected: self.replay_detected.load(Ordering::Relaxed),
            malformed_envelope: self.malformed_envelope.load(Ordering::Relaxed),
            other: self.other.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a gateway's drop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropSnapshot {
    /// Drops because no SA matched
    pub association_not_found: u64,
    /// Drops because the sequence counter was spent
    pub sequence_exhausted: u64,
    /// Drops because AEAD verification failed
    pub integrity_check_failed: u64,
    /// Drops because the replay window rejected the sequence number
    pub replay_detected: u64,
    /// Drops because the envelope did not parse
    pub malformed_envelope: u64,
    /// Drops for any other fault
    pub other: u64,
}

impl DropSnapshot {
    /// Total packets dropped across all kinds
    pub fn total(&self) -> u64 {
        self.association_not_found
            + self.sequence_exhausted
            + self.integrity_check_failed
            + self.replay_detected
            + self.malformed_envelope
            + self.other
    }
}

impl fmt::Display for DropSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "drops: total={} sa_missing={} seq_exhausted={} integrity={} replay={} malformed={} other={}",
            self.total(),
            self.association_not_found,
            self.sequence_exhausted,
            self.integrity_check_failed,
            self.replay_detected,
            self.malformed_envelope,
            self.other
        )
    }
}
