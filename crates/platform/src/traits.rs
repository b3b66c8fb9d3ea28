//! Collaborator traits implemented by the simulation driver
//!
//! The tunnel layer never talks to a real network. It emits packets through
//! a [`PacketSink`] the driver supplies and reads virtual time from a
//! [`VirtualClock`]. In a discrete-event run both are backed by the
//! framework's scheduler; in tests they are plain in-memory fakes.

use crate::packet::Packet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Where packets go after the tunnel layer is done with them
///
/// `transmit` hands a packet to the underlying network layer for ordinary
/// routing; `deliver` re-injects a packet into local delivery as if it had
/// arrived natively. Both are fire-and-forget: the tunnel layer never learns
/// whether a packet reached anything.
pub trait PacketSink {
    /// Hand a packet onward for routing toward its destination
    fn transmit(&mut self, packet: Packet);

    /// Re-inject a packet into local delivery
    fn deliver(&mut self, packet: Packet);
}

/// A global virtual-time source
///
/// In a simulation this is the event scheduler's clock, not wall time.
/// Implementations must be cheap to query.
pub trait VirtualClock: Send + Sync {
    /// Current virtual time since the start of the run
    fn now(&self) -> Duration;
}

/// A manually-advanced virtual clock
///
/// Used by tests and demos standing in for a real scheduler. Time only
/// moves when the driver calls [`ManualClock::advance`].
///
/// # Example
///
/// ```
/// use espgate_platform::{ManualClock, VirtualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now(), Duration::ZERO);
///
/// clock.advance(Duration::from_millis(2));
/// assert_eq!(clock.now(), Duration::from_millis(2));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Create a clock at virtual time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance virtual time by `delta`
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Set virtual time to an absolute value
    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::Relaxed);
    }
}

impl VirtualClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::PROTO_UDP;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct RecordingSink {
        transmitted: Vec<Packet>,
        delivered: Vec<Packet>,
    }

    impl PacketSink for RecordingSink {
        fn transmit(&mut self, packet: Packet) {
            self.transmitted.push(packet);
        }

        fn deliver(&mut self, packet: Packet) {
            self.delivered.push(packet);
        }
    }

    #[test]
    fn test_packet_sink_object_safety() {
        let mut sink = RecordingSink::default();
        let pkt = Packet::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST, PROTO_UDP, vec![1]);

        let dyn_sink: &mut dyn PacketSink = &mut sink;
        dyn_sink.transmit(pkt.clone());
        dyn_sink.deliver(pkt);

        assert_eq!(sink.transmitted.len(), 1);
        assert_eq!(sink.delivered.len(), 1);
    }

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(1));
        clock.advance(Duration::from_millis(500));
        assert_eq!(clock.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_manual_clock_set() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(5));
        clock.set(Duration::from_secs(2));
        assert_eq!(clock.now(), Duration::from_secs(2));
    }
}
