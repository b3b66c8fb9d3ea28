//! Structured logging for tunnel processing
//!
//! Thin wrappers over `tracing` so every event carries the same field names
//! and the call sites stay one line. Traffic events take the current
//! virtual time as an `Option`; when the gateway has no clock attached the
//! `sim_time_us` field is simply omitted. Key material must never be passed
//! to any of these functions; SPIs, sequence numbers, addresses, and sizes
//! are the only identifiers that reach the log.

use crate::tunnel::policy::DropKind;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Log target for all tunnel events
pub const LOG_TARGET: &str = "espgate::tunnel";

fn micros(sim_time: Option<Duration>) -> Option<u64> {
    sim_time.map(|t| t.as_micros() as u64)
}

/// An SA was installed into a gateway's store
pub fn log_sa_installed(spi: u32, direction: &str, peer: Ipv4Addr, window_size: u32) {
    info!(
        target: LOG_TARGET,
        spi = format_args!("0x{:08x}", spi),
        direction,
        peer = %peer,
        window_size,
        "Security Association installed"
    );
}

/// A plaintext packet was encapsulated and queued for the transit network
pub fn log_envelope_sent(
    sim_time: Option<Duration>,
    spi: u32,
    sequence: u32,
    peer: Ipv4Addr,
    wire_len: usize,
) {
    trace!(
        target: LOG_TARGET,
        sim_time_us = micros(sim_time),
        spi = format_args!("0x{:08x}", spi),
        sequence,
        peer = %peer,
        wire_len,
        "Envelope sent"
    );
}

/// An envelope was decapsulated and its inner packet re-injected
pub fn log_envelope_received(
    sim_time: Option<Duration>,
    spi: u32,
    sequence: u32,
    inner_len: usize,
) {
    trace!(
        target: LOG_TARGET,
        sim_time_us = micros(sim_time),
        spi = format_args!("0x{:08x}", spi),
        sequence,
        inner_len,
        "Envelope decapsulated"
    );
}

/// A packet or envelope was dropped
pub fn log_packet_dropped(sim_time: Option<Duration>, kind: DropKind, detail: &str) {
    warn!(
        target: LOG_TARGET,
        sim_time_us = micros(sim_time),
        kind = %kind,
        detail,
        "Packet dropped"
    );
}

/// An unprotected packet was forwarded under the bypass policy
pub fn log_bypass_forward(sim_time: Option<Duration>, dst: Ipv4Addr) {
    debug!(
        target: LOG_TARGET,
        sim_time_us = micros(sim_time),
        dst = %dst,
        "No outbound SA, forwarding unprotected (bypass policy)"
    );
}

/// A packet passed through the gateway without tunnel processing
pub fn log_pass_through(sim_time: Option<Duration>, dst: Ipv4Addr) {
    trace!(
        target: LOG_TARGET,
        sim_time_us = micros(sim_time),
        dst = %dst,
        "Packet outside tunnel scope, passing through"
    );
}
