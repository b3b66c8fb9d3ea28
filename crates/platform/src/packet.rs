//! Simulated packet model
//!
//! The tunnel layer operates on a deliberately small packet abstraction:
//! IPv4 source and destination, an IP protocol number, and an opaque
//! payload. This is the shape the simulation framework hands to a node's
//! interface hooks; everything the framework adds on top (MAC layer,
//! checksums, TTL) is out of scope here.
//!
//! # Wire format
//!
//! All multi-byte fields are big-endian to match network order:
//!
//! ```text
//! | src (4) | dst (4) | protocol (1) | payload (variable) |
//! ```

use crate::error::{PlatformError, PlatformResult};
use std::fmt;
use std::net::Ipv4Addr;

/// IP protocol number for UDP
pub const PROTO_UDP: u8 = 17;

/// IP protocol number for tunnel (ESP) traffic
///
/// Packets carrying this protocol hold an opaque envelope as payload;
/// transit nodes forward them without interpretation.
pub const PROTO_TUNNEL: u8 = 50;

/// Serialized packet header length: src (4) + dst (4) + protocol (1)
pub const PACKET_HEADER_LEN: usize = 9;

/// A simulated IP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Source address
    pub src: Ipv4Addr,

    /// Destination address
    pub dst: Ipv4Addr,

    /// IP protocol number (17 = UDP, 50 = tunnel)
    pub protocol: u8,

    /// Opaque payload bytes
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a new packet
    pub fn new(src: Ipv4Addr, dst: Ipv4Addr, protocol: u8, payload: Vec<u8>) -> Self {
        Packet {
            src,
            dst,
            protocol,
            payload,
        }
    }

    /// Create a UDP packet
    pub fn udp(src: Ipv4Addr, dst: Ipv4Addr, payload: Vec<u8>) -> Self {
        Packet::new(src, dst, PROTO_UDP, payload)
    }

    /// Is this tunnel (ESP) traffic?
    pub fn is_tunnel(&self) -> bool {
        self.protocol == PROTO_TUNNEL
    }

    /// Serialize to wire format (big-endian fields)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(PACKET_HEADER_LEN + self.payload.len());
        bytes.extend_from_slice(&self.src.octets());
        bytes.extend_from_slice(&self.dst.octets());
        bytes.push(self.protocol);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse from wire format
    ///
    /// # Errors
    ///
    /// Fails with `PlatformError::Packet` if `data` is shorter than the
    /// fixed header.
    pub fn from_bytes(data: &[u8]) -> PlatformResult<Self> {
        if data.len() < PACKET_HEADER_LEN {
            return Err(PlatformError::Packet(format!(
                "truncated header: need {} bytes, have {}",
                PACKET_HEADER_LEN,
                data.len()
            )));
        }

        let src = Ipv4Addr::new(data[0], data[1], data[2], data[3]);
        let dst = Ipv4Addr::new(data[4], data[5], data[6], data[7]);
        let protocol = data[8];
        let payload = data[PACKET_HEADER_LEN..].to_vec();

        Ok(Packet {
            src,
            dst,
            protocol,
            payload,
        })
    }

    /// Total serialized length
    pub fn len(&self) -> usize {
        PACKET_HEADER_LEN + self.payload.len()
    }

    /// True when the payload is empty (the header is always present)
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// An IPv4 subnet used for tunnel-route matching
///
/// Gateways decide egress encapsulation by asking whether a packet's
/// destination belongs to a protected peer-LAN subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subnet {
    network: Ipv4Addr,
    prefix_len: u8,
}

impl Subnet {
    /// Create a subnet from a network address and prefix length
    ///
    /// # Errors
    ///
    /// Fails with `PlatformError::Config` if `prefix_len > 32`.
    pub fn new(network: Ipv4Addr, prefix_len: u8) -> PlatformResult<Self> {
        if prefix_len > 32 {
            return Err(PlatformError::Config(format!(
                "invalid prefix length /{}",
                prefix_len
            )));
        }
        Ok(Subnet {
            network,
            prefix_len,
        })
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Does this subnet contain `addr`?
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        if self.prefix_len == 0 {
            return true;
        }
        let shift = 32 - u32::from(self.prefix_len);
        (u32::from(self.network) >> shift) == (u32::from(addr) >> shift)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}
