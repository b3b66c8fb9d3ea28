//! Tunnel-mode security association layer for the espgate simulation stack.
//!
//! This crate implements the data plane of an IPsec-style virtual private
//! network between two simulated LANs: ESP-like envelopes carrying
//! AEAD-protected payloads between a pair of gateway nodes, with per-SA
//! sequence counters, anti-replay windows, and a silent drop policy for
//! anything that fails verification.
//!
//! # Example
//!
//! ```rust
//! use espgate_proto::tunnel::{codec, CipherAlgorithm, Direction, SecurityAssociation};
//! use std::net::Ipv4Addr;
//!
//! let peer = Ipv4Addr::new(10, 1, 2, 4);
//! let enc_key = vec![0x42; 16];
//! let auth_key = vec![0x24; 32];
//!
//! let mut sa_out = SecurityAssociation::new(
//!     1, Direction::Outbound, peer, CipherAlgorithm::AesGcm128,
//!     enc_key.clone(), auth_key.clone(), 64,
//! ).unwrap();
//! let mut sa_in = SecurityAssociation::new(
//!     1, Direction::Inbound, peer, CipherAlgorithm::AesGcm128,
//!     enc_key, auth_key, 64,
//! ).unwrap();
//!
//! let envelope = codec::encapsulate(&mut sa_out, b"protected payload").unwrap();
//! let recovered = codec::decapsulate(&mut sa_in, &envelope).unwrap();
//! assert_eq!(recovered, b"protected payload");
//! ```
//!
//! # Security
//!
//! - All cryptographic operations use vetted AEAD implementations
//!   (`aes-gcm`, `chacha20poly1305`)
//! - Key material is zeroized on drop and never logged
//! - No unsafe code

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod tunnel;
