//! Tunnel-mode SA layer (ESP-style data plane)
//!
//! # Overview
//!
//! Two gateway nodes, one per LAN, protect traffic crossing the transit
//! network between them. Outbound packets whose destination lies in the peer
//! LAN are encapsulated into an authenticated, encrypted [`Envelope`];
//! inbound envelopes addressed to the gateway are verified, checked against
//! the anti-replay window, decrypted, and re-injected. Transit routers only
//! ever see envelopes.
//!
//! # Architecture
//!
//! ```text
//! application packet
//!   │ egress at origin gateway
//!   ▼
//! Gateway intercept filter ──► SaStore (outbound SA by peer)
//!   │                             │
//!   ▼                             ▼
//! codec::encapsulate ──► AEAD seal, sequence counter
//!   │
//!   ▼  opaque envelope, protocol 50
//! transit network (structurally blind to the payload)
//!   │  ingress at destination gateway
//!   ▼
//! Gateway intercept filter ──► SaStore (inbound SA by SPI)
//!   │
//!   ▼
//! codec::decapsulate ──► tag verify, replay window, AEAD open
//!   │
//!   ▼
//! recovered packet re-injected into local delivery
//! ```
//!
//! Failures never propagate back toward the sender: every malformed,
//! unauthenticated, or replayed packet is dropped silently and counted
//! (see [`policy`]).
//!
//! # Concurrency
//!
//! The simulation driver is single-threaded and event-ordered; all
//! operations here are synchronous and complete within one event. Each SA
//! sits behind its own `parking_lot::Mutex` so a multi-worker driver needs
//! exactly one exclusive lock per transform call.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod policy;
pub mod replay;
pub mod sa;
pub mod store;

pub use config::{GatewayConfig, SaEntry, TunnelRoute};
pub use crypto::CipherAlgorithm;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use gateway::Gateway;
pub use policy::{DropCounters, DropKind, DropSnapshot, MissingSaPolicy};
pub use replay::ReplayWindow;
pub use sa::{Direction, SecurityAssociation};
pub use store::SaStore;
