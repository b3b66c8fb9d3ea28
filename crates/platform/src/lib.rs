//! # espgate Platform
//!
//! Core types and simulation seams shared by the espgate tunnel layer.
//!
//! This crate provides:
//! - Unified error types (`PlatformError`, `PlatformResult`)
//! - The simulated packet model (`Packet`, `Subnet`, protocol numbers)
//! - Collaborator traits the simulation driver implements
//!   (`PacketSink`, `VirtualClock`) plus a `ManualClock` for tests
//!
//! The discrete-event framework that owns the topology, the scheduler and
//! the channels is deliberately *not* part of this workspace. Everything the
//! tunnel layer needs from it comes through the seams defined here: a way to
//! hand packets onward, a way to re-inject recovered packets locally, and a
//! global virtual-time source.
//!
//! # Examples
//!
//! ```
//! use espgate_platform::{PlatformError, PlatformResult};
//!
//! fn example_function() -> PlatformResult<String> {
//!     Ok("Hello, espgate!".to_string())
//! }
//!
//! # fn main() -> PlatformResult<()> {
//! let result = example_function()?;
//! assert_eq!(result, "Hello, espgate!");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod error;
pub mod packet;
pub mod traits;

pub use error::{PlatformError, PlatformResult};
pub use packet::{Packet, Subnet, PACKET_HEADER_LEN, PROTO_TUNNEL, PROTO_UDP};
pub use traits::{ManualClock, PacketSink, VirtualClock};

/// Platform version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
