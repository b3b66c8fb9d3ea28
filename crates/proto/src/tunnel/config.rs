//! Gateway configuration
//!
//! All tunnel state is provisioned statically before traffic flows: the
//! routes that steer inner destinations to peer gateways, and the SA
//! material itself. There is no negotiation at runtime.

use crate::tunnel::crypto::{self, CipherAlgorithm};
use crate::tunnel::policy::MissingSaPolicy;
use crate::tunnel::replay::{DEFAULT_WINDOW_SIZE, MAX_WINDOW_SIZE, MIN_WINDOW_SIZE};
use crate::tunnel::sa::Direction;
use crate::tunnel::{Error, Result};
use espgate_platform::{Subnet, VirtualClock};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Steers inner traffic for a remote subnet toward a peer gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelRoute {
    /// Protected subnet behind the peer
    pub remote_subnet: Subnet,
    /// Tunnel endpoint address of the peer gateway
    pub peer: Ipv4Addr,
}

impl TunnelRoute {
    /// Create a route
    pub fn new(remote_subnet: Subnet, peer: Ipv4Addr) -> Self {
        TunnelRoute { remote_subnet, peer }
    }
}

/// Provisioning material for one SA
#[derive(Clone)]
pub struct SaEntry {
    /// Security Parameters Index
    pub spi: u32,
    /// Traffic direction
    pub direction: Direction,
    /// Peer gateway address
    pub peer: Ipv4Addr,
    /// AEAD cipher
    pub cipher: CipherAlgorithm,
    /// Encryption key, `cipher.key_len()` bytes
    pub encryption_key: Vec<u8>,
    /// Authentication key (nonce salt derivation)
    pub authentication_key: Vec<u8>,
    /// Anti-replay window size
    pub window_size: u32,
    /// Transmit counter start value (outbound SAs restored from saved state)
    pub initial_sequence: u32,
}

impl SaEntry {
    /// Create an entry with explicit keys and the default window size
    pub fn new(
        spi: u32,
        direction: Direction,
        peer: Ipv4Addr,
        cipher: CipherAlgorithm,
        encryption_key: Vec<u8>,
        authentication_key: Vec<u8>,
    ) -> Self {
        SaEntry {
            spi,
            direction,
            peer,
            cipher,
            encryption_key,
            authentication_key,
            window_size: DEFAULT_WINDOW_SIZE,
            initial_sequence: 0,
        }
    }

    /// Derive an entry's keys from a pre-shared secret
    ///
    /// Both gateways of a tunnel provision matching SAs from the same
    /// secret and SPI; see [`crypto::derive_sa_keys`].
    pub fn from_secret(
        spi: u32,
        direction: Direction,
        peer: Ipv4Addr,
        cipher: CipherAlgorithm,
        secret: &[u8],
    ) -> Self {
        let (encryption_key, authentication_key) = crypto::derive_sa_keys(secret, spi, cipher);
        SaEntry::new(spi, direction, peer, cipher, encryption_key, authentication_key)
    }

    /// Set a non-default anti-replay window size
    pub fn with_window_size(mut self, window_size: u32) -> Self {
        self.window_size = window_size;
        self
    }

    /// Resume the transmit counter at `value`
    ///
    /// See [`SecurityAssociation::with_sequence_counter`]; restarting below
    /// a value already used on the wire would repeat nonces.
    ///
    /// [`SecurityAssociation::with_sequence_counter`]:
    ///     crate::tunnel::SecurityAssociation::with_sequence_counter
    pub fn with_initial_sequence(mut self, value: u32) -> Self {
        self.initial_sequence = value;
        self
    }
}

impl std::fmt::Debug for SaEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaEntry")
            .field("spi", &format_args!("0x{:08x}", self.spi))
            .field("direction", &self.direction)
            .field("peer", &self.peer)
            .field("cipher", &self.cipher)
            .field("window_size", &self.window_size)
            .finish_non_exhaustive()
    }
}

/// Static configuration for one gateway
#[derive(Clone)]
pub struct GatewayConfig {
    /// This gateway's own tunnel endpoint address
    pub local_address: Ipv4Addr,
    /// The subnet this gateway protects
    pub protected_subnet: Subnet,
    /// Routes from remote subnets to peer gateways
    pub routes: Vec<TunnelRoute>,
    /// SA provisioning entries
    pub sa_entries: Vec<SaEntry>,
    /// Egress behavior when no outbound SA matches
    pub missing_sa_policy: MissingSaPolicy,
    /// Virtual-time source for log timestamps, shared with the driver
    pub clock: Option<Arc<dyn VirtualClock>>,
}

impl GatewayConfig {
    /// Create a configuration with no routes or SAs
    pub fn new(local_address: Ipv4Addr, protected_subnet: Subnet) -> Self {
        GatewayConfig {
            local_address,
            protected_subnet,
            routes: Vec::new(),
            sa_entries: Vec::new(),
            missing_sa_policy: MissingSaPolicy::default(),
            clock: None,
        }
    }

    /// Add a route to a remote protected subnet
    pub fn with_route(mut self, route: TunnelRoute) -> Self {
        self.routes.push(route);
        self
    }

    /// Add an SA entry
    pub fn with_sa(mut self, entry: SaEntry) -> Self {
        self.sa_entries.push(entry);
        self
    }

    /// Set the missing-SA egress policy
    pub fn with_missing_sa_policy(mut self, policy: MissingSaPolicy) -> Self {
        self.missing_sa_policy = policy;
        self
    }

    /// Attach the simulation's virtual clock
    ///
    /// When present, every tunnel log event carries the virtual time at
    /// which it was processed. Without a clock the field is simply absent.
    pub fn with_clock(mut self, clock: Arc<dyn VirtualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// * `DuplicateSpi` - Two inbound entries share an SPI
    /// * `DuplicatePeer` - Two outbound entries target the same peer
    /// * `InvalidKeyLength` - An entry's encryption key does not fit its cipher
    /// * `InvalidParameter` - Bad window size or empty authentication key
    ///
    /// A route whose peer has no outbound SA is deliberately not a
    /// validation error; [`MissingSaPolicy`] governs that case at traffic
    /// time.
    pub fn validate(&self) -> Result<()> {
        let mut inbound_spis = HashSet::new();
        let mut outbound_peers = HashSet::new();

        for entry in &self.sa_entries {
            match entry.direction {
                Direction::Inbound => {
                    if !inbound_spis.insert(entry.spi) {
                        return Err(Error::DuplicateSpi(entry.spi));
                    }
                }
                Direction::Outbound => {
                    if !outbound_peers.insert(entry.peer) {
                        return Err(Error::DuplicatePeer(entry.peer.to_string()));
                    }
                }
            }

            if entry.encryption_key.len() != entry.cipher.key_len() {
                return Err(Error::InvalidKeyLength {
                    expected: entry.cipher.key_len(),
                    actual: entry.encryption_key.len(),
                });
            }
            if entry.authentication_key.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "SA 0x{:08x}: authentication key must not be empty",
                    entry.spi
                )));
            }
            if !(MIN_WINDOW_SIZE..=MAX_WINDOW_SIZE).contains(&entry.window_size) {
                return Err(Error::InvalidParameter(format!(
                    "SA 0x{:08x}: window size must be in {}..={}, got {}",
                    entry.spi, MIN_WINDOW_SIZE, MAX_WINDOW_SIZE, entry.window_size
                )));
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("local_address", &self.local_address)
            .field("protected_subnet", &self.protected_subnet)
            .field("routes", &self.routes)
            .field("sa_entries", &self.sa_entries)
            .field("missing_sa_policy", &self.missing_sa_policy)
            .field("clock", &self.clock.as_ref().map(|_| "<VirtualClock>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(a: u8, b: u8, c: u8, prefix: u8) -> Subnet {
        Subnet::new(Ipv4Addr::new(a, b, c, 0), prefix).unwrap()
    }

    fn base_config() -> GatewayConfig {
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        GatewayConfig::new(Ipv4Addr::new(10, 1, 100, 1), subnet(10, 1, 1, 24))
            .with_route(TunnelRoute::new(subnet(10, 1, 2, 24), peer))
            .with_sa(SaEntry::from_secret(
                0x100,
                Direction::Outbound,
                peer,
                CipherAlgorithm::AesGcm128,
                b"shared secret",
            ))
            .with_sa(SaEntry::from_secret(
                0x200,
                Direction::Inbound,
                peer,
                CipherAlgorithm::AesGcm128,
                b"shared secret",
            ))
    }

    #[test]
    fn test_valid_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_duplicate_inbound_spi() {
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        let config = base_config().with_sa(SaEntry::from_secret(
            0x200,
            Direction::Inbound,
            peer,
            CipherAlgorithm::AesGcm128,
            b"other secret",
        ));
        assert!(matches!(config.validate(), Err(Error::DuplicateSpi(0x200))));
    }

    #[test]
    fn test_duplicate_outbound_peer() {
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        let config = base_config().with_sa(SaEntry::from_secret(
            0x101,
            Direction::Outbound,
            peer,
            CipherAlgorithm::AesGcm128,
            b"other secret",
        ));
        assert!(matches!(config.validate(), Err(Error::DuplicatePeer(_))));
    }

    #[test]
    fn test_bad_key_length() {
        let peer = Ipv4Addr::new(10, 1, 200, 3);
        let config = base_config().with_sa(SaEntry::new(
            0x300,
            Direction::Inbound,
            peer,
            CipherAlgorithm::AesGcm256,
            vec![0x42; 16],
            vec![0x24; 32],
        ));
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidKeyLength { .. })
        ));
    }

    #[test]
    fn test_bad_window_size() {
        let peer = Ipv4Addr::new(10, 1, 200, 3);
        for bad_size in [0, 16, 31, 65] {
            let entry = SaEntry::from_secret(
                0x300,
                Direction::Inbound,
                peer,
                CipherAlgorithm::AesGcm128,
                b"secret",
            )
            .with_window_size(bad_size);
            let config = base_config().with_sa(entry);
            assert!(
                matches!(config.validate(), Err(Error::InvalidParameter(_))),
                "window size {} accepted",
                bad_size
            );
        }
    }

    #[test]
    fn test_route_without_outbound_sa_is_valid() {
        // Missing SAs surface at traffic time through the drop policy
        let config = base_config().with_route(TunnelRoute::new(
            subnet(10, 1, 3, 24),
            Ipv4Addr::new(10, 1, 200, 9),
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_secret_matches_derive() {
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        let entry =
            SaEntry::from_secret(7, Direction::Outbound, peer, CipherAlgorithm::AesGcm256, b"s");
        let (enc, auth) = crypto::derive_sa_keys(b"s", 7, CipherAlgorithm::AesGcm256);
        assert_eq!(entry.encryption_key, enc);
        assert_eq!(entry.authentication_key, auth);
    }

    #[test]
    fn test_entry_debug_hides_keys() {
        let entry = SaEntry::new(
            1,
            Direction::Outbound,
            Ipv4Addr::LOCALHOST,
            CipherAlgorithm::AesGcm128,
            vec![0x42; 16],
            vec![0x24; 32],
        );
        let rendered = format!("{:?}", entry);
        assert!(!rendered.contains("encryption_key"));
    }
}
