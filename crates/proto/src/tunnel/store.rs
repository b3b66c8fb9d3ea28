//! SA database
//!
//! One store per gateway, split by direction: outbound SAs are keyed by the
//! peer gateway address (the selector available on egress), inbound SAs by
//! SPI (the selector extracted from an arriving envelope). Each SA sits
//! behind its own mutex so a lookup hands out independent exclusive access;
//! processing an envelope on one SA never blocks traffic on another.

use crate::tunnel::sa::{Direction, SecurityAssociation};
use crate::tunnel::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// Security Association database for one gateway
#[derive(Debug, Default)]
pub struct SaStore {
    outbound: HashMap<Ipv4Addr, Mutex<SecurityAssociation>>,
    inbound: HashMap<u32, Mutex<SecurityAssociation>>,
}

impl SaStore {
    /// Create an empty store
    pub fn new() -> Self {
        SaStore::default()
    }

    /// Add an SA to the store
    ///
    /// # Errors
    ///
    /// Provisioning collisions are setup-time failures, not traffic faults:
    /// fails with `DuplicateSpi` for a second inbound SA with the same SPI,
    /// or `DuplicatePeer` for a second outbound SA toward the same peer.
    pub fn insert(&mut self, sa: SecurityAssociation) -> Result<()> {
        match sa.direction() {
            Direction::Outbound => {
                if self.outbound.contains_key(&sa.peer()) {
                    return Err(Error::DuplicatePeer(sa.peer().to_string()));
                }
                self.outbound.insert(sa.peer(), Mutex::new(sa));
            }
            Direction::Inbound => {
                if self.inbound.contains_key(&sa.spi()) {
                    return Err(Error::DuplicateSpi(sa.spi()));
                }
                self.inbound.insert(sa.spi(), Mutex::new(sa));
            }
        }
        Ok(())
    }

    /// Find the outbound SA protecting traffic toward `peer`
    ///
    /// # Errors
    ///
    /// Fails with `AssociationNotFound` if no outbound SA targets that peer.
    pub fn lookup_outbound(&self, peer: Ipv4Addr) -> Result<&Mutex<SecurityAssociation>> {
        self.outbound
            .get(&peer)
            .ok_or_else(|| Error::AssociationNotFound(format!("outbound peer {}", peer)))
    }

    /// Find the inbound SA for an envelope carrying `spi`
    ///
    /// # Errors
    ///
    /// Fails with `AssociationNotFound` if the SPI is unknown.
    pub fn lookup_inbound(&self, spi: u32) -> Result<&Mutex<SecurityAssociation>> {
        self.inbound
            .get(&spi)
            .ok_or_else(|| Error::AssociationNotFound(format!("inbound spi 0x{:08x}", spi)))
    }

    /// Number of outbound SAs
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Number of inbound SAs
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// True if the store holds no SAs in either direction
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.inbound.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tunnel::crypto::CipherAlgorithm;

    fn make_sa(spi: u32, direction: Direction, peer: Ipv4Addr) -> SecurityAssociation {
        SecurityAssociation::new(
            spi,
            direction,
            peer,
            CipherAlgorithm::AesGcm128,
            vec![0x42; 16],
            vec![0x24; 32],
            64,
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_lookup_outbound() {
        let mut store = SaStore::new();
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        store.insert(make_sa(0x100, Direction::Outbound, peer)).unwrap();

        let sa = store.lookup_outbound(peer).unwrap().lock();
        assert_eq!(sa.spi(), 0x100);
    }

    #[test]
    fn test_insert_and_lookup_inbound() {
        let mut store = SaStore::new();
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        store.insert(make_sa(0x200, Direction::Inbound, peer)).unwrap();

        let sa = store.lookup_inbound(0x200).unwrap().lock();
        assert_eq!(sa.peer(), peer);
    }

    #[test]
    fn test_lookup_missing_outbound() {
        let store = SaStore::new();
        let result = store.lookup_outbound(Ipv4Addr::new(192, 0, 2, 1));
        assert!(matches!(result, Err(Error::AssociationNotFound(_))));
    }

    #[test]
    fn test_lookup_missing_inbound() {
        let store = SaStore::new();
        assert!(matches!(
            store.lookup_inbound(0xDEAD),
            Err(Error::AssociationNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_inbound_spi_rejected() {
        let mut store = SaStore::new();
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        store.insert(make_sa(0x100, Direction::Inbound, peer)).unwrap();

        let result = store.insert(make_sa(0x100, Direction::Inbound, Ipv4Addr::new(10, 1, 100, 1)));
        assert!(matches!(result, Err(Error::DuplicateSpi(0x100))));
    }

    #[test]
    fn test_duplicate_outbound_peer_rejected() {
        let mut store = SaStore::new();
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        store.insert(make_sa(0x100, Direction::Outbound, peer)).unwrap();

        let result = store.insert(make_sa(0x101, Direction::Outbound, peer));
        assert!(matches!(result, Err(Error::DuplicatePeer(_))));
    }

    #[test]
    fn test_same_spi_opposite_directions_allowed() {
        // An SPI identifies an inbound SA; the outbound side may reuse the
        // number since the maps are disjoint.
        let mut store = SaStore::new();
        let peer = Ipv4Addr::new(10, 1, 200, 2);
        store.insert(make_sa(0x100, Direction::Outbound, peer)).unwrap();
        store.insert(make_sa(0x100, Direction::Inbound, peer)).unwrap();

        assert_eq!(store.outbound_len(), 1);
        assert_eq!(store.inbound_len(), 1);
    }
}
