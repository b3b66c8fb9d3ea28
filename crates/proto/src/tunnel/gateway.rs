//! Gateway intercept filter
//!
//! A [`Gateway`] sits on the border between a protected subnet and the
//! transit network. Egress traffic bound for a remote protected subnet is
//! encapsulated into an envelope addressed to the peer gateway; ingress
//! envelopes are decapsulated and their inner packets re-injected toward
//! the local subnet. Everything else passes through untouched, so hosts on
//! either subnet never see tunnel framing and transit routers never see
//! plaintext.
//!
//! Construction consumes a validated [`GatewayConfig`]; after that the
//! gateway is immutable apart from per-SA counters and windows, each behind
//! its own lock, so processing borrows `&self`.

use crate::tunnel::codec;
use crate::tunnel::config::{GatewayConfig, TunnelRoute};
use crate::tunnel::envelope::Envelope;
use crate::tunnel::logging;
use crate::tunnel::policy::{DropCounters, DropKind, DropSnapshot, MissingSaPolicy};
use crate::tunnel::sa::SecurityAssociation;
use crate::tunnel::store::SaStore;
use crate::tunnel::Result;
use espgate_platform::{Packet, PacketSink, Subnet, VirtualClock, PROTO_TUNNEL};
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Security gateway for one protected subnet
pub struct Gateway {
    local_address: Ipv4Addr,
    protected_subnet: Subnet,
    routes: Vec<TunnelRoute>,
    store: SaStore,
    missing_sa_policy: MissingSaPolicy,
    drops: DropCounters,
    clock: Option<Arc<dyn VirtualClock>>,
}

impl Gateway {
    /// Build a gateway from its configuration
    ///
    /// # Errors
    ///
    /// Fails if the configuration does not validate or an SA cannot be
    /// constructed from its entry. Provisioning failures are fatal; a
    /// gateway never starts with a partial SA database.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        config.validate()?;

        let mut store = SaStore::new();
        for entry in &config.sa_entries {
            let sa = SecurityAssociation::new(
                entry.spi,
                entry.direction,
                entry.peer,
                entry.cipher,
                entry.encryption_key.clone(),
                entry.authentication_key.clone(),
                entry.window_size,
            )?
            .with_sequence_counter(entry.initial_sequence);
            logging::log_sa_installed(
                sa.spi(),
                &sa.direction().to_string(),
                sa.peer(),
                entry.window_size,
            );
            store.insert(sa)?;
        }

        Ok(Gateway {
            local_address: config.local_address,
            protected_subnet: config.protected_subnet,
            routes: config.routes,
            store,
            missing_sa_policy: config.missing_sa_policy,
            drops: DropCounters::new(),
            clock: config.clock,
        })
    }

    /// Current virtual time, when a clock is attached
    pub fn sim_time(&self) -> Option<Duration> {
        self.clock.as_ref().map(|clock| clock.now())
    }

    /// This gateway's tunnel endpoint address
    pub fn local_address(&self) -> Ipv4Addr {
        self.local_address
    }

    /// The subnet this gateway protects
    pub fn protected_subnet(&self) -> Subnet {
        self.protected_subnet
    }

    /// Point-in-time drop counters
    pub fn drop_snapshot(&self) -> DropSnapshot {
        self.drops.snapshot()
    }

    /// Process a packet leaving the protected subnet
    ///
    /// Packets for a routed remote subnet are encapsulated and transmitted
    /// to the peer gateway; packets for the local subnet are delivered back
    /// inward; everything else passes through to transit unchanged.
    pub fn process_egress(&self, packet: Packet, sink: &mut dyn PacketSink) {
        if self.protected_subnet.contains(packet.dst) {
            sink.deliver(packet);
            return;
        }

        let Some(peer) = self.route_peer(packet.dst) else {
            logging::log_pass_through(self.sim_time(), packet.dst);
            sink.transmit(packet);
            return;
        };

        match self.encapsulate_for(peer, &packet) {
            Ok(outer) => sink.transmit(outer),
            Err(err) => {
                let kind = DropKind::from_error(&err);
                if kind == DropKind::AssociationNotFound
                    && self.missing_sa_policy == MissingSaPolicy::Bypass
                {
                    logging::log_bypass_forward(self.sim_time(), packet.dst);
                    sink.transmit(packet);
                    return;
                }
                self.drops.record(kind);
                logging::log_packet_dropped(self.sim_time(), kind, &err.to_string());
            }
        }
    }

    /// Process a packet arriving from the transit network
    ///
    /// Envelopes addressed to this gateway are decapsulated and their inner
    /// packets delivered into the protected subnet. Non-tunnel traffic is
    /// delivered as-is.
    pub fn process_ingress(&self, packet: Packet, sink: &mut dyn PacketSink) {
        if !packet.is_tunnel() || packet.dst != self.local_address {
            sink.deliver(packet);
            return;
        }

        match self.decapsulate_inner(&packet) {
            Ok(inner) => sink.deliver(inner),
            Err(err) => {
                let kind = DropKind::from_error(&err);
                self.drops.record(kind);
                logging::log_packet_dropped(self.sim_time(), kind, &err.to_string());
            }
        }
    }

    fn route_peer(&self, dst: Ipv4Addr) -> Option<Ipv4Addr> {
        self.routes
            .iter()
            .find(|route| route.remote_subnet.contains(dst))
            .map(|route| route.peer)
    }

    fn encapsulate_for(&self, peer: Ipv4Addr, inner: &Packet) -> Result<Packet> {
        let mut sa = self.store.lookup_outbound(peer)?.lock();
        let envelope = codec::encapsulate(&mut sa, &inner.to_bytes())?;
        logging::log_envelope_sent(
            self.sim_time(),
            sa.spi(),
            envelope.sequence_number,
            peer,
            envelope.wire_len(),
        );

        Ok(Packet::new(
            self.local_address,
            peer,
            PROTO_TUNNEL,
            envelope.to_bytes(),
        ))
    }

    fn decapsulate_inner(&self, outer: &Packet) -> Result<Packet> {
        let envelope = Envelope::from_bytes(&outer.payload)?;
        let mut sa = self.store.lookup_inbound(envelope.spi)?.lock();
        let plaintext = codec::decapsulate(&mut sa, &envelope)?;
        logging::log_envelope_received(
            self.sim_time(),
            envelope.spi,
            envelope.sequence_number,
            plaintext.len(),
        );

        Packet::from_bytes(&plaintext)
            .map_err(|err| crate::tunnel::Error::MalformedEnvelope(err.to_string()))
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("local_address", &self.local_address)
            .field("protected_subnet", &self.protected_subnet)
            .field("routes", &self.routes)
            .field("store", &self.store)
            .field("missing_sa_policy", &self.missing_sa_policy)
            .field("clock", &self.clock.as_ref().map(|_| "<VirtualClock>"))
            .finish_non_exhaustive()
    }
}
