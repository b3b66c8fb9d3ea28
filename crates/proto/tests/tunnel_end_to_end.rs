//! End-to-end tunnel tests over a two-LAN topology
//!
//! Mirrors the reference deployment: LAN 10.1.1.0/24 behind gateway
//! 10.1.100.1 and LAN 10.1.2.0/24 behind gateway 10.1.200.2, joined by a
//! transit segment that only ever carries envelopes. The "wire" here is a
//! recording sink, so every test can inspect, replay, or corrupt exactly
//! what a transit router would see.

use espgate_platform::{Packet, PacketSink, Subnet, PROTO_TUNNEL};
use espgate_proto::tunnel::{
    CipherAlgorithm, Direction, Gateway, GatewayConfig, MissingSaPolicy, SaEntry, TunnelRoute,
};
use std::net::Ipv4Addr;

const SECRET: &[u8] = b"end to end tunnel secret";
const ECHO_PAYLOAD_LEN: usize = 1024;

const LEFT_GW: Ipv4Addr = Ipv4Addr::new(10, 1, 100, 1);
const RIGHT_GW: Ipv4Addr = Ipv4Addr::new(10, 1, 200, 2);
const LEFT_HOST: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 1);
const RIGHT_HOST: Ipv4Addr = Ipv4Addr::new(10, 1, 2, 1);

#[derive(Debug, Default)]
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

fn subnet(a: u8, b: u8, c: u8) -> Subnet {
    Subnet::new(Ipv4Addr::new(a, b, c, 0), 24).unwrap()
}

fn gateway_pair() -> (Gateway, Gateway) {
    let left = GatewayConfig::new(LEFT_GW, subnet(10, 1, 1))
        .with_route(TunnelRoute::new(subnet(10, 1, 2), RIGHT_GW))
        .with_sa(SaEntry::from_secret(
            0x100,
            Direction::Outbound,
            RIGHT_GW,
            CipherAlgorithm::AesGcm128,
            SECRET,
        ))
        .with_sa(SaEntry::from_secret(
            0x200,
            Direction::Inbound,
            RIGHT_GW,
            CipherAlgorithm::AesGcm128,
            SECRET,
        ));

    let right = GatewayConfig::new(RIGHT_GW, subnet(10, 1, 2))
        .with_route(TunnelRoute::new(subnet(10, 1, 1), LEFT_GW))
        .with_sa(SaEntry::from_secret(
            0x200,
            Direction::Outbound,
            LEFT_GW,
            CipherAlgorithm::AesGcm128,
            SECRET,
        ))
        .with_sa(SaEntry::from_secret(
            0x100,
            Direction::Inbound,
            LEFT_GW,
            CipherAlgorithm::AesGcm128,
            SECRET,
        ));

    (Gateway::new(left).unwrap(), Gateway::new(right).unwrap())
}

/// Carry a packet from one LAN to the other through both gateways,
/// returning what the remote LAN received and what crossed transit.
fn send_across(
    origin: &Gateway,
    destination: &Gateway,
    packet: Packet,
) -> (Vec<Packet>, Vec<Packet>) {
    let mut wire = RecordingSink::default();
    origin.process_egress(packet, &mut wire);

    let mut lan = RecordingSink::default();
    for envelope in wire.transmitted.clone() {
        destination.process_ingress(envelope, &mut lan);
    }
    (lan.delivered, wire.transmitted)
}

#[test]
fn udp_echo_round_trip() {
    let (left, right) = gateway_pair();

    // Request: client on the right LAN to echo server on the left LAN
    let request = Packet::udp(RIGHT_HOST, LEFT_HOST, vec![0x5A; ECHO_PAYLOAD_LEN]);
    let (received, _) = send_across(&right, &left, request.clone());
    assert_eq!(received, vec![request.clone()]);

    // Response: server echoes the payload back
    let response = Packet::udp(LEFT_HOST, RIGHT_HOST, request.payload);
    let (received, _) = send_across(&left, &right, response.clone());
    assert_eq!(received, vec![response]);

    assert_eq!(left.drop_snapshot().total(), 0);
    assert_eq!(right.drop_snapshot().total(), 0);
}

#[test]
fn envelope_wire_size_for_1024_byte_payload() {
    let (left, right) = gateway_pair();

    let inner = Packet::udp(LEFT_HOST, RIGHT_HOST, vec![0u8; 1024]);
    let inner_wire_len = inner.to_bytes().len();
    let (_, transit) = send_across(&left, &right, inner);

    assert_eq!(transit.len(), 1);
    // spi (4) + sequence (4) + ciphertext (inner packet) + tag (16)
    assert_eq!(transit[0].payload.len(), 4 + 4 + inner_wire_len + 16);
}

#[test]
fn transit_sees_only_opaque_envelopes() {
    let (left, right) = gateway_pair();

    let marker = b"CONFIDENTIAL APPLICATION DATA".to_vec();
    let inner = Packet::udp(LEFT_HOST, RIGHT_HOST, marker.clone());
    let (_, transit) = send_across(&left, &right, inner.clone());

    for outer in &transit {
        assert_eq!(outer.protocol, PROTO_TUNNEL);
        assert_eq!(outer.src, LEFT_GW);
        assert_eq!(outer.dst, RIGHT_GW);
        // Neither the application payload nor the inner header leaks
        assert!(!outer
            .payload
            .windows(marker.len())
            .any(|w| w == &marker[..]));
        let inner_bytes = inner.to_bytes();
        assert!(!outer
            .payload
            .windows(inner_bytes.len())
            .any(|w| w == &inner_bytes[..]));
    }
}

#[test]
fn transit_replay_is_rejected() {
    let (left, right) = gateway_pair();

    let mut wire = RecordingSink::default();
    for i in 0..3u8 {
        let inner = Packet::udp(LEFT_HOST, RIGHT_HOST, vec![i; 100]);
        left.process_egress(inner, &mut wire);
    }

    // A transit attacker records everything and replays it all afterwards
    let mut lan = RecordingSink::default();
    for envelope in wire.transmitted.clone() {
        right.process_ingress(envelope, &mut lan);
    }
    for envelope in wire.transmitted {
        right.process_ingress(envelope, &mut lan);
    }

    assert_eq!(lan.delivered.len(), 3);
    assert_eq!(right.drop_snapshot().replay_detected, 3);
}

#[test]
fn reordered_delivery_within_window_is_tolerated() {
    let (left, right) = gateway_pair();

    let mut wire = RecordingSink::default();
    for i in 0..8u8 {
        left.process_egress(Packet::udp(LEFT_HOST, RIGHT_HOST, vec![i; 32]), &mut wire);
    }

    // Deliver in a scrambled order, each exactly once
    let order = [5usize, 0, 7, 2, 6, 1, 4, 3];
    let mut lan = RecordingSink::default();
    for &index in &order {
        right.process_ingress(wire.transmitted[index].clone(), &mut lan);
    }

    assert_eq!(lan.delivered.len(), 8);
    assert_eq!(right.drop_snapshot().total(), 0);

    let mut markers: Vec<u8> = lan.delivered.iter().map(|p| p.payload[0]).collect();
    markers.sort_unstable();
    assert_eq!(markers, (0..8).collect::<Vec<_>>());
}

#[test]
fn single_bit_flip_anywhere_in_payload_is_dropped() {
    let (left, right) = gateway_pair();

    let mut wire = RecordingSink::default();
    left.process_egress(Packet::udp(LEFT_HOST, RIGHT_HOST, vec![0x33; 200]), &mut wire);
    let outer = wire.transmitted.pop().unwrap();

    // Flip one bit in the sequence field, the ciphertext body, and the tag
    let tamper_offsets = [4, 64, outer.payload.len() - 1];
    for (i, &offset) in tamper_offsets.iter().enumerate() {
        let mut tampered = outer.clone();
        tampered.payload[offset] ^= 0x01;

        let mut lan = RecordingSink::default();
        right.process_ingress(tampered, &mut lan);

        assert!(lan.delivered.is_empty(), "tamper at offset {} delivered", offset);
        assert_eq!(right.drop_snapshot().integrity_check_failed, i as u64 + 1);
    }

    // The untouched original still goes through
    let mut lan = RecordingSink::default();
    right.process_ingress(outer, &mut lan);
    assert_eq!(lan.delivered.len(), 1);
}

#[test]
fn wrong_secret_fails_integrity() {
    let (left, _) = gateway_pair();

    // Right gateway provisioned with a different secret for SPI 0x100
    let right = Gateway::new(
        GatewayConfig::new(RIGHT_GW, subnet(10, 1, 2)).with_sa(SaEntry::from_secret(
            0x100,
            Direction::Inbound,
            LEFT_GW,
            CipherAlgorithm::AesGcm128,
            b"a different secret",
        )),
    )
    .unwrap();

    let inner = Packet::udp(LEFT_HOST, RIGHT_HOST, vec![0x11; 64]);
    let (delivered, _) = send_across(&left, &right, inner);

    assert!(delivered.is_empty());
    assert_eq!(right.drop_snapshot().integrity_check_failed, 1);
}

#[test]
fn missing_sa_drop_versus_bypass() {
    // A route toward 10.1.3.0/24 exists but no SA covers its peer
    let routed = |policy| {
        GatewayConfig::new(LEFT_GW, subnet(10, 1, 1))
            .with_route(TunnelRoute::new(subnet(10, 1, 3), Ipv4Addr::new(10, 1, 200, 9)))
            .with_missing_sa_policy(policy)
    };
    let packet = Packet::udp(LEFT_HOST, Ipv4Addr::new(10, 1, 3, 7), vec![0xEE; 40]);

    // Default policy fails closed: nothing on the wire, one counted drop
    let gateway = Gateway::new(routed(MissingSaPolicy::Drop)).unwrap();
    let mut wire = RecordingSink::default();
    gateway.process_egress(packet.clone(), &mut wire);
    assert!(wire.transmitted.is_empty());
    assert_eq!(gateway.drop_snapshot().association_not_found, 1);

    // Bypass forwards the plaintext packet unchanged
    let gateway = Gateway::new(routed(MissingSaPolicy::Bypass)).unwrap();
    let mut wire = RecordingSink::default();
    gateway.process_egress(packet.clone(), &mut wire);
    assert_eq!(wire.transmitted, vec![packet]);
    assert_eq!(gateway.drop_snapshot().total(), 0);
}

#[test]
fn sequence_exhaustion_drops_and_counts() {
    // Outbound SA provisioned one envelope short of its final sequence
    let left = Gateway::new(
        GatewayConfig::new(LEFT_GW, subnet(10, 1, 1))
            .with_route(TunnelRoute::new(subnet(10, 1, 2), RIGHT_GW))
            .with_sa(
                SaEntry::from_secret(
                    0x100,
                    Direction::Outbound,
                    RIGHT_GW,
                    CipherAlgorithm::AesGcm128,
                    SECRET,
                )
                .with_initial_sequence(u32::MAX - 1),
            ),
    )
    .unwrap();

    let packet = Packet::udp(LEFT_HOST, RIGHT_HOST, vec![0x1F; 64]);

    // The last sequence number still goes out
    let mut wire = RecordingSink::default();
    left.process_egress(packet.clone(), &mut wire);
    assert_eq!(wire.transmitted.len(), 1);
    assert_eq!(wire.transmitted[0].payload[4..8], u32::MAX.to_be_bytes());

    // After that the SA is spent: silent drop, exactly one counter moves
    let mut wire = RecordingSink::default();
    left.process_egress(packet.clone(), &mut wire);
    left.process_egress(packet, &mut wire);
    assert!(wire.transmitted.is_empty());

    let drops = left.drop_snapshot();
    assert_eq!(drops.sequence_exhausted, 2);
    assert_eq!(drops.total(), 2);
}

#[test]
fn bidirectional_traffic_keeps_independent_counters() {
    let (left, right) = gateway_pair();

    for i in 0..50u8 {
        let (delivered, transit) =
            send_across(&left, &right, Packet::udp(LEFT_HOST, RIGHT_HOST, vec![i; 16]));
        assert_eq!(delivered.len(), 1);
        assert_eq!(transit[0].payload[..4], 0x100u32.to_be_bytes());

        let (delivered, transit) =
            send_across(&right, &left, Packet::udp(RIGHT_HOST, LEFT_HOST, vec![i; 16]));
        assert_eq!(delivered.len(), 1);
        assert_eq!(transit[0].payload[..4], 0x200u32.to_be_bytes());
    }

    assert_eq!(left.drop_snapshot().total(), 0);
    assert_eq!(right.drop_snapshot().total(), 0);
}

#[test]
fn chacha20_tunnel_round_trip() {
    let left = Gateway::new(
        GatewayConfig::new(LEFT_GW, subnet(10, 1, 1))
            .with_route(TunnelRoute::new(subnet(10, 1, 2), RIGHT_GW))
            .with_sa(SaEntry::from_secret(
                0x300,
                Direction::Outbound,
                RIGHT_GW,
                CipherAlgorithm::ChaCha20Poly1305,
                SECRET,
            )),
    )
    .unwrap();
    let right = Gateway::new(
        GatewayConfig::new(RIGHT_GW, subnet(10, 1, 2)).with_sa(SaEntry::from_secret(
            0x300,
            Direction::Inbound,
            LEFT_GW,
            CipherAlgorithm::ChaCha20Poly1305,
            SECRET,
        )),
    )
    .unwrap();

    let inner = Packet::udp(LEFT_HOST, RIGHT_HOST, vec![0x77; 512]);
    let (delivered, _) = send_across(&left, &right, inner.clone());
    assert_eq!(delivered, vec![inner]);
}
