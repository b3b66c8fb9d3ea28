//! Two-LAN VPN demo
//!
//! Builds the reference topology: LAN 10.1.1.0/24 behind gateway
//! 10.1.100.1 and LAN 10.1.2.0/24 behind gateway 10.1.200.2, with a transit
//! router between them that only ever forwards envelopes. A client on the
//! second LAN sends a 1024-byte UDP echo request to a server on the first;
//! the demo prints what each vantage point observes, then injects a replay
//! and a tampered envelope to show the drop policy at work.
//!
//! Run with:
//! ```sh
//! RUST_LOG=espgate=debug cargo run --example two_lan_vpn
//! ```

use espgate_platform::{ManualClock, Packet, PacketSink, Subnet};
use espgate_proto::tunnel::{
    CipherAlgorithm, Direction, Gateway, GatewayConfig, SaEntry, TunnelRoute,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

const SECRET: &[u8] = b"demo pre-shared secret";
const ECHO_PAYLOAD_LEN: usize = 1024;

const LEFT_GW: Ipv4Addr = Ipv4Addr::new(10, 1, 100, 1);
const RIGHT_GW: Ipv4Addr = Ipv4Addr::new(10, 1, 200, 2);
const SERVER: Ipv4Addr = Ipv4Addr::new(10, 1, 1, 1);
const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 1, 2, 1);

#[derive(Debug, Default)]
struct VecSink {
    transmitted: Vec<Packet>,
    delivered: Vec<Packet>,
}

impl PacketSink for VecSink {
    fn transmit(&mut self, packet: Packet) {
        self.transmitted.push(packet);
    }
    fn deliver(&mut self, packet: Packet) {
        self.delivered.push(packet);
    }
}

fn subnet(a: u8, b: u8, c: u8) -> Subnet {
    Subnet::new(Ipv4Addr::new(a, b, c, 0), 24).expect("valid subnet")
}

fn hex_preview(bytes: &[u8]) -> String {
    let preview: Vec<String> = bytes.iter().take(16).map(|b| format!("{:02x}", b)).collect();
    format!("{} ... ({} bytes)", preview.join(" "), bytes.len())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "espgate=info".into()),
        )
        .init();

    // One virtual clock drives both gateways, as the event scheduler would
    let clock = Arc::new(ManualClock::new());

    let left = Gateway::new(
        GatewayConfig::new(LEFT_GW, subnet(10, 1, 1))
            .with_clock(clock.clone())
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
            )),
    )?;

    let right = Gateway::new(
        GatewayConfig::new(RIGHT_GW, subnet(10, 1, 2))
            .with_clock(clock.clone())
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
            )),
    )?;

    println!("topology:");
    println!("  LAN {}  --  gateway {}  --  transit  --  gateway {}  --  LAN {}",
        left.protected_subnet(), LEFT_GW, RIGHT_GW, right.protected_subnet());
    println!();

    // Client on the right LAN sends an echo request to the server
    let request = Packet::udp(CLIENT, SERVER, vec![0x5A; ECHO_PAYLOAD_LEN]);
    println!("client {} -> server {}: {} byte UDP payload", CLIENT, SERVER, ECHO_PAYLOAD_LEN);

    let mut wire = VecSink::default();
    right.process_egress(request, &mut wire);
    let envelope = wire.transmitted.pop().expect("envelope on the wire");

    println!("transit observes: {} -> {} proto {}", envelope.src, envelope.dst, envelope.protocol);
    println!("                  {}", hex_preview(&envelope.payload));

    let mut lan = VecSink::default();
    left.process_ingress(envelope.clone(), &mut lan);
    let delivered = lan.delivered.pop().expect("inner packet delivered");
    println!("server receives:  {} -> {}, {} byte payload", delivered.src, delivered.dst, delivered.payload.len());
    println!();

    // Echo the payload back, one virtual millisecond later
    clock.advance(Duration::from_millis(1));
    let response = Packet::udp(SERVER, CLIENT, delivered.payload);
    let mut wire = VecSink::default();
    left.process_egress(response, &mut wire);
    let mut lan = VecSink::default();
    right.process_ingress(wire.transmitted.pop().expect("response envelope"), &mut lan);
    let echoed = lan.delivered.pop().expect("echo delivered");
    println!("client receives echo: {} bytes from {}", echoed.payload.len(), echoed.src);
    println!();

    // A transit attacker replays the recorded request envelope
    clock.advance(Duration::from_millis(1));
    let mut lan = VecSink::default();
    left.process_ingress(envelope.clone(), &mut lan);
    println!("replayed envelope delivered: {}", !lan.delivered.is_empty());

    // And injects a single-bit corruption
    let mut tampered = envelope;
    let last = tampered.payload.len() - 1;
    tampered.payload[last] ^= 0x01;
    let mut lan = VecSink::default();
    left.process_ingress(tampered, &mut lan);
    println!("tampered envelope delivered: {}", !lan.delivered.is_empty());
    println!();

    println!("left gateway  {}", left.drop_snapshot());
    println!("right gateway {}", right.drop_snapshot());

    Ok(())
}
