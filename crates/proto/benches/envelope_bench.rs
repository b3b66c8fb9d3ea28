//! Envelope codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use espgate_proto::tunnel::{codec, CipherAlgorithm, Direction, SecurityAssociation};
use std::net::Ipv4Addr;

fn make_sa(direction: Direction, cipher: CipherAlgorithm) -> SecurityAssociation {
    SecurityAssociation::new(
        0x100,
        direction,
        Ipv4Addr::new(10, 1, 200, 2),
        cipher,
        vec![0x42; cipher.key_len()],
        vec![0x24; 32],
        64,
    )
    .unwrap()
}

fn bench_encapsulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("encapsulate");

    for size in [64usize, 512, 1024, 4096] {
        let plaintext = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("aes_gcm_128/{}", size), |b| {
            let mut sa = make_sa(Direction::Outbound, CipherAlgorithm::AesGcm128);
            b.iter(|| codec::encapsulate(&mut sa, black_box(&plaintext)).unwrap());
        });
        group.bench_function(format!("chacha20_poly1305/{}", size), |b| {
            let mut sa = make_sa(Direction::Outbound, CipherAlgorithm::ChaCha20Poly1305);
            b.iter(|| codec::encapsulate(&mut sa, black_box(&plaintext)).unwrap());
        });
    }
    group.finish();
}

fn bench_decapsulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("decapsulate");

    for size in [64usize, 1024] {
        let plaintext = vec![0xAB; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("aes_gcm_128/{}", size), |b| {
            let mut tx = make_sa(Direction::Outbound, CipherAlgorithm::AesGcm128);
            let envelope = codec::encapsulate(&mut tx, &plaintext).unwrap();
            b.iter(|| {
                // Fresh inbound SA each pass so the replay window accepts
                let mut rx = make_sa(Direction::Inbound, CipherAlgorithm::AesGcm128);
                codec::decapsulate(&mut rx, black_box(&envelope)).unwrap()
            });
        });
    }
    group.finish();
}

fn bench_replay_window(c: &mut Criterion) {
    use espgate_proto::tunnel::ReplayWindow;

    c.bench_function("replay_window/in_order", |b| {
        b.iter(|| {
            let mut window = ReplayWindow::default();
            for seq in 1..=1000u32 {
                window.check_and_update(black_box(seq)).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_encapsulate, bench_decapsulate, bench_replay_window);
criterion_main!(benches);
