//! Benchmarks for the frame codec and the envelope
//!
//! Measures payload decode/encode and envelope seal/open across payload sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use loraraw_rs::loraraw::crypto::{open_with_key, EncryptionSession, EnvelopeKey};
use loraraw_rs::payload::decoder::decode_frame;
use loraraw_rs::payload::encoder::FrameEncoder;
use loraraw_rs::payload::registry::keys;

const FIELD_COUNTS: [usize; 4] = [1, 8, 32, 96];

/// Payload with `count` temperature/humidity pairs
fn build_payload(count: usize) -> Vec<u8> {
    let mut encoder = FrameEncoder::uplink();
    for i in 0..count {
        encoder
            .push(keys::TEMPERATURE, 1, 20.0 + i as f64 / 10.0)
            .expect("bench payload");
        encoder
            .push(keys::RELATIVE_HUMIDITY, 1, 40.0 + i as f64 / 10.0)
            .expect("bench payload");
    }
    encoder.finish()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_decode");

    for count in FIELD_COUNTS {
        let payload = build_payload(count);
        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count * 2), &payload, |b, payload| {
            b.iter(|| decode_frame(black_box(payload)))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_encode");

    for count in FIELD_COUNTS {
        group.bench_with_input(BenchmarkId::from_parameter(count * 2), &count, |b, &count| {
            b.iter(|| build_payload(black_box(count)))
        });
    }

    group.finish();
}

fn bench_envelope(c: &mut Criterion) {
    let key = EnvelopeKey::from_bytes(&[0x5A; 16]).unwrap();
    let address = [0xCB, 0xB2, 0x72, 0xEA];
    let session = EncryptionSession::new();
    let mut group = c.benchmark_group("envelope");

    for count in FIELD_COUNTS {
        let payload = build_payload(count);
        if payload.len() > 255 {
            continue;
        }
        group.throughput(Throughput::Bytes(payload.len() as u64));

        group.bench_with_input(BenchmarkId::new("seal", payload.len()), &payload, |b, payload| {
            b.iter(|| session.seal(&address, black_box(payload), &key, 0).unwrap())
        });

        let envelope = session.seal(&address, &payload, &key, 0).unwrap();
        group.bench_with_input(BenchmarkId::new("open", payload.len()), &envelope, |b, envelope| {
            b.iter(|| open_with_key(black_box(envelope), &key).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_envelope);
criterion_main!(benches);
