use std::io::Cursor;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use stalk_proto::{Command, Response, TubeStats};

/// Encode a `put` with a typical envelope-sized payload.
fn bench_put_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("command");
    let payload = br#"{"body":"O:36:\"App\\Message\\SendEmail\":1:{s:2:\"to\";}","headers":{"type":"App\\Message\\SendEmail"}}"#;

    group.bench_function("encode_put", |b| {
        let mut buf = Vec::with_capacity(256);
        b.iter(|| {
            buf.clear();
            let command = Command::put(1024, Duration::ZERO, Duration::from_secs(90), payload);
            command.write_to(&mut buf).unwrap();
            black_box(&buf);
        });
    });

    group.bench_function("decode_put", |b| {
        let mut encoded = Vec::new();
        Command::put(1024, Duration::ZERO, Duration::from_secs(90), payload)
            .write_to(&mut encoded)
            .unwrap();
        b.iter_batched(
            || Cursor::new(encoded.clone()),
            |mut input| black_box(Command::read_from(&mut input).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

/// Decode the two replies on the consumer hot path.
fn bench_response_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("response");

    group.bench_function("decode_reserved", |b| {
        let mut encoded = Vec::new();
        Response::Reserved {
            id: 123_456,
            data: vec![b'x'; 512],
        }
        .write_to(&mut encoded)
        .unwrap();
        b.iter_batched(
            || Cursor::new(encoded.clone()),
            |mut input| black_box(Response::read_from(&mut input).unwrap()),
            BatchSize::SmallInput,
        );
    });

    group.bench_function("parse_stats_tube", |b| {
        let document = TubeStats {
            name: "emails".to_string(),
            current_jobs_ready: 42,
            ..TubeStats::default()
        }
        .to_yaml()
        .unwrap();
        b.iter(|| black_box(TubeStats::parse(black_box(&document)).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_put_encode, bench_response_decode);
criterion_main!(benches);
