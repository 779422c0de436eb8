//! Sample extraction benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use netsdr_protocol::extract;

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");

    // One full device block
    let body = Bytes::from(
        (0..8190u32)
            .map(|i| (i % 251) as u8)
            .collect::<Vec<u8>>(),
    );

    for bits in [8u16, 16, 24, 32] {
        group.throughput(Throughput::Bytes(body.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bits), &body, |b, body| {
            b.iter(|| {
                let sum: u64 = extract(bits, body.clone())
                    .unwrap()
                    .map(u64::from)
                    .sum();
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_extract_collect(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_collect");
    let body = Bytes::from(vec![0x5Au8; 8190]);

    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("16", |b| {
        b.iter(|| black_box(extract(16, body.clone()).unwrap().collect::<Vec<_>>()));
    });

    group.finish();
}

criterion_group!(benches, bench_extract, bench_extract_collect);

criterion_main!(benches);
