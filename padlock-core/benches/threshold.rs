//! Benchmarks for threshold-OTP encoding
//!
//! Run with: cargo bench --package padlock-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use padlock_core::{ChunkSink, CollectionLabel, Encoder, FactoryFn, MixedRandom, Params, Result};
use std::io::{Cursor, Write};

/// Generate test data of specified size
fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Sink discarding record bytes, so the benchmark measures the core alone
struct NullSink;

impl Write for NullSink {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ChunkSink for NullSink {
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Benchmark encoding at various data sizes for a 3-of-5 scheme
fn bench_encode(c: &mut Criterion) {
    let params = Params::new(5, 3).unwrap().with_chunk_bytes(1024 * 1024);
    let encoder = Encoder::new(params).unwrap();
    let rng = MixedRandom::with_default_sources().unwrap();

    let mut group = c.benchmark_group("threshold_encode");

    for size in [
        64 * 1024,       // 64 KB
        1024 * 1024,     // 1 MB
        4 * 1024 * 1024, // 4 MB
    ] {
        let data = generate_data(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("3-of-5", format!("{}KB", size / 1024)),
            &data,
            |b, data| {
                b.iter(|| {
                    let mut factory =
                        FactoryFn(|_label: &CollectionLabel, _chunk: u64, _tag: &str| {
                            Ok(Box::new(NullSink) as Box<dyn ChunkSink>)
                        });
                    encoder
                        .encode(
                            &mut Cursor::new(black_box(data.clone())),
                            &rng,
                            &mut factory,
                            "bin",
                        )
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

/// Benchmark the random mixer at various request sizes
fn bench_mixer(c: &mut Criterion) {
    let rng = MixedRandom::with_default_sources().unwrap();

    let mut group = c.benchmark_group("mixer_fill");

    for size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        let mut buf = vec![0u8; size];

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}KB", size / 1024)),
            &size,
            |b, _| b.iter(|| rng.fill(black_box(&mut buf)).unwrap()),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_mixer);
criterion_main!(benches);
