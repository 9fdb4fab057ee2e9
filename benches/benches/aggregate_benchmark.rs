//! Aggregation throughput benchmarks.
//!
//! Run with: `cargo bench --package tickscan-bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use tickscan_aggregate::TickAggregator;
use tickscan_bench::Workload;
use tickscan_types::Interval;

/// (name, symbols, duration) covering a small and a wide universe.
const SCENARIOS: &[(&str, usize, i64)] = &[("50x1h", 50, 3_600_000), ("500x15m", 500, 900_000)];

fn ingest_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    group.sample_size(20);

    for &(name, symbols, duration_ms) in SCENARIOS {
        let workload = Workload::random_walk(symbols, duration_ms, 5_000, 42);
        group.throughput(Throughput::Elements(workload.ticks.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &workload, |b, workload| {
            b.iter(|| {
                let aggregator = TickAggregator::new();
                black_box(workload.load(&aggregator))
            });
        });
    }

    group.finish();
}

fn extract_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    group.sample_size(20);

    for &(name, symbols, duration_ms) in SCENARIOS {
        let workload = Workload::random_walk(symbols, duration_ms, 5_000, 42);
        let aggregator = TickAggregator::new();
        workload.load(&aggregator);

        group.throughput(Throughput::Elements(symbols as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &workload, |b, workload| {
            b.iter(|| black_box(aggregator.extract_intervals_at(workload.end_ms, Interval::all())));
        });
    }

    group.finish();
}

criterion_group!(benches, ingest_benchmark, extract_benchmark);
criterion_main!(benches);
