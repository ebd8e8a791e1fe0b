//! Criterion benchmarks for whole experiments on the M/M/1 profile.

use std::hint::black_box;

use cadence_bench::mm1_profile;
use cadence_stats::BatchingConfig;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_mm1_single(c: &mut Criterion) {
    c.bench_function("mm1_1x10k", |b| {
        b.iter_batched(
            || mm1_profile(1, 10_000.0, 42),
            |mut sim| {
                let report = sim.run().unwrap();
                black_box(report.total_events());
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_mm1_replications(c: &mut Criterion) {
    c.bench_function("mm1_10x1k", |b| {
        b.iter_batched(
            || mm1_profile(10, 1000.0, 42),
            |mut sim| {
                let report = sim.run().unwrap();
                black_box(report.total_events());
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_mm1_batching(c: &mut Criterion) {
    c.bench_function("mm1_1x10k_batching", |b| {
        b.iter_batched(
            || {
                let mut sim = mm1_profile(1, 10_000.0, 42);
                let responses = sim
                    .model()
                    .components_in(cadence_model::Category::TimeWeighted)
                    .into_iter()
                    .chain(sim.model().components_in(cadence_model::Category::Response));
                let responses: Vec<_> = responses.collect();
                for id in responses {
                    sim.attach_batching(id, BatchingConfig::default()).unwrap();
                }
                sim
            },
            |mut sim| {
                let report = sim.run().unwrap();
                black_box(report.total_events());
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_mm1_single,
    bench_mm1_replications,
    bench_mm1_batching
);
criterion_main!(benches);
