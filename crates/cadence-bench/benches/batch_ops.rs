//! Criterion micro-benchmarks for batch means and discretization.

use std::hint::black_box;

use cadence_bench::spread_delays;
use cadence_stats::{BatchStatistic, BatchingConfig, Discretizer, Statistic};
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_batch_collect_100k(c: &mut Criterion) {
    let xs = spread_delays(100_000, 5.0);
    c.bench_function("batch_collect_100k", |b| {
        b.iter(|| {
            let mut stat = BatchStatistic::new(BatchingConfig::default()).unwrap();
            for &x in &xs {
                stat.collect(x);
            }
            black_box(stat.batch_mean_statistic().half_width());
        });
    });
}

fn bench_statistic_collect_100k(c: &mut Criterion) {
    let xs = spread_delays(100_000, 5.0);
    c.bench_function("statistic_collect_100k", |b| {
        b.iter(|| {
            let mut stat = Statistic::new();
            for &x in &xs {
                stat.collect(x);
            }
            black_box(stat.lag1_correlation());
        });
    });
}

fn bench_discretize_100k(c: &mut Criterion) {
    let values = spread_delays(100_000, 10.0);
    c.bench_function("discretize_100k_changes", |b| {
        b.iter(|| {
            let mut d = Discretizer::new(0.5, 0.0, 0.0).unwrap();
            let mut ticks = 0u64;
            for (i, &v) in values.iter().enumerate() {
                d.update(i as f64 * 0.1, v, |x| {
                    black_box(x);
                    ticks += 1;
                });
            }
            black_box(ticks);
        });
    });
}

criterion_group!(
    benches,
    bench_batch_collect_100k,
    bench_statistic_collect_100k,
    bench_discretize_100k
);
criterion_main!(benches);
