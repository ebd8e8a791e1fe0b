//! Criterion micro-benchmarks for event calendar scheduling and dispatch.

use std::hint::black_box;

use cadence_bench::{filled_calendar, spread_delays};
use cadence_calendar::{EventCalendar, Schedule};
use cadence_core::ComponentId;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

fn bench_schedule_10k(c: &mut Criterion) {
    let delays = spread_delays(10_000, 1000.0);
    c.bench_function("calendar_schedule_10k", |b| {
        b.iter(|| {
            let mut calendar = EventCalendar::new();
            for (i, &delay) in delays.iter().enumerate() {
                calendar
                    .schedule(Schedule::new(ComponentId(0), i as u32, delay))
                    .unwrap();
            }
            black_box(calendar.len());
        });
    });
}

fn bench_drain_10k(c: &mut Criterion) {
    c.bench_function("calendar_drain_10k", |b| {
        b.iter_batched(
            || filled_calendar(10_000),
            |mut calendar| {
                while let Some(e) = calendar.advance() {
                    black_box(e.action());
                }
            },
            BatchSize::LargeInput,
        );
    });
}

/// Hold model: a fixed population of 1000 events, each executed event
/// schedules its successor.
fn bench_hold_1k(c: &mut Criterion) {
    let delays = spread_delays(10_000, 10.0);
    c.bench_function("calendar_hold_1k_x10k", |b| {
        b.iter_batched(
            || filled_calendar(1000),
            |mut calendar| {
                for &delay in &delays {
                    let tag = match calendar.advance() {
                        Some(e) => *e.action(),
                        None => break,
                    };
                    calendar
                        .schedule(Schedule::new(ComponentId(0), tag, delay))
                        .unwrap();
                }
                black_box(calendar.now());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_cancel_half(c: &mut Criterion) {
    c.bench_function("calendar_cancel_half_10k", |b| {
        b.iter_batched(
            || {
                let calendar = filled_calendar(10_000);
                let ids: Vec<_> = calendar.iter().map(|e| e.id()).step_by(2).collect();
                (calendar, ids)
            },
            |(mut calendar, ids)| {
                for id in ids {
                    calendar.cancel(id);
                }
                while calendar.advance().is_some() {}
                black_box(calendar.stats());
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(
    benches,
    bench_schedule_10k,
    bench_drain_10k,
    bench_hold_1k,
    bench_cancel_half
);
criterion_main!(benches);
