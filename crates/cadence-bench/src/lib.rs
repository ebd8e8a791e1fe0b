//! Benchmark profiles and utilities for the Cadence simulation framework.
//!
//! - [`mm1_profile`]: a single-server queue experiment with a warm-up
//! - [`filled_calendar`]: a calendar preloaded with spread-out events
//! - [`spread_delays`]: deterministic, well-mixed event delays

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cadence_calendar::{EventCalendar, Schedule};
use cadence_core::ComponentId;
use cadence_engine::{ExperimentConfig, Simulation};
use cadence_model::Model;
use cadence_test_utils::fixtures::Mm1Queue;

/// Build an M/M/1 experiment: arrival mean 1.0, service mean 0.8,
/// warm-up at 10% of `length`.
pub fn mm1_profile(replications: u32, length: f64, seed: u64) -> Simulation {
    let mut model = Model::new("mm1_profile");
    let root = model.root();
    Mm1Queue::build(&mut model, root, "queue", 1.0, 0.8).unwrap();
    Simulation::new(
        model,
        ExperimentConfig {
            name: "bench".to_string(),
            replications,
            replication_length: length,
            warm_up_length: length / 10.0,
            seed: Some(seed),
            ..ExperimentConfig::default()
        },
    )
    .unwrap()
}

/// Generate `n` delays in `[0, scale)`.
///
/// Uses the golden-ratio sequence so consecutive delays land far apart
/// and no two runs differ.
pub fn spread_delays(n: usize, scale: f64) -> Vec<f64> {
    const PHI: f64 = 0.618_033_988_749_895;
    (1..=n).map(|i| (i as f64 * PHI).fract() * scale).collect()
}

/// A calendar holding `n` events at [`spread_delays`] times.
pub fn filled_calendar(n: usize) -> EventCalendar<u32> {
    let mut calendar = EventCalendar::new();
    for (i, delay) in spread_delays(n, 1000.0).into_iter().enumerate() {
        calendar
            .schedule(Schedule::new(ComponentId(0), i as u32, delay))
            .unwrap();
    }
    calendar
}
