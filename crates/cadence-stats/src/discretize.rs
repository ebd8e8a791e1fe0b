//! Discretization of time-weighted signals into fixed-width
//! pseudo-observations.
//!
//! A time-weighted variable holds a value until it changes. Its
//! observations are areas, not values: the [`Discretizer`] accumulates
//! the area under the piecewise-constant signal and, at every tick
//! boundary, emits `area / interval`, the signal's average over that
//! tick. Work happens lazily when the signal changes.

use crate::error::StatsError;

/// Number of pseudo-observations targeted when no interval is configured.
pub const DEFAULT_TARGET_BATCHES: f64 = 512.0;

/// Default tick width for a run: the observation window divided by
/// [`DEFAULT_TARGET_BATCHES`]. `None` for an open horizon or an empty
/// window.
pub fn default_interval(replication_length: f64, warm_up_length: f64) -> Option<f64> {
    let window = replication_length - warm_up_length;
    (window.is_finite() && window > 0.0).then(|| window / DEFAULT_TARGET_BATCHES)
}

/// Converts a piecewise-constant signal into per-tick averages.
#[derive(Clone, Debug, PartialEq)]
pub struct Discretizer {
    interval: f64,
    next_tick: f64,
    last_time: f64,
    value: f64,
    area: f64,
}

impl Discretizer {
    /// Start at `start` holding `value`, with ticks every `interval`.
    pub fn new(interval: f64, start: f64, value: f64) -> Result<Self, StatsError> {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(StatsError::Interval { value: interval });
        }
        Ok(Self {
            interval,
            next_tick: start + interval,
            last_time: start,
            value,
            area: 0.0,
        })
    }

    /// Tick width.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// The value currently held.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// End of the tick in progress.
    pub fn next_tick(&self) -> f64 {
        self.next_tick
    }

    /// Advance to `time` holding the current value, emitting one average
    /// per completed tick.
    pub fn advance_to(&mut self, time: f64, mut emit: impl FnMut(f64)) {
        if time <= self.last_time {
            return;
        }
        while time >= self.next_tick {
            self.area += self.value * (self.next_tick - self.last_time);
            emit(self.area / self.interval);
            self.area = 0.0;
            self.last_time = self.next_tick;
            self.next_tick += self.interval;
        }
        self.area += self.value * (time - self.last_time);
        self.last_time = time;
    }

    /// The signal changed to `value` at `time`.
    pub fn update(&mut self, time: f64, value: f64, emit: impl FnMut(f64)) {
        self.advance_to(time, emit);
        self.value = value;
    }

    /// Discard the tick in progress and restart ticking at `time`,
    /// keeping the held value.
    pub fn restart(&mut self, time: f64) {
        self.area = 0.0;
        self.last_time = time;
        self.next_tick = time + self.interval;
    }

    /// Restart at `time` holding `value`.
    pub fn reset(&mut self, time: f64, value: f64) {
        self.restart(time);
        self.value = value;
    }
}
