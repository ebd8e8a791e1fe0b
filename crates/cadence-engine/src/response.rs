//! Response elements: the values a model reports on.
//!
//! Both kinds reset on warm-up, fold their replication result into an
//! across-replication [`Statistic`] at replication end, and broadcast
//! every change as a value notification so collectors can follow them.

use cadence_model::{Category, Context, ElementSpec, ModelElement};
use cadence_stats::Statistic;

// ── ResponseVariable ──────────────────────────────────────────────

/// An observation-based response, such as a customer's time in system.
#[derive(Clone, Debug)]
pub struct ResponseVariable {
    value: f64,
    within: Statistic,
    across: Statistic,
}

impl ResponseVariable {
    /// An empty response.
    pub fn new() -> Self {
        Self {
            value: f64::NAN,
            within: Statistic::new(),
            across: Statistic::new(),
        }
    }

    /// A component spec tagged as a response.
    pub fn spec(name: impl Into<String>) -> ElementSpec {
        ElementSpec::new(name).category(Category::Response)
    }

    /// Record one observation at the current time.
    pub fn record(&mut self, ctx: &mut Context<'_>, x: f64) {
        let previous = self.value;
        self.value = x;
        self.within.collect(x);
        ctx.notify_value(x, previous);
    }

    /// The last observation; NaN before the first.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Observations since the replication started or warmed up.
    pub fn within_replication(&self) -> &Statistic {
        &self.within
    }

    /// One replication average per completed replication.
    pub fn across_replications(&self) -> &Statistic {
        &self.across
    }
}

impl Default for ResponseVariable {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelElement for ResponseVariable {
    fn before_experiment(&mut self, _ctx: &mut Context<'_>) {
        self.across.reset();
    }

    fn before_replication(&mut self, _ctx: &mut Context<'_>) {
        self.value = f64::NAN;
        self.within.reset();
    }

    fn warm_up(&mut self, _ctx: &mut Context<'_>) {
        self.within.reset();
    }

    fn replication_ended(&mut self, _ctx: &mut Context<'_>) {
        if self.within.count() > 0 {
            self.across.collect(self.within.average());
        }
    }
}

// ── TimeWeighted ──────────────────────────────────────────────────

/// A piecewise-constant response averaged over time, such as a queue
/// length.
#[derive(Clone, Debug)]
pub struct TimeWeighted {
    initial: f64,
    value: f64,
    start: f64,
    last_change: f64,
    area: f64,
    across: Statistic,
}

impl TimeWeighted {
    /// A response that starts every replication at `initial`.
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            value: initial,
            start: 0.0,
            last_change: 0.0,
            area: 0.0,
            across: Statistic::new(),
        }
    }

    /// A component spec tagged as time-weighted.
    pub fn spec(name: impl Into<String>) -> ElementSpec {
        ElementSpec::new(name).category(Category::TimeWeighted)
    }

    /// Change the value at the current time.
    pub fn set(&mut self, ctx: &mut Context<'_>, x: f64) {
        let now = ctx.now();
        self.area += self.value * (now - self.last_change);
        self.last_change = now;
        let previous = self.value;
        self.value = x;
        ctx.notify_value(x, previous);
    }

    /// Add `delta` to the value at the current time.
    pub fn add(&mut self, ctx: &mut Context<'_>, delta: f64) {
        self.set(ctx, self.value + delta);
    }

    /// The current value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Time average from the replication start (or warm-up) to `now`;
    /// NaN when no time has passed.
    pub fn average(&self, now: f64) -> f64 {
        let elapsed = now - self.start;
        if elapsed <= 0.0 {
            return f64::NAN;
        }
        (self.area + self.value * (now - self.last_change)) / elapsed
    }

    /// One time average per completed replication.
    pub fn across_replications(&self) -> &Statistic {
        &self.across
    }

    fn restart(&mut self, now: f64) {
        self.start = now;
        self.last_change = now;
        self.area = 0.0;
    }
}

impl ModelElement for TimeWeighted {
    fn before_experiment(&mut self, _ctx: &mut Context<'_>) {
        self.across.reset();
    }

    fn before_replication(&mut self, ctx: &mut Context<'_>) {
        self.restart(ctx.now());
        let previous = self.value;
        self.value = self.initial;
        ctx.notify_value(self.initial, previous);
    }

    fn warm_up(&mut self, ctx: &mut Context<'_>) {
        self.restart(ctx.now());
    }

    fn replication_ended(&mut self, ctx: &mut Context<'_>) {
        let average = self.average(ctx.now());
        if !average.is_nan() {
            self.across.collect(average);
        }
    }

    fn apply_control(&mut self, key: &str, value: f64) -> bool {
        match key {
            "initial" => {
                self.initial = value;
                true
            }
            _ => false,
        }
    }
}
