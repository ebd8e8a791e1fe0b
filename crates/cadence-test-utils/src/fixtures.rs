//! Reusable model elements.
//!
//! - [`Repeater`]: fires a handler event every `interval`.
//! - [`StopAt`]: stops the replication at a fixed time.
//! - [`Toggle`]: flips a [`TimeWeighted`] child between two values.
//! - [`Mm1Queue`]: a single-server queue with exponential arrivals and
//!   service, reporting number in system and time in system.

use std::collections::VecDeque;

use cadence_core::{ComponentId, ModelError, StreamId};
use cadence_engine::{ResponseVariable, TimeWeighted};
use cadence_model::{Action, Category, Context, ElementSpec, Model, ModelElement, ModelEvent};

/// Fires a handler event every `interval`, starting at `interval`.
pub struct Repeater {
    pub interval: f64,
    pub fired: Vec<f64>,
}

impl Repeater {
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            fired: Vec::new(),
        }
    }
}

impl ModelElement for Repeater {
    fn initialize(&mut self, ctx: &mut Context<'_>) {
        self.fired.clear();
        ctx.schedule_handler(0, self.interval).expect("schedule");
    }

    fn handle_event(&mut self, ctx: &mut Context<'_>, _event: &ModelEvent) {
        self.fired.push(ctx.now());
        ctx.schedule_handler(0, self.interval).expect("schedule");
    }

    fn apply_control(&mut self, key: &str, value: f64) -> bool {
        if key == "interval" && value > 0.0 {
            self.interval = value;
            true
        } else {
            false
        }
    }
}

/// Stops the replication at `time`.
pub struct StopAt {
    pub time: f64,
}

impl ModelElement for StopAt {
    fn initialize(&mut self, ctx: &mut Context<'_>) {
        ctx.schedule(Action::callback(|ctx, _| ctx.stop_replication()), self.time)
            .expect("schedule");
    }
}

/// Alternates a time-weighted child between `low` and `high` every
/// `period`, starting at `low`.
pub struct Toggle {
    pub level: ComponentId,
    pub low: f64,
    pub high: f64,
    pub period: f64,
    high_now: bool,
}

impl Toggle {
    /// Add a toggle named `name` with its `TimeWeighted` child
    /// `<name>.level` under `parent`. Returns `(toggle, level)`.
    pub fn build(
        model: &mut Model,
        parent: ComponentId,
        name: &str,
        low: f64,
        high: f64,
        period: f64,
    ) -> Result<(ComponentId, ComponentId), ModelError> {
        let toggle = model.add_element(
            parent,
            ElementSpec::new(name),
            Self {
                level: parent,
                low,
                high,
                period,
                high_now: false,
            },
        )?;
        let level = model.add_element(
            toggle,
            TimeWeighted::spec(format!("{name}.level")),
            TimeWeighted::new(low),
        )?;
        if let Some(t) = model.element_mut::<Toggle>(toggle) {
            t.level = level;
        }
        Ok((toggle, level))
    }
}

impl ModelElement for Toggle {
    fn initialize(&mut self, ctx: &mut Context<'_>) {
        self.high_now = false;
        ctx.schedule_handler(0, self.period).expect("schedule");
    }

    fn handle_event(&mut self, ctx: &mut Context<'_>, _event: &ModelEvent) {
        self.high_now = !self.high_now;
        let x = if self.high_now { self.high } else { self.low };
        ctx.with_element::<TimeWeighted, _>(self.level, |tw, ctx| tw.set(ctx, x))
            .expect("level");
        ctx.schedule_handler(0, self.period).expect("schedule");
    }
}

const ARRIVAL: u32 = 0;
const DEPARTURE: u32 = 1;

/// Single-server FIFO queue.
pub struct Mm1Queue {
    pub arrival_mean: f64,
    pub service_mean: f64,
    pub arrivals: StreamId,
    pub services: StreamId,
    pub in_system: ComponentId,
    pub time_in_system: ComponentId,
    waiting: VecDeque<f64>,
    in_service: Option<f64>,
    pub served: u64,
}

impl Mm1Queue {
    /// Add a queue named `name` under `parent`, with children
    /// `<name>.in_system` (time-weighted) and `<name>.time_in_system`
    /// (observation-based). Returns the queue's id.
    pub fn build(
        model: &mut Model,
        parent: ComponentId,
        name: &str,
        arrival_mean: f64,
        service_mean: f64,
    ) -> Result<ComponentId, ModelError> {
        let arrivals = model.create_stream();
        let services = model.create_stream();
        let queue = model.add_element(
            parent,
            ElementSpec::new(name).category(Category::RandomElement),
            Self {
                arrival_mean,
                service_mean,
                arrivals,
                services,
                in_system: parent,
                time_in_system: parent,
                waiting: VecDeque::new(),
                in_service: None,
                served: 0,
            },
        )?;
        let in_system = model.add_element(
            queue,
            TimeWeighted::spec(format!("{name}.in_system")),
            TimeWeighted::new(0.0),
        )?;
        let time_in_system = model.add_element(
            queue,
            ResponseVariable::spec(format!("{name}.time_in_system")),
            ResponseVariable::new(),
        )?;
        if let Some(q) = model.element_mut::<Mm1Queue>(queue) {
            q.in_system = in_system;
            q.time_in_system = time_in_system;
        }
        Ok(queue)
    }

    fn draw(ctx: &mut Context<'_>, stream: StreamId, mean: f64) -> f64 {
        ctx.stream(stream).map_or(mean, |s| s.exponential(mean))
    }

    fn start_service(&mut self, ctx: &mut Context<'_>, arrived: f64) {
        self.in_service = Some(arrived);
        let service = Self::draw(ctx, self.services, self.service_mean);
        ctx.schedule_handler(DEPARTURE, service).expect("schedule");
    }
}

impl ModelElement for Mm1Queue {
    fn initialize(&mut self, ctx: &mut Context<'_>) {
        self.waiting.clear();
        self.in_service = None;
        self.served = 0;
        let first = Self::draw(ctx, self.arrivals, self.arrival_mean);
        ctx.schedule_handler(ARRIVAL, first).expect("schedule");
    }

    fn handle_event(&mut self, ctx: &mut Context<'_>, event: &ModelEvent) {
        let now = ctx.now();
        let in_system = self.in_system;
        match event.action().handler_tag() {
            Some(ARRIVAL) => {
                ctx.with_element::<TimeWeighted, _>(in_system, |tw, ctx| tw.add(ctx, 1.0))
                    .expect("in_system");
                if self.in_service.is_none() {
                    self.start_service(ctx, now);
                } else {
                    self.waiting.push_back(now);
                }
                let next = Self::draw(ctx, self.arrivals, self.arrival_mean);
                ctx.schedule_handler(ARRIVAL, next).expect("schedule");
            }
            Some(DEPARTURE) => {
                ctx.with_element::<TimeWeighted, _>(in_system, |tw, ctx| tw.add(ctx, -1.0))
                    .expect("in_system");
                if let Some(arrived) = self.in_service.take() {
                    self.served += 1;
                    ctx.with_element::<ResponseVariable, _>(self.time_in_system, |rv, ctx| {
                        rv.record(ctx, now - arrived)
                    })
                    .expect("time_in_system");
                }
                if let Some(next) = self.waiting.pop_front() {
                    self.start_service(ctx, next);
                }
            }
            _ => {}
        }
    }
}
