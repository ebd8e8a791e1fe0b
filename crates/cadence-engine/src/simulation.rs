//! The replication and experiment controller.
//!
//! [`Simulation`] owns a [`Model`] and drives it through an experiment:
//!
//! ```text
//! initialize_experiment   stream policy, controls, before-experiment
//! run_next_replication    (repeated)
//!     sweep marked components
//!     antithetic / substream policy
//!     before-replication, initialize, conditional-action registration,
//!     Monte-Carlo (optional)
//!     execute events until the end event, an empty calendar, a stop
//!     request or the wall-clock cap
//!     replication-ended, after-replication
//! end_experiment          after-experiment
//! ```
//!
//! [`run()`](Simulation::run) does all of it.

use std::error::Error;
use std::fmt;
use std::time::Instant;

use cadence_core::{KernelError, ModelError};
use cadence_model::{ExperimentInfo, Halt, Model};
use tracing::{debug, info, warn};

use crate::config::{split_control, ConfigError, ExperimentConfig};
use crate::metrics::{ExperimentReport, ReplicationMetrics, StopReason};

// Compile-time assertion: a Simulation can be handed to a worker thread.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

// ── ExperimentState ─────────────────────────────────────────────

/// Where the experiment is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExperimentState {
    /// Built; before-experiment has not run.
    Created,
    /// Before-experiment has run; replications may be executed.
    Running,
    /// After-experiment has run.
    Ended,
}

// ── RunError ────────────────────────────────────────────────────

/// Errors from driving an experiment.
#[derive(Debug, PartialEq)]
pub enum RunError {
    /// A model operation failed.
    Model(ModelError),
    /// Event execution hit a fatal anomaly.
    Kernel(KernelError),
    /// An operation was called in the wrong experiment state.
    InvalidState {
        /// The operation attempted.
        operation: &'static str,
        /// The state the experiment was in.
        state: ExperimentState,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(e) => write!(f, "model: {e}"),
            Self::Kernel(e) => write!(f, "kernel: {e}"),
            Self::InvalidState { operation, state } => {
                write!(f, "cannot {operation} while the experiment is {state:?}")
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Model(e) => Some(e),
            Self::Kernel(e) => Some(e),
            Self::InvalidState { .. } => None,
        }
    }
}

impl From<ModelError> for RunError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<KernelError> for RunError {
    fn from(e: KernelError) -> Self {
        Self::Kernel(e)
    }
}

// ── Simulation ──────────────────────────────────────────────────

/// Drives a model through the replications of one experiment.
///
/// # Example
///
/// ```
/// use cadence_engine::{ExperimentConfig, Simulation, StopReason};
/// use cadence_model::Model;
///
/// let config = ExperimentConfig {
///     replications: 3,
///     replication_length: 50.0,
///     ..ExperimentConfig::default()
/// };
/// let mut sim = Simulation::new(Model::new("empty"), config).unwrap();
/// let report = sim.run().unwrap();
/// assert_eq!(report.completed(), 3);
/// assert_eq!(report.replications[0].stop_reason, StopReason::EndEvent);
/// ```
pub struct Simulation {
    model: Model,
    config: ExperimentConfig,
    state: ExperimentState,
    report: ExperimentReport,
}

impl Simulation {
    /// Validate `config` and take ownership of `model`.
    pub fn new(model: Model, config: ExperimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let report = ExperimentReport {
            name: config.name.clone(),
            replications: Vec::new(),
        };
        Ok(Self {
            model,
            config,
            state: ExperimentState::Created,
            report,
        })
    }

    /// The model.
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The model, mutably, for attaching listeners or inspecting elements
    /// between replications.
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// The configuration.
    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// The experiment's lifecycle state.
    pub fn state(&self) -> ExperimentState {
        self.state
    }

    /// Metrics of the replications completed so far.
    pub fn report(&self) -> &ExperimentReport {
        &self.report
    }

    /// Give the model back.
    pub fn into_model(self) -> Model {
        self.model
    }

    /// Run the whole experiment: every remaining replication, then
    /// after-experiment.
    pub fn run(&mut self) -> Result<&ExperimentReport, RunError> {
        if self.state == ExperimentState::Created {
            self.initialize_experiment()?;
        }
        while self.has_next_replication() {
            self.run_next_replication()?;
        }
        self.end_experiment()?;
        Ok(&self.report)
    }

    /// Start the experiment: publish the parameters to the model, apply
    /// the stream policy and the controls, and run before-experiment.
    pub fn initialize_experiment(&mut self) -> Result<(), RunError> {
        self.expect_state("initialize the experiment", ExperimentState::Created)?;
        if self.config.is_unbounded() {
            warn!(
                experiment = %self.config.name,
                "infinite replication length without a wall-clock cap; \
                 replications end only when the calendar empties or a component stops them"
            );
        }

        let config = &self.config;
        *self.model.experiment_mut() = ExperimentInfo {
            name: config.name.clone(),
            replications: config.replications,
            current_replication: 0,
            replication_length: config.replication_length,
            warm_up_length: config.warm_up_length,
            antithetic: config.antithetic,
        };
        self.model
            .set_conditional_max_passes(config.conditional_max_passes);
        if let Some(seed) = config.seed {
            self.model.set_seed(seed);
        }
        if config.reset_start_stream {
            for stream in self.model.streams_mut() {
                stream.reset_start_stream();
                stream.set_antithetic(false);
            }
        }
        for _ in 0..config.stream_advances {
            for stream in self.model.streams_mut() {
                stream.advance_to_next_substream();
            }
        }

        self.apply_controls();
        self.model.before_experiment();
        self.report.replications.clear();
        self.state = ExperimentState::Running;
        info!(
            experiment = %self.config.name,
            replications = self.config.replications,
            length = self.config.replication_length,
            warm_up = self.config.warm_up_length,
            "experiment started"
        );
        Ok(())
    }

    fn apply_controls(&mut self) {
        for (key, &value) in &self.config.controls {
            let Some((element, name)) = split_control(key) else {
                continue;
            };
            match self.model.apply_control(element, name, value) {
                Ok(true) => debug!(control = %key, value, "control applied"),
                Ok(false) => warn!(control = %key, "control not recognized by its element"),
                Err(e) => warn!(control = %key, error = %e, "control not applied"),
            }
        }
    }

    /// Whether replications remain in a running experiment.
    pub fn has_next_replication(&self) -> bool {
        self.state == ExperimentState::Running
            && self.report.completed() < self.config.replications as usize
    }

    /// Execute the next replication from its removal sweep through
    /// after-replication.
    pub fn run_next_replication(&mut self) -> Result<ReplicationMetrics, RunError> {
        if !self.has_next_replication() {
            return Err(RunError::InvalidState {
                operation: "run a replication",
                state: self.state,
            });
        }
        let replication = self.report.completed() as u32 + 1;

        let removed = self.model.remove_marked();
        if !removed.is_empty() {
            debug!(count = removed.len(), "marked components removed");
        }
        self.model.experiment_mut().current_replication = replication;
        if replication > 1 {
            self.apply_substream_policy(replication);
        }

        self.model.before_replication(self.config.replication_length)?;
        if replication == 1 || self.config.replication_initialization {
            self.model.initialize();
        }
        self.model.register_conditional_actions();
        if self.config.monte_carlo {
            self.model.monte_carlo();
        }

        let before = self.model.calendar().stats();
        let started = Instant::now();
        let stop_reason = self.execute_events(started)?;
        let wall_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        let after = self.model.calendar().stats();
        let end_time = self.model.now();
        let conditional_actions_fired = self.model.conditional_actions_fired();

        self.model.replication_ended();
        self.model.after_replication();

        let metrics = ReplicationMetrics {
            replication,
            events_executed: after.executed - before.executed,
            canceled_discarded: after.canceled_discarded - before.canceled_discarded,
            conditional_actions_fired,
            end_time,
            wall_us,
            stop_reason,
        };
        debug!(
            replication,
            events = metrics.events_executed,
            end_time,
            wall_us,
            stop = %stop_reason,
            "replication ended"
        );
        self.report.replications.push(metrics.clone());
        Ok(metrics)
    }

    /// Even replications replay the previous substream reflected; odd ones
    /// move to a fresh substream.
    fn apply_substream_policy(&mut self, replication: u32) {
        if self.config.antithetic {
            let even = replication % 2 == 0;
            for stream in self.model.streams_mut() {
                if even {
                    stream.reset_start_substream();
                    stream.set_antithetic(true);
                } else {
                    stream.set_antithetic(false);
                    stream.advance_to_next_substream();
                }
            }
        } else if self.config.advance_next_substream {
            for stream in self.model.streams_mut() {
                stream.advance_to_next_substream();
            }
        }
    }

    fn execute_events(&mut self, started: Instant) -> Result<StopReason, RunError> {
        loop {
            if let Some(cap) = self.config.max_wall_time {
                if started.elapsed() >= cap {
                    warn!(
                        replication = self.model.experiment().current_replication,
                        time = self.model.now(),
                        pending = self.model.calendar().len(),
                        "replication stopped by the wall-clock limit"
                    );
                    return Ok(StopReason::TimeLimit);
                }
            }
            if self.model.step()?.is_none() {
                return Ok(StopReason::CalendarEmpty);
            }
            match self.model.halt() {
                Some(Halt::EndEvent) => return Ok(StopReason::EndEvent),
                Some(Halt::Requested) => return Ok(StopReason::Requested),
                None => {}
            }
        }
    }

    /// Run after-experiment. Calling it again is a no-op.
    pub fn end_experiment(&mut self) -> Result<(), RunError> {
        match self.state {
            ExperimentState::Created => Err(RunError::InvalidState {
                operation: "end the experiment",
                state: self.state,
            }),
            ExperimentState::Ended => Ok(()),
            ExperimentState::Running => {
                self.model.after_experiment();
                self.state = ExperimentState::Ended;
                info!(
                    experiment = %self.config.name,
                    replications = self.report.completed(),
                    events = self.report.total_events(),
                    "experiment ended"
                );
                Ok(())
            }
        }
    }

    fn expect_state(
        &self,
        operation: &'static str,
        state: ExperimentState,
    ) -> Result<(), RunError> {
        if self.state == state {
            Ok(())
        } else {
            Err(RunError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
