//! Cadence: a discrete-event simulation kernel with output analysis.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Cadence sub-crates. For most users, adding `cadence` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! // Records the time of a tick every 1.0 time units.
//! struct Ticker {
//!     response: ComponentId,
//! }
//!
//! impl ModelElement for Ticker {
//!     fn initialize(&mut self, ctx: &mut Context<'_>) {
//!         ctx.schedule_handler(0, 1.0).unwrap();
//!     }
//!
//!     fn handle_event(&mut self, ctx: &mut Context<'_>, _event: &ModelEvent) {
//!         let now = ctx.now();
//!         ctx.with_element::<ResponseVariable, _>(self.response, |rv, ctx| rv.record(ctx, now))
//!             .unwrap();
//!         ctx.schedule_handler(0, 1.0).unwrap();
//!     }
//! }
//!
//! let mut model = Model::new("clock");
//! let root = model.root();
//! let response = model
//!     .add_element(root, ResponseVariable::spec("tick_time"), ResponseVariable::new())
//!     .unwrap();
//! model
//!     .add_element(root, ElementSpec::new("ticker"), Ticker { response })
//!     .unwrap();
//!
//! let config = ExperimentConfig {
//!     replications: 2,
//!     replication_length: 10.5,
//!     ..ExperimentConfig::default()
//! };
//! let mut sim = Simulation::new(model, config).unwrap();
//! sim.attach_batching(response, BatchingConfig::default()).unwrap();
//! let report = sim.run().unwrap();
//! assert_eq!(report.completed(), 2);
//!
//! let rv = sim.model().element::<ResponseVariable>(response).unwrap();
//! assert_eq!(rv.within_replication().count(), 10);
//! assert_eq!(rv.across_replications().count(), 2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | IDs, phases, priorities, error types |
//! | [`calendar`] | `cadence-calendar` | Event calendar and conditional actions |
//! | [`model`] | `cadence-model` | Component tree, lifecycle, listeners, random streams |
//! | [`stats`] | `cadence-stats` | Statistics, batch means, discretization, batch CSV |
//! | [`welch`] | `cadence-welch` | Welch data files and bias analysis |
//! | [`engine`] | `cadence-engine` | Experiment controller, responses, collectors |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, IDs and errors (`cadence-core`).
pub use cadence_core as types;

/// Event calendar and conditional-action registry (`cadence-calendar`).
///
/// Models normally schedule through a [`model::Context`]; the calendar
/// is useful directly for custom event loops.
pub use cadence_calendar as calendar;

/// Component tree and lifecycle machine (`cadence-model`).
///
/// [`model::Model`] owns the components; [`model::ModelElement`] is the
/// main extension point for user-defined behavior.
pub use cadence_model as model;

/// Output statistics (`cadence-stats`).
pub use cadence_stats as stats;

/// Welch data files and initialization-bias analysis (`cadence-welch`).
///
/// Read files written by [`engine::WelchCollector`] with
/// [`welch::WelchReader`] and analyze them with
/// [`welch::welch_averages`] and [`welch::bias_test_statistic`].
pub use cadence_welch as welch;

/// Experiment controller (`cadence-engine`).
pub use cadence_engine as engine;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cadence_core::{ComponentId, EventId, ListenerId, Phase, PhaseSet, StreamId};

    // Errors
    pub use cadence_core::{CalendarError, KernelError, ModelError};

    // Model
    pub use cadence_model::{
        Action, Category, Context, ElementSpec, Listener, Model, ModelElement, ModelEvent,
        Notification, NotificationKind, RandomStream,
    };

    // Statistics
    pub use cadence_stats::{BatchStatistic, BatchingConfig, StatType, Statistic};

    // Welch
    pub use cadence_welch::{WelchPaths, WelchReader};

    // Engine
    pub use cadence_engine::{
        write_batch_csv, BatchingCollector, ExperimentConfig, ExperimentReport, ReplicationMetrics,
        ResponseVariable, RunError, Simulation, StopReason, TimeWeighted, WelchCollector,
    };
}
