//! Replication and experiment controller for Cadence simulations.
//!
//! [`Simulation`] takes a [`Model`](cadence_model::Model) and an
//! [`ExperimentConfig`] and runs the experiment replication by
//! replication, returning [`ReplicationMetrics`] for each. Response
//! elements ([`ResponseVariable`], [`TimeWeighted`]) report values;
//! collectors ([`BatchingCollector`], [`WelchCollector`]) listen to them
//! and produce the batch-statistics CSV and the Welch files.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collect;
pub mod config;
pub mod metrics;
pub mod response;
pub mod simulation;

pub use collect::{write_batch_csv, BatchingCollector, CollectorError, WelchCollector};
pub use config::{ConfigError, ExperimentConfig};
pub use metrics::{ExperimentReport, ReplicationMetrics, StopReason};
pub use response::{ResponseVariable, TimeWeighted};
pub use simulation::{ExperimentState, RunError, Simulation};
