//! Output statistics for Cadence simulations.
//!
//! - [`Statistic`]: running summary with Student-t half-widths, lag-1
//!   correlation and the von Neumann independence statistic.
//! - [`BatchStatistic`]: dynamic batch means with bounded batch count.
//! - [`Discretizer`]: turns a time-weighted signal into per-tick averages
//!   that can be batched like ordinary observations.
//! - [`BatchCsvWriter`]: the batch-statistics CSV.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod discretize;
pub mod error;
pub mod report;
pub mod statistic;

pub use batch::{BatchStatistic, BatchingConfig};
pub use discretize::{default_interval, Discretizer, DEFAULT_TARGET_BATCHES};
pub use error::StatsError;
pub use report::{BatchCsvWriter, StatType};
pub use statistic::Statistic;
