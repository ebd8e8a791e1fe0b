//! Welch data files and initialization-bias analysis for Cadence
//! simulations.
//!
//! Each tracked response gets two files:
//!
//! ```text
//! <name>.wdf    raw observations, 8-byte big-endian f64, replication after replication
//! <name>.wdfmd  line 1: replication count
//!               then one line per replication: count,timePerObservation,average
//! ```
//!
//! - [`WelchWriter`] appends observations and records each replication
//! - [`WelchReader`] reads any observation back by seeking to its offset
//! - [`analyzer`] computes Welch averages, cumulative averages, partial
//!   sums and bias test statistics

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod analyzer;
pub mod codec;
pub mod error;
pub mod metadata;
pub mod paths;
pub mod reader;
pub mod writer;

pub use analyzer::{
    batch_means, bias_test_statistic, cumulative_averages, partial_sums, welch_average_at,
    welch_averages, write_welch_plot_csv, Bias,
};
pub use error::WelchError;
pub use metadata::{ReplicationRecord, WelchMetadata};
pub use paths::WelchPaths;
pub use reader::WelchReader;
pub use writer::WelchWriter;
