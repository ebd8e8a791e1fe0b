//! Error types for Welch data files and analysis.

use std::fmt;
use std::io;

/// Errors from writing, reading or analyzing Welch data.
#[derive(Debug)]
pub enum WelchError {
    /// An I/O error occurred on the data or metadata file.
    Io(io::Error),
    /// The metadata text could not be parsed.
    MalformedMetadata {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        detail: String,
    },
    /// A replication index was outside `1..=replications`.
    ReplicationOutOfRange {
        /// The requested replication.
        replication: usize,
        /// Replications on file.
        replications: usize,
    },
    /// An observation index was outside `1..=count` for its replication.
    ObservationOutOfRange {
        /// The replication.
        replication: usize,
        /// The requested observation.
        observation: u64,
        /// Observations recorded for that replication.
        count: u64,
    },
    /// The analysis needs at least one replication with observations.
    NoReplications,
    /// Writing the Welch plot CSV failed.
    Csv(csv::Error),
}

impl fmt::Display for WelchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MalformedMetadata { line, detail } => {
                write!(f, "malformed Welch metadata at line {line}: {detail}")
            }
            Self::ReplicationOutOfRange {
                replication,
                replications,
            } => write!(
                f,
                "replication {replication} out of range (1..={replications})"
            ),
            Self::ObservationOutOfRange {
                replication,
                observation,
                count,
            } => write!(
                f,
                "observation {observation} out of range for replication {replication} (1..={count})"
            ),
            Self::NoReplications => write!(f, "no replications with observations"),
            Self::Csv(e) => write!(f, "Welch plot csv: {e}"),
        }
    }
}

impl std::error::Error for WelchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WelchError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for WelchError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}
