//! Error types for statistics configuration and output.

use std::error::Error;
use std::fmt;

/// Errors from statistics configuration and CSV output.
#[derive(Debug)]
pub enum StatsError {
    /// A batching parameter was below its minimum of 2.
    BatchParameter {
        /// Which parameter was rejected.
        name: &'static str,
        /// The rejected value.
        value: usize,
    },
    /// A discretization interval was not finite and positive.
    Interval {
        /// The rejected interval.
        value: f64,
    },
    /// A confidence level was outside `(0, 1)`.
    ConfidenceLevel {
        /// The rejected level.
        value: f64,
    },
    /// Writing the statistics CSV failed.
    Csv(csv::Error),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BatchParameter { name, value } => {
                write!(f, "{name} must be at least 2, got {value}")
            }
            Self::Interval { value } => {
                write!(f, "discretization interval must be finite and > 0, got {value}")
            }
            Self::ConfidenceLevel { value } => {
                write!(f, "confidence level must lie in (0, 1), got {value}")
            }
            Self::Csv(e) => write!(f, "statistics csv: {e}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for StatsError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<std::io::Error> for StatsError {
    fn from(e: std::io::Error) -> Self {
        Self::Csv(csv::Error::from(e))
    }
}
