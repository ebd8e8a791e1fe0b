//! Experiment configuration, validation, and error types.
//!
//! [`ExperimentConfig`] describes how a [`Simulation`](crate::Simulation)
//! drives the model: how many replications, how long each runs, the
//! warm-up, the random-stream policy and the named controls applied
//! before the experiment. [`validate()`](ExperimentConfig::validate) runs
//! when the simulation is built.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use cadence_model::DEFAULT_CONDITIONAL_MAX_PASSES;
use indexmap::IndexMap;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`ExperimentConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The replication count was zero.
    NoReplications,
    /// A length was NaN, negative, or (for the replication length) zero.
    InvalidLength {
        /// Which length.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The conditional-action pass bound was zero.
    ZeroMaxPasses,
    /// The wall-clock cap was zero.
    ZeroWallTime,
    /// A control key was not of the form `element.key`.
    InvalidControl {
        /// The rejected key.
        key: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReplications => write!(f, "replication count must be at least 1"),
            Self::InvalidLength { what, value } => write!(f, "invalid {what}: {value}"),
            Self::ZeroMaxPasses => {
                write!(f, "conditional-action max passes must be at least 1")
            }
            Self::ZeroWallTime => write!(f, "wall-clock cap must be positive"),
            Self::InvalidControl { key } => {
                write!(f, "control key {key:?} is not of the form element.key")
            }
        }
    }
}

impl Error for ConfigError {}

// ── ExperimentConfig ───────────────────────────────────────────────

/// Complete description of an experiment.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentConfig {
    /// Experiment name. Default: `"experiment"`.
    pub name: String,
    /// Number of replications. Default: 1.
    pub replications: u32,
    /// Simulated length of each replication. Default: infinite, which
    /// needs a wall-clock cap or a component that stops the run.
    pub replication_length: f64,
    /// Experiment-wide warm-up length. Default: 0 (none).
    pub warm_up_length: f64,
    /// Pair replications with antithetic streams. Default: false.
    pub antithetic: bool,
    /// Rewind every stream to its start before the experiment. Default: true.
    pub reset_start_stream: bool,
    /// Move every stream to its next substream between replications.
    /// Default: true.
    pub advance_next_substream: bool,
    /// Substreams to skip before the first replication. Default: 0.
    pub stream_advances: u32,
    /// Run the initialize phase in every replication rather than only the
    /// first. Default: true.
    pub replication_initialization: bool,
    /// Run the Monte-Carlo pass. Default: false.
    pub monte_carlo: bool,
    /// Wall-clock cap per replication, checked between events. Default:
    /// none.
    pub max_wall_time: Option<Duration>,
    /// Bound on conditional-action rescans per event. Default: 1000.
    pub conditional_max_passes: usize,
    /// Master seed for the model's streams. `None` keeps the model's own.
    /// Default: `None`.
    pub seed: Option<u64>,
    /// Named controls, `"element.key" → value`, applied before the
    /// experiment. Default: empty.
    pub controls: IndexMap<String, f64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            replications: 1,
            replication_length: f64::INFINITY,
            warm_up_length: 0.0,
            antithetic: false,
            reset_start_stream: true,
            advance_next_substream: true,
            stream_advances: 0,
            replication_initialization: true,
            monte_carlo: false,
            max_wall_time: None,
            conditional_max_passes: DEFAULT_CONDITIONAL_MAX_PASSES,
            seed: None,
            controls: IndexMap::new(),
        }
    }
}

impl ExperimentConfig {
    /// Check every parameter.
    ///
    /// An infinite replication length without a wall-clock cap is valid;
    /// the simulation warns about it when the experiment starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.replications == 0 {
            return Err(ConfigError::NoReplications);
        }
        let length = self.replication_length;
        if length.is_nan() || length <= 0.0 {
            return Err(ConfigError::InvalidLength {
                what: "replication length",
                value: length,
            });
        }
        let warm_up = self.warm_up_length;
        if !warm_up.is_finite() || warm_up < 0.0 {
            return Err(ConfigError::InvalidLength {
                what: "warm-up length",
                value: warm_up,
            });
        }
        if self.conditional_max_passes == 0 {
            return Err(ConfigError::ZeroMaxPasses);
        }
        if self.max_wall_time.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::ZeroWallTime);
        }
        for key in self.controls.keys() {
            if split_control(key).is_none() {
                return Err(ConfigError::InvalidControl { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Whether the run has neither a finite horizon nor a wall-clock cap.
    pub fn is_unbounded(&self) -> bool {
        self.replication_length.is_infinite() && self.max_wall_time.is_none()
    }
}

/// Split `"element.key"` at its last dot. Both parts must be non-empty.
pub(crate) fn split_control(key: &str) -> Option<(&str, &str)> {
    key.rsplit_once('.')
        .filter(|(element, name)| !element.is_empty() && !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_but_unbounded() {
        let cfg = ExperimentConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.is_unbounded());
        assert_eq!(cfg.conditional_max_passes, 1000);
    }

    #[test]
    fn rejects_bad_parameters() {
        let check = |f: fn(&mut ExperimentConfig)| {
            let mut cfg = ExperimentConfig::default();
            f(&mut cfg);
            cfg.validate()
        };
        assert_eq!(
            check(|c| c.replications = 0),
            Err(ConfigError::NoReplications)
        );
        assert!(matches!(
            check(|c| c.replication_length = 0.0),
            Err(ConfigError::InvalidLength { what: "replication length", .. })
        ));
        assert!(matches!(
            check(|c| c.warm_up_length = f64::INFINITY),
            Err(ConfigError::InvalidLength { what: "warm-up length", .. })
        ));
        assert_eq!(
            check(|c| c.conditional_max_passes = 0),
            Err(ConfigError::ZeroMaxPasses)
        );
        assert_eq!(
            check(|c| c.max_wall_time = Some(Duration::ZERO)),
            Err(ConfigError::ZeroWallTime)
        );
        assert!(matches!(
            check(|c| {
                c.controls.insert("nodot".to_string(), 1.0);
            }),
            Err(ConfigError::InvalidControl { .. })
        ));
    }

    #[test]
    fn control_keys_split_at_last_dot() {
        assert_eq!(split_control("server.rate"), Some(("server", "rate")));
        assert_eq!(split_control("line.a.rate"), Some(("line.a", "rate")));
        assert_eq!(split_control(".rate"), None);
        assert_eq!(split_control("server."), None);
    }
}
