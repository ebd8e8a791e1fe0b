//! Per-replication run metrics.
//!
//! [`ReplicationMetrics`] records what one replication did and why it
//! stopped. [`ExperimentReport`] collects them for the whole experiment.

use std::fmt;

/// Why a replication's event loop stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The end-of-replication event fired.
    EndEvent,
    /// The calendar ran out of events.
    CalendarEmpty,
    /// The wall-clock cap was reached.
    TimeLimit,
    /// A component asked the replication to stop.
    Requested,
}

impl StopReason {
    /// Short label for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EndEvent => "end event",
            Self::CalendarEmpty => "calendar empty",
            Self::TimeLimit => "time limit",
            Self::Requested => "requested",
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one replication did.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplicationMetrics {
    /// Replication number, 1-based.
    pub replication: u32,
    /// Events whose actions ran.
    pub events_executed: u64,
    /// Canceled events discarded at pop time.
    pub canceled_discarded: u64,
    /// Conditional actions fired.
    pub conditional_actions_fired: u64,
    /// Simulated time when the loop stopped.
    pub end_time: f64,
    /// Wall-clock time of the event loop, in microseconds.
    pub wall_us: u64,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
}

/// Metrics for every completed replication of an experiment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExperimentReport {
    /// Experiment name.
    pub name: String,
    /// One entry per completed replication, in order.
    pub replications: Vec<ReplicationMetrics>,
}

impl ExperimentReport {
    /// Number of completed replications.
    pub fn completed(&self) -> usize {
        self.replications.len()
    }

    /// Events executed across every replication.
    pub fn total_events(&self) -> u64 {
        self.replications.iter().map(|r| r.events_executed).sum()
    }

    /// Wall-clock microseconds across every replication.
    pub fn total_wall_us(&self) -> u64 {
        self.replications.iter().map(|r| r.wall_us).sum()
    }

    /// Whether any replication was cut short by the wall-clock cap.
    pub fn hit_time_limit(&self) -> bool {
        self.replications
            .iter()
            .any(|r| r.stop_reason == StopReason::TimeLimit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(replication: u32, events: u64, stop_reason: StopReason) -> ReplicationMetrics {
        ReplicationMetrics {
            replication,
            events_executed: events,
            canceled_discarded: 0,
            conditional_actions_fired: 0,
            end_time: 10.0,
            wall_us: 5,
            stop_reason,
        }
    }

    #[test]
    fn report_totals() {
        let report = ExperimentReport {
            name: "x".to_string(),
            replications: vec![
                rep(1, 10, StopReason::EndEvent),
                rep(2, 7, StopReason::TimeLimit),
            ],
        };
        assert_eq!(report.completed(), 2);
        assert_eq!(report.total_events(), 17);
        assert_eq!(report.total_wall_us(), 10);
        assert!(report.hit_time_limit());
    }

    #[test]
    fn default_report_is_empty() {
        let report = ExperimentReport::default();
        assert_eq!(report.completed(), 0);
        assert!(!report.hit_time_limit());
    }
}
