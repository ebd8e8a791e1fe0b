//! Lifecycle phases and the [`PhaseSet`] opt-in bitset.

use std::fmt;

/// A lifecycle phase a component can enter during an experiment.
///
/// The discriminant order follows the replication timeline. `Update` and
/// `RemovedFromModel` are notification-only: they are broadcast to
/// listeners but cannot be opted out of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// Once per experiment, before the first replication.
    BeforeExperiment,
    /// At the start of every replication, before initialization.
    BeforeReplication,
    /// Component initialization at replication start.
    Initialize,
    /// Conditional-action registration, once per replication after initialize.
    ConditionalActionRegistration,
    /// Static sampling pass, run only when globally enabled.
    MonteCarlo,
    /// The warm-up instant; accumulated statistics are cleared.
    WarmUp,
    /// Periodic timed update.
    TimedUpdate,
    /// A component's observed value changed.
    Update,
    /// The replication's end condition was reached.
    ReplicationEnded,
    /// After the replication has ended.
    AfterReplication,
    /// Once per experiment, after the last replication.
    AfterExperiment,
    /// The component was detached from the model.
    RemovedFromModel,
}

impl Phase {
    /// Phases a component may opt in to or out of.
    pub const OPTIONAL: [Phase; 9] = [
        Phase::BeforeExperiment,
        Phase::BeforeReplication,
        Phase::Initialize,
        Phase::MonteCarlo,
        Phase::WarmUp,
        Phase::TimedUpdate,
        Phase::ReplicationEnded,
        Phase::AfterReplication,
        Phase::AfterExperiment,
    ];

    /// Whether the phase propagates to children before the component itself.
    ///
    /// Monte-Carlo, warm-up and timed updates run top-down; every other
    /// tree-wide phase runs bottom-up.
    pub fn children_first(self) -> bool {
        !matches!(self, Phase::MonteCarlo | Phase::WarmUp | Phase::TimedUpdate)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Short lowercase name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::BeforeExperiment => "before_experiment",
            Phase::BeforeReplication => "before_replication",
            Phase::Initialize => "initialize",
            Phase::ConditionalActionRegistration => "conditional_action_registration",
            Phase::MonteCarlo => "monte_carlo",
            Phase::WarmUp => "warm_up",
            Phase::TimedUpdate => "timed_update",
            Phase::Update => "update",
            Phase::ReplicationEnded => "replication_ended",
            Phase::AfterReplication => "after_replication",
            Phase::AfterExperiment => "after_experiment",
            Phase::RemovedFromModel => "removed_from_model",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-component phase participation flags.
///
/// Notification-only phases (`Update`, `RemovedFromModel`) and the
/// registration phase are always reported as contained.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseSet {
    bits: u16,
}

impl PhaseSet {
    /// A set with no optional phase enabled.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// Every optional phase enabled.
    pub fn all() -> Self {
        Phase::OPTIONAL.into_iter().collect()
    }

    /// Enable a phase.
    pub fn insert(&mut self, phase: Phase) {
        self.bits |= phase.bit();
    }

    /// Disable a phase.
    pub fn remove(&mut self, phase: Phase) {
        self.bits &= !phase.bit();
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, phase: Phase) -> Self {
        self.insert(phase);
        self
    }

    /// Builder-style [`remove`](Self::remove).
    pub fn without(mut self, phase: Phase) -> Self {
        self.remove(phase);
        self
    }

    /// Whether the component participates in `phase`.
    pub fn contains(&self, phase: Phase) -> bool {
        match phase {
            Phase::ConditionalActionRegistration | Phase::Update | Phase::RemovedFromModel => {
                true
            }
            _ => self.bits & phase.bit() != 0,
        }
    }

    /// Iterate the enabled optional phases in timeline order.
    pub fn iter(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::OPTIONAL.into_iter().filter(|p| self.contains(*p))
    }
}

/// Everything except the Monte-Carlo pass, which is opt-in.
impl Default for PhaseSet {
    fn default() -> Self {
        Self::all().without(Phase::MonteCarlo)
    }
}

impl fmt::Debug for PhaseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Phase> for PhaseSet {
    fn from_iter<I: IntoIterator<Item = Phase>>(iter: I) -> Self {
        let mut set = Self::empty();
        for phase in iter {
            set.insert(phase);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_excludes_monte_carlo_only() {
        let set = PhaseSet::default();
        for phase in Phase::OPTIONAL {
            assert_eq!(set.contains(phase), phase != Phase::MonteCarlo, "{phase}");
        }
    }

    #[test]
    fn notification_phases_always_contained() {
        let set = PhaseSet::empty();
        assert!(set.contains(Phase::Update));
        assert!(set.contains(Phase::RemovedFromModel));
        assert!(set.contains(Phase::ConditionalActionRegistration));
        assert!(!set.contains(Phase::WarmUp));
    }

    #[test]
    fn with_and_without_round_trip() {
        let set = PhaseSet::empty().with(Phase::WarmUp).with(Phase::TimedUpdate);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Phase::WarmUp, Phase::TimedUpdate]);
        let set = set.without(Phase::WarmUp);
        assert!(!set.contains(Phase::WarmUp));
        assert!(set.contains(Phase::TimedUpdate));
    }

    #[test]
    fn propagation_direction() {
        assert!(Phase::BeforeReplication.children_first());
        assert!(Phase::AfterExperiment.children_first());
        assert!(!Phase::WarmUp.children_first());
        assert!(!Phase::MonteCarlo.children_first());
    }
}
