//! The [`ModelElement`] trait, event actions and component construction.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use cadence_calendar::Event;
use cadence_core::{Phase, PhaseSet};

use crate::context::Context;

/// An event on a model's calendar.
pub type ModelEvent = Event<Action>;

/// Shared event callback, run with the owning component as context.
pub type Callback = Arc<dyn Fn(&mut Context<'_>, &ModelEvent) + Send + Sync>;

/// What happens when an event fires.
#[derive(Clone)]
pub enum Action {
    /// Route to the owning element's [`ModelElement::handle_event`] with
    /// this tag.
    Handler(u32),
    /// Run a shared closure.
    Callback(Callback),
    /// Kernel: warm-up instant for the owning subtree.
    WarmUp,
    /// Kernel: periodic timed update for the owning subtree.
    TimedUpdate,
    /// Kernel: end of the replication.
    EndReplication,
}

impl Action {
    /// A handler action with the given tag.
    pub fn handler(tag: u32) -> Self {
        Action::Handler(tag)
    }

    /// A callback action.
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&mut Context<'_>, &ModelEvent) + Send + Sync + 'static,
    {
        Action::Callback(Arc::new(f))
    }

    /// The tag of a handler action.
    pub fn handler_tag(&self) -> Option<u32> {
        match self {
            Action::Handler(tag) => Some(*tag),
            _ => None,
        }
    }

    /// Whether the kernel schedules this action itself.
    pub fn is_kernel(&self) -> bool {
        matches!(
            self,
            Action::WarmUp | Action::TimedUpdate | Action::EndReplication
        )
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Handler(tag) => f.debug_tuple("Handler").field(tag).finish(),
            Action::Callback(_) => f.write_str("Callback(..)"),
            Action::WarmUp => f.write_str("WarmUp"),
            Action::TimedUpdate => f.write_str("TimedUpdate"),
            Action::EndReplication => f.write_str("EndReplication"),
        }
    }
}

/// Behavior attached to a component.
///
/// Every hook has a no-op default; implement only the phases the element
/// cares about. Hooks run only for phases the component opted in to (see
/// [`ElementSpec::phases`]); the kernel notifies listeners after each hook
/// whether or not it is overridden.
///
/// The element is checked out of the tree while one of its hooks runs, so
/// `ctx` gives access to every *other* component.
#[allow(unused_variables)]
pub trait ModelElement: Any + Send {
    /// Once per experiment, before the first replication.
    fn before_experiment(&mut self, ctx: &mut Context<'_>) {}

    /// Start of every replication.
    fn before_replication(&mut self, ctx: &mut Context<'_>) {}

    /// Replication initialization: reset state, schedule initial events.
    fn initialize(&mut self, ctx: &mut Context<'_>) {}

    /// Register conditional actions for this replication.
    fn register_conditional_actions(&mut self, ctx: &mut Context<'_>) {}

    /// Static sampling pass.
    fn monte_carlo(&mut self, ctx: &mut Context<'_>) {}

    /// The warm-up instant: clear accumulated statistics.
    fn warm_up(&mut self, ctx: &mut Context<'_>) {}

    /// Periodic timed update.
    fn timed_update(&mut self, ctx: &mut Context<'_>) {}

    /// The replication's end condition was reached.
    fn replication_ended(&mut self, ctx: &mut Context<'_>) {}

    /// After the replication has ended.
    fn after_replication(&mut self, ctx: &mut Context<'_>) {}

    /// Once per experiment, after the last replication.
    fn after_experiment(&mut self, ctx: &mut Context<'_>) {}

    /// The component is being detached from the model.
    fn removed_from_model(&mut self, ctx: &mut Context<'_>) {}

    /// An [`Action::Handler`] event owned by this component fired.
    fn handle_event(&mut self, ctx: &mut Context<'_>, event: &ModelEvent) {}

    /// Apply a named numeric control. Returns `false` for unknown keys.
    fn apply_control(&mut self, key: &str, value: f64) -> bool {
        false
    }
}

pub(crate) fn run_phase_hook(element: &mut dyn ModelElement, ctx: &mut Context<'_>, phase: Phase) {
    match phase {
        Phase::BeforeExperiment => element.before_experiment(ctx),
        Phase::BeforeReplication => element.before_replication(ctx),
        Phase::Initialize => element.initialize(ctx),
        Phase::ConditionalActionRegistration => element.register_conditional_actions(ctx),
        Phase::MonteCarlo => element.monte_carlo(ctx),
        Phase::WarmUp => element.warm_up(ctx),
        Phase::TimedUpdate => element.timed_update(ctx),
        Phase::ReplicationEnded => element.replication_ended(ctx),
        Phase::AfterReplication => element.after_replication(ctx),
        Phase::AfterExperiment => element.after_experiment(ctx),
        Phase::RemovedFromModel => element.removed_from_model(ctx),
        Phase::Update => {}
    }
}

/// Capability tag attached to a component at construction.
///
/// Used to index components without inspecting their concrete type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// The model root.
    Model,
    /// A component with no special role.
    Plain,
    /// An observation-based response.
    Response,
    /// A time-weighted response.
    TimeWeighted,
    /// A counter.
    Counter,
    /// A component that draws random numbers.
    RandomElement,
}

impl Category {
    /// Whether the category carries a statistical response.
    pub fn is_response(self) -> bool {
        matches!(self, Category::Response | Category::TimeWeighted)
    }
}

/// Construction parameters for a component.
#[derive(Clone, Debug)]
pub struct ElementSpec {
    pub(crate) name: String,
    pub(crate) category: Category,
    pub(crate) phases: PhaseSet,
    pub(crate) warm_up_length: f64,
    pub(crate) timed_update_interval: f64,
    pub(crate) remove_after_replication: bool,
}

impl ElementSpec {
    /// A plain component with the default phase set and no private events.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: Category::Plain,
            phases: PhaseSet::default(),
            warm_up_length: 0.0,
            timed_update_interval: 0.0,
            remove_after_replication: false,
        }
    }

    /// Set the category tag.
    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Replace the phase participation set.
    pub fn phases(mut self, phases: PhaseSet) -> Self {
        self.phases = phases;
        self
    }

    /// Opt in to a phase.
    pub fn opt_in(mut self, phase: Phase) -> Self {
        self.phases.insert(phase);
        self
    }

    /// Opt out of a phase.
    pub fn opt_out(mut self, phase: Phase) -> Self {
        self.phases.remove(phase);
        self
    }

    /// Give the component its own warm-up event at this time. Zero means
    /// the component inherits its parent's warm-up.
    pub fn warm_up_length(mut self, length: f64) -> Self {
        self.warm_up_length = length;
        self
    }

    /// Give the component its own timed-update event with this interval.
    pub fn timed_update_interval(mut self, interval: f64) -> Self {
        self.timed_update_interval = interval;
        self
    }

    /// Remove the component after the replication it was added in.
    pub fn remove_after_replication(mut self, yes: bool) -> Self {
        self.remove_after_replication = yes;
        self
    }
}
