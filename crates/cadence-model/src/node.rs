//! Arena node: one component's tree links, phase flags and timing.

use cadence_core::{ComponentId, EventId, PhaseSet};
use smallvec::SmallVec;

use crate::element::{Category, ModelElement};

pub(crate) type Children = SmallVec<[ComponentId; 4]>;

pub(crate) struct Node {
    pub(crate) name: String,
    pub(crate) category: Category,
    pub(crate) parent: Option<ComponentId>,
    pub(crate) children: Children,
    pub(crate) phases: PhaseSet,
    pub(crate) warm_up_length: f64,
    pub(crate) timed_update_interval: f64,
    pub(crate) warm_up_event: Option<EventId>,
    pub(crate) timed_update_event: Option<EventId>,
    pub(crate) added_during_replication: bool,
    pub(crate) remove_after_replication: bool,
    pub(crate) marked_for_removal: bool,
    /// `None` while a hook is running, or for structural components.
    pub(crate) behavior: Option<Box<dyn ModelElement>>,
    pub(crate) has_behavior: bool,
}

impl Node {
    /// Whether this node owns a warm-up event instead of inheriting one.
    pub(crate) fn owns_warm_up(&self) -> bool {
        self.warm_up_length > 0.0
    }

    /// Whether this node schedules its own timed updates.
    pub(crate) fn owns_timed_update(&self) -> bool {
        self.timed_update_interval > 0.0
    }
}
