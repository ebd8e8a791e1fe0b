//! The [`Model`]: component arena, name registry and shared services.

use std::any::Any;

use cadence_calendar::{ConditionalActions, EventCalendar};
use cadence_core::{ComponentId, IdGenerator, ListenerId, ModelError, Phase, PhaseSet, StreamId};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, warn};

use crate::context::{Conditional, Context};
use crate::element::{Action, Category, ElementSpec, ModelElement};
use crate::listener::{Listener, Listeners, Notification, NotificationKind};
use crate::node::{Children, Node};
use crate::random::RandomStream;

/// Default bound on conditional-action rescans per event.
pub const DEFAULT_CONDITIONAL_MAX_PASSES: usize = 1000;

/// Experiment parameters visible to components.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperimentInfo {
    /// Experiment name.
    pub name: String,
    /// Number of replications requested.
    pub replications: u32,
    /// Current replication, 1-based; 0 before the first one starts.
    pub current_replication: u32,
    /// Replication length; infinite for an open horizon.
    pub replication_length: f64,
    /// Experiment-wide warm-up length, applied to the root.
    pub warm_up_length: f64,
    /// Whether antithetic replications are in use.
    pub antithetic: bool,
}

impl Default for ExperimentInfo {
    fn default() -> Self {
        Self {
            name: "experiment".to_string(),
            replications: 1,
            current_replication: 0,
            replication_length: f64::INFINITY,
            warm_up_length: 0.0,
            antithetic: false,
        }
    }
}

/// Why event execution stopped early.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    /// The end-of-replication event fired.
    EndEvent,
    /// A component asked the replication to stop.
    Requested,
}

/// A tree of components sharing one event calendar.
///
/// Components live in an arena indexed by [`ComponentId`]; parents and
/// children refer to each other by id. The root is created with the model
/// and can be neither removed nor moved.
///
/// # Names
///
/// Every component has a unique, non-empty name. Names are never reused,
/// even after the component that held one is removed.
pub struct Model {
    pub(crate) nodes: IndexMap<ComponentId, Node>,
    pub(crate) names: IndexMap<String, ComponentId>,
    pub(crate) categories: IndexMap<Category, IndexSet<ComponentId>>,
    pub(crate) ids: IdGenerator,
    pub(crate) root: ComponentId,
    pub(crate) calendar: EventCalendar<Action>,
    pub(crate) conditionals: ConditionalActions<Conditional>,
    pub(crate) conditional_max_passes: usize,
    pub(crate) conditional_fired: u64,
    pub(crate) listeners: Listeners,
    pub(crate) streams: IndexMap<StreamId, RandomStream>,
    pub(crate) seed: u64,
    pub(crate) info: ExperimentInfo,
    pub(crate) replication_running: bool,
    pub(crate) auto_removal: bool,
    pub(crate) removal_pending: bool,
    pub(crate) halt: Option<Halt>,
}

impl Model {
    /// Create a model whose root component is called `name`, with master
    /// seed 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_seed(name, 0)
    }

    /// Create a model with an explicit master seed for its random streams.
    pub fn with_seed(name: impl Into<String>, seed: u64) -> Self {
        let mut name = name.into();
        if name.is_empty() {
            name = "model".to_string();
        }
        let mut ids = IdGenerator::new();
        let root = ids.next_component();
        let mut model = Self {
            nodes: IndexMap::new(),
            names: IndexMap::new(),
            categories: IndexMap::new(),
            ids,
            root,
            calendar: EventCalendar::new(),
            conditionals: ConditionalActions::new(),
            conditional_max_passes: DEFAULT_CONDITIONAL_MAX_PASSES,
            conditional_fired: 0,
            listeners: Listeners::default(),
            streams: IndexMap::new(),
            seed,
            info: ExperimentInfo::default(),
            replication_running: false,
            auto_removal: false,
            removal_pending: false,
            halt: None,
        };
        let spec = ElementSpec::new(name).category(Category::Model);
        model.link(root, None, spec, None);
        model
    }

    // ── Construction ───────────────────────────────────────────

    /// Add a structural component with no behavior under `parent`.
    pub fn add(
        &mut self,
        parent: ComponentId,
        spec: ElementSpec,
    ) -> Result<ComponentId, ModelError> {
        self.insert(parent, spec, None)
    }

    /// Add a component with behavior `element` under `parent`.
    pub fn add_element(
        &mut self,
        parent: ComponentId,
        spec: ElementSpec,
        element: impl ModelElement,
    ) -> Result<ComponentId, ModelError> {
        self.insert(parent, spec, Some(Box::new(element)))
    }

    pub(crate) fn insert(
        &mut self,
        parent: ComponentId,
        spec: ElementSpec,
        behavior: Option<Box<dyn ModelElement>>,
    ) -> Result<ComponentId, ModelError> {
        if spec.name.is_empty() {
            return Err(ModelError::EmptyName);
        }
        if self.names.contains_key(&spec.name) {
            return Err(ModelError::DuplicateName { name: spec.name });
        }
        if !self.nodes.contains_key(&parent) {
            return Err(ModelError::UnknownComponent { id: parent });
        }
        check_length("warm-up length", spec.warm_up_length)?;
        check_length("timed-update interval", spec.timed_update_interval)?;

        let id = self.ids.next_component();
        if self.replication_running && !spec.remove_after_replication {
            warn!(
                component = %spec.name,
                "component added during a running replication without a removal option"
            );
        }
        debug!(component = %spec.name, %id, %parent, "component added");
        self.link(id, Some(parent), spec, behavior);
        Ok(id)
    }

    fn link(
        &mut self,
        id: ComponentId,
        parent: Option<ComponentId>,
        spec: ElementSpec,
        behavior: Option<Box<dyn ModelElement>>,
    ) {
        if let Some(p) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.push(id);
        }
        self.names.insert(spec.name.clone(), id);
        self.categories.entry(spec.category).or_default().insert(id);
        self.nodes.insert(
            id,
            Node {
                name: spec.name,
                category: spec.category,
                parent,
                children: Children::new(),
                phases: spec.phases,
                warm_up_length: spec.warm_up_length,
                timed_update_interval: spec.timed_update_interval,
                warm_up_event: None,
                timed_update_event: None,
                added_during_replication: self.replication_running,
                remove_after_replication: spec.remove_after_replication,
                marked_for_removal: false,
                has_behavior: behavior.is_some(),
                behavior,
            },
        );
    }

    // ── Removal ────────────────────────────────────────────────

    /// Remove a component and everything below it, immediately.
    ///
    /// Children go first. Each removed component's pending events and
    /// conditional actions are dropped, its
    /// [`removed_from_model`](ModelElement::removed_from_model) hook runs
    /// and listeners are notified before it is detached. Returns the
    /// removed ids in removal order; removing a component that is already
    /// gone returns an empty list.
    pub fn remove(&mut self, id: ComponentId) -> Result<Vec<ComponentId>, ModelError> {
        if id == self.root {
            return Err(ModelError::RootImmutable);
        }
        let mut removed = Vec::new();
        if self.nodes.contains_key(&id) {
            self.remove_subtree(id, &mut removed);
        }
        Ok(removed)
    }

    fn remove_subtree(&mut self, id: ComponentId, removed: &mut Vec<ComponentId>) {
        for child in self.children_snapshot(id) {
            self.remove_subtree(child, removed);
        }
        for event in self.calendar.owned_by(id) {
            self.calendar.remove(event);
        }
        self.conditionals.retain(|c| c.owner != id);
        self.run_hook(id, Phase::RemovedFromModel);

        let Some(node) = self.nodes.shift_remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        if let Some(set) = self.categories.get_mut(&node.category) {
            set.shift_remove(&id);
        }
        debug!(component = %node.name, %id, "component removed");
        removed.push(id);
    }

    /// Flag a component for deferred removal.
    ///
    /// The component is removed at the next sweep: the start of the next
    /// replication, or right after the current event when automatic
    /// removal is on.
    pub fn mark_for_removal(&mut self, id: ComponentId) -> Result<(), ModelError> {
        if id == self.root {
            return Err(ModelError::RootImmutable);
        }
        let node = self.node_mut(id)?;
        node.marked_for_removal = true;
        self.removal_pending = true;
        Ok(())
    }

    /// Whether the component is waiting for the removal sweep.
    pub fn is_marked_for_removal(&self, id: ComponentId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.marked_for_removal)
    }

    /// Remove every marked component.
    ///
    /// Walks the tree top-down. A marked component is removed with its
    /// whole subtree and the walk does not descend into it, so marked
    /// descendants are never checked on their own.
    pub fn remove_marked(&mut self) -> Vec<ComponentId> {
        let mut removed = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            for child in self.children_snapshot(id).into_iter().rev() {
                if self.is_marked_for_removal(child) {
                    self.remove_subtree(child, &mut removed);
                } else {
                    stack.push(child);
                }
            }
        }
        self.removal_pending = false;
        removed
    }

    /// Remove marked components right after each event instead of at the
    /// next replication start.
    pub fn set_auto_removal(&mut self, on: bool) {
        self.auto_removal = on;
    }

    /// Move a component (with its subtree) under a new parent.
    ///
    /// Fails for the root, for unknown ids, and when `new_parent` is the
    /// component itself or one of its descendants.
    pub fn change_parent(
        &mut self,
        id: ComponentId,
        new_parent: ComponentId,
    ) -> Result<(), ModelError> {
        if id == self.root {
            return Err(ModelError::RootImmutable);
        }
        self.node(id)?;
        self.node(new_parent)?;
        if new_parent == id || self.is_descendant(new_parent, id) {
            return Err(ModelError::InvalidReparent { id, new_parent });
        }
        let old = self.node(id)?.parent;
        if old == Some(new_parent) {
            return Ok(());
        }
        if let Some(p) = old.and_then(|p| self.nodes.get_mut(&p)) {
            p.children.retain(|c| *c != id);
        }
        self.node_mut(new_parent)?.children.push(id);
        self.node_mut(id)?.parent = Some(new_parent);
        debug!(%id, %new_parent, "component re-parented");
        Ok(())
    }

    /// Whether `id` sits strictly below `ancestor`.
    pub fn is_descendant(&self, id: ComponentId, ancestor: ComponentId) -> bool {
        let mut cursor = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(p) = cursor {
            if p == ancestor {
                return true;
            }
            cursor = self.nodes.get(&p).and_then(|n| n.parent);
        }
        false
    }

    // ── Queries ────────────────────────────────────────────────

    /// The root component.
    pub fn root(&self) -> ComponentId {
        self.root
    }

    /// Number of live components, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a model holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `id` is a live component.
    pub fn contains(&self, id: ComponentId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Look up a live component by name.
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.names
            .get(name)
            .copied()
            .filter(|id| self.nodes.contains_key(id))
    }

    /// Whether the name was ever used in this model.
    pub fn is_name_taken(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// A component's name.
    pub fn name_of(&self, id: ComponentId) -> Option<&str> {
        self.nodes.get(&id).map(|n| n.name.as_str())
    }

    /// A component's parent; `None` for the root or an unknown id.
    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// A component's children in insertion order.
    pub fn children(&self, id: ComponentId) -> &[ComponentId] {
        self.nodes.get(&id).map_or(&[], |n| n.children.as_slice())
    }

    /// Every component below `id`, depth-first pre-order.
    pub fn descendants(&self, id: ComponentId) -> Vec<ComponentId> {
        let mut out = Vec::new();
        let mut stack: Vec<_> = self.children(id).iter().rev().copied().collect();
        while let Some(c) = stack.pop() {
            out.push(c);
            stack.extend(self.children(c).iter().rev().copied());
        }
        out
    }

    /// A component's category tag.
    pub fn category(&self, id: ComponentId) -> Option<Category> {
        self.nodes.get(&id).map(|n| n.category)
    }

    /// Live components with the given category, in insertion order.
    pub fn components_in(&self, category: Category) -> Vec<ComponentId> {
        self.categories
            .get(&category)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether the component was added while a replication was running.
    pub fn was_added_during_replication(&self, id: ComponentId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.added_during_replication)
    }

    pub(crate) fn node(&self, id: ComponentId) -> Result<&Node, ModelError> {
        self.nodes.get(&id).ok_or(ModelError::UnknownComponent { id })
    }

    pub(crate) fn node_mut(&mut self, id: ComponentId) -> Result<&mut Node, ModelError> {
        self.nodes
            .get_mut(&id)
            .ok_or(ModelError::UnknownComponent { id })
    }

    pub(crate) fn children_snapshot(&self, id: ComponentId) -> Children {
        self.nodes
            .get(&id)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    // ── Phase settings ─────────────────────────────────────────

    /// A component's phase participation set.
    pub fn phases(&self, id: ComponentId) -> Result<PhaseSet, ModelError> {
        Ok(self.node(id)?.phases)
    }

    /// Opt a component in to or out of a phase.
    pub fn set_phase(&mut self, id: ComponentId, phase: Phase, on: bool) -> Result<(), ModelError> {
        let node = self.node_mut(id)?;
        if on {
            node.phases.insert(phase);
        } else {
            node.phases.remove(phase);
        }
        Ok(())
    }

    /// A component's own warm-up length (0 when it inherits).
    pub fn warm_up_length(&self, id: ComponentId) -> Result<f64, ModelError> {
        Ok(self.node(id)?.warm_up_length)
    }

    /// Give a component its own warm-up length from the next replication.
    ///
    /// For the root, prefer the experiment-wide setting in
    /// [`ExperimentInfo::warm_up_length`], which overrides this at every
    /// replication start.
    pub fn set_warm_up_length(&mut self, id: ComponentId, length: f64) -> Result<(), ModelError> {
        check_length("warm-up length", length)?;
        self.node_mut(id)?.warm_up_length = length;
        Ok(())
    }

    /// A component's own timed-update interval (0 when it inherits).
    pub fn timed_update_interval(&self, id: ComponentId) -> Result<f64, ModelError> {
        Ok(self.node(id)?.timed_update_interval)
    }

    /// Give a component its own timed-update interval from the next
    /// replication.
    pub fn set_timed_update_interval(
        &mut self,
        id: ComponentId,
        interval: f64,
    ) -> Result<(), ModelError> {
        check_length("timed-update interval", interval)?;
        self.node_mut(id)?.timed_update_interval = interval;
        Ok(())
    }

    /// The component whose warm-up event covers `id`.
    ///
    /// Walks upward from `id` itself: the first component that owns a
    /// warm-up event wins. Reaching a component that opted out of
    /// warm-up first, or running off the root, yields `None`.
    pub fn warm_up_owner(&self, id: ComponentId) -> Option<ComponentId> {
        let mut cursor = Some(id);
        while let Some(c) = cursor {
            let node = self.nodes.get(&c)?;
            if node.owns_warm_up() {
                return Some(c);
            }
            if !node.phases.contains(Phase::WarmUp) {
                return None;
            }
            cursor = node.parent;
        }
        None
    }

    /// Simulated time at which `id` warms up; 0 when nothing covers it.
    pub fn effective_warm_up_time(&self, id: ComponentId) -> f64 {
        self.warm_up_owner(id)
            .and_then(|o| self.nodes.get(&o))
            .map_or(0.0, |n| n.warm_up_length)
    }

    // ── Elements ───────────────────────────────────────────────

    /// Borrow a component's behavior by concrete type.
    pub fn element<T: ModelElement>(&self, id: ComponentId) -> Option<&T> {
        let behavior = self.nodes.get(&id)?.behavior.as_deref()?;
        (behavior as &dyn Any).downcast_ref::<T>()
    }

    /// Mutably borrow a component's behavior by concrete type.
    pub fn element_mut<T: ModelElement>(&mut self, id: ComponentId) -> Option<&mut T> {
        let behavior = self.nodes.get_mut(&id)?.behavior.as_deref_mut()?;
        (behavior as &mut dyn Any).downcast_mut::<T>()
    }

    /// Run `f` on a component's behavior with a context for that
    /// component.
    ///
    /// The behavior is checked out of the tree for the duration of `f`;
    /// borrowing it again from inside `f` fails with
    /// [`ModelError::InUse`].
    pub fn with_element<T, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut T, &mut Context<'_>) -> R,
    ) -> Result<R, ModelError>
    where
        T: ModelElement,
    {
        let node = self.node_mut(id)?;
        let Some(mut behavior) = node.behavior.take() else {
            return Err(if node.has_behavior {
                ModelError::InUse { id }
            } else {
                ModelError::TypeMismatch { id }
            });
        };
        let result = match (behavior.as_mut() as &mut dyn Any).downcast_mut::<T>() {
            Some(element) => {
                let mut ctx = Context::new(self, id);
                Ok(f(element, &mut ctx))
            }
            None => Err(ModelError::TypeMismatch { id }),
        };
        self.restore(id, behavior);
        result
    }

    pub(crate) fn restore(&mut self, id: ComponentId, behavior: Box<dyn ModelElement>) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.behavior = Some(behavior);
        }
    }

    /// A context acting on behalf of `id`, for driving the model from
    /// outside event execution.
    pub fn context(&mut self, id: ComponentId) -> Result<Context<'_>, ModelError> {
        self.node(id)?;
        Ok(Context::new(self, id))
    }

    /// Apply a named control to the component called `element`.
    ///
    /// Returns `Ok(false)` when the component has no behavior or does not
    /// recognize `key`.
    pub fn apply_control(
        &mut self,
        element: &str,
        key: &str,
        value: f64,
    ) -> Result<bool, ModelError> {
        let id = self
            .component_id(element)
            .ok_or_else(|| ModelError::UnknownName {
                name: element.to_string(),
            })?;
        let node = self.node_mut(id)?;
        Ok(node
            .behavior
            .as_mut()
            .is_some_and(|b| b.apply_control(key, value)))
    }

    // ── Listeners ──────────────────────────────────────────────

    /// Attach a listener. With `source` set, only notifications about
    /// that component are delivered.
    pub fn attach_listener(
        &mut self,
        source: Option<ComponentId>,
        listener: impl Listener,
    ) -> ListenerId {
        let id = self.ids.next_listener();
        self.listeners.attach(id, source, Box::new(listener));
        id
    }

    /// Detach a listener, handing it back.
    pub fn detach_listener(&mut self, id: ListenerId) -> Option<Box<dyn Listener>> {
        self.listeners.detach(id)
    }

    /// Borrow an attached listener by concrete type.
    pub fn listener<T: Listener>(&self, id: ListenerId) -> Option<&T> {
        (self.listeners.get(id)? as &dyn Any).downcast_ref::<T>()
    }

    /// Mutably borrow an attached listener by concrete type.
    pub fn listener_mut<T: Listener>(&mut self, id: ListenerId) -> Option<&mut T> {
        (self.listeners.get_mut(id)? as &mut dyn Any).downcast_mut::<T>()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn notify(&mut self, source: ComponentId, kind: NotificationKind) {
        let notification = Notification {
            source,
            time: self.calendar.now(),
            replication: self.info.current_replication,
            kind,
        };
        self.listeners.broadcast(&notification);
    }

    // ── Random streams ─────────────────────────────────────────

    /// Create a new random stream keyed by the master seed.
    pub fn create_stream(&mut self) -> StreamId {
        let id = self.ids.next_stream();
        self.streams.insert(id, RandomStream::new(self.seed, id));
        id
    }

    /// Borrow a stream.
    pub fn stream_mut(&mut self, id: StreamId) -> Option<&mut RandomStream> {
        self.streams.get_mut(&id)
    }

    /// Every stream, in creation order.
    pub fn streams_mut(&mut self) -> impl Iterator<Item = &mut RandomStream> {
        self.streams.values_mut()
    }

    /// The master seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Change the master seed and rebuild every stream at the start of
    /// its sequence under the new seed.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = seed;
        for (&id, stream) in self.streams.iter_mut() {
            let antithetic = stream.is_antithetic();
            *stream = RandomStream::new(seed, id);
            stream.set_antithetic(antithetic);
        }
    }

    // ── Run state ──────────────────────────────────────────────

    /// The event calendar.
    pub fn calendar(&self) -> &EventCalendar<Action> {
        &self.calendar
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.calendar.now()
    }

    /// Experiment parameters visible to components.
    pub fn experiment(&self) -> &ExperimentInfo {
        &self.info
    }

    /// Mutable experiment parameters, set by the experiment controller.
    pub fn experiment_mut(&mut self) -> &mut ExperimentInfo {
        &mut self.info
    }

    /// Whether a replication is between its before-replication and
    /// after-replication phases.
    pub fn is_replication_running(&self) -> bool {
        self.replication_running
    }

    /// Bound the conditional-action rescan.
    pub fn set_conditional_max_passes(&mut self, max_passes: usize) {
        self.conditional_max_passes = max_passes.max(1);
    }

    /// Number of registered conditional actions.
    pub fn conditional_action_count(&self) -> usize {
        self.conditionals.len()
    }

    /// Conditional actions fired since the replication started.
    pub fn conditional_actions_fired(&self) -> u64 {
        self.conditional_fired
    }

    /// Why the current replication stopped early, if it did.
    pub fn halt(&self) -> Option<Halt> {
        self.halt
    }
}

fn check_length(what: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidLength { what, value })
    }
}
