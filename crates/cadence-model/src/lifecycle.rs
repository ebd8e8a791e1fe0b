//! Lifecycle propagation and event execution.
//!
//! Tree-wide phases visit every live component. Bottom-up phases run a
//! component's children before the component itself; Monte-Carlo, warm-up
//! and timed updates run top-down. A component that opted out of a phase
//! is skipped, but its children are still visited, except for warm-up,
//! where opting out cuts off the whole subtree.
//!
//! Warm-up and timed-update events belong to the component that scheduled
//! them and fire for its subtree. Descendants that schedule their own
//! event of the same kind are left to it.

use cadence_calendar::{resolve, Schedule};
use cadence_core::{priority, ComponentId, KernelError, ModelError, Phase};
use tracing::{debug, trace};

use crate::context::Context;
use crate::element::{run_phase_hook, Action, ModelEvent};
use crate::listener::NotificationKind;
use crate::model::{Halt, Model};

impl Model {
    // ── Tree-wide phases ───────────────────────────────────────

    /// Run the before-experiment phase on the whole tree.
    pub fn before_experiment(&mut self) {
        self.info.current_replication = 0;
        self.propagate(self.root, Phase::BeforeExperiment);
    }

    /// Start a replication.
    ///
    /// Clears the calendar (the clock returns to 0) and the conditional
    /// actions, gives the root the experiment warm-up length, schedules
    /// every component's own warm-up and timed-update events, runs the
    /// before-replication phase and, for a finite `length`, schedules the
    /// end-of-replication event.
    pub fn before_replication(&mut self, length: f64) -> Result<(), ModelError> {
        self.calendar.reset();
        self.conditionals.clear();
        self.conditional_fired = 0;
        self.halt = None;
        self.replication_running = true;

        let warm_up = self.info.warm_up_length;
        self.set_warm_up_length(self.root, warm_up)?;
        for node in self.nodes.values_mut() {
            node.warm_up_event = None;
            node.timed_update_event = None;
        }
        self.schedule_private_events(self.root, length)?;
        self.propagate(self.root, Phase::BeforeReplication);

        if length.is_finite() {
            let request = Schedule::new(self.root, Action::EndReplication, length)
                .priority(priority::END_REPLICATION)
                .name("end replication");
            self.calendar.schedule(request)?;
        }
        debug!(
            replication = self.info.current_replication,
            length,
            warm_up,
            pending = self.calendar.len(),
            "replication started"
        );
        Ok(())
    }

    fn schedule_private_events(&mut self, id: ComponentId, length: f64) -> Result<(), ModelError> {
        for child in self.children_snapshot(id) {
            self.schedule_private_events(child, length)?;
        }
        let node = self.node(id)?;
        let (warm_up, interval) = (node.warm_up_length, node.timed_update_interval);
        // A warm-up at or beyond the horizon would only fire after the
        // statistics were collected.
        if warm_up > 0.0 && warm_up < length {
            let request = Schedule::new(id, Action::WarmUp, warm_up)
                .priority(priority::WARM_UP)
                .name("warm up");
            let event = self.calendar.schedule(request)?;
            self.node_mut(id)?.warm_up_event = Some(event);
        }
        if interval > 0.0 {
            let request = Schedule::new(id, Action::TimedUpdate, interval)
                .priority(priority::TIMED_UPDATE)
                .name("timed update");
            let event = self.calendar.schedule(request)?;
            self.node_mut(id)?.timed_update_event = Some(event);
        }
        Ok(())
    }

    /// Run the initialize phase.
    pub fn initialize(&mut self) {
        self.propagate(self.root, Phase::Initialize);
    }

    /// Run conditional-action registration.
    pub fn register_conditional_actions(&mut self) {
        self.propagate(self.root, Phase::ConditionalActionRegistration);
    }

    /// Run the Monte-Carlo pass.
    pub fn monte_carlo(&mut self) {
        self.propagate(self.root, Phase::MonteCarlo);
    }

    /// Run the replication-ended phase.
    pub fn replication_ended(&mut self) {
        self.propagate(self.root, Phase::ReplicationEnded);
    }

    /// Run the after-replication phase, then mark components that asked to
    /// be removed after the replication they were added in.
    pub fn after_replication(&mut self) {
        self.propagate(self.root, Phase::AfterReplication);
        self.replication_running = false;
        let mut marked = false;
        for node in self.nodes.values_mut() {
            if node.added_during_replication && node.remove_after_replication {
                node.marked_for_removal = true;
                marked = true;
            }
        }
        self.removal_pending |= marked;
    }

    /// Run the after-experiment phase.
    pub fn after_experiment(&mut self) {
        self.propagate(self.root, Phase::AfterExperiment);
    }

    pub(crate) fn propagate(&mut self, id: ComponentId, phase: Phase) {
        let children = self.children_snapshot(id);
        if phase.children_first() {
            for child in children {
                self.propagate(child, phase);
            }
            self.run_hook(id, phase);
        } else {
            self.run_hook(id, phase);
            for child in children {
                self.propagate(child, phase);
            }
        }
    }

    /// Run one component's hook for `phase`, then notify listeners.
    pub(crate) fn run_hook(&mut self, id: ComponentId, phase: Phase) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        if !node.phases.contains(phase) {
            return;
        }
        if let Some(mut behavior) = node.behavior.take() {
            let mut ctx = Context::new(self, id);
            run_phase_hook(behavior.as_mut(), &mut ctx, phase);
            self.restore(id, behavior);
        }
        trace!(component = %id, phase = phase.as_str(), "phase entered");
        self.notify(id, NotificationKind::Entered(phase));
    }

    // ── Event execution ────────────────────────────────────────

    /// Execute the next event.
    ///
    /// Returns the event's time, or `None` when the calendar is empty.
    /// After the event, marked components are removed if automatic
    /// removal is on and the conditional actions are resolved.
    pub fn step(&mut self) -> Result<Option<f64>, KernelError> {
        let Some(event) = self.calendar.advance().cloned() else {
            return Ok(None);
        };
        let time = event.time();
        trace!(
            event = %event.id(),
            time,
            owner = %event.owner(),
            action = ?event.action(),
            "executing"
        );

        match event.action() {
            Action::Handler(_) => self.dispatch_handler(&event),
            Action::Callback(callback) => {
                if self.nodes.contains_key(&event.owner()) {
                    let mut ctx = Context::new(self, event.owner());
                    callback(&mut ctx, &event);
                }
            }
            Action::WarmUp => {
                if let Some(node) = self.nodes.get_mut(&event.owner()) {
                    node.warm_up_event = None;
                }
                debug!(owner = %event.owner(), time, "warm-up");
                self.warm_up_subtree(event.owner());
            }
            Action::TimedUpdate => {
                self.timed_update_subtree(event.owner());
                self.rearm_timed_update(&event);
            }
            Action::EndReplication => {
                self.halt.get_or_insert(Halt::EndEvent);
            }
        }
        self.calendar.retire();

        if self.auto_removal && self.removal_pending {
            self.remove_marked();
        }
        if !matches!(event.action(), Action::EndReplication) {
            self.resolve_conditionals()?;
        }
        Ok(Some(time))
    }

    fn dispatch_handler(&mut self, event: &ModelEvent) {
        let owner = event.owner();
        let Some(node) = self.nodes.get_mut(&owner) else {
            return;
        };
        match node.behavior.take() {
            Some(mut behavior) => {
                let mut ctx = Context::new(self, owner);
                behavior.handle_event(&mut ctx, event);
                self.restore(owner, behavior);
            }
            None => trace!(component = %owner, "handler event for a component without behavior"),
        }
    }

    fn warm_up_subtree(&mut self, id: ComponentId) {
        self.run_hook(id, Phase::WarmUp);
        for child in self.children_snapshot(id) {
            let inherits = self
                .nodes
                .get(&child)
                .is_some_and(|n| !n.owns_warm_up() && n.phases.contains(Phase::WarmUp));
            if inherits {
                self.warm_up_subtree(child);
            }
        }
    }

    fn timed_update_subtree(&mut self, id: ComponentId) {
        self.run_hook(id, Phase::TimedUpdate);
        for child in self.children_snapshot(id) {
            let inherits = self
                .nodes
                .get(&child)
                .is_some_and(|n| !n.owns_timed_update());
            if inherits {
                self.timed_update_subtree(child);
            }
        }
    }

    fn rearm_timed_update(&mut self, event: &ModelEvent) {
        let Some(node) = self.nodes.get(&event.owner()) else {
            return;
        };
        if !node.owns_timed_update() || node.timed_update_event != Some(event.id()) {
            return;
        }
        let interval = node.timed_update_interval;
        if let Err(e) = self.calendar.reschedule(event.id(), interval) {
            debug!(event = %event.id(), error = %e, "timed update not re-armed");
        }
    }

    fn resolve_conditionals(&mut self) -> Result<(), KernelError> {
        if self.conditionals.is_empty() {
            return Ok(());
        }
        let max_passes = self.conditional_max_passes;
        let fired = resolve(
            self,
            max_passes,
            |m: &Model| m.conditionals.snapshot(),
            |m, id, c| {
                if !m.conditionals.contains(id) || !m.nodes.contains_key(&c.owner) {
                    return false;
                }
                let mut ctx = Context::new(m, c.owner);
                if (c.predicate)(&ctx) {
                    (c.action)(&mut ctx);
                    true
                } else {
                    false
                }
            },
        )?;
        self.conditional_fired += fired as u64;
        Ok(())
    }
}
