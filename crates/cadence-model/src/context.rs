//! [`Context`]: the component API handed to hooks, handlers and
//! conditional actions.

use std::sync::Arc;

use cadence_calendar::{ConditionalActionId, Schedule};
use cadence_core::{priority, ComponentId, EventId, Message, ModelError, StreamId};

use crate::element::{Action, ElementSpec, ModelElement};
use crate::listener::NotificationKind;
use crate::model::{ExperimentInfo, Halt, Model};
use crate::random::RandomStream;

/// Predicate polled after every event.
pub type Predicate = Arc<dyn Fn(&Context<'_>) -> bool + Send + Sync>;

/// Action run when its predicate holds.
pub type ConditionalAction = Arc<dyn Fn(&mut Context<'_>) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Conditional {
    pub(crate) owner: ComponentId,
    pub(crate) predicate: Predicate,
    pub(crate) action: ConditionalAction,
}

/// Mutable access to the model on behalf of one component.
///
/// Events scheduled through a context are owned by its component and are
/// dropped if the component is removed.
pub struct Context<'m> {
    model: &'m mut Model,
    current: ComponentId,
}

impl<'m> Context<'m> {
    pub(crate) fn new(model: &'m mut Model, current: ComponentId) -> Self {
        Self { model, current }
    }

    /// The component this context acts for.
    pub fn current(&self) -> ComponentId {
        self.current
    }

    /// The current component's name.
    pub fn name(&self) -> &str {
        self.model.name_of(self.current).unwrap_or_default()
    }

    /// Read-only view of the whole model.
    pub fn model(&self) -> &Model {
        &*self.model
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.model.now()
    }

    /// Experiment parameters.
    pub fn experiment(&self) -> &ExperimentInfo {
        self.model.experiment()
    }

    /// Current replication, 1-based.
    pub fn replication(&self) -> u32 {
        self.model.experiment().current_replication
    }

    /// When the current component's warm-up happens; 0 if never.
    pub fn warm_up_time(&self) -> f64 {
        self.model.effective_warm_up_time(self.current)
    }

    // ── Events ─────────────────────────────────────────────────

    /// Schedule `action` `delay` time units from now at the default
    /// priority.
    pub fn schedule(&mut self, action: Action, delay: f64) -> Result<EventId, ModelError> {
        self.schedule_with(action, delay, priority::DEFAULT, None)
    }

    /// Schedule a handler event routed back to this component.
    pub fn schedule_handler(&mut self, tag: u32, delay: f64) -> Result<EventId, ModelError> {
        self.schedule(Action::Handler(tag), delay)
    }

    /// Schedule with an explicit priority and optional message.
    pub fn schedule_with(
        &mut self,
        action: Action,
        delay: f64,
        priority: i32,
        message: Option<Message>,
    ) -> Result<EventId, ModelError> {
        let request = Schedule::new(self.current, action, delay)
            .priority(priority)
            .maybe_message(message);
        Ok(self.model.calendar.schedule(request)?)
    }

    /// Cancel a pending event. Idempotent.
    pub fn cancel(&mut self, event: EventId) -> bool {
        self.model.calendar.cancel(event)
    }

    /// Re-arm the event currently executing.
    pub fn reschedule(&mut self, event: EventId, delay: f64) -> Result<(), ModelError> {
        Ok(self.model.calendar.reschedule(event, delay)?)
    }

    /// Re-arm the event currently executing with a new priority.
    pub fn reschedule_with_priority(
        &mut self,
        event: EventId,
        delay: f64,
        priority: i32,
    ) -> Result<(), ModelError> {
        Ok(self
            .model
            .calendar
            .reschedule_with_priority(event, delay, priority)?)
    }

    /// Whether an event is still on the calendar.
    pub fn is_pending(&self, event: EventId) -> bool {
        self.model.calendar.is_pending(event)
    }

    // ── Conditional actions ────────────────────────────────────

    /// Register a conditional action for the rest of the replication.
    ///
    /// After every event the kernel evaluates `predicate`; when it holds,
    /// `action` runs and the scan restarts from the first registered
    /// action. Lower priorities are scanned first.
    pub fn register_conditional<P, F>(
        &mut self,
        priority: i32,
        predicate: P,
        action: F,
    ) -> ConditionalActionId
    where
        P: Fn(&Context<'_>) -> bool + Send + Sync + 'static,
        F: Fn(&mut Context<'_>) + Send + Sync + 'static,
    {
        self.model.conditionals.register(
            priority,
            Conditional {
                owner: self.current,
                predicate: Arc::new(predicate),
                action: Arc::new(action),
            },
        )
    }

    /// Remove a conditional action.
    pub fn unregister_conditional(&mut self, id: ConditionalActionId) -> bool {
        self.model.conditionals.unregister(id)
    }

    // ── Components ─────────────────────────────────────────────

    /// Borrow another component's behavior by type.
    pub fn element<T: ModelElement>(&self, id: ComponentId) -> Option<&T> {
        self.model.element(id)
    }

    /// Mutably borrow another component's behavior by type.
    pub fn element_mut<T: ModelElement>(&mut self, id: ComponentId) -> Option<&mut T> {
        self.model.element_mut(id)
    }

    /// Run `f` on another component's behavior with that component's
    /// context.
    pub fn with_element<T, R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut T, &mut Context<'_>) -> R,
    ) -> Result<R, ModelError>
    where
        T: ModelElement,
    {
        self.model.with_element(id, f)
    }

    /// Add a structural child under the current component.
    pub fn add_child(&mut self, spec: ElementSpec) -> Result<ComponentId, ModelError> {
        self.model.insert(self.current, spec, None)
    }

    /// Add a child with behavior under the current component.
    pub fn add_child_element(
        &mut self,
        spec: ElementSpec,
        element: impl ModelElement,
    ) -> Result<ComponentId, ModelError> {
        self.model.insert(self.current, spec, Some(Box::new(element)))
    }

    /// Flag a component for deferred removal.
    pub fn mark_for_removal(&mut self, id: ComponentId) -> Result<(), ModelError> {
        self.model.mark_for_removal(id)
    }

    // ── Notifications and control ──────────────────────────────

    /// Tell listeners the current component's value changed.
    pub fn notify_value(&mut self, value: f64, previous: f64) {
        self.model
            .notify(self.current, NotificationKind::Value { value, previous });
    }

    /// Stop the replication after the current event.
    pub fn stop_replication(&mut self) {
        self.model.halt.get_or_insert(Halt::Requested);
    }

    /// Borrow a random stream.
    pub fn stream(&mut self, id: StreamId) -> Option<&mut RandomStream> {
        self.model.stream_mut(id)
    }
}
