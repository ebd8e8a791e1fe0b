//! The [`EventCalendar`]: pending events in total order plus the clock.

use std::collections::{BTreeMap, HashMap};

use cadence_core::{CalendarError, ComponentId, EventId};
use tracing::trace;

use crate::event::{Event, Schedule};
use crate::key::EventKey;

/// Running counters kept by the calendar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalendarStats {
    /// Events put on the calendar, counting reschedules.
    pub scheduled: u64,
    /// Events advanced to execution.
    pub executed: u64,
    /// Canceled events discarded at pop time.
    pub canceled_discarded: u64,
    /// Pending events removed outright.
    pub removed: u64,
}

/// Total-ordered container of not-yet-occurring events.
///
/// Owns the simulation clock. The clock only moves forward, and only in
/// [`advance`](Self::advance); every event is scheduled relative to it.
pub struct EventCalendar<A> {
    queue: BTreeMap<EventKey, Event<A>>,
    index: HashMap<EventId, EventKey>,
    in_flight: Option<Event<A>>,
    now: f64,
    next_id: u64,
    stats: CalendarStats,
}

impl<A> EventCalendar<A> {
    /// Create an empty calendar at time zero.
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            index: HashMap::new(),
            in_flight: None,
            now: 0.0,
            next_id: 0,
            stats: CalendarStats::default(),
        }
    }

    /// Current simulated time.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Put a new event on the calendar.
    ///
    /// The event occurs at `now + delay`. Fails with
    /// [`CalendarError::InvalidDelay`] unless the delay is finite and
    /// non-negative; no id is consumed on failure.
    pub fn schedule(&mut self, request: Schedule<A>) -> Result<EventId, CalendarError> {
        check_delay(request.delay)?;
        self.next_id += 1;
        let id = EventId(self.next_id);
        let event = Event {
            id,
            time: self.now + request.delay,
            priority: request.priority,
            owner: request.owner,
            action: request.action,
            message: request.message,
            name: request.name,
            canceled: false,
            scheduled: true,
        };
        self.insert(event);
        Ok(id)
    }

    fn insert(&mut self, event: Event<A>) {
        let key = event.key();
        trace!(
            event = %event.id,
            time = event.time,
            priority = event.priority,
            "event scheduled"
        );
        self.index.insert(event.id, key);
        self.queue.insert(key, event);
        self.stats.scheduled += 1;
    }

    /// Mark a pending event canceled.
    ///
    /// The event stays on the calendar and is discarded when popped.
    /// Returns `true` only the first time a pending event is canceled;
    /// canceling again, or canceling an event that is not pending, is a
    /// no-op.
    pub fn cancel(&mut self, id: EventId) -> bool {
        let Some(key) = self.index.get(&id) else {
            return false;
        };
        match self.queue.get_mut(key) {
            Some(event) if !event.canceled => {
                event.canceled = true;
                true
            }
            _ => false,
        }
    }

    /// Remove a pending event outright, returning it unscheduled.
    ///
    /// The remaining events keep their relative order.
    pub fn remove(&mut self, id: EventId) -> Option<Event<A>> {
        let key = self.index.remove(&id)?;
        let mut event = self.queue.remove(&key)?;
        event.scheduled = false;
        self.stats.removed += 1;
        Some(event)
    }

    /// Re-arm the in-flight event `delay` time units from now, keeping
    /// its priority.
    pub fn reschedule(&mut self, id: EventId, delay: f64) -> Result<(), CalendarError> {
        self.reschedule_inner(id, delay, None)
    }

    /// Re-arm the in-flight event with a new delay and priority.
    pub fn reschedule_with_priority(
        &mut self,
        id: EventId,
        delay: f64,
        priority: i32,
    ) -> Result<(), CalendarError> {
        self.reschedule_inner(id, delay, Some(priority))
    }

    fn reschedule_inner(
        &mut self,
        id: EventId,
        delay: f64,
        priority: Option<i32>,
    ) -> Result<(), CalendarError> {
        if self.index.contains_key(&id) {
            return Err(CalendarError::AlreadyScheduled { event: id });
        }
        check_delay(delay)?;
        match self.in_flight.take() {
            Some(mut event) if event.id == id => {
                event.time = self.now + delay;
                if let Some(p) = priority {
                    event.priority = p;
                }
                event.canceled = false;
                event.scheduled = true;
                self.insert(event);
                Ok(())
            }
            other => {
                self.in_flight = other;
                Err(CalendarError::UnknownEvent { event: id })
            }
        }
    }

    /// Remove and return the earliest non-canceled event.
    ///
    /// Canceled events encountered on the way are discarded. The clock is
    /// not moved; see [`advance`](Self::advance).
    pub fn pop_next(&mut self) -> Option<Event<A>> {
        while let Some((_, mut event)) = self.queue.pop_first() {
            self.index.remove(&event.id);
            event.scheduled = false;
            if event.canceled {
                self.stats.canceled_discarded += 1;
                trace!(event = %event.id, "canceled event discarded");
                continue;
            }
            return Some(event);
        }
        None
    }

    /// Pop the next event, move the clock to its time and make it the
    /// in-flight event.
    ///
    /// Any previous in-flight event is retired first.
    pub fn advance(&mut self) -> Option<&Event<A>> {
        self.in_flight = None;
        let event = self.pop_next()?;
        debug_assert!(event.time >= self.now, "calendar clock moved backwards");
        self.now = event.time;
        self.stats.executed += 1;
        self.in_flight = Some(event);
        self.in_flight.as_ref()
    }

    /// Drop the in-flight event unless it was rescheduled.
    pub fn retire(&mut self) {
        self.in_flight = None;
    }

    /// The event currently executing, if any.
    pub fn in_flight(&self) -> Option<&Event<A>> {
        self.in_flight.as_ref()
    }

    /// Look up a pending or in-flight event.
    pub fn get(&self, id: EventId) -> Option<&Event<A>> {
        if let Some(key) = self.index.get(&id) {
            return self.queue.get(key);
        }
        self.in_flight.as_ref().filter(|e| e.id == id)
    }

    /// Whether the event is on the calendar (canceled or not).
    pub fn is_pending(&self, id: EventId) -> bool {
        self.index.contains_key(&id)
    }

    /// Time of the earliest pending event, canceled or not.
    pub fn peek_time(&self) -> Option<f64> {
        self.queue.first_key_value().map(|(k, _)| k.time)
    }

    /// Number of pending events, canceled ones included.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether no events are pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pending events in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Event<A>> {
        self.queue.values()
    }

    /// Ids of pending events owned by `owner`.
    pub fn owned_by(&self, owner: ComponentId) -> Vec<EventId> {
        self.queue
            .values()
            .filter(|e| e.owner == owner)
            .map(|e| e.id)
            .collect()
    }

    /// Counters since construction.
    pub fn stats(&self) -> CalendarStats {
        self.stats
    }

    /// Drop every pending and in-flight event and rewind the clock to zero.
    ///
    /// The id counter keeps running so ids stay unique across replications.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.index.clear();
        self.in_flight = None;
        self.now = 0.0;
    }
}

impl<A: Clone> EventCalendar<A> {
    /// Advance to the next event and run `execute` on it.
    ///
    /// `execute` receives the calendar itself, so it may schedule new
    /// events or reschedule the one it was handed. Returns `false` when no
    /// event was left to execute.
    pub fn advance_clock_and_execute(
        &mut self,
        execute: impl FnOnce(&mut Self, &Event<A>),
    ) -> bool {
        let Some(event) = self.advance().cloned() else {
            return false;
        };
        execute(self, &event);
        if self.in_flight.as_ref().is_some_and(|e| e.id == event.id) {
            self.retire();
        }
        true
    }
}

impl<A> Default for EventCalendar<A> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_delay(delay: f64) -> Result<(), CalendarError> {
    if delay.is_finite() && delay >= 0.0 {
        Ok(())
    } else {
        Err(CalendarError::InvalidDelay { delay })
    }
}
