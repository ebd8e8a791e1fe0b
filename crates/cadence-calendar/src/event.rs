//! The [`Event`] record and the [`Schedule`] request builder.

use std::cmp::Ordering;
use std::fmt;

use cadence_core::{priority, ComponentId, EventId, Message};

use crate::key::EventKey;

/// A request to put an event on the calendar.
///
/// Built with [`Schedule::new`] and refined with the chained setters;
/// handed to [`EventCalendar::schedule`](crate::EventCalendar::schedule).
pub struct Schedule<A> {
    pub(crate) owner: ComponentId,
    pub(crate) action: A,
    pub(crate) delay: f64,
    pub(crate) priority: i32,
    pub(crate) message: Option<Message>,
    pub(crate) name: Option<String>,
}

impl<A> Schedule<A> {
    /// Schedule `action` for `owner`, `delay` time units from now, at the
    /// default priority.
    pub fn new(owner: ComponentId, action: A, delay: f64) -> Self {
        Self {
            owner,
            action,
            delay,
            priority: priority::DEFAULT,
            message: None,
            name: None,
        }
    }

    /// Set the priority (lower runs first at equal times).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a message payload.
    pub fn message(mut self, message: Message) -> Self {
        self.message = Some(message);
        self
    }

    /// Attach an optional message payload.
    pub fn maybe_message(mut self, message: Option<Message>) -> Self {
        self.message = message;
        self
    }

    /// Name the event for tracing.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// A single scheduled occurrence.
///
/// Generic over the action payload `A`; the calendar never interprets it.
/// Two events compare by [`EventKey`]. Distinct events never compare
/// equal because the id is part of the key.
#[derive(Clone)]
pub struct Event<A> {
    pub(crate) id: EventId,
    pub(crate) time: f64,
    pub(crate) priority: i32,
    pub(crate) owner: ComponentId,
    pub(crate) action: A,
    pub(crate) message: Option<Message>,
    pub(crate) name: Option<String>,
    pub(crate) canceled: bool,
    pub(crate) scheduled: bool,
}

impl<A> Event<A> {
    /// Unique id, also the creation sequence.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Simulated time at which the event occurs.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Priority among events at the same time.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The component that scheduled the event.
    pub fn owner(&self) -> ComponentId {
        self.owner
    }

    /// The attached action.
    pub fn action(&self) -> &A {
        &self.action
    }

    /// The attached message, if any.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Downcast the message to a concrete type.
    pub fn message_as<T: 'static>(&self) -> Option<&T> {
        self.message.as_ref().and_then(|m| m.downcast_ref::<T>())
    }

    /// Optional name for tracing.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the event was canceled while pending.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Whether the event is currently on the calendar.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// The ordering key.
    pub fn key(&self) -> EventKey {
        EventKey::new(self.time, self.priority, self.id)
    }
}

impl<A> Ord for Event<A> {
    /// # Panics
    ///
    /// Panics if two events share an id but not a key: ids are unique per
    /// calendar, so this means two calendars' events were mixed.
    fn cmp(&self, other: &Self) -> Ordering {
        let ord = self.key().cmp(&other.key());
        if self.id == other.id && ord != Ordering::Equal {
            panic!(
                "event ordering consistency violated: two distinct events share id {}",
                self.id
            );
        }
        ord
    }
}

impl<A> PartialOrd for Event<A> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<A> PartialEq for Event<A> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<A> Eq for Event<A> {}

impl<A> fmt::Debug for Event<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("priority", &self.priority)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("canceled", &self.canceled)
            .field("scheduled", &self.scheduled)
            .finish()
    }
}
