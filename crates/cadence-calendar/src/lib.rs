//! Event calendar and conditional-action registry for Cadence simulations.
//!
//! The calendar holds every not-yet-occurring event in a strict total
//! order over `(time, priority, id)`. Ids come from a monotonic counter, so
//! events that share a time and priority run in creation order and a fixed
//! sequence of inputs always replays identically.
//!
//! # Event lifecycle
//!
//! ```text
//! schedule ──► pending ──► advance ──► in flight ──► retire (dropped)
//!                 │                       │
//!                 │ cancel                └─ reschedule ──► pending
//!                 ▼
//!       skipped when popped
//! ```
//!
//! Only the in-flight event (executed, no longer on the calendar) can be
//! rescheduled. A pending event's time and priority are locked.
//!
//! The [`ConditionalActions`] registry holds state-dependent actions that
//! are polled after every event by [`resolve`](conditional::resolve).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod conditional;
pub mod event;
pub mod key;

pub use calendar::{CalendarStats, EventCalendar};
pub use conditional::{resolve, ConditionalActionId, ConditionalActions};
pub use event::{Event, Schedule};
pub use key::EventKey;
