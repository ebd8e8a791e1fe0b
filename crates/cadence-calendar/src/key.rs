//! The [`EventKey`] total order.

use std::cmp::Ordering;

use cadence_core::EventId;

/// Key for ordering events on the calendar.
///
/// Events are ordered by:
/// 1. Time (earlier first)
/// 2. Priority (lower value first)
/// 3. Id (creation order)
///
/// Times compare with [`f64::total_cmp`]. The calendar never admits NaN,
/// so this agrees with the numeric order for every stored key.
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    /// When the event occurs.
    pub time: f64,
    /// Tie-break among events at the same time.
    pub priority: i32,
    /// Creation sequence; final tie-break.
    pub id: EventId,
}

impl EventKey {
    /// Build a key.
    pub fn new(time: f64, priority: i32, id: EventId) -> Self {
        Self { time, priority, id }
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.time.total_cmp(&other.time) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => {}
            ord => return ord,
        }
        self.id.cmp(&other.id)
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}
