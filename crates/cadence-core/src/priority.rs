//! Kernel event priorities.
//!
//! Lower values run first when two events share a time. Model events
//! default to [`DEFAULT`]; the kernel's own events are placed so that
//! timed updates precede ordinary events, warm-up lands just ahead of
//! ordinary events at the same instant, and the end-of-replication
//! event runs after everything else scheduled for that instant.

/// Default priority for model events.
pub const DEFAULT: i32 = 10;

/// Priority of the warm-up event.
pub const WARM_UP: i32 = 9;

/// Priority of timed-update events.
pub const TIMED_UPDATE: i32 = 3;

/// Priority of the end-of-replication event.
pub const END_REPLICATION: i32 = 10_000;
