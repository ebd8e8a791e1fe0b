//! Error types for the Cadence simulation kernel.
//!
//! Organized by subsystem: the event calendar, the component tree, and
//! the kernel's run-time checks. Configuration problems are reported as
//! values; invariant violations inside the kernel panic instead.

use std::error::Error;
use std::fmt;

use crate::id::{ComponentId, EventId};

/// Errors from event calendar operations.
#[derive(Clone, Debug, PartialEq)]
pub enum CalendarError {
    /// A delay was negative, NaN or infinite.
    InvalidDelay {
        /// The rejected delay.
        delay: f64,
    },
    /// The event is already on the calendar; its timing is locked.
    AlreadyScheduled {
        /// The scheduled event.
        event: EventId,
    },
    /// The event is neither pending nor the one currently executing.
    UnknownEvent {
        /// The unknown event.
        event: EventId,
    },
}

impl fmt::Display for CalendarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDelay { delay } => {
                write!(f, "event delay must be finite and >= 0, got {delay}")
            }
            Self::AlreadyScheduled { event } => {
                write!(f, "event {event} is already scheduled")
            }
            Self::UnknownEvent { event } => {
                write!(f, "event {event} is neither pending nor executing")
            }
        }
    }
}

impl Error for CalendarError {}

/// Errors from component-tree operations.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelError {
    /// Another component already uses (or used) this name.
    DuplicateName {
        /// The contested name.
        name: String,
    },
    /// Component names must be non-empty.
    EmptyName,
    /// The id does not refer to a live component.
    UnknownComponent {
        /// The missing component.
        id: ComponentId,
    },
    /// The model root cannot be removed or re-parented.
    RootImmutable,
    /// Re-parenting would create a cycle.
    InvalidReparent {
        /// The component being moved.
        id: ComponentId,
        /// The rejected new parent.
        new_parent: ComponentId,
    },
    /// A warm-up length or timed-update interval was negative or NaN.
    InvalidLength {
        /// Which setting was rejected.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// No live component has this name.
    UnknownName {
        /// The name looked up.
        name: String,
    },
    /// The component exists but is not of the requested type.
    TypeMismatch {
        /// The component that was downcast.
        id: ComponentId,
    },
    /// The component's element is executing and cannot be borrowed again.
    InUse {
        /// The busy component.
        id: ComponentId,
    },
    /// A calendar operation issued on behalf of a component failed.
    Calendar(CalendarError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "component name '{name}' is already taken"),
            Self::EmptyName => write!(f, "component name must not be empty"),
            Self::UnknownComponent { id } => write!(f, "no live component with id {id}"),
            Self::RootImmutable => write!(f, "the model root cannot be removed or moved"),
            Self::InvalidReparent { id, new_parent } => write!(
                f,
                "cannot move component {id} under {new_parent}: it is a descendant"
            ),
            Self::InvalidLength { what, value } => {
                write!(f, "{what} must be finite and >= 0, got {value}")
            }
            Self::UnknownName { name } => write!(f, "no live component named '{name}'"),
            Self::TypeMismatch { id } => {
                write!(f, "component {id} is not of the requested type")
            }
            Self::InUse { id } => write!(f, "component {id} is already borrowed"),
            Self::Calendar(e) => write!(f, "calendar: {e}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Calendar(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CalendarError> for ModelError {
    fn from(e: CalendarError) -> Self {
        Self::Calendar(e)
    }
}

/// Fatal run-time anomalies detected by the kernel.
///
/// Distinct from configuration errors: these indicate a modeling bug,
/// not bad input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// Conditional actions kept firing past the configured pass limit,
    /// which almost always means two actions re-enable each other.
    ConditionalActionCycle {
        /// The pass limit that was exceeded.
        max_passes: usize,
    },
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConditionalActionCycle { max_passes } => write!(
                f,
                "conditional actions still firing after {max_passes} passes (likely an action cycle)"
            ),
        }
    }
}

impl Error for KernelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_wraps_calendar_source() {
        let err = ModelError::from(CalendarError::InvalidDelay { delay: -1.0 });
        assert!(err.to_string().contains("delay"));
        assert!(err.source().is_some());
    }

    #[test]
    fn cycle_error_names_limit() {
        let err = KernelError::ConditionalActionCycle { max_passes: 1000 };
        assert!(err.to_string().contains("1000"));
    }
}
