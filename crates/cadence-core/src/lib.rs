//! Core types for the Cadence discrete-event simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: identifiers,
//! lifecycle phases and their opt-in sets, kernel event priorities,
//! and the error types raised by the calendar and component tree.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod phase;
pub mod priority;

pub use error::{CalendarError, KernelError, ModelError};
pub use id::{ComponentId, EventId, IdGenerator, ListenerId, StreamId};
pub use phase::{Phase, PhaseSet};

use std::any::Any;
use std::sync::Arc;

/// Opaque payload attached to a scheduled event.
///
/// Handlers recover the concrete type with `downcast_ref`. Shared so that
/// rescheduling an executed event keeps its message without copying.
pub type Message = Arc<dyn Any + Send + Sync>;
