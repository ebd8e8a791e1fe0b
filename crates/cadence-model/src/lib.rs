//! Component tree and lifecycle machine for Cadence simulations.
//!
//! A [`Model`] owns an arena of components, the event calendar, the
//! conditional-action registry, listeners and random streams. Components
//! carry optional behavior ([`ModelElement`]) and take part in a fixed
//! sequence of lifecycle phases every replication:
//!
//! | Phase | Order | Driven by |
//! |-------|-------|-----------|
//! | before-experiment | children first | [`Model::before_experiment`] |
//! | before-replication | children first | [`Model::before_replication`] |
//! | initialize | children first | [`Model::initialize`] |
//! | conditional-action registration | children first | [`Model::register_conditional_actions`] |
//! | Monte-Carlo | self first | [`Model::monte_carlo`] |
//! | warm-up, timed update | self first | calendar events |
//! | replication-ended | children first | [`Model::replication_ended`] |
//! | after-replication | children first | [`Model::after_replication`] |
//! | after-experiment | children first | [`Model::after_experiment`] |
//!
//! Every hook is followed by a [`Notification`] to the model's listeners.
//! Hooks, event handlers and conditional actions reach the rest of the
//! model through a [`Context`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod element;
pub mod lifecycle;
pub mod listener;
pub mod model;
mod node;
pub mod random;

pub use context::{ConditionalAction, Context, Predicate};
pub use element::{Action, Callback, Category, ElementSpec, ModelElement, ModelEvent};
pub use listener::{ChannelListener, Listener, Notification, NotificationKind};
pub use model::{ExperimentInfo, Halt, Model, DEFAULT_CONDITIONAL_MAX_PASSES};
pub use random::RandomStream;

// Compile-time assertion: a Model can be moved to a worker thread.
// Fails to compile if any element, listener or callback is !Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Model>();
    }
};
