//! Test fixtures for Cadence development.
//!
//! Provides a recording listener ([`NotificationLog`]) and small model
//! elements in [`fixtures`] for building test scenarios.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use cadence_core::{ComponentId, Phase};
use cadence_model::{Listener, Notification, NotificationKind};

/// Records every notification it receives.
///
/// Attach it to a model and borrow it back with
/// `model.listener::<NotificationLog>(id)`.
#[derive(Clone, Debug, Default)]
pub struct NotificationLog {
    entries: Vec<Notification>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Notification] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Times at which `source` entered `phase`.
    pub fn entered(&self, source: ComponentId, phase: Phase) -> Vec<f64> {
        self.entries
            .iter()
            .filter(|n| n.source == source && n.phase() == Some(phase))
            .map(|n| n.time)
            .collect()
    }

    /// `(time, value)` of every value update from `source`.
    pub fn values(&self, source: ComponentId) -> Vec<(f64, f64)> {
        self.entries
            .iter()
            .filter(|n| n.source == source)
            .filter_map(|n| match n.kind {
                NotificationKind::Value { value, .. } => Some((n.time, value)),
                NotificationKind::Entered(_) => None,
            })
            .collect()
    }

    /// Phases entered by any component, in order.
    pub fn phases(&self) -> Vec<(ComponentId, Phase)> {
        self.entries
            .iter()
            .filter_map(|n| n.phase().map(|p| (n.source, p)))
            .collect()
    }
}

impl Listener for NotificationLog {
    fn notify(&mut self, notification: &Notification) {
        self.entries.push(*notification);
    }
}
