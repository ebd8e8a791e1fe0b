//! Notifications broadcast to listeners owned by the model.
//!
//! Every lifecycle hook and every value update produces one
//! [`Notification`]. Listeners are registered with an optional source
//! filter and receive only the notifications they asked for.

use std::any::Any;

use cadence_core::{ComponentId, ListenerId, Phase};
use crossbeam_channel::Sender;

/// What happened to the source component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NotificationKind {
    /// The component entered a lifecycle phase.
    Entered(Phase),
    /// The component's observed value changed.
    Value {
        /// The new value.
        value: f64,
        /// The value before the change.
        previous: f64,
    },
}

/// One broadcast from a component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Notification {
    /// The component the notification is about.
    pub source: ComponentId,
    /// Simulated time of the notification.
    pub time: f64,
    /// Current replication, 1-based (0 before the first replication).
    pub replication: u32,
    /// What happened.
    pub kind: NotificationKind,
}

impl Notification {
    /// The phase entered, if this is a phase notification.
    pub fn phase(&self) -> Option<Phase> {
        match self.kind {
            NotificationKind::Entered(p) => Some(p),
            NotificationKind::Value { .. } => None,
        }
    }
}

/// Receives notifications from the model.
///
/// Listeners cannot reach back into the model; they observe only. A
/// listener owned by the model can be borrowed back by type through
/// [`Model::listener`](crate::Model::listener).
pub trait Listener: Any + Send {
    /// Handle one notification.
    fn notify(&mut self, notification: &Notification);
}

/// Forwards notifications over a channel for out-of-band consumers.
pub struct ChannelListener {
    tx: Sender<Notification>,
}

impl ChannelListener {
    /// Forward every notification into `tx`.
    pub fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl Listener for ChannelListener {
    fn notify(&mut self, notification: &Notification) {
        // A dropped receiver means nobody is watching any more.
        let _ = self.tx.send(*notification);
    }
}

pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    pub(crate) source: Option<ComponentId>,
    pub(crate) listener: Box<dyn Listener>,
}

/// Registered listeners in attachment order.
#[derive(Default)]
pub(crate) struct Listeners {
    entries: Vec<Registration>,
}

impl Listeners {
    pub(crate) fn attach(
        &mut self,
        id: ListenerId,
        source: Option<ComponentId>,
        listener: Box<dyn Listener>,
    ) {
        self.entries.push(Registration {
            id,
            source,
            listener,
        });
    }

    pub(crate) fn detach(&mut self, id: ListenerId) -> Option<Box<dyn Listener>> {
        let at = self.entries.iter().position(|r| r.id == id)?;
        Some(self.entries.remove(at).listener)
    }

    pub(crate) fn get(&self, id: ListenerId) -> Option<&dyn Listener> {
        self.entries
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.listener.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ListenerId) -> Option<&mut dyn Listener> {
        self.entries
            .iter_mut()
            .find(|r| r.id == id)
            .map(|r| r.listener.as_mut())
    }

    pub(crate) fn broadcast(&mut self, notification: &Notification) {
        for r in &mut self.entries {
            if r.source.is_none_or(|s| s == notification.source) {
                r.listener.notify(notification);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<Notification>);

    impl Listener for Recorder {
        fn notify(&mut self, n: &Notification) {
            self.0.push(*n);
        }
    }

    fn note(source: u32, phase: Phase) -> Notification {
        Notification {
            source: ComponentId(source),
            time: 0.0,
            replication: 1,
            kind: NotificationKind::Entered(phase),
        }
    }

    #[test]
    fn source_filter_applies() {
        let mut ls = Listeners::default();
        ls.attach(ListenerId(0), Some(ComponentId(1)), Box::<Recorder>::default());
        ls.attach(ListenerId(1), None, Box::<Recorder>::default());
        ls.broadcast(&note(1, Phase::Initialize));
        ls.broadcast(&note(2, Phase::Initialize));

        let filtered = ls.get(ListenerId(0)).unwrap() as &dyn Any;
        assert_eq!(filtered.downcast_ref::<Recorder>().unwrap().0.len(), 1);
        let all = ls.get(ListenerId(1)).unwrap() as &dyn Any;
        assert_eq!(all.downcast_ref::<Recorder>().unwrap().0.len(), 2);
    }

    #[test]
    fn channel_listener_forwards() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut l = ChannelListener::new(tx);
        l.notify(&note(3, Phase::WarmUp));
        assert_eq!(rx.try_recv().unwrap().phase(), Some(Phase::WarmUp));
    }

    #[test]
    fn detach_returns_listener() {
        let mut ls = Listeners::default();
        ls.attach(ListenerId(7), None, Box::<Recorder>::default());
        assert!(ls.detach(ListenerId(7)).is_some());
        assert!(ls.detach(ListenerId(7)).is_none());
        assert_eq!(ls.len(), 0);
    }
}
