//! Conditional actions: state-dependent actions polled after each event.
//!
//! Entries are kept sorted by `(priority, registration order)`. The
//! registry is cleared at the start of every replication and re-filled by
//! the conditional-action registration phase.

use std::fmt;

use cadence_core::KernelError;
use tracing::trace;

/// Handle to a registered conditional action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConditionalActionId(pub u64);

impl fmt::Display for ConditionalActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Entry<A> {
    id: ConditionalActionId,
    priority: i32,
    action: A,
}

/// Registry of conditional actions in scan order.
pub struct ConditionalActions<A> {
    entries: Vec<Entry<A>>,
    next_id: u64,
}

impl<A> ConditionalActions<A> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Register an action. Lower priorities are scanned first; equal
    /// priorities keep registration order.
    pub fn register(&mut self, priority: i32, action: A) -> ConditionalActionId {
        self.next_id += 1;
        let id = ConditionalActionId(self.next_id);
        // Insert after every entry with priority <= the new one.
        let at = self.entries.partition_point(|e| e.priority <= priority);
        self.entries.insert(
            at,
            Entry {
                id,
                priority,
                action,
            },
        );
        id
    }

    /// Remove a registered action. Returns `false` if it was not present.
    pub fn unregister(&mut self, id: ConditionalActionId) -> bool {
        match self.entries.iter().position(|e| e.id == id) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Keep only the actions for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&A) -> bool) {
        self.entries.retain(|e| keep(&e.action));
    }

    /// Remove every action.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no actions are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: ConditionalActionId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Actions in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &A> {
        self.entries.iter().map(|e| &e.action)
    }
}

impl<A: Clone> ConditionalActions<A> {
    /// Clone the actions and their ids in scan order.
    ///
    /// A snapshot is only valid for one pass of [`resolve`]: a firing
    /// action may register or unregister others, so callers check
    /// [`contains`](Self::contains) before firing an entry.
    pub fn snapshot(&self) -> Vec<(ConditionalActionId, A)> {
        self.entries
            .iter()
            .map(|e| (e.id, e.action.clone()))
            .collect()
    }
}

impl<A> Default for ConditionalActions<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan the registry held in `state` in order, firing each action whose
/// predicate holds.
///
/// Every pass starts from a fresh `snapshot` of the live registry, so
/// actions registered by a firing action are seen on the next pass and
/// removed ones are not. `try_fire` evaluates an action's predicate and,
/// if it holds, runs the action and returns `true`. After any firing the
/// scan restarts from the first action. Resolution ends with a full pass
/// in which nothing fires.
///
/// Returns the number of actions fired, or
/// [`KernelError::ConditionalActionCycle`] once more than `max_passes`
/// passes were needed.
pub fn resolve<S: ?Sized, A>(
    state: &mut S,
    max_passes: usize,
    snapshot: impl Fn(&S) -> Vec<(ConditionalActionId, A)>,
    mut try_fire: impl FnMut(&mut S, ConditionalActionId, &A) -> bool,
) -> Result<usize, KernelError> {
    let mut fired = 0;
    let mut passes = 0;
    'scan: loop {
        passes += 1;
        if passes > max_passes {
            return Err(KernelError::ConditionalActionCycle { max_passes });
        }
        for (id, action) in snapshot(&*state) {
            if try_fire(state, id, &action) {
                fired += 1;
                continue 'scan;
            }
        }
        break;
    }
    if fired > 0 {
        trace!(fired, passes, "conditional actions resolved");
    }
    Ok(fired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions<A: Copy>(reg: &ConditionalActions<A>) -> Vec<A> {
        reg.iter().copied().collect()
    }

    /// Registry of actions paired with a scratch state they act on.
    struct Bench<A, T> {
        reg: ConditionalActions<A>,
        data: T,
    }

    fn live<A: Clone, T>(b: &Bench<A, T>) -> Vec<(ConditionalActionId, A)> {
        b.reg.snapshot()
    }

    #[test]
    fn scan_order_is_priority_then_registration() {
        let mut reg = ConditionalActions::new();
        reg.register(5, "b");
        reg.register(1, "a");
        reg.register(5, "c");
        reg.register(0, "first");
        assert_eq!(actions(&reg), vec!["first", "a", "b", "c"]);
    }

    #[test]
    fn snapshot_pairs_ids_with_actions() {
        let mut reg = ConditionalActions::new();
        let b = reg.register(2, 'b');
        let a = reg.register(1, 'a');
        assert_eq!(reg.snapshot(), vec![(a, 'a'), (b, 'b')]);
        assert!(reg.contains(a));
        reg.unregister(a);
        assert!(!reg.contains(a));
    }

    #[test]
    fn unregister_removes_once() {
        let mut reg = ConditionalActions::new();
        let a = reg.register(1, 'a');
        reg.register(1, 'b');
        assert!(reg.unregister(a));
        assert!(!reg.unregister(a));
        assert_eq!(actions(&reg), vec!['b']);
    }

    #[test]
    fn retain_keeps_scan_order() {
        let mut reg = ConditionalActions::new();
        for (p, a) in [(2, 1), (1, 2), (2, 3), (0, 4)] {
            reg.register(p, a);
        }
        reg.retain(|a| *a != 2);
        assert_eq!(actions(&reg), vec![4, 1, 3]);
    }

    #[test]
    fn firing_restarts_scan_from_top() {
        // Action 0 fires while x < y, action 1 moves y up while y < 3.
        // The top action must re-fire after the bottom one.
        let mut reg = ConditionalActions::new();
        reg.register(0, 0);
        reg.register(1, 1);
        let mut bench = Bench {
            reg,
            data: (0, 0, Vec::new()),
        };
        let fired = resolve(&mut bench, 100, live, |b, _, a| {
            let (x, y, order) = &mut b.data;
            match a {
                0 if *x < *y => {
                    *x += 1;
                    order.push(0);
                    true
                }
                1 if *y < 3 => {
                    *y += 1;
                    order.push(1);
                    true
                }
                _ => false,
            }
        })
        .unwrap();
        assert_eq!(fired, 6);
        assert_eq!(bench.data.2, vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn quiet_registry_takes_one_pass() {
        let mut reg = ConditionalActions::new();
        reg.register(0, ());
        reg.register(0, ());
        let mut bench = Bench { reg, data: 0 };
        let fired = resolve(&mut bench, 1, live, |b, _, _| {
            b.data += 1;
            false
        })
        .unwrap();
        assert_eq!(fired, 0);
        assert_eq!(bench.data, 2);
    }

    #[test]
    fn cycle_is_reported() {
        let mut reg = ConditionalActions::new();
        reg.register(0, "ping");
        reg.register(0, "pong");
        let mut bench = Bench { reg, data: () };
        let err = resolve(&mut bench, 1000, live, |_, _, _| true).unwrap_err();
        assert_eq!(err, KernelError::ConditionalActionCycle { max_passes: 1000 });
    }

    #[test]
    fn action_that_unregisters_itself_fires_once() {
        let mut reg = ConditionalActions::new();
        reg.register(0, ());
        let mut bench = Bench { reg, data: 0 };
        let fired = resolve(&mut bench, 3, live, |b, id, _| {
            b.data += 1;
            b.reg.unregister(id)
        })
        .unwrap();
        assert_eq!(fired, 1);
        assert_eq!(bench.data, 1);
        assert!(bench.reg.is_empty());
    }

    #[test]
    fn registrations_during_resolution_join_the_next_pass() {
        // "spawn" registers "late" once; "late" then fires in the same
        // resolution and removes itself.
        let mut reg = ConditionalActions::new();
        reg.register(0, "spawn");
        let mut bench = Bench {
            reg,
            data: Vec::new(),
        };
        let fired = resolve(&mut bench, 10, live, |b, id, a| match *a {
            "spawn" if b.data.is_empty() => {
                b.data.push("spawn");
                b.reg.register(1, "late");
                true
            }
            "late" => {
                b.data.push("late");
                b.reg.unregister(id)
            }
            _ => false,
        })
        .unwrap();
        assert_eq!(fired, 2);
        assert_eq!(bench.data, vec!["spawn", "late"]);
    }
}
