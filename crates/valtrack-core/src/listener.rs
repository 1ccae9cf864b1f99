//! Dirty-state listeners.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::event::PropertyChangeEvent;

/// Callbacks a dirty tracker delivers to interested callers.
///
/// All methods default to no-ops. Callbacks run synchronously on the thread
/// that caused the change and may themselves mutate tracked nodes, in this
/// graph or any other.
///
/// # Blocking
///
/// Callbacks run inside the runtime's traversal gate, which is one re-entrant
/// lock shared by every graph in the process. Mutations on other threads,
/// even of unrelated graphs, wait until the callback returns. A callback that
/// blocks on another thread which itself mutates a tracked node deadlocks.
/// Hand such work off without waiting for it.
pub trait DirtyListener: Send + Sync {
    /// A path of the tracker's node became dirty.
    fn on_dirty(&self, _path: &str) {}

    /// A path of the tracker's node became clean.
    fn on_clean(&self, _path: &str) {}

    /// A property of the tracker's node changed through its setter.
    fn property_change(&self, _event: &PropertyChangeEvent) {}
}

/// Registry of [`DirtyListener`]s with snapshot iteration.
///
/// Mutation swaps in a new list; dispatch iterates whatever list was current
/// when it started. A listener added during dispatch is first called on the
/// next dispatch; one removed during dispatch may still receive the current
/// one.
pub struct ListenerRegistry {
    listeners: ArcSwap<Vec<Arc<dyn DirtyListener>>>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Register a listener. The same listener may be registered twice and is
    /// then called twice.
    pub fn add(&self, listener: Arc<dyn DirtyListener>) {
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(Arc::clone(&listener));
            next
        });
    }

    /// Remove the first registration of `listener`. Returns whether one was
    /// found.
    pub fn remove(&self, listener: &Arc<dyn DirtyListener>) -> bool {
        let mut found = false;
        self.listeners.rcu(|current| {
            let mut next = Vec::clone(current);
            found = match next
                .iter()
                .position(|l| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)))
            {
                Some(idx) => {
                    next.remove(idx);
                    true
                }
                None => false,
            };
            next
        });
        found
    }

    /// Current listeners.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Vec<Arc<dyn DirtyListener>>> {
        self.listeners.load_full()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.load().is_empty()
    }

    pub fn fire_dirty(&self, path: &str) {
        for listener in self.snapshot().iter() {
            listener.on_dirty(path);
        }
    }

    pub fn fire_clean(&self, path: &str) {
        for listener in self.snapshot().iter() {
            listener.on_clean(path);
        }
    }

    pub fn fire_property_change(&self, event: &PropertyChangeEvent) {
        for listener in self.snapshot().iter() {
            listener.property_change(event);
        }
    }
}
