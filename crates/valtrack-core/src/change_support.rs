//! Property-change notification source.
//!
//! Every trackable node owns one [`ChangeSupport`]. Setters fire a
//! [`PropertyChangeEvent`] through it after the new value is visible; observer
//! chains attach and detach callbacks as they walk the graph.
//!
//! Dispatch iterates a snapshot of the callback list, so callbacks may attach
//! or detach listeners (including themselves) while an event is in flight.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwap;

use crate::event::PropertyChangeEvent;

/// Callback invoked for each fired event.
pub type ChangeCallback = Arc<dyn Fn(&PropertyChangeEvent) + Send + Sync>;

/// Handle returned by [`ChangeSupport::add_listener`], used to detach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

#[derive(Clone)]
struct Entry {
    handle: ListenerHandle,
    callback: ChangeCallback,
}

/// Per-node listener list for property-change events.
pub struct ChangeSupport {
    next_handle: AtomicU64,
    entries: ArcSwap<Vec<Entry>>,
}

impl Default for ChangeSupport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSupport")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeSupport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            entries: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Attach a callback. Callbacks run in attachment order.
    pub fn add_listener(&self, callback: ChangeCallback) -> ListenerHandle {
        let handle = ListenerHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let entry = Entry { handle, callback };
        self.entries.rcu(|current| {
            let mut next = Vec::clone(current);
            next.push(entry.clone());
            next
        });
        handle
    }

    /// Detach a callback. Returns whether the handle was attached.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        let mut found = false;
        self.entries.rcu(|current| {
            let next: Vec<Entry> = current
                .iter()
                .filter(|e| e.handle != handle)
                .cloned()
                .collect();
            found = next.len() != current.len();
            next
        });
        found
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.entries.load().len()
    }

    /// Deliver `event` to every callback attached when dispatch starts.
    pub fn fire(&self, event: &PropertyChangeEvent) {
        let snapshot = self.entries.load_full();
        for entry in snapshot.iter() {
            (entry.callback)(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{NodeId, Value};
    use std::sync::Mutex;

    fn event() -> PropertyChangeEvent {
        PropertyChangeEvent::new(NodeId::next(), "value", Value::Int(1), Value::Int(2))
    }

    #[test]
    fn fire_reaches_attached_callbacks_in_order() {
        let support = ChangeSupport::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let seen = seen.clone();
            support.add_listener(Arc::new(move |e: &PropertyChangeEvent| {
                seen.lock().unwrap().push(format!("{tag}:{}", e.property));
            }));
        }
        support.fire(&event());
        assert_eq!(*seen.lock().unwrap(), vec!["a:value", "b:value"]);
    }

    #[test]
    fn removed_callback_is_not_called() {
        let support = ChangeSupport::new();
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        let handle = support.add_listener(Arc::new(move |_: &PropertyChangeEvent| {
            h.fetch_add(1, Ordering::Relaxed);
        }));
        assert!(support.remove_listener(handle));
        assert!(!support.remove_listener(handle));
        support.fire(&event());
        assert_eq!(hits.load(Ordering::Relaxed), 0);
        assert_eq!(support.listener_count(), 0);
    }

    #[test]
    fn callback_may_attach_during_dispatch() {
        let support = Arc::new(ChangeSupport::new());
        let hits = Arc::new(AtomicU64::new(0));
        let (s, h) = (Arc::downgrade(&support), hits.clone());
        support.add_listener(Arc::new(move |_: &PropertyChangeEvent| {
            h.fetch_add(1, Ordering::Relaxed);
            if let Some(support) = s.upgrade() {
                let h = h.clone();
                support.add_listener(Arc::new(move |_: &PropertyChangeEvent| {
                    h.fetch_add(100, Ordering::Relaxed);
                }));
            }
        }));
        support.fire(&event());
        // The callback attached mid-dispatch only sees the next event.
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(support.listener_count(), 2);
    }
}
