//! Observer chains.
//!
//! A [`RecursiveObserver`] belongs to the tracker of the node where direct
//! tracking was enabled (its *root*). Attaching walks the root's subtree once,
//! registers the chain at every reached tracker together with the bean path
//! from the root, and subscribes to every reached node's change events. Nodes
//! that were already dirty when the chain arrived are then reconciled with
//! the root, so the root's view under each bean path matches the node.
//!
//! A node reachable from several tracking roots receives each event once per
//! chain. The first chain to claim the node's leadership forwards events;
//! the others drop them. Leadership moves on only when the leading chain is
//! unregistered from the node.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use ahash::AHashSet;
use parking_lot::Mutex;
use valtrack_core::{ListenerHandle, NodeId, PropertyChangeEvent, PropertyKind, path};

use crate::trackable::{NodeRef, Trackable, shallow_children, tracker_of};
use crate::tracker::{DirtyTracker, Mark};
use crate::{gate, metrics};

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an observer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        Self(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

struct Attachment {
    node: Weak<dyn Trackable>,
    tracker: Weak<DirtyTracker>,
    handle: ListenerHandle,
}

/// Recursive subscription of one tracking root to its whole subtree.
pub struct RecursiveObserver {
    id: ObserverId,
    root: Weak<DirtyTracker>,
    this: Weak<RecursiveObserver>,
    attachments: Mutex<Vec<Attachment>>,
}

impl fmt::Debug for RecursiveObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecursiveObserver")
            .field("id", &self.id)
            .field("attached", &self.attached_nodes())
            .finish()
    }
}

impl RecursiveObserver {
    pub(crate) fn new(root: &Arc<DirtyTracker>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            id: ObserverId::next(),
            root: Arc::downgrade(root),
            this: this.clone(),
            attachments: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Tracker of the node whose direct tracking owns this chain.
    #[must_use]
    pub fn root_tracker(&self) -> Option<Arc<DirtyTracker>> {
        self.root.upgrade()
    }

    /// Number of nodes the chain is currently subscribed to.
    #[must_use]
    pub fn attached_nodes(&self) -> usize {
        self.attachments.lock().len()
    }

    /// Subscribe to the root's current subtree.
    pub(crate) fn attach(&self) {
        let _gate = gate::enter();
        let (Some(root), Some(this)) = (self.root.upgrade(), self.this.upgrade()) else {
            return;
        };
        let Some(root_node) = root.node() else {
            return;
        };

        let mut visited = AHashSet::new();
        let mut installed = Vec::new();
        let mut reached = Vec::new();
        Self::walk(
            &this,
            &root_node,
            String::new(),
            &mut visited,
            &mut installed,
            &mut reached,
        );
        let nodes = installed.len();
        self.attachments.lock().extend(installed);

        let mut reconciled = 0;
        for (tracker, source_path) in &reached {
            if !source_path.is_empty() {
                reconciled += tracker.reconcile_chain(self.id, &root, source_path);
            }
        }
        tracing::debug!(
            message = "observer.attach",
            observer = self.id.raw(),
            root = root.node_id().raw(),
            nodes,
            reconciled
        );
    }

    fn walk(
        this: &Arc<Self>,
        node: &NodeRef,
        source_path: String,
        visited: &mut AHashSet<NodeId>,
        installed: &mut Vec<Attachment>,
        reached: &mut Vec<(Arc<DirtyTracker>, String)>,
    ) {
        // A node reached along several paths keeps the first.
        if !visited.insert(node.node_id()) {
            return;
        }

        let tracker = tracker_of(node);
        tracker.register_parent_observer(this, source_path.clone());

        let observer = Arc::downgrade(this);
        let weak_node = Arc::downgrade(node);
        let handle = node.change_support().add_listener(Arc::new({
            let weak_node = weak_node.clone();
            move |event: &PropertyChangeEvent| {
                if let (Some(observer), Some(node)) = (observer.upgrade(), weak_node.upgrade()) {
                    observer.on_event(&node, event);
                }
            }
        }));
        installed.push(Attachment {
            node: weak_node,
            tracker: Arc::downgrade(&tracker),
            handle,
        });

        for (name, child) in shallow_children(node.as_ref()) {
            let child_path = path::join(&source_path, &name);
            Self::walk(this, &child, child_path, visited, installed, reached);
        }
        reached.push((tracker, source_path));
    }

    /// Unsubscribe from every node and unregister from every tracker.
    pub(crate) fn detach(&self) {
        let _gate = gate::enter();
        let attachments = std::mem::take(&mut *self.attachments.lock());
        for attachment in &attachments {
            if let Some(node) = attachment.node.upgrade() {
                node.change_support().remove_listener(attachment.handle);
            }
            if let Some(tracker) = attachment.tracker.upgrade()
                && tracker.unregister_parent_observer(self.id)
            {
                tracing::warn!(
                    message = "observer.reinstall_direct",
                    node = tracker.node_id().raw(),
                    observer = self.id.raw()
                );
                tracker.start_tracking_changes_directly();
            }
        }
        tracing::debug!(
            message = "observer.detach",
            observer = self.id.raw(),
            nodes = attachments.len()
        );
    }

    /// Rebuild the subscription from the root's current structure.
    pub(crate) fn reattach(&self) {
        let _gate = gate::enter();
        self.detach();
        self.attach();
    }

    fn on_event(&self, node: &NodeRef, event: &PropertyChangeEvent) {
        let _gate = gate::enter();
        let tracker = tracker_of(node);

        let rewires = node
            .type_schema()
            .property(&event.property)
            .is_some_and(|p| p.is_tracked() && matches!(p.kind(), PropertyKind::Object(_)));
        if rewires {
            metrics::record_rewire();
            tracing::debug!(
                message = "observer.rewire",
                observer = self.id.raw(),
                node = node.node_id().raw(),
                property = %event.property
            );
            self.reattach();
        }

        match tracker.get_or_update_leading_observer(self.id) {
            Some(leader) if leader == self.id => {}
            leader => {
                metrics::record_ignored();
                tracing::trace!(
                    message = "observer.ignored",
                    observer = self.id.raw(),
                    leader = leader.map(ObserverId::raw),
                    node = node.node_id().raw()
                );
                return;
            }
        }

        assert!(
            tracker.is_tracking_changes(),
            "{} forwarded an event from {} whose tracker is not tracking",
            self.id,
            node.node_id()
        );
        metrics::record_forwarded();
        tracker.propagate(Mark::Dirty, std::slice::from_ref(&event.property));
        tracker.listeners().fire_property_change(event);
    }
}
