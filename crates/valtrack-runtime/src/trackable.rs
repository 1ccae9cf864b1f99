//! The node contract.

use std::fmt;
use std::sync::{Arc, OnceLock};

use valtrack_core::{ChangeSupport, NodeId, PropertyKind, TypeSchema, Value};

use crate::tracker::DirtyTracker;

/// Shared handle to a tracked node.
pub type NodeRef = Arc<dyn Trackable>;

/// A node that can participate in a tracked graph.
///
/// Implementors declare their properties through [`TypeSchema`], answer
/// property reads, fire change events through their [`ChangeSupport`] from
/// every setter, and host a [`TrackerSlot`].
///
/// Graphs must be acyclic. Sharing a node between several parents is fine.
pub trait Trackable: Send + Sync + 'static {
    fn node_id(&self) -> NodeId;

    fn type_schema(&self) -> &Arc<TypeSchema>;

    /// Current value of a property, `None` if the property is not declared.
    fn value(&self, property: &str) -> Option<Value>;

    /// Current child behind an object property, `None` if the property is
    /// empty, not declared, or not an object property.
    fn child(&self, property: &str) -> Option<NodeRef>;

    fn change_support(&self) -> &ChangeSupport;

    fn tracker_slot(&self) -> &TrackerSlot;
}

/// Storage for a node's lazily created tracker.
///
/// The tracker lives exactly as long as the node that owns the slot.
#[derive(Default)]
pub struct TrackerSlot(OnceLock<Arc<DirtyTracker>>);

impl TrackerSlot {
    #[must_use]
    pub fn new() -> Self {
        Self(OnceLock::new())
    }

    /// The tracker, if one was created already.
    #[must_use]
    pub fn get(&self) -> Option<&Arc<DirtyTracker>> {
        self.0.get()
    }
}

impl fmt::Debug for TrackerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TrackerSlot")
            .field(&self.0.get().is_some())
            .finish()
    }
}

/// Access to a node's tracker.
pub trait Tracked {
    /// The node's tracker, created on first access.
    fn dirty_tracker(&self) -> Arc<DirtyTracker>;
}

impl Tracked for NodeRef {
    fn dirty_tracker(&self) -> Arc<DirtyTracker> {
        tracker_of(self)
    }
}

impl<T: Trackable> Tracked for Arc<T> {
    fn dirty_tracker(&self) -> Arc<DirtyTracker> {
        let node: NodeRef = self.clone();
        tracker_of(&node)
    }
}

pub(crate) fn tracker_of(node: &NodeRef) -> Arc<DirtyTracker> {
    Arc::clone(
        node.tracker_slot()
            .0
            .get_or_init(|| DirtyTracker::new(node)),
    )
}

/// Present children one level down, through tracked object properties, in
/// declaration order.
///
/// This is the single definition of "one level down" shared by observer
/// walks, mark/clean walks and healing.
#[must_use]
pub fn shallow_children(node: &dyn Trackable) -> Vec<(String, NodeRef)> {
    node.type_schema()
        .enumerate_shallow()
        .filter(|p| matches!(p.kind(), PropertyKind::Object(_)))
        .filter_map(|p| node.child(p.name()).map(|c| (p.name().to_owned(), c)))
        .collect()
}
