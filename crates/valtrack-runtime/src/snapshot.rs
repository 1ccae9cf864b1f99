//! Persisting which nodes track changes directly.
//!
//! Only the direct-tracking flags are persisted. Parent registrations and
//! observer chains are runtime wiring and are rebuilt by re-enabling direct
//! tracking; dirty paths start out clean after a restore.

use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::AHashSet;
use valtrack_core::path;

use crate::gate;
use crate::trackable::{NodeRef, Tracked, shallow_children};
use crate::tracker::DirtyTracker;

/// Persistent state of one tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackerSnapshot {
    pub tracking_directly: bool,
}

impl DirtyTracker {
    #[must_use]
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            tracking_directly: self.is_tracking_changes_directly(),
        }
    }

    /// Bring direct tracking in line with `snapshot`, installing or removing
    /// the direct observer as needed.
    pub fn rehydrate(self: &Arc<Self>, snapshot: TrackerSnapshot) {
        if snapshot.tracking_directly {
            self.start_tracking_changes_directly();
        } else {
            self.stop_tracking_changes_directly();
        }
    }
}

/// Direct-tracking flags of a whole graph, keyed by bean path from its root.
///
/// The root itself is the empty path. A node reachable along several paths is
/// recorded under the first one in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphTrackingSnapshot {
    tracking_directly: BTreeSet<String>,
}

impl GraphTrackingSnapshot {
    /// Record every node below `root` that tracks directly. Nodes whose
    /// tracker was never created are skipped without creating one.
    #[must_use]
    pub fn capture(root: &NodeRef) -> Self {
        let mut out = Self::default();
        let mut visited = AHashSet::new();
        let mut stack = vec![(String::new(), Arc::clone(root))];
        while let Some((bean_path, node)) = stack.pop() {
            if !visited.insert(node.node_id()) {
                continue;
            }
            if let Some(tracker) = node.tracker_slot().get()
                && tracker.is_tracking_changes_directly()
            {
                out.tracking_directly.insert(bean_path.clone());
            }
            let children = shallow_children(node.as_ref());
            for (name, child) in children.into_iter().rev() {
                stack.push((path::join(&bean_path, &name), child));
            }
        }
        tracing::debug!(
            message = "snapshot.capture",
            root = root.node_id().raw(),
            tracked = out.tracking_directly.len()
        );
        out
    }

    /// Re-enable direct tracking on every recorded path that still resolves
    /// under `root`. Returns the number of nodes restored.
    pub fn restore(&self, root: &NodeRef) -> usize {
        let _gate = gate::enter();
        let mut restored = 0;
        for bean_path in &self.tracking_directly {
            match resolve(root, bean_path) {
                Some(node) => {
                    node.dirty_tracker().rehydrate(TrackerSnapshot {
                        tracking_directly: true,
                    });
                    restored += 1;
                }
                None => tracing::warn!(
                    message = "snapshot.unresolved",
                    root = root.node_id().raw(),
                    path = %bean_path
                ),
            }
        }
        tracing::debug!(
            message = "snapshot.restore",
            root = root.node_id().raw(),
            restored
        );
        restored
    }

    /// Recorded bean paths, in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.tracking_directly.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracking_directly.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracking_directly.is_empty()
    }
}

fn resolve(root: &NodeRef, bean_path: &str) -> Option<NodeRef> {
    if bean_path.is_empty() {
        return Some(Arc::clone(root));
    }
    bean_path
        .split(path::SEPARATOR)
        .try_fold(Arc::clone(root), |node, name| node.child(name))
}
