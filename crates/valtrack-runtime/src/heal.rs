//! Repair of stale observer wiring.
//!
//! A child replaced without a change event (see
//! [`ValueObject::replace_object_untracked`](crate::ValueObject::replace_object_untracked))
//! is not subscribed by the chains tracking its parent. Every descent from a
//! parent into a child first compares the two registries and rebuilds each
//! chain the child is missing.

use crate::tracker::DirtyTracker;
use crate::{gate, metrics};

/// Re-attach every chain registered at `parent` but missing at `child`.
/// Returns the number of chains rebuilt.
pub fn heal(parent: &DirtyTracker, child: &DirtyTracker) -> usize {
    let _gate = gate::enter();
    let mut healed = 0;
    for (id, observer) in parent.observer_links() {
        if child.has_parent_observer(id) {
            continue;
        }
        let Some(observer) = observer.upgrade() else {
            continue;
        };
        metrics::record_heal();
        tracing::debug!(
            message = "heal.reattach",
            observer = id.raw(),
            parent = parent.node_id().raw(),
            child = child.node_id().raw()
        );
        observer.reattach();
        healed += 1;
    }
    healed
}
