#![forbid(unsafe_code)]

//! Per-node dirty state and the mark/clean propagation walks.
//!
//! # Propagation
//!
//! A public [`mark_dirty`](DirtyTracker::mark_dirty) or
//! [`mark_clean`](DirtyTracker::mark_clean) call on tracker `T` runs one
//! propagation:
//!
//! 1. **Local**: add (or remove) every schema path of `T` under the prefixes
//!    and notify `T`'s listeners per path.
//! 2. **Up**: every observer chain registered at `T`, except `T`'s own
//!    direct chain, reaches `T` through some bean path. The chain's root
//!    receives the prefixes translated into its coordinate space and runs
//!    steps 1 and 3 itself. Its local result must agree with `T`'s.
//! 3. **Down**: for every child one level down whose property the prefixes
//!    can reach, heal stale observer wiring, then run steps 1 and 3 on the
//!    child with the prefixes translated into the child's coordinate space.
//!
//! A node reached on the way down whose local state changed also forwards the
//! change to every chain registered at it that this propagation has not
//! reached yet. Those are the chains of other roots sharing the node; without
//! this step a root cleaning a shared node would leave the other roots dirty.
//!
//! # Invariants
//!
//! 1. `is_tracking_changes() == tracking_directly || !parent_observers.is_empty()`.
//! 2. `tracking_directly` implies a direct observer is installed.
//! 3. For every chain registered at a node through path `p`, the root's dirty
//!    paths under `p.` mirror the node's dirty paths. Attaching a chain
//!    reconciles both sides before the first event is forwarded; the agreement
//!    check in step 2 is the oracle for this invariant afterwards.
//! 4. The leading observer, when set, is a chain registered at this node.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Weak};

use ahash::AHashSet;
use parking_lot::Mutex;
use valtrack_core::config::{self, ConsistencyPolicy};
use valtrack_core::{ChangeSet, ListenerRegistry, NodeId, PathSchema, path};

use crate::observer::{ObserverId, RecursiveObserver};
use crate::trackable::{NodeRef, Trackable, shallow_children, tracker_of};
use crate::{gate, heal, metrics};

/// Direction of a propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    Dirty,
    Clean,
}

/// Registration of an observer chain at a node it reached.
#[derive(Clone)]
pub(crate) struct ParentLink {
    /// Path from the chain's root to this node; empty for the root itself.
    source_path: String,
    observer: Weak<RecursiveObserver>,
}

struct TrackerState {
    changed: ChangeSet,
    tracking_directly: bool,
    direct_observer: Option<Arc<RecursiveObserver>>,
    parent_observers: BTreeMap<ObserverId, ParentLink>,
    leading_observer: Option<ObserverId>,
}

impl TrackerState {
    fn direct_id(&self) -> Option<ObserverId> {
        self.direct_observer.as_ref().map(|o| o.id())
    }
}

/// Bookkeeping for one public mark/clean call.
struct Propagation {
    mark: Mark,
    /// Chains whose root has already received this propagation.
    applied: AHashSet<ObserverId>,
}

/// Dirty state of one node.
///
/// Obtained through [`Tracked::dirty_tracker`](crate::Tracked::dirty_tracker);
/// created on first access and kept for the node's lifetime.
pub struct DirtyTracker {
    node_id: NodeId,
    node: Weak<dyn Trackable>,
    schema: Arc<PathSchema>,
    state: Mutex<TrackerState>,
    listeners: ListenerRegistry,
}

impl fmt::Debug for DirtyTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DirtyTracker")
            .field("node", &self.node_id)
            .field("changed", &state.changed.len())
            .field("tracking_directly", &state.tracking_directly)
            .field("parent_observers", &state.parent_observers.len())
            .field("leading_observer", &state.leading_observer)
            .finish()
    }
}

impl DirtyTracker {
    pub(crate) fn new(node: &NodeRef) -> Arc<Self> {
        let schema = Arc::new(PathSchema::build(node.type_schema()));
        Arc::new(Self {
            node_id: node.node_id(),
            node: Arc::downgrade(node),
            schema: Arc::clone(&schema),
            state: Mutex::new(TrackerState {
                changed: ChangeSet::new(schema),
                tracking_directly: false,
                direct_observer: None,
                parent_observers: BTreeMap::new(),
                leading_observer: None,
            }),
            listeners: ListenerRegistry::new(),
        })
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The tracked node, unless it was dropped.
    #[must_use]
    pub fn node(&self) -> Option<NodeRef> {
        self.node.upgrade()
    }

    /// Every bean path this tracker can report.
    #[must_use]
    pub fn schema(&self) -> &Arc<PathSchema> {
        &self.schema
    }

    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    // -----------------------------------------------------------------------
    // Tracking lifecycle
    // -----------------------------------------------------------------------

    /// Track this node's subtree independently of any ancestor. Idempotent.
    pub fn start_tracking_changes_directly(self: &Arc<Self>) {
        let _gate = gate::enter();
        let observer = {
            let mut state = self.state.lock();
            state.tracking_directly = true;
            if state.direct_observer.is_some() {
                return;
            }
            let observer = RecursiveObserver::new(self);
            state.direct_observer = Some(Arc::clone(&observer));
            observer
        };
        tracing::debug!(
            message = "tracker.start",
            node = self.node_id.raw(),
            observer = observer.id().raw()
        );
        observer.attach();
    }

    /// Stop direct tracking. Ancestors' chains keep tracking. Idempotent.
    pub fn stop_tracking_changes_directly(self: &Arc<Self>) {
        let _gate = gate::enter();
        let observer = {
            let mut state = self.state.lock();
            state.tracking_directly = false;
            state.direct_observer.take()
        };
        if let Some(observer) = observer {
            tracing::debug!(
                message = "tracker.stop",
                node = self.node_id.raw(),
                observer = observer.id().raw()
            );
            observer.detach();
        }
    }

    /// Whether changes of this node are recorded, directly or through an
    /// ancestor's chain.
    #[must_use]
    pub fn is_tracking_changes(&self) -> bool {
        let state = self.state.lock();
        state.tracking_directly || !state.parent_observers.is_empty()
    }

    #[must_use]
    pub fn is_tracking_changes_directly(&self) -> bool {
        self.state.lock().tracking_directly
    }

    /// Number of observer chains registered at this node, the direct one
    /// included.
    #[must_use]
    pub fn parent_observer_count(&self) -> usize {
        self.state.lock().parent_observers.len()
    }

    /// The chain currently responsible for forwarding this node's events.
    #[must_use]
    pub fn leading_observer(&self) -> Option<ObserverId> {
        self.state.lock().leading_observer
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// True if anything is dirty (no prefixes) or a dirty path falls under
    /// one of `prefixes`.
    #[must_use]
    pub fn is_dirty(&self, prefixes: &[&str]) -> bool {
        self.state.lock().changed.is_dirty(prefixes)
    }

    /// Snapshot of the dirty paths, sorted.
    #[must_use]
    pub fn changed_bean_paths(&self) -> Vec<String> {
        self.state.lock().changed.paths()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Mark every schema path under `prefixes` dirty (everything for an empty
    /// slice), here, in every tracking ancestor and in every reachable
    /// descendant. Returns whether this tracker's own state changed.
    ///
    /// # Panics
    ///
    /// Under [`ConsistencyPolicy::Panic`], panics if an ancestor disagrees
    /// about whether anything changed.
    pub fn mark_dirty(self: &Arc<Self>, prefixes: &[&str]) -> bool {
        self.propagate(Mark::Dirty, prefixes)
    }

    /// Mirror of [`mark_dirty`](Self::mark_dirty): remove matching dirty
    /// paths everywhere. Returns whether this tracker's own state changed.
    ///
    /// # Panics
    ///
    /// Same as [`mark_dirty`](Self::mark_dirty).
    pub fn mark_clean(self: &Arc<Self>, prefixes: &[&str]) -> bool {
        self.propagate(Mark::Clean, prefixes)
    }

    pub(crate) fn propagate<S: AsRef<str>>(self: &Arc<Self>, mark: Mark, prefixes: &[S]) -> bool {
        let _gate = gate::enter();
        let prefixes: Vec<String> = prefixes.iter().map(|p| p.as_ref().to_owned()).collect();

        let (direct, links) = {
            let state = self.state.lock();
            let direct = state.direct_id();
            let links: Vec<(ObserverId, ParentLink)> = state
                .parent_observers
                .iter()
                .filter(|(id, _)| Some(**id) != direct)
                .map(|(id, link)| (*id, link.clone()))
                .collect();
            (direct, links)
        };

        let mut ctx = Propagation {
            mark,
            applied: AHashSet::new(),
        };
        ctx.applied.extend(direct);
        ctx.applied.extend(links.iter().map(|(id, _)| *id));

        let changed = self.apply_local(mark, &prefixes);
        for (_, link) in &links {
            self.forward_to_root(&mut ctx, link, &prefixes, changed);
        }
        self.descend(&mut ctx, &prefixes);
        changed
    }

    /// Local step plus the downward walk, for a node reached by a running
    /// propagation.
    fn apply_down(self: &Arc<Self>, ctx: &mut Propagation, prefixes: &[String]) -> bool {
        let changed = self.apply_local(ctx.mark, prefixes);

        let foreign: Vec<ParentLink> = {
            let state = self.state.lock();
            // Chains rooted here are covered by this walk from now on.
            ctx.applied.extend(state.direct_id());
            if changed {
                state
                    .parent_observers
                    .iter()
                    .filter(|(id, _)| ctx.applied.insert(**id))
                    .map(|(_, link)| link.clone())
                    .collect()
            } else {
                Vec::new()
            }
        };
        for link in &foreign {
            self.forward_to_root(ctx, link, prefixes, changed);
        }

        self.descend(ctx, prefixes);
        changed
    }

    fn forward_to_root(
        &self,
        ctx: &mut Propagation,
        link: &ParentLink,
        prefixes: &[String],
        expected: bool,
    ) {
        let Some(root) = link.observer.upgrade().and_then(|o| o.root_tracker()) else {
            return;
        };
        let translated = path::for_parent(&link.source_path, prefixes);
        let reported = root.apply_down(ctx, &translated);
        self.check_consistency(&root, ctx.mark, expected, reported);
    }

    fn descend(self: &Arc<Self>, ctx: &mut Propagation, prefixes: &[String]) {
        let Some(node) = self.node.upgrade() else {
            return;
        };
        for (name, child) in shallow_children(node.as_ref()) {
            let Some(child_prefixes) = path::for_child(&name, Some(prefixes)) else {
                continue;
            };
            let child_tracker = tracker_of(&child);
            if heal::heal(self, &child_tracker) > 0 {
                child_tracker.resync_passed_roots(ctx, &child_prefixes);
            }
            child_tracker.apply_down(ctx, &child_prefixes);
        }
    }

    /// Healing reconciles a rebuilt chain's root after that root already ran
    /// its local step for this propagation. Repeat the step for every such
    /// root, in its own coordinates, so it ends up where the child will.
    fn resync_passed_roots(&self, ctx: &Propagation, prefixes: &[String]) {
        let links: Vec<ParentLink> = self
            .state
            .lock()
            .parent_observers
            .iter()
            .filter(|(id, link)| ctx.applied.contains(*id) && !link.source_path.is_empty())
            .map(|(_, link)| link.clone())
            .collect();
        for link in links {
            if let Some(root) = link.observer.upgrade().and_then(|o| o.root_tracker()) {
                root.apply_local(ctx.mark, &path::for_parent(&link.source_path, prefixes));
            }
        }
    }

    fn apply_local(&self, mark: Mark, prefixes: &[String]) -> bool {
        let touched = {
            let mut state = self.state.lock();
            match mark {
                Mark::Dirty => state.changed.mark(prefixes),
                Mark::Clean => state.changed.clear(prefixes),
            }
        };
        if touched.is_empty() {
            return false;
        }
        tracing::trace!(
            message = "tracker.local",
            node = self.node_id.raw(),
            mark = ?mark,
            paths = touched.len()
        );
        for p in &touched {
            match mark {
                Mark::Dirty => self.listeners.fire_dirty(p),
                Mark::Clean => self.listeners.fire_clean(p),
            }
        }
        true
    }

    /// Add exactly `paths` here, notifying listeners. Returns the added ones.
    fn apply_exact(&self, paths: &[String]) -> Vec<String> {
        if paths.is_empty() {
            return Vec::new();
        }
        let added = self.state.lock().changed.insert_exact(paths);
        for p in &added {
            self.listeners.fire_dirty(p);
        }
        added
    }

    /// Bring a chain that has just reached this node through `source_path`
    /// into agreement with it. The chain's root takes every path dirty here;
    /// this node takes every path the root already holds under
    /// `source_path`, and so does every other root reaching this node.
    /// Returns the number of paths added across all trackers.
    pub(crate) fn reconcile_chain(
        &self,
        chain: ObserverId,
        root: &DirtyTracker,
        source_path: &str,
    ) -> usize {
        let local: BTreeSet<String> = self.changed_bean_paths().into_iter().collect();
        let held: BTreeSet<String> = root
            .changed_bean_paths()
            .into_iter()
            .filter_map(|p| {
                p.strip_prefix(source_path)?
                    .strip_prefix(path::SEPARATOR)
                    .map(str::to_owned)
            })
            .collect();

        let to_root: Vec<String> = local
            .difference(&held)
            .map(|p| path::join(source_path, p))
            .collect();
        let to_node: Vec<String> = held.difference(&local).cloned().collect();

        let mut added = root.apply_exact(&to_root).len();
        let node_added = self.apply_exact(&to_node);
        added += node_added.len();
        if node_added.is_empty() {
            return added;
        }

        let others: Vec<ParentLink> = self
            .state
            .lock()
            .parent_observers
            .iter()
            .filter(|(id, _)| **id != chain)
            .map(|(_, link)| link.clone())
            .collect();
        for link in others {
            let Some(other) = link.observer.upgrade().and_then(|o| o.root_tracker()) else {
                continue;
            };
            let translated: Vec<String> = node_added
                .iter()
                .map(|p| path::join(&link.source_path, p))
                .collect();
            added += other.apply_exact(&translated).len();
        }
        added
    }

    fn check_consistency(&self, ancestor: &DirtyTracker, mark: Mark, local: bool, reported: bool) {
        if local == reported {
            return;
        }
        match config::current().consistency {
            ConsistencyPolicy::Panic => panic!(
                "{mark:?} consistency violation: {} changed={local} but ancestor {} changed={reported}",
                self.node_id, ancestor.node_id
            ),
            ConsistencyPolicy::Log => {
                metrics::record_violation();
                tracing::error!(
                    message = "tracker.consistency_violation",
                    mark = ?mark,
                    node = self.node_id.raw(),
                    ancestor = ancestor.node_id.raw(),
                    local,
                    reported
                );
            }
        }
    }

    // -----------------------------------------------------------------------
    // Observer registry
    // -----------------------------------------------------------------------

    pub(crate) fn register_parent_observer(
        &self,
        observer: &Arc<RecursiveObserver>,
        source_path: String,
    ) {
        // A chain reaching this node twice keeps the first path.
        self.state
            .lock()
            .parent_observers
            .entry(observer.id())
            .or_insert_with(|| ParentLink {
                source_path,
                observer: Arc::downgrade(observer),
            });
    }

    /// Remove a chain's registration and release its leadership. Returns
    /// whether the direct observer must be reinstalled to keep direct
    /// tracking alive.
    pub(crate) fn unregister_parent_observer(&self, id: ObserverId) -> bool {
        let mut state = self.state.lock();
        state.parent_observers.remove(&id);
        if state.leading_observer == Some(id) {
            state.leading_observer = None;
        }
        state.parent_observers.is_empty()
            && state.tracking_directly
            && state.direct_observer.is_none()
    }

    /// Chains registered here, with their observers.
    pub(crate) fn observer_links(&self) -> Vec<(ObserverId, Weak<RecursiveObserver>)> {
        self.state
            .lock()
            .parent_observers
            .iter()
            .map(|(id, link)| (*id, link.observer.clone()))
            .collect()
    }

    pub(crate) fn has_parent_observer(&self, id: ObserverId) -> bool {
        self.state.lock().parent_observers.contains_key(&id)
    }

    /// Source path by which `id` reached this node.
    #[must_use]
    pub fn source_path(&self, id: ObserverId) -> Option<String> {
        self.state
            .lock()
            .parent_observers
            .get(&id)
            .map(|link| link.source_path.clone())
    }

    /// Elect `candidate` unless a registered chain already leads. Returns the
    /// leader, or `None` when `candidate` is no longer registered here and
    /// nobody leads (a late delivery to a detached chain).
    pub(crate) fn get_or_update_leading_observer(&self, candidate: ObserverId) -> Option<ObserverId> {
        let mut state = self.state.lock();
        if let Some(leader) = state.leading_observer
            && state.parent_observers.contains_key(&leader)
        {
            return Some(leader);
        }
        if state.parent_observers.contains_key(&candidate) {
            state.leading_observer = Some(candidate);
            Some(candidate)
        } else {
            state.leading_observer = None;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ValueObject;
    use crate::trackable::Tracked;
    use valtrack_core::TypeSchema;

    fn leaf_schema() -> Arc<TypeSchema> {
        TypeSchema::builder("Leaf").value("value").build()
    }

    #[test]
    fn fresh_tracker_is_clean_and_idle() {
        let node = ValueObject::new(&leaf_schema());
        let tracker = node.dirty_tracker();
        assert!(!tracker.is_dirty(&[]));
        assert!(!tracker.is_tracking_changes());
        assert!(tracker.changed_bean_paths().is_empty());
        assert_eq!(tracker.schema().len(), 1);
    }

    #[test]
    fn tracker_is_created_once() {
        let node = ValueObject::new(&leaf_schema());
        assert!(Arc::ptr_eq(&node.dirty_tracker(), &node.dirty_tracker()));
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let node = ValueObject::new(&leaf_schema());
        let tracker = node.dirty_tracker();
        tracker.start_tracking_changes_directly();
        tracker.start_tracking_changes_directly();
        assert_eq!(tracker.parent_observer_count(), 1);
        assert!(tracker.is_tracking_changes_directly());
        tracker.stop_tracking_changes_directly();
        tracker.stop_tracking_changes_directly();
        assert_eq!(tracker.parent_observer_count(), 0);
        assert!(!tracker.is_tracking_changes());
    }

    #[test]
    fn direct_chain_registers_with_empty_path() {
        let node = ValueObject::new(&leaf_schema());
        let tracker = node.dirty_tracker();
        tracker.start_tracking_changes_directly();
        let (id, _) = tracker.observer_links()[0].clone();
        assert_eq!(tracker.source_path(id).as_deref(), Some(""));
        assert!(tracker.has_parent_observer(id));
    }

    #[test]
    fn mark_clean_without_match_is_noop() {
        let node = ValueObject::new(&leaf_schema());
        let tracker = node.dirty_tracker();
        assert!(tracker.mark_dirty(&["value"]));
        assert!(!tracker.mark_clean(&["nothing"]));
        assert_eq!(tracker.changed_bean_paths(), vec!["value".to_owned()]);
    }

    #[test]
    fn debug_reports_state() {
        let node = ValueObject::new(&leaf_schema());
        let tracker = node.dirty_tracker();
        tracker.mark_dirty(&[]);
        let dbg = format!("{tracker:?}");
        assert!(dbg.contains("DirtyTracker"));
        assert!(dbg.contains("changed: 1"));
    }
}
