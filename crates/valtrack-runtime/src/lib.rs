#![forbid(unsafe_code)]

//! Hierarchical dirty-state tracking for graphs of nested value objects.
//!
//! Every node of a tracked graph lazily owns a [`DirtyTracker`] that records
//! which of the node's bean paths changed since the last clean checkpoint.
//! Enabling tracking on a root installs a [`RecursiveObserver`] chain that
//! attaches to every node below it; property changes anywhere in the subtree
//! then surface as dirty paths on every tracker above the changed node.
//!
//! # Architecture
//!
//! - [`trackable`]: the node contract. Nodes declare their schema, expose
//!   children and a change-notification source, and host their tracker.
//! - [`tracker`]: per-node dirty state and the mark/clean propagation walks.
//! - [`observer`]: observer chains, leader election, reference rewiring.
//! - [`heal`]: repair of stale observer wiring before descending into a child.
//! - [`node`]: [`ValueObject`], a ready-made dynamically-typed node.
//! - [`snapshot`]: persisting the direct-tracking flags and rehydrating them.
//!
//! # Locking
//!
//! Each tracker guards its state with its own mutex. A thread never holds two
//! tracker locks at once and never calls out while holding one, so the
//! parent-before-child lock order holds trivially. Mutating traversals
//! additionally run under a process-wide re-entrant traversal gate, which
//! keeps a whole propagation consistent against concurrent mutation.
//! Listener callbacks run inside the gate on the mutating thread; they may
//! mutate the graph, but must not block on another thread that does.

pub mod gate;
pub mod heal;
pub mod metrics;
pub mod node;
pub mod observer;
pub mod snapshot;
pub mod trackable;
pub mod tracker;

pub use node::ValueObject;
pub use observer::{ObserverId, RecursiveObserver};
pub use snapshot::{GraphTrackingSnapshot, TrackerSnapshot};
pub use trackable::{NodeRef, Trackable, Tracked, TrackerSlot, shallow_children};
pub use tracker::DirtyTracker;
