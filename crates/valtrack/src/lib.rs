#![forbid(unsafe_code)]

//! valtrack public facade crate.
//!
//! Re-exports the stable surface of `valtrack-core` and `valtrack-runtime`.
//!
//! ```
//! use valtrack::prelude::*;
//!
//! let leaf = TypeSchema::builder("Leaf").value("value").build();
//! let root_schema = TypeSchema::builder("Root").object("inner", &leaf).build();
//! let root = ValueObject::new(&root_schema);
//! let inner = ValueObject::new(&leaf);
//! let node: NodeRef = inner.clone();
//! root.set_object("inner", Some(node)).unwrap();
//!
//! root.dirty_tracker().start_tracking_changes_directly();
//! inner.set("value", 5).unwrap();
//! assert!(root.dirty_tracker().is_dirty(&["inner.value"]));
//! ```

pub use valtrack_core as core;
pub use valtrack_runtime as runtime;

pub use valtrack_core::{
    ChangeSet, ConsistencyPolicy, DirtyListener, PathSchema, PropertyChangeEvent, SchemaError,
    TrackingConfig, TypeSchema, Value,
};
pub use valtrack_runtime::{
    DirtyTracker, GraphTrackingSnapshot, NodeRef, Trackable, Tracked, TrackerSlot, ValueObject,
};

pub mod prelude {
    pub use valtrack_core::{DirtyListener, PropertyChangeEvent, TypeSchema, Value};
    pub use valtrack_runtime::{DirtyTracker, NodeRef, Trackable, Tracked, ValueObject};
}
