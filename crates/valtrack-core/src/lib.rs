#![forbid(unsafe_code)]

//! Core: bean paths, declared schemas, change events, and listener plumbing.
//!
//! Nothing in this crate knows about trackers or observer chains. It provides
//! the leaf vocabulary the tracking engine in `valtrack-runtime` is built on:
//!
//! - [`path`]: dot-separated bean paths and the prefix algebra that moves
//!   prefixes across parent/child boundaries.
//! - [`schema`]: per-type declared property lists and the once-computed
//!   [`PathSchema`](schema::PathSchema) of every path reachable from a type.
//! - [`changeset`]: the set of dirty paths of a single node.
//! - [`change_support`]: the property-change notification source every node
//!   carries.
//! - [`listener`]: the dirty-state listener interface exposed to callers.

pub mod change_support;
pub mod changeset;
pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod path;
pub mod schema;
pub mod value;

pub use change_support::{ChangeCallback, ChangeSupport, ListenerHandle};
pub use changeset::ChangeSet;
pub use config::{ConsistencyPolicy, TrackingConfig};
pub use error::SchemaError;
pub use event::PropertyChangeEvent;
pub use listener::{DirtyListener, ListenerRegistry};
pub use schema::{PathSchema, PropertyDescriptor, PropertyKind, TypeSchema, TypeSchemaBuilder};
pub use value::{NodeId, Value};
