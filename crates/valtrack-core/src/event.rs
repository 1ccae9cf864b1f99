//! Property-change events.

use crate::value::{NodeId, Value};

/// A synchronous notification that a property of `source` changed.
///
/// Fired by a node's [`ChangeSupport`](crate::ChangeSupport) on the mutating
/// thread, after the new value is visible.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyChangeEvent {
    /// Node whose property changed.
    pub source: NodeId,
    /// Property name, relative to `source`.
    pub property: String,
    pub old_value: Value,
    pub new_value: Value,
}

impl PropertyChangeEvent {
    #[must_use]
    pub fn new(
        source: NodeId,
        property: impl Into<String>,
        old_value: Value,
        new_value: Value,
    ) -> Self {
        Self {
            source,
            property: property.into(),
            old_value,
            new_value,
        }
    }

    /// Whether either side of the change is a child reference.
    #[must_use]
    pub fn is_reference_change(&self) -> bool {
        self.old_value.as_node().is_some() || self.new_value.as_node().is_some()
    }
}
