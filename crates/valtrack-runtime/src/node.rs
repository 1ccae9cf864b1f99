//! A ready-made, dynamically-typed trackable node.
//!
//! [`ValueObject`] stores one field per declared property of its
//! [`TypeSchema`] and fires a [`PropertyChangeEvent`] from every setter that
//! actually changes something. Setting a value equal to the current one is a
//! no-op and fires nothing.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use valtrack_core::error::Result;
use valtrack_core::{
    ChangeSupport, NodeId, PropertyChangeEvent, PropertyKind, SchemaError, TypeSchema, Value,
};

use crate::trackable::{NodeRef, Trackable, TrackerSlot};

enum Field {
    Value(Value),
    Object(Option<NodeRef>),
}

impl Field {
    fn observed(&self) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Object(child) => child
                .as_ref()
                .map_or(Value::Null, |c| Value::Node(c.node_id())),
        }
    }
}

/// Node whose properties are declared at runtime by a [`TypeSchema`].
pub struct ValueObject {
    id: NodeId,
    schema: Arc<TypeSchema>,
    /// Index-aligned with `schema.properties()`.
    fields: RwLock<Vec<Field>>,
    changes: ChangeSupport,
    tracker: TrackerSlot,
}

impl fmt::Debug for ValueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.read();
        let mut s = f.debug_struct(self.schema.name());
        s.field("id", &self.id);
        for (descriptor, field) in self.schema.properties().iter().zip(fields.iter()) {
            s.field(descriptor.name(), &field.observed());
        }
        s.finish()
    }
}

impl ValueObject {
    /// Create a node with every value `Null` and every child absent.
    #[must_use]
    pub fn new(schema: &Arc<TypeSchema>) -> Arc<Self> {
        let fields = schema
            .properties()
            .iter()
            .map(|p| match p.kind() {
                PropertyKind::Object(_) => Field::Object(None),
                PropertyKind::Value | PropertyKind::TableColumn => Field::Value(Value::Null),
            })
            .collect();
        Arc::new(Self {
            id: NodeId::next(),
            schema: Arc::clone(schema),
            fields: RwLock::new(fields),
            changes: ChangeSupport::new(),
            tracker: TrackerSlot::new(),
        })
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    fn index_of(&self, property: &str) -> Result<usize> {
        self.schema
            .properties()
            .iter()
            .position(|p| p.name() == property)
            .ok_or_else(|| SchemaError::unknown(self.schema.name(), property))
    }

    fn object_index(&self, property: &str) -> Result<usize> {
        let index = self.index_of(property)?;
        match self.schema.properties()[index].kind() {
            PropertyKind::Object(_) => Ok(index),
            _ => Err(SchemaError::NotAnObject {
                type_name: self.schema.name().to_owned(),
                property: property.to_owned(),
            }),
        }
    }

    /// Current value of a property. Object properties read as
    /// [`Value::Node`] or [`Value::Null`].
    pub fn get(&self, property: &str) -> Result<Value> {
        let index = self.index_of(property)?;
        Ok(self.fields.read()[index].observed())
    }

    /// Assign a plain value and fire a change event if it differs.
    pub fn set(&self, property: &str, value: impl Into<Value>) -> Result<()> {
        let index = self.index_of(property)?;
        let value = value.into();
        let old = {
            let mut fields = self.fields.write();
            let Field::Value(slot) = &mut fields[index] else {
                return Err(SchemaError::NotAValue {
                    type_name: self.schema.name().to_owned(),
                    property: property.to_owned(),
                });
            };
            if *slot == value {
                return Ok(());
            }
            std::mem::replace(slot, value.clone())
        };
        self.changes
            .fire(&PropertyChangeEvent::new(self.id, property, old, value));
        Ok(())
    }

    /// Current child behind an object property.
    pub fn get_object(&self, property: &str) -> Result<Option<NodeRef>> {
        let index = self.object_index(property)?;
        match &self.fields.read()[index] {
            Field::Object(child) => Ok(child.clone()),
            Field::Value(_) => Ok(None),
        }
    }

    /// Replace the child behind an object property and fire a change event if
    /// the reference differs.
    pub fn set_object(&self, property: &str, child: Option<NodeRef>) -> Result<()> {
        let index = self.object_index(property)?;
        self.check_child_type(index, child.as_ref())?;
        let (old, new) = {
            let mut fields = self.fields.write();
            let Field::Object(slot) = &mut fields[index] else {
                return Ok(());
            };
            if same_node(slot.as_ref(), child.as_ref()) {
                return Ok(());
            }
            let new = child.as_ref().map_or(Value::Null, |c| Value::Node(c.node_id()));
            let old = std::mem::replace(slot, child);
            (old.map_or(Value::Null, |c| Value::Node(c.node_id())), new)
        };
        self.changes
            .fire(&PropertyChangeEvent::new(self.id, property, old, new));
        Ok(())
    }

    /// Replace a child without firing any event. Returns the previous child.
    ///
    /// Observer chains keep watching the previous child until the next
    /// mark/clean walk through this node repairs the wiring.
    pub fn replace_object_untracked(
        &self,
        property: &str,
        child: Option<NodeRef>,
    ) -> Result<Option<NodeRef>> {
        let index = self.object_index(property)?;
        self.check_child_type(index, child.as_ref())?;
        let mut fields = self.fields.write();
        match &mut fields[index] {
            Field::Object(slot) => Ok(std::mem::replace(slot, child)),
            Field::Value(_) => Ok(None),
        }
    }

    fn check_child_type(&self, index: usize, child: Option<&NodeRef>) -> Result<()> {
        let descriptor = &self.schema.properties()[index];
        let (Some(expected), Some(child)) = (descriptor.object_schema(), child) else {
            return Ok(());
        };
        if Arc::ptr_eq(expected, child.type_schema()) {
            Ok(())
        } else {
            Err(SchemaError::TypeMismatch {
                property: descriptor.name().to_owned(),
                expected: expected.name().to_owned(),
                actual: child.type_schema().name().to_owned(),
            })
        }
    }
}

fn same_node(a: Option<&NodeRef>, b: Option<&NodeRef>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.node_id() == b.node_id(),
        _ => false,
    }
}

impl Trackable for ValueObject {
    fn node_id(&self) -> NodeId {
        self.id
    }

    fn type_schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    fn value(&self, property: &str) -> Option<Value> {
        self.get(property).ok()
    }

    fn child(&self, property: &str) -> Option<NodeRef> {
        self.get_object(property).ok().flatten()
    }

    fn change_support(&self) -> &ChangeSupport {
        &self.changes
    }

    fn tracker_slot(&self) -> &TrackerSlot {
        &self.tracker
    }
}
