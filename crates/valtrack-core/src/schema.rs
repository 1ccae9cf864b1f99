#![forbid(unsafe_code)]

//! Declared type schemas and the per-tracker path schema.
//!
//! Every node type declares its properties once, as a [`TypeSchema`]. Object
//! properties reference the child type's schema by `Arc`, so type graphs are
//! acyclic by construction and a deep walk always terminates.
//!
//! A [`PathSchema`] is the ordered set of absolute bean paths reachable from a
//! type: every tracked property, recursively through object properties.
//! Properties without a public accessor and table-column properties are not
//! tracked and contribute nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::path;

/// What a declared property holds.
#[derive(Clone)]
pub enum PropertyKind {
    /// A plain value (number, text, flag).
    Value,
    /// A reference to a nested value object of the given type.
    Object(Arc<TypeSchema>),
    /// A table-column property. Never tracked.
    TableColumn,
}

impl fmt::Debug for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => f.write_str("Value"),
            Self::Object(schema) => write!(f, "Object({})", schema.name()),
            Self::TableColumn => f.write_str("TableColumn"),
        }
    }
}

/// One declared property of a type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    name: String,
    kind: PropertyKind,
    public: bool,
}

impl PropertyDescriptor {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Whether the property has a public accessor.
    #[must_use]
    pub fn has_public_accessor(&self) -> bool {
        self.public
    }

    /// The nested type, for object properties.
    #[must_use]
    pub fn object_schema(&self) -> Option<&Arc<TypeSchema>> {
        match &self.kind {
            PropertyKind::Object(schema) => Some(schema),
            _ => None,
        }
    }

    /// Whether the property participates in dirty tracking.
    #[must_use]
    pub fn is_tracked(&self) -> bool {
        self.public && !matches!(self.kind, PropertyKind::TableColumn)
    }
}

/// Declared property list of a node type.
#[derive(Debug)]
pub struct TypeSchema {
    name: String,
    properties: Vec<PropertyDescriptor>,
}

impl TypeSchema {
    /// Start declaring a type.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> TypeSchemaBuilder {
        TypeSchemaBuilder {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All declared properties, tracked or not, in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Look up a declared property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Tracked properties one level down.
    pub fn enumerate_shallow(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.iter().filter(|p| p.is_tracked())
    }

    /// Absolute bean paths of every tracked property reachable from this
    /// type, depth-first in declaration order.
    ///
    /// Duplicates are reported as-is; [`PathSchema::build`] rejects them.
    #[must_use]
    pub fn enumerate_deep(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_deep("", &mut out);
        out
    }

    fn collect_deep(&self, base: &str, out: &mut Vec<String>) {
        for property in self.enumerate_shallow() {
            let path = path::join(base, &property.name);
            if let PropertyKind::Object(child) = &property.kind {
                out.push(path.clone());
                child.collect_deep(&path, out);
            } else {
                out.push(path);
            }
        }
    }
}

/// Builder for [`TypeSchema`].
#[derive(Debug)]
#[must_use]
pub struct TypeSchemaBuilder {
    name: String,
    properties: Vec<PropertyDescriptor>,
}

impl TypeSchemaBuilder {
    /// Declare a public value property.
    pub fn value(self, name: impl Into<String>) -> Self {
        self.push(name, PropertyKind::Value, true)
    }

    /// Declare a value property without a public accessor.
    pub fn private_value(self, name: impl Into<String>) -> Self {
        self.push(name, PropertyKind::Value, false)
    }

    /// Declare a public reference to a nested value object.
    pub fn object(self, name: impl Into<String>, schema: &Arc<TypeSchema>) -> Self {
        self.push(name, PropertyKind::Object(Arc::clone(schema)), true)
    }

    /// Declare a table-column property.
    pub fn table_column(self, name: impl Into<String>) -> Self {
        self.push(name, PropertyKind::TableColumn, true)
    }

    fn push(mut self, name: impl Into<String>, kind: PropertyKind, public: bool) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.into(),
            kind,
            public,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Arc<TypeSchema> {
        Arc::new(TypeSchema {
            name: self.name,
            properties: self.properties,
        })
    }
}

/// Immutable set of absolute bean paths reachable from a node type.
///
/// Computed once per tracker and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSchema {
    paths: BTreeSet<String>,
}

impl PathSchema {
    /// Walk `root` deeply and collect every tracked path.
    ///
    /// # Panics
    ///
    /// Panics if the walk produces the same path twice. That means the type
    /// declaration itself is broken, which no caller can recover from.
    #[must_use]
    pub fn build(root: &TypeSchema) -> Self {
        let mut paths = BTreeSet::new();
        for path in root.enumerate_deep() {
            assert!(
                !paths.contains(&path),
                "duplicate bean path `{path}` in schema of `{}`",
                root.name()
            );
            paths.insert(path);
        }
        Self { paths }
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Paths in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// Paths falling under any of `prefixes` (all paths for an empty list).
    pub fn matching<'a, S: AsRef<str>>(
        &'a self,
        prefixes: &'a [S],
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.iter()
            .filter(move |path| path::matches_any(path, prefixes))
    }
}
