//! Dirty paths of a single node.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::path;
use crate::schema::PathSchema;

/// The subset of a node's [`PathSchema`] currently marked dirty.
///
/// # Invariants
///
/// 1. Every changed path is a schema path (`changed ⊆ schema`).
/// 2. `mark` and `clear` report exactly the paths whose membership changed.
#[derive(Debug, Clone)]
pub struct ChangeSet {
    schema: Arc<PathSchema>,
    changed: BTreeSet<String>,
}

impl ChangeSet {
    /// Create an empty change set over `schema`.
    #[must_use]
    pub fn new(schema: Arc<PathSchema>) -> Self {
        Self {
            schema,
            changed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<PathSchema> {
        &self.schema
    }

    /// Add every schema path under `prefixes`; returns the newly added ones.
    pub fn mark<S: AsRef<str>>(&mut self, prefixes: &[S]) -> Vec<String> {
        let mut added = Vec::new();
        for p in self.schema.matching(prefixes) {
            if !self.changed.contains(p) {
                added.push(p.to_owned());
            }
        }
        self.changed.extend(added.iter().cloned());
        added
    }

    /// Add exactly the listed schema paths, without widening them to the
    /// paths below; returns the newly added ones.
    pub fn insert_exact<S: AsRef<str>>(&mut self, paths: &[S]) -> Vec<String> {
        let mut added = Vec::new();
        for p in paths {
            let p = p.as_ref();
            if self.schema.contains(p) && self.changed.insert(p.to_owned()) {
                added.push(p.to_owned());
            }
        }
        added
    }

    /// Remove every changed path under `prefixes`; returns the removed ones.
    pub fn clear<S: AsRef<str>>(&mut self, prefixes: &[S]) -> Vec<String> {
        let removed: Vec<String> = self
            .changed
            .iter()
            .filter(|p| path::matches_any(p, prefixes))
            .cloned()
            .collect();
        for p in &removed {
            self.changed.remove(p);
        }
        removed
    }

    /// True if anything is dirty (empty `prefixes`) or any dirty path falls
    /// under one of `prefixes`.
    #[must_use]
    pub fn is_dirty<S: AsRef<str>>(&self, prefixes: &[S]) -> bool {
        if prefixes.is_empty() {
            return !self.changed.is_empty();
        }
        self.changed.iter().any(|p| path::matches_any(p, prefixes))
    }

    /// Snapshot of the dirty paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.changed.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changed.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}
