#![forbid(unsafe_code)]

//! Property-based invariant tests for mark/clean propagation.
//!
//! These tests verify invariants that must hold for **any** sequence of
//! operations on a tracked two-level graph:
//!
//! 1. `mark_dirty(P)` makes every matching prefix and the whole tracker dirty.
//! 2. `mark_dirty(); mark_clean()` returns to a clean tracker.
//! 3. `mark_clean(P)` without a matching dirty path is a no-op.
//! 4. The root's paths under `inner.` always mirror the child's paths.
//! 5. No interleaving of marks, cleans, setters and tracking restarts trips the
//!    consistency check.

use std::sync::Arc;

use proptest::prelude::*;
use proptest::sample::subsequence;
use valtrack_core::{PathSchema, TypeSchema, path};
use valtrack_runtime::{NodeRef, Tracked, ValueObject};

// ── Strategies ──────────────────────────────────────────────────────────

const ROOT_PREFIXES: &[&str] = &[
    "", "n", "name", "in", "inner", "inner.", "inner.v", "inner.value", "inner.label",
];

const CHILD_PREFIXES: &[&str] = &["", "v", "value", "l", "label", "missing"];

#[derive(Debug, Clone)]
enum Op {
    MarkRoot(Vec<&'static str>),
    CleanRoot(Vec<&'static str>),
    MarkChild(Vec<&'static str>),
    CleanChild(Vec<&'static str>),
    SetChild(i64),
    SetRoot(i64),
    RestartRoot,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        subsequence(ROOT_PREFIXES, 0..3).prop_map(Op::MarkRoot),
        subsequence(ROOT_PREFIXES, 0..3).prop_map(Op::CleanRoot),
        subsequence(CHILD_PREFIXES, 0..3).prop_map(Op::MarkChild),
        subsequence(CHILD_PREFIXES, 0..3).prop_map(Op::CleanChild),
        (0i64..4).prop_map(Op::SetChild),
        (0i64..4).prop_map(Op::SetRoot),
        Just(Op::RestartRoot),
    ]
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn graph() -> (Arc<ValueObject>, Arc<ValueObject>) {
    let leaf = TypeSchema::builder("Leaf").value("value").value("label").build();
    let root_schema = TypeSchema::builder("Root")
        .value("name")
        .object("inner", &leaf)
        .build();
    let root = ValueObject::new(&root_schema);
    let inner = ValueObject::new(&leaf);
    let node: NodeRef = inner.clone();
    root.set_object("inner", Some(node)).unwrap();
    (root, inner)
}

fn under_inner(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| p.strip_prefix("inner."))
        .map(str::to_owned)
        .collect()
}

// ═════════════════════════════════════════════════════════════════════════
// 1–3. Single-tracker laws
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mark_dirty_makes_matching_prefixes_dirty(prefixes in subsequence(ROOT_PREFIXES, 1..4)) {
        let (root, _) = graph();
        let tracker = root.dirty_tracker();
        let schema = PathSchema::build(root.schema());

        tracker.mark_dirty(&prefixes);

        for p in &prefixes {
            if schema.iter().any(|s| path::matches_any(s, &[*p])) {
                prop_assert!(tracker.is_dirty(&[*p]), "prefix {p:?} not dirty");
                prop_assert!(tracker.is_dirty(&[]));
            }
        }
    }

    #[test]
    fn mark_then_clean_is_clean(prefixes in subsequence(ROOT_PREFIXES, 0..4)) {
        let (root, inner) = graph();
        let tracker = root.dirty_tracker();
        tracker.start_tracking_changes_directly();

        tracker.mark_dirty(&prefixes);
        tracker.mark_clean(&[]);

        prop_assert!(!tracker.is_dirty(&[]));
        prop_assert!(tracker.changed_bean_paths().is_empty());
        prop_assert!(!inner.dirty_tracker().is_dirty(&[]));
    }

    #[test]
    fn clean_without_match_is_noop(
        dirty in subsequence(ROOT_PREFIXES, 1..3),
        clean in subsequence(ROOT_PREFIXES, 1..3),
    ) {
        let (root, _) = graph();
        let tracker = root.dirty_tracker();
        tracker.mark_dirty(&dirty);
        let before = tracker.changed_bean_paths();
        let overlaps = before.iter().any(|p| path::matches_any(p, &clean));

        let changed = tracker.mark_clean(&clean);

        prop_assert_eq!(changed, overlaps);
        if !overlaps {
            prop_assert_eq!(tracker.changed_bean_paths(), before);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4–5. Parent/child mirror under arbitrary interleavings
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn root_mirrors_child(ops in proptest::collection::vec(op(), 1..24)) {
        let (root, inner) = graph();
        let root_tracker = root.dirty_tracker();
        let inner_tracker = inner.dirty_tracker();
        root_tracker.start_tracking_changes_directly();

        for op in ops {
            match op {
                Op::MarkRoot(p) => { root_tracker.mark_dirty(&p); }
                Op::CleanRoot(p) => { root_tracker.mark_clean(&p); }
                Op::MarkChild(p) => { inner_tracker.mark_dirty(&p); }
                Op::CleanChild(p) => { inner_tracker.mark_clean(&p); }
                Op::SetChild(v) => inner.set("value", v).unwrap(),
                Op::SetRoot(v) => root.set("name", v).unwrap(),
                Op::RestartRoot => {
                    root_tracker.stop_tracking_changes_directly();
                    root_tracker.start_tracking_changes_directly();
                }
            }
            prop_assert_eq!(
                under_inner(&root_tracker.changed_bean_paths()),
                inner_tracker.changed_bean_paths()
            );
        }
    }
}
