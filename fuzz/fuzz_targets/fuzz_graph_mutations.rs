#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use valtrack_core::TypeSchema;
use valtrack_core::config::{self, ConsistencyPolicy, TrackingConfig};
use valtrack_runtime::{NodeRef, Tracked, ValueObject};

const PREFIXES: &[&str] = &["", "name", "left", "left.", "left.value", "right.value", "value", "v"];

#[derive(Arbitrary, Debug)]
enum Op {
    Start(bool),
    Stop(bool),
    SetLeaf(bool, i8),
    MarkRoot(u8),
    CleanRoot(u8),
    MarkLeaf(bool, u8),
    CleanLeaf(bool, u8),
    SwapLeaf(bool),
    SwapLeafUntracked(bool),
}

fn prefix(index: u8) -> &'static str {
    PREFIXES[usize::from(index) % PREFIXES.len()]
}

fuzz_target!(|ops: Vec<Op>| {
    // Swaps can alias both slots to one leaf; that topology is allowed to
    // disagree, so only count it.
    config::install(TrackingConfig::default().with_consistency(ConsistencyPolicy::Log));

    let leaf = TypeSchema::builder("Leaf").value("value").build();
    let root_schema = TypeSchema::builder("Root")
        .value("name")
        .object("left", &leaf)
        .object("right", &leaf)
        .build();
    let root = ValueObject::new(&root_schema);
    let leaves = [ValueObject::new(&leaf), ValueObject::new(&leaf)];
    for (property, node) in ["left", "right"].iter().zip(&leaves) {
        let node: NodeRef = node.clone();
        root.set_object(property, Some(node)).unwrap();
    }
    let root_tracker = root.dirty_tracker();

    for op in ops.into_iter().take(64) {
        match op {
            Op::Start(on_root) => {
                if on_root {
                    root_tracker.start_tracking_changes_directly();
                } else {
                    leaves[0].dirty_tracker().start_tracking_changes_directly();
                }
            }
            Op::Stop(on_root) => {
                if on_root {
                    root_tracker.stop_tracking_changes_directly();
                } else {
                    leaves[0].dirty_tracker().stop_tracking_changes_directly();
                }
            }
            Op::SetLeaf(which, v) => {
                leaves[usize::from(which)].set("value", i64::from(v)).unwrap();
            }
            Op::MarkRoot(p) => {
                root_tracker.mark_dirty(&[prefix(p)]);
            }
            Op::CleanRoot(p) => {
                root_tracker.mark_clean(&[prefix(p)]);
            }
            Op::MarkLeaf(which, p) => {
                leaves[usize::from(which)].dirty_tracker().mark_dirty(&[prefix(p)]);
            }
            Op::CleanLeaf(which, p) => {
                leaves[usize::from(which)].dirty_tracker().mark_clean(&[prefix(p)]);
            }
            Op::SwapLeaf(which) => {
                let node: NodeRef = leaves[usize::from(which)].clone();
                root.set_object("left", Some(node)).unwrap();
            }
            Op::SwapLeafUntracked(which) => {
                let node: NodeRef = leaves[usize::from(which)].clone();
                root.replace_object_untracked("right", Some(node)).unwrap();
            }
        }
    }

    assert_eq!(
        root_tracker.is_tracking_changes(),
        root_tracker.is_tracking_changes_directly()
    );
});
