#![forbid(unsafe_code)]

//! Under the `Log` policy a parent/child mismatch is counted and logged.

use tracing_test::traced_test;
use valtrack_core::TypeSchema;
use valtrack_core::config::{self, ConsistencyPolicy, TrackingConfig};
use valtrack_runtime::{NodeRef, Tracked, ValueObject, metrics};

#[traced_test]
#[test]
fn diamond_divergence_is_logged() {
    config::install(TrackingConfig::default().with_consistency(ConsistencyPolicy::Log));

    let leaf = TypeSchema::builder("Leaf").value("value").build();
    let root_schema = TypeSchema::builder("Diamond")
        .object("left", &leaf)
        .object("right", &leaf)
        .build();
    let root = ValueObject::new(&root_schema);
    let shared: NodeRef = ValueObject::new(&leaf);
    root.set_object("left", Some(shared.clone())).unwrap();
    root.set_object("right", Some(shared.clone())).unwrap();
    let tracker = root.dirty_tracker();
    tracker.start_tracking_changes_directly();

    shared.dirty_tracker().mark_dirty(&["value"]);
    tracker.mark_clean(&["right."]);
    let before = metrics::consistency_violations_total();
    assert!(shared.dirty_tracker().mark_dirty(&["value"]));

    assert_eq!(metrics::consistency_violations_total(), before + 1);
    assert!(logs_contain("tracker.consistency_violation"));
    assert_eq!(tracker.changed_bean_paths(), vec!["left.value".to_owned()]);
}
