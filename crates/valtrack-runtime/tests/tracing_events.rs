#![forbid(unsafe_code)]

//! Structured log events emitted by the tracking engine.

use tracing_test::traced_test;
use valtrack_core::TypeSchema;
use valtrack_runtime::{NodeRef, Tracked, ValueObject};

#[traced_test]
#[test]
fn start_stop_and_rewire_are_logged() {
    let leaf = TypeSchema::builder("Leaf").value("value").build();
    let root_schema = TypeSchema::builder("Root").object("inner", &leaf).build();
    let root = ValueObject::new(&root_schema);
    let tracker = root.dirty_tracker();

    tracker.start_tracking_changes_directly();
    let child: NodeRef = ValueObject::new(&leaf);
    root.set_object("inner", Some(child)).unwrap();
    tracker.stop_tracking_changes_directly();

    assert!(logs_contain("tracker.start"));
    assert!(logs_contain("observer.attach"));
    assert!(logs_contain("observer.rewire"));
    assert!(logs_contain("observer.detach"));
    assert!(logs_contain("tracker.stop"));
}

#[traced_test]
#[test]
fn healing_is_logged() {
    let leaf = TypeSchema::builder("Leaf").value("value").build();
    let root_schema = TypeSchema::builder("Root").object("inner", &leaf).build();
    let root = ValueObject::new(&root_schema);
    root.dirty_tracker().start_tracking_changes_directly();

    let child: NodeRef = ValueObject::new(&leaf);
    root.replace_object_untracked("inner", Some(child)).unwrap();
    root.dirty_tracker().mark_dirty(&[]);

    assert!(logs_contain("heal.reattach"));
}
