#![forbid(unsafe_code)]

//! Serialized forms of values, change events and tracking snapshots.

use valtrack::core::NodeId;
use valtrack::runtime::TrackerSnapshot;
use valtrack::{
    GraphTrackingSnapshot, NodeRef, PropertyChangeEvent, Tracked, TypeSchema, Value, ValueObject,
};

#[test]
fn values_round_trip_through_json() {
    for value in [
        Value::Null,
        Value::Bool(true),
        Value::Int(-3),
        Value::Text("x".into()),
    ] {
        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

#[test]
fn event_keeps_node_reference() {
    let child = NodeId::next();
    let event = PropertyChangeEvent::new(NodeId::next(), "inner", Value::Null, Value::Node(child));
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"property\":\"inner\""));
    let back: PropertyChangeEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back.new_value.as_node(), Some(child));
    assert!(back.is_reference_change());
}

#[test]
fn graph_snapshot_rehydrates_after_json() {
    let leaf = TypeSchema::builder("Leaf").value("value").build();
    let root_schema = TypeSchema::builder("Root").object("inner", &leaf).build();

    let build = || {
        let root = ValueObject::new(&root_schema);
        let inner = ValueObject::new(&leaf);
        let node: NodeRef = inner.clone();
        root.set_object("inner", Some(node)).unwrap();
        (root, inner)
    };

    let (root, inner) = build();
    inner.dirty_tracker().start_tracking_changes_directly();
    let root_ref: NodeRef = root.clone();
    let json = serde_json::to_string(&GraphTrackingSnapshot::capture(&root_ref)).unwrap();

    let (loaded_root, loaded_inner) = build();
    let snapshot: GraphTrackingSnapshot = serde_json::from_str(&json).unwrap();
    let loaded_ref: NodeRef = loaded_root.clone();
    assert_eq!(snapshot.restore(&loaded_ref), 1);

    assert!(loaded_inner.dirty_tracker().is_tracking_changes_directly());
    assert!(!loaded_root.dirty_tracker().is_tracking_changes());
    loaded_inner.set("value", 1).unwrap();
    assert!(loaded_inner.dirty_tracker().is_dirty(&["value"]));
}

#[test]
fn tracker_snapshot_json_shape() {
    let json = serde_json::to_string(&TrackerSnapshot {
        tracking_directly: true,
    })
    .unwrap();
    assert_eq!(json, r#"{"tracking_directly":true}"#);
    let back: TrackerSnapshot = serde_json::from_str(&json).unwrap();
    assert!(back.tracking_directly);
}
