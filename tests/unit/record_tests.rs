//! Unit tests for topic records and the shared topic store.
//!
//! The store must preserve type tag and value exactly across a
//! publish/pull round trip for every value variant, and replace values
//! with last-write-wins semantics.

use interplex::models::record::{TopicDataRecord, TopicValue};
use interplex::topics::TopicStore;

#[test]
fn type_tags_match_variants() {
    assert_eq!(TopicValue::Bool(true).type_tag(), "bool");
    assert_eq!(TopicValue::Int(-3).type_tag(), "int");
    assert_eq!(TopicValue::Double(0.5).type_tag(), "double");
    assert_eq!(TopicValue::Text("x".into()).type_tag(), "text");
    assert_eq!(
        TopicValue::Json(serde_json::json!({"a": 1})).type_tag(),
        "json"
    );
}

#[test]
fn pull_of_unpublished_topic_is_none() {
    let store = TopicStore::new();
    assert!(store.pull("never/published").is_none());
    assert!(store.is_empty());
}

#[test]
fn publish_then_pull_preserves_type_and_value() {
    let store = TopicStore::new();
    let values = [
        TopicValue::Bool(true),
        TopicValue::Int(42),
        TopicValue::Double(13.37),
        TopicValue::Text("hello".into()),
        TopicValue::Json(serde_json::json!({"pose": [1.0, 2.0, 3.0]})),
    ];

    for (idx, value) in values.into_iter().enumerate() {
        let topic = format!("roundtrip/{idx}");
        store.publish(TopicDataRecord::new(&topic, value.clone()));

        let pulled = store.pull(&topic).expect("value was just published");
        assert_eq!(pulled.topic, topic);
        assert_eq!(pulled.value.type_tag(), value.type_tag());
        assert_eq!(pulled.value, value);
    }
}

#[test]
fn publish_overwrites_with_last_write_wins() {
    let store = TopicStore::new();
    store.publish(TopicDataRecord::new("sensor/level", TopicValue::Int(1)));
    store.publish(TopicDataRecord::new("sensor/level", TopicValue::Int(2)));
    store.publish(TopicDataRecord::new(
        "sensor/level",
        TopicValue::Text("recalibrating".into()),
    ));

    let pulled = store.pull("sensor/level").expect("published");
    assert_eq!(pulled.value, TopicValue::Text("recalibrating".into()));
    assert_eq!(store.len(), 1, "overwrites must not grow the store");
}

#[tokio::test]
async fn publish_notifies_subscribers() {
    let store = TopicStore::new();
    let mut rx = store.subscribe();

    store.publish(TopicDataRecord::new("a/b", TopicValue::Bool(false)));

    let record = rx.recv().await.expect("notification");
    assert_eq!(record.topic, "a/b");
    assert_eq!(record.value, TopicValue::Bool(false));
}

#[test]
fn topics_lists_published_names_sorted() {
    let store = TopicStore::new();
    store.publish(TopicDataRecord::new("b", TopicValue::Int(2)));
    store.publish(TopicDataRecord::new("a", TopicValue::Int(1)));
    store.publish(TopicDataRecord::new("c", TopicValue::Int(3)));
    assert_eq!(store.topics(), vec!["a", "b", "c"]);
}

#[test]
fn value_serde_uses_type_and_value_fields() {
    let raw = serde_json::to_value(TopicValue::Int(9)).expect("serialize");
    assert_eq!(raw, serde_json::json!({"type": "int", "value": 9}));

    let parsed: TopicValue =
        serde_json::from_value(serde_json::json!({"type": "text", "value": "ok"}))
            .expect("deserialize");
    assert_eq!(parsed, TopicValue::Text("ok".into()));
}
