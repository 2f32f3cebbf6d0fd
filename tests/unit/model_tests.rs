//! Unit tests for the domain models: spec deserialization, lockstep
//! reply completeness, and processing-mode flags.

use interplex::models::lockstep::{LockstepProcessingReply, LockstepProcessingRequest};
use interplex::models::mapping::{IoMapping, TopicSource};
use interplex::models::module::{ProcessingMode, ProcessingModuleSpec};
use interplex::models::record::{TopicDataRecord, TopicValue};
use interplex::models::session::SessionSpec;

#[test]
fn session_spec_deserializes_with_defaults() {
    let spec: SessionSpec = serde_json::from_str(
        r#"{
            "name": "tracking-pipeline",
            "processing_modules": [
                { "name": "smoother" },
                { "name": "fuser", "node_id": "worker-2", "processing_mode": "lockstep" }
            ]
        }"#,
    )
    .expect("valid session spec");

    assert_eq!(spec.name, "tracking-pipeline");
    assert!(spec.tags.is_empty());
    assert!(spec.io_mappings.is_empty());
    assert_eq!(spec.processing_modules.len(), 2);

    let smoother = &spec.processing_modules[0];
    assert!(smoother.id.is_empty(), "ids are server-assigned");
    assert_eq!(smoother.node_id, None);
    assert_eq!(smoother.processing_mode, ProcessingMode::Free);
    assert!(!smoother.is_lockstep());

    let fuser = &spec.processing_modules[1];
    assert_eq!(fuser.node_id.as_deref(), Some("worker-2"));
    assert!(fuser.is_lockstep());
}

#[test]
fn topic_source_variants_are_tagged() {
    let mapping: IoMapping = serde_json::from_str(
        r#"{
            "processing_module_name": "fuser",
            "input_mappings": [
                { "input_name": "pose", "topic_source": { "topic": "tracker/pose" } },
                { "input_name": "markers", "topic_source": { "mux": { "id": "mux-1" } } }
            ]
        }"#,
    )
    .expect("valid mapping");

    assert_eq!(mapping.input_mappings.len(), 2);
    assert_eq!(
        mapping.input_mappings[0].topic_source,
        TopicSource::Topic("tracker/pose".into())
    );
    match &mapping.input_mappings[1].topic_source {
        TopicSource::Mux(mux) => assert_eq!(mux.id, "mux-1"),
        other => panic!("expected mux source, got {other:?}"),
    }
}

#[test]
fn complete_reply_has_no_missing_ids() {
    let requested = vec!["pm-1".to_owned(), "pm-2".to_owned()];
    let reply = LockstepProcessingReply {
        processing_module_ids: vec!["pm-2".into(), "pm-1".into()],
        records: Vec::new(),
    };
    assert!(reply.missing_ids(&requested).is_empty());
}

#[test]
fn missing_ids_names_exactly_the_absent_modules() {
    let requested = vec!["pm-1".to_owned(), "pm-2".to_owned()];
    let reply = LockstepProcessingReply {
        processing_module_ids: vec!["pm-1".into()],
        records: Vec::new(),
    };
    assert_eq!(reply.missing_ids(&requested), vec!["pm-2".to_owned()]);
}

#[test]
fn lockstep_request_round_trips_through_serde() {
    let request = LockstepProcessingRequest {
        processing_module_ids: vec!["pm-1".into()],
        records: vec![TopicDataRecord::new("a/b", TopicValue::Int(7))],
        delta_time_ms: 16,
    };
    let raw = serde_json::to_string(&request).expect("serialize");
    let parsed: LockstepProcessingRequest = serde_json::from_str(&raw).expect("deserialize");
    assert_eq!(parsed, request);
}

#[test]
fn module_spec_defaults_to_free_mode() {
    let spec = ProcessingModuleSpec {
        name: "solo".into(),
        ..ProcessingModuleSpec::default()
    };
    assert!(!spec.is_lockstep());
}
