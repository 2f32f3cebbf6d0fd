//! I/O mapping resolution: turn one module's declared inputs into
//! concrete topic records for a processing pass.

use tracing::debug;

use crate::models::mapping::{IoMapping, TopicSource};
use crate::models::module::ProcessingModuleSpec;
use crate::models::record::TopicDataRecord;
use crate::topics::{MuxRegistry, TopicStore};

/// Resolve every declared input of `spec` against the session's I/O
/// mappings.
///
/// A `Topic` source pulls exactly one record from the shared store; a
/// `Mux` source yields the multiplexer's full batch. A module without a
/// mapping entry, an input without a wiring entry, and a topic that was
/// never published all yield no records here; if the module depends on
/// them, the gap surfaces through the orchestrator's reply-completeness
/// check, not as a resolution error.
#[must_use]
pub fn resolve_module_inputs(
    spec: &ProcessingModuleSpec,
    mappings: &[IoMapping],
    topics: &TopicStore,
    muxes: &MuxRegistry,
) -> Vec<TopicDataRecord> {
    let Some(mapping) = mappings
        .iter()
        .find(|mapping| mapping.processing_module_id == spec.id)
    else {
        return Vec::new();
    };

    let mut records = Vec::new();
    for input in &spec.inputs {
        let Some(input_mapping) = mapping
            .input_mappings
            .iter()
            .find(|entry| entry.input_name == input.internal_name)
        else {
            continue;
        };

        match &input_mapping.topic_source {
            TopicSource::Topic(topic) => match topics.pull(topic) {
                Some(record) => records.push(record),
                None => {
                    debug!(module = spec.name, topic, "input topic never published");
                }
            },
            TopicSource::Mux(mux) => {
                records.extend(muxes.get(&mux.id));
            }
        }
    }
    records
}
