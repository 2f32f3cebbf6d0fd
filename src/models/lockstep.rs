//! Lockstep processing request/reply payloads.

use serde::{Deserialize, Serialize};

use super::record::TopicDataRecord;

/// One node's aggregated request for a lockstep pass: every lockstep
/// module hosted on the node, the union of their resolved input records,
/// and the elapsed time since the previous pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LockstepProcessingRequest {
    /// Modules expected to process this pass.
    pub processing_module_ids: Vec<String>,
    /// Union of input records for all modules in the request.
    pub records: Vec<TopicDataRecord>,
    /// Elapsed milliseconds since the previous pass.
    pub delta_time_ms: u64,
}

/// One node's reply to a lockstep request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LockstepProcessingReply {
    /// Modules that actually processed the pass.
    pub processing_module_ids: Vec<String>,
    /// Output records to publish back to the shared store.
    pub records: Vec<TopicDataRecord>,
}

impl LockstepProcessingReply {
    /// Requested module ids absent from this reply.
    ///
    /// A reply is complete iff this is empty; incompleteness is reported
    /// by the orchestrator but never fatal to the loop.
    #[must_use]
    pub fn missing_ids(&self, requested: &[String]) -> Vec<String> {
        requested
            .iter()
            .filter(|id| !self.processing_module_ids.contains(id))
            .cloned()
            .collect()
    }
}
