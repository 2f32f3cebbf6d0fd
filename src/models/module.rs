//! Processing-module specification model.

use serde::{Deserialize, Serialize};

/// Execution mode of a processing module.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// The module runs on its own cadence on its target node.
    #[default]
    Free,
    /// The module advances in synchronized lockstep passes driven by the
    /// session's master node.
    Lockstep,
}

/// One declared input of a processing module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ModuleInput {
    /// Name the module uses internally to address this input.
    pub internal_name: String,
    /// Message format tag of the expected records.
    #[serde(default)]
    pub message_format: String,
}

/// Specification of one processing module within a session.
///
/// `id` and `session_id` are assigned by session initialization; callers
/// submit specs with these fields unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ProcessingModuleSpec {
    /// Module instance identifier, assigned at session initialization.
    #[serde(default)]
    pub id: String,
    /// Module name, used to match I/O mappings declared by name.
    pub name: String,
    /// Owning session, assigned at session initialization.
    #[serde(default)]
    pub session_id: String,
    /// Execution target node. Defaults to the master node when unset.
    #[serde(default)]
    pub node_id: Option<String>,
    /// Execution mode.
    #[serde(default)]
    pub processing_mode: ProcessingMode,
    /// Declared inputs, resolved against the session's I/O mappings.
    #[serde(default)]
    pub inputs: Vec<ModuleInput>,
}

impl ProcessingModuleSpec {
    /// Whether this module participates in lockstep passes.
    #[must_use]
    pub fn is_lockstep(&self) -> bool {
        self.processing_mode == ProcessingMode::Lockstep
    }
}
