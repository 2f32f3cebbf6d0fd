//! I/O mapping model: declarative wiring from module inputs to topics.

use serde::{Deserialize, Serialize};

/// Reference to a registered topic multiplexer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MuxRef {
    /// Multiplexer identifier in the mux registry.
    pub id: String,
}

/// Source feeding one module input.
///
/// The variant is fixed at mapping construction time; it is never
/// inferred from runtime value shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopicSource {
    /// A single named topic read from the shared store.
    Topic(String),
    /// A multiplexer yielding zero or more records per read.
    Mux(MuxRef),
}

/// Wiring of one declared module input to its source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct InputMapping {
    /// The module's internal input name.
    pub input_name: String,
    /// Where the input's records come from.
    pub topic_source: TopicSource,
}

/// I/O mapping for one processing module of a session.
///
/// Exactly one module owns a given mapping. When `processing_module_id`
/// is unset, session initialization resolves it by matching
/// `processing_module_name`; a mapping left unresolved after that pass is
/// a configuration error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct IoMapping {
    /// Owning module instance, possibly resolved lazily by name.
    #[serde(default)]
    pub processing_module_id: String,
    /// Module name used for lazy resolution when the id is unset.
    #[serde(default)]
    pub processing_module_name: String,
    /// Per-input wiring entries.
    #[serde(default)]
    pub input_mappings: Vec<InputMapping>,
}
