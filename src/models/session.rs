//! Session specification and lifecycle status.

use serde::{Deserialize, Serialize};

use super::mapping::IoMapping;
use super::module::ProcessingModuleSpec;

/// Lifecycle status of a session.
///
/// Transitions run `Created → Running → Stopped` only; a stopped session
/// cannot be restarted (create a new session instead).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Initialized but not yet started.
    Created,
    /// Lockstep loop and local modules running.
    Running,
    /// Stopped; partitions cleared, restart unsupported.
    Stopped,
}

/// Caller-submitted description of a session: opaque metadata plus the
/// pipeline of processing modules and their I/O wiring. The session id
/// is server-assigned at creation and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionSpec {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Authors of the session specification.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Processing modules making up the pipeline.
    #[serde(default)]
    pub processing_modules: Vec<ProcessingModuleSpec>,
    /// Wiring of module inputs to topic sources.
    #[serde(default)]
    pub io_mappings: Vec<IoMapping>,
}
