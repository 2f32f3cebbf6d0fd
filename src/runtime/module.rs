//! Local processing-module instances.
//!
//! The coordination layer does not define how modules compute their
//! outputs; embedders attach a processing handler per module. A module
//! without a handler simply never replies to lockstep passes, which the
//! orchestrator surfaces as reply incompleteness.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::models::module::ProcessingModuleSpec;
use crate::models::record::TopicDataRecord;

/// Callback computing a module's outputs for one lockstep pass: the
/// node's input record batch plus elapsed milliseconds in, output
/// records out.
pub type ProcessingHandler =
    Arc<dyn Fn(&[TopicDataRecord], u64) -> Vec<TopicDataRecord> + Send + Sync>;

/// Lifecycle status of a local module instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Instantiated, not yet started.
    Created,
    /// Participating in processing.
    Started,
    /// Stopped by its session.
    Stopped,
}

/// A processing module instantiated on this node.
pub struct ProcessingModule {
    /// Instance identifier.
    pub id: String,
    /// Module name from the spec.
    pub name: String,
    /// Owning session.
    pub session_id: String,
    status: ModuleStatus,
    handler: Option<ProcessingHandler>,
}

impl ProcessingModule {
    /// Instantiate a module from its spec with a fresh id.
    #[must_use]
    pub fn new(spec: &ProcessingModuleSpec) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: spec.name.clone(),
            session_id: spec.session_id.clone(),
            status: ModuleStatus::Created,
            handler: None,
        }
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    /// Whether the module currently participates in processing.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.status == ModuleStatus::Started
    }

    /// Begin participating in processing.
    pub fn start(&mut self) {
        self.status = ModuleStatus::Started;
        info!(module = %self.label(), "processing module started");
    }

    /// Stop participating in processing.
    pub fn stop(&mut self) {
        self.status = ModuleStatus::Stopped;
        info!(module = %self.label(), "processing module stopped");
    }

    /// Attach the processing handler invoked on lockstep passes.
    pub fn set_handler(&mut self, handler: ProcessingHandler) {
        self.handler = Some(handler);
    }

    /// Run one lockstep pass through the module's handler.
    ///
    /// Returns `None` when the module is not started or has no handler
    /// attached; the module then counts as not having replied.
    #[must_use]
    pub fn process(&self, inputs: &[TopicDataRecord], delta_time_ms: u64) -> Option<Vec<TopicDataRecord>> {
        if !self.is_started() {
            return None;
        }
        self.handler
            .as_ref()
            .map(|handler| handler(inputs, delta_time_ms))
    }

    /// Human-readable label for diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} (ID {})", self.name, self.id)
    }
}
