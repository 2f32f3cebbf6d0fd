//! Module registry and dispatcher.
//!
//! Owns every module instantiated on this node, retains the activated
//! I/O mappings per session, fans module-started confirmations out to
//! subscribed sessions, and routes lockstep requests: requests targeting
//! this node run through local module handlers, requests for remote
//! nodes go through the registered [`NodeLink`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::lockstep::{LockstepProcessingReply, LockstepProcessingRequest};
use crate::models::mapping::IoMapping;
use crate::models::module::ProcessingModuleSpec;
use crate::runtime::link::NodeLink;
use crate::runtime::module::{ModuleStatus, ProcessingHandler, ProcessingModule};
use crate::{AppError, Result};

/// Capacity of the module-started broadcast channel.
const STARTED_CAPACITY: usize = 64;

/// Confirmation that a module began processing on its target node.
#[derive(Debug, Clone)]
pub struct ModuleStarted {
    /// Session the module belongs to.
    pub session_id: String,
    /// Module instance id.
    pub module_id: String,
    /// Node the module runs on.
    pub node_id: String,
}

/// Registry of processing modules hosted on (or dispatched from) this node.
pub struct ModuleRegistry {
    node_id: String,
    modules: Mutex<HashMap<String, ProcessingModule>>,
    session_mappings: Mutex<HashMap<String, Vec<IoMapping>>>,
    links: Mutex<HashMap<String, Arc<dyn NodeLink>>>,
    started_tx: broadcast::Sender<ModuleStarted>,
}

impl ModuleRegistry {
    /// Construct a registry for the node with the given id.
    #[must_use]
    pub fn new(node_id: impl Into<String>) -> Self {
        let (started_tx, _rx) = broadcast::channel(STARTED_CAPACITY);
        Self {
            node_id: node_id.into(),
            modules: Mutex::new(HashMap::new()),
            session_mappings: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
            started_tx,
        }
    }

    /// Identifier of the node this registry serves.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Id of an existing module matching the spec's name within the
    /// session, if one was already instantiated.
    #[must_use]
    pub fn get_module_by_specs(&self, spec: &ProcessingModuleSpec, session_id: &str) -> Option<String> {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|module| module.name == spec.name && module.session_id == session_id)
            .map(|module| module.id.clone())
    }

    /// Instantiate a module from its spec and return the instance id.
    ///
    /// Returns `None` (with a failure diagnostic) when the spec cannot
    /// be instantiated; the caller aborts session initialization.
    #[must_use]
    pub fn create_module(&self, spec: &ProcessingModuleSpec) -> Option<String> {
        if spec.name.is_empty() {
            warn!(session_id = spec.session_id, "cannot instantiate module without a name");
            return None;
        }
        let module = ProcessingModule::new(spec);
        let id = module.id.clone();
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), module);
        Some(id)
    }

    /// Start a module by id. Unknown ids are reported and skipped.
    pub fn start_module(&self, module_id: &str) {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        match modules.get_mut(module_id) {
            Some(module) => module.start(),
            None => warn!(module_id, "start requested for unknown module"),
        }
    }

    /// Stop a module by id. Unknown ids are reported and skipped.
    pub fn stop_module(&self, module_id: &str) {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        match modules.get_mut(module_id) {
            Some(module) => module.stop(),
            None => warn!(module_id, "stop requested for unknown module"),
        }
    }

    /// Lifecycle status of a module, if it exists.
    #[must_use]
    pub fn module_status(&self, module_id: &str) -> Option<ModuleStatus> {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_id)
            .map(ProcessingModule::status)
    }

    /// Attach a processing handler to a module. Unknown ids are ignored.
    pub fn set_handler(&self, module_id: &str, handler: ProcessingHandler) {
        let mut modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(module) = modules.get_mut(module_id) {
            module.set_handler(handler);
        }
    }

    /// Human-readable label for a module id, for diagnostics.
    #[must_use]
    pub fn module_label(&self, module_id: &str) -> String {
        self.modules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(module_id)
            .map_or_else(|| format!("unknown module (ID {module_id})"), ProcessingModule::label)
    }

    /// Activate a session's I/O mappings.
    pub fn apply_io_mappings(&self, mappings: Vec<IoMapping>, session_id: &str) {
        debug!(session_id, count = mappings.len(), "applying io mappings");
        self.session_mappings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.to_owned(), mappings);
    }

    /// The activated I/O mappings of a session, if any.
    #[must_use]
    pub fn io_mappings(&self, session_id: &str) -> Option<Vec<IoMapping>> {
        self.session_mappings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
    }

    /// Register the dispatch link for a remote node.
    pub fn register_node_link(&self, node_id: impl Into<String>, link: Arc<dyn NodeLink>) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node_id.into(), link);
    }

    /// Remove a remote node's dispatch link.
    pub fn remove_node_link(&self, node_id: &str) {
        self.links
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(node_id);
    }

    /// Subscribe to module-started confirmations.
    #[must_use]
    pub fn subscribe_module_started(&self) -> broadcast::Receiver<ModuleStarted> {
        self.started_tx.subscribe()
    }

    /// Entry point for transports acknowledging that a module started on
    /// its target node; fans out to subscribed sessions.
    pub fn notify_module_started(&self, started: ModuleStarted) {
        debug!(
            session_id = started.session_id,
            module_id = started.module_id,
            node_id = started.node_id,
            "module started"
        );
        // No subscribers is not an error.
        let _ = self.started_tx.send(started);
    }

    /// Dispatch one lockstep request to its target node.
    ///
    /// Requests for this node run locally through module handlers;
    /// requests for remote nodes go through the registered link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Transport` if the target node has no
    /// registered link, or whatever error the link's dispatch produced.
    pub async fn send_lockstep_request(
        &self,
        node_id: &str,
        request: LockstepProcessingRequest,
    ) -> Result<LockstepProcessingReply> {
        if node_id == self.node_id {
            return Ok(self.process_lockstep_locally(&request));
        }

        let link = {
            let links = self.links.lock().unwrap_or_else(PoisonError::into_inner);
            links.get(node_id).map(Arc::clone)
        };
        match link {
            Some(link) => link.send_lockstep_request(request).await,
            None => Err(AppError::Transport(format!(
                "no link registered for node {node_id}"
            ))),
        }
    }

    /// Run one lockstep pass over this node's own modules.
    ///
    /// A stopped or handler-less module is omitted from the reply's id
    /// list; the requesting session reports it as missing.
    fn process_lockstep_locally(&self, request: &LockstepProcessingRequest) -> LockstepProcessingReply {
        let modules = self.modules.lock().unwrap_or_else(PoisonError::into_inner);
        let mut reply = LockstepProcessingReply::default();
        for module_id in &request.processing_module_ids {
            let Some(module) = modules.get(module_id) else {
                continue;
            };
            if let Some(outputs) = module.process(&request.records, request.delta_time_ms) {
                reply.processing_module_ids.push(module_id.clone());
                reply.records.extend(outputs);
            }
        }
        reply
    }
}
