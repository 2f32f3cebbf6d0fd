//! Session orchestration and the lockstep processing loop.
//!
//! A session partitions its processing modules between this node and
//! remote nodes at initialization, starts and stops them as one unit,
//! and drives all lockstep-mode modules through synchronized passes:
//! one aggregated request per node per pass, the next pass scheduled
//! only after every node's dispatch has settled. Pass cadence is bounded
//! below by the slowest node's round trip and above by nothing.
//!
//! `stop()` cancels the session's token; the loop checks it at each
//! iteration boundary, so a pass already dispatched when the session
//! stops settles without publishing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::lockstep::LockstepProcessingRequest;
use crate::models::mapping::IoMapping;
use crate::models::module::ProcessingModuleSpec;
use crate::models::session::{SessionSpec, SessionStatus};
use crate::orchestrator::resolver;
use crate::runtime::registry::{ModuleRegistry, ModuleStarted};
use crate::topics::{MuxRegistry, TopicStore};

/// Events emitted by sessions for manager-level handling.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Remote modules failed to confirm their start within the timeout
    /// window. Carries exactly the specs still pending when the window
    /// closed. Fired at most once per `start()`.
    StartFailure {
        /// Session whose remote modules went unconfirmed.
        session_id: String,
        /// The still-pending module specs.
        pending: Vec<ProcessingModuleSpec>,
    },
}

/// Shared collaborators handed to every session.
#[derive(Clone)]
pub struct SessionContext {
    /// Identifier of the master node (this node).
    pub master_node_id: String,
    /// Shared topic store.
    pub topics: Arc<TopicStore>,
    /// Shared multiplexer registry.
    pub muxes: Arc<MuxRegistry>,
    /// Module registry and dispatcher.
    pub modules: Arc<ModuleRegistry>,
    /// Session event channel.
    pub event_tx: mpsc::Sender<SessionEvent>,
    /// Window for remote modules to confirm their start.
    pub remote_start_timeout: Duration,
}

/// One logical pipeline of processing modules with its own lifecycle.
pub struct Session {
    id: String,
    name: String,
    tags: Vec<String>,
    description: String,
    authors: Vec<String>,
    processing_modules: Vec<ProcessingModuleSpec>,
    io_mappings: Vec<IoMapping>,
    status: SessionStatus,
    initialized: bool,
    local_pms: Vec<ProcessingModuleSpec>,
    remote_pms: HashMap<String, Vec<ProcessingModuleSpec>>,
    lockstep_pms: HashMap<String, Vec<ProcessingModuleSpec>>,
    pending_remote_start: Arc<Mutex<Vec<ProcessingModuleSpec>>>,
    ctx: SessionContext,
    cancel: CancellationToken,
}

impl Drop for Session {
    /// Cancel the session's background tasks when the object is released.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Session {
    /// Construct a session from its spec with a fresh server-assigned id.
    #[must_use]
    pub fn new(spec: SessionSpec, ctx: SessionContext) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: spec.name,
            tags: spec.tags,
            description: spec.description,
            authors: spec.authors,
            processing_modules: spec.processing_modules,
            io_mappings: spec.io_mappings,
            status: SessionStatus::Created,
            initialized: false,
            local_pms: Vec::new(),
            remote_pms: HashMap::new(),
            lockstep_pms: HashMap::new(),
            pending_remote_start: Arc::new(Mutex::new(Vec::new())),
            ctx,
            cancel: CancellationToken::new(),
        }
    }

    /// Server-assigned session id, immutable after creation.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Authors of the session specification.
    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// All processing-module specs, with ids and targets as assigned by
    /// initialization.
    #[must_use]
    pub fn processing_modules(&self) -> &[ProcessingModuleSpec] {
        &self.processing_modules
    }

    /// Modules running on this node.
    #[must_use]
    pub fn local_pms(&self) -> &[ProcessingModuleSpec] {
        &self.local_pms
    }

    /// Modules grouped by the remote node they run on.
    #[must_use]
    pub fn remote_pms(&self) -> &HashMap<String, Vec<ProcessingModuleSpec>> {
        &self.remote_pms
    }

    /// Lockstep-mode modules grouped by the node they run on.
    #[must_use]
    pub fn lockstep_pms(&self) -> &HashMap<String, Vec<ProcessingModuleSpec>> {
        &self.lockstep_pms
    }

    /// Remote modules still awaiting their start confirmation.
    #[must_use]
    pub fn pending_remote_start(&self) -> Vec<ProcessingModuleSpec> {
        self.pending_remote_start
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Human-readable label for diagnostics.
    #[must_use]
    pub fn label(&self) -> String {
        format!("Session {} (ID {})", self.name, self.id)
    }

    /// Partition the module specs and wire the I/O mappings. Must run
    /// exactly once per session object; partitions are never recomputed
    /// by `start`/`stop`.
    ///
    /// Every spec gets this session's id and a target node (the master
    /// node when unset). Master-targeted specs get or create a module
    /// instance; remote-targeted specs get fresh ids and join their
    /// node's partition; lockstep specs additionally join the lockstep
    /// partition. Mappings declared by module name are resolved to ids.
    ///
    /// Returns `false` (with a failure diagnostic) on instantiation
    /// failure or an unresolved mapping; the session is then unusable.
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            warn!(session = %self.label(), "initialize may only run once per session");
            return false;
        }
        self.initialized = true;

        let master = self.ctx.master_node_id.clone();
        for idx in 0..self.processing_modules.len() {
            let mut pm = self.processing_modules[idx].clone();
            pm.session_id = self.id.clone();
            let node_id = pm.node_id.clone().unwrap_or_else(|| master.clone());
            pm.node_id = Some(node_id.clone());

            if node_id == master {
                let module_id = self
                    .ctx
                    .modules
                    .get_module_by_specs(&pm, &self.id)
                    .or_else(|| self.ctx.modules.create_module(&pm));
                let Some(module_id) = module_id else {
                    warn!(
                        session = %self.label(),
                        module = pm.name,
                        "could not instantiate processing module"
                    );
                    return false;
                };
                pm.id = module_id;
                self.local_pms.push(pm.clone());
            } else {
                // Assign an id before the module is started remotely.
                pm.id = Uuid::new_v4().to_string();
                self.remote_pms
                    .entry(node_id.clone())
                    .or_default()
                    .push(pm.clone());
            }

            // Mappings referencing the module by name: when several
            // modules share a name it doesn't matter which instance a
            // mapping binds to, so the first unresolved match wins.
            if let Some(mapping) = self.io_mappings.iter_mut().find(|mapping| {
                mapping.processing_module_id.is_empty()
                    && mapping.processing_module_name == pm.name
            }) {
                mapping.processing_module_id = pm.id.clone();
            }

            if pm.is_lockstep() {
                self.lockstep_pms.entry(node_id).or_default().push(pm.clone());
            }

            self.processing_modules[idx] = pm;
        }

        let unresolved: Vec<&str> = self
            .io_mappings
            .iter()
            .filter(|mapping| mapping.processing_module_id.is_empty())
            .map(|mapping| mapping.processing_module_name.as_str())
            .collect();
        if !unresolved.is_empty() {
            warn!(
                session = %self.label(),
                modules = ?unresolved,
                "io mappings reference unknown processing modules"
            );
            return false;
        }

        if !self.remote_pms.is_empty() {
            self.spawn_started_listener();
        }

        self.ctx
            .modules
            .apply_io_mappings(self.io_mappings.clone(), &self.id);
        true
    }

    /// Start the session: local modules immediately, remote modules
    /// tracked until their start confirmations arrive, and the lockstep
    /// loop when any lockstep modules exist.
    ///
    /// Returns `false` if the session is already running, was stopped
    /// (restart is unsupported; create a new session), failed to
    /// initialize, or has no processing modules.
    pub fn start(&mut self) -> bool {
        if self.status == SessionStatus::Running {
            warn!(session = %self.label(), "can't be started again, already processing");
            return false;
        }
        if self.status == SessionStatus::Stopped {
            warn!(session = %self.label(), "restart of a stopped session is unsupported");
            return false;
        }
        if !self.initialized {
            warn!(session = %self.label(), "session was never initialized");
            return false;
        }
        if self.processing_modules.is_empty() {
            warn!(session = %self.label(), "session has no processing modules to start");
            return false;
        }

        self.status = SessionStatus::Running;

        for pm in &self.local_pms {
            self.ctx.modules.start_module(&pm.id);
        }

        let pending: Vec<ProcessingModuleSpec> =
            self.remote_pms.values().flatten().cloned().collect();
        if !pending.is_empty() {
            *self
                .pending_remote_start
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = pending;
            self.spawn_remote_start_timeout();
        }

        if !self.lockstep_pms.is_empty() {
            self.spawn_lockstep_loop();
        }

        info!(session = %self.label(), "session started");
        true
    }

    /// Stop the session: cancel the lockstep loop and the remote-start
    /// timer, stop local modules, clear the partitions.
    ///
    /// Returns `false` unless the session is currently running. A pass
    /// already dispatched keeps its in-flight requests but publishes
    /// nothing once the cancellation is observed.
    pub fn stop(&mut self) -> bool {
        if self.status != SessionStatus::Running {
            return false;
        }

        self.status = SessionStatus::Stopped;
        self.cancel.cancel();

        for pm in &self.local_pms {
            self.ctx.modules.stop_module(&pm.id);
        }

        self.local_pms.clear();
        self.remote_pms.clear();
        self.lockstep_pms.clear();

        info!(session = %self.label(), "session stopped");
        true
    }

    /// Acknowledge that a remote module started; removes the matching
    /// pending entry (by session id and module id). No-op otherwise.
    pub fn on_processing_module_started(&self, started: &ModuleStarted) {
        remove_pending(&self.pending_remote_start, &self.id, started);
    }

    /// Listen for module-started confirmations for as long as the
    /// session lives.
    fn spawn_started_listener(&self) {
        let mut rx = self.ctx.modules.subscribe_module_started();
        let pending = Arc::clone(&self.pending_remote_start);
        let session_id = self.id.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    started = rx.recv() => match started {
                        Ok(started) => remove_pending(&pending, &session_id, &started),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(session_id, skipped, "module-started listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        });
    }

    /// One-shot check: any spec still unconfirmed when the window closes
    /// is reported in a single start-failure event. No retries.
    fn spawn_remote_start_timeout(&self) {
        let pending = Arc::clone(&self.pending_remote_start);
        let event_tx = self.ctx.event_tx.clone();
        let session_id = self.id.clone();
        let timeout = self.ctx.remote_start_timeout;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(timeout) => {
                    let still_pending = pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone();
                    if !still_pending.is_empty() {
                        warn!(
                            session_id,
                            count = still_pending.len(),
                            "remote processing modules did not confirm start in time"
                        );
                        let _ = event_tx
                            .send(SessionEvent::StartFailure {
                                session_id,
                                pending: still_pending,
                            })
                            .await;
                    }
                }
            }
        });
    }

    fn spawn_lockstep_loop(&self) {
        let loop_ctx = LockstepContext {
            label: self.label(),
            lockstep_pms: self.lockstep_pms.clone(),
            io_mappings: self.io_mappings.clone(),
            topics: Arc::clone(&self.ctx.topics),
            muxes: Arc::clone(&self.ctx.muxes),
            modules: Arc::clone(&self.ctx.modules),
            cancel: self.cancel.clone(),
        };
        tokio::spawn(run_lockstep_loop(loop_ctx));
    }
}

fn remove_pending(
    pending: &Arc<Mutex<Vec<ProcessingModuleSpec>>>,
    session_id: &str,
    started: &ModuleStarted,
) {
    if started.session_id != session_id {
        return;
    }
    let mut list = pending.lock().unwrap_or_else(PoisonError::into_inner);
    let before = list.len();
    list.retain(|pm| pm.id != started.module_id);
    if list.len() != before {
        debug!(
            session_id,
            module_id = started.module_id,
            remaining = list.len(),
            "remote module confirmed start"
        );
    }
}

/// Everything the lockstep loop needs, detached from the session object
/// so the loop runs without locking it.
struct LockstepContext {
    label: String,
    lockstep_pms: HashMap<String, Vec<ProcessingModuleSpec>>,
    io_mappings: Vec<IoMapping>,
    topics: Arc<TopicStore>,
    muxes: Arc<MuxRegistry>,
    modules: Arc<ModuleRegistry>,
    cancel: CancellationToken,
}

/// The synchronized processing loop: pass N+1 starts only after every
/// node's dispatch for pass N has settled.
async fn run_lockstep_loop(ctx: LockstepContext) {
    let mut last_pass = Instant::now();
    loop {
        if ctx.cancel.is_cancelled() {
            debug!(session = %ctx.label, "lockstep loop cancelled");
            break;
        }

        let delta_time_ms = u64::try_from(last_pass.elapsed().as_millis()).unwrap_or(u64::MAX);
        last_pass = Instant::now();

        // Input resolution happens-before dispatch, per node.
        let mut dispatches = Vec::with_capacity(ctx.lockstep_pms.len());
        for (node_id, pms) in &ctx.lockstep_pms {
            let mut request = LockstepProcessingRequest {
                processing_module_ids: Vec::new(),
                records: Vec::new(),
                delta_time_ms,
            };
            for pm in pms {
                request.processing_module_ids.push(pm.id.clone());
                request.records.extend(resolver::resolve_module_inputs(
                    pm,
                    &ctx.io_mappings,
                    &ctx.topics,
                    &ctx.muxes,
                ));
            }

            let node_id = node_id.clone();
            let requested_ids = request.processing_module_ids.clone();
            let modules = Arc::clone(&ctx.modules);
            dispatches.push(async move {
                let outcome = modules.send_lockstep_request(&node_id, request).await;
                (node_id, requested_ids, outcome)
            });
        }

        let results = futures_util::future::join_all(dispatches).await;

        // A stop() issued while the pass was in flight: settle, don't publish.
        if ctx.cancel.is_cancelled() {
            debug!(session = %ctx.label, "session stopped mid-pass, discarding results");
            break;
        }

        for (node_id, requested_ids, outcome) in results {
            match outcome {
                Ok(reply) => {
                    let missing = reply.missing_ids(&requested_ids);
                    if !missing.is_empty() {
                        let labels: Vec<String> = missing
                            .iter()
                            .map(|id| ctx.modules.module_label(id))
                            .collect();
                        warn!(
                            session = %ctx.label,
                            node_id,
                            missing = ?labels,
                            "not all processing modules replied during lockstep pass"
                        );
                    }
                    for record in reply.records {
                        ctx.topics.publish(record);
                    }
                }
                Err(err) => {
                    warn!(
                        session = %ctx.label,
                        node_id,
                        %err,
                        requested = ?requested_ids,
                        "lockstep dispatch failed"
                    );
                }
            }
        }

        // Back-to-back passes; yield so cancellation and other tasks run.
        tokio::task::yield_now().await;
    }
}
