//! Shared test helpers for orchestrator-level integration tests.
//!
//! Provides reusable construction of the coordination core (topic store,
//! mux registry, module registry, session context) plus mock node links
//! and peer transports, so individual test modules can focus on
//! behaviour rather than boilerplate.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use interplex::models::lockstep::{LockstepProcessingReply, LockstepProcessingRequest};
use interplex::models::mapping::{InputMapping, IoMapping, TopicSource};
use interplex::models::module::{ModuleInput, ProcessingMode, ProcessingModuleSpec};
use interplex::orchestrator::session::{SessionContext, SessionEvent};
use interplex::runtime::registry::ModuleRegistry;
use interplex::runtime::NodeLink;
use interplex::topics::{MuxRegistry, TopicStore};
use interplex::transport::PeerTransport;
use interplex::Result;

/// Fully wired coordination core for one test.
pub struct TestHarness {
    pub topics: Arc<TopicStore>,
    pub muxes: Arc<MuxRegistry>,
    pub modules: Arc<ModuleRegistry>,
    pub ctx: SessionContext,
    pub event_rx: mpsc::Receiver<SessionEvent>,
}

/// Build a harness with `"master"` as the master node id.
pub fn harness(remote_start_timeout: Duration) -> TestHarness {
    let topics = Arc::new(TopicStore::new());
    let muxes = Arc::new(MuxRegistry::new(Arc::clone(&topics)));
    let modules = Arc::new(ModuleRegistry::new("master"));
    let (event_tx, event_rx) = mpsc::channel(32);
    let ctx = SessionContext {
        master_node_id: "master".into(),
        topics: Arc::clone(&topics),
        muxes: Arc::clone(&muxes),
        modules: Arc::clone(&modules),
        event_tx,
        remote_start_timeout,
    };
    TestHarness {
        topics,
        muxes,
        modules,
        ctx,
        event_rx,
    }
}

/// A free-mode module spec targeting the master node.
pub fn local_pm(name: &str) -> ProcessingModuleSpec {
    ProcessingModuleSpec {
        name: name.into(),
        ..ProcessingModuleSpec::default()
    }
}

/// A lockstep module spec; `node_id = None` targets the master node.
pub fn lockstep_pm(name: &str, node_id: Option<&str>, inputs: &[&str]) -> ProcessingModuleSpec {
    ProcessingModuleSpec {
        name: name.into(),
        node_id: node_id.map(str::to_owned),
        processing_mode: ProcessingMode::Lockstep,
        inputs: inputs
            .iter()
            .map(|input| ModuleInput {
                internal_name: (*input).to_owned(),
                message_format: String::new(),
            })
            .collect(),
        ..ProcessingModuleSpec::default()
    }
}

/// A free-mode module spec targeting a remote node.
pub fn remote_pm(name: &str, node_id: &str) -> ProcessingModuleSpec {
    ProcessingModuleSpec {
        name: name.into(),
        node_id: Some(node_id.to_owned()),
        ..ProcessingModuleSpec::default()
    }
}

/// A name-declared mapping wiring one input to one topic.
pub fn topic_mapping(module_name: &str, input: &str, topic: &str) -> IoMapping {
    IoMapping {
        processing_module_id: String::new(),
        processing_module_name: module_name.into(),
        input_mappings: vec![InputMapping {
            input_name: input.into(),
            topic_source: TopicSource::Topic(topic.into()),
        }],
    }
}

type ReplyFn = dyn Fn(&LockstepProcessingRequest) -> LockstepProcessingReply + Send + Sync;

/// Node link double: records every request and replies via a closure
/// after a configurable round trip.
pub struct MockNodeLink {
    requests: Mutex<Vec<LockstepProcessingRequest>>,
    reply_fn: Box<ReplyFn>,
    round_trip: Duration,
}

impl MockNodeLink {
    pub fn new(
        round_trip: Duration,
        reply_fn: impl Fn(&LockstepProcessingRequest) -> LockstepProcessingReply
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply_fn: Box::new(reply_fn),
            round_trip,
        })
    }

    pub fn requests(&self) -> Vec<LockstepProcessingRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl NodeLink for MockNodeLink {
    fn send_lockstep_request(
        &self,
        request: LockstepProcessingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LockstepProcessingReply>> + Send + '_>> {
        Box::pin(async move {
            tokio::time::sleep(self.round_trip).await;
            self.requests.lock().unwrap().push(request.clone());
            Ok((self.reply_fn)(&request))
        })
    }
}

/// Peer transport double with a switchable probe response.
pub struct MockTransport {
    respond: AtomicBool,
    probes: AtomicUsize,
}

impl MockTransport {
    /// A transport whose probes never get a response.
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            respond: AtomicBool::new(false),
            probes: AtomicUsize::new(0),
        })
    }

    /// A transport whose probes respond immediately.
    pub fn responsive() -> Arc<Self> {
        Arc::new(Self {
            respond: AtomicBool::new(true),
            probes: AtomicUsize::new(0),
        })
    }

    pub fn set_responding(&self, responding: bool) {
        self.respond.store(responding, Ordering::SeqCst);
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

impl PeerTransport for MockTransport {
    fn send(&self, _peer_id: &str, _message: serde_json::Value) {}

    fn probe(&self, _peer_id: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let responding = self.respond.load(Ordering::SeqCst);
        Box::pin(async move {
            if responding {
                Ok(())
            } else {
                std::future::pending::<Result<()>>().await
            }
        })
    }
}
