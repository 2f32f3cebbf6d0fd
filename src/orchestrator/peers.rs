//! Peer registry: the liveness-owning container for connected peers.
//!
//! Registration wraps each peer in shared state and starts its
//! [`LivenessMonitor`]; deactivation cancels the monitor *first*, then
//! drops the peer, so no cycle keeps running against a released target.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::LivenessConfig;
use crate::models::peer::{Peer, PeerState};
use crate::orchestrator::liveness::{LivenessEvent, LivenessHandle, LivenessMonitor};
use crate::transport::PeerTransport;
use crate::{AppError, Result};

struct PeerEntry {
    peer: Arc<RwLock<Peer>>,
    monitor: LivenessHandle,
}

/// Registry of connected peers and their liveness monitors.
pub struct PeerRegistry {
    transport: Arc<dyn PeerTransport>,
    config: LivenessConfig,
    event_tx: mpsc::Sender<LivenessEvent>,
    entries: Mutex<HashMap<String, PeerEntry>>,
}

impl PeerRegistry {
    /// Construct a registry monitoring peers over `transport`.
    #[must_use]
    pub fn new(
        transport: Arc<dyn PeerTransport>,
        config: LivenessConfig,
        event_tx: mpsc::Sender<LivenessEvent>,
    ) -> Self {
        Self {
            transport,
            config,
            event_tx,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a peer and start monitoring it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Peer` if a peer with the same id is already
    /// registered.
    pub fn register(&self, peer: Peer) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&peer.id) {
            return Err(AppError::Peer(format!("peer {} is already registered", peer.id)));
        }

        let peer_id = peer.id.clone();
        info!(peer_id, name = peer.name, "peer registered");

        let shared = Arc::new(RwLock::new(peer));
        let monitor = LivenessMonitor::new(
            Arc::clone(&shared),
            Arc::clone(&self.transport),
            self.config.clone(),
            self.event_tx.clone(),
            CancellationToken::new(),
        )
        .spawn();

        entries.insert(
            peer_id,
            PeerEntry {
                peer: shared,
                monitor,
            },
        );
        Ok(())
    }

    /// Deactivate a peer: cancel its monitoring cycle, then drop it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no peer with that id exists.
    pub fn deactivate(&self, peer_id: &str) -> Result<()> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.remove(peer_id)
        };
        let Some(entry) = entry else {
            return Err(AppError::NotFound(format!("peer {peer_id} not registered")));
        };
        entry.monitor.stop();
        info!(peer_id, "peer deactivated");
        Ok(())
    }

    /// Record a confirmed response from a peer outside the probe path
    /// (any message counts as a sign of life). Unknown ids are ignored.
    pub fn mark_sign_of_life(&self, peer_id: &str) {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = entries.get(peer_id) {
            entry
                .peer
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .mark_sign_of_life();
        }
    }

    /// Current classification of a peer, if registered.
    #[must_use]
    pub fn state(&self, peer_id: &str) -> Option<PeerState> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(peer_id).map(|entry| {
            entry
                .peer
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .state
        })
    }

    /// Ids of all registered peers.
    #[must_use]
    pub fn peer_ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}
