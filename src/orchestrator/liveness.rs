//! Per-peer liveness monitoring.
//!
//! Each registered peer gets a [`LivenessMonitor`] task that classifies
//! reachability purely from elapsed wall-clock time since the peer's
//! last confirmed response, probing over the peer transport whenever the
//! elapsed time exceeds the ping interval. Probing cadence is constant;
//! there is no retry backoff and no queuing of unanswered probes. A
//! successful probe resets the sign of life, pulling the peer back to
//! `Active` on the next cycle without any reconnection protocol.
//!
//! State-change events are delivered via a `tokio::sync::mpsc` channel,
//! at most once per classification change.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::LivenessConfig;
use crate::models::peer::{Peer, PeerState};
use crate::transport::PeerTransport;

/// Events emitted by liveness monitors.
#[derive(Debug, Clone)]
pub enum LivenessEvent {
    /// A peer's classification changed.
    StateChanged {
        /// Peer whose classification changed.
        peer_id: String,
        /// Classification before the change.
        previous: PeerState,
        /// Classification after the change.
        current: PeerState,
    },
}

/// Classify reachability from elapsed time since the last sign of life.
#[must_use]
pub fn classify(elapsed: Duration, config: &LivenessConfig) -> PeerState {
    if elapsed <= config.standby_threshold() {
        PeerState::Active
    } else if elapsed <= config.inactive_threshold() {
        PeerState::Standby
    } else {
        PeerState::Inactive
    }
}

/// Builder for one peer's monitoring task.
///
/// Call [`spawn`](Self::spawn) to start the periodic classification cycle.
pub struct LivenessMonitor {
    peer: Arc<RwLock<Peer>>,
    transport: Arc<dyn PeerTransport>,
    config: LivenessConfig,
    event_tx: mpsc::Sender<LivenessEvent>,
    cancel: CancellationToken,
}

impl LivenessMonitor {
    /// Construct a monitor (does not start the cycle yet).
    #[must_use]
    pub fn new(
        peer: Arc<RwLock<Peer>>,
        transport: Arc<dyn PeerTransport>,
        config: LivenessConfig,
        event_tx: mpsc::Sender<LivenessEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            peer,
            transport,
            config,
            event_tx,
            cancel,
        }
    }

    /// Spawn the monitoring task and return a handle for stopping it.
    ///
    /// Stop the handle before releasing the peer, or the cycle keeps
    /// operating on a target nobody owns anymore.
    #[must_use]
    pub fn spawn(self) -> LivenessHandle {
        let peer_id = {
            self.peer
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .id
                .clone()
        };
        let cancel_for_handle = self.cancel.clone();

        let task_handle = tokio::spawn(Self::run(
            self.peer,
            self.transport,
            self.config,
            self.event_tx,
            self.cancel,
        ));

        LivenessHandle {
            peer_id,
            cancel: cancel_for_handle,
            join_handle: Some(task_handle),
        }
    }

    /// Core monitoring cycle.
    async fn run(
        peer: Arc<RwLock<Peer>>,
        transport: Arc<dyn PeerTransport>,
        config: LivenessConfig,
        event_tx: mpsc::Sender<LivenessEvent>,
        cancel: CancellationToken,
    ) {
        {
            peer.write()
                .unwrap_or_else(PoisonError::into_inner)
                .mark_sign_of_life();
        }
        Self::issue_probe(&peer, &transport, &cancel);

        let mut ticker = tokio::time::interval(config.check_period());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("liveness monitor cancelled");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let (peer_id, elapsed, previous) = {
                let guard = peer.read().unwrap_or_else(PoisonError::into_inner);
                (guard.id.clone(), guard.last_sign_of_life.elapsed(), guard.state)
            };

            let current = classify(elapsed, &config);
            if current != previous {
                {
                    peer.write().unwrap_or_else(PoisonError::into_inner).state = current;
                }
                let _ = event_tx
                    .send(LivenessEvent::StateChanged {
                        peer_id,
                        previous,
                        current,
                    })
                    .await;
            }

            if elapsed > config.ping_interval() {
                Self::issue_probe(&peer, &transport, &cancel);
            }
        }
    }

    /// Fire one probe. The response, if it ever arrives, resets the
    /// peer's sign of life; non-response simply leaves the elapsed time
    /// growing. The probe task dies with the monitor's token.
    fn issue_probe(
        peer: &Arc<RwLock<Peer>>,
        transport: &Arc<dyn PeerTransport>,
        cancel: &CancellationToken,
    ) {
        let peer = Arc::clone(peer);
        let transport = Arc::clone(transport);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let peer_id = {
                peer.read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .id
                    .clone()
            };
            tokio::select! {
                () = cancel.cancelled() => {}
                response = transport.probe(&peer_id) => {
                    if response.is_ok() {
                        peer.write()
                            .unwrap_or_else(PoisonError::into_inner)
                            .mark_sign_of_life();
                    }
                }
            }
        });
    }
}

/// Handle returned from [`LivenessMonitor::spawn`].
pub struct LivenessHandle {
    peer_id: String,
    cancel: CancellationToken,
    join_handle: Option<JoinHandle<()>>,
}

impl Drop for LivenessHandle {
    /// Cancel the monitoring task when the handle is dropped.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl LivenessHandle {
    /// Cancel the monitoring cycle. Must be called before releasing all
    /// references to the peer.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The peer this handle monitors.
    #[must_use]
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }

    /// Signal the task to stop, then wait for it to exit.
    pub async fn await_completion(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }
}

/// Spawn a background task that logs liveness transitions.
///
/// Runs until the token fires or the channel closes.
#[must_use]
pub fn spawn_liveness_event_consumer(
    mut rx: mpsc::Receiver<LivenessEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("liveness event consumer shutting down");
                    break;
                }
                maybe_event = rx.recv() => {
                    if let Some(event) = maybe_event { event } else {
                        debug!("liveness event channel closed");
                        break;
                    }
                }
            };

            match event {
                LivenessEvent::StateChanged {
                    peer_id,
                    previous,
                    current,
                } => {
                    if current == PeerState::Inactive {
                        warn!(peer_id, %previous, %current, "peer is unreachable");
                    } else {
                        info!(peer_id, %previous, %current, "peer state changed");
                    }
                }
            }
        }
    })
}
