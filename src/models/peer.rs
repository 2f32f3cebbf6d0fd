//! Peer model: a remote execution endpoint tracked for liveness.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reachability classification derived from elapsed time since the
/// peer's last confirmed response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    /// Peer responded recently.
    Active,
    /// Peer is degraded; no response past the standby threshold.
    Standby,
    /// Peer is unreachable; no response past the inactive threshold.
    Inactive,
}

impl std::fmt::Display for PeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Standby => write!(f, "standby"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// A connected peer (client or worker node).
///
/// `state` and `last_sign_of_life` are mutated only by the peer's
/// liveness monitor cycle or a successful probe response.
#[derive(Debug, Clone)]
pub struct Peer {
    /// Unique peer identifier, assigned at registration.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Namespace the peer registered under.
    pub namespace: String,
    /// Current reachability classification.
    pub state: PeerState,
    /// Timestamp of the last confirmed response.
    pub last_sign_of_life: Instant,
    /// Registration timestamp.
    pub registered_at: DateTime<Utc>,
}

impl Peer {
    /// Construct a freshly registered peer in the `Active` state.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            namespace: namespace.into(),
            state: PeerState::Active,
            last_sign_of_life: Instant::now(),
            registered_at: Utc::now(),
        }
    }

    /// Record a confirmed response at the current time.
    pub fn mark_sign_of_life(&mut self) {
        self.last_sign_of_life = Instant::now();
    }
}
