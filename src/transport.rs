//! Peer transport seam consumed by the liveness monitor.

use std::future::Future;
use std::pin::Pin;

use crate::Result;

/// Call-level contract of the wire transport owning a peer's connection.
///
/// Implementations live outside the coordination layer; the monitor only
/// needs fire-and-forget delivery and a probe whose future resolves when
/// (and only if) the peer responds.
pub trait PeerTransport: Send + Sync {
    /// Deliver a message to the peer. Fire-and-forget.
    fn send(&self, peer_id: &str, message: serde_json::Value);

    /// Probe the peer. The returned future resolves `Ok(())` when the
    /// response arrives, at most once per call; a peer that never
    /// responds leaves the future pending. Non-response is not an error
    /// here, it is exactly what drives liveness degradation.
    fn probe(&self, peer_id: &str) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
