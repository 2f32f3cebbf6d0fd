//! Per-node dispatch seam for lockstep processing requests.

use std::future::Future;
use std::pin::Pin;

use crate::models::lockstep::{LockstepProcessingReply, LockstepProcessingRequest};
use crate::Result;

/// Transport-agnostic link to one remote node's module runtime.
///
/// Implementations carry the wire protocol (out of scope here); the
/// registry routes each lockstep request to the link registered for the
/// target node. A dispatch has no timeout of its own; a node that never
/// replies stalls only the requesting session's pass.
pub trait NodeLink: Send + Sync {
    /// Send one aggregated lockstep request and await the node's reply.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if the
    /// request cannot be delivered.
    fn send_lockstep_request(
        &self,
        request: LockstepProcessingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<LockstepProcessingReply>> + Send + '_>>;
}
