//! Session lifecycle management: create, start, stop, remove.
//!
//! The manager owns every session on this master node and is the entry
//! point the service layer calls into. Sessions that fail structural
//! initialization are rejected at creation and never registered.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::models::session::{SessionSpec, SessionStatus};
use crate::orchestrator::session::{Session, SessionContext, SessionEvent};
use crate::{AppError, Result};

/// Registry and lifecycle front-end for all sessions on this node.
pub struct SessionManager {
    ctx: SessionContext,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    /// Construct a manager handing `ctx` to every session it creates.
    #[must_use]
    pub fn new(ctx: SessionContext) -> Self {
        Self {
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session from its spec and initialize it.
    ///
    /// Returns the server-assigned session id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if initialization fails (module
    /// instantiation failure or unresolved I/O mapping); the session is
    /// not registered.
    pub fn create_session(&self, spec: SessionSpec) -> Result<String> {
        let mut session = Session::new(spec, self.ctx.clone());
        if !session.initialize() {
            return Err(AppError::Session(format!(
                "{} failed to initialize",
                session.label()
            )));
        }

        let id = session.id().to_owned();
        info!(session = %session.label(), "session created");
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), session);
        Ok(id)
    }

    /// Start a session by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, or
    /// `AppError::Session` if the session refused to start (already
    /// running, stopped, or empty).
    pub fn start_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("session {session_id} not found")))?;
        if session.start() {
            Ok(())
        } else {
            Err(AppError::Session(format!(
                "{} could not be started",
                session.label()
            )))
        }
    }

    /// Stop a session by id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id, or
    /// `AppError::Session` if the session is not running.
    pub fn stop_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| AppError::NotFound(format!("session {session_id} not found")))?;
        if session.stop() {
            Ok(())
        } else {
            Err(AppError::Session(format!(
                "{} is not running",
                session.label()
            )))
        }
    }

    /// Remove a session, stopping it first when still running.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for an unknown id.
    pub fn remove_session(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(mut session) = sessions.remove(session_id) else {
            return Err(AppError::NotFound(format!("session {session_id} not found")));
        };
        if session.status() == SessionStatus::Running {
            let _ = session.stop();
        }
        debug!(session = %session.label(), "session removed");
        Ok(())
    }

    /// Current status of a session, if registered.
    #[must_use]
    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(Session::status)
    }

    /// Ids of all registered sessions.
    #[must_use]
    pub fn session_ids(&self) -> Vec<String> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Spawn a background task that logs session events.
///
/// Runs until the token fires or the channel closes.
#[must_use]
pub fn spawn_session_event_consumer(
    mut rx: mpsc::Receiver<SessionEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = cancel.cancelled() => {
                    debug!("session event consumer shutting down");
                    break;
                }
                maybe_event = rx.recv() => {
                    if let Some(event) = maybe_event { event } else {
                        debug!("session event channel closed");
                        break;
                    }
                }
            };

            match event {
                SessionEvent::StartFailure {
                    session_id,
                    pending,
                } => {
                    let names: Vec<&str> = pending.iter().map(|pm| pm.name.as_str()).collect();
                    warn!(
                        session_id,
                        modules = ?names,
                        "remote processing modules failed to start"
                    );
                }
            }
        }
    })
}
