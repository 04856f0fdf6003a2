use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use gauntlet_types::{GauntletError, Result, SessionStatus};

use crate::orchestrator::SessionOrchestrator;

/// Fire-and-forget run scheduler. A run is enqueued as a tokio task owned
/// here, not by any web-request lifetime; callers get an immediate "started"
/// acknowledgment and poll status separately.
///
/// The running-set doubles as the short-lived mutual-exclusion lock that
/// keeps two drivers from double-delivering the same session's bursts.
pub struct RunScheduler {
    orchestrator: Arc<SessionOrchestrator>,
    running: Arc<DashMap<Uuid, ()>>,
}

impl RunScheduler {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            orchestrator,
            running: Arc::new(DashMap::new()),
        }
    }

    /// Enqueue a session run and return immediately. Non-pending sessions
    /// yield a conflict error; a concurrent duplicate trigger for the same
    /// session is a no-op.
    pub async fn spawn_run(&self, session_id: Uuid) -> Result<()> {
        let session = self
            .orchestrator
            .store()
            .get_session(session_id)
            .await?
            .ok_or(GauntletError::SessionNotFound(session_id))?;
        if session.status != SessionStatus::Pending {
            return Err(GauntletError::SessionConflict {
                id: session_id,
                status: session.status,
            });
        }

        match self.running.entry(session_id) {
            Entry::Occupied(_) => {
                tracing::debug!(session_id = %session_id, "run already enqueued");
                return Ok(());
            }
            Entry::Vacant(entry) => {
                entry.insert(());
            }
        }

        let orchestrator = self.orchestrator.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run_session(session_id).await {
                tracing::error!(session_id = %session_id, error = %e, "verification run failed");
            }
            running.remove(&session_id);
        });
        Ok(())
    }

    /// Whether a run task for this session is currently alive.
    pub fn is_running(&self, session_id: Uuid) -> bool {
        self.running.contains_key(&session_id)
    }
}
