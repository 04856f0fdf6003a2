use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use uuid::Uuid;

use gauntlet_types::{
    AgentVerificationStats, ChallengeResponse, GauntletError, ModelDetection, ModelFamily,
    SpotCheckRecord, VerificationSession,
};

use crate::traits::{CreateOutcome, VerificationStore};

/// In-memory store implementation (default).
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    sessions: Arc<DashMap<Uuid, VerificationSession>>,
    /// Uniqueness guard: agent id -> its one non-terminal session.
    active_by_agent: Arc<DashMap<Uuid, Uuid>>,
    responses: Arc<RwLock<Vec<ChallengeResponse>>>,
    detections: Arc<RwLock<Vec<ModelDetection>>>,
    spot_checks: Arc<RwLock<Vec<SpotCheckRecord>>>,
    stats: Arc<DashMap<Uuid, AgentVerificationStats>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VerificationStore for InMemoryStore {
    async fn create_session(
        &self,
        session: VerificationSession,
    ) -> Result<CreateOutcome, GauntletError> {
        match self.active_by_agent.entry(session.agent_id) {
            Entry::Occupied(mut entry) => {
                let existing_id = *entry.get();
                let existing = self
                    .sessions
                    .get(&existing_id)
                    .map(|s| s.clone())
                    .filter(|s| !s.status.is_terminal());
                if let Some(existing) = existing {
                    tracing::info!(
                        agent_id = %session.agent_id,
                        session_id = %existing_id,
                        "duplicate session creation resolved as no-op"
                    );
                    return Ok(CreateOutcome::AlreadyActive(existing));
                }
                // Stale guard from a terminal or vanished session.
                entry.insert(session.id);
            }
            Entry::Vacant(entry) => {
                entry.insert(session.id);
            }
        }
        self.sessions.insert(session.id, session);
        Ok(CreateOutcome::Created)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<VerificationSession>, GauntletError> {
        Ok(self.sessions.get(&id).map(|s| s.clone()))
    }

    async fn put_session(&self, session: VerificationSession) -> Result<(), GauntletError> {
        if session.status.is_terminal() {
            self.active_by_agent
                .remove_if(&session.agent_id, |_, active| *active == session.id);
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    async fn session_for_agent(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<VerificationSession>, GauntletError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| s.agent_id == agent_id)
            .max_by_key(|s| s.started_at)
            .map(|s| s.clone()))
    }

    async fn all_sessions(&self) -> Result<Vec<VerificationSession>, GauntletError> {
        Ok(self.sessions.iter().map(|s| s.clone()).collect())
    }

    async fn append_response(&self, response: ChallengeResponse) -> Result<(), GauntletError> {
        self.responses.write().await.push(response);
        Ok(())
    }

    async fn responses_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<ChallengeResponse>, GauntletError> {
        let responses = self.responses.read().await;
        Ok(responses
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn append_detection(&self, detection: ModelDetection) -> Result<(), GauntletError> {
        self.detections.write().await.push(detection);
        Ok(())
    }

    async fn latest_detection(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<ModelDetection>, GauntletError> {
        let detections = self.detections.read().await;
        Ok(detections
            .iter()
            .filter(|d| d.agent_id == agent_id)
            .max_by_key(|d| d.timestamp)
            .cloned())
    }

    async fn model_mismatches(&self) -> Result<Vec<ModelDetection>, GauntletError> {
        let detections = self.detections.read().await;
        Ok(detections.iter().filter(|d| !d.matches).cloned().collect())
    }

    async fn all_detections(&self) -> Result<Vec<ModelDetection>, GauntletError> {
        Ok(self.detections.read().await.clone())
    }

    async fn append_spot_check(&self, record: SpotCheckRecord) -> Result<(), GauntletError> {
        self.spot_checks.write().await.push(record);
        Ok(())
    }

    async fn spot_checks_since(
        &self,
        agent_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SpotCheckRecord>, GauntletError> {
        let spot_checks = self.spot_checks.read().await;
        let mut matching: Vec<SpotCheckRecord> = spot_checks
            .iter()
            .filter(|r| r.agent_id == agent_id && r.timestamp >= cutoff)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(matching)
    }

    async fn all_spot_checks(&self) -> Result<Vec<SpotCheckRecord>, GauntletError> {
        Ok(self.spot_checks.read().await.clone())
    }

    async fn stats(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<AgentVerificationStats>, GauntletError> {
        Ok(self.stats.get(&agent_id).map(|s| s.clone()))
    }

    async fn record_spot_check(
        &self,
        agent_id: Uuid,
        passed: bool,
    ) -> Result<AgentVerificationStats, GauntletError> {
        let mut entry = self
            .stats
            .entry(agent_id)
            .or_insert_with(|| AgentVerificationStats::new(agent_id));
        entry.record_spot_check(passed);
        Ok(entry.clone())
    }

    async fn mark_verified(
        &self,
        agent_id: Uuid,
        detected_model: Option<ModelFamily>,
    ) -> Result<(), GauntletError> {
        let mut entry = self
            .stats
            .entry(agent_id)
            .or_insert_with(|| AgentVerificationStats::new(agent_id));
        entry.mark_verified(detected_model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gauntlet_types::{ModelFamily, SessionEvent};

    fn make_session(agent_id: Uuid) -> VerificationSession {
        VerificationSession::new(
            agent_id,
            "agent-x",
            "claude-sonnet",
            "https://example.com/hook",
            vec![],
        )
    }

    fn make_detection(agent_id: Uuid, matches: bool) -> ModelDetection {
        ModelDetection {
            agent_id,
            session_id: None,
            timestamp: Utc::now(),
            claimed_model: "gpt-4o".into(),
            detected_model: if matches {
                ModelFamily::Gpt
            } else {
                ModelFamily::Claude
            },
            confidence: 0.8,
            matches,
            all_scores: vec![],
            indicators: vec![],
            responses_analyzed: 5,
        }
    }

    #[tokio::test]
    async fn test_duplicate_creation_is_noop() {
        let store = InMemoryStore::new();
        let agent_id = Uuid::new_v4();

        let first = make_session(agent_id);
        let first_id = first.id;
        assert!(matches!(
            store.create_session(first).await.unwrap(),
            CreateOutcome::Created
        ));

        match store.create_session(make_session(agent_id)).await.unwrap() {
            CreateOutcome::AlreadyActive(existing) => assert_eq!(existing.id, first_id),
            CreateOutcome::Created => panic!("second creation should be a no-op"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_creation_yields_exactly_one_session() {
        let store = Arc::new(InMemoryStore::new());
        let agent_id = Uuid::new_v4();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_session(make_session(agent_id)).await.unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), CreateOutcome::Created) {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_terminal_session_frees_agent_for_new_one() {
        let store = InMemoryStore::new();
        let agent_id = Uuid::new_v4();

        let mut session = make_session(agent_id);
        store.create_session(session.clone()).await.unwrap();

        session.apply_event(SessionEvent::Start).unwrap();
        session.apply_event(SessionEvent::Fail).unwrap();
        store.put_session(session).await.unwrap();

        assert!(matches!(
            store.create_session(make_session(agent_id)).await.unwrap(),
            CreateOutcome::Created
        ));
    }

    #[tokio::test]
    async fn test_latest_detection_none_when_absent() {
        let store = InMemoryStore::new();
        assert!(
            store
                .latest_detection(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_mismatch_query_filters_matches() {
        let store = InMemoryStore::new();
        let agent_a = Uuid::new_v4();
        let agent_b = Uuid::new_v4();
        store
            .append_detection(make_detection(agent_a, true))
            .await
            .unwrap();
        store
            .append_detection(make_detection(agent_b, false))
            .await
            .unwrap();

        let mismatches = store.model_mismatches().await.unwrap();
        assert_eq!(mismatches.len(), 1);
        assert_eq!(mismatches[0].agent_id, agent_b);
    }

    #[tokio::test]
    async fn test_spot_check_window_excludes_old_records() {
        let store = InMemoryStore::new();
        let agent_id = Uuid::new_v4();

        let old = SpotCheckRecord {
            agent_id,
            timestamp: Utc::now() - Duration::days(45),
            passed: false,
            skipped: false,
            response_time_ms: Some(900),
            error: None,
            response: Some("stale".into()),
        };
        let recent = SpotCheckRecord {
            agent_id,
            timestamp: Utc::now(),
            passed: true,
            skipped: false,
            response_time_ms: Some(400),
            error: None,
            response: Some("fresh".into()),
        };
        store.append_spot_check(old).await.unwrap();
        store.append_spot_check(recent).await.unwrap();

        let cutoff = Utc::now() - Duration::days(30);
        let in_window = store.spot_checks_since(agent_id, cutoff).await.unwrap();
        assert_eq!(in_window.len(), 1);
        assert!(in_window[0].passed);
    }

    #[tokio::test]
    async fn test_record_spot_check_accumulates() {
        let store = InMemoryStore::new();
        let agent_id = Uuid::new_v4();

        for _ in 0..5 {
            store.record_spot_check(agent_id, true).await.unwrap();
        }
        let stats = store.record_spot_check(agent_id, false).await.unwrap();
        assert_eq!(stats.spot_checks_passed, 5);
        assert_eq!(stats.spot_checks_failed, 1);
        assert!((stats.spot_check_failure_rate - 1.0 / 6.0).abs() < 1e-9);
    }
}
