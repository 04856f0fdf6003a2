use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gauntlet_types::{
    AgentVerificationStats, ChallengeResponse, GauntletError, ModelDetection, ModelFamily,
    SpotCheckRecord, VerificationSession,
};

/// Result of a session-creation attempt. Duplicate creation under the
/// agent-keyed uniqueness constraint is a no-op, not an error, so concurrent
/// triggers (duplicate cron invocations) converge on one session.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    Created,
    AlreadyActive(VerificationSession),
}

/// Verification record store. All mutation is keyed by session or agent id;
/// cross-agent operations never contend. Only store unavailability
/// propagates as an error.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Create a session unless the agent already has a non-terminal one.
    async fn create_session(
        &self,
        session: VerificationSession,
    ) -> Result<CreateOutcome, GauntletError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<VerificationSession>, GauntletError>;

    async fn put_session(&self, session: VerificationSession) -> Result<(), GauntletError>;

    /// The agent's most recently started session, if any.
    async fn session_for_agent(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<VerificationSession>, GauntletError>;

    async fn all_sessions(&self) -> Result<Vec<VerificationSession>, GauntletError>;

    async fn append_response(&self, response: ChallengeResponse) -> Result<(), GauntletError>;

    async fn responses_for_session(
        &self,
        session_id: Uuid,
    ) -> Result<Vec<ChallengeResponse>, GauntletError>;

    async fn append_detection(&self, detection: ModelDetection) -> Result<(), GauntletError>;

    /// Most recent detection for an agent; None when no detection exists.
    async fn latest_detection(
        &self,
        agent_id: Uuid,
    ) -> Result<Option<ModelDetection>, GauntletError>;

    /// Detections where the detected family contradicts the claimed one.
    async fn model_mismatches(&self) -> Result<Vec<ModelDetection>, GauntletError>;

    async fn all_detections(&self) -> Result<Vec<ModelDetection>, GauntletError>;

    async fn append_spot_check(&self, record: SpotCheckRecord) -> Result<(), GauntletError>;

    /// Spot checks for an agent at or after `cutoff`, newest first.
    async fn spot_checks_since(
        &self,
        agent_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SpotCheckRecord>, GauntletError>;

    async fn all_spot_checks(&self) -> Result<Vec<SpotCheckRecord>, GauntletError>;

    async fn stats(&self, agent_id: Uuid)
    -> Result<Option<AgentVerificationStats>, GauntletError>;

    /// Atomically accumulate a spot-check outcome into the agent's stats.
    async fn record_spot_check(
        &self,
        agent_id: Uuid,
        passed: bool,
    ) -> Result<AgentVerificationStats, GauntletError>;

    /// Mark the agent verified after a passed session.
    async fn mark_verified(
        &self,
        agent_id: Uuid,
        detected_model: Option<ModelFamily>,
    ) -> Result<(), GauntletError>;
}
