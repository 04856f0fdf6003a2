use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::challenge::{ChallengeRecord, ChallengeStatus};
use crate::error::{GauntletError, Result};

/// Verification-session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    InProgress,
    Passed,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Passed | SessionStatus::Failed)
    }
}

/// Events that drive session state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Start,
    Pass,
    Fail,
}

impl SessionStatus {
    /// Attempt a state transition given an event.
    /// Terminal states reject every event.
    pub fn transition(self, event: SessionEvent) -> Result<SessionStatus> {
        match (self, event) {
            (SessionStatus::Pending, SessionEvent::Start) => Ok(SessionStatus::InProgress),
            (SessionStatus::InProgress, SessionEvent::Pass) => Ok(SessionStatus::Passed),
            (SessionStatus::InProgress, SessionEvent::Fail) => Ok(SessionStatus::Failed),
            (status, event) => Err(GauntletError::InvalidStateTransition {
                from: status,
                event,
            }),
        }
    }
}

/// One day's scheduled challenges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based day within the verification window.
    pub day: u32,
    pub challenges: Vec<ChallengeRecord>,
}

/// Per-status challenge counts over a whole session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeCounts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
    pub skipped: usize,
}

impl ChallengeCounts {
    /// Challenges actually delivered and answered. Skipped deliveries are
    /// excluded: being unreachable is never scored as a wrong answer.
    pub fn attempted(&self) -> usize {
        self.passed + self.failed
    }

    pub fn pass_rate(&self) -> f64 {
        let attempted = self.attempted();
        if attempted == 0 {
            0.0
        } else {
            self.passed as f64 / attempted as f64
        }
    }
}

/// The mutable verification-session aggregate, owned by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSession {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub agent_username: String,
    pub claimed_model: String,
    pub webhook_url: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    /// 1-based day currently being delivered.
    pub current_day: u32,
    pub daily_challenges: Vec<DayPlan>,
    /// Whether the agent operator has claimed the passed verification.
    pub claimed: bool,
}

impl VerificationSession {
    pub fn new(
        agent_id: Uuid,
        agent_username: impl Into<String>,
        claimed_model: impl Into<String>,
        webhook_url: impl Into<String>,
        daily_challenges: Vec<DayPlan>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            agent_username: agent_username.into(),
            claimed_model: claimed_model.into(),
            webhook_url: webhook_url.into(),
            status: SessionStatus::Pending,
            started_at: Utc::now(),
            completed_at: None,
            failure_reason: None,
            current_day: 1,
            daily_challenges,
            claimed: false,
        }
    }

    /// Apply a state transition event. `completed_at` is set exactly once,
    /// at the terminal transition.
    pub fn apply_event(&mut self, event: SessionEvent) -> Result<()> {
        self.status = self.status.transition(event)?;
        if self.status.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = &ChallengeRecord> {
        self.daily_challenges.iter().flat_map(|d| &d.challenges)
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut ChallengeRecord> {
        self.daily_challenges
            .iter_mut()
            .flat_map(|d| &mut d.challenges)
    }

    pub fn counts(&self) -> ChallengeCounts {
        let mut counts = ChallengeCounts::default();
        for record in self.records() {
            counts.total += 1;
            match record.status {
                ChallengeStatus::Pending => counts.pending += 1,
                ChallengeStatus::Passed => counts.passed += 1,
                ChallengeStatus::Failed => counts.failed += 1,
                ChallengeStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }

    /// Earliest delivery time among still-pending challenges.
    pub fn next_scheduled(&self) -> Option<DateTime<Utc>> {
        self.records()
            .filter(|r| r.status == ChallengeStatus::Pending)
            .map(|r| r.scheduled_for)
            .min()
    }

    pub fn total_challenges(&self) -> usize {
        self.records().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::challenge::{
        ChallengeCategory, ChallengeKind, DataValue, GeneratedChallenge, GroundTruth,
    };
    use std::collections::BTreeMap;

    fn make_challenge(id: &str) -> GeneratedChallenge {
        GeneratedChallenge {
            id: id.to_string(),
            category: ChallengeCategory::Reasoning,
            kind: ChallengeKind::ArithmeticWordProblem,
            prompt: "What is 2 + 2?".into(),
            extraction_schema: vec!["answer".into()],
            data_value: DataValue::Medium,
            use_case: vec!["verification".into()],
            ground_truth: GroundTruth::Numeric { answer: 4 },
            template_id: "arith_v1".into(),
            variables: BTreeMap::new(),
            generated_at: Utc::now(),
        }
    }

    fn make_session(statuses: &[ChallengeStatus]) -> VerificationSession {
        let challenges = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut record =
                    ChallengeRecord::new(make_challenge(&format!("reas-{i}")), Utc::now(), 1, 3);
                record.status = *status;
                record
            })
            .collect();
        VerificationSession::new(
            Uuid::new_v4(),
            "agent-x",
            "claude-sonnet",
            "https://example.com/hook",
            vec![DayPlan {
                day: 1,
                challenges,
            }],
        )
    }

    #[test]
    fn test_valid_lifecycle() {
        let mut session = make_session(&[]);
        assert_eq!(session.status, SessionStatus::Pending);
        session.apply_event(SessionEvent::Start).unwrap();
        assert_eq!(session.status, SessionStatus::InProgress);
        session.apply_event(SessionEvent::Pass).unwrap();
        assert_eq!(session.status, SessionStatus::Passed);
        assert!(session.completed_at.is_some());
    }

    #[test]
    fn test_terminal_states_reject_events() {
        let mut session = make_session(&[]);
        session.apply_event(SessionEvent::Start).unwrap();
        session.apply_event(SessionEvent::Fail).unwrap();
        let completed = session.completed_at;
        assert!(session.apply_event(SessionEvent::Start).is_err());
        assert!(session.apply_event(SessionEvent::Pass).is_err());
        // completed_at was set exactly once
        assert_eq!(session.completed_at, completed);
    }

    #[test]
    fn test_cannot_pass_from_pending() {
        let mut session = make_session(&[]);
        assert!(session.apply_event(SessionEvent::Pass).is_err());
    }

    #[test]
    fn test_counts_exclude_skipped_from_attempted() {
        use ChallengeStatus::*;
        let session = make_session(&[
            Passed, Passed, Passed, Passed, Failed, Failed, Skipped, Skipped, Skipped, Skipped,
        ]);
        let counts = session.counts();
        assert_eq!(counts.total, 10);
        assert_eq!(counts.attempted(), 6);
        assert!((counts.pass_rate() - 4.0 / 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pass_rate_zero_when_nothing_attempted() {
        let session = make_session(&[ChallengeStatus::Skipped, ChallengeStatus::Pending]);
        assert_eq!(session.counts().pass_rate(), 0.0);
    }
}
