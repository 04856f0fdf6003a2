use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use gauntlet_challenge::ChallengeGenerator;
use gauntlet_delivery::{BurstMetadata, ProbeFailure, WebhookTransport, deliver, probe};
use gauntlet_store::{CreateOutcome, VerificationStore};
use gauntlet_types::{
    ChallengeCounts, ChallengeResponse, ChallengeStatus, GauntletError, ModelFamily, Result,
    SessionEvent, SessionStatus, VerificationSession,
};

use crate::config::GauntletConfig;
use crate::plan::build_plan;
use crate::verdict::{Verdict, evaluate};

/// Deadline for the pre-session connectivity probe. Deliberately tighter
/// than the challenge deadline: a ping needs no thinking time.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Projection returned on session creation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStart {
    pub session_id: Uuid,
    pub verification_period_days: u32,
    pub total_challenges: usize,
    pub instructions: Vec<String>,
    pub webhook_format: serde_json::Value,
}

/// Result of a creation request.
#[derive(Debug, Clone)]
pub enum StartOutcome {
    Started(SessionStart),
    /// The agent passed verification earlier; nothing to do.
    AlreadyVerified,
    /// A non-terminal session already exists; the duplicate create was a no-op.
    AlreadyActive(SessionStart),
}

/// Read-only session projection for status queries. Partial progress is
/// always visible, including mid-run.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusView {
    pub session_id: Uuid,
    pub agent_id: Uuid,
    pub agent_username: String,
    pub status: SessionStatus,
    pub current_day: u32,
    pub verification_period_days: u32,
    pub challenges: ChallengeCounts,
    pub next_burst_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_url: Option<String>,
}

/// Owns the verification-session state machine. Holds no global mutable
/// state of its own: everything lives in the injected store, so multiple
/// orchestrator instances can safely share one store.
pub struct SessionOrchestrator {
    store: Arc<dyn VerificationStore>,
    transport: Arc<dyn WebhookTransport>,
    config: GauntletConfig,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        transport: Arc<dyn WebhookTransport>,
        config: GauntletConfig,
    ) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn VerificationStore> {
        &self.store
    }

    pub fn config(&self) -> &GauntletConfig {
        &self.config
    }

    /// Create a verification session: validate and probe the webhook, build
    /// the multi-day plan, and persist it as `pending`.
    pub async fn start_session(
        &self,
        agent_id: Uuid,
        agent_username: &str,
        claimed_model: &str,
        webhook_url: &str,
    ) -> Result<StartOutcome> {
        let parsed = url::Url::parse(webhook_url)
            .map_err(|e| GauntletError::InvalidWebhookUrl(e.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(GauntletError::InvalidWebhookUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        if let Some(stats) = self.store.stats(agent_id).await? {
            if stats.verification_passed {
                return Ok(StartOutcome::AlreadyVerified);
            }
        }

        probe(self.transport.as_ref(), webhook_url, PROBE_TIMEOUT)
            .await
            .map_err(|failure| match failure {
                ProbeFailure::Unreachable(reason) => GauntletError::WebhookUnreachable(reason),
                ProbeFailure::Rejected(status) => GauntletError::WebhookRejected(status),
            })?;

        // ThreadRng is !Send; keep it out of scope before the next await.
        let plan = {
            let mut generator = ChallengeGenerator::new();
            let mut sched_rng = rand::thread_rng();
            build_plan(&self.config, Utc::now(), &mut generator, &mut sched_rng)
        };
        let session =
            VerificationSession::new(agent_id, agent_username, claimed_model, webhook_url, plan);

        match self.store.create_session(session.clone()).await? {
            CreateOutcome::Created => {
                tracing::info!(
                    session_id = %session.id,
                    agent_id = %agent_id,
                    total = session.total_challenges(),
                    "verification session created"
                );
                Ok(StartOutcome::Started(self.session_start(&session)))
            }
            CreateOutcome::AlreadyActive(existing) => {
                Ok(StartOutcome::AlreadyActive(self.session_start(&existing)))
            }
        }
    }

    fn session_start(&self, session: &VerificationSession) -> SessionStart {
        let deadline = self.config.respond_within_seconds;
        SessionStart {
            session_id: session.id,
            verification_period_days: self.config.verification_days,
            total_challenges: session.total_challenges(),
            instructions: vec![
                format!(
                    "Keep your webhook reachable for the next {} days.",
                    self.config.verification_days
                ),
                format!(
                    "Challenges arrive in bursts of up to {}; each must be answered within {} seconds.",
                    self.config.burst_size, deadline
                ),
                "Reply HTTP 200 with a JSON body of the form {\"response\": \"<your answer>\"}."
                    .to_string(),
                format!(
                    "Unreachable deliveries are skipped, not failed; answered challenges must pass at a {:.0}% rate.",
                    self.config.pass_threshold * 100.0
                ),
            ],
            webhook_format: serde_json::json!({
                "type": "verification_challenge",
                "challenge_id": "<string>",
                "prompt": "<string>",
                "respond_within_seconds": deadline,
                "metadata": {"burst_index": 1, "burst_size": self.config.burst_size},
            }),
        }
    }

    /// Run a session's delivery loop to its terminal verdict. Returns a
    /// conflict error without re-executing when the session is not pending.
    pub async fn run_session(&self, session_id: Uuid) -> Result<()> {
        let mut session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(GauntletError::SessionNotFound(session_id))?;

        if session.status != SessionStatus::Pending {
            return Err(GauntletError::SessionConflict {
                id: session_id,
                status: session.status,
            });
        }

        session.apply_event(SessionEvent::Start)?;
        self.store.put_session(session.clone()).await?;
        tracing::info!(session_id = %session_id, "verification run started");

        let bursts = burst_schedule(&session);
        let mut early_failure: Option<String> = None;

        for (day_index, scheduled_for) in bursts {
            if let Verdict::Failed(reason) = evaluate(&session.counts(), &self.config) {
                tracing::info!(session_id = %session_id, %reason, "failing fast");
                early_failure = Some(reason);
                break;
            }

            session.current_day = day_index as u32 + 1;
            wait_until(scheduled_for).await;
            self.dispatch_burst(&mut session, day_index, scheduled_for)
                .await?;

            // Outcomes land in the store before the next burst's due-check.
            self.store.put_session(session.clone()).await?;
        }

        let counts = session.counts();
        let verdict = match early_failure {
            Some(reason) => Verdict::Failed(reason),
            None => evaluate(&counts, &self.config),
        };
        match verdict {
            Verdict::Passed => {
                session.apply_event(SessionEvent::Pass)?;
                tracing::info!(
                    session_id = %session_id,
                    passed = counts.passed,
                    attempted = counts.attempted(),
                    "verification passed"
                );
            }
            Verdict::Failed(reason) => {
                tracing::info!(session_id = %session_id, %reason, "verification failed");
                session.failure_reason = Some(reason);
                session.apply_event(SessionEvent::Fail)?;
            }
            Verdict::Undecided => {
                session.failure_reason =
                    Some("verification window elapsed without resolution".to_string());
                session.apply_event(SessionEvent::Fail)?;
            }
        }
        self.store.put_session(session.clone()).await?;

        self.record_detection(&session).await?;
        Ok(())
    }

    async fn dispatch_burst(
        &self,
        session: &mut VerificationSession,
        day_index: usize,
        scheduled_for: DateTime<Utc>,
    ) -> Result<()> {
        let batch: Vec<_> = session.daily_challenges[day_index]
            .challenges
            .iter()
            .filter(|r| r.scheduled_for == scheduled_for && r.status == ChallengeStatus::Pending)
            .map(|r| {
                (
                    r.challenge.clone(),
                    BurstMetadata {
                        burst_index: r.burst_index,
                        burst_size: r.burst_size,
                    },
                )
            })
            .collect();
        if batch.is_empty() {
            return Ok(());
        }

        tracing::info!(
            session_id = %session.id,
            day = day_index + 1,
            burst_size = batch.len(),
            "dispatching burst"
        );

        let sent_at = Utc::now();
        let deadline = self.config.respond_within();
        let mut join_set = JoinSet::new();
        for (challenge, metadata) in batch {
            let transport = self.transport.clone();
            let webhook_url = session.webhook_url.clone();
            join_set.spawn(async move {
                let outcome =
                    deliver(transport.as_ref(), &webhook_url, &challenge, metadata, deadline).await;
                (challenge.id, outcome)
            });
        }

        let mut outcomes = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((challenge_id, outcome)) => {
                    outcomes.insert(challenge_id, outcome);
                }
                Err(e) => tracing::error!(session_id = %session.id, error = %e, "delivery task died"),
            }
        }

        let session_id = session.id;
        let agent_id = session.agent_id;
        for record in session.daily_challenges[day_index].challenges.iter_mut() {
            if record.scheduled_for != scheduled_for || record.status != ChallengeStatus::Pending {
                continue;
            }
            record.sent_at = Some(sent_at);
            let Some(outcome) = outcomes.get(&record.challenge.id) else {
                record.status = ChallengeStatus::Skipped;
                record.failure_reason = Some("delivery task died".to_string());
                continue;
            };
            record.status = outcome.status;
            record.failure_reason = outcome.failure_reason.clone();
            if matches!(
                outcome.status,
                ChallengeStatus::Passed | ChallengeStatus::Failed
            ) {
                record.responded_at = Some(Utc::now());
            }
            if let Some(raw) = &outcome.raw_response {
                self.store
                    .append_response(ChallengeResponse {
                        challenge_id: record.challenge.id.clone(),
                        session_id,
                        agent_id,
                        response: raw.clone(),
                        response_time_ms: outcome.response_time_ms,
                        responded_at: Utc::now(),
                    })
                    .await?;
            }
        }
        Ok(())
    }

    async fn record_detection(&self, session: &VerificationSession) -> Result<()> {
        let responses = self.store.responses_for_session(session.id).await?;
        let detection = gauntlet_fingerprint::detect(
            session.agent_id,
            Some(session.id),
            &responses,
            &session.claimed_model,
        );
        let detected = detection.detected_model;
        if !detection.matches {
            tracing::warn!(
                agent_id = %session.agent_id,
                claimed = %session.claimed_model,
                detected = %detected,
                "model fingerprint mismatch"
            );
        }
        self.store.append_detection(detection).await?;

        if session.status == SessionStatus::Passed {
            let model = (detected != ModelFamily::Unknown).then_some(detected);
            self.store.mark_verified(session.agent_id, model).await?;
        }
        Ok(())
    }

    /// Read-only status projection; None for unknown session ids.
    pub async fn status(&self, session_id: Uuid) -> Result<Option<SessionStatusView>> {
        let Some(session) = self.store.get_session(session_id).await? else {
            return Ok(None);
        };
        let counts = session.counts();
        let claim_url = (session.status == SessionStatus::Passed && !session.claimed).then(|| {
            format!(
                "{}/claim?session_id={}",
                self.config.claim_base_url.trim_end_matches('/'),
                session.id
            )
        });
        Ok(Some(SessionStatusView {
            session_id: session.id,
            agent_id: session.agent_id,
            agent_username: session.agent_username.clone(),
            status: session.status,
            current_day: session.current_day,
            verification_period_days: self.config.verification_days,
            challenges: counts,
            next_burst_at: session.next_scheduled(),
            failure_reason: session.failure_reason.clone(),
            claim_url,
        }))
    }
}

/// Distinct (day, scheduled_for) pairs in delivery order.
fn burst_schedule(session: &VerificationSession) -> Vec<(usize, DateTime<Utc>)> {
    let mut bursts = Vec::new();
    for (day_index, day) in session.daily_challenges.iter().enumerate() {
        for record in &day.challenges {
            let key = (day_index, record.scheduled_for);
            if !bursts.contains(&key) {
                bursts.push(key);
            }
        }
    }
    bursts.sort_by_key(|(_, at)| *at);
    bursts
}

async fn wait_until(when: DateTime<Utc>) {
    let now = Utc::now();
    if when > now {
        if let Ok(delay) = (when - now).to_std() {
            tokio::time::sleep(delay).await;
        }
    }
}
