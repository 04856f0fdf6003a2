use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use gauntlet_challenge::ChallengeGenerator;
use gauntlet_delivery::{BurstMetadata, WebhookTransport, deliver};
use gauntlet_store::VerificationStore;
use gauntlet_types::{ChallengeStatus, GauntletError, Result, SpotCheckRecord};

/// Re-challenge an already-verified agent once, against its last-known
/// webhook, with a challenge from the restricted spot-check pool.
///
/// Pass/fail outcomes accumulate into the agent's stats; a skipped delivery
/// (agent unreachable) is recorded but moves neither counter — being offline
/// is never scored as a wrong answer.
pub async fn run_spot_check(
    store: &dyn VerificationStore,
    transport: &dyn WebhookTransport,
    deadline: Duration,
    agent_id: Uuid,
) -> Result<SpotCheckRecord> {
    let session = store
        .session_for_agent(agent_id)
        .await?
        .ok_or(GauntletError::NoKnownWebhook(agent_id))?;

    let challenge = ChallengeGenerator::new().generate_spot_check();
    let outcome = deliver(
        transport,
        &session.webhook_url,
        &challenge,
        BurstMetadata {
            burst_index: 1,
            burst_size: 1,
        },
        deadline,
    )
    .await;

    let skipped = outcome.status == ChallengeStatus::Skipped;
    let record = SpotCheckRecord {
        agent_id,
        timestamp: Utc::now(),
        passed: outcome.status == ChallengeStatus::Passed,
        skipped,
        response_time_ms: (!skipped).then_some(outcome.response_time_ms),
        error: outcome.failure_reason,
        response: outcome.raw_response,
    };
    store.append_spot_check(record.clone()).await?;

    if skipped {
        tracing::info!(agent_id = %agent_id, "spot check skipped, agent unreachable");
    } else {
        let stats = store.record_spot_check(agent_id, record.passed).await?;
        tracing::info!(
            agent_id = %agent_id,
            passed = record.passed,
            failure_rate = stats.spot_check_failure_rate,
            "spot check recorded"
        );
    }

    Ok(record)
}

/// Spot checks for an agent within the trailing window, newest first. Older
/// records never count toward trust-tier demotion.
pub async fn spot_checks_in_window(
    store: &dyn VerificationStore,
    agent_id: Uuid,
    window_days: i64,
) -> Result<Vec<SpotCheckRecord>> {
    let cutoff = Utc::now() - chrono::Duration::days(window_days);
    store.spot_checks_since(agent_id, cutoff).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gauntlet_delivery::{TransportError, TransportReply};
    use gauntlet_store::InMemoryStore;
    use gauntlet_types::VerificationSession;

    struct CannedTransport(std::result::Result<(u16, &'static str), ()>);

    #[async_trait]
    impl WebhookTransport for CannedTransport {
        async fn post_json(
            &self,
            _url: &str,
            _body: &serde_json::Value,
            _timeout: Duration,
        ) -> std::result::Result<TransportReply, TransportError> {
            match self.0 {
                Ok((status, body)) => Ok(TransportReply {
                    status,
                    body: body.to_string(),
                }),
                Err(()) => Err(TransportError::Connect("unreachable".into())),
            }
        }
    }

    const DEADLINE: Duration = Duration::from_secs(20);

    async fn store_with_agent() -> (InMemoryStore, Uuid) {
        let store = InMemoryStore::new();
        let agent_id = Uuid::new_v4();
        let session = VerificationSession::new(
            agent_id,
            "deep-claw",
            "claude-sonnet",
            "https://agent.example/hook",
            vec![],
        );
        store.create_session(session).await.unwrap();
        (store, agent_id)
    }

    #[tokio::test]
    async fn test_passed_spot_check_updates_stats() {
        let (store, agent_id) = store_with_agent().await;
        let transport = CannedTransport(Ok((200, r#"{"response": "I can't verify that entity exists."}"#)));

        let record = run_spot_check(&store, &transport, DEADLINE, agent_id)
            .await
            .unwrap();
        assert!(record.passed);
        assert!(!record.skipped);

        let stats = store.stats(agent_id).await.unwrap().unwrap();
        assert_eq!(stats.spot_checks_passed, 1);
        assert_eq!(stats.spot_checks_failed, 0);
    }

    #[tokio::test]
    async fn test_failed_spot_check_moves_failure_rate() {
        let (store, agent_id) = store_with_agent().await;
        let transport = CannedTransport(Ok((200, "garbage")));

        let record = run_spot_check(&store, &transport, DEADLINE, agent_id)
            .await
            .unwrap();
        assert!(!record.passed);
        assert!(!record.skipped);
        assert!(record.error.is_some());

        let stats = store.stats(agent_id).await.unwrap().unwrap();
        assert_eq!(stats.spot_checks_failed, 1);
        assert!((stats.spot_check_failure_rate - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_skipped_spot_check_leaves_stats_alone() {
        let (store, agent_id) = store_with_agent().await;
        let transport = CannedTransport(Err(()));

        let record = run_spot_check(&store, &transport, DEADLINE, agent_id)
            .await
            .unwrap();
        assert!(record.skipped);
        assert!(record.response_time_ms.is_none());

        assert!(store.stats(agent_id).await.unwrap().is_none());
        // but the record itself is queryable
        let in_window = spot_checks_in_window(&store, agent_id, 30).await.unwrap();
        assert_eq!(in_window.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_agent_has_no_webhook() {
        let store = InMemoryStore::new();
        let transport = CannedTransport(Err(()));
        let err = run_spot_check(&store, &transport, DEADLINE, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, GauntletError::NoKnownWebhook(_)));
    }
}
