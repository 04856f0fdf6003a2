use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use gauntlet_delivery::{TransportError, TransportReply, WebhookTransport};
use gauntlet_server::AppState;
use gauntlet_session::{GauntletConfig, StartOutcome};
use gauntlet_spotcheck::{global_summary, run_spot_check};
use gauntlet_store::InMemoryStore;
use gauntlet_types::{GauntletError, SessionStatus};

/// Simulated agent operator: acknowledges pings and answers every challenge
/// with a well-formed reply.
struct CooperativeAgent;

#[async_trait]
impl WebhookTransport for CooperativeAgent {
    async fn post_json(
        &self,
        _url: &str,
        body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        if body["type"] == "ping" {
            return Ok(TransportReply {
                status: 200,
                body: "{}".to_string(),
            });
        }
        Ok(TransportReply {
            status: 200,
            body: r#"{"response": "I'd be happy to help, though I don't actually have any record that exists."}"#
                .to_string(),
        })
    }
}

/// Reachable webhook that rejects the probe outright.
struct ProbeRejectingAgent;

#[async_trait]
impl WebhookTransport for ProbeRejectingAgent {
    async fn post_json(
        &self,
        _url: &str,
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        Ok(TransportReply {
            status: 500,
            body: "misconfigured".to_string(),
        })
    }
}

/// Webhook that never answers at all.
struct DarkAgent;

#[async_trait]
impl WebhookTransport for DarkAgent {
    async fn post_json(
        &self,
        _url: &str,
        _body: &serde_json::Value,
        _timeout: Duration,
    ) -> Result<TransportReply, TransportError> {
        Err(TransportError::Timeout)
    }
}

fn app(transport: Arc<dyn WebhookTransport>) -> AppState {
    AppState::with_parts(
        Arc::new(InMemoryStore::new()),
        transport,
        GauntletConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn full_verification_lifecycle() {
    let state = app(Arc::new(CooperativeAgent));
    let agent_id = Uuid::new_v4();

    // Create: probe passes, a 3-day plan is persisted as pending.
    let outcome = state
        .orchestrator
        .start_session(agent_id, "deep-claw", "claude-sonnet-4", "https://agent.example/hook")
        .await
        .unwrap();
    let start = match outcome {
        StartOutcome::Started(start) => start,
        other => panic!("expected a fresh session, got {other:?}"),
    };
    assert_eq!(start.verification_period_days, 3);
    assert!((9..=15).contains(&start.total_challenges));
    assert!(!start.instructions.is_empty());

    // Duplicate creation is a no-op pointing at the same session.
    match state
        .orchestrator
        .start_session(agent_id, "deep-claw", "claude-sonnet-4", "https://agent.example/hook")
        .await
        .unwrap()
    {
        StartOutcome::AlreadyActive(existing) => assert_eq!(existing.session_id, start.session_id),
        other => panic!("expected duplicate no-op, got {other:?}"),
    }

    // Run the whole 3-day window (paused time fast-forwards the waits).
    state.orchestrator.run_session(start.session_id).await.unwrap();

    let view = state
        .orchestrator
        .status(start.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.status, SessionStatus::Passed);
    assert_eq!(view.challenges.passed, start.total_challenges);
    assert_eq!(view.challenges.pending, 0);
    assert!(view.claim_url.is_some());
    assert!(view.failure_reason.is_none());

    // Fingerprint detection agreed with the claimed family.
    let detection = state.store.latest_detection(agent_id).await.unwrap().unwrap();
    assert!(detection.matches);

    // A verified agent short-circuits re-verification.
    assert!(matches!(
        state
            .orchestrator
            .start_session(agent_id, "deep-claw", "claude-sonnet-4", "https://agent.example/hook")
            .await
            .unwrap(),
        StartOutcome::AlreadyVerified
    ));

    // Post-verification spot check against the same webhook.
    let record = run_spot_check(
        state.store.as_ref(),
        state.transport.as_ref(),
        state.config.respond_within(),
        agent_id,
    )
    .await
    .unwrap();
    assert!(record.passed);

    let summary = global_summary(state.store.as_ref()).await.unwrap();
    assert_eq!(summary.sessions_passed, 1);
    assert_eq!(summary.spot_checks_total, 1);
    assert_eq!(summary.detections_total, 1);
}

#[tokio::test]
async fn probe_rejection_blocks_creation_with_distinct_errors() {
    let state = app(Arc::new(ProbeRejectingAgent));
    let err = state
        .orchestrator
        .start_session(Uuid::new_v4(), "a", "gpt-4o", "https://agent.example/hook")
        .await
        .unwrap_err();
    assert!(matches!(err, GauntletError::WebhookRejected(500)));

    let state = app(Arc::new(DarkAgent));
    let err = state
        .orchestrator
        .start_session(Uuid::new_v4(), "a", "gpt-4o", "https://agent.example/hook")
        .await
        .unwrap_err();
    assert!(matches!(err, GauntletError::WebhookUnreachable(_)));
}

#[tokio::test]
async fn malformed_webhook_url_is_rejected_before_any_probe() {
    let state = app(Arc::new(CooperativeAgent));
    for bad in ["not a url", "ftp://agent.example/hook"] {
        let err = state
            .orchestrator
            .start_session(Uuid::new_v4(), "a", "gpt-4o", bad)
            .await
            .unwrap_err();
        assert!(matches!(err, GauntletError::InvalidWebhookUrl(_)), "{bad}");
    }
}
