use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use gauntlet_types::{ChallengeStatus, GeneratedChallenge};

use crate::transport::{TransportError, WebhookTransport};

/// Replies shorter than this (trimmed) are protocol violations, not answers.
pub const MIN_RESPONSE_CHARS: usize = 2;

const PING_MESSAGE: &str = "Testing connectivity";

/// Burst position metadata included with every challenge payload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BurstMetadata {
    pub burst_index: u32,
    pub burst_size: u32,
}

#[derive(Debug, Serialize)]
struct ChallengePayload<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    challenge_id: &'a str,
    prompt: &'a str,
    respond_within_seconds: u64,
    metadata: BurstMetadata,
}

#[derive(Debug, Serialize)]
struct PingPayload {
    #[serde(rename = "type")]
    kind: &'static str,
    message: &'static str,
}

#[derive(Debug, Deserialize)]
struct AgentReply {
    response: String,
}

/// Adjudicated result of one delivery attempt.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub status: ChallengeStatus,
    pub response_time_ms: u64,
    pub raw_response: Option<String>,
    pub failure_reason: Option<String>,
}

impl DeliveryOutcome {
    fn skipped(response_time_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            status: ChallengeStatus::Skipped,
            response_time_ms,
            raw_response: None,
            failure_reason: Some(reason.into()),
        }
    }

    fn failed(response_time_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            status: ChallengeStatus::Failed,
            response_time_ms,
            raw_response: None,
            failure_reason: Some(reason.into()),
        }
    }
}

/// Deliver one challenge and adjudicate the reply within `deadline`.
///
/// Timeouts, connection errors, and non-2xx statuses are `Skipped` — the
/// agent may simply be offline, which is never scored as a wrong answer.
/// A reachable webhook that answers with a malformed or trivial body is
/// `Failed`: it was there and violated the protocol.
pub async fn deliver(
    transport: &dyn WebhookTransport,
    webhook_url: &str,
    challenge: &GeneratedChallenge,
    burst: BurstMetadata,
    deadline: Duration,
) -> DeliveryOutcome {
    let payload = ChallengePayload {
        kind: "verification_challenge",
        challenge_id: &challenge.id,
        prompt: &challenge.prompt,
        respond_within_seconds: deadline.as_secs(),
        metadata: burst,
    };
    let body = match serde_json::to_value(&payload) {
        Ok(body) => body,
        Err(e) => {
            return DeliveryOutcome::skipped(0, format!("payload serialization: {e}"));
        }
    };

    let started = Instant::now();
    let reply = transport.post_json(webhook_url, &body, deadline).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let reply = match reply {
        Ok(reply) => reply,
        Err(TransportError::Timeout) => {
            tracing::debug!(challenge_id = %challenge.id, "delivery timed out");
            return DeliveryOutcome::skipped(elapsed_ms, "webhook timed out");
        }
        Err(TransportError::Connect(reason)) => {
            tracing::debug!(challenge_id = %challenge.id, %reason, "delivery connect error");
            return DeliveryOutcome::skipped(elapsed_ms, format!("connection error: {reason}"));
        }
    };

    if !(200..300).contains(&reply.status) {
        return DeliveryOutcome::skipped(
            elapsed_ms,
            format!("webhook returned status {}", reply.status),
        );
    }

    let parsed: AgentReply = match serde_json::from_str(&reply.body) {
        Ok(parsed) => parsed,
        Err(_) => {
            return DeliveryOutcome::failed(
                elapsed_ms,
                "malformed response body: expected {\"response\": string}",
            );
        }
    };

    if parsed.response.trim().len() < MIN_RESPONSE_CHARS {
        return DeliveryOutcome::failed(elapsed_ms, "trivial response body");
    }

    DeliveryOutcome {
        status: ChallengeStatus::Passed,
        response_time_ms: elapsed_ms,
        raw_response: Some(parsed.response),
        failure_reason: None,
    }
}

/// Why a connectivity probe was rejected: the distinction is user-facing
/// ("cannot connect" vs. "reachable but erroring").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    Unreachable(String),
    Rejected(u16),
}

/// One synchronous ping before a session is allowed to start.
pub async fn probe(
    transport: &dyn WebhookTransport,
    webhook_url: &str,
    timeout: Duration,
) -> Result<(), ProbeFailure> {
    let payload = PingPayload {
        kind: "ping",
        message: PING_MESSAGE,
    };
    let body = serde_json::to_value(&payload)
        .map_err(|e| ProbeFailure::Unreachable(format!("payload serialization: {e}")))?;

    match transport.post_json(webhook_url, &body, timeout).await {
        Ok(reply) if (200..300).contains(&reply.status) => Ok(()),
        Ok(reply) => Err(ProbeFailure::Rejected(reply.status)),
        Err(TransportError::Timeout) => Err(ProbeFailure::Unreachable("timed out".into())),
        Err(TransportError::Connect(reason)) => Err(ProbeFailure::Unreachable(reason)),
    }
}
