use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use gauntlet_session::{SessionStart, SessionStatusView, StartOutcome};
use gauntlet_spotcheck::{global_summary, run_spot_check, spot_checks_in_window};
use gauntlet_types::{GauntletError, ModelDetection, SpotCheckRecord};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/verify-agent",
            post(verify_agent).get(verification_status),
        )
        .route("/api/v1/verify-agent/run", post(run_verification))
        .route("/api/v1/agents/{agent_id}/spot-check", post(spot_check))
        .route("/api/v1/agents/{agent_id}/spot-checks", get(spot_checks))
        .route("/api/v1/model-mismatches", get(model_mismatches))
        .route("/api/v1/stats", get(stats))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn error_response(error: GauntletError) -> ApiError {
    let status = match &error {
        GauntletError::InvalidWebhookUrl(_)
        | GauntletError::WebhookUnreachable(_)
        | GauntletError::WebhookRejected(_)
        | GauntletError::SessionConflict { .. }
        | GauntletError::InvalidStateTransition { .. } => StatusCode::BAD_REQUEST,
        GauntletError::SessionNotFound(_) | GauntletError::NoKnownWebhook(_) => {
            StatusCode::NOT_FOUND
        }
        GauntletError::Store(_) | GauntletError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": error.to_string()})))
}

#[derive(Deserialize)]
struct VerifyAgentRequest {
    agent_id: Uuid,
    agent_username: String,
    claimed_model: String,
    webhook_url: String,
}

fn start_payload(start: SessionStart) -> serde_json::Value {
    json!({
        "session_id": start.session_id,
        "verification_period": format!("{} days", start.verification_period_days),
        "total_challenges": start.total_challenges,
        "instructions": start.instructions,
        "webhook_format": start.webhook_format,
    })
}

async fn verify_agent(
    State(state): State<AppState>,
    Json(req): Json<VerifyAgentRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let outcome = state
        .orchestrator
        .start_session(
            req.agent_id,
            &req.agent_username,
            &req.claimed_model,
            &req.webhook_url,
        )
        .await
        .map_err(error_response)?;

    match outcome {
        StartOutcome::AlreadyVerified => Ok(Json(json!({"already_verified": true}))),
        StartOutcome::Started(start) | StartOutcome::AlreadyActive(start) => {
            Ok(Json(start_payload(start)))
        }
    }
}

#[derive(Deserialize)]
struct SessionQuery {
    session_id: Uuid,
}

async fn verification_status(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionStatusView>, ApiError> {
    state
        .orchestrator
        .status(query.session_id)
        .await
        .map_err(error_response)?
        .map(Json)
        .ok_or_else(|| error_response(GauntletError::SessionNotFound(query.session_id)))
}

async fn run_verification(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .scheduler
        .spawn_run(query.session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "status": "in_progress",
        "check_status_url": format!("/api/v1/verify-agent?session_id={}", query.session_id),
    })))
}

async fn spot_check(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<SpotCheckRecord>, ApiError> {
    run_spot_check(
        state.store.as_ref(),
        state.transport.as_ref(),
        state.config.respond_within(),
        agent_id,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

#[derive(Deserialize)]
struct WindowQuery {
    window_days: Option<i64>,
}

async fn spot_checks(
    State(state): State<AppState>,
    Path(agent_id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<SpotCheckRecord>>, ApiError> {
    let window = query
        .window_days
        .unwrap_or(state.config.spot_check_window_days);
    spot_checks_in_window(state.store.as_ref(), agent_id, window)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn model_mismatches(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelDetection>>, ApiError> {
    state
        .store
        .model_mismatches()
        .await
        .map(Json)
        .map_err(error_response)
}

async fn stats(
    State(state): State<AppState>,
) -> Result<Json<gauntlet_spotcheck::GlobalSummary>, ApiError> {
    global_summary(state.store.as_ref())
        .await
        .map(Json)
        .map_err(error_response)
}
