use serde::Serialize;
use uuid::Uuid;

use gauntlet_store::VerificationStore;
use gauntlet_types::{ModelFamily, Result, SessionStatus};

/// One entry in the mismatch review list.
#[derive(Debug, Clone, Serialize)]
pub struct MismatchEntry {
    pub agent_id: Uuid,
    pub claimed_model: String,
    pub detected_model: ModelFamily,
    pub confidence: f64,
}

/// Global roll-up over everything the store holds.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalSummary {
    pub sessions_total: usize,
    pub sessions_pending: usize,
    pub sessions_in_progress: usize,
    pub sessions_passed: usize,
    pub sessions_failed: usize,
    /// Pass rate over terminal sessions only.
    pub session_pass_rate: f64,
    pub detections_total: usize,
    pub model_match_rate: f64,
    pub mismatched_agents: Vec<MismatchEntry>,
    pub spot_checks_total: usize,
    /// Failure rate over answered (non-skipped) spot checks.
    pub spot_check_failure_rate: f64,
}

/// Compute the global summary. Pure aggregation over store reads.
pub async fn global_summary(store: &dyn VerificationStore) -> Result<GlobalSummary> {
    let sessions = store.all_sessions().await?;
    let mut pending = 0;
    let mut in_progress = 0;
    let mut passed = 0;
    let mut failed = 0;
    for session in &sessions {
        match session.status {
            SessionStatus::Pending => pending += 1,
            SessionStatus::InProgress => in_progress += 1,
            SessionStatus::Passed => passed += 1,
            SessionStatus::Failed => failed += 1,
        }
    }
    let terminal = passed + failed;
    let session_pass_rate = if terminal == 0 {
        0.0
    } else {
        passed as f64 / terminal as f64
    };

    let detections = store.all_detections().await?;
    let matched = detections.iter().filter(|d| d.matches).count();
    let model_match_rate = if detections.is_empty() {
        0.0
    } else {
        matched as f64 / detections.len() as f64
    };
    let mismatched_agents = store
        .model_mismatches()
        .await?
        .into_iter()
        .map(|d| MismatchEntry {
            agent_id: d.agent_id,
            claimed_model: d.claimed_model,
            detected_model: d.detected_model,
            confidence: d.confidence,
        })
        .collect();

    let spot_checks = store.all_spot_checks().await?;
    let answered = spot_checks.iter().filter(|r| !r.skipped).count();
    let spot_failed = spot_checks
        .iter()
        .filter(|r| !r.skipped && !r.passed)
        .count();
    let spot_check_failure_rate = if answered == 0 {
        0.0
    } else {
        spot_failed as f64 / answered as f64
    };

    Ok(GlobalSummary {
        sessions_total: sessions.len(),
        sessions_pending: pending,
        sessions_in_progress: in_progress,
        sessions_passed: passed,
        sessions_failed: failed,
        session_pass_rate,
        detections_total: detections.len(),
        model_match_rate,
        mismatched_agents,
        spot_checks_total: spot_checks.len(),
        spot_check_failure_rate,
    })
}
