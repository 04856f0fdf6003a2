use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Known model families for fingerprint detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    Gpt,
    Claude,
    Gemini,
    Llama,
    Mistral,
    Deepseek,
    Unknown,
}

impl ModelFamily {
    pub const KNOWN: [ModelFamily; 6] = [
        ModelFamily::Gpt,
        ModelFamily::Claude,
        ModelFamily::Gemini,
        ModelFamily::Llama,
        ModelFamily::Mistral,
        ModelFamily::Deepseek,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelFamily::Gpt => "gpt",
            ModelFamily::Claude => "claude",
            ModelFamily::Gemini => "gemini",
            ModelFamily::Llama => "llama",
            ModelFamily::Mistral => "mistral",
            ModelFamily::Deepseek => "deepseek",
            ModelFamily::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One family's score in a detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model: ModelFamily,
    pub score: f64,
}

/// Append-only record of one fingerprint-detection pass. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDetection {
    pub agent_id: Uuid,
    pub session_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub claimed_model: String,
    pub detected_model: ModelFamily,
    /// Normalized score of the top-ranked family, 0.0-1.0.
    pub confidence: f64,
    /// True iff the detected family equals the normalized claimed family.
    #[serde(rename = "match")]
    pub matches: bool,
    /// Ranked highest-first.
    pub all_scores: Vec<ModelScore>,
    /// Textual evidence: the indicator phrases that fired.
    pub indicators: Vec<String>,
    pub responses_analyzed: usize,
}

/// A free-text answer an agent returned for one challenge. Accumulated for
/// fingerprint detection and the training-data export surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge_id: String,
    pub session_id: Uuid,
    pub agent_id: Uuid,
    pub response: String,
    pub response_time_ms: u64,
    pub responded_at: DateTime<Utc>,
}

/// Append-only record of one post-verification spot check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotCheckRecord {
    pub agent_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
    pub skipped: bool,
    pub response_time_ms: Option<u64>,
    pub error: Option<String>,
    pub response: Option<String>,
}

/// Per-agent aggregate, upserted by accumulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVerificationStats {
    pub agent_id: Uuid,
    pub verification_passed: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub spot_checks_passed: u32,
    pub spot_checks_failed: u32,
    pub spot_check_failure_rate: f64,
    pub detected_model: Option<ModelFamily>,
}

impl AgentVerificationStats {
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            agent_id,
            verification_passed: false,
            verified_at: None,
            spot_checks_passed: 0,
            spot_checks_failed: 0,
            spot_check_failure_rate: 0.0,
            detected_model: None,
        }
    }

    /// Record a spot-check outcome and recompute the failure rate.
    pub fn record_spot_check(&mut self, passed: bool) {
        if passed {
            self.spot_checks_passed += 1;
        } else {
            self.spot_checks_failed += 1;
        }
        let total = self.spot_checks_passed + self.spot_checks_failed;
        self.spot_check_failure_rate = if total == 0 {
            0.0
        } else {
            f64::from(self.spot_checks_failed) / f64::from(total)
        };
    }

    pub fn mark_verified(&mut self, detected_model: Option<ModelFamily>) {
        self.verification_passed = true;
        self.verified_at = Some(Utc::now());
        self.detected_model = detected_model;
    }
}
