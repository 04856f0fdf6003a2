use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broad challenge families exposed to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeCategory {
    Hallucination,
    Reasoning,
    SafetyBoundary,
    Consistency,
    KnowledgeBoundary,
    SelfModeling,
    Preference,
}

/// How much a correct answer to this challenge is worth as a behavioral signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataValue {
    Critical,
    High,
    Medium,
}

/// The fixed enumeration of challenge types. Adding a 14th variant is a
/// breaking contract change: `ChallengeKind::ALL` and the generator dispatch
/// must be updated together (pinned by a lockstep test in gauntlet-challenge).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    FabricatedEntity,
    FabricatedCitation,
    SafetyBoundary,
    JailbreakResistance,
    KnowledgeCutoff,
    FutureEvent,
    PersonalityStability,
    PreferenceConsistency,
    SelfCapability,
    TrainingAcknowledgment,
    ArithmeticWordProblem,
    SequenceInference,
    Syllogism,
}

impl ChallengeKind {
    pub const ALL: [ChallengeKind; 13] = [
        ChallengeKind::FabricatedEntity,
        ChallengeKind::FabricatedCitation,
        ChallengeKind::SafetyBoundary,
        ChallengeKind::JailbreakResistance,
        ChallengeKind::KnowledgeCutoff,
        ChallengeKind::FutureEvent,
        ChallengeKind::PersonalityStability,
        ChallengeKind::PreferenceConsistency,
        ChallengeKind::SelfCapability,
        ChallengeKind::TrainingAcknowledgment,
        ChallengeKind::ArithmeticWordProblem,
        ChallengeKind::SequenceInference,
        ChallengeKind::Syllogism,
    ];

    pub fn category(self) -> ChallengeCategory {
        match self {
            ChallengeKind::FabricatedEntity | ChallengeKind::FabricatedCitation => {
                ChallengeCategory::Hallucination
            }
            ChallengeKind::SafetyBoundary | ChallengeKind::JailbreakResistance => {
                ChallengeCategory::SafetyBoundary
            }
            ChallengeKind::KnowledgeCutoff | ChallengeKind::FutureEvent => {
                ChallengeCategory::KnowledgeBoundary
            }
            ChallengeKind::PersonalityStability => ChallengeCategory::Consistency,
            ChallengeKind::PreferenceConsistency => ChallengeCategory::Preference,
            ChallengeKind::SelfCapability | ChallengeKind::TrainingAcknowledgment => {
                ChallengeCategory::SelfModeling
            }
            ChallengeKind::ArithmeticWordProblem
            | ChallengeKind::SequenceInference
            | ChallengeKind::Syllogism => ChallengeCategory::Reasoning,
        }
    }

    pub fn data_value(self) -> DataValue {
        match self.category() {
            ChallengeCategory::Hallucination
            | ChallengeCategory::SafetyBoundary
            | ChallengeCategory::KnowledgeBoundary => DataValue::Critical,
            ChallengeCategory::Consistency
            | ChallengeCategory::Preference
            | ChallengeCategory::SelfModeling => DataValue::High,
            ChallengeCategory::Reasoning => DataValue::Medium,
        }
    }

    /// Id prefix for challenges of this kind.
    pub fn prefix(self) -> &'static str {
        match self.category() {
            ChallengeCategory::Hallucination => "hal",
            ChallengeCategory::Reasoning => "reas",
            ChallengeCategory::SafetyBoundary => "saf",
            ChallengeCategory::Consistency => "cons",
            ChallengeCategory::KnowledgeBoundary => "know",
            ChallengeCategory::SelfModeling => "self",
            ChallengeCategory::Preference => "pref",
        }
    }

    /// Snake-case name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ChallengeKind::FabricatedEntity => "fabricated_entity",
            ChallengeKind::FabricatedCitation => "fabricated_citation",
            ChallengeKind::SafetyBoundary => "safety_boundary",
            ChallengeKind::JailbreakResistance => "jailbreak_resistance",
            ChallengeKind::KnowledgeCutoff => "knowledge_cutoff",
            ChallengeKind::FutureEvent => "future_event",
            ChallengeKind::PersonalityStability => "personality_stability",
            ChallengeKind::PreferenceConsistency => "preference_consistency",
            ChallengeKind::SelfCapability => "self_capability",
            ChallengeKind::TrainingAcknowledgment => "training_acknowledgment",
            ChallengeKind::ArithmeticWordProblem => "arithmetic_word_problem",
            ChallengeKind::SequenceInference => "sequence_inference",
            ChallengeKind::Syllogism => "syllogism",
        }
    }

    /// Kinds eligible for post-verification spot checks. Reasoning/math
    /// challenges are excluded: a spot check probes drift, not capability.
    pub fn spot_check_eligible(self) -> bool {
        matches!(
            self.category(),
            ChallengeCategory::Hallucination
                | ChallengeCategory::SafetyBoundary
                | ChallengeCategory::Consistency
        )
    }
}

/// Category-specific answer key, computed server-side at generation time so
/// correctness can be checked without another model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroundTruth {
    /// The referenced entity/citation was invented; `exists` is always false.
    Fabricated { entity: String, exists: bool },
    /// Exact numeric answer, computed from the generated operands.
    Numeric { answer: i64 },
    /// The request crosses a safety boundary and must be declined.
    Refusal { should_refuse: bool },
    /// The answer must acknowledge this limitation explicitly.
    Disclosure { must_acknowledge: String },
    /// The stated position must remain stable under re-asking.
    Stance { topic: String, expect_stable: bool },
    /// Exact short verbal answer.
    Verbal { answer: String },
}

/// An immutable generated challenge instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedChallenge {
    pub id: String,
    pub category: ChallengeCategory,
    pub kind: ChallengeKind,
    pub prompt: String,
    /// Ordered fields an answer is expected to expose.
    pub extraction_schema: Vec<String>,
    pub data_value: DataValue,
    pub use_case: Vec<String>,
    pub ground_truth: GroundTruth,
    pub template_id: String,
    /// Substitution values used to fill the template.
    pub variables: BTreeMap<String, String>,
    pub generated_at: DateTime<Utc>,
}

/// Delivery state of a single scheduled challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    Pending,
    Passed,
    Failed,
    Skipped,
}

/// A generated challenge bound to a session schedule slot. Created once at
/// plan-build time; only status and timestamps mutate afterward, and never
/// after leaving `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRecord {
    pub challenge: GeneratedChallenge,
    pub status: ChallengeStatus,
    pub scheduled_for: DateTime<Utc>,
    /// 1-based position within the burst sharing `scheduled_for`.
    pub burst_index: u32,
    pub burst_size: u32,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl ChallengeRecord {
    pub fn new(
        challenge: GeneratedChallenge,
        scheduled_for: DateTime<Utc>,
        burst_index: u32,
        burst_size: u32,
    ) -> Self {
        Self {
            challenge,
            status: ChallengeStatus::Pending,
            scheduled_for,
            burst_index,
            burst_size,
            sent_at: None,
            responded_at: None,
            failure_reason: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.status != ChallengeStatus::Pending
    }
}
