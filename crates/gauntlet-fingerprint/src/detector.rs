use chrono::Utc;
use uuid::Uuid;

use gauntlet_types::{ChallengeResponse, ModelDetection, ModelFamily, ModelScore};

use crate::signatures::{SIGNATURES, normalize_claimed_model};

/// Score accumulated responses against the family signatures and emit an
/// append-only detection record. Detection is an auxiliary signal: it never
/// gates the session verdict.
pub fn detect(
    agent_id: Uuid,
    session_id: Option<Uuid>,
    responses: &[ChallengeResponse],
    claimed_model: &str,
) -> ModelDetection {
    let mut raw_scores: Vec<(ModelFamily, f64)> = Vec::with_capacity(SIGNATURES.len());
    let mut indicators: Vec<String> = Vec::new();

    for signature in SIGNATURES {
        let mut score = 0.0;
        for response in responses {
            let lowered = response.response.to_lowercase();
            for (phrase, weight) in signature.indicators {
                if lowered.contains(phrase) {
                    score += weight;
                    indicators.push(format!("{}: \"{}\"", signature.family, phrase));
                }
            }
        }
        raw_scores.push((signature.family, score));
    }

    let total: f64 = raw_scores.iter().map(|(_, s)| s).sum();
    let mut all_scores: Vec<ModelScore> = raw_scores
        .into_iter()
        .map(|(model, score)| ModelScore {
            model,
            score: if total > 0.0 { score / total } else { 0.0 },
        })
        .collect();
    all_scores.sort_by(|a, b| b.score.total_cmp(&a.score));

    let (detected_model, confidence) = match all_scores.first() {
        Some(top) if top.score > 0.0 => (top.model, top.score),
        _ => (ModelFamily::Unknown, 0.0),
    };

    indicators.sort();
    indicators.dedup();

    let claimed_family = normalize_claimed_model(claimed_model);
    let matches = detected_model != ModelFamily::Unknown && detected_model == claimed_family;

    ModelDetection {
        agent_id,
        session_id,
        timestamp: Utc::now(),
        claimed_model: claimed_model.to_string(),
        detected_model,
        confidence,
        matches,
        all_scores,
        indicators,
        responses_analyzed: responses.len(),
    }
}
