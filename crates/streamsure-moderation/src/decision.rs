//! Weighted risk decision.

use streamsure_core::models::{AssetStatus, ModerationDecision};

use crate::analyzer::StageScore;

pub const VISUAL_WEIGHT: f64 = 0.5;
pub const AUDIO_WEIGHT: f64 = 0.3;
pub const CONTEXT_WEIGHT: f64 = 0.2;

/// Weighted totals at or above this value are flagged.
pub const FLAG_THRESHOLD: f64 = 0.6;

/// Combine the three stage scores into a terminal classification.
///
/// Reasons are the deduplicated union of all stage reasons.
pub fn decide(visual: &StageScore, audio: &StageScore, context: &StageScore) -> ModerationDecision {
    let total = (VISUAL_WEIGHT * visual.score
        + AUDIO_WEIGHT * audio.score
        + CONTEXT_WEIGHT * context.score)
        .clamp(0.0, 1.0);

    let status = if total >= FLAG_THRESHOLD {
        AssetStatus::Flagged
    } else {
        AssetStatus::Safe
    };

    let reasons = visual
        .reasons
        .iter()
        .chain(&audio.reasons)
        .chain(&context.reasons)
        .cloned()
        .collect();

    ModerationDecision {
        status,
        risk_score: total,
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(value: f64, reasons: &[&str]) -> StageScore {
        StageScore::new(value, reasons.iter().copied()).unwrap()
    }

    #[test]
    fn test_weighted_total() {
        let decision = decide(&score(0.2, &[]), &score(0.5, &[]), &score(0.1, &[]));
        assert!((decision.risk_score - 0.27).abs() < 1e-9);
        assert_eq!(decision.status, AssetStatus::Safe);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        // 0.5 * 1.0 + 0.3 * 0.0 + 0.2 * 0.5 == 0.6
        let decision = decide(&score(1.0, &[]), &score(0.0, &[]), &score(0.5, &[]));
        assert_eq!(decision.status, AssetStatus::Flagged);
    }

    #[test]
    fn test_context_alone_cannot_flag() {
        let decision = decide(
            &score(0.0, &[]),
            &score(0.0, &[]),
            &score(0.9, &["suspicious_keywords"]),
        );
        assert_eq!(decision.status, AssetStatus::Safe);
        assert!(decision.reasons.contains("suspicious_keywords"));
    }

    #[test]
    fn test_reasons_are_deduplicated_union() {
        let decision = decide(
            &score(0.9, &["visual_explicit_content"]),
            &score(0.8, &["audio_offensive_language", "visual_explicit_content"]),
            &score(0.1, &[]),
        );
        assert_eq!(decision.status, AssetStatus::Flagged);
        assert_eq!(decision.reasons.len(), 2);
    }
}
