use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;
use uuid::Uuid;

use super::asset::{AssetStatus, ModerationDecision};

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Metadata,
    Visual,
    Audio,
    Context,
    Decision,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Metadata,
        Stage::Visual,
        Stage::Audio,
        Stage::Context,
        Stage::Decision,
    ];

    /// Percent complete reported once this stage finishes.
    pub fn percent(&self) -> u8 {
        match self {
            Stage::Metadata => 10,
            Stage::Visual => 30,
            Stage::Audio => 60,
            Stage::Context => 80,
            Stage::Decision => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Metadata => "metadata",
            Stage::Visual => "visual",
            Stage::Audio => "audio",
            Stage::Context => "context",
            Stage::Decision => "decision",
        }
    }
}

/// Event published while an asset moves through moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PipelineEvent {
    Progress {
        asset_id: Uuid,
        stage: Stage,
        percent_complete: u8,
    },
    Completion {
        asset_id: Uuid,
        status: AssetStatus,
        risk_score: Option<f64>,
        reasons: Vec<String>,
    },
}

impl PipelineEvent {
    pub fn progress(asset_id: Uuid, stage: Stage) -> Self {
        PipelineEvent::Progress {
            asset_id,
            stage,
            percent_complete: stage.percent(),
        }
    }

    pub fn completion(asset_id: Uuid, decision: &ModerationDecision) -> Self {
        PipelineEvent::Completion {
            asset_id,
            status: decision.status,
            risk_score: Some(decision.risk_score),
            reasons: decision.reasons.iter().cloned().collect(),
        }
    }

    /// Completion event for an administrative override.
    pub fn reviewed(
        asset_id: Uuid,
        status: AssetStatus,
        risk_score: Option<f64>,
        reasons: &BTreeSet<String>,
    ) -> Self {
        PipelineEvent::Completion {
            asset_id,
            status,
            risk_score,
            reasons: reasons.iter().cloned().collect(),
        }
    }

    pub fn asset_id(&self) -> Uuid {
        match self {
            PipelineEvent::Progress { asset_id, .. } => *asset_id,
            PipelineEvent::Completion { asset_id, .. } => *asset_id,
        }
    }

    /// SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineEvent::Progress { .. } => "progress",
            PipelineEvent::Completion { .. } => "completion",
        }
    }
}

/// A pipeline event together with the owner of the asset it concerns.
///
/// The owner travels with the event so subscribers can be filtered without a
/// repository lookup per event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    pub owner_id: Uuid,
    pub event: PipelineEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_percents_increase() {
        let percents: Vec<u8> = Stage::ALL.iter().map(|s| s.percent()).collect();
        assert_eq!(percents, vec![10, 30, 60, 80, 100]);
    }

    #[test]
    fn test_progress_event_serialization() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(PipelineEvent::progress(id, Stage::Audio)).unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["payload"]["stage"], "audio");
        assert_eq!(json["payload"]["percent_complete"], 60);
        assert_eq!(json["payload"]["asset_id"], id.to_string());
    }

    #[test]
    fn test_completion_event_from_failure_decision() {
        let event = PipelineEvent::completion(Uuid::new_v4(), &ModerationDecision::fail_closed());
        assert_eq!(event.kind(), "completion");
        match event {
            PipelineEvent::Completion {
                status,
                risk_score,
                reasons,
                ..
            } => {
                assert_eq!(status, AssetStatus::Flagged);
                assert_eq!(risk_score, Some(1.0));
                assert!(reasons.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
