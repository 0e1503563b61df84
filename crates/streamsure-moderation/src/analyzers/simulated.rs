use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use streamsure_core::models::Asset;

use crate::analyzer::{AnalysisError, RiskAnalyzer, StageScore};

/// Scores at or above this value carry the channel's reason tag.
const TAG_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatedChannel {
    Visual,
    Audio,
}

impl SimulatedChannel {
    fn reason(self) -> &'static str {
        match self {
            SimulatedChannel::Visual => "visual_explicit_content",
            SimulatedChannel::Audio => "audio_offensive_language",
        }
    }

    fn name(self) -> &'static str {
        match self {
            SimulatedChannel::Visual => "visual",
            SimulatedChannel::Audio => "audio",
        }
    }
}

/// Stand-in for a real model: sleeps for a random latency and returns a
/// uniformly random score.
#[derive(Debug, Clone)]
pub struct SimulatedAnalyzer {
    channel: SimulatedChannel,
    min_latency_ms: u64,
    max_latency_ms: u64,
}

impl SimulatedAnalyzer {
    pub fn new(channel: SimulatedChannel, latency_range_ms: (u64, u64)) -> Self {
        let (min, max) = latency_range_ms;
        Self {
            channel,
            min_latency_ms: min.min(max),
            max_latency_ms: max.max(min),
        }
    }

    pub fn visual(latency_range_ms: (u64, u64)) -> Self {
        Self::new(SimulatedChannel::Visual, latency_range_ms)
    }

    pub fn audio(latency_range_ms: (u64, u64)) -> Self {
        Self::new(SimulatedChannel::Audio, latency_range_ms)
    }

    fn score_for(&self, raw: f64) -> Result<StageScore, AnalysisError> {
        if raw >= TAG_THRESHOLD {
            StageScore::new(raw, [self.channel.reason()])
        } else {
            StageScore::clean(raw)
        }
    }
}

#[async_trait]
impl RiskAnalyzer for SimulatedAnalyzer {
    fn name(&self) -> &str {
        self.channel.name()
    }

    async fn analyze(&self, asset: &Asset) -> Result<StageScore, AnalysisError> {
        let (latency_ms, raw) = {
            let mut rng = rand::rng();
            (
                rng.random_range(self.min_latency_ms..=self.max_latency_ms),
                rng.random::<f64>(),
            )
        };

        tracing::trace!(
            asset_id = %asset.id,
            analyzer = self.channel.name(),
            latency_ms,
            "Simulating analysis"
        );
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        self.score_for(raw)
    }
}
