use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;
use streamsure_core::models::Asset;

use crate::analyzer::{AnalysisError, RiskAnalyzer, StageScore};

/// Analyzer returning a preset score. Useful for local setups and tests that
/// need a deterministic classification.
#[derive(Debug, Clone)]
pub struct FixedScoreAnalyzer {
    name: String,
    score: f64,
    reasons: BTreeSet<String>,
    delay: Duration,
}

impl FixedScoreAnalyzer {
    pub fn new(name: impl Into<String>, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
            reasons: BTreeSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reasons.insert(reason.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl RiskAnalyzer for FixedScoreAnalyzer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, _asset: &Asset) -> Result<StageScore, AnalysisError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        StageScore::new(self.score, self.reasons.iter().cloned())
    }
}
