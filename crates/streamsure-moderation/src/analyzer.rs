//! Analyzer abstractions
//!
//! Real models can replace the bundled analyzers by implementing these traits.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::Debug;
use streamsure_core::models::Asset;
use thiserror::Error;

/// Failure of a single analysis stage. Always resolved by the fail-closed rule.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Score is not a number")]
    NotANumber,

    #[error("Content unavailable: {0}")]
    ContentUnavailable(String),

    #[error("Analyzer failed: {0}")]
    Failed(String),
}

/// Result of one scoring stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageScore {
    /// Always within [0, 1]
    pub score: f64,
    pub reasons: BTreeSet<String>,
}

impl StageScore {
    /// Build a score, clamping into [0, 1]. NaN is rejected.
    pub fn new(
        score: f64,
        reasons: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, AnalysisError> {
        if score.is_nan() {
            return Err(AnalysisError::NotANumber);
        }
        Ok(Self {
            score: score.clamp(0.0, 1.0),
            reasons: reasons.into_iter().map(Into::into).collect(),
        })
    }

    pub fn clean(score: f64) -> Result<Self, AnalysisError> {
        Self::new(score, std::iter::empty::<String>())
    }

    /// Re-apply the range rules to a score produced by a third-party analyzer.
    pub fn validated(self) -> Result<Self, AnalysisError> {
        Self::new(self.score, self.reasons)
    }
}

/// Technical metadata extracted from an asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetMetadata {
    pub duration_secs: Option<f64>,
}

#[async_trait]
pub trait MetadataExtractor: Send + Sync + Debug {
    async fn extract(&self, asset: &Asset) -> Result<AssetMetadata, AnalysisError>;
}

#[async_trait]
pub trait RiskAnalyzer: Send + Sync + Debug {
    /// Short name used in logs
    fn name(&self) -> &str;

    async fn analyze(&self, asset: &Asset) -> Result<StageScore, AnalysisError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(StageScore::clean(1.7).unwrap().score, 1.0);
        assert_eq!(StageScore::clean(-0.2).unwrap().score, 0.0);
        assert_eq!(StageScore::clean(0.42).unwrap().score, 0.42);
    }

    #[test]
    fn test_nan_score_rejected() {
        assert!(matches!(
            StageScore::clean(f64::NAN),
            Err(AnalysisError::NotANumber)
        ));
        let forged = StageScore {
            score: f64::NAN,
            reasons: BTreeSet::new(),
        };
        assert!(forged.validated().is_err());
    }
}
