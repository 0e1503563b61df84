use async_trait::async_trait;
use streamsure_core::models::Asset;

use crate::analyzer::{AnalysisError, RiskAnalyzer, StageScore};

pub const SUSPICIOUS_KEYWORDS: &str = "suspicious_keywords";

const MATCH_SCORE: f64 = 0.9;
const CLEAN_SCORE: f64 = 0.1;

/// Deterministic text analyzer over the asset's title and description.
#[derive(Debug, Clone)]
pub struct ContextAnalyzer {
    denylist: Vec<String>,
}

impl ContextAnalyzer {
    pub fn new(denylist: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            denylist: denylist
                .into_iter()
                .map(|term| term.as_ref().trim().to_lowercase())
                .filter(|term| !term.is_empty())
                .collect(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.denylist.iter().any(|term| text.contains(term.as_str()))
    }
}

#[async_trait]
impl RiskAnalyzer for ContextAnalyzer {
    fn name(&self) -> &str {
        "context"
    }

    async fn analyze(&self, asset: &Asset) -> Result<StageScore, AnalysisError> {
        let text = format!("{} {}", asset.title, asset.description);
        if self.matches(&text) {
            StageScore::new(MATCH_SCORE, [SUSPICIOUS_KEYWORDS])
        } else {
            StageScore::clean(CLEAN_SCORE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamsure_core::config::DEFAULT_DENYLIST;
    use streamsure_core::models::{BlobRef, NewAsset, Visibility};
    use uuid::Uuid;

    fn asset(title: &str, description: &str) -> Asset {
        Asset::new(NewAsset {
            owner_id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            blob: BlobRef {
                key: "k".to_string(),
                size: 1,
            },
            content_type: "video/mp4".to_string(),
            visibility: Visibility::default(),
        })
    }

    #[tokio::test]
    async fn test_denylisted_term_in_description() {
        let analyzer = ContextAnalyzer::new(DEFAULT_DENYLIST.iter().copied());
        let score = analyzer
            .analyze(&asset("Holiday", "some GORE here"))
            .await
            .unwrap();
        assert_eq!(score.score, 0.9);
        assert!(score.reasons.contains(SUSPICIOUS_KEYWORDS));
    }

    #[tokio::test]
    async fn test_clean_text() {
        let analyzer = ContextAnalyzer::new(DEFAULT_DENYLIST.iter().copied());
        let score = analyzer
            .analyze(&asset("Cooking pasta", "family dinner"))
            .await
            .unwrap();
        assert_eq!(score.score, 0.1);
        assert!(score.reasons.is_empty());
    }

    #[tokio::test]
    async fn test_same_input_same_result() {
        let analyzer = ContextAnalyzer::new(["weapon"]);
        let a = asset("Weapon review", "");
        let first = analyzer.analyze(&a).await.unwrap();
        let second = analyzer.analyze(&a).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_custom_denylist_replaces_default() {
        let analyzer = ContextAnalyzer::new(["spoiler"]);
        let score = analyzer.analyze(&asset("Gore", "")).await.unwrap();
        assert_eq!(score.score, 0.1);
        let score = analyzer
            .analyze(&asset("Finale SPOILER", ""))
            .await
            .unwrap();
        assert_eq!(score.score, 0.9);
    }
}
