use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use streamsure_core::access::ListingScope;
use streamsure_core::models::{Asset, AssetPatch, BlobRef, ModerationDecision, ReviewAction};
use streamsure_core::AppError;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AssetRepository, CommitOutcome, ReviewOutcome};

/// Process-local asset store used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetRepository {
    assets: Arc<RwLock<HashMap<Uuid, Asset>>>,
}

impl InMemoryAssetRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssetRepository {
    #[tracing::instrument(skip(self, asset), fields(db.table = "assets", db.operation = "insert", asset_id = %asset.id))]
    async fn create(&self, asset: Asset) -> Result<Asset, AppError> {
        let mut assets = self.assets.write().await;
        if assets.contains_key(&asset.id) {
            return Err(AppError::Internal(format!(
                "Asset {} already exists",
                asset.id
            )));
        }
        assets.insert(asset.id, asset.clone());
        Ok(asset)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.assets.read().await.get(&id).cloned())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn find(&self, scope: ListingScope) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.read().await;
        let mut found: Vec<Asset> = assets
            .values()
            .filter(|asset| scope.permits(asset))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn find_processing(&self) -> Result<Vec<Asset>, AppError> {
        let assets = self.assets.read().await;
        let mut found: Vec<Asset> = assets
            .values()
            .filter(|asset| !asset.status.is_terminal())
            .cloned()
            .collect();
        found.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
        Ok(found)
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn update(&self, id: Uuid, patch: AssetPatch) -> Result<Option<Asset>, AppError> {
        let mut assets = self.assets.write().await;
        Ok(assets.get_mut(&id).map(|asset| {
            asset.apply_patch(&patch);
            asset.clone()
        }))
    }

    #[tracing::instrument(skip(self, blob), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn replace_content(
        &self,
        id: Uuid,
        blob: BlobRef,
        content_type: String,
    ) -> Result<Option<(Asset, BlobRef)>, AppError> {
        let mut assets = self.assets.write().await;
        Ok(assets.get_mut(&id).map(|asset| {
            let previous = asset.replace_content(blob, content_type);
            (asset.clone(), previous)
        }))
    }

    async fn record_metadata(
        &self,
        id: Uuid,
        generation: i64,
        duration_secs: Option<f64>,
    ) -> Result<bool, AppError> {
        let mut assets = self.assets.write().await;
        match assets.get_mut(&id) {
            Some(asset) if asset.generation == generation => {
                asset.duration_secs = duration_secs;
                asset.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    #[tracing::instrument(skip(self, decision), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn commit_decision(
        &self,
        id: Uuid,
        generation: i64,
        decision: &ModerationDecision,
    ) -> Result<CommitOutcome, AppError> {
        let mut assets = self.assets.write().await;
        let Some(asset) = assets.get_mut(&id) else {
            return Ok(CommitOutcome::Missing);
        };
        if !asset.accepts_decision_from(generation) {
            return Ok(if asset.generation != generation {
                CommitOutcome::Stale
            } else {
                CommitOutcome::Overridden
            });
        }
        asset.apply_decision(decision);
        Ok(CommitOutcome::Committed(asset.clone()))
    }

    #[tracing::instrument(skip(self, notes), fields(db.table = "assets", db.operation = "update", asset_id = %id))]
    async fn apply_review(
        &self,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
    ) -> Result<Option<ReviewOutcome>, AppError> {
        let mut assets = self.assets.write().await;
        Ok(assets.get_mut(&id).map(|asset| {
            let changed = asset.apply_review(action, notes);
            ReviewOutcome {
                asset: asset.clone(),
                changed,
            }
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "delete", asset_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        Ok(self.assets.write().await.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;
    use streamsure_core::models::{AssetStatus, Visibility};

    #[tokio::test]
    async fn test_in_memory_contract() {
        let repo = InMemoryAssetRepository::new();
        contract::run_all(&repo).await;
    }

    #[tokio::test]
    async fn test_find_orders_newest_first() {
        let repo = InMemoryAssetRepository::new();
        let owner = Uuid::new_v4();
        let mut older = contract::new_asset(owner, Visibility::default());
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        let newer = contract::new_asset(owner, Visibility::default());
        repo.create(older.clone()).await.unwrap();
        repo.create(newer.clone()).await.unwrap();

        let found = repo.find(ListingScope::All).await.unwrap();
        assert_eq!(found[0].id, newer.id);
        assert_eq!(found[1].id, older.id);
    }

    #[tokio::test]
    async fn test_concurrent_commit_and_review_keep_review() {
        let repo = InMemoryAssetRepository::new();
        let asset = repo
            .create(contract::new_asset(Uuid::new_v4(), Visibility::default()))
            .await
            .unwrap();
        let id = asset.id;

        let review = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.apply_review(id, ReviewAction::Approve, None)
                    .await
                    .unwrap()
            })
        };
        let commit = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.commit_decision(
                    id,
                    1,
                    &ModerationDecision {
                        status: AssetStatus::Flagged,
                        risk_score: 0.9,
                        reasons: Default::default(),
                    },
                )
                .await
                .unwrap()
            })
        };
        review.await.unwrap();
        commit.await.unwrap();

        // Whichever order the writes landed in, the review is what remains.
        let current = repo.get(id).await.unwrap().unwrap();
        assert_eq!(current.status, AssetStatus::Safe);
        assert!(current.manually_reviewed);
    }
}
