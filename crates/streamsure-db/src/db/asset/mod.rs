//! Asset record persistence.
//!
//! Every mutation is a single keyed atomic operation: one SQL statement in
//! PostgreSQL, one write-lock critical section in memory. The conditional
//! operations (`record_metadata`, `commit_decision`) are what keep a superseded
//! or overridden pipeline run from clobbering newer state.

mod memory;
mod postgres;

pub use memory::InMemoryAssetRepository;
pub use postgres::PgAssetRepository;

use async_trait::async_trait;
use streamsure_core::access::ListingScope;
use streamsure_core::models::{Asset, AssetPatch, BlobRef, ModerationDecision, ReviewAction};
use streamsure_core::AppError;
use uuid::Uuid;

/// Result of a guarded terminal write from a pipeline run.
#[derive(Debug, Clone)]
pub enum CommitOutcome {
    /// The decision was written; carries the updated record.
    Committed(Asset),
    /// The asset moved on to a newer generation.
    Stale,
    /// An administrator reviewed the asset while the run was in flight.
    Overridden,
    /// The asset was deleted.
    Missing,
}

impl CommitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitOutcome::Committed(_) => "committed",
            CommitOutcome::Stale => "stale",
            CommitOutcome::Overridden => "overridden",
            CommitOutcome::Missing => "missing",
        }
    }
}

/// Result of an administrative override.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub asset: Asset,
    /// False when the asset already carried this manual classification.
    pub changed: bool,
}

#[async_trait]
pub trait AssetRepository: Send + Sync + std::fmt::Debug {
    /// Insert a freshly built asset record.
    async fn create(&self, asset: Asset) -> Result<Asset, AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError>;

    /// All assets permitted by `scope`, newest first.
    async fn find(&self, scope: ListingScope) -> Result<Vec<Asset>, AppError>;

    /// Every asset still awaiting a classification, oldest update first.
    async fn find_processing(&self) -> Result<Vec<Asset>, AppError>;

    /// Apply an owner edit. Returns `None` when the asset does not exist.
    async fn update(&self, id: Uuid, patch: AssetPatch) -> Result<Option<Asset>, AppError>;

    /// Swap the blob, bump the generation and re-enter `processing`.
    ///
    /// Returns the updated record and the blob it replaced.
    async fn replace_content(
        &self,
        id: Uuid,
        blob: BlobRef,
        content_type: String,
    ) -> Result<Option<(Asset, BlobRef)>, AppError>;

    /// Write extracted metadata if `generation` is still current.
    async fn record_metadata(
        &self,
        id: Uuid,
        generation: i64,
        duration_secs: Option<f64>,
    ) -> Result<bool, AppError>;

    /// Write a terminal classification if `generation` is current and the
    /// asset has not been manually reviewed.
    async fn commit_decision(
        &self,
        id: Uuid,
        generation: i64,
        decision: &ModerationDecision,
    ) -> Result<CommitOutcome, AppError>;

    /// Administrative override. Returns `None` when the asset does not exist.
    async fn apply_review(
        &self,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
    ) -> Result<Option<ReviewOutcome>, AppError>;

    /// Remove the record, returning it as it was at deletion time.
    async fn delete(&self, id: Uuid) -> Result<Option<Asset>, AppError>;
}
