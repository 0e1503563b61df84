//! Asset lifecycle: submission, listing, edits, content replacement,
//! deletion and administrative review.
//!
//! Every entry point authorizes through [`AccessPolicy`] before touching the
//! repository or blob storage.

use std::sync::Arc;
use streamsure_core::access::{AccessPolicy, Operation};
use streamsure_core::models::{
    Asset, AssetPatch, NewAsset, PipelineEvent, ReviewAction, Subject, Visibility,
};
use streamsure_core::AppError;
use streamsure_db::AssetRepository;
use streamsure_moderation::PipelineEngine;
use streamsure_storage::Storage;
use uuid::Uuid;

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

/// Everything needed to create an asset.
#[derive(Debug, Clone)]
pub struct Submission {
    pub title: String,
    pub description: String,
    pub visibility: Visibility,
    pub file: UploadedFile,
}

#[derive(Clone)]
pub struct AssetService {
    repository: Arc<dyn AssetRepository>,
    storage: Arc<dyn Storage>,
    engine: PipelineEngine,
    policy: AccessPolicy,
    max_upload_size_bytes: u64,
    maintenance_mode: bool,
}

impl AssetService {
    pub fn new(
        repository: Arc<dyn AssetRepository>,
        storage: Arc<dyn Storage>,
        engine: PipelineEngine,
        policy: AccessPolicy,
        max_upload_size_bytes: u64,
        maintenance_mode: bool,
    ) -> Self {
        Self {
            repository,
            storage,
            engine,
            policy,
            max_upload_size_bytes,
            maintenance_mode,
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn engine(&self) -> &PipelineEngine {
        &self.engine
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    fn ensure_writable(&self) -> Result<(), AppError> {
        if self.maintenance_mode {
            return Err(AppError::ServiceUnavailable(
                "Uploads are disabled during maintenance".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_file(&self, file: &UploadedFile) -> Result<(), AppError> {
        if file.data.is_empty() {
            return Err(AppError::InvalidInput("File is empty".to_string()));
        }
        if file.data.len() as u64 > self.max_upload_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File size exceeds maximum allowed size of {} MB",
                self.max_upload_size_bytes / 1024 / 1024
            )));
        }
        Ok(())
    }

    /// Fetch an asset regardless of visibility. Callers authorize afterwards.
    async fn load(&self, id: Uuid) -> Result<Asset, AppError> {
        self.repository
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))
    }

    /// Fetch an asset the subject is allowed to perform `operation` on.
    pub async fn authorized(
        &self,
        subject: &Subject,
        id: Uuid,
        operation: Operation,
    ) -> Result<Asset, AppError> {
        let asset = self.load(id).await?;
        self.policy.authorize(subject, operation, Some(&asset))?;
        Ok(asset)
    }

    /// Store the bytes, create the record in `processing` and schedule moderation.
    #[tracing::instrument(skip(self, submission), fields(subject_id = %subject.id, size = submission.file.data.len()))]
    pub async fn submit(&self, subject: &Subject, submission: Submission) -> Result<Asset, AppError> {
        self.ensure_writable()?;
        self.policy.authorize(subject, Operation::Upload, None)?;

        let title = submission.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::InvalidInput("Title is required".to_string()));
        }
        self.validate_file(&submission.file)?;

        let asset_id = Uuid::new_v4();
        let file = submission.file;
        let blob = self
            .storage
            .upload(asset_id, &file.filename, &file.content_type, file.data)
            .await?;

        let asset = Asset::with_id(
            asset_id,
            NewAsset {
                owner_id: subject.id,
                title,
                description: submission.description,
                blob: blob.clone(),
                content_type: file.content_type,
                visibility: submission.visibility,
            },
        );

        let created = match self.repository.create(asset).await {
            Ok(created) => created,
            Err(e) => {
                self.spawn_blob_cleanup(blob.key);
                return Err(e);
            }
        };

        tracing::info!(asset_id = %created.id, size = created.size(), "Asset submitted");
        self.engine.schedule(&created);
        Ok(created)
    }

    pub async fn list(&self, subject: &Subject) -> Result<Vec<Asset>, AppError> {
        self.repository
            .find(self.policy.listing_scope(subject))
            .await
    }

    pub async fn get(&self, subject: &Subject, id: Uuid) -> Result<Asset, AppError> {
        self.authorized(subject, id, Operation::View).await
    }

    #[tracing::instrument(skip(self, patch), fields(subject_id = %subject.id, asset_id = %id))]
    pub async fn update(
        &self,
        subject: &Subject,
        id: Uuid,
        patch: AssetPatch,
    ) -> Result<Asset, AppError> {
        if patch.is_empty() {
            return Err(AppError::InvalidInput("No fields to update".to_string()));
        }
        let patch = AssetPatch {
            title: match patch.title {
                Some(title) if title.trim().is_empty() => {
                    return Err(AppError::InvalidInput("Title cannot be empty".to_string()))
                }
                Some(title) => Some(title.trim().to_string()),
                None => None,
            },
            ..patch
        };

        self.authorized(subject, id, Operation::Edit).await?;
        self.repository
            .update(id, patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))
    }

    /// Swap the asset's bytes and restart moderation under a new generation.
    #[tracing::instrument(skip(self, file), fields(subject_id = %subject.id, asset_id = %id))]
    pub async fn replace_content(
        &self,
        subject: &Subject,
        id: Uuid,
        file: UploadedFile,
    ) -> Result<Asset, AppError> {
        self.ensure_writable()?;
        self.validate_file(&file)?;
        self.authorized(subject, id, Operation::ReplaceContent).await?;

        let blob = self
            .storage
            .upload(id, &file.filename, &file.content_type, file.data)
            .await?;

        let replaced = match self
            .repository
            .replace_content(id, blob.clone(), file.content_type)
            .await
        {
            Ok(replaced) => replaced,
            Err(e) => {
                self.spawn_blob_cleanup(blob.key);
                return Err(e);
            }
        };
        let Some((updated, previous)) = replaced else {
            // Deleted between the authorization read and the swap
            self.spawn_blob_cleanup(blob.key);
            return Err(AppError::NotFound("Asset not found".to_string()));
        };

        if let Err(e) = self.storage.delete(&previous.key).await {
            tracing::warn!(
                error = %e,
                asset_id = %id,
                storage_key = %previous.key,
                "Failed to delete replaced blob"
            );
        }

        tracing::info!(asset_id = %id, generation = updated.generation, "Asset content replaced");
        self.engine.schedule(&updated);
        Ok(updated)
    }

    /// Delete the blob, then the record.
    ///
    /// A failed blob delete leaves the record in place. A failed record delete
    /// after the blob is gone leaves a dangling record that is logged for
    /// follow-up. If the content was replaced in between, the blob the record
    /// pointed to at deletion time is removed as well.
    #[tracing::instrument(skip(self), fields(subject_id = %subject.id, asset_id = %id))]
    pub async fn delete(&self, subject: &Subject, id: Uuid) -> Result<(), AppError> {
        let asset = self.authorized(subject, id, Operation::Delete).await?;

        self.storage.delete(asset.storage_key()).await.map_err(|e| {
            tracing::error!(error = %e, asset_id = %id, "Failed to delete blob, record kept");
            AppError::from(e)
        })?;

        match self.repository.delete(id).await {
            Ok(Some(deleted)) if deleted.storage_key() != asset.storage_key() => {
                if let Err(e) = self.storage.delete(deleted.storage_key()).await {
                    tracing::warn!(
                        error = %e,
                        asset_id = %id,
                        storage_key = %deleted.storage_key(),
                        "Failed to delete blob swapped in during deletion"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    asset_id = %id,
                    storage_key = %asset.storage_key(),
                    "Blob deleted but asset record remains; manual cleanup required"
                );
                return Err(e);
            }
        }

        self.engine.cancel(id);
        tracing::info!(asset_id = %id, "Asset deleted");
        Ok(())
    }

    /// Administrative override. Wins over any in-flight pipeline run.
    #[tracing::instrument(skip(self, notes), fields(subject_id = %subject.id, asset_id = %id, action = ?action))]
    pub async fn review(
        &self,
        subject: &Subject,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
    ) -> Result<Asset, AppError> {
        self.policy.authorize(subject, Operation::Review, None)?;

        let outcome = self
            .repository
            .apply_review(id, action, notes)
            .await?
            .ok_or_else(|| AppError::NotFound("Asset not found".to_string()))?;
        let reviewed = outcome.asset;

        if !outcome.changed {
            tracing::debug!(status = %reviewed.status, "Repeated review, notes updated");
            return Ok(reviewed);
        }

        tracing::info!(status = %reviewed.status, "Asset reviewed");
        self.engine.events().publish(
            reviewed.owner_id,
            PipelineEvent::reviewed(
                reviewed.id,
                reviewed.status,
                reviewed.risk_score,
                &reviewed.reasons,
            ),
        );
        Ok(reviewed)
    }

    fn spawn_blob_cleanup(&self, key: String) {
        let storage = self.storage.clone();
        tokio::spawn(async move {
            if let Err(e) = storage.delete(&key).await {
                tracing::warn!(error = %e, storage_key = %key, "Failed to clean up orphaned blob");
            }
        });
    }
}
