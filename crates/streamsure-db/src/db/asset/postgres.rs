use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres};
use streamsure_core::access::ListingScope;
use streamsure_core::models::{
    Asset, AssetPatch, AssetStatus, BlobRef, ModerationDecision, ReviewAction, Visibility,
};
use streamsure_core::AppError;
use uuid::Uuid;

use super::{AssetRepository, CommitOutcome, ReviewOutcome};

/// Row type for the assets table.
#[derive(Debug, FromRow)]
struct AssetRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: String,
    blob_key: String,
    blob_size: i64,
    content_type: String,
    is_public: bool,
    allowed_users: Vec<Uuid>,
    status: AssetStatus,
    risk_score: Option<f64>,
    reasons: Vec<String>,
    admin_notes: Option<String>,
    manually_reviewed: bool,
    duration_secs: Option<f64>,
    generation: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssetRow {
    fn into_asset(self) -> Asset {
        Asset {
            id: self.id,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            blob: BlobRef {
                key: self.blob_key,
                size: self.blob_size.max(0) as u64,
            },
            content_type: self.content_type,
            visibility: Visibility {
                is_public: self.is_public,
                allowed_users: self.allowed_users.into_iter().collect(),
            },
            status: self.status,
            risk_score: self.risk_score,
            reasons: self.reasons.into_iter().collect(),
            admin_notes: self.admin_notes,
            manually_reviewed: self.manually_reviewed,
            duration_secs: self.duration_secs,
            generation: self.generation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Row returned by content replacement: the new state plus the old blob.
#[derive(Debug, FromRow)]
struct ReplacedRow {
    #[sqlx(flatten)]
    asset: AssetRow,
    previous_blob_key: String,
    previous_blob_size: i64,
}

/// Row returned by a review: the new state plus whether it differs.
#[derive(Debug, FromRow)]
struct ReviewedRow {
    #[sqlx(flatten)]
    asset: AssetRow,
    changed: bool,
}

/// Guard columns read back when a conditional commit matched no row.
#[derive(Debug, FromRow)]
struct GuardRow {
    generation: i64,
    manually_reviewed: bool,
}

fn blob_size_to_db(size: u64) -> Result<i64, AppError> {
    i64::try_from(size).map_err(|_| AppError::InvalidInput(format!("Blob size {} too large", size)))
}

/// PostgreSQL-backed asset repository
#[derive(Debug, Clone)]
pub struct PgAssetRepository {
    pool: PgPool,
}

impl PgAssetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetRepository for PgAssetRepository {
    #[tracing::instrument(skip(self, asset), fields(db.table = "assets", db.operation = "insert", asset_id = %asset.id))]
    async fn create(&self, asset: Asset) -> Result<Asset, AppError> {
        let allowed_users: Vec<Uuid> = asset.visibility.allowed_users.iter().copied().collect();
        let reasons: Vec<String> = asset.reasons.iter().cloned().collect();

        let row: AssetRow = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            INSERT INTO assets (
                id, owner_id, title, description, blob_key, blob_size, content_type,
                is_public, allowed_users, status, risk_score, reasons, admin_notes,
                manually_reviewed, duration_secs, generation, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(asset.id)
        .bind(asset.owner_id)
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.blob.key)
        .bind(blob_size_to_db(asset.blob.size)?)
        .bind(&asset.content_type)
        .bind(asset.visibility.is_public)
        .bind(&allowed_users)
        .bind(asset.status)
        .bind(asset.risk_score)
        .bind(&reasons)
        .bind(&asset.admin_notes)
        .bind(asset.manually_reviewed)
        .bind(asset.duration_secs)
        .bind(asset.generation)
        .bind(asset.created_at)
        .bind(asset.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_asset())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select", db.record_id = %id))]
    async fn get(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> =
            sqlx::query_as::<Postgres, AssetRow>("SELECT * FROM assets WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(AssetRow::into_asset))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn find(&self, scope: ListingScope) -> Result<Vec<Asset>, AppError> {
        let rows: Vec<AssetRow> = match scope {
            ListingScope::All => {
                sqlx::query_as::<Postgres, AssetRow>(
                    "SELECT * FROM assets ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
            ListingScope::OwnedOrPublic { subject_id } => {
                sqlx::query_as::<Postgres, AssetRow>(
                    r#"
                    SELECT * FROM assets
                    WHERE owner_id = $1 OR is_public
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(subject_id)
                .fetch_all(&self.pool)
                .await?
            }
            ListingScope::SharedSafe {
                subject_id,
                include_owned,
            } => {
                sqlx::query_as::<Postgres, AssetRow>(
                    r#"
                    SELECT * FROM assets
                    WHERE ($2 AND owner_id = $1)
                       OR ((is_public OR $1 = ANY(allowed_users)) AND status = $3)
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(subject_id)
                .bind(include_owned)
                .bind(AssetStatus::Safe)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows.into_iter().map(AssetRow::into_asset).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "select"))]
    async fn find_processing(&self) -> Result<Vec<Asset>, AppError> {
        let rows: Vec<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(
            "SELECT * FROM assets WHERE status = $1 ORDER BY updated_at ASC",
        )
        .bind(AssetStatus::Processing)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AssetRow::into_asset).collect())
    }

    #[tracing::instrument(skip(self, patch), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn update(&self, id: Uuid, patch: AssetPatch) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                is_public = COALESCE($4, is_public),
                allowed_users = COALESCE($5, allowed_users),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(patch.is_public)
        .bind(&patch.allowed_users)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AssetRow::into_asset))
    }

    #[tracing::instrument(skip(self, blob), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn replace_content(
        &self,
        id: Uuid,
        blob: BlobRef,
        content_type: String,
    ) -> Result<Option<(Asset, BlobRef)>, AppError> {
        let row: Option<ReplacedRow> = sqlx::query_as::<Postgres, ReplacedRow>(
            r#"
            WITH previous AS (
                SELECT id, blob_key, blob_size FROM assets WHERE id = $1 FOR UPDATE
            )
            UPDATE assets a
            SET blob_key = $2,
                blob_size = $3,
                content_type = $4,
                status = 'processing',
                risk_score = NULL,
                reasons = '{}',
                duration_secs = NULL,
                manually_reviewed = FALSE,
                generation = a.generation + 1,
                updated_at = NOW()
            FROM previous
            WHERE a.id = previous.id
            RETURNING a.*,
                previous.blob_key AS previous_blob_key,
                previous.blob_size AS previous_blob_size
            "#,
        )
        .bind(id)
        .bind(&blob.key)
        .bind(blob_size_to_db(blob.size)?)
        .bind(&content_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let previous = BlobRef {
                key: row.previous_blob_key,
                size: row.previous_blob_size.max(0) as u64,
            };
            (row.asset.into_asset(), previous)
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn record_metadata(
        &self,
        id: Uuid,
        generation: i64,
        duration_secs: Option<f64>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE assets
            SET duration_secs = $3, updated_at = NOW()
            WHERE id = $1 AND generation = $2
            "#,
        )
        .bind(id)
        .bind(generation)
        .bind(duration_secs)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, decision), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn commit_decision(
        &self,
        id: Uuid,
        generation: i64,
        decision: &ModerationDecision,
    ) -> Result<CommitOutcome, AppError> {
        let reasons: Vec<String> = decision.reasons.iter().cloned().collect();

        let row: Option<AssetRow> = sqlx::query_as::<Postgres, AssetRow>(
            r#"
            UPDATE assets
            SET status = $3, risk_score = $4, reasons = $5, updated_at = NOW()
            WHERE id = $1 AND generation = $2 AND manually_reviewed = FALSE
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(generation)
        .bind(decision.status)
        .bind(decision.risk_score)
        .bind(&reasons)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(CommitOutcome::Committed(row.into_asset()));
        }

        // The write did not happen; read the guard columns only to report why.
        let guard: Option<GuardRow> = sqlx::query_as::<Postgres, GuardRow>(
            "SELECT generation, manually_reviewed FROM assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match guard {
            None => CommitOutcome::Missing,
            Some(guard) if guard.generation == generation && guard.manually_reviewed => {
                CommitOutcome::Overridden
            }
            Some(_) => CommitOutcome::Stale,
        })
    }

    #[tracing::instrument(skip(self, notes), fields(db.table = "assets", db.operation = "update", db.record_id = %id))]
    async fn apply_review(
        &self,
        id: Uuid,
        action: ReviewAction,
        notes: Option<String>,
    ) -> Result<Option<ReviewOutcome>, AppError> {
        let row: Option<ReviewedRow> = sqlx::query_as::<Postgres, ReviewedRow>(
            r#"
            WITH previous AS (
                SELECT id, status, manually_reviewed FROM assets WHERE id = $1 FOR UPDATE
            )
            UPDATE assets a
            SET status = $2, admin_notes = $3, manually_reviewed = TRUE, updated_at = NOW()
            FROM previous
            WHERE a.id = previous.id
            RETURNING a.*,
                (previous.status <> $2 OR NOT previous.manually_reviewed) AS changed
            "#,
        )
        .bind(id)
        .bind(action.resulting_status())
        .bind(&notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ReviewOutcome {
            changed: row.changed,
            asset: row.asset.into_asset(),
        }))
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.operation = "delete", db.record_id = %id))]
    async fn delete(&self, id: Uuid) -> Result<Option<Asset>, AppError> {
        let row: Option<AssetRow> =
            sqlx::query_as::<Postgres, AssetRow>("DELETE FROM assets WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(AssetRow::into_asset))
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_postgres_contract() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping PostgreSQL repository contract");
            return;
        };

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("Failed to connect to test database");
        crate::db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        contract::run_all(&PgAssetRepository::new(pool)).await;
    }
}
