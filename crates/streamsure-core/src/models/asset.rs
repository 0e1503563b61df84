use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Moderation status of an asset.
///
/// `Processing` is the only non-terminal state. It is entered on creation and
/// re-entered when the owner replaces the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "asset_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Processing,
    Safe,
    Flagged,
}

impl AssetStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AssetStatus::Processing)
    }
}

impl Display for AssetStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AssetStatus::Processing => write!(f, "processing"),
            AssetStatus::Safe => write!(f, "safe"),
            AssetStatus::Flagged => write!(f, "flagged"),
        }
    }
}

/// Who besides the owner may see an asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub is_public: bool,
    /// Only consulted when `is_public` is false.
    pub allowed_users: HashSet<Uuid>,
}

impl Visibility {
    pub fn public() -> Self {
        Self {
            is_public: true,
            allowed_users: HashSet::new(),
        }
    }

    pub fn shared_with(users: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            is_public: false,
            allowed_users: users.into_iter().collect(),
        }
    }

    /// Whether `subject_id` is granted access by this visibility setting alone.
    pub fn grants(&self, subject_id: Uuid) -> bool {
        self.is_public || self.allowed_users.contains(&subject_id)
    }
}

/// Reference to the stored bytes of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    pub key: String,
    pub size: u64,
}

/// The central moderation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub blob: BlobRef,
    pub content_type: String,
    pub visibility: Visibility,
    pub status: AssetStatus,
    pub risk_score: Option<f64>,
    pub reasons: BTreeSet<String>,
    pub admin_notes: Option<String>,
    pub manually_reviewed: bool,
    pub duration_secs: Option<f64>,
    pub generation: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Build a freshly submitted asset in the `processing` state.
    pub fn new(new_asset: NewAsset) -> Self {
        Self::with_id(Uuid::new_v4(), new_asset)
    }

    /// Like [`Asset::new`] for an id that was reserved before the upload.
    pub fn with_id(id: Uuid, new_asset: NewAsset) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: new_asset.owner_id,
            title: new_asset.title,
            description: new_asset.description,
            blob: new_asset.blob,
            content_type: new_asset.content_type,
            visibility: new_asset.visibility,
            status: AssetStatus::Processing,
            risk_score: None,
            reasons: BTreeSet::new(),
            admin_notes: None,
            manually_reviewed: false,
            duration_secs: None,
            generation: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn size(&self) -> u64 {
        self.blob.size
    }

    pub fn storage_key(&self) -> &str {
        &self.blob.key
    }

    /// Apply an owner edit. Status and moderation fields are never touched here.
    pub fn apply_patch(&mut self, patch: &AssetPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(is_public) = patch.is_public {
            self.visibility.is_public = is_public;
        }
        if let Some(allowed_users) = &patch.allowed_users {
            self.visibility.allowed_users = allowed_users.iter().copied().collect();
        }
        self.updated_at = Utc::now();
    }

    /// Swap in new content and re-enter `processing` under a new generation.
    ///
    /// Returns the blob that was replaced so the caller can delete it.
    pub fn replace_content(&mut self, blob: BlobRef, content_type: String) -> BlobRef {
        let previous = std::mem::replace(&mut self.blob, blob);
        self.content_type = content_type;
        self.status = AssetStatus::Processing;
        self.risk_score = None;
        self.reasons.clear();
        self.duration_secs = None;
        self.manually_reviewed = false;
        self.generation += 1;
        self.updated_at = Utc::now();
        previous
    }

    /// Record an administrative override.
    /// Returns whether the classification changed. Notes are overwritten either way.
    pub fn apply_review(&mut self, action: ReviewAction, notes: Option<String>) -> bool {
        let status = action.resulting_status();
        let changed = self.status != status || !self.manually_reviewed;
        self.status = status;
        self.admin_notes = notes;
        self.manually_reviewed = true;
        self.updated_at = Utc::now();
        changed
    }

    /// Whether a pipeline run of `generation` may still write its decision.
    pub fn accepts_decision_from(&self, generation: i64) -> bool {
        self.generation == generation && !self.manually_reviewed
    }

    pub fn apply_decision(&mut self, decision: &ModerationDecision) {
        self.status = decision.status;
        self.risk_score = Some(decision.risk_score);
        self.reasons = decision.reasons.clone();
        self.updated_at = Utc::now();
    }
}

/// Input for creating an asset record.
#[derive(Debug, Clone)]
pub struct NewAsset {
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub blob: BlobRef,
    pub content_type: String,
    pub visibility: Visibility,
}

/// Owner-editable fields. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AssetPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub allowed_users: Option<Vec<Uuid>>,
}

impl AssetPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.is_public.is_none()
            && self.allowed_users.is_none()
    }
}

/// Administrative override action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn resulting_status(&self) -> AssetStatus {
        match self {
            ReviewAction::Approve => AssetStatus::Safe,
            ReviewAction::Reject => AssetStatus::Flagged,
        }
    }
}

impl FromStr for ReviewAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            other => Err(format!("Unknown review action: {}", other)),
        }
    }
}

/// Terminal classification produced by a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationDecision {
    pub status: AssetStatus,
    pub risk_score: f64,
    pub reasons: BTreeSet<String>,
}

impl ModerationDecision {
    /// Classification used when analysis could not complete.
    pub fn fail_closed() -> Self {
        Self {
            status: AssetStatus::Flagged,
            risk_score: 1.0,
            reasons: BTreeSet::new(),
        }
    }
}

/// Asset as returned to API clients. The storage key is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub content_type: String,
    pub size: u64,
    pub is_public: bool,
    pub allowed_users: Vec<Uuid>,
    pub status: AssetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        let settled = asset.status.is_terminal();
        let mut allowed_users: Vec<Uuid> = asset.visibility.allowed_users.into_iter().collect();
        allowed_users.sort();
        Self {
            id: asset.id,
            owner_id: asset.owner_id,
            title: asset.title,
            description: asset.description,
            content_type: asset.content_type,
            size: asset.blob.size,
            is_public: asset.visibility.is_public,
            allowed_users,
            status: asset.status,
            risk_score: if settled { asset.risk_score } else { None },
            reasons: if settled {
                asset.reasons.into_iter().collect()
            } else {
                Vec::new()
            },
            admin_notes: asset.admin_notes,
            duration: asset.duration_secs,
            created_at: asset.created_at,
            updated_at: asset.updated_at,
        }
    }
}
