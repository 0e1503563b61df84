//! Role-based visibility and authorization rules.
//!
//! Everything here is a pure function of the subject, the operation and the
//! asset. Repositories use [`ListingScope`] to filter, services use
//! [`AccessPolicy::authorize`] before acting on a single asset.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Asset, AssetStatus, Role, Subject};

/// Operations that are subject to authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    View,
    Stream,
    Upload,
    Edit,
    Delete,
    ReplaceContent,
    Review,
}

/// Reason an operation was refused.
///
/// `NotFound` is used whenever the asset is not visible to the subject so that
/// hidden assets cannot be probed for existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDenied {
    Forbidden,
    NotFound,
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Forbidden => {
                AppError::Forbidden("You do not have permission to perform this action".into())
            }
            AccessDenied::NotFound => AppError::NotFound("Asset not found".into()),
        }
    }
}

/// Which assets a subject may list or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingScope {
    /// Administrators.
    All,
    /// Editors: own assets of any status plus every public asset.
    OwnedOrPublic { subject_id: Uuid },
    /// Viewers: public or shared assets that have been classified safe.
    SharedSafe {
        subject_id: Uuid,
        include_owned: bool,
    },
}

impl ListingScope {
    pub fn permits(&self, asset: &Asset) -> bool {
        match *self {
            ListingScope::All => true,
            ListingScope::OwnedOrPublic { subject_id } => {
                asset.owner_id == subject_id || asset.visibility.is_public
            }
            ListingScope::SharedSafe {
                subject_id,
                include_owned,
            } => {
                (include_owned && asset.owner_id == subject_id)
                    || (asset.visibility.grants(subject_id) && asset.status == AssetStatus::Safe)
            }
        }
    }
}

/// Authorization policy for one process.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    /// Let viewers see assets they uploaded regardless of status.
    pub viewer_sees_own_uploads: bool,
}

impl AccessPolicy {
    pub fn new(viewer_sees_own_uploads: bool) -> Self {
        Self {
            viewer_sees_own_uploads,
        }
    }

    pub fn listing_scope(&self, subject: &Subject) -> ListingScope {
        match subject.role {
            Role::Admin => ListingScope::All,
            Role::Editor => ListingScope::OwnedOrPublic {
                subject_id: subject.id,
            },
            Role::Viewer => ListingScope::SharedSafe {
                subject_id: subject.id,
                include_owned: self.viewer_sees_own_uploads,
            },
        }
    }

    /// Decide whether `subject` may perform `operation`.
    ///
    /// `asset` is `None` only for operations that do not target an existing
    /// asset (upload).
    pub fn authorize(
        &self,
        subject: &Subject,
        operation: Operation,
        asset: Option<&Asset>,
    ) -> Result<(), AccessDenied> {
        match operation {
            Operation::Upload => {
                if subject.role.can_upload() {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden)
                }
            }
            Operation::Review => {
                if subject.is_admin() {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden)
                }
            }
            Operation::View | Operation::Stream => {
                let asset = asset.ok_or(AccessDenied::NotFound)?;
                if self.listing_scope(subject).permits(asset) {
                    Ok(())
                } else {
                    Err(AccessDenied::NotFound)
                }
            }
            Operation::Edit | Operation::Delete | Operation::ReplaceContent => {
                let asset = asset.ok_or(AccessDenied::NotFound)?;
                if !self.listing_scope(subject).permits(asset) {
                    return Err(AccessDenied::NotFound);
                }
                if subject.is_admin() || asset.owner_id == subject.id {
                    Ok(())
                } else {
                    Err(AccessDenied::Forbidden)
                }
            }
        }
    }
}
