//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A folder in a user's hierarchy.
///
/// The tree is self-referential through `parent_folder_id`; a null parent
/// marks the user's root folder. A parent must always belong to the same
/// user as the child.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: Uuid,
    /// The owning user.
    pub user_id: Uuid,
    /// Parent folder ID (null for the root folder).
    pub parent_folder_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the folder was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Folder {
    /// Check if this is the user's root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_folder_id.is_none()
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The owning user.
    pub user_id: Uuid,
    /// Parent folder (None for the root).
    pub parent_folder_id: Option<Uuid>,
    /// Folder name.
    pub name: String,
}
