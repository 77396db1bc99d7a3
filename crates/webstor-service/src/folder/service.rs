//! Folder tree operations: lazy root provisioning, creation, moves,
//! listing, and soft deletion.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use webstor_core::config::subscription::SubscriptionConfig;
use webstor_core::error::AppError;
use webstor_database::repositories::folder::{FolderRepository, TreeMove};
use webstor_entity::folder::{CreateFolder, Folder};

use crate::error::{ServiceResult, StorageError};

/// Manages each user's folder hierarchy.
#[derive(Debug, Clone)]
pub struct FolderService {
    /// Folder repository.
    folders: Arc<FolderRepository>,
    /// Provides the reserved root folder name.
    config: SubscriptionConfig,
}

impl FolderService {
    /// Creates a new folder service.
    pub fn new(folders: Arc<FolderRepository>, config: SubscriptionConfig) -> Self {
        Self { folders, config }
    }

    /// The user's root folder, provisioning it on first access.
    ///
    /// Idempotent under concurrency: every caller gets the same row.
    pub async fn root_for(&self, user_id: Uuid) -> ServiceResult<Folder> {
        Ok(self
            .folders
            .get_or_create_root(user_id, &self.config.root_folder_name)
            .await?)
    }

    /// A live folder owned by the user, or `FolderNotFound`.
    pub async fn owned(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Folder> {
        self.folders
            .find_owned(folder_id, user_id)
            .await?
            .ok_or(StorageError::FolderNotFound)
    }

    /// Create a folder. Without an explicit parent the new folder goes
    /// under the user's root, so every non-root folder stays reachable
    /// from it.
    pub async fn create(
        &self,
        user_id: Uuid,
        name: &str,
        parent_folder_id: Option<Uuid>,
    ) -> ServiceResult<Folder> {
        if name.trim().is_empty() {
            return Err(AppError::validation("Folder name cannot be empty").into());
        }

        let parent_id = match parent_folder_id {
            Some(parent_id) => {
                self.owned(parent_id, user_id).await?;
                parent_id
            }
            None => self.root_for(user_id).await?.id,
        };

        let folder = self
            .folders
            .create(&CreateFolder {
                user_id,
                parent_folder_id: Some(parent_id),
                name: name.trim().to_string(),
            })
            .await?;

        info!(
            user_id = %user_id,
            folder_id = %folder.id,
            parent_id = %parent_id,
            "Folder created"
        );

        Ok(folder)
    }

    /// Direct, non-deleted children of one of the user's folders.
    pub async fn children(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<Folder>> {
        self.owned(folder_id, user_id).await?;
        Ok(self.folders.find_children(folder_id).await?)
    }

    /// All live folders owned by the user.
    pub async fn user_folders(&self, user_id: Uuid) -> ServiceResult<Vec<Folder>> {
        Ok(self.folders.find_by_user(user_id).await?)
    }

    /// Re-parent a folder. Without an explicit target the folder goes
    /// directly under the user's root; only the root itself may have a
    /// null parent.
    ///
    /// Rejects self-moves and any placement under the folder's own
    /// descendants. The ancestor chain is re-validated inside the
    /// transaction that writes the new parent, so a racing move cannot
    /// invalidate the check between validation and write.
    pub async fn move_folder(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        new_parent_id: Option<Uuid>,
    ) -> ServiceResult<Folder> {
        if new_parent_id == Some(folder_id) {
            return Err(StorageError::SelfMove);
        }

        let target = match new_parent_id {
            Some(parent_id) => parent_id,
            None => self.root_for(user_id).await?.id,
        };

        if target == folder_id {
            return Err(StorageError::SelfMove);
        }

        match self.folders.move_folder(folder_id, user_id, target).await? {
            TreeMove::Moved(folder) => {
                info!(
                    user_id = %user_id,
                    folder_id = %folder_id,
                    new_parent = ?new_parent_id,
                    "Folder moved"
                );
                Ok(folder)
            }
            TreeMove::FolderMissing | TreeMove::ParentMissing => Err(StorageError::FolderNotFound),
            TreeMove::Cycle => Err(StorageError::FolderCycle),
        }
    }

    /// Soft-delete a folder. The root folder is refused.
    ///
    /// Deletion does not cascade: child folders and contained files stay
    /// reachable by ID.
    pub async fn soft_delete(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Folder> {
        let folder = self.owned(folder_id, user_id).await?;
        if folder.is_root() {
            return Err(StorageError::RootFolderProtected);
        }

        let deleted = self
            .folders
            .soft_delete(folder_id, user_id)
            .await?
            .ok_or(StorageError::FolderNotFound)?;

        info!(user_id = %user_id, folder_id = %folder_id, "Folder deleted");
        Ok(deleted)
    }
}
