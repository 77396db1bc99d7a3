//! File lifecycle orchestration.
//!
//! Upload and delete settle quota through the accountant; folder
//! placement is validated through the folder service; the repository
//! commits each mutation and its audit event as one transaction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use webstor_core::error::AppError;
use webstor_core::types::pagination::{PageRequest, PageResponse};
use webstor_database::repositories::file::{BulkMove, FileMove, FileRepository};
use webstor_database::repositories::file_event::FileEventRepository;
use webstor_entity::event::FileEvent;
use webstor_entity::file::{CreateFile, File, FileVisibility};

use super::{FileProvider, UploadRequest};
use crate::error::{ServiceResult, StorageError};
use crate::folder::FolderService;
use crate::quota::QuotaService;

/// Maximum rows returned by the recent-files listing.
const MAX_RECENT: i64 = 100;

/// Orchestrates the file lifecycle from upload to terminal soft delete.
#[derive(Clone)]
pub struct FileService {
    /// File repository.
    files: Arc<FileRepository>,
    /// File event repository (read side of the audit trail).
    events: Arc<FileEventRepository>,
    /// Folder ownership and placement checks.
    folders: Arc<FolderService>,
    /// Quota accounting.
    quota: Arc<QuotaService>,
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService").finish()
    }
}

impl FileService {
    /// Creates a new file service.
    pub fn new(
        files: Arc<FileRepository>,
        events: Arc<FileEventRepository>,
        folders: Arc<FolderService>,
        quota: Arc<QuotaService>,
    ) -> Self {
        Self {
            files,
            events,
            folders,
            quota,
        }
    }

    /// A user's audit events, paginated (admin inspection surface).
    pub async fn user_events(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> ServiceResult<PageResponse<FileEvent>> {
        Ok(self.events.find_for_user(user_id, page).await?)
    }

    async fn require_owned(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
        self.files
            .find_owned(file_id, user_id)
            .await?
            .ok_or(StorageError::FileNotFound)
    }
}

#[async_trait]
impl FileProvider for FileService {
    async fn upload(&self, request: UploadRequest) -> ServiceResult<File> {
        if request.file_name.trim().is_empty() {
            return Err(AppError::validation("File name cannot be empty").into());
        }
        if request.file_size < 0 {
            return Err(AppError::validation("File size cannot be negative").into());
        }

        if let Some(folder_id) = request.folder_id {
            self.folders.owned(folder_id, request.user_id).await?;
        }

        self.quota
            .reserve(request.user_id, request.file_size)
            .await?;

        let record = CreateFile {
            user_id: request.user_id,
            folder_id: request.folder_id,
            file_name: request.file_name,
            file_size: request.file_size,
            storage_path: request.storage_path,
            mime_type: request.mime_type,
            visibility: request.visibility,
        };

        let file = match self.files.create(&record).await {
            Ok(file) => file,
            Err(e) => {
                // The file row never landed: hand the reserved bytes back
                // before surfacing the failure.
                if let Err(release_err) =
                    self.quota.release(request.user_id, record.file_size).await
                {
                    warn!(
                        user_id = %request.user_id,
                        error = %release_err,
                        "Failed to roll back reservation after upload failure"
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            user_id = %file.user_id,
            file_id = %file.id,
            name = %file.file_name,
            size = file.file_size,
            "File uploaded"
        );

        Ok(file)
    }

    async fn rename(&self, file_id: Uuid, user_id: Uuid, new_name: &str) -> ServiceResult<File> {
        if new_name.trim().is_empty() {
            return Err(AppError::validation("File name cannot be empty").into());
        }

        let file = self
            .files
            .rename(file_id, user_id, new_name.trim())
            .await?
            .ok_or(StorageError::FileNotFound)?;

        info!(user_id = %user_id, file_id = %file_id, "File renamed");
        Ok(file)
    }

    async fn change_visibility(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        visibility: FileVisibility,
    ) -> ServiceResult<File> {
        let file = self
            .files
            .set_visibility(file_id, user_id, visibility)
            .await?
            .ok_or(StorageError::FileNotFound)?;

        info!(
            user_id = %user_id,
            file_id = %file_id,
            visibility = %visibility,
            "File visibility changed"
        );
        Ok(file)
    }

    async fn move_file(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<FileMove> {
        if let Some(folder_id) = target_folder_id {
            self.folders.owned(folder_id, user_id).await?;
        }

        let moved = self
            .files
            .move_to_folder(file_id, user_id, target_folder_id)
            .await?
            .ok_or(StorageError::FileNotFound)?;

        info!(
            user_id = %user_id,
            file_id = %file_id,
            target = ?target_folder_id,
            "File moved"
        );
        Ok(moved)
    }

    async fn resize(&self, file_id: Uuid, user_id: Uuid, new_size: i64) -> ServiceResult<File> {
        if new_size < 0 {
            return Err(AppError::validation("File size cannot be negative").into());
        }

        let current = self.require_owned(file_id, user_id).await?;
        let delta = new_size - current.file_size;

        if delta > 0 {
            // Only the growth is re-validated; the bytes already held
            // stay reserved.
            self.quota.reserve(user_id, delta).await?;
        }

        let updated = match self.files.update_size(file_id, user_id, new_size).await {
            Ok(Some(file)) => file,
            Ok(None) => {
                if delta > 0 {
                    self.quota.release(user_id, delta).await?;
                }
                return Err(StorageError::FileNotFound);
            }
            Err(e) => {
                if delta > 0 {
                    self.quota.release(user_id, delta).await?;
                }
                return Err(e.into());
            }
        };

        if delta < 0 {
            self.quota.release(user_id, -delta).await?;
        }

        info!(
            user_id = %user_id,
            file_id = %file_id,
            old_size = current.file_size,
            new_size = new_size,
            "File size updated"
        );

        Ok(updated)
    }

    async fn soft_delete(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
        let file = self
            .files
            .soft_delete(file_id, user_id)
            .await?
            .ok_or(StorageError::FileNotFound)?;

        self.quota.release(user_id, file.file_size).await?;

        info!(
            user_id = %user_id,
            file_id = %file_id,
            size = file.file_size,
            "File deleted"
        );
        Ok(file)
    }

    async fn bulk_move(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<BulkMove> {
        // The target is validated once for the whole batch; individual
        // files that are missing or unowned are skipped, not errors.
        if let Some(folder_id) = target_folder_id {
            self.folders.owned(folder_id, user_id).await?;
        }

        let outcome = self
            .files
            .bulk_move(file_ids, user_id, target_folder_id)
            .await?;

        info!(
            user_id = %user_id,
            requested = file_ids.len(),
            moved = outcome.moved_count(),
            target = ?target_folder_id,
            "Files bulk-moved"
        );
        Ok(outcome)
    }

    async fn get_by_id(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
        self.require_owned(file_id, user_id).await
    }

    async fn list_by_user(&self, user_id: Uuid) -> ServiceResult<Vec<File>> {
        Ok(self.files.find_by_user(user_id).await?)
    }

    async fn list_by_folder(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<File>> {
        self.folders.owned(folder_id, user_id).await?;
        Ok(self.files.find_by_folder(folder_id, user_id).await?)
    }

    async fn events_for_file(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<FileEvent>> {
        self.require_owned(file_id, user_id).await?;
        Ok(self.events.find_for_file(file_id).await?)
    }

    async fn search(&self, user_id: Uuid, query: &str) -> ServiceResult<Vec<File>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.files.search_by_name(user_id, query).await?)
    }

    async fn recent(&self, user_id: Uuid, limit: i64) -> ServiceResult<Vec<File>> {
        let limit = limit.clamp(1, MAX_RECENT);
        Ok(self.files.find_recent(user_id, limit).await?)
    }
}
