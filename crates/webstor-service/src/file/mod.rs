//! File lifecycle management and its cached query surface.

pub mod cached;
pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use webstor_database::repositories::file::{BulkMove, FileMove};
use webstor_entity::event::FileEvent;
use webstor_entity::file::{File, FileVisibility};

use crate::error::ServiceResult;

pub use cached::CachedFileService;
pub use service::FileService;

/// Parameters for registering an uploaded object.
///
/// The object's bytes are already on the storage medium when this
/// arrives; only the path and size are accounted for here.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct UploadRequest {
    /// The uploading user.
    pub user_id: Uuid,
    /// Target folder (None = unfiled).
    pub folder_id: Option<Uuid>,
    /// File name.
    pub file_name: String,
    /// File size in bytes.
    pub file_size: i64,
    /// Location of the object on the storage medium.
    pub storage_path: String,
    /// MIME type.
    pub mime_type: Option<String>,
    /// Who may see the file.
    pub visibility: FileVisibility,
}

/// The file operation surface.
///
/// Implemented by [`FileService`] directly and by [`CachedFileService`]
/// as a wrapping composition, so callers hold one trait object whether
/// or not caching is in play.
#[async_trait]
pub trait FileProvider: Send + Sync + 'static {
    /// Register an uploaded object, reserving quota for it.
    async fn upload(&self, request: UploadRequest) -> ServiceResult<File>;

    /// Rename a file.
    async fn rename(&self, file_id: Uuid, user_id: Uuid, new_name: &str) -> ServiceResult<File>;

    /// Change a file's visibility.
    async fn change_visibility(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        visibility: FileVisibility,
    ) -> ServiceResult<File>;

    /// Move a file to another folder (None = unfiled).
    async fn move_file(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<FileMove>;

    /// Record a new size for a file, settling the quota delta.
    async fn resize(&self, file_id: Uuid, user_id: Uuid, new_size: i64) -> ServiceResult<File>;

    /// Soft-delete a file and release its bytes. Terminal.
    async fn soft_delete(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File>;

    /// Best-effort move of many files; unowned or missing files are
    /// skipped silently.
    async fn bulk_move(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<BulkMove>;

    /// A file by ID.
    async fn get_by_id(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File>;

    /// All of a user's live files.
    async fn list_by_user(&self, user_id: Uuid) -> ServiceResult<Vec<File>>;

    /// The live files in one of the user's folders.
    async fn list_by_folder(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<File>>;

    /// The audit events of one file.
    async fn events_for_file(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<FileEvent>>;

    /// Name search over a user's files. Never cached.
    async fn search(&self, user_id: Uuid, query: &str) -> ServiceResult<Vec<File>>;

    /// Most recently uploaded files. Never cached.
    async fn recent(&self, user_id: Uuid, limit: i64) -> ServiceResult<Vec<File>>;
}
