//! Read-through / write-invalidate cache over the file surface.
//!
//! Explicit composition: [`CachedFileService`] wraps any
//! [`FileProvider`] behind the same trait, keeping invalidation logic in
//! one place and testable apart from persistence. Invalidation runs only
//! after the inner call returns Ok, so a failed write leaves the cache
//! untouched. Search and recent listings change too often relative to
//! the TTL to be worth caching and always delegate.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use webstor_cache::{CacheManager, keys};
use webstor_core::config::cache::CacheConfig;
use webstor_core::traits::cache::CacheProvider;
use webstor_database::repositories::file::{BulkMove, FileMove};
use webstor_entity::event::FileEvent;
use webstor_entity::file::{File, FileVisibility};

use super::{FileProvider, UploadRequest};
use crate::error::ServiceResult;

/// Caching wrapper around a [`FileProvider`].
#[derive(Clone)]
pub struct CachedFileService {
    /// The wrapped provider.
    inner: Arc<dyn FileProvider>,
    /// Cache backend.
    cache: CacheManager,
    /// Cache settings (enablement, TTL).
    config: CacheConfig,
}

impl std::fmt::Debug for CachedFileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedFileService")
            .field("enabled", &self.config.enabled)
            .finish()
    }
}

impl CachedFileService {
    /// Creates a new caching wrapper.
    pub fn new(inner: Arc<dyn FileProvider>, cache: CacheManager, config: CacheConfig) -> Self {
        Self {
            inner,
            cache,
            config,
        }
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.default_ttl_seconds)
    }

    /// Drop the cache entries a mutated file could have gone stale in:
    /// its own entry, the owner's listing, the listings of every
    /// affected folder, and (for event-appending mutations) its event
    /// history.
    async fn invalidate_file(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        folders: impl IntoIterator<Item = Uuid>,
        events_stale: bool,
    ) -> ServiceResult<()> {
        self.cache.delete(&keys::file_by_id(user_id, file_id)).await?;
        self.cache.delete(&keys::user_files(user_id)).await?;
        for folder_id in folders {
            self.cache
                .delete(&keys::folder_files(user_id, folder_id))
                .await?;
        }
        if events_stale {
            self.cache
                .delete(&keys::file_events(user_id, file_id))
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl FileProvider for CachedFileService {
    async fn upload(&self, request: UploadRequest) -> ServiceResult<File> {
        let file = self.inner.upload(request).await?;
        if self.config.enabled {
            self.invalidate_file(file.user_id, file.id, file.folder_id, false)
                .await?;
        }
        Ok(file)
    }

    async fn rename(&self, file_id: Uuid, user_id: Uuid, new_name: &str) -> ServiceResult<File> {
        let file = self.inner.rename(file_id, user_id, new_name).await?;
        if self.config.enabled {
            self.invalidate_file(user_id, file_id, file.folder_id, false)
                .await?;
        }
        Ok(file)
    }

    async fn change_visibility(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        visibility: FileVisibility,
    ) -> ServiceResult<File> {
        let file = self
            .inner
            .change_visibility(file_id, user_id, visibility)
            .await?;
        if self.config.enabled {
            self.invalidate_file(user_id, file_id, file.folder_id, false)
                .await?;
        }
        Ok(file)
    }

    async fn move_file(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<FileMove> {
        let moved = self
            .inner
            .move_file(file_id, user_id, target_folder_id)
            .await?;
        if self.config.enabled {
            // Both the old and the new folder listing are stale now.
            let folders = moved
                .previous_folder_id
                .into_iter()
                .chain(moved.file.folder_id);
            self.invalidate_file(user_id, file_id, folders, true).await?;
        }
        Ok(moved)
    }

    async fn resize(&self, file_id: Uuid, user_id: Uuid, new_size: i64) -> ServiceResult<File> {
        let file = self.inner.resize(file_id, user_id, new_size).await?;
        if self.config.enabled {
            self.invalidate_file(user_id, file_id, file.folder_id, false)
                .await?;
        }
        Ok(file)
    }

    async fn soft_delete(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
        let file = self.inner.soft_delete(file_id, user_id).await?;
        if self.config.enabled {
            self.invalidate_file(user_id, file_id, file.folder_id, true)
                .await?;
        }
        Ok(file)
    }

    async fn bulk_move(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> ServiceResult<BulkMove> {
        let outcome = self
            .inner
            .bulk_move(file_ids, user_id, target_folder_id)
            .await?;
        if self.config.enabled && !outcome.moved_ids.is_empty() {
            self.cache.delete(&keys::user_files(user_id)).await?;
            for folder_id in outcome
                .previous_folder_ids
                .iter()
                .copied()
                .chain(target_folder_id)
            {
                self.cache
                    .delete(&keys::folder_files(user_id, folder_id))
                    .await?;
            }
            for file_id in &outcome.moved_ids {
                self.cache
                    .delete(&keys::file_by_id(user_id, *file_id))
                    .await?;
                self.cache
                    .delete(&keys::file_events(user_id, *file_id))
                    .await?;
            }
        }
        Ok(outcome)
    }

    async fn get_by_id(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
        if !self.config.enabled {
            return self.inner.get_by_id(file_id, user_id).await;
        }

        let key = keys::file_by_id(user_id, file_id);
        if let Some(cached) = self.cache.get_json::<File>(&key).await? {
            return Ok(cached);
        }

        let file = self.inner.get_by_id(file_id, user_id).await?;
        self.cache.set_json(&key, &file, self.ttl()).await?;
        Ok(file)
    }

    async fn list_by_user(&self, user_id: Uuid) -> ServiceResult<Vec<File>> {
        if !self.config.enabled {
            return self.inner.list_by_user(user_id).await;
        }

        let key = keys::user_files(user_id);
        if let Some(cached) = self.cache.get_json::<Vec<File>>(&key).await? {
            return Ok(cached);
        }

        let files = self.inner.list_by_user(user_id).await?;
        self.cache.set_json(&key, &files, self.ttl()).await?;
        Ok(files)
    }

    async fn list_by_folder(&self, folder_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<File>> {
        if !self.config.enabled {
            return self.inner.list_by_folder(folder_id, user_id).await;
        }

        let key = keys::folder_files(user_id, folder_id);
        if let Some(cached) = self.cache.get_json::<Vec<File>>(&key).await? {
            return Ok(cached);
        }

        let files = self.inner.list_by_folder(folder_id, user_id).await?;
        self.cache.set_json(&key, &files, self.ttl()).await?;
        Ok(files)
    }

    async fn events_for_file(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<Vec<FileEvent>> {
        if !self.config.enabled {
            return self.inner.events_for_file(file_id, user_id).await;
        }

        let key = keys::file_events(user_id, file_id);
        if let Some(cached) = self.cache.get_json::<Vec<FileEvent>>(&key).await? {
            return Ok(cached);
        }

        let events = self.inner.events_for_file(file_id, user_id).await?;
        self.cache.set_json(&key, &events, self.ttl()).await?;
        Ok(events)
    }

    async fn search(&self, user_id: Uuid, query: &str) -> ServiceResult<Vec<File>> {
        self.inner.search(user_id, query).await
    }

    async fn recent(&self, user_id: Uuid, limit: i64) -> ServiceResult<Vec<File>> {
        self.inner.recent(user_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    use chrono::Utc;
    use webstor_cache::memory::MemoryCacheProvider;
    use webstor_core::config::cache::MemoryCacheConfig;
    use webstor_core::error::AppError;
    use webstor_entity::file::CreateFile;

    use crate::error::StorageError;

    /// In-memory provider standing in for the persistence-backed service.
    #[derive(Default)]
    struct StubFiles {
        files: Mutex<Vec<File>>,
        list_by_folder_calls: AtomicUsize,
        list_by_user_calls: AtomicUsize,
        get_calls: AtomicUsize,
        fail_uploads: AtomicBool,
    }

    impl StubFiles {
        fn make_file(data: &CreateFile) -> File {
            let now = Utc::now();
            File {
                id: Uuid::new_v4(),
                user_id: data.user_id,
                folder_id: data.folder_id,
                file_name: data.file_name.clone(),
                file_size: data.file_size,
                storage_path: data.storage_path.clone(),
                mime_type: data.mime_type.clone(),
                visibility: data.visibility,
                is_deleted: false,
                upload_date: now,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            }
        }
    }

    #[async_trait]
    impl FileProvider for StubFiles {
        async fn upload(&self, request: UploadRequest) -> ServiceResult<File> {
            if self.fail_uploads.load(Ordering::SeqCst) {
                return Err(AppError::database("insert failed").into());
            }
            let file = Self::make_file(&CreateFile {
                user_id: request.user_id,
                folder_id: request.folder_id,
                file_name: request.file_name,
                file_size: request.file_size,
                storage_path: request.storage_path,
                mime_type: request.mime_type,
                visibility: request.visibility,
            });
            self.files.lock().await.push(file.clone());
            Ok(file)
        }

        async fn rename(
            &self,
            file_id: Uuid,
            user_id: Uuid,
            new_name: &str,
        ) -> ServiceResult<File> {
            let mut files = self.files.lock().await;
            let file = files
                .iter_mut()
                .find(|f| f.id == file_id && f.user_id == user_id)
                .ok_or(StorageError::FileNotFound)?;
            file.file_name = new_name.to_string();
            Ok(file.clone())
        }

        async fn change_visibility(
            &self,
            file_id: Uuid,
            user_id: Uuid,
            visibility: FileVisibility,
        ) -> ServiceResult<File> {
            let mut files = self.files.lock().await;
            let file = files
                .iter_mut()
                .find(|f| f.id == file_id && f.user_id == user_id)
                .ok_or(StorageError::FileNotFound)?;
            file.visibility = visibility;
            Ok(file.clone())
        }

        async fn move_file(
            &self,
            file_id: Uuid,
            user_id: Uuid,
            target_folder_id: Option<Uuid>,
        ) -> ServiceResult<FileMove> {
            let mut files = self.files.lock().await;
            let file = files
                .iter_mut()
                .find(|f| f.id == file_id && f.user_id == user_id)
                .ok_or(StorageError::FileNotFound)?;
            let previous_folder_id = file.folder_id;
            file.folder_id = target_folder_id;
            Ok(FileMove {
                file: file.clone(),
                previous_folder_id,
            })
        }

        async fn resize(
            &self,
            file_id: Uuid,
            user_id: Uuid,
            new_size: i64,
        ) -> ServiceResult<File> {
            let mut files = self.files.lock().await;
            let file = files
                .iter_mut()
                .find(|f| f.id == file_id && f.user_id == user_id)
                .ok_or(StorageError::FileNotFound)?;
            file.file_size = new_size;
            Ok(file.clone())
        }

        async fn soft_delete(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
            let mut files = self.files.lock().await;
            let index = files
                .iter()
                .position(|f| f.id == file_id && f.user_id == user_id)
                .ok_or(StorageError::FileNotFound)?;
            Ok(files.remove(index))
        }

        async fn bulk_move(
            &self,
            file_ids: &[Uuid],
            user_id: Uuid,
            target_folder_id: Option<Uuid>,
        ) -> ServiceResult<BulkMove> {
            let mut files = self.files.lock().await;
            let mut outcome = BulkMove::default();
            for file in files
                .iter_mut()
                .filter(|f| f.user_id == user_id && file_ids.contains(&f.id))
            {
                if let Some(previous) = file.folder_id {
                    outcome.previous_folder_ids.push(previous);
                }
                file.folder_id = target_folder_id;
                outcome.moved_ids.push(file.id);
            }
            outcome.previous_folder_ids.dedup();
            Ok(outcome)
        }

        async fn get_by_id(&self, file_id: Uuid, user_id: Uuid) -> ServiceResult<File> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.files
                .lock()
                .await
                .iter()
                .find(|f| f.id == file_id && f.user_id == user_id)
                .cloned()
                .ok_or(StorageError::FileNotFound)
        }

        async fn list_by_user(&self, user_id: Uuid) -> ServiceResult<Vec<File>> {
            self.list_by_user_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .files
                .lock()
                .await
                .iter()
                .filter(|f| f.user_id == user_id)
                .cloned()
                .collect())
        }

        async fn list_by_folder(
            &self,
            folder_id: Uuid,
            user_id: Uuid,
        ) -> ServiceResult<Vec<File>> {
            self.list_by_folder_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .files
                .lock()
                .await
                .iter()
                .filter(|f| f.user_id == user_id && f.folder_id == Some(folder_id))
                .cloned()
                .collect())
        }

        async fn events_for_file(
            &self,
            _file_id: Uuid,
            _user_id: Uuid,
        ) -> ServiceResult<Vec<FileEvent>> {
            Ok(Vec::new())
        }

        async fn search(&self, _user_id: Uuid, _query: &str) -> ServiceResult<Vec<File>> {
            Ok(Vec::new())
        }

        async fn recent(&self, _user_id: Uuid, _limit: i64) -> ServiceResult<Vec<File>> {
            Ok(Vec::new())
        }
    }

    fn cached(enabled: bool) -> (CachedFileService, Arc<StubFiles>) {
        let stub = Arc::new(StubFiles::default());
        let provider = MemoryCacheProvider::new(
            &MemoryCacheConfig {
                max_capacity: 1000,
                time_to_live_seconds: 120,
            },
            120,
        );
        let config = CacheConfig {
            enabled,
            ..CacheConfig::default()
        };
        let service = CachedFileService::new(
            stub.clone(),
            CacheManager::from_provider(Arc::new(provider)),
            config,
        );
        (service, stub)
    }

    fn upload_request(user_id: Uuid, folder_id: Option<Uuid>) -> UploadRequest {
        UploadRequest {
            user_id,
            folder_id,
            file_name: "notes.txt".to_string(),
            file_size: 42,
            storage_path: "objects/notes".to_string(),
            mime_type: Some("text/plain".to_string()),
            visibility: FileVisibility::Private,
        }
    }

    #[tokio::test]
    async fn test_read_through_caches_folder_listing() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();
        let folder = Uuid::new_v4();

        service.list_by_folder(folder, user).await.unwrap();
        service.list_by_folder(folder, user).await.unwrap();

        assert_eq!(stub.list_by_folder_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_invalidates_stale_folder_listing() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();
        let folder = Uuid::new_v4();

        // Prime the cache with the empty listing.
        let before = service.list_by_folder(folder, user).await.unwrap();
        assert!(before.is_empty());

        let file = service.upload(upload_request(user, Some(folder))).await.unwrap();

        // The next listing must reflect the upload even though a listing
        // was cached moments before it.
        let after = service.list_by_folder(folder, user).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].id, file.id);
        assert_eq!(stub.list_by_folder_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();
        let folder = Uuid::new_v4();

        service.list_by_folder(folder, user).await.unwrap();
        stub.fail_uploads.store(true, Ordering::SeqCst);

        let err = service.upload(upload_request(user, Some(folder))).await;
        assert!(err.is_err());

        // The cached listing is still served; the failed write must not
        // have dropped it.
        service.list_by_folder(folder, user).await.unwrap();
        assert_eq!(stub.list_by_folder_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_cache_always_delegates() {
        let (service, stub) = cached(false);
        let user = Uuid::new_v4();

        service.list_by_user(user).await.unwrap();
        service.list_by_user(user).await.unwrap();

        assert_eq!(stub.list_by_user_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_move_invalidates_both_folder_listings() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();

        let file = service.upload(upload_request(user, Some(from))).await.unwrap();

        // Prime both listings.
        assert_eq!(service.list_by_folder(from, user).await.unwrap().len(), 1);
        assert_eq!(service.list_by_folder(to, user).await.unwrap().len(), 0);
        let calls_before = stub.list_by_folder_calls.load(Ordering::SeqCst);

        service.move_file(file.id, user, Some(to)).await.unwrap();

        assert_eq!(service.list_by_folder(from, user).await.unwrap().len(), 0);
        assert_eq!(service.list_by_folder(to, user).await.unwrap().len(), 1);
        assert_eq!(
            stub.list_by_folder_calls.load(Ordering::SeqCst),
            calls_before + 2
        );
    }

    #[tokio::test]
    async fn test_get_by_id_read_through() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();

        let file = service.upload(upload_request(user, None)).await.unwrap();
        service.get_by_id(file.id, user).await.unwrap();
        let fetched = service.get_by_id(file.id, user).await.unwrap();

        assert_eq!(fetched.id, file.id);
        assert_eq!(stub.get_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_drops_file_entry() {
        let (service, stub) = cached(true);
        let user = Uuid::new_v4();

        let file = service.upload(upload_request(user, None)).await.unwrap();
        service.get_by_id(file.id, user).await.unwrap();
        service.soft_delete(file.id, user).await.unwrap();

        // The cached entity entry must not outlive the file.
        let err = service.get_by_id(file.id, user).await.unwrap_err();
        assert!(matches!(err, StorageError::FileNotFound));
        assert_eq!(stub.get_calls.load(Ordering::SeqCst), 2);
    }
}
