//! File repository implementation.
//!
//! Every mutation that the audit trail covers (upload, delete, move)
//! writes its file_events row inside the same transaction as the file
//! row, so a crash can never separate an action from its audit record.

use sqlx::PgPool;
use sqlx::postgres::PgQueryResult;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_entity::event::model::FileAction;
use webstor_entity::file::model::{CreateFile, File};
use webstor_entity::file::visibility::FileVisibility;

/// A single-file move together with the folder it left.
#[derive(Debug, Clone)]
pub struct FileMove {
    /// The file after the move.
    pub file: File,
    /// The folder the file was in before the move.
    pub previous_folder_id: Option<Uuid>,
}

/// Outcome of a best-effort bulk move.
#[derive(Debug, Clone, Default)]
pub struct BulkMove {
    /// IDs of the files that were actually moved.
    pub moved_ids: Vec<Uuid>,
    /// Distinct folders the moved files came from.
    pub previous_folder_ids: Vec<Uuid>,
}

impl BulkMove {
    /// Number of files moved.
    pub fn moved_count(&self) -> u64 {
        self.moved_ids.len() as u64
    }
}

/// Repository for file CRUD, listings, and audited mutations.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a live file owned by a specific user. Absence and ownership
    /// violations are indistinguishable, as with folders.
    pub async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file", e))
    }

    /// List a user's live files, newest upload first.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY upload_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list files", e))
    }

    /// List the live files in one of the user's folders.
    pub async fn find_by_folder(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE folder_id = $1 AND user_id = $2 AND NOT is_deleted \
             ORDER BY file_name ASC",
        )
        .bind(folder_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folder files", e))
    }

    /// Case-insensitive name search over a user's live files.
    pub async fn search_by_name(&self, user_id: Uuid, query: &str) -> AppResult<Vec<File>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        sqlx::query_as::<_, File>(
            "SELECT * FROM files \
             WHERE user_id = $1 AND NOT is_deleted AND file_name ILIKE $2 \
             ORDER BY file_name ASC",
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to search files", e))
    }

    /// The user's most recently uploaded live files.
    pub async fn find_recent(&self, user_id: Uuid, limit: i64) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>(
            "SELECT * FROM files WHERE user_id = $1 AND NOT is_deleted \
             ORDER BY upload_date DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list recent files", e))
    }

    /// Insert a file row and its 'upload' event in one transaction.
    pub async fn create(&self, data: &CreateFile) -> AppResult<File> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let file = sqlx::query_as::<_, File>(
            "INSERT INTO files \
             (user_id, folder_id, file_name, file_size, storage_path, mime_type, visibility) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.folder_id)
        .bind(&data.file_name)
        .bind(data.file_size)
        .bind(&data.storage_path)
        .bind(&data.mime_type)
        .bind(data.visibility)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create file", e))?;

        append_event(
            &mut tx,
            file.user_id,
            Some(file.id),
            FileAction::Upload,
            Some(file.file_size),
            None,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit upload", e)
        })?;

        Ok(file)
    }

    /// Rename a live file.
    pub async fn rename(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        new_name: &str,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET file_name = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(new_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename file", e))
    }

    /// Change a live file's visibility.
    pub async fn set_visibility(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        visibility: FileVisibility,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET visibility = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(visibility)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to change visibility", e))
    }

    /// Update a live file's recorded size. The caller settles the quota
    /// delta through the usage ledger before (grow) or after (shrink)
    /// this write.
    pub async fn update_size(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        new_size: i64,
    ) -> AppResult<Option<File>> {
        sqlx::query_as::<_, File>(
            "UPDATE files SET file_size = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(new_size)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update file size", e))
    }

    /// Re-folder a file and record the 'move' event in one transaction.
    pub async fn move_to_folder(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> AppResult<Option<FileMove>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let previous = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT folder_id FROM files \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted FOR UPDATE",
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock file", e))?;

        let Some(previous_folder_id) = previous else {
            return Ok(None);
        };

        let file = sqlx::query_as::<_, File>(
            "UPDATE files SET folder_id = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .bind(target_folder_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move file", e))?;

        append_event(
            &mut tx,
            user_id,
            Some(file_id),
            FileAction::Move,
            Some(file.file_size),
            Some(serde_json::json!({
                "from_folder": previous_folder_id,
                "to_folder": target_folder_id,
            })),
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit move", e))?;

        Ok(Some(FileMove {
            file,
            previous_folder_id,
        }))
    }

    /// Best-effort bulk re-folder: files that are missing, deleted, or
    /// not owned by the user are skipped without failing the batch.
    /// Moves and their events commit as one transaction.
    pub async fn bulk_move(
        &self,
        file_ids: &[Uuid],
        user_id: Uuid,
        target_folder_id: Option<Uuid>,
    ) -> AppResult<BulkMove> {
        if file_ids.is_empty() {
            return Ok(BulkMove::default());
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let candidates: Vec<(Uuid, Option<Uuid>, i64)> = sqlx::query_as(
            "SELECT id, folder_id, file_size FROM files \
             WHERE id = ANY($1) AND user_id = $2 AND NOT is_deleted \
             ORDER BY id FOR UPDATE",
        )
        .bind(file_ids)
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock files", e))?;

        if candidates.is_empty() {
            return Ok(BulkMove::default());
        }

        let moved_ids: Vec<Uuid> = candidates.iter().map(|(id, _, _)| *id).collect();

        let _: PgQueryResult = sqlx::query(
            "UPDATE files SET folder_id = $3, updated_at = NOW() \
             WHERE id = ANY($1) AND user_id = $2",
        )
        .bind(&moved_ids)
        .bind(user_id)
        .bind(target_folder_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to bulk move files", e))?;

        for (id, previous_folder_id, file_size) in &candidates {
            append_event(
                &mut tx,
                user_id,
                Some(*id),
                FileAction::Move,
                Some(*file_size),
                Some(serde_json::json!({
                    "from_folder": previous_folder_id,
                    "to_folder": target_folder_id,
                })),
            )
            .await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit bulk move", e)
        })?;

        let mut previous_folder_ids: Vec<Uuid> = candidates
            .iter()
            .filter_map(|(_, folder, _)| *folder)
            .collect();
        previous_folder_ids.sort();
        previous_folder_ids.dedup();

        Ok(BulkMove {
            moved_ids,
            previous_folder_ids,
        })
    }

    /// Soft-delete a live file and record the 'delete' event in one
    /// transaction. Returns the marked row so the caller can release the
    /// reserved bytes. Deletion is terminal: a second call finds nothing.
    pub async fn soft_delete(&self, file_id: Uuid, user_id: Uuid) -> AppResult<Option<File>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let file = sqlx::query_as::<_, File>(
            "UPDATE files \
             SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted RETURNING *",
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete file", e))?;

        let Some(file) = file else {
            return Ok(None);
        };

        append_event(
            &mut tx,
            user_id,
            Some(file.id),
            FileAction::Delete,
            Some(file.file_size),
            None,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit delete", e)
        })?;

        Ok(Some(file))
    }
}

/// Append a file_events row inside an open transaction.
async fn append_event(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    file_id: Option<Uuid>,
    action: FileAction,
    file_size: Option<i64>,
    meta: Option<serde_json::Value>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO file_events (user_id, file_id, action, file_size, meta) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user_id)
    .bind(file_id)
    .bind(action)
    .bind(file_size)
    .bind(meta)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to append file event", e))?;
    Ok(())
}
