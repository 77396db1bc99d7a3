//! File event repository: the read side of the audit trail.
//!
//! Events are appended inside the file repository's transactions so they
//! commit atomically with the action they record; this repository only
//! ever reads. Rows are never updated or deleted.

use sqlx::PgPool;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_core::types::pagination::{PageRequest, PageResponse};
use webstor_entity::event::model::FileEvent;

/// Repository for reading file events.
#[derive(Debug, Clone)]
pub struct FileEventRepository {
    pool: PgPool,
}

impl FileEventRepository {
    /// Create a new file event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All events for one file, newest first.
    pub async fn find_for_file(&self, file_id: Uuid) -> AppResult<Vec<FileEvent>> {
        sqlx::query_as::<_, FileEvent>(
            "SELECT * FROM file_events WHERE file_id = $1 ORDER BY event_date DESC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file events", e))
    }

    /// A user's events, paginated, newest first.
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<PageResponse<FileEvent>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_events WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to count file events", e)
            })?;

        let events = sqlx::query_as::<_, FileEvent>(
            "SELECT * FROM file_events WHERE user_id = $1 \
             ORDER BY event_date DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list file events", e)
        })?;

        Ok(PageResponse::new(
            events,
            page.page,
            page.page_size,
            total as u64,
        ))
    }
}
