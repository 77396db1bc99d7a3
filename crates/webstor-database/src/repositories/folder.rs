//! Folder repository implementation, including the transactional move.

use sqlx::PgPool;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_entity::folder::model::{CreateFolder, Folder};
use webstor_entity::folder::tree::{MAX_ANCESTOR_WALK, MovePlacement, classify_move};

/// Outcome of the transactional folder move.
#[derive(Debug, Clone)]
pub enum TreeMove {
    /// The folder was re-parented.
    Moved(Folder),
    /// The folder does not exist, is deleted, or is not owned by the caller.
    FolderMissing,
    /// The target parent does not exist, is deleted, or is not owned by the caller.
    ParentMissing,
    /// The move would create a cycle (or the ancestor walk blew past its bound).
    Cycle,
}

/// Repository for folder CRUD and tree queries.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a folder by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Find a live folder owned by a specific user.
    ///
    /// Ownership violations and absence come back identically as `None`
    /// so callers cannot probe other users' folder IDs.
    pub async fn find_owned(&self, id: Uuid, user_id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE id = $1 AND user_id = $2 AND NOT is_deleted",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find folder", e))
    }

    /// Find a user's root folder.
    pub async fn find_root(&self, user_id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE user_id = $1 AND parent_folder_id IS NULL AND NOT is_deleted",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find root folder", e))
    }

    /// Get-or-create the user's root folder.
    ///
    /// The insert races through the partial unique index on
    /// `(user_id) WHERE parent_folder_id IS NULL AND NOT is_deleted`:
    /// the loser of a concurrent first access inserts nothing and
    /// re-reads the winner's row.
    pub async fn get_or_create_root(&self, user_id: Uuid, name: &str) -> AppResult<Folder> {
        let inserted = sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (user_id, parent_folder_id, name) \
             VALUES ($1, NULL, $2) \
             ON CONFLICT (user_id) WHERE parent_folder_id IS NULL AND NOT is_deleted \
             DO NOTHING \
             RETURNING *",
        )
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create root folder", e)
        })?;

        if let Some(folder) = inserted {
            return Ok(folder);
        }

        self.find_root(user_id).await?.ok_or_else(|| {
            AppError::integrity(format!("Root folder for user {user_id} lost after insert race"))
        })
    }

    /// Create a new folder.
    pub async fn create(&self, data: &CreateFolder) -> AppResult<Folder> {
        sqlx::query_as::<_, Folder>(
            "INSERT INTO folders (user_id, parent_folder_id, name) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.parent_folder_id)
        .bind(&data.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create folder", e))
    }

    /// List the direct, non-deleted children of a folder.
    pub async fn find_children(&self, parent_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE parent_folder_id = $1 AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list children", e))
    }

    /// List all live folders owned by a user.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders WHERE user_id = $1 AND NOT is_deleted ORDER BY name ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list folders", e))
    }

    /// Walk the ancestor chain from a folder up to the root, starting
    /// with the folder itself. The walk is bounded; a chain that exceeds
    /// the bound is returned over-length so callers classify it as a cycle.
    pub async fn ancestor_chain(&self, folder_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.ancestor_chain_on(&self.pool, folder_id).await
    }

    async fn ancestor_chain_on<'e, E>(&self, executor: E, folder_id: Uuid) -> AppResult<Vec<Uuid>>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            "WITH RECURSIVE ancestors AS ( \
                SELECT id, parent_folder_id, 1 AS depth FROM folders WHERE id = $1 \
                UNION ALL \
                SELECT f.id, f.parent_folder_id, a.depth + 1 \
                FROM folders f INNER JOIN ancestors a ON f.id = a.parent_folder_id \
                WHERE a.depth <= $2 \
             ) SELECT id FROM ancestors ORDER BY depth ASC",
        )
        .bind(folder_id)
        .bind(MAX_ANCESTOR_WALK as i64 + 1)
        .fetch_all(executor)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to walk ancestors", e))
    }

    /// Re-parent a folder, re-validating the ancestor chain inside the
    /// transaction that performs the write.
    ///
    /// The moved folder and the target parent are locked `FOR UPDATE`
    /// before the chain walk, so a racing move touching either endpoint
    /// waits until this one commits and then sees the new chain.
    pub async fn move_folder(
        &self,
        folder_id: Uuid,
        user_id: Uuid,
        new_parent_id: Uuid,
    ) -> AppResult<TreeMove> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let folder = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted FOR UPDATE",
        )
        .bind(folder_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to lock folder", e))?;

        if folder.is_none() {
            return Ok(TreeMove::FolderMissing);
        }

        let parent = sqlx::query_as::<_, Folder>(
            "SELECT * FROM folders \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted FOR UPDATE",
        )
        .bind(new_parent_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to lock target folder", e)
        })?;

        if parent.is_none() {
            return Ok(TreeMove::ParentMissing);
        }

        let chain = self.ancestor_chain_on(&mut *tx, new_parent_id).await?;

        match classify_move(folder_id, Some(new_parent_id), &chain) {
            MovePlacement::Allowed => {}
            MovePlacement::SelfMove | MovePlacement::Cycle => return Ok(TreeMove::Cycle),
        }

        let moved = sqlx::query_as::<_, Folder>(
            "UPDATE folders SET parent_folder_id = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(folder_id)
        .bind(Some(new_parent_id))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to move folder", e))?;

        tx.commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit move", e))?;

        Ok(TreeMove::Moved(moved))
    }

    /// Soft-delete a non-root folder owned by the user. Returns the
    /// marked row, or `None` when nothing matched.
    pub async fn soft_delete(&self, folder_id: Uuid, user_id: Uuid) -> AppResult<Option<Folder>> {
        sqlx::query_as::<_, Folder>(
            "UPDATE folders \
             SET is_deleted = TRUE, deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 AND NOT is_deleted \
               AND parent_folder_id IS NOT NULL \
             RETURNING *",
        )
        .bind(folder_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete folder", e))
    }
}
