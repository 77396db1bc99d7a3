//! User repository and the PostgreSQL usage ledger.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_core::traits::usage_ledger::{ReleaseOutcome, UsageLedger};
use webstor_entity::user::model::User;

/// Repository for user rows and the storage usage counter.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND NOT is_deleted")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    /// Reset one user's counter to the sum of their live file sizes.
    ///
    /// This is the drift repair for the usage invariant; normal operation
    /// never needs it. Returns the corrected counter value.
    pub async fn recalculate_usage(&self, user_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE users u \
             SET storage_used_bytes = ( \
                 SELECT COALESCE(SUM(file_size), 0) FROM files f \
                 WHERE f.user_id = u.id AND NOT f.is_deleted \
             ), updated_at = NOW() \
             WHERE u.id = $1 \
             RETURNING storage_used_bytes",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to recalculate usage", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    /// Reset every user's counter to the sum of their live file sizes.
    /// Returns the number of users touched.
    pub async fn recalculate_all_usage(&self) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE users u \
             SET storage_used_bytes = ( \
                 SELECT COALESCE(SUM(file_size), 0) FROM files f \
                 WHERE f.user_id = u.id AND NOT f.is_deleted \
             ), updated_at = NOW()",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to recalculate usage", e)
        })?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl UsageLedger for UserRepository {
    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT storage_used_bytes FROM users WHERE id = $1 AND NOT is_deleted",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read usage", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))
    }

    async fn try_reserve(
        &self,
        user_id: Uuid,
        delta_bytes: i64,
        limit_bytes: i64,
    ) -> AppResult<bool> {
        // Single conditional update: the headroom check and the increment
        // commit together or not at all, so concurrent reservations for
        // the same user serialize on the row without an explicit lock.
        let result = sqlx::query(
            "UPDATE users \
             SET storage_used_bytes = storage_used_bytes + $2, updated_at = NOW() \
             WHERE id = $1 AND NOT is_deleted \
               AND storage_used_bytes + $2 <= $3",
        )
        .bind(user_id)
        .bind(delta_bytes)
        .bind(limit_bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to reserve storage", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<ReleaseOutcome> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let previous = sqlx::query_scalar::<_, i64>(
            "SELECT storage_used_bytes FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read usage", e))?
        .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;

        let clamped = previous < delta_bytes;
        let next = (previous - delta_bytes).max(0);

        sqlx::query("UPDATE users SET storage_used_bytes = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(next)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to release storage", e)
            })?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit release", e)
        })?;

        if clamped {
            warn!(
                user_id = %user_id,
                released = delta_bytes,
                previous = previous,
                "Usage counter clamped at zero during release"
            );
        }

        Ok(ReleaseOutcome {
            used_bytes: next,
            clamped,
        })
    }
}
