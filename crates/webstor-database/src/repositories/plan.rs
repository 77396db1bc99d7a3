//! Plan repository implementation.

use sqlx::PgPool;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_entity::plan::model::{CreatePlan, Plan};

/// Repository for the plan catalog.
#[derive(Debug, Clone)]
pub struct PlanRepository {
    pool: PgPool,
}

impl PlanRepository {
    /// Create a new plan repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a plan by ID, deleted or not. Subscriptions may still
    /// reference soft-deleted plans.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find plan", e))
    }

    /// Find a live plan by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<Plan>> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE name = $1 AND NOT is_deleted")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find plan by name", e)
            })
    }

    /// List live plans, smallest storage cap first.
    pub async fn find_all(&self) -> AppResult<Vec<Plan>> {
        sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE NOT is_deleted ORDER BY storage_limit_bytes ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list plans", e))
    }

    /// Create a new plan.
    pub async fn create(&self, data: &CreatePlan) -> AppResult<Plan> {
        sqlx::query_as::<_, Plan>(
            "INSERT INTO plans (name, storage_limit_bytes, max_file_size_bytes, billing_period, price_cents) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&data.name)
        .bind(data.storage_limit_bytes)
        .bind(data.max_file_size_bytes)
        .bind(data.billing_period)
        .bind(data.price_cents)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.constraint() == Some("plans_name_key") => {
                AppError::conflict(format!("A plan named '{}' already exists", data.name))
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create plan", e),
        })
    }

    /// Soft-delete a plan. Returns `false` if no live plan matched.
    pub async fn soft_delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE plans SET is_deleted = TRUE, updated_at = NOW() \
             WHERE id = $1 AND NOT is_deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete plan", e))?;
        Ok(result.rows_affected() > 0)
    }
}
