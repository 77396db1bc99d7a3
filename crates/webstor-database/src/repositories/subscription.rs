//! Subscription repository implementation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use webstor_core::error::{AppError, ErrorKind};
use webstor_core::result::AppResult;
use webstor_entity::subscription::model::{CreateSubscription, Subscription};

/// Repository for subscription rows and supersede transactions.
#[derive(Debug, Clone)]
pub struct SubscriptionRepository {
    pool: PgPool,
}

impl SubscriptionRepository {
    /// Create a new subscription repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the rows flagged active for a user, most recent start first.
    ///
    /// The schema permits at most one; the service treats anything beyond
    /// a single row as an integrity fault and picks the first
    /// deterministically.
    pub async fn find_active(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 AND is_active \
             ORDER BY start_date DESC, created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find active subscription", e)
        })
    }

    /// Find a user's most recently created subscription, any status.
    pub async fn find_latest(&self, user_id: Uuid) -> AppResult<Option<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find latest subscription", e)
        })
    }

    /// Full subscription history for a user, newest first.
    pub async fn find_by_user(&self, user_id: Uuid) -> AppResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "SELECT * FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list subscriptions", e)
        })
    }

    /// Insert a subscription row outside of any supersede (initial
    /// assignment on registration).
    pub async fn create(&self, data: &CreateSubscription) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions \
             (user_id, plan_id, status, is_active, auto_renew, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(data.user_id)
        .bind(data.plan_id)
        .bind(data.status)
        .bind(data.is_active)
        .bind(data.auto_renew)
        .bind(data.start_date)
        .bind(data.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_active_conflict)
    }

    /// Replace a user's current subscription in one transaction.
    ///
    /// Marks `superseded_id` canceled (when given) and inserts the new
    /// row. Readers never observe a state with zero or two active rows:
    /// both writes commit together, and the partial unique index on
    /// `(user_id) WHERE is_active` rejects the insert if another writer
    /// slipped in an active row concurrently.
    pub async fn supersede(
        &self,
        superseded_id: Option<Uuid>,
        ended_at: DateTime<Utc>,
        new: &CreateSubscription,
    ) -> AppResult<Subscription> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        if let Some(current_id) = superseded_id {
            sqlx::query(
                "UPDATE subscriptions \
                 SET status = 'canceled', is_active = FALSE, end_date = $2, updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(current_id)
            .bind(ended_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to cancel subscription", e)
            })?;
        }

        let created = sqlx::query_as::<_, Subscription>(
            "INSERT INTO subscriptions \
             (user_id, plan_id, status, is_active, auto_renew, start_date, end_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
        )
        .bind(new.user_id)
        .bind(new.plan_id)
        .bind(new.status)
        .bind(new.is_active)
        .bind(new.auto_renew)
        .bind(new.start_date)
        .bind(new.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_active_conflict)?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit plan change", e)
        })?;

        Ok(created)
    }

    /// Cancel a subscription in place (no replacement row).
    pub async fn cancel(
        &self,
        subscription_id: Uuid,
        ended_at: DateTime<Utc>,
    ) -> AppResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            "UPDATE subscriptions \
             SET status = 'canceled', is_active = FALSE, end_date = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING *",
        )
        .bind(subscription_id)
        .bind(ended_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to cancel subscription", e)
        })?
        .ok_or_else(|| AppError::not_found(format!("Subscription {subscription_id} not found")))
    }
}

/// Map the one-active-per-user constraint to a conflict error.
fn map_active_conflict(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err)
            if db_err.constraint() == Some("subscriptions_one_active_per_user") =>
        {
            AppError::conflict("User already has an active subscription")
        }
        _ => AppError::with_source(ErrorKind::Database, "Failed to create subscription", e),
    }
}
