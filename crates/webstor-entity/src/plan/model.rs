//! Plan entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Billing cadence of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_period", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    /// Billed every cycle (30 days).
    Monthly,
    /// Billed once per year.
    Yearly,
}

/// A subscription tier defining storage caps and pricing.
///
/// Plans are immutable once referenced by a live subscription, except for
/// the soft-delete flag. Rows are never physically removed while
/// subscriptions reference them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    /// Unique plan identifier.
    pub id: Uuid,
    /// Plan display name (unique).
    pub name: String,
    /// Aggregate storage cap in bytes.
    pub storage_limit_bytes: i64,
    /// Per-file size cap in bytes.
    pub max_file_size_bytes: i64,
    /// Billing cadence.
    pub billing_period: BillingPeriod,
    /// Price per billing period, in cents.
    pub price_cents: i64,
    /// Soft-delete flag; deleted plans are hidden from the catalog.
    pub is_deleted: bool,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// When the plan was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a new plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlan {
    /// Plan display name.
    pub name: String,
    /// Aggregate storage cap in bytes.
    pub storage_limit_bytes: i64,
    /// Per-file size cap in bytes.
    pub max_file_size_bytes: i64,
    /// Billing cadence.
    pub billing_period: BillingPeriod,
    /// Price per billing period, in cents.
    pub price_cents: i64,
}
