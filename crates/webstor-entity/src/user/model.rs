//! User entity model.
//!
//! Only the fields the storage core needs are modeled here; identity and
//! credential management live behind an external boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A tenant of the storage system.
///
/// `storage_used_bytes` is a running counter that must always equal the
/// sum of `file_size` over the user's non-deleted files. Every mutation
/// goes through the usage ledger; direct writes elsewhere are a defect.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Contact email.
    pub email: String,
    /// Running total of bytes held by non-deleted files.
    pub storage_used_bytes: i64,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
    /// When the user was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}
