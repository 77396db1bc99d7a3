//! Point-in-time quota snapshot value object.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's quota position under their current plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// The user this snapshot describes.
    pub user_id: Uuid,
    /// The plan in effect.
    pub plan_id: Uuid,
    /// Plan display name.
    pub plan_name: String,
    /// Per-file size cap in bytes.
    pub max_file_size_bytes: i64,
    /// Aggregate storage cap in bytes.
    pub storage_limit_bytes: i64,
    /// Bytes currently in use.
    pub used_bytes: i64,
    /// Bytes still available (never negative).
    pub remaining_bytes: i64,
    /// Usage as a percentage of the cap (capped at 100).
    pub usage_percent: f64,
    /// When the current subscription period ends.
    pub subscription_ends_at: Option<DateTime<Utc>>,
}

impl QuotaSnapshot {
    /// Build a snapshot from plan caps and the current counter value.
    pub fn new(
        user_id: Uuid,
        plan_id: Uuid,
        plan_name: String,
        max_file_size_bytes: i64,
        storage_limit_bytes: i64,
        used_bytes: i64,
        subscription_ends_at: Option<DateTime<Utc>>,
    ) -> Self {
        let remaining_bytes = (storage_limit_bytes - used_bytes).max(0);
        let usage_percent = if storage_limit_bytes > 0 {
            ((used_bytes as f64 / storage_limit_bytes as f64) * 100.0).min(100.0)
        } else {
            0.0
        };

        Self {
            user_id,
            plan_id,
            plan_name,
            max_file_size_bytes,
            storage_limit_bytes,
            used_bytes,
            remaining_bytes,
            usage_percent,
            subscription_ends_at,
        }
    }

    /// Check if adding the given number of bytes would exceed the cap.
    pub fn would_exceed(&self, additional_bytes: i64) -> bool {
        additional_bytes > self.remaining_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(limit: i64, used: i64) -> QuotaSnapshot {
        QuotaSnapshot::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Free".to_string(),
            100_000_000,
            limit,
            used,
            None,
        )
    }

    #[test]
    fn test_remaining_clamped_at_zero() {
        let snap = snapshot(1_000, 1_500);
        assert_eq!(snap.remaining_bytes, 0);
        assert_eq!(snap.usage_percent, 100.0);
    }

    #[test]
    fn test_usage_percent() {
        let snap = snapshot(2_000, 500);
        assert_eq!(snap.remaining_bytes, 1_500);
        assert_eq!(snap.usage_percent, 25.0);
    }

    #[test]
    fn test_would_exceed_at_boundary() {
        let snap = snapshot(5_000_000_000, 4_999_999_999);
        assert!(!snap.would_exceed(1));
        assert!(snap.would_exceed(2));
    }

    #[test]
    fn test_zero_limit() {
        let snap = snapshot(0, 0);
        assert_eq!(snap.usage_percent, 0.0);
        assert!(snap.would_exceed(1));
    }
}
