//! Domain-classified storage errors.
//!
//! Each variant carries the data a caller needs to render specific
//! remediation messaging. Infrastructure failures travel inside
//! [`StorageError::Internal`] and are reported generically; they are
//! never retried at this layer.

use chrono::{DateTime, Utc};
use thiserror::Error;

use webstor_core::error::AppError;

/// Result alias for service operations.
pub type ServiceResult<T> = Result<T, StorageError>;

/// The error taxonomy of the storage core.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The file exceeds the plan's per-file size cap.
    #[error("file of {actual_file_size} bytes exceeds the plan's per-file limit of {max_file_size} bytes")]
    FileTooLarge {
        /// The plan's per-file cap in bytes.
        max_file_size: i64,
        /// The offending file size in bytes.
        actual_file_size: i64,
    },

    /// The file does not fit in the plan's remaining storage.
    #[error("insufficient storage: need {needed} bytes but only {remaining} of {limit} remain")]
    QuotaExceeded {
        /// Bytes still available under the cap.
        remaining: i64,
        /// Bytes the operation asked for.
        needed: i64,
        /// The plan's aggregate cap in bytes.
        limit: i64,
    },

    /// The user has never been assigned a plan.
    #[error("no active subscription")]
    NoActiveSubscription,

    /// The user's plan has lapsed.
    #[error("subscription expired on {expired_on}")]
    SubscriptionExpired {
        /// When the subscription lapsed.
        expired_on: DateTime<Utc>,
    },

    /// The folder does not exist, is deleted, or belongs to someone
    /// else. Ownership violations are reported identically to absence
    /// so folder IDs cannot be probed.
    #[error("folder not found")]
    FolderNotFound,

    /// The file does not exist, is deleted, or belongs to someone else.
    #[error("file not found")]
    FileNotFound,

    /// The plan does not exist or has been retired from the catalog.
    #[error("plan not found")]
    PlanNotFound,

    /// A folder cannot be moved into itself.
    #[error("a folder cannot be moved into itself")]
    SelfMove,

    /// A folder cannot be moved under one of its own descendants.
    #[error("a folder cannot be moved under one of its own descendants")]
    FolderCycle,

    /// The root folder cannot be deleted.
    #[error("the root folder cannot be deleted")]
    RootFolderProtected,

    /// Infrastructure failure (database, cache, configuration). Not
    /// user-actionable; reported generically at the boundary.
    #[error(transparent)]
    Internal(#[from] AppError),
}

impl StorageError {
    /// Whether the end user can act on this error themselves (shrink the
    /// file, pick a plan, renew, retry with a valid target).
    pub fn is_user_actionable(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actionability() {
        let quota = StorageError::QuotaExceeded {
            remaining: 1,
            needed: 2,
            limit: 100,
        };
        assert!(quota.is_user_actionable());
        assert!(!StorageError::Internal(AppError::database("boom")).is_user_actionable());
    }

    #[test]
    fn test_messages_carry_payload() {
        let err = StorageError::FileTooLarge {
            max_file_size: 100,
            actual_file_size: 150,
        };
        let message = err.to_string();
        assert!(message.contains("150"));
        assert!(message.contains("100"));
    }
}
