//! Usage ledger trait for atomic per-user storage accounting.

use async_trait::async_trait;
use uuid::Uuid;

use crate::result::AppResult;

/// Outcome of releasing previously reserved bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReleaseOutcome {
    /// Counter value after the release.
    pub used_bytes: i64,
    /// Whether the counter had to be clamped at zero. A clamp means an
    /// earlier reservation was lost and the ledger needs reconciling.
    pub clamped: bool,
}

/// Trait for the per-user storage usage counter.
///
/// Every mutation of `storage_used_bytes` in the system goes through this
/// seam. Implementations must guarantee that `try_reserve` performs its
/// check-then-increment as a single atomic step with respect to concurrent
/// calls for the same user. Two implementations are provided:
/// - PostgreSQL (conditional row update on the users table)
/// - In-memory (using `tokio::sync::Mutex`, single-node and test use)
#[async_trait]
pub trait UsageLedger: Send + Sync + 'static {
    /// Current counter value for a user.
    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64>;

    /// Atomically add `delta_bytes` to the counter if the result stays
    /// within `limit_bytes`. Returns `false`, leaving the counter
    /// untouched, when the headroom is insufficient or the user is
    /// unknown.
    async fn try_reserve(
        &self,
        user_id: Uuid,
        delta_bytes: i64,
        limit_bytes: i64,
    ) -> AppResult<bool>;

    /// Subtract `delta_bytes` from the counter, clamping at zero.
    async fn release(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<ReleaseOutcome>;
}
