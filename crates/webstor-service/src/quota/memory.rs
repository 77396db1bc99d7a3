//! In-memory usage ledger using a Tokio mutex for single-node use.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use webstor_core::result::AppResult;
use webstor_core::traits::usage_ledger::{ReleaseOutcome, UsageLedger};

/// In-memory usage ledger.
///
/// The mutex linearizes the check-then-increment of `try_reserve`, so
/// concurrent reservations for the same user can never jointly overshoot
/// the limit. Suitable for single-node deployments and tests; multi-node
/// deployments use the database-backed ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryUsageLedger {
    /// Per-user counters.
    state: Arc<Mutex<HashMap<Uuid, i64>>>,
}

impl MemoryUsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user's counter (bootstrap from persisted state).
    pub async fn set_used(&self, user_id: Uuid, bytes: i64) {
        self.state.lock().await.insert(user_id, bytes.max(0));
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn used_bytes(&self, user_id: Uuid) -> AppResult<i64> {
        Ok(*self.state.lock().await.get(&user_id).unwrap_or(&0))
    }

    async fn try_reserve(
        &self,
        user_id: Uuid,
        delta_bytes: i64,
        limit_bytes: i64,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let used = state.entry(user_id).or_insert(0);
        if *used + delta_bytes > limit_bytes {
            return Ok(false);
        }
        *used += delta_bytes;
        Ok(true)
    }

    async fn release(&self, user_id: Uuid, delta_bytes: i64) -> AppResult<ReleaseOutcome> {
        let mut state = self.state.lock().await;
        let used = state.entry(user_id).or_insert(0);
        let clamped = *used < delta_bytes;
        *used = (*used - delta_bytes).max(0);
        Ok(ReleaseOutcome {
            used_bytes: *used,
            clamped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_within_limit() {
        let ledger = MemoryUsageLedger::new();
        let user = Uuid::new_v4();
        assert!(ledger.try_reserve(user, 40, 100).await.unwrap());
        assert!(ledger.try_reserve(user, 60, 100).await.unwrap());
        assert_eq!(ledger.used_bytes(user).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_reserve_over_limit_leaves_counter_untouched() {
        let ledger = MemoryUsageLedger::new();
        let user = Uuid::new_v4();
        assert!(ledger.try_reserve(user, 90, 100).await.unwrap());
        assert!(!ledger.try_reserve(user, 11, 100).await.unwrap());
        assert_eq!(ledger.used_bytes(user).await.unwrap(), 90);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_cannot_jointly_overshoot() {
        let ledger = MemoryUsageLedger::new();
        let user = Uuid::new_v4();
        let limit = 100i64;
        let half_plus_one = limit / 2 + 1;

        let a = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.try_reserve(user, half_plus_one, limit).await })
        };
        let b = {
            let ledger = ledger.clone();
            tokio::spawn(async move { ledger.try_reserve(user, half_plus_one, limit).await })
        };

        let granted = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        assert_eq!(granted.iter().filter(|ok| **ok).count(), 1);
        assert_eq!(ledger.used_bytes(user).await.unwrap(), half_plus_one);
    }

    #[tokio::test]
    async fn test_release_clamps_at_zero() {
        let ledger = MemoryUsageLedger::new();
        let user = Uuid::new_v4();
        ledger.set_used(user, 10).await;

        let first = ledger.release(user, 10).await.unwrap();
        assert_eq!(first.used_bytes, 0);
        assert!(!first.clamped);

        // Double-delete: the second release finds nothing left.
        let second = ledger.release(user, 10).await.unwrap();
        assert_eq!(second.used_bytes, 0);
        assert!(second.clamped);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let ledger = MemoryUsageLedger::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        assert!(ledger.try_reserve(alice, 100, 100).await.unwrap());
        assert!(ledger.try_reserve(bob, 100, 100).await.unwrap());
        assert_eq!(ledger.used_bytes(alice).await.unwrap(), 100);
        assert_eq!(ledger.used_bytes(bob).await.unwrap(), 100);
    }
}
