//! Quota validation and atomic reservation against plan limits.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use webstor_core::error::AppError;
use webstor_core::traits::usage_ledger::UsageLedger;
use webstor_entity::quota::QuotaSnapshot;

use crate::error::{ServiceResult, StorageError};
use crate::subscription::PlanResolver;

/// Gatekeeper for every byte entering or leaving a user's storage.
///
/// All mutation paths funnel through `reserve`/`release`, so the per-user
/// counter can only move through the ledger's atomic operations. The
/// check-then-increment of a reservation is a single atomic step in the
/// ledger; validating headroom in application code and writing the new
/// counter separately would race and is deliberately not expressible here.
#[derive(Clone)]
pub struct QuotaService {
    /// Source of the plan currently in force.
    plans: Arc<dyn PlanResolver>,
    /// The per-user usage counter.
    ledger: Arc<dyn UsageLedger>,
}

impl std::fmt::Debug for QuotaService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaService").finish()
    }
}

impl QuotaService {
    /// Creates a new quota service.
    pub fn new(plans: Arc<dyn PlanResolver>, ledger: Arc<dyn UsageLedger>) -> Self {
        Self { plans, ledger }
    }

    /// Validate and reserve `delta_bytes` for a user.
    ///
    /// Fails fast when the subscription is absent or lapsed, then checks
    /// the per-file cap, then atomically claims the bytes against the
    /// aggregate cap. On refusal the current headroom is reported so the
    /// caller can render exact remediation.
    pub async fn reserve(&self, user_id: Uuid, delta_bytes: i64) -> ServiceResult<()> {
        if delta_bytes < 0 {
            return Err(AppError::validation("Reservation delta must be non-negative").into());
        }

        let (_, plan) = self.plans.active_plan(user_id).await?;

        if delta_bytes > plan.max_file_size_bytes {
            return Err(StorageError::FileTooLarge {
                max_file_size: plan.max_file_size_bytes,
                actual_file_size: delta_bytes,
            });
        }

        if delta_bytes == 0 {
            return Ok(());
        }

        if !self
            .ledger
            .try_reserve(user_id, delta_bytes, plan.storage_limit_bytes)
            .await?
        {
            let used = self.ledger.used_bytes(user_id).await?;
            return Err(StorageError::QuotaExceeded {
                remaining: (plan.storage_limit_bytes - used).max(0),
                needed: delta_bytes,
                limit: plan.storage_limit_bytes,
            });
        }

        debug!(user_id = %user_id, reserved = delta_bytes, "Storage reserved");
        Ok(())
    }

    /// Return `delta_bytes` to the user's headroom.
    ///
    /// Always succeeds; a counter that would go negative is clamped at
    /// zero and logged, since it means an earlier reservation was lost.
    pub async fn release(&self, user_id: Uuid, delta_bytes: i64) -> ServiceResult<()> {
        if delta_bytes <= 0 {
            return Ok(());
        }

        let outcome = self.ledger.release(user_id, delta_bytes).await?;
        if outcome.clamped {
            warn!(
                user_id = %user_id,
                released = delta_bytes,
                "Usage counter clamped at zero during release; ledger needs reconciling"
            );
        }

        debug!(user_id = %user_id, released = delta_bytes, "Storage released");
        Ok(())
    }

    /// The user's current quota position.
    pub async fn snapshot(&self, user_id: Uuid) -> ServiceResult<QuotaSnapshot> {
        let (subscription, plan) = self.plans.active_plan(user_id).await?;
        let used = self.ledger.used_bytes(user_id).await?;

        Ok(QuotaSnapshot::new(
            user_id,
            plan.id,
            plan.name.clone(),
            plan.max_file_size_bytes,
            plan.storage_limit_bytes,
            used,
            subscription.end_date,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use webstor_entity::plan::{BillingPeriod, Plan};
    use webstor_entity::subscription::{Subscription, SubscriptionStatus};

    use crate::quota::MemoryUsageLedger;

    const GB5: i64 = 5_000_000_000;
    const MB100: i64 = 100_000_000;

    /// Plan resolver pinned to one outcome, standing in for the ledgered
    /// subscription lookup.
    struct FixedPlan {
        outcome: Result<(i64, i64), StorageError>,
    }

    impl FixedPlan {
        fn free() -> Self {
            Self::with_caps(GB5, MB100)
        }

        fn with_caps(storage_limit: i64, max_file_size: i64) -> Self {
            Self {
                outcome: Ok((storage_limit, max_file_size)),
            }
        }

        fn failing(err: StorageError) -> Self {
            Self { outcome: Err(err) }
        }
    }

    #[async_trait]
    impl PlanResolver for FixedPlan {
        async fn active_plan(&self, user_id: Uuid) -> ServiceResult<(Subscription, Plan)> {
            let (limit, max_file) = match &self.outcome {
                Ok(caps) => *caps,
                Err(StorageError::NoActiveSubscription) => {
                    return Err(StorageError::NoActiveSubscription);
                }
                Err(StorageError::SubscriptionExpired { expired_on }) => {
                    return Err(StorageError::SubscriptionExpired {
                        expired_on: *expired_on,
                    });
                }
                Err(_) => unreachable!("unexpected stub outcome"),
            };

            let now = Utc::now();
            let plan = Plan {
                id: Uuid::new_v4(),
                name: "Free".to_string(),
                storage_limit_bytes: limit,
                max_file_size_bytes: max_file,
                billing_period: BillingPeriod::Monthly,
                price_cents: 0,
                is_deleted: false,
                created_at: now,
                updated_at: now,
            };
            let subscription = Subscription {
                id: Uuid::new_v4(),
                user_id,
                plan_id: plan.id,
                status: SubscriptionStatus::Active,
                is_active: true,
                auto_renew: true,
                start_date: now,
                end_date: Some(now + Duration::days(30)),
                created_at: now,
                updated_at: now,
            };
            Ok((subscription, plan))
        }
    }

    fn service_with(plans: FixedPlan) -> (QuotaService, Arc<MemoryUsageLedger>) {
        let ledger = Arc::new(MemoryUsageLedger::new());
        let service = QuotaService::new(Arc::new(plans), ledger.clone());
        (service, ledger)
    }

    #[tokio::test]
    async fn test_reserve_within_limits() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();

        service.reserve(user, 1_000).await.unwrap();
        assert_eq!(ledger.used_bytes(user).await.unwrap(), 1_000);
    }

    #[tokio::test]
    async fn test_quota_exceeded_reports_exact_headroom() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();
        ledger.set_used(user, GB5 - 1).await;

        let err = service.reserve(user, 2).await.unwrap_err();
        match err {
            StorageError::QuotaExceeded {
                remaining,
                needed,
                limit,
            } => {
                assert_eq!(remaining, 1);
                assert_eq!(needed, 2);
                assert_eq!(limit, GB5);
            }
            other => panic!("expected QuotaExceeded, got {other:?}"),
        }
        // The refused reservation must not move the counter.
        assert_eq!(ledger.used_bytes(user).await.unwrap(), GB5 - 1);
    }

    #[tokio::test]
    async fn test_file_too_large_regardless_of_headroom() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();

        let err = service.reserve(user, 150_000_000).await.unwrap_err();
        match err {
            StorageError::FileTooLarge {
                max_file_size,
                actual_file_size,
            } => {
                assert_eq!(max_file_size, MB100);
                assert_eq!(actual_file_size, 150_000_000);
            }
            other => panic!("expected FileTooLarge, got {other:?}"),
        }
        assert_eq!(ledger.used_bytes(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_expired_subscription_blocks_reserve() {
        let yesterday = Utc::now() - Duration::days(1);
        let (service, _) = service_with(FixedPlan::failing(StorageError::SubscriptionExpired {
            expired_on: yesterday,
        }));

        let err = service.reserve(Uuid::new_v4(), 2).await.unwrap_err();
        match err {
            StorageError::SubscriptionExpired { expired_on } => {
                assert_eq!(expired_on, yesterday);
            }
            other => panic!("expected SubscriptionExpired, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_absent_subscription_blocks_reserve() {
        let (service, _) = service_with(FixedPlan::failing(StorageError::NoActiveSubscription));
        let err = service.reserve(Uuid::new_v4(), 2).await.unwrap_err();
        assert!(matches!(err, StorageError::NoActiveSubscription));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_cannot_jointly_pass() {
        // Plan limit L, two concurrent reservations of L/2 + 1 each:
        // at most one may succeed.
        let limit = GB5;
        let half_plus_one = limit / 2 + 1;
        let (service, ledger) = service_with(FixedPlan::with_caps(limit, limit));
        let user = Uuid::new_v4();

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.reserve(user, half_plus_one).await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.reserve(user, half_plus_one).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let granted = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(granted, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(StorageError::QuotaExceeded { .. })
        )));
        assert_eq!(ledger.used_bytes(user).await.unwrap(), half_plus_one);
    }

    #[tokio::test]
    async fn test_usage_invariant_over_upload_delete_sequence() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();

        // Mixed uploads and deletes; the counter tracks the live sum.
        service.reserve(user, 500).await.unwrap();
        service.reserve(user, 300).await.unwrap();
        service.release(user, 500).await.unwrap();
        service.reserve(user, 200).await.unwrap();
        service.release(user, 300).await.unwrap();

        assert_eq!(ledger.used_bytes(user).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_repeated_release_never_goes_negative() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();

        service.reserve(user, 100).await.unwrap();
        for _ in 0..3 {
            service.release(user, 100).await.unwrap();
        }
        assert_eq!(ledger.used_bytes(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_plan_and_usage() {
        let (service, ledger) = service_with(FixedPlan::free());
        let user = Uuid::new_v4();
        ledger.set_used(user, 1_000_000_000).await;

        let snapshot = service.snapshot(user).await.unwrap();
        assert_eq!(snapshot.storage_limit_bytes, GB5);
        assert_eq!(snapshot.used_bytes, 1_000_000_000);
        assert_eq!(snapshot.remaining_bytes, GB5 - 1_000_000_000);
        assert_eq!(snapshot.usage_percent, 20.0);
    }
}
