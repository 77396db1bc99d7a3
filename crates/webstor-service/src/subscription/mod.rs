//! Subscription resolution and plan-change lifecycle.

pub mod service;

use async_trait::async_trait;
use uuid::Uuid;

use webstor_entity::plan::Plan;
use webstor_entity::subscription::Subscription;

use crate::error::ServiceResult;

pub use service::SubscriptionService;

/// Resolves the plan currently in force for a user.
///
/// The quota accountant consumes this seam instead of the concrete
/// subscription service so its limit checks can be exercised against a
/// fixed plan in tests.
#[async_trait]
pub trait PlanResolver: Send + Sync + 'static {
    /// The user's active, non-expired subscription and its plan.
    ///
    /// Fails with `NoActiveSubscription` when the user has never been
    /// assigned a plan and with `SubscriptionExpired` when the plan has
    /// lapsed; callers surface different remediation for the two.
    async fn active_plan(&self, user_id: Uuid) -> ServiceResult<(Subscription, Plan)>;
}
