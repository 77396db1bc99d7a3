//! Subscription lifecycle: resolution, plan changes, cancellation, renewal.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use webstor_core::config::subscription::SubscriptionConfig;
use webstor_core::error::AppError;
use webstor_database::repositories::plan::PlanRepository;
use webstor_database::repositories::subscription::SubscriptionRepository;
use webstor_database::repositories::user::UserRepository;
use webstor_entity::plan::Plan;
use webstor_entity::subscription::{CreateSubscription, Subscription, SubscriptionStatus};

use super::PlanResolver;
use crate::error::{ServiceResult, StorageError};

/// Manages the subscription ledger for all users.
///
/// Plan changes never mutate history: the current row is marked canceled
/// and a fresh row is inserted, both inside one transaction, so readers
/// observe exactly one active subscription at all times.
#[derive(Debug, Clone)]
pub struct SubscriptionService {
    /// Subscription repository.
    subscriptions: Arc<SubscriptionRepository>,
    /// Plan repository.
    plans: Arc<PlanRepository>,
    /// User repository.
    users: Arc<UserRepository>,
    /// Billing-cycle settings.
    config: SubscriptionConfig,
}

impl SubscriptionService {
    /// Creates a new subscription service.
    pub fn new(
        subscriptions: Arc<SubscriptionRepository>,
        plans: Arc<PlanRepository>,
        users: Arc<UserRepository>,
        config: SubscriptionConfig,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            users,
            config,
        }
    }

    /// Resolve the user's current subscription and plan.
    ///
    /// Distinguishes "never assigned a plan" from "plan lapsed": the two
    /// produce different user-facing remediation. More than one active
    /// row is a data-integrity fault; it is logged and the row with the
    /// most recent start date wins deterministically.
    pub async fn active_for(&self, user_id: Uuid) -> ServiceResult<(Subscription, Plan)> {
        let rows = self.subscriptions.find_active(user_id).await?;

        let Some(current) = rows.first().cloned() else {
            return Err(StorageError::NoActiveSubscription);
        };

        if rows.len() > 1 {
            warn!(
                user_id = %user_id,
                count = rows.len(),
                chosen = %current.id,
                "Multiple active subscriptions found; using the most recently started"
            );
        }

        let now = Utc::now();
        if current.is_expired_at(now) {
            return Err(StorageError::SubscriptionExpired {
                expired_on: current.expired_on(now),
            });
        }

        let plan = self
            .plans
            .find_by_id(current.plan_id)
            .await?
            .ok_or_else(|| {
                AppError::integrity(format!(
                    "Subscription {} references missing plan {}",
                    current.id, current.plan_id
                ))
            })?;

        Ok((current, plan))
    }

    /// Full subscription history for a user, newest first.
    pub async fn history(&self, user_id: Uuid) -> ServiceResult<Vec<Subscription>> {
        Ok(self.subscriptions.find_by_user(user_id).await?)
    }

    /// Switch the user to a different plan (upgrade or downgrade).
    ///
    /// The current subscription, if any, is superseded; the new one runs
    /// for a full billing cycle from now.
    pub async fn change_plan(&self, user_id: Uuid, plan_id: Uuid) -> ServiceResult<Subscription> {
        self.require_user(user_id).await?;
        self.require_live_plan(plan_id).await?;

        let current = self.subscriptions.find_active(user_id).await?;
        let now = Utc::now();

        let created = self
            .subscriptions
            .supersede(
                current.first().map(|s| s.id),
                now,
                &self.new_cycle(user_id, plan_id),
            )
            .await?;

        info!(
            user_id = %user_id,
            plan_id = %plan_id,
            subscription_id = %created.id,
            "Plan changed"
        );

        Ok(created)
    }

    /// Cancel the user's current subscription without a replacement.
    pub async fn cancel(&self, user_id: Uuid) -> ServiceResult<Subscription> {
        let current = self.subscriptions.find_active(user_id).await?;
        let Some(current) = current.first() else {
            return Err(StorageError::NoActiveSubscription);
        };

        let canceled = self.subscriptions.cancel(current.id, Utc::now()).await?;

        info!(user_id = %user_id, subscription_id = %canceled.id, "Subscription canceled");
        Ok(canceled)
    }

    /// Renew the user's most recent subscription (even a lapsed one) for
    /// another billing cycle on the same plan.
    pub async fn renew(&self, user_id: Uuid) -> ServiceResult<Subscription> {
        let Some(latest) = self.subscriptions.find_latest(user_id).await? else {
            return Err(StorageError::NoActiveSubscription);
        };

        self.require_live_plan(latest.plan_id).await?;

        let superseded = latest.is_active.then_some(latest.id);
        let created = self
            .subscriptions
            .supersede(
                superseded,
                Utc::now(),
                &self.new_cycle(user_id, latest.plan_id),
            )
            .await?;

        info!(
            user_id = %user_id,
            plan_id = %latest.plan_id,
            subscription_id = %created.id,
            "Subscription renewed"
        );

        Ok(created)
    }

    /// Assign the configured free plan to a newly registered user.
    ///
    /// Idempotent: a user who already has an active subscription keeps it.
    pub async fn create_initial(&self, user_id: Uuid) -> ServiceResult<Subscription> {
        self.require_user(user_id).await?;

        let existing = self.subscriptions.find_active(user_id).await?;
        if let Some(existing) = existing.first() {
            warn!(user_id = %user_id, "User already has an active subscription");
            return Ok(existing.clone());
        }

        let free_plan = self
            .plans
            .find_by_name(&self.config.free_plan_name)
            .await?
            .ok_or_else(|| {
                AppError::configuration(format!(
                    "Free plan '{}' not found in the catalog",
                    self.config.free_plan_name
                ))
            })?;

        let created = self
            .subscriptions
            .create(&self.new_cycle(user_id, free_plan.id))
            .await?;

        info!(user_id = %user_id, plan = %free_plan.name, "Initial subscription created");
        Ok(created)
    }

    fn new_cycle(&self, user_id: Uuid, plan_id: Uuid) -> CreateSubscription {
        let now = Utc::now();
        CreateSubscription {
            user_id,
            plan_id,
            status: SubscriptionStatus::Active,
            is_active: true,
            auto_renew: true,
            start_date: now,
            end_date: Some(now + Duration::days(self.config.duration_days)),
        }
    }

    async fn require_user(&self, user_id: Uuid) -> ServiceResult<()> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {user_id} not found")))?;
        Ok(())
    }

    async fn require_live_plan(&self, plan_id: Uuid) -> ServiceResult<Plan> {
        let plan = self
            .plans
            .find_by_id(plan_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or(StorageError::PlanNotFound)?;
        Ok(plan)
    }
}

#[async_trait]
impl PlanResolver for SubscriptionService {
    async fn active_plan(&self, user_id: Uuid) -> ServiceResult<(Subscription, Plan)> {
        self.active_for(user_id).await
    }
}
