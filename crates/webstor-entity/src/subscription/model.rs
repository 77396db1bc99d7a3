//! Subscription entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::SubscriptionStatus;

/// A time-bounded assignment of a plan to a user.
///
/// Plan changes supersede rather than delete: the previous row is marked
/// canceled and a fresh row is inserted, so the table doubles as the
/// subscription history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: Uuid,
    /// The subscribing user.
    pub user_id: Uuid,
    /// The plan this subscription grants.
    pub plan_id: Uuid,
    /// Lifecycle status.
    pub status: SubscriptionStatus,
    /// Whether this is the user's current subscription. At most one row
    /// per user carries this flag (enforced by a partial unique index).
    pub is_active: bool,
    /// Whether the subscription renews automatically at period end.
    pub auto_renew: bool,
    /// Start of the current period.
    pub start_date: DateTime<Utc>,
    /// End of the current period (None = open-ended).
    pub end_date: Option<DateTime<Utc>>,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription has lapsed as of `now`.
    ///
    /// A subscription counts as lapsed when it is explicitly marked
    /// expired or when its end date lies in the past, regardless of the
    /// stored status.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.status == SubscriptionStatus::Expired {
            return true;
        }
        matches!(self.end_date, Some(end) if end < now)
    }

    /// The date the subscription lapsed, for expiry reporting.
    pub fn expired_on(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end_date.unwrap_or(now)
    }
}

/// Data required to create a new subscription row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubscription {
    /// The subscribing user.
    pub user_id: Uuid,
    /// The plan to grant.
    pub plan_id: Uuid,
    /// Lifecycle status for the new row.
    pub status: SubscriptionStatus,
    /// Whether the row becomes the user's current subscription.
    pub is_active: bool,
    /// Whether the subscription auto-renews.
    pub auto_renew: bool,
    /// Period start.
    pub start_date: DateTime<Utc>,
    /// Period end.
    pub end_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn subscription(status: SubscriptionStatus, end: Option<DateTime<Utc>>) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan_id: Uuid::new_v4(),
            status,
            is_active: true,
            auto_renew: true,
            start_date: now - Duration::days(10),
            end_date: end,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expired_by_status() {
        let sub = subscription(SubscriptionStatus::Expired, None);
        assert!(sub.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_expired_by_end_date_despite_active_status() {
        let yesterday = Utc::now() - Duration::days(1);
        let sub = subscription(SubscriptionStatus::Active, Some(yesterday));
        assert!(sub.is_expired_at(Utc::now()));
        assert_eq!(sub.expired_on(Utc::now()), yesterday);
    }

    #[test]
    fn test_open_ended_active_never_expires() {
        let sub = subscription(SubscriptionStatus::Active, None);
        assert!(!sub.is_expired_at(Utc::now()));
    }

    #[test]
    fn test_future_end_date_not_expired() {
        let next_month = Utc::now() + Duration::days(30);
        let sub = subscription(SubscriptionStatus::Active, Some(next_month));
        assert!(!sub.is_expired_at(Utc::now()));
    }
}
