//! Subscription status enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a subscription row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// The subscription is current.
    Active,
    /// Superseded by a plan change or explicitly canceled. History rows
    /// keep this status forever.
    Canceled,
    /// The billing period ran out without renewal.
    Expired,
    /// Trial period before first payment.
    Trialing,
}

impl SubscriptionStatus {
    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Trialing => "trialing",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = webstor_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "canceled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            "trialing" => Ok(Self::Trialing),
            _ => Err(webstor_core::AppError::validation(format!(
                "Invalid subscription status: '{s}'. Expected one of: active, canceled, expired, trialing"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(
            "active".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Active
        );
        assert_eq!(
            "EXPIRED".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::Expired
        );
        assert!("invalid".parse::<SubscriptionStatus>().is_err());
    }
}
