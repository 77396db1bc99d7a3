//! Subscription and folder-provisioning configuration.

use serde::{Deserialize, Serialize};

/// Subscription billing-cycle and tenant-provisioning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Length of one billing cycle in days.
    #[serde(default = "default_duration_days")]
    pub duration_days: i64,
    /// Name of the plan assigned to newly registered users.
    #[serde(default = "default_free_plan")]
    pub free_plan_name: String,
    /// Reserved name for the lazily provisioned per-user root folder.
    #[serde(default = "default_root_folder")]
    pub root_folder_name: String,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            duration_days: default_duration_days(),
            free_plan_name: default_free_plan(),
            root_folder_name: default_root_folder(),
        }
    }
}

fn default_duration_days() -> i64 {
    30
}

fn default_free_plan() -> String {
    "Free".to_string()
}

fn default_root_folder() -> String {
    "Root".to_string()
}
