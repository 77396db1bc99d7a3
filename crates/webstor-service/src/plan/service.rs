//! Plan catalog operations.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use webstor_core::error::AppError;
use webstor_database::repositories::plan::PlanRepository;
use webstor_entity::plan::{CreatePlan, Plan};

use crate::error::{ServiceResult, StorageError};

/// Manages the plan catalog.
///
/// Plans referenced by live subscriptions are only ever soft-deleted, so
/// historical subscriptions keep resolving their limits.
#[derive(Debug, Clone)]
pub struct PlanService {
    /// Plan repository.
    plans: Arc<PlanRepository>,
}

impl PlanService {
    /// Creates a new plan service.
    pub fn new(plans: Arc<PlanRepository>) -> Self {
        Self { plans }
    }

    /// List the live catalog, smallest storage cap first.
    pub async fn list(&self) -> ServiceResult<Vec<Plan>> {
        Ok(self.plans.find_all().await?)
    }

    /// Get a live plan by ID.
    pub async fn get(&self, plan_id: Uuid) -> ServiceResult<Plan> {
        self.plans
            .find_by_id(plan_id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or(StorageError::PlanNotFound)
    }

    /// Add a plan to the catalog.
    pub async fn create(&self, data: CreatePlan) -> ServiceResult<Plan> {
        if data.name.trim().is_empty() {
            return Err(AppError::validation("Plan name cannot be empty").into());
        }
        if data.storage_limit_bytes <= 0 || data.max_file_size_bytes <= 0 {
            return Err(AppError::validation("Plan caps must be positive").into());
        }
        if data.max_file_size_bytes > data.storage_limit_bytes {
            return Err(
                AppError::validation("Per-file cap cannot exceed the storage cap").into(),
            );
        }

        let plan = self.plans.create(&data).await?;
        info!(plan_id = %plan.id, name = %plan.name, "Plan created");
        Ok(plan)
    }

    /// Retire a plan from the catalog. Existing subscriptions keep
    /// referencing the row.
    pub async fn soft_delete(&self, plan_id: Uuid) -> ServiceResult<()> {
        if !self.plans.soft_delete(plan_id).await? {
            return Err(StorageError::PlanNotFound);
        }
        info!(plan_id = %plan_id, "Plan retired");
        Ok(())
    }
}
