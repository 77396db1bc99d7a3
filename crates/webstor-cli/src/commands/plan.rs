//! Plan catalog administration commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use webstor_core::error::AppError;
use webstor_database::repositories::plan::PlanRepository;
use webstor_entity::plan::{BillingPeriod, CreatePlan};
use webstor_service::PlanService;

/// Arguments for plan commands
#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Plan subcommand
    #[command(subcommand)]
    pub command: PlanCommand,
}

/// Plan subcommands
#[derive(Debug, Subcommand)]
pub enum PlanCommand {
    /// List the live plan catalog
    List,
    /// Add a new plan
    Add {
        /// Plan name
        #[arg(short, long)]
        name: String,
        /// Aggregate storage cap in bytes
        #[arg(long)]
        storage_limit: i64,
        /// Per-file size cap in bytes
        #[arg(long)]
        max_file_size: i64,
        /// Price per billing period in cents
        #[arg(long, default_value_t = 0)]
        price_cents: i64,
        /// Bill yearly instead of monthly
        #[arg(long)]
        yearly: bool,
    },
    /// Retire a plan from the catalog (soft delete)
    Retire {
        /// Plan ID
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

/// Plan display row
#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    /// Plan ID
    id: String,
    /// Name
    name: String,
    /// Storage cap
    storage_limit: i64,
    /// Per-file cap
    max_file_size: i64,
    /// Billing period
    billing: String,
    /// Price in cents
    price_cents: i64,
}

/// Execute plan commands
pub async fn execute(args: &PlanArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let pool = super::create_db_pool(&config).await?;
    let service = PlanService::new(Arc::new(PlanRepository::new(pool)));

    match &args.command {
        PlanCommand::List => {
            let plans = service
                .list()
                .await
                .map_err(|e| AppError::internal(format!("Failed to list plans: {e}")))?;

            let rows: Vec<PlanRow> = plans
                .iter()
                .map(|p| PlanRow {
                    id: p.id.to_string(),
                    name: p.name.clone(),
                    storage_limit: p.storage_limit_bytes,
                    max_file_size: p.max_file_size_bytes,
                    billing: format!("{:?}", p.billing_period).to_lowercase(),
                    price_cents: p.price_cents,
                })
                .collect();

            output::print_list(&rows, format);
        }
        PlanCommand::Add {
            name,
            storage_limit,
            max_file_size,
            price_cents,
            yearly,
        } => {
            let plan = service
                .create(CreatePlan {
                    name: name.clone(),
                    storage_limit_bytes: *storage_limit,
                    max_file_size_bytes: *max_file_size,
                    billing_period: if *yearly {
                        BillingPeriod::Yearly
                    } else {
                        BillingPeriod::Monthly
                    },
                    price_cents: *price_cents,
                })
                .await
                .map_err(|e| AppError::internal(format!("Failed to create plan: {e}")))?;

            output::print_success(&format!("Plan '{}' created with ID {}", plan.name, plan.id));
        }
        PlanCommand::Retire { id, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Retire plan {id} from the catalog?"))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            service
                .soft_delete(*id)
                .await
                .map_err(|e| AppError::internal(format!("Failed to retire plan: {e}")))?;
            output::print_success("Plan retired.");
        }
    }

    Ok(())
}
