//! Storage usage inspection and reconciliation commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use crate::output::{self, OutputFormat};
use webstor_core::error::AppError;
use webstor_core::types::pagination::PageRequest;
use webstor_database::repositories::file_event::FileEventRepository;
use webstor_database::repositories::plan::PlanRepository;
use webstor_database::repositories::subscription::SubscriptionRepository;
use webstor_database::repositories::user::UserRepository;
use webstor_service::{QuotaService, SubscriptionService};

/// Arguments for usage commands
#[derive(Debug, Args)]
pub struct UsageArgs {
    /// Usage subcommand
    #[command(subcommand)]
    pub command: UsageCommand,
}

/// Usage subcommands
#[derive(Debug, Subcommand)]
pub enum UsageCommand {
    /// Show a user's quota position under their current plan
    Show {
        /// User ID
        user: Uuid,
    },
    /// Recompute usage counters from live file sizes
    Recalc {
        /// Limit to one user (all users when omitted)
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// List a user's file events (audit trail)
    Events {
        /// User ID
        user: Uuid,
        /// Page number
        #[arg(long, default_value_t = 1)]
        page: u64,
    },
}

/// File event display row
#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    /// Event date
    date: String,
    /// Action
    action: String,
    /// File ID
    file: String,
    /// Size in bytes
    size: String,
}

/// Execute usage commands
pub async fn execute(args: &UsageArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let pool = super::create_db_pool(&config).await?;
    let users = Arc::new(UserRepository::new(pool.clone()));

    match &args.command {
        UsageCommand::Show { user } => {
            let subscriptions = Arc::new(SubscriptionService::new(
                Arc::new(SubscriptionRepository::new(pool.clone())),
                Arc::new(PlanRepository::new(pool.clone())),
                users.clone(),
                config.subscription.clone(),
            ));
            let quota = QuotaService::new(subscriptions, users);

            let snapshot = quota
                .snapshot(*user)
                .await
                .map_err(|e| AppError::internal(format!("Failed to read quota: {e}")))?;

            output::print_item(&snapshot, format);
        }
        UsageCommand::Recalc { user } => match user {
            Some(user_id) => {
                let corrected = users.recalculate_usage(*user_id).await?;
                output::print_success(&format!(
                    "Usage for {user_id} reset to {corrected} bytes"
                ));
            }
            None => {
                let touched = users.recalculate_all_usage().await?;
                output::print_success(&format!("Usage recalculated for {touched} users"));
            }
        },
        UsageCommand::Events { user, page } => {
            let events = FileEventRepository::new(pool.clone());
            let response = events
                .find_for_user(*user, &PageRequest::new(*page, 25))
                .await?;

            let rows: Vec<EventRow> = response
                .items
                .iter()
                .map(|e| EventRow {
                    date: e.event_date.to_rfc3339(),
                    action: e.action.to_string(),
                    file: e
                        .file_id
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    size: e
                        .file_size
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();

            output::print_list(&rows, format);
            println!(
                "page {} of {} ({} events)",
                response.page, response.total_pages, response.total_items
            );
        }
    }

    Ok(())
}
