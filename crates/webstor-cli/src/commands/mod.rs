//! CLI command definitions and dispatch.

pub mod migrate;
pub mod plan;
pub mod usage;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use webstor_core::error::AppError;

/// WebStor multi-tenant file storage backend
#[derive(Debug, Parser)]
#[command(name = "webstor", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (config/<env>.toml)
    #[arg(short, long, default_value = "local")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Plan catalog administration
    Plan(plan::PlanArgs),
    /// Storage usage inspection and reconciliation
    Usage(usage::UsageArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &self.env).await,
            Commands::Plan(args) => plan::execute(args, &self.env, self.format).await,
            Commands::Usage(args) => usage::execute(args, &self.env, self.format).await,
        }
    }
}

/// Helper: load configuration for the selected environment
pub fn load_config(env: &str) -> Result<webstor_core::config::AppConfig, AppError> {
    webstor_core::config::AppConfig::load(env)
}

/// Helper: create database pool from config
pub async fn create_db_pool(
    config: &webstor_core::config::AppConfig,
) -> Result<sqlx::PgPool, AppError> {
    let pool = webstor_database::connection::DatabasePool::connect(&config.database).await?;
    Ok(pool.into_pool())
}
