//! # Metricly API Main Entry Point
//!
//! Serves the API by default; `migrate` and `seed` manage the database.

use clap::{Parser, Subcommand};
use metricly::{
    config::ConfigLoader,
    db,
    migration::{Migrator, MigratorTrait},
    seeds,
    server::run_server,
    telemetry,
};

#[derive(Parser)]
#[command(name = "metricly")]
#[command(about = "Metricly analytics API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API and background scheduler
    Serve,
    /// Manage database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Insert the system report templates
    Seed,
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Roll back the most recent migrations
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and reapply all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from layered env files and variables
    let config = ConfigLoader::new().load()?;
    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Migrate { action } => {
            let connection = db::init_pool(&config).await?;
            match action {
                MigrateAction::Up => Migrator::up(&connection, None).await?,
                MigrateAction::Down { steps } => Migrator::down(&connection, Some(steps)).await?,
                MigrateAction::Status => Migrator::status(&connection).await?,
                MigrateAction::Fresh => Migrator::fresh(&connection).await?,
            }
            tracing::info!("Migration command completed");
            Ok(())
        }
        Command::Seed => {
            let connection = db::init_pool(&config).await?;
            let inserted = seeds::seed_report_templates(&connection).await?;
            tracing::info!(inserted, "Seeding completed");
            Ok(())
        }
    }
}
