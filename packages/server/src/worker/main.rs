// Main entry point for the background worker

use std::sync::Arc;

use anyhow::{Context, Result};
use server_core::kernel::jobs::JobScheduler;
use server_core::kernel::WorkerDeps;
use server_core::{worker, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Brilha Limpeza background worker");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Wire dependencies and register jobs
    let deps = WorkerDeps::postgres(pool, &config);
    let scheduler = Arc::new(JobScheduler::new(deps.executions.clone()));
    worker::register_jobs(&scheduler, &deps, &config).await;

    // Start the poll loop and hold until shutdown
    scheduler.start();
    tracing::info!("Worker running, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received");
    scheduler.stop();

    Ok(())
}
