// Main entry point for the dispatch API server

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server_core::config::Config;
use server_core::domains::bookings::models::PostgresBookingStore;
use server_core::domains::vendors::models::PostgresVendorDirectory;
use server_core::kernel::scheduled_tasks::start_scheduler;
use server_core::kernel::{LogNotifier, ServerDeps};
use server_core::server::build_app;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting dispatch API");

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    let deps = Arc::new(ServerDeps::new(
        config.dispatch.clone(),
        Arc::new(PostgresBookingStore::new(pool.clone())),
        Arc::new(PostgresVendorDirectory::new(pool.clone())),
        Arc::new(LogNotifier),
    ));

    // Keep the scheduler handle alive for the lifetime of the process
    let _scheduler = start_scheduler(deps.clone())
        .await
        .context("Failed to start scheduler")?;

    let app = build_app(pool, deps);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
