use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use report_service_api::app::{create_app, AppState, Backend};
use report_service_api::config::Config;
use report_service_api::jobs::{JobScheduler, PoolMetricsJob, TokenSweepJob};
use report_service_api::middleware;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics()?;

    info!(
        environment = %config.environment,
        "Starting report service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let pool = persistence::db::create_pool(&config.database.pool_config())
        .await
        .context("failed to connect to the database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;

    let addr = config.socket_addr()?;
    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    let sweep_interval_secs = config.reports.sweep_interval_secs;

    let state = AppState::new(config, Backend::postgres(pool.clone()))?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(TokenSweepJob::new(state.sweeper.clone(), sweep_interval_secs));
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(shutdown_timeout).await;
    pool.close().await;

    info!("Report service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
