mod bootstrap;
mod health;
mod scheduler;

use std::time::Duration;

use anyhow::Result;
use bloom_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::scheduler::{MaintenanceScheduler, MaintenanceStatus};

fn init_logging(config: &AppConfig) {
    use bloom_core::config::LogFormat::*;

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be up before bootstrap so its events are captured
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let maintenance = MaintenanceStatus::new(app.config.maintenance.enabled);

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
        maintenance.clone(),
    )
    .await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if app.config.maintenance.enabled {
        let interval = Duration::from_secs(app.config.maintenance.refresh_interval_secs);
        let scheduler = MaintenanceScheduler::new(app.engine.clone(), interval, maintenance);
        Some(scheduler.spawn(shutdown_rx))
    } else {
        tracing::info!(
            event_name = "maintenance.scheduler.disabled",
            "maintenance jobs disabled by configuration"
        );
        None
    };

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "bloom-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "bloom-server stopping"
    );

    shutdown_tx.send_replace(true);
    if let Some(handle) = scheduler {
        let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
        match tokio::time::timeout(grace, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => tracing::warn!(
                event_name = "system.server.scheduler_join_failed",
                error = %error,
                "maintenance scheduler task ended abnormally"
            ),
            Err(_) => tracing::warn!(
                event_name = "system.server.shutdown_timeout",
                grace_secs = grace.as_secs(),
                "maintenance cycle still running at shutdown"
            ),
        }
    }
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
