use anyhow::{Context, Result};
use dispatch_service::{api, config::AppConfig, metrics_server, observability, scheduler, service::Components};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let components = Components::from_config(&cfg).await?;

    if let Some(api_cfg) = &cfg.api {
        api::spawn(&api_cfg.bind_addr, components.api_state())?;
    }

    let mut sched = scheduler::build(
        &cfg.schedule,
        components.synchronizer.clone(),
        components.checker.clone(),
    )
    .await?;
    sched.start().await.context("starting scheduler")?;

    tracing::info!(
        sync_cron = %cfg.schedule.sync_cron,
        missing_units_cron = %cfg.schedule.missing_units_cron,
        "dispatch service running"
    );

    tokio::signal::ctrl_c().await.context("waiting for shutdown signal")?;
    tracing::info!("shutting down");
    sched.shutdown().await.context("stopping scheduler")?;

    Ok(())
}
