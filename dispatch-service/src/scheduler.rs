use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::checker::MissingUnitChecker;
use crate::config::ScheduleConfig;
use crate::sync::DispatchSynchronizer;

/// Register the poll and the daily check. Cron expressions are evaluated in
/// UTC. A trigger that fires while the previous run of the same job is still
/// going is skipped.
pub async fn build(
    cfg: &ScheduleConfig,
    synchronizer: Arc<DispatchSynchronizer>,
    checker: Arc<MissingUnitChecker>,
) -> anyhow::Result<JobScheduler> {
    let sched = JobScheduler::new().await.context("creating scheduler")?;

    let gate = Arc::new(Mutex::new(()));
    let sync_job = Job::new_async(cfg.sync_cron.as_str(), move |_uuid, _l| {
        let synchronizer = synchronizer.clone();
        let gate = gate.clone();
        Box::pin(async move {
            let Ok(_running) = gate.try_lock() else {
                tracing::warn!("previous dispatch sync still running; skipping trigger");
                return;
            };
            if let Err(e) = synchronizer.sync().await {
                tracing::error!(error = %e, kind = e.kind(), "dispatch sync failed");
            }
        })
    })
    .with_context(|| format!("creating sync job for cron {}", cfg.sync_cron))?;
    sched.add(sync_job).await.context("adding sync job")?;

    let gate = Arc::new(Mutex::new(()));
    let check_job = Job::new_async(cfg.missing_units_cron.as_str(), move |_uuid, _l| {
        let checker = checker.clone();
        let gate = gate.clone();
        Box::pin(async move {
            let Ok(_running) = gate.try_lock() else {
                tracing::warn!("previous missing-unit check still running; skipping trigger");
                return;
            };
            if let Err(e) = checker.check_missing_units_today().await {
                tracing::error!(error = %e, kind = e.kind(), "missing-unit check failed");
            }
        })
    })
    .with_context(|| format!("creating missing-unit job for cron {}", cfg.missing_units_cron))?;
    sched.add(check_job).await.context("adding missing-unit job")?;

    Ok(sched)
}
