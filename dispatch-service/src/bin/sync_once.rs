use anyhow::Result;
use dispatch_service::{config::AppConfig, observability, service::Components, sync::SyncOutcome};

/// One poll of the dispatch feed, for external schedulers.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let components = Components::from_config(&cfg).await?;

    match components.synchronizer.sync().await? {
        SyncOutcome::NotDue { last_synced } => println!("not due (last synced {last_synced})"),
        SyncOutcome::UpToDate { interval } => println!("up to date ({interval})"),
        SyncOutcome::NothingToStore { interval, dropped } => {
            println!("nothing to store for {interval} ({dropped} idle rows dropped)")
        }
        SyncOutcome::Inserted {
            interval,
            inserted,
            dropped,
        } => println!("stored {inserted} rows for {interval} ({dropped} idle rows dropped)"),
    }

    Ok(())
}
