use anyhow::Result;
use dispatch_service::{config::AppConfig, observability, service::Components};

/// One reconciliation of the live feed against the catalogs. Prints the
/// result as JSON; a webhook message goes out only when something drifted.
#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    let components = Components::from_config(&cfg).await?;

    let result = components.checker.check_missing_units_today().await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
