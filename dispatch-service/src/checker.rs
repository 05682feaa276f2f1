use std::sync::Arc;

use dispatch_client::domain::DispatchObservation;

use crate::notify::AnomalyNotifier;
use crate::pipeline::{PipelineError, Source};
use crate::reconcile::{reconcile, ReconciliationResult};
use crate::sources::CatalogSource;

/// Daily cross-check of the live feed against the reference catalogs.
/// Never touches the store.
pub struct MissingUnitChecker {
    feed: Arc<dyn Source<DispatchObservation>>,
    catalogs: Arc<dyn CatalogSource>,
    notifier: AnomalyNotifier,
}

impl MissingUnitChecker {
    pub fn new(
        feed: Arc<dyn Source<DispatchObservation>>,
        catalogs: Arc<dyn CatalogSource>,
        notifier: AnomalyNotifier,
    ) -> Self {
        Self {
            feed,
            catalogs,
            notifier,
        }
    }

    pub async fn check_missing_units_today(&self) -> Result<ReconciliationResult, PipelineError> {
        let snapshot = self.feed.fetch().await?;
        let observed: Vec<&str> = snapshot.iter().map(|env| env.payload.poc_code.as_str()).collect();

        let generation = self.catalogs.load_generation_catalog().await?;
        let substations = self.catalogs.load_substation_catalog().await?;

        let result = reconcile(&observed, &generation, &substations);
        record(&result);

        if result.is_clean() {
            tracing::info!(observed = observed.len(), "no connection point drift");
        } else {
            tracing::warn!(
                observed = observed.len(),
                gen_not_in_dispatch = result.generation.not_in_dispatch_list.len(),
                gen_not_in_catalog = result.generation.not_in_generator_list.len(),
                sub_not_in_dispatch = result.substations.not_in_dispatch_list.len(),
                sub_not_in_catalog = result.substations.not_in_substation_list.len(),
                "connection point drift detected"
            );
            self.notifier.notify(&result).await;
        }

        Ok(result)
    }
}

fn record(result: &ReconciliationResult) {
    let lists = [
        ("generation_not_in_dispatch", result.generation.not_in_dispatch_list.len()),
        ("generation_not_in_catalog", result.generation.not_in_generator_list.len()),
        ("substation_not_in_dispatch", result.substations.not_in_dispatch_list.len()),
        ("substation_not_in_catalog", result.substations.not_in_substation_list.len()),
    ];
    for (list, n) in lists {
        metrics::counter!("reconcile_anomalies_total", "list" => list).increment(n as u64);
    }
}
