use dispatch_client::domain::{PlantSite, SubstationEntry};
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::fetch_body;
use crate::pipeline::PipelineError;

/// Ground-truth topology. Implementations must not cache: every call reflects
/// the catalog as it is now.
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_generation_catalog(&self) -> Result<Vec<PlantSite>, PipelineError>;

    async fn load_substation_catalog(&self) -> Result<Vec<SubstationEntry>, PipelineError>;
}

/// Catalogs published as JSON documents over HTTP.
#[derive(Clone)]
pub struct HttpCatalogSource {
    client: Client,
    generators_url: String,
    substations_url: String,
}

impl HttpCatalogSource {
    pub fn new(client: Client, generators_url: impl Into<String>, substations_url: impl Into<String>) -> Self {
        Self {
            client,
            generators_url: generators_url.into(),
            substations_url: substations_url.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, PipelineError> {
        let body = fetch_body(self.client.get(url), what).await?;
        serde_json::from_slice(&body).map_err(|e| PipelineError::MalformedPayload(format!("{what}: {e}")))
    }
}

#[async_trait::async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn load_generation_catalog(&self) -> Result<Vec<PlantSite>, PipelineError> {
        let plants: Vec<PlantSite> = self.get_json(&self.generators_url, "generator_catalog").await?;
        tracing::debug!(
            plants = plants.len(),
            units = plants.iter().map(|p| p.units.len()).sum::<usize>(),
            "loaded generator catalog"
        );
        Ok(plants)
    }

    async fn load_substation_catalog(&self) -> Result<Vec<SubstationEntry>, PipelineError> {
        let subs: Vec<SubstationEntry> = self.get_json(&self.substations_url, "substation_catalog").await?;
        tracing::debug!(substations = subs.len(), "loaded substation catalog");
        Ok(subs)
    }
}
