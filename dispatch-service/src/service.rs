use std::{sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    api::ApiState,
    checker::MissingUnitChecker,
    clock::{Clock, SystemClock},
    config::AppConfig,
    notify::{AnomalyNotifier, WebhookSink},
    pipeline::DispatchStore,
    sinks::QuestDbDispatchStore,
    sources::{CatalogSource, EmiDispatchFeed, HttpCatalogSource},
    sync::DispatchSynchronizer,
    transform::IdleIntervalFilter,
};

/// Everything a trigger needs, wired from config.
pub struct Components {
    pub synchronizer: Arc<DispatchSynchronizer>,
    pub checker: Arc<MissingUnitChecker>,
    pub store: Arc<dyn DispatchStore>,
    pub catalogs: Arc<dyn CatalogSource>,
    pub clock: Arc<dyn Clock>,
}

impl Components {
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let zone = cfg.feed_zone()?;

        let pool = PgPoolOptions::new()
            .max_connections(cfg.questdb.max_connections)
            .connect(&cfg.questdb.uri)
            .await
            .context("connecting to QuestDB")?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.feed.timeout_secs))
            .build()
            .context("building HTTP client")?;

        let store: Arc<dyn DispatchStore> = Arc::new(QuestDbDispatchStore::new(pool));
        let feed = Arc::new(EmiDispatchFeed::new(
            http.clone(),
            cfg.feed.url.clone(),
            cfg.feed.api_key.clone(),
            zone,
        ));
        let catalogs: Arc<dyn CatalogSource> = Arc::new(HttpCatalogSource::new(
            http.clone(),
            cfg.catalogs.generators_url.clone(),
            cfg.catalogs.substations_url.clone(),
        ));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier = AnomalyNotifier::new(Arc::new(WebhookSink::new(http, cfg.notifier.webhook_url.clone())));

        if cfg.feed.api_key.is_none() {
            tracing::warn!("no feed subscription key configured; upstream will likely refuse requests");
        }

        let synchronizer = DispatchSynchronizer::new(
            feed.clone(),
            store.clone(),
            clock.clone(),
            Arc::new(IdleIntervalFilter::new(zone)),
        )
        .with_cadence(cfg.cadence());

        let checker = MissingUnitChecker::new(feed, catalogs.clone(), notifier);

        tracing::info!(zone = zone.name(), feed = %cfg.feed.url, "dispatch components ready");

        Ok(Self {
            synchronizer: Arc::new(synchronizer),
            checker: Arc::new(checker),
            store,
            catalogs,
            clock,
        })
    }

    pub fn api_state(&self) -> ApiState {
        ApiState {
            store: self.store.clone(),
            catalogs: self.catalogs.clone(),
            clock: self.clock.clone(),
        }
    }
}
