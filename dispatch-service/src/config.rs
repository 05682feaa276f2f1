use anyhow::Context;
use serde::Deserialize;
use std::fs;

use crate::clock::FeedZone;

pub const FEED_API_KEY_ENV: &str = "DISPATCH_FEED_API_KEY";
pub const WEBHOOK_URL_ENV: &str = "DISPATCH_WEBHOOK_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct QuestDbConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    #[serde(default = "default_cadence_secs")]
    pub cadence_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub generators_url: String,
    pub substations_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_sync_cron")]
    pub sync_cron: String,
    #[serde(default = "default_missing_units_cron")]
    pub missing_units_cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sync_cron: default_sync_cron(),
            missing_units_cron: default_missing_units_cron(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub questdb: QuestDbConfig,
    pub feed: FeedConfig,
    pub catalogs: CatalogConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub api: Option<ApiConfig>,
    pub metrics: Option<MetricsConfig>,
}

fn default_time_zone() -> String {
    "Pacific/Auckland".to_string()
}

fn default_cadence_secs() -> u64 {
    300
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_sync_cron() -> String {
    // sec min hour dom mon dow
    "0 * * * * *".to_string()
}

fn default_missing_units_cron() -> String {
    "0 0 20 * * *".to_string()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("DISPATCH_CONFIG").unwrap_or_else(|_| "dispatch-config.toml".to_string());
        let contents = fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        let mut cfg = Self::from_toml(&contents)?;
        cfg.apply_env_overrides(|key| env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents).context("parsing dispatch config")?;
        cfg.feed_zone()?;
        Ok(cfg)
    }

    /// Secrets are usually injected through the environment rather than the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(FEED_API_KEY_ENV) {
            self.feed.api_key = Some(key);
        }
        if let Some(url) = lookup(WEBHOOK_URL_ENV) {
            self.notifier.webhook_url = Some(url);
        }
    }

    pub fn feed_zone(&self) -> anyhow::Result<FeedZone> {
        FeedZone::from_name(&self.feed.time_zone)
    }

    pub fn cadence(&self) -> time::Duration {
        time::Duration::seconds(self.feed.cadence_secs as i64)
    }
}
