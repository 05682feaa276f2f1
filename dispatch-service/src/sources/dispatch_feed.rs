use dispatch_client::domain::DispatchObservation;
use reqwest::Client;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::fetch_body;
use crate::clock::FeedZone;
use crate::pipeline::{Envelope, PipelineError, Source};

pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Real-time dispatch API. Every call returns the latest published interval
/// for every connection point.
#[derive(Clone)]
pub struct EmiDispatchFeed {
    client: Client,
    url: String,
    subscription_key: Option<String>,
    zone: FeedZone,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct IncomingDispatchRow {
    point_of_connection_code: String,
    five_minute_interval_datetime: String,
    #[serde(rename = "SPDLoadMegawatt")]
    spd_load_megawatt: f64,
    #[serde(rename = "SPDGenerationMegawatt")]
    spd_generation_megawatt: f64,
    dollars_per_megawatt_hour: f64,
}

impl IncomingDispatchRow {
    fn into_observation(self, zone: FeedZone) -> Result<DispatchObservation, PipelineError> {
        Ok(DispatchObservation {
            ts: parse_interval(&self.five_minute_interval_datetime, zone)?,
            poc_code: self.point_of_connection_code,
            load_mw: self.spd_load_megawatt,
            generation_mw: self.spd_generation_megawatt,
            dollars_per_mwh: self.dollars_per_megawatt_hour,
        })
    }
}

impl EmiDispatchFeed {
    pub fn new(client: Client, url: impl Into<String>, subscription_key: Option<String>, zone: FeedZone) -> Self {
        Self {
            client,
            url: url.into(),
            subscription_key,
            zone,
        }
    }
}

/// Interval start as published: RFC 3339 when an offset is present,
/// otherwise wall-clock time in the feed zone.
pub fn parse_interval(raw: &str, zone: FeedZone) -> Result<OffsetDateTime, PipelineError> {
    OffsetDateTime::parse(raw, &Rfc3339)
        .ok()
        .or_else(|| zone.resolve_local(raw))
        .ok_or_else(|| {
            PipelineError::MalformedPayload(format!(
                "unparseable interval timestamp {raw:?} (zone {})",
                zone.name()
            ))
        })
}

pub fn parse_snapshot(body: &[u8], zone: FeedZone) -> Result<Vec<Envelope<DispatchObservation>>, PipelineError> {
    let rows: Vec<IncomingDispatchRow> = serde_json::from_slice(body)
        .map_err(|e| PipelineError::MalformedPayload(format!("dispatch snapshot: {e}")))?;

    rows.into_iter()
        .map(|row| row.into_observation(zone).map(Envelope::new))
        .collect()
}

#[async_trait::async_trait]
impl Source<DispatchObservation> for EmiDispatchFeed {
    async fn fetch(&self) -> Result<Vec<Envelope<DispatchObservation>>, PipelineError> {
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.subscription_key {
            request = request.header(SUBSCRIPTION_KEY_HEADER, key);
        }

        let body = fetch_body(request, "dispatch_feed").await?;
        let snapshot = parse_snapshot(&body, self.zone)?;
        tracing::debug!(rows = snapshot.len(), "fetched dispatch snapshot");
        Ok(snapshot)
    }
}
