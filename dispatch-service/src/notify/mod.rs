use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::reconcile::ReconciliationResult;

pub const SUBSTATION_NOT_IN_CATALOG: &str = "Substations in dispatch but not in the substation list";
pub const SUBSTATION_NOT_IN_DISPATCH: &str = "Substations in the substation list but not in dispatch";
pub const GENERATOR_NOT_IN_CATALOG: &str = "Generators in dispatch but not in the generator list";
pub const GENERATOR_NOT_IN_DISPATCH: &str = "Generators in the generator list but not in dispatch";

/// Somewhere a line of text can be posted.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync {
    async fn post(&self, text: &str) -> Result<()>;
}

/// Slack-compatible incoming webhook: `POST {"text": ...}`.
pub struct WebhookSink {
    webhook_url: Option<String>,
    client: Client,
}

impl WebhookSink {
    pub fn new(client: Client, webhook_url: Option<String>) -> Self {
        Self { webhook_url, client }
    }
}

#[async_trait::async_trait]
impl NotificationSink for WebhookSink {
    async fn post(&self, text: &str) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("webhook disabled (no notifier.webhook_url)");
            return Ok(());
        };

        let body = serde_json::json!({ "text": text });
        self.client
            .post(url)
            .json(&body)
            .send()
            .await
            .context("webhook post")?
            .error_for_status()
            .context("webhook non-2xx")?;
        Ok(())
    }
}

/// Render every non-empty list under its label. `None` when there is
/// nothing to report.
pub fn format_message(result: &ReconciliationResult) -> Option<String> {
    let sections = [
        (SUBSTATION_NOT_IN_CATALOG, &result.substations.not_in_substation_list),
        (SUBSTATION_NOT_IN_DISPATCH, &result.substations.not_in_dispatch_list),
        (GENERATOR_NOT_IN_CATALOG, &result.generation.not_in_generator_list),
        (GENERATOR_NOT_IN_DISPATCH, &result.generation.not_in_dispatch_list),
    ];

    let body: Vec<String> = sections
        .iter()
        .filter(|(_, ids)| !ids.is_empty())
        .map(|(label, ids)| format!("*{label}* ({}): {}", ids.len(), ids.join(", ")))
        .collect();

    if body.is_empty() {
        return None;
    }
    Some(format!("Connection point drift detected\n{}", body.join("\n")))
}

#[derive(Clone)]
pub struct AnomalyNotifier {
    sink: Arc<dyn NotificationSink>,
}

impl AnomalyNotifier {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Post a summary of `result`. Delivery failures are logged and
    /// swallowed; the return value only says whether a message went out.
    pub async fn notify(&self, result: &ReconciliationResult) -> bool {
        let Some(text) = format_message(result) else {
            return false;
        };

        match self.sink.post(&text).await {
            Ok(()) => {
                tracing::info!(anomalies = result.anomaly_count(), "drift notification sent");
                true
            }
            Err(e) => {
                metrics::counter!("notify_failures_total").increment(1);
                tracing::warn!(error = %format!("{e:#}"), "drift notification failed");
                false
            }
        }
    }
}
