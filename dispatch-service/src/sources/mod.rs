pub mod catalog;
pub mod dispatch_feed;

pub use catalog::{CatalogSource, HttpCatalogSource};
pub use dispatch_feed::EmiDispatchFeed;

use std::time::Instant;

use reqwest::RequestBuilder;

use crate::pipeline::PipelineError;

/// Send `request` and return the body of a 2xx response. Transport failures
/// and non-success statuses are both `UpstreamUnavailable`.
pub(crate) async fn fetch_body(request: RequestBuilder, what: &str) -> Result<Vec<u8>, PipelineError> {
    let started = Instant::now();

    let response = request.send().await.map_err(|e| {
        metrics::counter!("upstream_fetch_failed_total", "source" => what.to_string()).increment(1);
        PipelineError::UpstreamUnavailable(format!("{what} request failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        metrics::counter!("upstream_fetch_failed_total", "source" => what.to_string()).increment(1);
        return Err(PipelineError::UpstreamUnavailable(format!(
            "{what} returned {status}"
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| PipelineError::UpstreamUnavailable(format!("{what} body read failed: {e}")))?;

    metrics::histogram!("upstream_fetch_seconds", "source" => what.to_string())
        .record(started.elapsed().as_secs_f64());

    Ok(body.to_vec())
}
