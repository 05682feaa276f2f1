//! Read-only HTTP view of the stored dispatch data.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dispatch_client::domain::DispatchObservation;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::clock::{Clock, FEED_CADENCE};
use crate::pipeline::{DispatchStore, PipelineError};
use crate::reconcile::{reconcile, ReconciliationResult};
use crate::sources::CatalogSource;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn DispatchStore>,
    pub catalogs: Arc<dyn CatalogSource>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaReport {
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_synced: Option<OffsetDateTime>,
    pub reconciliation: ReconciliationResult,
}

struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PipelineError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::UpstreamUnavailable(_) | PipelineError::MalformedPayload(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!(error = %self.0, %status, "api request failed");
        (status, self.0.to_string()).into_response()
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route("/dispatch", get(recent_dispatch))
        .route("/dispatch/delta", get(dispatch_delta))
        .with_state(state)
}

pub fn spawn(bind_addr: &str, state: ApiState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .with_context(|| format!("invalid api bind address {bind_addr:?}"))?;
    let app = router(state);

    tokio::spawn(async move {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                    tracing::error!(error = %e, "dispatch api server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to bind dispatch api listener");
            }
        }
    });

    Ok(())
}

/// Everything stored for the last day.
async fn recent_dispatch(State(state): State<ApiState>) -> Result<Json<Vec<DispatchObservation>>, ApiError> {
    let now = state.clock.now();
    let rows = state
        .store
        .observations_between(now - Duration::days(1), now + FEED_CADENCE)
        .await?;
    Ok(Json(rows))
}

/// Reconciliation of the connection points stored for the newest interval.
async fn dispatch_delta(State(state): State<ApiState>) -> Result<Json<DeltaReport>, ApiError> {
    let last_synced = state.store.last_synced().await?;
    let observed = match last_synced {
        Some(ts) => state.store.distinct_connection_points(ts).await?,
        None => Vec::new(),
    };

    let generation = state.catalogs.load_generation_catalog().await?;
    let substations = state.catalogs.load_substation_catalog().await?;

    Ok(Json(DeltaReport {
        last_synced,
        reconciliation: reconcile(&observed, &generation, &substations),
    }))
}
