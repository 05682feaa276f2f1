use std::time::SystemTime;

use dispatch_client::domain::DispatchObservation;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub received_at: SystemTime,
}

impl<T> Envelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            received_at: SystemTime::now(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl PipelineError {
    /// Short label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable(_) => "upstream_unavailable",
            Self::MalformedPayload(_) => "malformed_payload",
            Self::Persistence(_) => "persistence",
        }
    }
}

/// A polled upstream that hands back one complete snapshot per call.
#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Envelope<T>>, PipelineError>;
}

/// Row-level predicate applied between fetch and persist.
pub trait Filter<T>: Send + Sync {
    fn retain(&self, input: &Envelope<T>) -> bool;
}

/// All-or-nothing batch writer. Returns the number of rows committed.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn write_batch(&self, batch: &[Envelope<T>]) -> Result<usize, PipelineError>;
}

/// The dispatch table: the batch sink plus the reads the engine and the
/// query API need.
#[async_trait::async_trait]
pub trait DispatchStore: Sink<DispatchObservation> {
    async fn last_synced(&self) -> Result<Option<OffsetDateTime>, PipelineError>;

    async fn observations_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<DispatchObservation>, PipelineError>;

    async fn distinct_connection_points(&self, at: OffsetDateTime) -> Result<Vec<String>, PipelineError>;
}
