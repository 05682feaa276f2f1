use dispatch_client::{
    db::dispatch_queries,
    domain::{utc_timestamp, DispatchObservation},
};
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::pipeline::{DispatchStore, Envelope, PipelineError, Sink};

/// `real_time_dispatch` in QuestDB, spoken to over pgwire.
#[derive(Clone)]
pub struct QuestDbDispatchStore {
    pool: PgPool,
}

impl QuestDbDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_batch(&self, batch: &[Envelope<DispatchObservation>]) -> Result<(), sqlx::Error> {
        let mut builder = build_insert(batch);

        // One statement inside one transaction: the whole interval lands or none of it does.
        let mut tx = self.pool.begin().await?;
        builder.build().execute(&mut *tx).await?;
        tx.commit().await
    }
}

/// Multi-row insert for a non-empty batch.
fn build_insert(batch: &[Envelope<DispatchObservation>]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO real_time_dispatch (ts, poc_code, load_mw, generation_mw, dollars_per_mwh) ",
    );

    builder.push_values(batch, |mut b, env| {
        let o = &env.payload;
        b.push_bind(utc_timestamp(o.ts))
            .push_bind(&o.poc_code)
            .push_bind(o.load_mw)
            .push_bind(o.generation_mw)
            .push_bind(o.dollars_per_mwh);
    });

    builder
}

#[async_trait::async_trait]
impl Sink<DispatchObservation> for QuestDbDispatchStore {
    async fn write_batch(&self, batch: &[Envelope<DispatchObservation>]) -> Result<usize, PipelineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        match self.insert_batch(batch).await {
            Ok(()) => {
                metrics::counter!("dispatch_rows_inserted_total").increment(batch.len() as u64);

                if let Some(min_received) = batch.iter().map(|e| e.received_at).min() {
                    if let Ok(dur) = std::time::SystemTime::now().duration_since(min_received) {
                        metrics::histogram!("dispatch_write_latency_seconds").record(dur.as_secs_f64());
                    }
                }

                Ok(batch.len())
            }
            Err(e) => {
                metrics::counter!("questdb_sink_errors_total").increment(1);
                Err(PipelineError::Persistence(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl DispatchStore for QuestDbDispatchStore {
    async fn last_synced(&self) -> Result<Option<OffsetDateTime>, PipelineError> {
        dispatch_queries::last_synced(&self.pool)
            .await
            .map_err(|e| PipelineError::Persistence(format!("{e:#}")))
    }

    async fn observations_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<DispatchObservation>, PipelineError> {
        dispatch_queries::observations_between(&self.pool, start, end)
            .await
            .map_err(|e| PipelineError::Persistence(format!("{e:#}")))
    }

    async fn distinct_connection_points(&self, at: OffsetDateTime) -> Result<Vec<String>, PipelineError> {
        dispatch_queries::distinct_connection_points(&self.pool, at)
            .await
            .map_err(|e| PipelineError::Persistence(format!("{e:#}")))
    }
}
