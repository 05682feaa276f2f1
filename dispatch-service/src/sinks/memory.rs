//! In-process stand-in for the dispatch table.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Mutex,
};

use dispatch_client::domain::DispatchObservation;
use time::OffsetDateTime;

use crate::pipeline::{DispatchStore, Envelope, PipelineError, Sink};

#[derive(Default)]
pub(crate) struct MemoryDispatchStore {
    rows: Mutex<Vec<DispatchObservation>>,
    fail_writes: AtomicBool,
    pub(crate) batches: AtomicUsize,
}

impl MemoryDispatchStore {
    pub(crate) fn with_rows(rows: Vec<DispatchObservation>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn rows(&self) -> Vec<DispatchObservation> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Sink<DispatchObservation> for MemoryDispatchStore {
    async fn write_batch(&self, batch: &[Envelope<DispatchObservation>]) -> Result<usize, PipelineError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PipelineError::Persistence("write rejected".to_string()));
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        rows.extend(batch.iter().map(|e| e.payload.clone()));
        Ok(batch.len())
    }
}

#[async_trait::async_trait]
impl DispatchStore for MemoryDispatchStore {
    async fn last_synced(&self) -> Result<Option<OffsetDateTime>, PipelineError> {
        Ok(self.rows.lock().unwrap().iter().map(|o| o.ts).max())
    }

    async fn observations_between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<DispatchObservation>, PipelineError> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.ts >= start && o.ts < end)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.poc_code.cmp(&b.poc_code)));
        Ok(rows)
    }

    async fn distinct_connection_points(&self, at: OffsetDateTime) -> Result<Vec<String>, PipelineError> {
        let mut codes: Vec<String> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.ts == at)
            .map(|o| o.poc_code.clone())
            .collect();
        codes.sort();
        codes.dedup();
        Ok(codes)
    }
}
