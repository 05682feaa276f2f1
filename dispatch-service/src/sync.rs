//! Polling ingestion of the real-time dispatch feed.
//!
//! The only cursor is the newest interval already in the store, read fresh
//! on every run. A run inserts at most one interval, as one batch.

use std::sync::Arc;

use dispatch_client::domain::DispatchObservation;
use time::{Duration, OffsetDateTime};

use crate::clock::{is_poll_due, Clock, FEED_CADENCE};
use crate::pipeline::{DispatchStore, Envelope, Filter, PipelineError, Sink, Source};
use crate::transform::validate_observation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Less than one cadence since the newest stored interval; nothing fetched.
    NotDue { last_synced: OffsetDateTime },
    /// Fetched, but upstream has not published anything newer.
    UpToDate { interval: OffsetDateTime },
    /// New interval, but every row was filtered out; the cursor stays put.
    NothingToStore { interval: OffsetDateTime, dropped: usize },
    Inserted {
        interval: OffsetDateTime,
        inserted: usize,
        dropped: usize,
    },
}

pub struct DispatchSynchronizer {
    feed: Arc<dyn Source<DispatchObservation>>,
    store: Arc<dyn DispatchStore>,
    clock: Arc<dyn Clock>,
    filter: Arc<dyn Filter<DispatchObservation>>,
    cadence: Duration,
}

impl DispatchSynchronizer {
    pub fn new(
        feed: Arc<dyn Source<DispatchObservation>>,
        store: Arc<dyn DispatchStore>,
        clock: Arc<dyn Clock>,
        filter: Arc<dyn Filter<DispatchObservation>>,
    ) -> Self {
        Self {
            feed,
            store,
            clock,
            filter,
            cadence: FEED_CADENCE,
        }
    }

    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub async fn sync(&self) -> Result<SyncOutcome, PipelineError> {
        metrics::counter!("dispatch_sync_runs_total").increment(1);
        let res = self.run().await;
        if let Err(e) = &res {
            metrics::counter!("dispatch_sync_errors_total", "kind" => e.kind()).increment(1);
        }
        res
    }

    async fn run(&self) -> Result<SyncOutcome, PipelineError> {
        let last_synced = self.store.last_synced().await?;
        let now = self.clock.now();

        if let Some(last) = last_synced {
            metrics::gauge!("dispatch_last_synced_unix").set(last.unix_timestamp() as f64);

            if !is_poll_due(Some(last), now, self.cadence) {
                tracing::debug!(%last, %now, "no sync needed");
                metrics::counter!("dispatch_sync_skipped_total", "reason" => "not_due").increment(1);
                return Ok(SyncOutcome::NotDue { last_synced: last });
            }
        }

        let snapshot = self.feed.fetch().await?;
        let interval = snapshot_interval(&snapshot)?;

        if last_synced.is_some_and(|last| interval <= last) {
            tracing::info!(%interval, "up to date with the latest published interval");
            metrics::counter!("dispatch_sync_skipped_total", "reason" => "up_to_date").increment(1);
            return Ok(SyncOutcome::UpToDate { interval });
        }

        for env in &snapshot {
            validate_observation(env)?;
        }

        let total = snapshot.len();
        let batch: Vec<Envelope<DispatchObservation>> =
            snapshot.into_iter().filter(|env| self.filter.retain(env)).collect();
        let dropped = total - batch.len();

        if batch.is_empty() {
            tracing::info!(%interval, dropped, "every row filtered out, nothing to store");
            metrics::counter!("dispatch_sync_skipped_total", "reason" => "all_filtered").increment(1);
            return Ok(SyncOutcome::NothingToStore { interval, dropped });
        }

        let inserted = match self.store.write_batch(&batch).await {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    %interval,
                    rows = batch.len(),
                    first = batch.first().map(|env| env.payload.poc_code.as_str()).unwrap_or(""),
                    last = batch.last().map(|env| env.payload.poc_code.as_str()).unwrap_or(""),
                    "dispatch batch insert failed"
                );
                return Err(e);
            }
        };

        metrics::gauge!("dispatch_last_synced_unix").set(interval.unix_timestamp() as f64);
        tracing::info!(%interval, inserted, dropped, "dispatch interval stored");

        Ok(SyncOutcome::Inserted {
            interval,
            inserted,
            dropped,
        })
    }
}

/// The single interval a snapshot describes. Empty or mixed-interval
/// snapshots cannot be placed relative to the cursor.
fn snapshot_interval(snapshot: &[Envelope<DispatchObservation>]) -> Result<OffsetDateTime, PipelineError> {
    let first = snapshot
        .first()
        .ok_or_else(|| PipelineError::MalformedPayload("empty dispatch snapshot".to_string()))?
        .payload
        .ts;

    if let Some(other) = snapshot.iter().find(|e| e.payload.ts != first) {
        return Err(PipelineError::MalformedPayload(format!(
            "snapshot mixes intervals {first} and {}",
            other.payload.ts
        )));
    }

    Ok(first)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::{FeedZone, FixedClock};
    use crate::sinks::memory::MemoryDispatchStore;
    use crate::transform::IdleIntervalFilter;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };
    use time::macros::datetime;

    /// Hands out a canned snapshot and counts calls.
    #[derive(Default)]
    pub(crate) struct ScriptedFeed {
        pub(crate) snapshot: Mutex<Option<Result<Vec<DispatchObservation>, PipelineError>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedFeed {
        pub(crate) fn returning(rows: Vec<DispatchObservation>) -> Self {
            Self {
                snapshot: Mutex::new(Some(Ok(rows))),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(err: PipelineError) -> Self {
            Self {
                snapshot: Mutex::new(Some(Err(err))),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Source<DispatchObservation> for ScriptedFeed {
        async fn fetch(&self) -> Result<Vec<Envelope<DispatchObservation>>, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.snapshot.lock().unwrap().as_ref() {
                Some(Ok(rows)) => Ok(rows.iter().cloned().map(Envelope::new).collect()),
                Some(Err(e)) => Err(PipelineError::UpstreamUnavailable(e.to_string())),
                None => Ok(vec![]),
            }
        }
    }

    pub(crate) fn row(poc: &str, ts: OffsetDateTime, load_mw: f64, generation_mw: f64) -> DispatchObservation {
        DispatchObservation {
            ts,
            poc_code: poc.to_string(),
            load_mw,
            generation_mw,
            dollars_per_mwh: 140.0,
        }
    }

    struct Harness {
        feed: Arc<ScriptedFeed>,
        store: Arc<MemoryDispatchStore>,
        sync: DispatchSynchronizer,
    }

    fn harness(feed: ScriptedFeed, store: MemoryDispatchStore, now: OffsetDateTime) -> Harness {
        let feed = Arc::new(feed);
        let store = Arc::new(store);
        let zone = FeedZone::new(chrono_tz::Pacific::Auckland);
        let sync = DispatchSynchronizer::new(
            feed.clone(),
            store.clone(),
            Arc::new(FixedClock(now)),
            Arc::new(IdleIntervalFilter::new(zone)),
        );
        Harness { feed, store, sync }
    }

    // 13:10 NZST
    const NOW: OffsetDateTime = datetime!(2024-06-01 01:10:00 UTC);

    #[tokio::test]
    async fn recent_cursor_skips_the_fetch() {
        let last = NOW - Duration::minutes(3);
        let h = harness(
            ScriptedFeed::returning(vec![row("ABY0111", NOW, 1.0, 0.0)]),
            MemoryDispatchStore::with_rows(vec![row("ABY0111", last, 1.0, 0.0)]),
            NOW,
        );

        let outcome = h.sync.sync().await.unwrap();

        assert_eq!(outcome, SyncOutcome::NotDue { last_synced: last });
        assert_eq!(h.feed.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn stale_snapshot_is_fetched_but_not_inserted() {
        let last = NOW - Duration::minutes(10);
        let h = harness(
            ScriptedFeed::returning(vec![row("ABY0111", last, 1.0, 0.0)]),
            MemoryDispatchStore::with_rows(vec![row("ABY0111", last, 1.0, 0.0)]),
            NOW,
        );

        let outcome = h.sync.sync().await.unwrap();

        assert_eq!(outcome, SyncOutcome::UpToDate { interval: last });
        assert_eq!(h.feed.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.batches.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn new_interval_is_inserted_as_one_batch() {
        let last = NOW - Duration::minutes(10);
        let interval = NOW - Duration::minutes(5);
        let h = harness(
            ScriptedFeed::returning(vec![
                row("ABY0111", interval, 4.0, 0.0),
                row("HLY2201 HLY1", interval, 0.0, 240.0),
                row("QQQ0011", interval, 0.0, 0.0),
            ]),
            MemoryDispatchStore::with_rows(vec![row("ABY0111", last, 1.0, 0.0)]),
            NOW,
        );

        let outcome = h.sync.sync().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Inserted {
                interval,
                inserted: 2,
                dropped: 1
            }
        );
        assert_eq!(h.store.batches.load(Ordering::SeqCst), 1);
        let codes: Vec<String> = h.store.rows().into_iter().skip(1).map(|o| o.poc_code).collect();
        assert_eq!(codes, vec!["ABY0111", "HLY2201 HLY1"]);
    }

    #[tokio::test]
    async fn idle_rows_survive_at_first_interval_of_day() {
        // 00:00 NZST
        let midnight = datetime!(2024-05-31 12:00:00 UTC);
        let h = harness(
            ScriptedFeed::returning(vec![row("QQQ0011", midnight, 0.0, 0.0)]),
            MemoryDispatchStore::default(),
            midnight + Duration::minutes(2),
        );

        let outcome = h.sync.sync().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Inserted {
                interval: midnight,
                inserted: 1,
                dropped: 0
            }
        );
    }

    #[tokio::test]
    async fn all_idle_snapshot_stores_nothing() {
        let last = NOW - Duration::minutes(10);
        let interval = NOW - Duration::minutes(5);
        let h = harness(
            ScriptedFeed::returning(vec![row("QQQ0011", interval, 0.0, 0.0)]),
            MemoryDispatchStore::with_rows(vec![row("ABY0111", last, 1.0, 0.0)]),
            NOW,
        );

        let outcome = h.sync.sync().await.unwrap();

        assert_eq!(outcome, SyncOutcome::NothingToStore { interval, dropped: 1 });
        assert_eq!(h.store.batches.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.rows().len(), 1);
    }

    #[tokio::test]
    async fn empty_store_always_polls() {
        let h = harness(
            ScriptedFeed::returning(vec![row("ABY0111", NOW, 1.0, 0.0)]),
            MemoryDispatchStore::default(),
            NOW,
        );

        let outcome = h.sync.sync().await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Inserted { inserted: 1, .. }));
    }

    #[tokio::test]
    async fn second_run_in_same_interval_is_idempotent() {
        let last = NOW - Duration::minutes(10);
        let interval = NOW - Duration::minutes(5);
        let h = harness(
            ScriptedFeed::returning(vec![row("ABY0111", interval, 4.0, 0.0)]),
            MemoryDispatchStore::with_rows(vec![row("ABY0111", last, 1.0, 0.0)]),
            NOW,
        );

        h.sync.sync().await.unwrap();
        let again = h.sync.sync().await.unwrap();

        assert_eq!(again, SyncOutcome::NotDue { last_synced: interval });
        assert_eq!(h.store.rows().len(), 2);
    }

    #[tokio::test]
    async fn upstream_failure_is_fatal_and_writes_nothing() {
        let h = harness(
            ScriptedFeed::failing(PipelineError::UpstreamUnavailable("503".to_string())),
            MemoryDispatchStore::default(),
            NOW,
        );

        let err = h.sync.sync().await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamUnavailable(_)));
        assert!(h.store.rows().is_empty());
    }

    #[tokio::test]
    async fn empty_snapshot_is_malformed() {
        let h = harness(ScriptedFeed::returning(vec![]), MemoryDispatchStore::default(), NOW);

        let err = h.sync.sync().await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn mixed_interval_snapshot_is_malformed() {
        let h = harness(
            ScriptedFeed::returning(vec![
                row("ABY0111", NOW, 1.0, 0.0),
                row("ALB0331", NOW - Duration::minutes(5), 1.0, 0.0),
            ]),
            MemoryDispatchStore::default(),
            NOW,
        );

        let err = h.sync.sync().await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPayload(_)));
        assert!(h.store.rows().is_empty());
    }

    #[tokio::test]
    async fn invalid_row_rejects_the_whole_snapshot() {
        let h = harness(
            ScriptedFeed::returning(vec![row("ABY0111", NOW, 1.0, 0.0), row("ALB0331", NOW, f64::INFINITY, 0.0)]),
            MemoryDispatchStore::default(),
            NOW,
        );

        let err = h.sync.sync().await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedPayload(_)));
        assert!(h.store.rows().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_is_surfaced() {
        let store = MemoryDispatchStore::default();
        store.fail_writes();
        let h = harness(ScriptedFeed::returning(vec![row("ABY0111", NOW, 1.0, 0.0)]), store, NOW);

        let err = h.sync.sync().await.unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
        assert!(h.store.rows().is_empty());
    }
}
