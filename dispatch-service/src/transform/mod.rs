use crate::clock::FeedZone;
use crate::pipeline::{Envelope, Filter, PipelineError};
use dispatch_client::domain::DispatchObservation;
use time::macros::datetime;

/// Pure validation of a `DispatchObservation` record.
///
/// Rules:
/// - connection point must be non-empty.
/// - load, generation and price must be finite (price may be negative).
/// - ts must be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn validate_observation(env: &Envelope<DispatchObservation>) -> Result<(), PipelineError> {
    let o = &env.payload;

    if o.poc_code.trim().is_empty() {
        return Err(PipelineError::MalformedPayload(
            "empty PointOfConnectionCode".to_string(),
        ));
    }

    if !(o.load_mw.is_finite() && o.generation_mw.is_finite() && o.dollars_per_mwh.is_finite()) {
        return Err(PipelineError::MalformedPayload(format!(
            "non-finite figures for {}",
            o.poc_code
        )));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if o.ts < min_ts || o.ts > max_ts {
        return Err(PipelineError::MalformedPayload(format!(
            "timestamp out of allowed range for {}",
            o.poc_code
        )));
    }

    Ok(())
}

/// Drops rows with zero load and zero generation, except in the first
/// interval of the trading day so every connection point keeps at least one
/// row per day.
#[derive(Debug, Clone, Copy)]
pub struct IdleIntervalFilter {
    zone: FeedZone,
}

impl IdleIntervalFilter {
    pub fn new(zone: FeedZone) -> Self {
        Self { zone }
    }
}

impl Filter<DispatchObservation> for IdleIntervalFilter {
    fn retain(&self, input: &Envelope<DispatchObservation>) -> bool {
        let o = &input.payload;
        if !o.is_idle() || self.zone.is_first_interval_of_day(o.ts) {
            return true;
        }
        metrics::counter!("dispatch_rows_dropped_idle_total").increment(1);
        false
    }
}
