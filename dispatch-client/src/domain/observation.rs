use serde::Serialize;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// One connection point's figures for one five-minute interval.
///
/// Serialized with the upstream feed's field names so the read API hands
/// back the same shape the feed publishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchObservation {
    #[serde(rename = "FiveMinuteIntervalDatetime", with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    #[serde(rename = "PointOfConnectionCode")]
    pub poc_code: String,
    #[serde(rename = "SPDLoadMegawatt")]
    pub load_mw: f64,
    #[serde(rename = "SPDGenerationMegawatt")]
    pub generation_mw: f64,
    #[serde(rename = "DollarsPerMegawattHour")]
    pub dollars_per_mwh: f64,
}

impl DispatchObservation {
    /// Neither consuming nor producing anything this interval.
    pub fn is_idle(&self) -> bool {
        self.load_mw == 0.0 && self.generation_mw == 0.0
    }
}

/// A `real_time_dispatch` row as QuestDB returns it. The designated
/// timestamp comes back as `timestamp without time zone` holding UTC.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredDispatchRow {
    pub ts: PrimitiveDateTime,
    pub poc_code: String,
    pub load_mw: f64,
    pub generation_mw: f64,
    pub dollars_per_mwh: f64,
}

impl From<StoredDispatchRow> for DispatchObservation {
    fn from(row: StoredDispatchRow) -> Self {
        Self {
            ts: row.ts.assume_utc(),
            poc_code: row.poc_code,
            load_mw: row.load_mw,
            generation_mw: row.generation_mw,
            dollars_per_mwh: row.dollars_per_mwh,
        }
    }
}

/// Wall-clock UTC form of `ts`, as stored in a `TIMESTAMP` column.
pub fn utc_timestamp(ts: OffsetDateTime) -> PrimitiveDateTime {
    let utc = ts.to_offset(UtcOffset::UTC);
    PrimitiveDateTime::new(utc.date(), utc.time())
}
