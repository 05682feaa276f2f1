use chrono::{DateTime, NaiveDateTime, Offset, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use time::{Duration, OffsetDateTime, UtcOffset};

/// The feed publishes one interval every five minutes.
pub const INTERVAL_MINUTES: u32 = 5;

pub const FEED_CADENCE: Duration = Duration::minutes(INTERVAL_MINUTES as i64);

/// Offset-less layouts the feed has been seen to publish.
const LOCAL_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A poll can only yield new data once a full cadence has passed since the
/// newest stored interval. An empty store is always due.
pub fn is_poll_due(last_synced: Option<OffsetDateTime>, now: OffsetDateTime, cadence: Duration) -> bool {
    match last_synced {
        Some(last) => now - last > cadence,
        None => true,
    }
}

/// The market's reference time zone. Trading days start at local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedZone(Tz);

impl FeedZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn from_name(name: &str) -> anyhow::Result<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("unknown time zone {name:?}: {e}"))?;
        Ok(Self(tz))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// True for the interval starting at local midnight.
    pub fn is_first_interval_of_day(&self, ts: OffsetDateTime) -> bool {
        match to_chrono(ts) {
            Some(utc) => {
                let local = utc.with_timezone(&self.0);
                local.hour() == 0 && local.minute() < INTERVAL_MINUTES
            }
            None => false,
        }
    }

    /// Resolve a wall-clock timestamp without an offset in this zone.
    ///
    /// Ambiguous times (DST fall-back) take the earlier instant; times that
    /// fall in the DST gap do not exist and yield `None`.
    pub fn resolve_local(&self, raw: &str) -> Option<OffsetDateTime> {
        let naive = LOCAL_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
        let local = self.0.from_local_datetime(&naive).earliest()?;
        from_chrono(local)
    }
}

fn to_chrono(ts: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.unix_timestamp(), ts.nanosecond())
}

fn from_chrono(local: DateTime<Tz>) -> Option<OffsetDateTime> {
    let offset = UtcOffset::from_whole_seconds(local.offset().fix().local_minus_utc()).ok()?;
    OffsetDateTime::from_unix_timestamp(local.timestamp())
        .ok()?
        .replace_nanosecond(local.timestamp_subsec_nanos())
        .ok()
        .map(|ts| ts.to_offset(offset))
}

#[cfg(test)]
pub(crate) struct FixedClock(pub OffsetDateTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
