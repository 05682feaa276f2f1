use anyhow::Result;
use sqlx::PgPool;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::domain::{utc_timestamp, DispatchObservation, StoredDispatchRow};

/// Latest interval already stored, or `None` for an empty table.
pub async fn last_synced(pool: &PgPool) -> Result<Option<OffsetDateTime>> {
    let ts = sqlx::query_scalar::<_, Option<PrimitiveDateTime>>(
        "SELECT max(ts) FROM real_time_dispatch",
    )
    .fetch_one(pool)
    .await?;

    Ok(ts.map(PrimitiveDateTime::assume_utc))
}

/// Fetch a time-ordered slice of stored dispatch rows.
pub async fn observations_between(
    pool: &PgPool,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Result<Vec<DispatchObservation>> {
    let rows = sqlx::query_as::<_, StoredDispatchRow>(
        r#"
        SELECT
            ts,
            poc_code,
            load_mw,
            generation_mw,
            dollars_per_mwh
        FROM real_time_dispatch
        WHERE ts >= $1
          AND ts <  $2
        ORDER BY ts, poc_code
        "#,
    )
    .bind(utc_timestamp(start))
    .bind(utc_timestamp(end))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(DispatchObservation::from).collect())
}

/// Distinct connection points reported for one interval.
pub async fn distinct_connection_points(pool: &PgPool, at: OffsetDateTime) -> Result<Vec<String>> {
    let codes = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT poc_code FROM real_time_dispatch WHERE ts = $1 ORDER BY poc_code",
    )
    .bind(utc_timestamp(at))
    .fetch_all(pool)
    .await?;

    Ok(codes)
}
