//! Point-in-time status counts: `stl snapshot <DATE|RFC3339>`.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};

use status_timeline_core::models::start_of_day;
use status_timeline_core::snapshot::{RevisionIndex, StatusCounts};
use status_timeline_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Parse `2020-01-01` (start of that day, UTC) or a full RFC 3339 instant.
pub fn parse_instant(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }
    match DateTime::parse_from_rfc3339(s) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(_) => bail!("expected YYYY-MM-DD or an RFC 3339 timestamp, got '{}'", s),
    }
}

pub async fn snapshot_counts(store: &dyn Store, at: DateTime<Utc>) -> Result<StatusCounts> {
    let index = RevisionIndex::load(store).await?;
    Ok(index.snapshot_counts(at))
}

pub async fn run_snapshot(config: &Config, at: &str) -> Result<()> {
    let at = parse_instant(at)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    for (status, count) in snapshot_counts(&store, at).await? {
        if count > 0 {
            println!("{}\t{}", status, count);
        }
    }

    pool.close().await;
    Ok(())
}
