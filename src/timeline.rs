//! Timeline driver: `stl timeline [--start] [--end] [--rebuild]`.
//!
//! The range is validated before the database is opened. Without
//! `--rebuild` the run supplements what is stored: points already present
//! are left alone and reported as unchanged. `--rebuild` deletes the
//! range's points first, which is how counts that went stale (after a
//! backfill or a re-categorize) get replaced.

use anyhow::Result;
use chrono::NaiveDate;

use status_timeline_core::store::Store;
use status_timeline_core::timeline::{build_timeline, DateRange, TimelineReport};

use crate::config::Config;
use crate::db;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sqlite_store::SqliteStore;

/// Resolve the effective range: CLI overrides fall back to the config.
pub fn resolve_range(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<DateRange> {
    let start = start.unwrap_or(config.timeline.start);
    let end = end.unwrap_or(config.timeline.end);
    Ok(DateRange::new(start, end)?)
}

/// Build (or rebuild) the timeline for `range` in `store`.
pub async fn rebuild_timeline(
    store: &dyn Store,
    range: DateRange,
    rebuild: bool,
    reporter: &dyn ProgressReporter,
) -> Result<(u64, TimelineReport)> {
    let deleted = if rebuild {
        let n = store.delete_timeline_points(range).await?;
        tracing::info!(deleted = n, "cleared timeline range");
        n
    } else {
        0
    };

    let report = build_timeline(store, range, |n, total| {
        if n % 100 == 0 || n == total {
            reporter.report(ProgressEvent::Working {
                step: "timeline",
                unit: "days",
                n,
                total,
            });
        }
    })
    .await?;

    Ok((deleted, report))
}

pub async fn run_timeline(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    rebuild: bool,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let range = resolve_range(config, start, end)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let (deleted, report) = rebuild_timeline(&store, range, rebuild, reporter).await?;

    println!("timeline {} .. {}", range.start(), range.end());
    println!("  days: {}", report.days);
    if rebuild {
        println!("  points deleted: {}", deleted);
    }
    println!("  points inserted: {}", report.points_inserted);
    println!("  points unchanged: {}", report.points_unchanged);
    if report.points_stale > 0 {
        println!(
            "  points stale: {} (re-run with --rebuild to replace)",
            report.points_stale
        );
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
