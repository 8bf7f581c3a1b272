//! Backfill driver: `stl backfill [--start] [--end]`.
//!
//! Opt-in only. Pages that were `completely lost media` at some point in
//! the cutover window get that label written, with `backfill` provenance, on
//! every earlier revision up to the window end. Nothing else runs this step;
//! existing timeline points are not touched, so the operator rebuilds the
//! timeline afterwards.

use anyhow::Result;
use chrono::NaiveDate;

use status_timeline_core::backfill::{backfill_lost, CutoverWindow};

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

pub fn resolve_window(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<CutoverWindow> {
    let start = start.unwrap_or(config.backfill.cutover_start);
    let end = end.unwrap_or(config.backfill.cutover_end);
    Ok(CutoverWindow::from_dates(start, end)?)
}

pub async fn run_backfill(
    config: &Config,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<()> {
    let window = resolve_window(config, start, end)?;

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let report = backfill_lost(&store, window).await?;

    println!(
        "backfill {} .. {}",
        window.start().date_naive(),
        window.end().date_naive()
    );
    println!("  pages matched: {}", report.pages.len());
    println!("  revisions examined: {}", report.revisions);
    println!("  facts added: {}", report.facts_inserted);
    if report.facts_inserted > 0 {
        println!("  note: run `stl timeline --rebuild` to refresh stored counts");
    }
    println!("ok");

    pool.close().await;
    Ok(())
}
