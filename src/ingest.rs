//! Revision ingestion: `stl sync`.
//!
//! Pulls pages and their revision history from a [`RevisionSource`] into the
//! store. Revisions are append-only and every write is an idempotent upsert,
//! so an interrupted sync is resumed by running it again. A per-page
//! checkpoint (the highest revision id seen) keeps repeat runs incremental;
//! `--full` ignores it.

use anyhow::{Context, Result};

use status_timeline_core::store::Store;

use crate::config::Config;
use crate::connector_wiki::WikiSource;
use crate::db;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sqlite_store::SqliteStore;
use crate::traits::RevisionSource;

/// Outcome of one sync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: u64,
    pub revisions_fetched: u64,
    pub revisions_inserted: u64,
}

/// Copy pages and revisions from `source` into `store`.
///
/// With `limit`, only the first `limit` pages (in listing order) have their
/// revisions fetched; every listed page is still recorded.
pub async fn sync_source(
    store: &dyn Store,
    source: &dyn RevisionSource,
    full: bool,
    limit: Option<usize>,
    reporter: &dyn ProgressReporter,
) -> Result<SyncReport> {
    reporter.report(ProgressEvent::Discovering { step: "sync" });
    let pages = source.list_pages().await?;
    tracing::info!(source = source.name(), pages = pages.len(), "listed pages");

    for page in &pages {
        store.upsert_page(page).await?;
    }

    let selected = match limit {
        Some(n) => &pages[..n.min(pages.len())],
        None => &pages[..],
    };
    let total = selected.len() as u64;

    let mut report = SyncReport {
        pages: pages.len() as u64,
        ..SyncReport::default()
    };

    for (i, page) in selected.iter().enumerate() {
        let after = if full {
            None
        } else {
            store.checkpoint(page.page_id).await?
        };

        let revisions = source
            .fetch_revisions(page.page_id, after)
            .await
            .with_context(|| format!("Failed to fetch revisions for page {}", page.page_id))?;

        let mut highest = after;
        for revision in &revisions {
            report.revisions_fetched += 1;
            if store.insert_revision(revision).await? {
                report.revisions_inserted += 1;
            }
            highest = highest.max(Some(revision.rev_id));
        }

        if let Some(last) = highest {
            store.set_checkpoint(page.page_id, last).await?;
        }

        tracing::debug!(
            page_id = page.page_id,
            fetched = revisions.len(),
            "synced page"
        );
        reporter.report(ProgressEvent::Working {
            step: "sync",
            unit: "pages",
            n: i as u64 + 1,
            total,
        });
    }

    Ok(report)
}

/// Run `stl sync` against the configured wiki and print a summary.
pub async fn run_sync(
    config: &Config,
    full: bool,
    limit: Option<usize>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let source = WikiSource::new(&config.wiki)?;

    let report = sync_source(&store, &source, full, limit, reporter).await?;

    println!("sync {}", source.name());
    println!("  pages: {}", report.pages);
    println!("  revisions fetched: {}", report.revisions_fetched);
    println!("  revisions inserted: {}", report.revisions_inserted);
    println!("ok");

    pool.close().await;
    Ok(())
}
