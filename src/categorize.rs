//! Category extraction over stored revisions: `stl categorize`.
//!
//! Every revision is run through the [`Extractor`] and its labels are written
//! as category facts with `tag` or `template` provenance. Inserts are
//! idempotent, so re-running after a partial pass or a new sync only adds
//! what is missing.

use anyhow::{Context, Result};

use status_timeline_core::extract::Extractor;
use status_timeline_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sqlite_store::SqliteStore;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CategorizeReport {
    pub revisions: u64,
    pub redacted: u64,
    pub facts_inserted: u64,
}

/// Extract and store category facts for every revision in `store`.
pub async fn categorize_all(
    store: &dyn Store,
    extractor: &Extractor,
    reporter: &dyn ProgressReporter,
) -> Result<CategorizeReport> {
    let ids = store.revision_ids().await?;
    let total = ids.len() as u64;
    let mut report = CategorizeReport::default();

    for (i, rev_id) in ids.into_iter().enumerate() {
        let revision = store
            .get_revision(rev_id)
            .await?
            .with_context(|| format!("revision {} vanished during categorize", rev_id))?;

        report.revisions += 1;
        if revision.content.is_none() {
            report.redacted += 1;
        }

        for fact in extractor.facts(&revision) {
            if store.insert_category_fact(&fact).await? {
                report.facts_inserted += 1;
            }
        }

        let n = i as u64 + 1;
        if n % 1000 == 0 || n == total {
            reporter.report(ProgressEvent::Working {
                step: "categorize",
                unit: "revisions",
                n,
                total,
            });
        }
    }

    tracing::info!(
        revisions = report.revisions,
        facts = report.facts_inserted,
        "categorized revisions"
    );
    Ok(report)
}

pub async fn run_categorize(config: &Config, reporter: &dyn ProgressReporter) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let extractor = Extractor::new(&config.extract.status_template)?;

    let report = categorize_all(&store, &extractor, reporter).await?;

    println!("categorize");
    println!("  revisions scanned: {}", report.revisions);
    println!("  redacted (no content): {}", report.redacted);
    println!("  facts inserted: {}", report.facts_inserted);
    println!("ok");

    pool.close().await;
    Ok(())
}
