//! Historical backfill of implicit "completely lost" status.
//!
//! Before the wiki introduced explicit status tagging, lost articles were
//! identified by the absence of the other status tags. During the cutover
//! window the existing lost articles were retagged explicitly. This step
//! assumes that a page whose snapshot carries `completely lost media` at
//! some instant inside the window was already lost before it, and stamps
//! every one of its revisions up to the window's end with a synthetic
//! `completely lost media` fact.
//!
//! The assumption is a heuristic, not a proof. The step is opt-in: nothing
//! in the timeline builder calls it, and every fact it writes carries
//! [`Provenance::Backfill`] so it can be told apart from extracted facts and
//! refined later.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::TimelineError;
use crate::models::{start_of_day, CategoryFact, PageId, Provenance};
use crate::snapshot::RevisionIndex;
use crate::status::CanonicalStatus;
use crate::store::Store;

/// The period during which explicit status tagging was introduced.
///
/// Both bounds are inclusive instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoverWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl CutoverWindow {
    /// Window from the start of `start` to the start of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Result<Self, TimelineError> {
        if end < start {
            return Err(TimelineError::InvalidWindow { start, end });
        }
        Ok(Self {
            start: start_of_day(start),
            end: start_of_day(end),
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Outcome of one backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Pages retagged as lost during the window.
    pub pages: Vec<PageId>,
    /// Revisions examined on those pages.
    pub revisions: u64,
    /// Facts newly written; zero on a re-run.
    pub facts_inserted: u64,
}

/// Pages whose snapshot carries `completely lost media` at some instant
/// inside the window.
pub fn lost_during(index: &RevisionIndex, window: CutoverWindow) -> Vec<PageId> {
    index
        .page_ids()
        .filter(|page_id| {
            index
                .revisions_current_during(*page_id, window.start, window.end)
                .iter()
                .any(|r| r.statuses.contains(&CanonicalStatus::CompletelyLost))
        })
        .collect()
}

/// Run the backfill against a store.
pub async fn backfill_lost(store: &dyn Store, window: CutoverWindow) -> Result<BackfillReport> {
    let index = RevisionIndex::load(store).await?;
    let pages = lost_during(&index, window);
    let label = CanonicalStatus::CompletelyLost.label();

    let mut report = BackfillReport::default();
    for page_id in &pages {
        for stamp in store.revisions_until(*page_id, window.end).await? {
            report.revisions += 1;
            let fact = CategoryFact {
                rev_id: stamp.rev_id,
                category: label.to_string(),
                provenance: Provenance::Backfill,
            };
            if store.insert_category_fact(&fact).await? {
                report.facts_inserted += 1;
            }
        }
        tracing::debug!(page_id, "backfilled lost status");
    }

    tracing::info!(
        pages = pages.len(),
        facts = report.facts_inserted,
        "backfill complete"
    );
    report.pages = pages;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Page, Revision};
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn window() -> CutoverWindow {
        CutoverWindow::from_dates(date(2019, 1, 17), date(2020, 5, 16)).unwrap()
    }

    async fn revision(store: &InMemoryStore, rev_id: i64, page_id: i64, y: i32, m: u32, d: u32) {
        store
            .upsert_page(&Page {
                page_id,
                title: None,
            })
            .await
            .unwrap();
        store
            .insert_revision(&Revision {
                rev_id,
                page_id,
                user: Some("editor".into()),
                timestamp: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
                content: None,
                comment: None,
            })
            .await
            .unwrap();
    }

    async fn tag_lost(store: &InMemoryStore, rev_id: i64) {
        store
            .insert_category_fact(&CategoryFact {
                rev_id,
                category: "completely lost media".into(),
                provenance: Provenance::Template,
            })
            .await
            .unwrap();
    }

    async fn labels(store: &InMemoryStore, rev_id: i64) -> Vec<(String, Provenance)> {
        store
            .category_facts_for(rev_id)
            .await
            .unwrap()
            .into_iter()
            .map(|f| (f.category, f.provenance))
            .collect()
    }

    async fn scenario() -> InMemoryStore {
        let store = InMemoryStore::new();
        // Page 3: untagged history, retagged lost inside the window.
        revision(&store, 30, 3, 2018, 1, 1).await;
        revision(&store, 31, 3, 2019, 6, 1).await;
        revision(&store, 32, 3, 2020, 5, 10).await;
        tag_lost(&store, 32).await;
        // Page 4: tagged lost only in 2021.
        revision(&store, 40, 4, 2018, 3, 1).await;
        revision(&store, 41, 4, 2021, 2, 1).await;
        tag_lost(&store, 41).await;
        store
    }

    #[tokio::test]
    async fn test_backfill_retagged_page() {
        let store = scenario().await;
        let report = backfill_lost(&store, window()).await.unwrap();

        assert_eq!(report.pages, vec![3]);
        assert_eq!(report.facts_inserted, 2);
        for rev_id in [30, 31] {
            assert_eq!(
                labels(&store, rev_id).await,
                vec![("completely lost media".to_string(), Provenance::Backfill)]
            );
        }
        // The extracted fact keeps its provenance.
        assert_eq!(
            labels(&store, 32).await,
            vec![("completely lost media".to_string(), Provenance::Template)]
        );
    }

    #[tokio::test]
    async fn test_backfill_leaves_pages_outside_window() {
        let store = scenario().await;
        backfill_lost(&store, window()).await.unwrap();
        assert!(labels(&store, 40).await.is_empty());
        assert_eq!(labels(&store, 41).await.len(), 1);
    }

    #[tokio::test]
    async fn test_backfill_is_idempotent() {
        let store = scenario().await;
        backfill_lost(&store, window()).await.unwrap();
        let again = backfill_lost(&store, window()).await.unwrap();
        assert_eq!(again.pages, vec![3]);
        assert_eq!(again.facts_inserted, 0);
    }

    #[tokio::test]
    async fn test_lost_snapshot_current_at_window_start() {
        let store = InMemoryStore::new();
        revision(&store, 1, 5, 2017, 1, 1).await;
        revision(&store, 2, 5, 2018, 12, 1).await;
        tag_lost(&store, 2).await;
        let report = backfill_lost(&store, window()).await.unwrap();
        assert_eq!(report.pages, vec![5]);
        assert_eq!(labels(&store, 1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_page_found_before_window_is_untouched() {
        let store = InMemoryStore::new();
        revision(&store, 1, 6, 2017, 1, 1).await;
        tag_lost(&store, 1).await;
        revision(&store, 2, 6, 2018, 1, 1).await;
        store
            .insert_category_fact(&CategoryFact {
                rev_id: 2,
                category: "found media".into(),
                provenance: Provenance::Tag,
            })
            .await
            .unwrap();
        let report = backfill_lost(&store, window()).await.unwrap();
        assert!(report.pages.is_empty());
    }

    #[test]
    fn test_window_rejects_reversed_dates() {
        assert_eq!(
            CutoverWindow::from_dates(date(2020, 1, 2), date(2020, 1, 1)),
            Err(TimelineError::InvalidWindow {
                start: date(2020, 1, 2),
                end: date(2020, 1, 1)
            })
        );
        assert!(CutoverWindow::from_dates(date(2020, 1, 1), date(2020, 1, 1)).is_ok());
    }
}
