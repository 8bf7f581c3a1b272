//! Corpus snapshot engine.
//!
//! A page's snapshot at instant `T` is its latest revision with
//! `timestamp <= T`. Timestamp ties go to the highest revision id.
//!
//! [`RevisionIndex`] holds every revision stamp sorted per page, with the
//! canonical statuses each revision carries already attached, so a
//! snapshot is one binary search per page and never touches revision text.
//! Building the index costs one pass over the stamps and the status facts;
//! after that [`RevisionIndex::snapshot_counts`] can be called once per day
//! over a multi-year range cheaply.
//!
//! A revision carrying several statuses (mistagged) is counted under each
//! of them. No mutual exclusivity is enforced.

use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::{CategoryFact, PageId, RevisionId, RevisionStamp};
use crate::status::CanonicalStatus;
use crate::store::Store;

/// Counts per canonical status. Statuses no page holds are absent.
pub type StatusCounts = BTreeMap<CanonicalStatus, i64>;

/// A revision stamp with the statuses it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedRevision {
    pub rev_id: RevisionId,
    pub timestamp: DateTime<Utc>,
    pub statuses: Vec<CanonicalStatus>,
}

/// Per-page revision lists sorted by `(timestamp, rev_id)`.
#[derive(Debug, Clone, Default)]
pub struct RevisionIndex {
    pages: BTreeMap<PageId, Vec<IndexedRevision>>,
}

impl RevisionIndex {
    /// Build the index from revision stamps and category facts. Facts whose
    /// label is outside the vocabulary, or whose revision is unknown, are
    /// ignored.
    pub fn build<I, F>(stamps: I, facts: F) -> Self
    where
        I: IntoIterator<Item = RevisionStamp>,
        F: IntoIterator<Item = CategoryFact>,
    {
        let mut statuses: HashMap<RevisionId, Vec<CanonicalStatus>> = HashMap::new();
        for fact in facts {
            if let Some(status) = CanonicalStatus::from_label(&fact.category) {
                let held = statuses.entry(fact.rev_id).or_default();
                if !held.contains(&status) {
                    held.push(status);
                }
            }
        }

        let mut pages: BTreeMap<PageId, Vec<IndexedRevision>> = BTreeMap::new();
        for stamp in stamps {
            let mut held = statuses.get(&stamp.rev_id).cloned().unwrap_or_default();
            held.sort();
            pages.entry(stamp.page_id).or_default().push(IndexedRevision {
                rev_id: stamp.rev_id,
                timestamp: stamp.timestamp,
                statuses: held,
            });
        }

        for revisions in pages.values_mut() {
            revisions.sort_by_key(|r| (r.timestamp, r.rev_id));
            revisions.dedup_by_key(|r| r.rev_id);
        }

        Self { pages }
    }

    /// Load all revision stamps and status facts from a store.
    pub async fn load(store: &dyn Store) -> Result<Self> {
        let stamps = store.revision_stamps().await?;
        let facts = store
            .category_facts_with_labels(&CanonicalStatus::labels())
            .await?;
        let status_facts = facts.len();
        let index = Self::build(stamps, facts);
        tracing::debug!(
            pages = index.page_count(),
            revisions = index.revision_count(),
            status_facts,
            "built revision index"
        );
        Ok(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn revision_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn page_ids(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.keys().copied()
    }

    /// A page's revisions, oldest first.
    pub fn revisions(&self, page_id: PageId) -> &[IndexedRevision] {
        self.pages.get(&page_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The page's snapshot at `at`: its latest revision not newer than `at`.
    pub fn latest_at(&self, page_id: PageId, at: DateTime<Utc>) -> Option<&IndexedRevision> {
        latest_in(self.revisions(page_id), at)
    }

    /// Every page's snapshot at `at`. Pages with no revision yet are
    /// omitted.
    pub fn snapshot(&self, at: DateTime<Utc>) -> Vec<(PageId, &IndexedRevision)> {
        self.pages
            .iter()
            .filter_map(|(page_id, revisions)| latest_in(revisions, at).map(|r| (*page_id, r)))
            .collect()
    }

    /// Number of pages whose snapshot at `at` carries each status.
    pub fn snapshot_counts(&self, at: DateTime<Utc>) -> StatusCounts {
        let mut counts = StatusCounts::new();
        for (_, revision) in self.snapshot(at) {
            for status in &revision.statuses {
                *counts.entry(*status).or_insert(0) += 1;
            }
        }
        counts
    }

    /// The revisions that are a page's snapshot at some instant in
    /// `[start, end]`: the one current at `start`, plus every revision made
    /// inside the window.
    pub fn revisions_current_during(
        &self,
        page_id: PageId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> &[IndexedRevision] {
        let revisions = self.revisions(page_id);
        if end < start {
            return &[];
        }
        let first = revisions.partition_point(|r| r.timestamp <= start);
        let lo = first.saturating_sub(1);
        let hi = revisions.partition_point(|r| r.timestamp <= end);
        if hi <= lo {
            return &[];
        }
        &revisions[lo..hi]
    }
}

fn latest_in(revisions: &[IndexedRevision], at: DateTime<Utc>) -> Option<&IndexedRevision> {
    let idx = revisions.partition_point(|r| r.timestamp <= at);
    idx.checked_sub(1).map(|i| &revisions[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::Extractor;
    use crate::models::{Page, Provenance, Revision};
    use crate::store::memory::InMemoryStore;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn stamp(rev_id: i64, page_id: i64, at: DateTime<Utc>) -> RevisionStamp {
        RevisionStamp {
            rev_id,
            page_id,
            timestamp: at,
        }
    }

    fn fact(rev_id: i64, label: &str) -> CategoryFact {
        CategoryFact {
            rev_id,
            category: label.to_string(),
            provenance: Provenance::Tag,
        }
    }

    fn scenario() -> RevisionIndex {
        RevisionIndex::build(
            vec![
                stamp(10, 1, ts(2020, 1, 1)),
                stamp(11, 1, ts(2020, 6, 1)),
                stamp(20, 2, ts(2020, 3, 1)),
            ],
            vec![
                fact(11, "completely lost media"),
                fact(20, "found media"),
                fact(20, "lost films"),
            ],
        )
    }

    #[test]
    fn test_snapshot_before_any_status_is_empty() {
        let counts = scenario().snapshot_counts(ts(2020, 2, 1));
        assert!(counts.is_empty());
        assert_eq!(counts.get(&CanonicalStatus::Found).copied().unwrap_or(0), 0);
    }

    #[test]
    fn test_snapshot_after_all_revisions() {
        let counts = scenario().snapshot_counts(ts(2020, 7, 1));
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&CanonicalStatus::CompletelyLost], 1);
        assert_eq!(counts[&CanonicalStatus::Found], 1);
    }

    #[test]
    fn test_snapshot_never_includes_future_revision() {
        let index = scenario();
        let at = ts(2020, 5, 31);
        for (_, rev) in index.snapshot(at) {
            assert!(rev.timestamp <= at);
        }
        assert_eq!(index.latest_at(1, at).unwrap().rev_id, 10);
    }

    #[test]
    fn test_snapshot_boundary_is_inclusive() {
        let index = scenario();
        assert_eq!(index.latest_at(2, ts(2020, 3, 1)).unwrap().rev_id, 20);
        assert!(index.latest_at(2, ts(2020, 3, 1) - chrono::Duration::seconds(1)).is_none());
    }

    #[test]
    fn test_latest_status_replaces_earlier() {
        let index = RevisionIndex::build(
            vec![stamp(1, 1, ts(2019, 1, 1)), stamp(2, 1, ts(2019, 2, 1))],
            vec![fact(1, "completely lost media"), fact(2, "found media")],
        );
        let counts = index.snapshot_counts(ts(2019, 3, 1));
        assert_eq!(counts.get(&CanonicalStatus::CompletelyLost), None);
        assert_eq!(counts[&CanonicalStatus::Found], 1);
    }

    #[test]
    fn test_timestamp_tie_picks_highest_revision_id() {
        let index = RevisionIndex::build(
            vec![stamp(6, 1, ts(2019, 1, 1)), stamp(5, 1, ts(2019, 1, 1))],
            vec![fact(5, "completely lost media"), fact(6, "found media")],
        );
        assert_eq!(index.latest_at(1, ts(2019, 1, 1)).unwrap().rev_id, 6);
        assert_eq!(
            index.snapshot_counts(ts(2019, 1, 2)),
            StatusCounts::from([(CanonicalStatus::Found, 1)])
        );
    }

    // Mistagged revisions count under every status they hold; whether the
    // statuses should be mutually exclusive is an open data-quality question.
    #[test]
    fn test_mistagged_revision_counts_in_every_bucket() {
        let index = RevisionIndex::build(
            vec![stamp(1, 1, ts(2019, 1, 1))],
            vec![fact(1, "found media"), fact(1, "partially lost media")],
        );
        let counts = index.snapshot_counts(ts(2019, 1, 2));
        assert_eq!(counts[&CanonicalStatus::Found], 1);
        assert_eq!(counts[&CanonicalStatus::PartiallyLost], 1);
    }

    #[test]
    fn test_non_vocabulary_facts_ignored() {
        let index = RevisionIndex::build(
            vec![stamp(1, 1, ts(2019, 1, 1))],
            vec![fact(1, "lost media"), fact(1, "Found Media")],
        );
        assert!(index.snapshot_counts(ts(2020, 1, 1)).is_empty());
    }

    #[test]
    fn test_revisions_current_during_window() {
        let index = RevisionIndex::build(
            vec![
                stamp(1, 1, ts(2018, 1, 1)),
                stamp(2, 1, ts(2019, 6, 1)),
                stamp(3, 1, ts(2020, 5, 10)),
                stamp(4, 1, ts(2021, 1, 1)),
            ],
            Vec::new(),
        );
        let ids: Vec<i64> = index
            .revisions_current_during(1, ts(2019, 1, 17), ts(2020, 5, 16))
            .iter()
            .map(|r| r.rev_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let ids: Vec<i64> = index
            .revisions_current_during(1, ts(2017, 1, 1), ts(2017, 6, 1))
            .iter()
            .map(|r| r.rev_id)
            .collect();
        assert!(ids.is_empty());

        assert!(index
            .revisions_current_during(9, ts(2017, 1, 1), ts(2030, 1, 1))
            .is_empty());
    }

    async fn seed_text(
        store: &InMemoryStore,
        rev_id: i64,
        page_id: i64,
        at: DateTime<Utc>,
        text: &str,
    ) {
        let revision = Revision {
            rev_id,
            page_id,
            user: None,
            timestamp: at,
            content: Some(text.to_string()),
            comment: None,
        };
        store
            .upsert_page(&Page {
                page_id,
                title: None,
            })
            .await
            .unwrap();
        store.insert_revision(&revision).await.unwrap();
        for fact in Extractor::new("LMW").unwrap().facts(&revision) {
            store.insert_category_fact(&fact).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_scenario_from_text_through_store() {
        let store = InMemoryStore::new();
        seed_text(&store, 10, 1, ts(2020, 1, 1), "An unlabelled pilot.").await;
        seed_text(&store, 11, 1, ts(2020, 6, 1), "{{LMW|type=pilot|status=lost}}").await;
        seed_text(&store, 20, 2, ts(2020, 3, 1), "[[Category:Found Media]]").await;

        let index = RevisionIndex::load(&store).await.unwrap();
        assert_eq!(index.page_count(), 2);
        assert_eq!(index.revision_count(), 3);
        assert!(index.snapshot_counts(ts(2020, 2, 1)).is_empty());
        assert_eq!(
            index.snapshot_counts(ts(2020, 7, 1)),
            StatusCounts::from([
                (CanonicalStatus::CompletelyLost, 1),
                (CanonicalStatus::Found, 1)
            ])
        );
    }
}
