//! Storage abstraction for Status Timeline.
//!
//! The [`Store`] trait covers everything the extractor, snapshot engine,
//! timeline builder, and backfill need from persistence, so the core logic
//! runs unchanged against SQLite or the in-memory backend.
//!
//! Every write is idempotent and keyed by natural identity:
//!
//! | Record | Key | On conflict |
//! |--------|-----|-------------|
//! | page | `page_id` | update title |
//! | revision | `rev_id` | ignore (append-only) |
//! | category fact | `(rev_id, category)` | ignore |
//! | timeline point | `(category, count, date)` | ignore |
//!
//! A batch step that fails halfway can therefore simply be re-run.

pub mod memory;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    CategoryFact, Page, PageId, Provenance, Revision, RevisionId, RevisionStamp, TimelinePoint,
};
use crate::timeline::DateRange;

/// Aggregate counts for the `stats` overview.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub pages: i64,
    pub revisions: i64,
    pub redacted_content: i64,
    pub facts_by_provenance: BTreeMap<Provenance, i64>,
    /// Every distinct category label with the number of revisions carrying it.
    pub labels: BTreeMap<String, i64>,
    pub timeline_points: i64,
    pub timeline_span: Option<(NaiveDate, NaiveDate)>,
}

/// Abstract storage backend.
///
/// All operations are async (via `async-trait`) so the SQLite backend can
/// run on tokio. The in-memory backend returns immediately-ready futures.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a page or update its title.
    async fn upsert_page(&self, page: &Page) -> Result<()>;

    /// Insert a revision. Returns `false` if it was already stored.
    async fn insert_revision(&self, revision: &Revision) -> Result<bool>;

    /// All pages, ordered by id.
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// Every stored revision id, ascending.
    async fn revision_ids(&self) -> Result<Vec<RevisionId>>;

    /// One revision, including its content.
    async fn get_revision(&self, rev_id: RevisionId) -> Result<Option<Revision>>;

    /// Identity and timestamp of every revision.
    async fn revision_stamps(&self) -> Result<Vec<RevisionStamp>>;

    /// A page's revisions with `timestamp <= until`, oldest first.
    async fn revisions_until(
        &self,
        page_id: PageId,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevisionStamp>>;

    /// Highest revision id already synced for a page, if any.
    async fn checkpoint(&self, page_id: PageId) -> Result<Option<RevisionId>>;

    /// Record the highest revision id synced for a page.
    async fn set_checkpoint(&self, page_id: PageId, last_rev_id: RevisionId) -> Result<()>;

    /// Insert a category fact. Returns `false` if `(rev_id, category)` was
    /// already present; the stored provenance is left untouched.
    async fn insert_category_fact(&self, fact: &CategoryFact) -> Result<bool>;

    /// All facts of one revision, ordered by label.
    async fn category_facts_for(&self, rev_id: RevisionId) -> Result<Vec<CategoryFact>>;

    /// All facts whose label is one of `labels`.
    async fn category_facts_with_labels(&self, labels: &[&str]) -> Result<Vec<CategoryFact>>;

    /// Insert a timeline point. Returns `false` if it was already present.
    async fn insert_timeline_point(&self, point: &TimelinePoint) -> Result<bool>;

    /// Timeline points ordered by `(date, category, count)`, optionally
    /// restricted to a date range (start inclusive, end exclusive).
    async fn timeline_points(&self, range: Option<DateRange>) -> Result<Vec<TimelinePoint>>;

    /// Remove the points of a date range. Returns how many were removed.
    async fn delete_timeline_points(&self, range: DateRange) -> Result<u64>;

    /// Counts for the stats overview.
    async fn corpus_stats(&self) -> Result<CorpusStats>;
}
