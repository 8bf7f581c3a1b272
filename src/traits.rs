//! Extension point for revision sources.
//!
//! `stl sync` is written against [`RevisionSource`] rather than a concrete
//! HTTP client, so the ingest pipeline can be driven by the MediaWiki API
//! ([`WikiSource`](crate::connector_wiki::WikiSource)) or by a fixture in
//! tests.
//!
//! ```text
//! RevisionSource ──list_pages()──────────▶ upsert pages
//!                ──fetch_revisions(id)──▶ insert revisions ─▶ checkpoint
//! ```

use anyhow::Result;
use async_trait::async_trait;

use status_timeline_core::models::{Page, PageId, Revision, RevisionId};

/// A source of wiki pages and their revision history.
///
/// # Example
///
/// ```rust
/// use anyhow::Result;
/// use async_trait::async_trait;
/// use status_timeline::traits::RevisionSource;
/// use status_timeline_core::models::{Page, PageId, Revision, RevisionId};
///
/// struct Empty;
///
/// #[async_trait]
/// impl RevisionSource for Empty {
///     fn name(&self) -> &str { "empty" }
///
///     async fn list_pages(&self) -> Result<Vec<Page>> {
///         Ok(vec![])
///     }
///
///     async fn fetch_revisions(
///         &self,
///         _page_id: PageId,
///         _after: Option<RevisionId>,
///     ) -> Result<Vec<Revision>> {
///         Ok(vec![])
///     }
/// }
/// ```
#[async_trait]
pub trait RevisionSource: Send + Sync {
    /// Short label used in progress output (e.g. the API host).
    fn name(&self) -> &str;

    /// Every content page (redirects excluded).
    async fn list_pages(&self) -> Result<Vec<Page>>;

    /// Revisions of `page_id` in ascending id order.
    ///
    /// When `after` is set only revisions with a strictly greater id are
    /// returned.
    async fn fetch_revisions(
        &self,
        page_id: PageId,
        after: Option<RevisionId>,
    ) -> Result<Vec<Revision>>;
}
