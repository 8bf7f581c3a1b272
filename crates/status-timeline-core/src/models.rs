//! Core data models shared by the extractor, snapshot engine, timeline
//! builder, and storage backends.
//!
//! Revisions are append-only: once ingested they are never mutated.
//! Category facts and timeline points are derived and written through
//! idempotent upserts keyed by their natural identity.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::status::CanonicalStatus;

/// Stable wiki page identifier.
pub type PageId = i64;

/// Globally unique revision identifier.
pub type RevisionId = i64;

/// A tracked wiki page (a "document").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub page_id: PageId,
    pub title: Option<String>,
}

/// One immutable historical version of a page.
///
/// `user`, `content`, and `comment` are `None` when the wiki redacted them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub rev_id: RevisionId,
    pub page_id: PageId,
    pub user: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content: Option<String>,
    pub comment: Option<String>,
}

impl Revision {
    pub fn stamp(&self) -> RevisionStamp {
        RevisionStamp {
            rev_id: self.rev_id,
            page_id: self.page_id,
            timestamp: self.timestamp,
        }
    }
}

/// The identity and time of a revision, without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionStamp {
    pub rev_id: RevisionId,
    pub page_id: PageId,
    pub timestamp: DateTime<Utc>,
}

/// Where a category fact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// `[[Category:...]]` bracket tag in the revision text.
    Tag,
    /// `status=` field of the structured status template.
    Template,
    /// Synthesized by the historical backfill, not read from the text.
    Backfill,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Tag => "tag",
            Provenance::Template => "template",
            Provenance::Backfill => "backfill",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tag" => Some(Provenance::Tag),
            "template" => Some(Provenance::Template),
            "backfill" => Some(Provenance::Backfill),
            _ => None,
        }
    }
}

/// A `(revision, label)` association. Set semantics: the pair is the key,
/// and the first writer's provenance is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFact {
    pub rev_id: RevisionId,
    pub category: String,
    pub provenance: Provenance,
}

/// Number of pages holding `category` as of the start of `date`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub category: CanonicalStatus,
    pub count: i64,
}

/// The instant a calendar day begins, in UTC.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
