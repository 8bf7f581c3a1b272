//! In-memory [`Store`] implementation for tests.
//!
//! Uses `BTreeMap`/`BTreeSet` behind `std::sync::RwLock`, so iteration
//! order matches the ordering guarantees of the SQLite backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    CategoryFact, Page, PageId, Provenance, Revision, RevisionId, RevisionStamp, TimelinePoint,
};
use crate::status::CanonicalStatus;
use crate::timeline::DateRange;

use super::{CorpusStats, Store};

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    pages: RwLock<BTreeMap<PageId, Option<String>>>,
    revisions: RwLock<BTreeMap<RevisionId, Revision>>,
    checkpoints: RwLock<BTreeMap<PageId, RevisionId>>,
    facts: RwLock<BTreeMap<(RevisionId, String), Provenance>>,
    points: RwLock<BTreeSet<(NaiveDate, CanonicalStatus, i64)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_page(&self, page: &Page) -> Result<()> {
        let mut pages = self.pages.write().map_err(poisoned)?;
        let entry = pages.entry(page.page_id).or_insert(None);
        if page.title.is_some() {
            *entry = page.title.clone();
        }
        Ok(())
    }

    async fn insert_revision(&self, revision: &Revision) -> Result<bool> {
        let mut revisions = self.revisions.write().map_err(poisoned)?;
        if revisions.contains_key(&revision.rev_id) {
            return Ok(false);
        }
        revisions.insert(revision.rev_id, revision.clone());
        Ok(true)
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        let pages = self.pages.read().map_err(poisoned)?;
        Ok(pages
            .iter()
            .map(|(page_id, title)| Page {
                page_id: *page_id,
                title: title.clone(),
            })
            .collect())
    }

    async fn revision_ids(&self) -> Result<Vec<RevisionId>> {
        let revisions = self.revisions.read().map_err(poisoned)?;
        Ok(revisions.keys().copied().collect())
    }

    async fn get_revision(&self, rev_id: RevisionId) -> Result<Option<Revision>> {
        let revisions = self.revisions.read().map_err(poisoned)?;
        Ok(revisions.get(&rev_id).cloned())
    }

    async fn revision_stamps(&self) -> Result<Vec<RevisionStamp>> {
        let revisions = self.revisions.read().map_err(poisoned)?;
        Ok(revisions.values().map(Revision::stamp).collect())
    }

    async fn revisions_until(
        &self,
        page_id: PageId,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevisionStamp>> {
        let revisions = self.revisions.read().map_err(poisoned)?;
        let mut stamps: Vec<RevisionStamp> = revisions
            .values()
            .filter(|r| r.page_id == page_id && r.timestamp <= until)
            .map(Revision::stamp)
            .collect();
        stamps.sort_by_key(|s| (s.timestamp, s.rev_id));
        Ok(stamps)
    }

    async fn checkpoint(&self, page_id: PageId) -> Result<Option<RevisionId>> {
        let checkpoints = self.checkpoints.read().map_err(poisoned)?;
        Ok(checkpoints.get(&page_id).copied())
    }

    async fn set_checkpoint(&self, page_id: PageId, last_rev_id: RevisionId) -> Result<()> {
        let mut checkpoints = self.checkpoints.write().map_err(poisoned)?;
        checkpoints.insert(page_id, last_rev_id);
        Ok(())
    }

    async fn insert_category_fact(&self, fact: &CategoryFact) -> Result<bool> {
        let mut facts = self.facts.write().map_err(poisoned)?;
        let key = (fact.rev_id, fact.category.clone());
        if facts.contains_key(&key) {
            return Ok(false);
        }
        facts.insert(key, fact.provenance);
        Ok(true)
    }

    async fn category_facts_for(&self, rev_id: RevisionId) -> Result<Vec<CategoryFact>> {
        let facts = self.facts.read().map_err(poisoned)?;
        Ok(facts
            .iter()
            .filter(|((r, _), _)| *r == rev_id)
            .map(|((r, category), provenance)| CategoryFact {
                rev_id: *r,
                category: category.clone(),
                provenance: *provenance,
            })
            .collect())
    }

    async fn category_facts_with_labels(&self, labels: &[&str]) -> Result<Vec<CategoryFact>> {
        let facts = self.facts.read().map_err(poisoned)?;
        Ok(facts
            .iter()
            .filter(|((_, category), _)| labels.contains(&category.as_str()))
            .map(|((r, category), provenance)| CategoryFact {
                rev_id: *r,
                category: category.clone(),
                provenance: *provenance,
            })
            .collect())
    }

    async fn insert_timeline_point(&self, point: &TimelinePoint) -> Result<bool> {
        let mut points = self.points.write().map_err(poisoned)?;
        Ok(points.insert((point.date, point.category, point.count)))
    }

    async fn timeline_points(&self, range: Option<DateRange>) -> Result<Vec<TimelinePoint>> {
        let points = self.points.read().map_err(poisoned)?;
        Ok(points
            .iter()
            .filter(|(date, _, _)| range.map_or(true, |r| r.contains(*date)))
            .map(|(date, category, count)| TimelinePoint {
                date: *date,
                category: *category,
                count: *count,
            })
            .collect())
    }

    async fn delete_timeline_points(&self, range: DateRange) -> Result<u64> {
        let mut points = self.points.write().map_err(poisoned)?;
        let before = points.len();
        points.retain(|(date, _, _)| !range.contains(*date));
        Ok((before - points.len()) as u64)
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let pages = self.pages.read().map_err(poisoned)?;
        let revisions = self.revisions.read().map_err(poisoned)?;
        let facts = self.facts.read().map_err(poisoned)?;
        let points = self.points.read().map_err(poisoned)?;

        let mut stats = CorpusStats {
            pages: pages.len() as i64,
            revisions: revisions.len() as i64,
            redacted_content: revisions.values().filter(|r| r.content.is_none()).count() as i64,
            timeline_points: points.len() as i64,
            ..CorpusStats::default()
        };
        for ((_, category), provenance) in facts.iter() {
            *stats.facts_by_provenance.entry(*provenance).or_insert(0) += 1;
            *stats.labels.entry(category.clone()).or_insert(0) += 1;
        }
        if let (Some(first), Some(last)) = (points.iter().next(), points.iter().next_back()) {
            stats.timeline_span = Some((first.0, last.0));
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn revision(rev_id: i64, page_id: i64, day: u32, content: Option<&str>) -> Revision {
        Revision {
            rev_id,
            page_id,
            user: None,
            timestamp: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
            content: content.map(str::to_string),
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_revisions_are_append_only() {
        let store = InMemoryStore::new();
        assert!(store.insert_revision(&revision(1, 1, 1, Some("a"))).await.unwrap());
        assert!(!store.insert_revision(&revision(1, 1, 1, Some("b"))).await.unwrap());
        let stored = store.get_revision(1).await.unwrap().unwrap();
        assert_eq!(stored.content.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_fact_insert_is_idempotent() {
        let store = InMemoryStore::new();
        let fact = CategoryFact {
            rev_id: 1,
            category: "found media".into(),
            provenance: Provenance::Tag,
        };
        assert!(store.insert_category_fact(&fact).await.unwrap());
        assert!(!store
            .insert_category_fact(&CategoryFact {
                provenance: Provenance::Backfill,
                ..fact.clone()
            })
            .await
            .unwrap());
        assert_eq!(store.category_facts_for(1).await.unwrap(), vec![fact]);
    }

    #[tokio::test]
    async fn test_revisions_until_is_inclusive_and_scoped() {
        let store = InMemoryStore::new();
        store.insert_revision(&revision(3, 1, 3, None)).await.unwrap();
        store.insert_revision(&revision(1, 1, 1, None)).await.unwrap();
        store.insert_revision(&revision(2, 2, 2, None)).await.unwrap();
        let until = Utc.with_ymd_and_hms(2020, 1, 3, 0, 0, 0).unwrap();
        let ids: Vec<i64> = store
            .revisions_until(1, until)
            .await
            .unwrap()
            .iter()
            .map(|s| s.rev_id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let store = InMemoryStore::new();
        store
            .upsert_page(&Page {
                page_id: 1,
                title: Some("Lost Pilot".into()),
            })
            .await
            .unwrap();
        store.insert_revision(&revision(1, 1, 1, None)).await.unwrap();
        store.insert_revision(&revision(2, 1, 2, Some("x"))).await.unwrap();
        store
            .insert_category_fact(&CategoryFact {
                rev_id: 2,
                category: "lost films".into(),
                provenance: Provenance::Tag,
            })
            .await
            .unwrap();

        let stats = store.corpus_stats().await.unwrap();
        assert_eq!(stats.pages, 1);
        assert_eq!(stats.revisions, 2);
        assert_eq!(stats.redacted_content, 1);
        assert_eq!(stats.facts_by_provenance[&Provenance::Tag], 1);
        assert_eq!(stats.labels["lost films"], 1);
        assert_eq!(stats.timeline_span, None);
    }
}
