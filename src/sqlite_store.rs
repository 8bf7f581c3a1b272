//! SQLite-backed [`Store`] implementation.
//!
//! Every value reaches SQLite through bound parameters. Upserts use
//! `ON CONFLICT` so each write is idempotent and keyed by natural identity.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use status_timeline_core::models::{
    CategoryFact, Page, PageId, Provenance, Revision, RevisionId, RevisionStamp, TimelinePoint,
};
use status_timeline_core::store::{CorpusStats, Store};
use status_timeline_core::timeline::DateRange;
use status_timeline_core::CanonicalStatus;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn from_unix(ts: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0).ok_or_else(|| anyhow!("timestamp out of range: {}", ts))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).with_context(|| format!("bad stored date: {}", s))
}

fn stamp_from_row(row: &SqliteRow) -> Result<RevisionStamp> {
    Ok(RevisionStamp {
        rev_id: row.get("rev_id"),
        page_id: row.get("page_id"),
        timestamp: from_unix(row.get("timestamp"))?,
    })
}

fn fact_from_row(row: &SqliteRow) -> Result<CategoryFact> {
    let provenance: String = row.get("provenance");
    Ok(CategoryFact {
        rev_id: row.get("rev_id"),
        category: row.get("category"),
        provenance: Provenance::parse(&provenance)
            .ok_or_else(|| anyhow!("unknown provenance: {}", provenance))?,
    })
}

fn point_from_row(row: &SqliteRow) -> Result<TimelinePoint> {
    let category: String = row.get("category");
    let date: String = row.get("date");
    Ok(TimelinePoint {
        date: parse_date(&date)?,
        category: CanonicalStatus::from_label(&category)
            .ok_or_else(|| anyhow!("non-canonical timeline category: {}", category))?,
        count: row.get("count"),
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_page(&self, page: &Page) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pages (page_id, title) VALUES (?, ?)
            ON CONFLICT(page_id) DO UPDATE SET title = COALESCE(excluded.title, pages.title)
            "#,
        )
        .bind(page.page_id)
        .bind(&page.title)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_revision(&self, revision: &Revision) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO revisions (rev_id, page_id, user, timestamp, content, comment)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(rev_id) DO NOTHING
            "#,
        )
        .bind(revision.rev_id)
        .bind(revision.page_id)
        .bind(&revision.user)
        .bind(revision.timestamp.timestamp())
        .bind(&revision.content)
        .bind(&revision.comment)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        let rows = sqlx::query("SELECT page_id, title FROM pages ORDER BY page_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| Page {
                page_id: row.get("page_id"),
                title: row.get("title"),
            })
            .collect())
    }

    async fn revision_ids(&self) -> Result<Vec<RevisionId>> {
        let ids = sqlx::query_scalar("SELECT rev_id FROM revisions ORDER BY rev_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn get_revision(&self, rev_id: RevisionId) -> Result<Option<Revision>> {
        let row = sqlx::query(
            "SELECT rev_id, page_id, user, timestamp, content, comment FROM revisions WHERE rev_id = ?",
        )
        .bind(rev_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(Revision {
                rev_id: r.get("rev_id"),
                page_id: r.get("page_id"),
                user: r.get("user"),
                timestamp: from_unix(r.get("timestamp"))?,
                content: r.get("content"),
                comment: r.get("comment"),
            })
        })
        .transpose()
    }

    async fn revision_stamps(&self) -> Result<Vec<RevisionStamp>> {
        let rows = sqlx::query("SELECT rev_id, page_id, timestamp FROM revisions")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(stamp_from_row).collect()
    }

    async fn revisions_until(
        &self,
        page_id: PageId,
        until: DateTime<Utc>,
    ) -> Result<Vec<RevisionStamp>> {
        let rows = sqlx::query(
            r#"
            SELECT rev_id, page_id, timestamp FROM revisions
            WHERE page_id = ? AND timestamp <= ?
            ORDER BY timestamp, rev_id
            "#,
        )
        .bind(page_id)
        .bind(until.timestamp())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(stamp_from_row).collect()
    }

    async fn checkpoint(&self, page_id: PageId) -> Result<Option<RevisionId>> {
        let last = sqlx::query_scalar("SELECT last_rev_id FROM checkpoints WHERE page_id = ?")
            .bind(page_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(last)
    }

    async fn set_checkpoint(&self, page_id: PageId, last_rev_id: RevisionId) -> Result<()> {
        let now = Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO checkpoints (page_id, last_rev_id, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(page_id) DO UPDATE SET
                last_rev_id = MAX(checkpoints.last_rev_id, excluded.last_rev_id),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(page_id)
        .bind(last_rev_id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_category_fact(&self, fact: &CategoryFact) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (rev_id, category, provenance) VALUES (?, ?, ?)
            ON CONFLICT(rev_id, category) DO NOTHING
            "#,
        )
        .bind(fact.rev_id)
        .bind(&fact.category)
        .bind(fact.provenance.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn category_facts_for(&self, rev_id: RevisionId) -> Result<Vec<CategoryFact>> {
        let rows = sqlx::query(
            "SELECT rev_id, category, provenance FROM categories WHERE rev_id = ? ORDER BY category",
        )
        .bind(rev_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(fact_from_row).collect()
    }

    async fn category_facts_with_labels(&self, labels: &[&str]) -> Result<Vec<CategoryFact>> {
        if labels.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; labels.len()].join(", ");
        let sql = format!(
            "SELECT rev_id, category, provenance FROM categories WHERE category IN ({})",
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for label in labels {
            query = query.bind(*label);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(fact_from_row).collect()
    }

    async fn insert_timeline_point(&self, point: &TimelinePoint) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO status_counts (category, count, date) VALUES (?, ?, ?)
            ON CONFLICT(category, count, date) DO NOTHING
            "#,
        )
        .bind(point.category.label())
        .bind(point.count)
        .bind(format_date(point.date))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn timeline_points(&self, range: Option<DateRange>) -> Result<Vec<TimelinePoint>> {
        let rows = match range {
            Some(r) => {
                sqlx::query(
                    r#"
                    SELECT category, count, date FROM status_counts
                    WHERE date >= ? AND date < ?
                    ORDER BY date, category, count
                    "#,
                )
                .bind(format_date(r.start()))
                .bind(format_date(r.end()))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT category, count, date FROM status_counts ORDER BY date, category, count",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };
        rows.iter().map(point_from_row).collect()
    }

    async fn delete_timeline_points(&self, range: DateRange) -> Result<u64> {
        let result = sqlx::query("DELETE FROM status_counts WHERE date >= ? AND date < ?")
            .bind(format_date(range.start()))
            .bind(format_date(range.end()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        let pages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.pool)
            .await?;
        let revisions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM revisions")
            .fetch_one(&self.pool)
            .await?;
        let redacted_content: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM revisions WHERE content IS NULL")
                .fetch_one(&self.pool)
                .await?;
        let timeline_points: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM status_counts")
            .fetch_one(&self.pool)
            .await?;

        let mut stats = CorpusStats {
            pages,
            revisions,
            redacted_content,
            timeline_points,
            ..CorpusStats::default()
        };

        let rows = sqlx::query(
            "SELECT provenance, COUNT(*) AS n FROM categories GROUP BY provenance",
        )
        .fetch_all(&self.pool)
        .await?;
        for row in &rows {
            let provenance: String = row.get("provenance");
            if let Some(p) = Provenance::parse(&provenance) {
                stats.facts_by_provenance.insert(p, row.get("n"));
            }
        }

        let rows = sqlx::query("SELECT category, COUNT(*) AS n FROM categories GROUP BY category")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            stats.labels.insert(row.get("category"), row.get("n"));
        }

        let span = sqlx::query("SELECT MIN(date) AS first, MAX(date) AS last FROM status_counts")
            .fetch_one(&self.pool)
            .await?;
        let first: Option<String> = span.get("first");
        let last: Option<String> = span.get("last");
        if let (Some(first), Some(last)) = (first, last) {
            stats.timeline_span = Some((parse_date(&first)?, parse_date(&last)?));
        }

        Ok(stats)
    }
}
