//! MediaWiki Action API connector.
//!
//! Lists content pages and pulls their full revision history through
//! `api.php`, following the API's continuation protocol until every batch
//! has been read.
//!
//! # Configuration
//!
//! ```toml
//! [wiki]
//! api_url = "https://lostmediawiki.com/w/api.php"
//! user_agent = "status-timeline/0.1 (ops@example.org)"
//! page_limit = 500      # aplimit
//! revision_limit = 50   # rvlimit; the API caps content-bearing queries at 50
//! ```
//!
//! # Requests
//!
//! | Step | Parameters |
//! |------|------------|
//! | pages | `list=allpages&apfilterredir=nonredirects&aplimit=N` |
//! | revisions | `prop=revisions&pageids=ID&rvprop=ids\|timestamp\|comment\|user\|content&rvslots=main&rvdir=newer&rvlimit=N` |
//!
//! Incremental sync passes `rvstartid` (inclusive on the API side, so the
//! checkpointed revision itself is filtered out here).
//!
//! # Redaction
//!
//! Revision-deleted fields come back as marker keys (`userhidden`,
//! `commenthidden`, and `texthidden` on the main slot) instead of values.
//! Each marker maps its field to `None`.
//!
//! # Retries
//!
//! HTTP 429, 5xx and network errors are retried with exponential backoff
//! (1s, 2s, 4s, ... capped at 32s) up to `max_retries`. Other 4xx statuses
//! and API `error` payloads fail immediately.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use status_timeline_core::models::{Page, PageId, Revision, RevisionId};

use crate::config::WikiConfig;
use crate::traits::RevisionSource;

/// A [`RevisionSource`] backed by a live MediaWiki installation.
pub struct WikiSource {
    config: WikiConfig,
    client: reqwest::Client,
}

impl WikiSource {
    pub fn new(config: &WikiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Issue one `action=query` request, retrying transient failures.
    async fn query(&self, params: &[(String, String)]) -> Result<Value> {
        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tracing::warn!(attempt, ?delay, "retrying wiki API request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .get(&self.config.api_url)
                .query(&[("action", "query"), ("format", "json")])
                .query(params)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response
                            .json()
                            .await
                            .context("wiki API returned invalid JSON")?;
                        return Ok(json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "wiki API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("wiki API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("wiki API request failed after retries")))
    }
}

#[async_trait]
impl RevisionSource for WikiSource {
    fn name(&self) -> &str {
        &self.config.api_url
    }

    async fn list_pages(&self) -> Result<Vec<Page>> {
        let base = vec![
            ("list".to_string(), "allpages".to_string()),
            ("apfilterredir".to_string(), "nonredirects".to_string()),
            ("aplimit".to_string(), self.config.page_limit.to_string()),
        ];

        let mut pages = Vec::new();
        let mut cont: Option<Vec<(String, String)>> = None;

        loop {
            let mut params = base.clone();
            if let Some(c) = &cont {
                params.extend(c.iter().cloned());
            }
            let batch = parse_page_batch(self.query(&params).await?)?;
            tracing::debug!(batch = batch.items.len(), "listed pages");
            pages.extend(batch.items);

            match batch.cont {
                Some(c) => cont = Some(c),
                None => break,
            }
        }

        Ok(pages)
    }

    async fn fetch_revisions(
        &self,
        page_id: PageId,
        after: Option<RevisionId>,
    ) -> Result<Vec<Revision>> {
        let mut base = vec![
            ("prop".to_string(), "revisions".to_string()),
            ("pageids".to_string(), page_id.to_string()),
            (
                "rvprop".to_string(),
                "ids|timestamp|comment|user|content".to_string(),
            ),
            ("rvslots".to_string(), "main".to_string()),
            ("rvdir".to_string(), "newer".to_string()),
            ("rvlimit".to_string(), self.config.revision_limit.to_string()),
        ];
        if let Some(last) = after {
            base.push(("rvstartid".to_string(), last.to_string()));
        }

        let mut revisions = Vec::new();
        let mut cont: Option<Vec<(String, String)>> = None;

        loop {
            let mut params = base.clone();
            if let Some(c) = &cont {
                params.extend(c.iter().cloned());
            }
            let batch = parse_revision_batch(self.query(&params).await?, page_id)?;
            revisions.extend(batch.items);

            match batch.cont {
                Some(c) => cont = Some(c),
                None => break,
            }
        }

        if let Some(last) = after {
            revisions.retain(|r| r.rev_id > last);
        }
        revisions.sort_by_key(|r| r.rev_id);
        revisions.dedup_by_key(|r| r.rev_id);

        Ok(revisions)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Response parsing
// ═══════════════════════════════════════════════════════════════════════

/// One page of API results plus the continuation parameters, if any.
#[derive(Debug)]
struct Batch<T> {
    items: Vec<T>,
    cont: Option<Vec<(String, String)>>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct AllPagesQuery {
    #[serde(default)]
    allpages: Vec<RawListedPage>,
}

#[derive(Debug, Deserialize)]
struct RawListedPage {
    pageid: PageId,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RevisionsQuery {
    #[serde(default)]
    pages: BTreeMap<String, RawPage>,
}

#[derive(Debug, Deserialize)]
struct RawPage {
    #[serde(default)]
    missing: Option<Value>,
    #[serde(default)]
    revisions: Vec<RawRevision>,
}

#[derive(Debug, Deserialize)]
struct RawRevision {
    revid: RevisionId,
    timestamp: DateTime<Utc>,
    user: Option<String>,
    userhidden: Option<Value>,
    comment: Option<String>,
    commenthidden: Option<Value>,
    slots: Option<RawSlots>,
}

#[derive(Debug, Deserialize)]
struct RawSlots {
    main: Option<RawSlot>,
}

#[derive(Debug, Deserialize)]
struct RawSlot {
    #[serde(rename = "*")]
    content: Option<String>,
    texthidden: Option<Value>,
}

impl RawRevision {
    fn into_revision(self, page_id: PageId) -> Revision {
        let user = if self.userhidden.is_some() {
            None
        } else {
            self.user
        };
        let comment = if self.commenthidden.is_some() {
            None
        } else {
            self.comment
        };
        let content = self
            .slots
            .and_then(|s| s.main)
            .and_then(|m| if m.texthidden.is_some() { None } else { m.content });

        Revision {
            rev_id: self.revid,
            page_id,
            user,
            timestamp: self.timestamp,
            content,
            comment,
        }
    }
}

/// Fail on an API-level `error` object and pull out the `continue` block.
fn check_envelope(body: &Value) -> Result<Option<Vec<(String, String)>>> {
    if let Some(err) = body.get("error") {
        let err: ApiError =
            serde_json::from_value(err.clone()).context("malformed wiki API error payload")?;
        bail!("wiki API error {}: {}", err.code, err.info);
    }

    let cont = match body.get("continue").and_then(|c| c.as_object()) {
        Some(map) => map
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect::<Vec<_>>(),
        None => return Ok(None),
    };

    Ok(if cont.is_empty() { None } else { Some(cont) })
}

fn parse_page_batch(body: Value) -> Result<Batch<Page>> {
    let cont = check_envelope(&body)?;
    let query: AllPagesQuery = match body.get("query") {
        Some(q) => serde_json::from_value(q.clone()).context("malformed allpages response")?,
        None => bail!("wiki API response has no query block"),
    };

    let items = query
        .allpages
        .into_iter()
        .map(|p| Page {
            page_id: p.pageid,
            title: p.title,
        })
        .collect();

    Ok(Batch { items, cont })
}

fn parse_revision_batch(body: Value, page_id: PageId) -> Result<Batch<Revision>> {
    let cont = check_envelope(&body)?;
    let query: RevisionsQuery = match body.get("query") {
        Some(q) => serde_json::from_value(q.clone()).context("malformed revisions response")?,
        None => bail!("wiki API response has no query block"),
    };

    let mut items = Vec::new();
    if let Some(page) = query.pages.into_values().next() {
        if page.missing.is_some() {
            tracing::warn!(page_id, "page is missing on the wiki");
        }
        items.extend(page.revisions.into_iter().map(|r| r.into_revision(page_id)));
    }

    Ok(Batch { items, cont })
}
