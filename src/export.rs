//! Export the timeline as JSON for charting.
//!
//! Produces an array of `{date, category, count}` objects ordered by date,
//! the input of the stacked-area chart renderer.

use anyhow::{Context, Result};
use std::path::Path;

use status_timeline_core::store::Store;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Serialize every stored timeline point as pretty JSON.
pub async fn timeline_json(store: &dyn Store) -> Result<(usize, String)> {
    let points = store.timeline_points(None).await?;
    let json = serde_json::to_string_pretty(&points)?;
    Ok((points.len(), json))
}

/// If `output` is `Some`, writes to that file path. Otherwise writes to
/// stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());

    let (count, json) = timeline_json(&store).await?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported {} timeline points to {}", count, path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use status_timeline_core::models::TimelinePoint;
    use status_timeline_core::store::memory::InMemoryStore;
    use status_timeline_core::CanonicalStatus;

    #[tokio::test]
    async fn test_export_shape() {
        let store = InMemoryStore::default();
        store
            .insert_timeline_point(&TimelinePoint {
                date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
                category: CanonicalStatus::Found,
                count: 3,
            })
            .await
            .unwrap();
        store
            .insert_timeline_point(&TimelinePoint {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                category: CanonicalStatus::CompletelyLost,
                count: 7,
            })
            .await
            .unwrap();

        let (count, json) = timeline_json(&store).await.unwrap();
        assert_eq!(count, 2);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows[0]["date"], "2020-01-01");
        assert_eq!(rows[0]["category"], "completely lost media");
        assert_eq!(rows[0]["count"], 7);
        assert_eq!(rows[1]["category"], "found media");
    }
}
