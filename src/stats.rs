//! Database statistics and health overview.
//!
//! Used by `stl stats` to check that sync, categorize, and timeline runs
//! did what was expected, and to spot status-like labels that the
//! vocabulary does not cover.

use anyhow::Result;

use status_timeline_core::store::CorpusStats;
use status_timeline_core::store::Store;
use status_timeline_core::CanonicalStatus;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Labels that mention lost or found media but are not canonical statuses.
pub fn unmatched_status_labels(stats: &CorpusStats) -> Vec<(&str, i64)> {
    stats
        .labels
        .iter()
        .filter(|(label, _)| {
            CanonicalStatus::from_label(label).is_none()
                && (label.contains("lost") || label.contains("found"))
        })
        .map(|(label, n)| (label.as_str(), *n))
        .collect()
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stats = store.corpus_stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Status Timeline — Database Stats");
    println!("================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Pages:       {}", stats.pages);
    println!("  Revisions:   {}", stats.revisions);
    println!("  Redacted:    {}", stats.redacted_content);

    if !stats.facts_by_provenance.is_empty() {
        println!();
        println!("  Category facts:");
        for (provenance, n) in &stats.facts_by_provenance {
            println!("    {:<10} {:>10}", provenance.as_str(), n);
        }
    }

    println!();
    println!("  Distinct labels: {}", stats.labels.len());
    for status in CanonicalStatus::ALL {
        let n = stats.labels.get(status.label()).copied().unwrap_or(0);
        println!("    {:<24} {:>10}", status.label(), n);
    }

    let unmatched = unmatched_status_labels(&stats);
    if !unmatched.is_empty() {
        println!();
        println!("  Status-like labels outside the vocabulary:");
        for (label, n) in unmatched {
            println!("    {:<24} {:>10}", label, n);
        }
    }

    println!();
    match stats.timeline_span {
        Some((first, last)) => println!(
            "  Timeline:    {} points, {} .. {}",
            stats.timeline_points, first, last
        ),
        None => println!("  Timeline:    empty"),
    }
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_labels() {
        let mut stats = CorpusStats::default();
        stats.labels.insert("found media".into(), 4);
        stats.labels.insert("lost episodes".into(), 2);
        stats.labels.insert("cartoons".into(), 9);
        stats.labels.insert("partially found media".into(), 1);

        assert_eq!(unmatched_status_labels(&stats), vec![("lost episodes", 2)]);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
