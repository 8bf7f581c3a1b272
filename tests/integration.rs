use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use status_timeline::config::load_config;
use status_timeline::db;
use status_timeline::migrate::migrate_pool;
use status_timeline::sqlite_store::SqliteStore;
use status_timeline_core::models::{Page, Revision};
use status_timeline_core::store::Store;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/stl.sqlite"

[wiki]
api_url = "http://127.0.0.1:9/w/api.php"
max_retries = 0

[timeline]
start = "2020-06-01"
end = "2020-06-04"
"#,
        root.display()
    );

    let config_path = config_dir.join("stl.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_stl(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_stl"))
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run stl binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

/// Write revisions straight into the configured database, standing in for
/// a wiki sync.
fn seed(config_path: &Path, revisions: &[(i64, i64, DateTime<Utc>, &str)]) {
    let cfg = load_config(config_path).unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let pool = db::connect(&cfg).await.unwrap();
        migrate_pool(&pool).await.unwrap();
        let store = SqliteStore::new(pool.clone());
        for (rev_id, page_id, timestamp, content) in revisions {
            store
                .upsert_page(&Page {
                    page_id: *page_id,
                    title: Some(format!("Page {}", page_id)),
                })
                .await
                .unwrap();
            store
                .insert_revision(&Revision {
                    rev_id: *rev_id,
                    page_id: *page_id,
                    user: Some("Editor".into()),
                    timestamp: *timestamp,
                    content: Some(content.to_string()),
                    comment: None,
                })
                .await
                .unwrap();
        }
        pool.close().await;
    });
}

fn seed_end_to_end(config_path: &Path) {
    seed(
        config_path,
        &[
            (11, 1, at(2020, 1, 1, 0), "An unlabelled pilot."),
            (
                12,
                1,
                at(2020, 6, 1, 12),
                "{{LMW|image=pilot.png|status=lost}} An unlabelled pilot.",
            ),
            (21, 2, at(2020, 3, 1, 0), "[[Category:Found Media]] A commercial."),
        ],
    );
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_stl(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));

    let (_, _, again) = run_stl(&config_path, &["init"]);
    assert!(again, "Second init failed (not idempotent)");
}

#[test]
fn test_categorize_then_snapshot() {
    let (_tmp, config_path) = setup_test_env();
    seed_end_to_end(&config_path);

    let (stdout, stderr, success) = run_stl(&config_path, &["categorize"]);
    assert!(success, "categorize failed: {}", stderr);
    assert!(stdout.contains("revisions scanned: 3"));
    assert!(stdout.contains("facts inserted: 2"));
    assert!(stdout.trim_end().ends_with("ok"));

    let (stdout, _, success) = run_stl(&config_path, &["snapshot", "2020-02-01"]);
    assert!(success);
    assert_eq!(stdout.trim(), "");

    let (stdout, _, success) = run_stl(&config_path, &["snapshot", "2020-07-01"]);
    assert!(success);
    assert_eq!(stdout, "completely lost media\t1\nfound media\t1\n");
}

#[test]
fn test_categorize_idempotent() {
    let (_tmp, config_path) = setup_test_env();
    seed_end_to_end(&config_path);

    run_stl(&config_path, &["categorize"]);
    let (stdout, _, success) = run_stl(&config_path, &["categorize"]);
    assert!(success);
    assert!(stdout.contains("facts inserted: 0"));
}

#[test]
fn test_timeline_rerun_adds_nothing() {
    let (_tmp, config_path) = setup_test_env();
    seed_end_to_end(&config_path);
    run_stl(&config_path, &["categorize"]);

    let (stdout, stderr, success) = run_stl(&config_path, &["timeline"]);
    assert!(success, "timeline failed: {}", stderr);
    assert!(stdout.contains("days: 3"));
    assert!(stdout.contains("points inserted: 5"));

    let (stdout, _, success) = run_stl(&config_path, &["timeline"]);
    assert!(success);
    assert!(stdout.contains("points inserted: 0"));
    assert!(stdout.contains("points unchanged: 5"));

    let (json, _, success) = run_stl(&config_path, &["export"]);
    assert!(success);
    let points: serde_json::Value = serde_json::from_str(&json).unwrap();
    let points = points.as_array().unwrap();
    assert_eq!(points.len(), 5);
    assert_eq!(points[0]["date"], "2020-06-01");
    assert_eq!(points[0]["category"], "found media");
    assert_eq!(points[0]["count"], 1);
}

#[test]
fn test_reversed_range_fails_fast() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_stl(
        &config_path,
        &["timeline", "--start", "2020-02-01", "--end", "2020-01-01"],
    );
    assert!(!success);
    assert!(stderr.contains("must be after start"), "stderr: {}", stderr);
}

#[test]
fn test_backfill_marks_earlier_revisions() {
    let (_tmp, config_path) = setup_test_env();
    seed(
        &config_path,
        &[
            (31, 3, at(2018, 1, 1, 0), "A lost broadcast."),
            (32, 3, at(2019, 6, 1, 0), "A lost broadcast, expanded."),
            (
                33,
                3,
                at(2020, 5, 10, 0),
                "[[Category:Completely Lost Media]] A lost broadcast.",
            ),
            (41, 4, at(2018, 1, 1, 0), "A lost trailer."),
            (
                42,
                4,
                at(2021, 1, 1, 0),
                "[[Category:Completely Lost Media]] A lost trailer.",
            ),
        ],
    );
    run_stl(&config_path, &["categorize"]);

    let (stdout, _, _) = run_stl(&config_path, &["snapshot", "2018-06-01"]);
    assert_eq!(stdout.trim(), "");

    let (stdout, stderr, success) = run_stl(&config_path, &["backfill"]);
    assert!(success, "backfill failed: {}", stderr);
    assert!(stdout.contains("pages matched: 1"));
    assert!(stdout.contains("facts added: 2"));
    assert!(stdout.contains("--rebuild"));

    let (stdout, _, _) = run_stl(&config_path, &["snapshot", "2018-06-01"]);
    assert_eq!(stdout, "completely lost media\t1\n");

    let (stdout, _, success) = run_stl(&config_path, &["backfill"]);
    assert!(success);
    assert!(stdout.contains("facts added: 0"));

    let (stdout, _, _) = run_stl(&config_path, &["stats"]);
    assert!(stdout.contains("backfill"));
}

#[test]
fn test_sync_unreachable_wiki_fails() {
    let (_tmp, config_path) = setup_test_env();
    run_stl(&config_path, &["init"]);

    let (_, _, success) = run_stl(&config_path, &["sync"]);
    assert!(!success);
}
