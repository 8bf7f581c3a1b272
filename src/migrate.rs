//! Database schema migrations.
//!
//! Every statement is `CREATE ... IF NOT EXISTS`, so `stl init` can be run
//! any number of times.
//!
//! | Table | Key | Contents |
//! |-------|-----|----------|
//! | `pages` | `page_id` | tracked wiki pages |
//! | `revisions` | `rev_id` | raw revision history (append-only) |
//! | `categories` | `(rev_id, category)` | category facts with provenance |
//! | `status_counts` | `(category, count, date)` | timeline points |
//! | `checkpoints` | `page_id` | last synced revision per page |

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            page_id INTEGER PRIMARY KEY,
            title TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Timestamps are Unix seconds (UTC).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revisions (
            rev_id INTEGER PRIMARY KEY,
            page_id INTEGER NOT NULL,
            user TEXT,
            timestamp INTEGER NOT NULL,
            content TEXT,
            comment TEXT,
            FOREIGN KEY (page_id) REFERENCES pages(page_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            rev_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            provenance TEXT NOT NULL,
            PRIMARY KEY (rev_id, category),
            FOREIGN KEY (rev_id) REFERENCES revisions(rev_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS status_counts (
            category TEXT NOT NULL,
            count INTEGER NOT NULL,
            date TEXT NOT NULL,
            PRIMARY KEY (category, count, date)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checkpoints (
            page_id INTEGER PRIMARY KEY,
            last_rev_id INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_revisions_page_timestamp ON revisions(page_id, timestamp)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_categories_category ON categories(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_status_counts_date ON status_counts(date)")
        .execute(pool)
        .await?;

    Ok(())
}
