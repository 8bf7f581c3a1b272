//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/stl.sqlite"
//!
//! [wiki]
//! api_url = "https://lostmediawiki.com/w/api.php"
//!
//! [timeline]
//! start = "2014-06-10"
//! end = "2023-07-04"
//!
//! [backfill]
//! cutover_start = "2019-01-17"
//! cutover_end = "2020-05-16"
//! ```
//!
//! Only `[db]` and `[wiki].api_url` are required. Everything is static:
//! nothing here is discovered at runtime.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use status_timeline_core::backfill::CutoverWindow;
use status_timeline_core::extract::DEFAULT_STATUS_TEMPLATE;
use status_timeline_core::timeline::DateRange;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub wiki: WikiConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WikiConfig {
    pub api_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_revision_limit")]
    pub revision_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_user_agent() -> String {
    format!("status-timeline/{}", env!("CARGO_PKG_VERSION"))
}
fn default_page_limit() -> u32 {
    500
}
fn default_revision_limit() -> u32 {
    50
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    #[serde(default = "default_status_template")]
    pub status_template: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            status_template: default_status_template(),
        }
    }
}

fn default_status_template() -> String {
    DEFAULT_STATUS_TEMPLATE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimelineConfig {
    #[serde(default = "default_timeline_start")]
    pub start: NaiveDate,
    #[serde(default = "default_timeline_end")]
    pub end: NaiveDate,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            start: default_timeline_start(),
            end: default_timeline_end(),
        }
    }
}

impl TimelineConfig {
    pub fn range(&self) -> Result<DateRange> {
        Ok(DateRange::new(self.start, self.end)?)
    }
}

fn default_timeline_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2014, 6, 10).unwrap_or_default()
}
fn default_timeline_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 7, 4).unwrap_or_default()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackfillConfig {
    #[serde(default = "default_cutover_start")]
    pub cutover_start: NaiveDate,
    #[serde(default = "default_cutover_end")]
    pub cutover_end: NaiveDate,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            cutover_start: default_cutover_start(),
            cutover_end: default_cutover_end(),
        }
    }
}

impl BackfillConfig {
    pub fn window(&self) -> Result<CutoverWindow> {
        Ok(CutoverWindow::from_dates(self.cutover_start, self.cutover_end)?)
    }
}

fn default_cutover_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 17).unwrap_or_default()
}
fn default_cutover_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 5, 16).unwrap_or_default()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate wiki
    if config.wiki.api_url.trim().is_empty() {
        anyhow::bail!("wiki.api_url must not be empty");
    }
    if !(1..=500).contains(&config.wiki.page_limit) {
        anyhow::bail!("wiki.page_limit must be in [1, 500]");
    }
    if !(1..=50).contains(&config.wiki.revision_limit) {
        anyhow::bail!("wiki.revision_limit must be in [1, 50] when fetching content");
    }

    // Validate extract
    if config.extract.status_template.trim().is_empty() {
        anyhow::bail!("extract.status_template must not be empty");
    }

    // Validate date ranges
    config
        .timeline
        .range()
        .context("timeline.end must be after timeline.start")?;
    config
        .backfill
        .window()
        .context("backfill.cutover_end must not be before backfill.cutover_start")?;

    Ok(config)
}
