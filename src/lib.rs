//! # Status Timeline
//!
//! Reconstructs a daily time series of how many wiki articles carried each
//! media status (completely lost, partially lost, partially found, found)
//! from the wiki's full revision history.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ MediaWiki   │──▶│  sync        │──▶│  SQLite        │
//! │ api.php     │   │ (revisions)  │   │ pages/revs     │
//! └─────────────┘   └──────────────┘   └──────┬────────┘
//!                                             │
//!                ┌─────────────┬──────────────┤
//!                ▼             ▼              ▼
//!          ┌──────────┐  ┌──────────┐  ┌────────────┐
//!          │categorize│  │ backfill │  │  timeline  │──▶ export (JSON)
//!          │ facts    │  │ (opt-in) │  │ day counts │
//!          └──────────┘  └──────────┘  └────────────┘
//! ```
//!
//! Extraction, snapshots, the timeline, and the backfill live in
//! [`status_timeline_core`]; this crate wires them to SQLite, the wiki API,
//! and the `stl` command line.
//!
//! ## Quick Start
//!
//! ```bash
//! stl init                      # create database
//! stl sync                      # pull pages and revisions
//! stl categorize                # extract category facts
//! stl timeline                  # compute daily counts
//! stl export --output out.json  # hand off to the chart renderer
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`traits`] | `RevisionSource` extension point |
//! | [`connector_wiki`] | MediaWiki API revision source |
//! | [`ingest`] | `stl sync` |
//! | [`categorize`] | `stl categorize` |
//! | [`snapshot`] | `stl snapshot` |
//! | [`timeline`] | `stl timeline` |
//! | [`backfill`] | `stl backfill` |
//! | [`export`] | `stl export` |
//! | [`stats`] | `stl stats` |
//! | [`progress`] | Batch progress on stderr |

pub mod backfill;
pub mod categorize;
pub mod config;
pub mod connector_wiki;
pub mod db;
pub mod export;
pub mod ingest;
pub mod migrate;
pub mod progress;
pub mod snapshot;
pub mod sqlite_store;
pub mod stats;
pub mod timeline;
pub mod traits;
