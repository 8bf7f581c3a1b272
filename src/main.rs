//! # Status Timeline CLI (`stl`)
//!
//! ## Usage
//!
//! ```bash
//! stl --config ./config/stl.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `stl init` | Create the SQLite database and run schema migrations |
//! | `stl sync` | Pull pages and revision history from the wiki |
//! | `stl categorize` | Extract category facts from stored revisions |
//! | `stl snapshot <when>` | Status counts at one instant |
//! | `stl timeline` | Compute and store daily status counts |
//! | `stl backfill` | Retag pre-cutover revisions of lost pages (opt-in) |
//! | `stl export` | Write the timeline as JSON |
//! | `stl stats` | Database overview |
//!
//! Logging goes to stderr and is filtered with `RUST_LOG`
//! (default `status_timeline=info,status_timeline_core=info`).

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use status_timeline::config::load_config;
use status_timeline::progress::ProgressMode;
use status_timeline::{
    backfill, categorize, export, ingest, migrate, snapshot, stats, timeline,
};

/// Status Timeline: daily lost/found media counts rebuilt from wiki history.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/stl.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "stl",
    about = "Rebuild a daily timeline of wiki article status counts from revision history",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/stl.toml")]
    config: PathBuf,

    /// Progress output on stderr. `auto` is human when stderr is a TTY.
    #[arg(long, global = true, value_enum, default_value_t = ProgressArg::Auto)]
    progress: ProgressArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProgressArg {
    Auto,
    Human,
    Json,
    Off,
}

impl ProgressArg {
    fn mode(self) -> ProgressMode {
        match self {
            ProgressArg::Auto => ProgressMode::default_for_tty(),
            ProgressArg::Human => ProgressMode::Human,
            ProgressArg::Json => ProgressMode::Json,
            ProgressArg::Off => ProgressMode::Off,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Pull pages and revisions from the wiki.
    ///
    /// Incremental by default: each page resumes after its last synced
    /// revision.
    Sync {
        /// Ignore checkpoints and refetch every page's full history.
        #[arg(long)]
        full: bool,

        /// Only fetch revisions for the first N pages.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Extract category facts from every stored revision.
    Categorize,

    /// Print status counts at one instant.
    Snapshot {
        /// `YYYY-MM-DD` (start of day, UTC) or an RFC 3339 timestamp.
        at: String,
    },

    /// Compute daily status counts over a date range.
    Timeline {
        /// First day (inclusive). Defaults to `[timeline].start`.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Day after the last one (exclusive). Defaults to `[timeline].end`.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Delete the range's stored points before recomputing.
        #[arg(long)]
        rebuild: bool,
    },

    /// Mark pre-cutover revisions of pages that were lost during the
    /// cutover window.
    Backfill {
        /// Defaults to `[backfill].cutover_start`.
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Defaults to `[backfill].cutover_end`.
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Export the timeline as JSON.
    Export {
        /// Output file. Writes to stdout if omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Show database statistics.
    Stats,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "status_timeline=info,status_timeline_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = load_config(&cli.config)?;
    let reporter = cli.progress.mode().reporter();

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync { full, limit } => {
            ingest::run_sync(&cfg, full, limit, reporter.as_ref()).await?;
        }
        Commands::Categorize => {
            categorize::run_categorize(&cfg, reporter.as_ref()).await?;
        }
        Commands::Snapshot { at } => {
            snapshot::run_snapshot(&cfg, &at).await?;
        }
        Commands::Timeline {
            start,
            end,
            rebuild,
        } => {
            timeline::run_timeline(&cfg, start, end, rebuild, reporter.as_ref()).await?;
        }
        Commands::Backfill { start, end } => {
            backfill::run_backfill(&cfg, start, end).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
