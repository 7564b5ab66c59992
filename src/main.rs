//! # leadsync CLI
//!
//! ```bash
//! leadsync --config ./config/leadsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `leadsync init` | Create the SQLite database and run schema migrations |
//! | `leadsync import <csv>` | Reconcile a CSV export into leads and companies |
//! | `leadsync leads` | Browse leads |
//! | `leadsync incomplete` | Browse leads held back for a missing LinkedIn URL |
//! | `leadsync companies` | Browse companies |
//! | `leadsync stats` | Record counts per collection |
//! | `leadsync serve` | Start the HTTP API |
//!
//! ## Examples
//!
//! ```bash
//! leadsync init
//! leadsync import ./exports/apollo.csv --mapping ./config/apollo-mapping.toml
//! leadsync leads --search acme --sort lastName --filter country=norway
//! leadsync serve
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use leadsync::browse::{parse_filter, run_browse};
use leadsync::config;
use leadsync::ingest::{run_import, ImportOptions};
use leadsync::logging::{init_logging, LogFormat};
use leadsync::migrate;
use leadsync::progress::ProgressMode;
use leadsync::server;
use leadsync::stats;
use leadsync_core::browse::{BrowseQuery, SortOrder, DEFAULT_PAGE_SIZE};
use leadsync_core::store::CollectionKind;

/// leadsync: reconcile CRM CSV exports into deduplicated leads and
/// companies with last-updated-wins field merging.
#[derive(Parser)]
#[command(name = "leadsync", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/leadsync.toml")]
    config: PathBuf,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the leads, incomplete_leads and
    /// companies tables. Running it again is safe.
    Init,

    /// Import a CSV export.
    ///
    /// Every row yields one lead outcome and one company outcome. Rows are
    /// reconciled in file order, in chunks of `[ingest].chunk_size`.
    Import {
        /// CSV file with a header row.
        csv: PathBuf,

        /// TOML file of `"Label" = "CSV header"` pairs, laid over `[mappings]`.
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Rows per batch (overrides `[ingest].chunk_size`).
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Show the resolved column mapping and row count without writing.
        #[arg(long)]
        dry_run: bool,

        /// Write every row outcome to this JSON file.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Progress on stderr. Defaults to `human` on a terminal, else `off`.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Browse leads.
    Leads(BrowseArgs),

    /// Browse incomplete leads (no LinkedIn URL yet).
    Incomplete(BrowseArgs),

    /// Browse companies.
    Companies(BrowseArgs),

    /// Show record counts and database size.
    Stats,

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

#[derive(Args)]
struct BrowseArgs {
    /// Case-insensitive substring matched against every field.
    #[arg(long)]
    search: Option<String>,

    /// Attribute key to sort by (e.g. `lastName`). Default: most recently updated first.
    #[arg(long)]
    sort: Option<String>,

    #[arg(long, default_value = "asc")]
    order: SortOrder,

    /// 1-based page number.
    #[arg(long, default_value_t = 1)]
    page: usize,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    size: usize,

    /// `key=value` substring filter on one attribute. Repeatable.
    #[arg(long = "filter", value_parser = parse_filter_arg)]
    filters: Vec<(String, String)>,

    /// Print the page as JSON.
    #[arg(long)]
    json: bool,
}

impl BrowseArgs {
    fn into_query(self) -> (BrowseQuery, bool) {
        let query = BrowseQuery {
            search: self.search,
            sort: self.sort,
            order: self.order,
            page: self.page,
            size: self.size,
            filters: self.filters,
        };
        (query, self.json)
    }
}

fn parse_filter_arg(s: &str) -> Result<(String, String), String> {
    parse_filter(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import {
            csv,
            mapping,
            chunk_size,
            dry_run,
            report,
            progress,
        } => {
            let options = ImportOptions {
                mapping,
                chunk_size,
                dry_run,
                report,
            };
            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            run_import(&cfg, &csv, &options, reporter.as_ref()).await?;
        }
        Commands::Leads(args) => {
            let (query, json) = args.into_query();
            run_browse(&cfg, CollectionKind::Leads, &query, json).await?;
        }
        Commands::Incomplete(args) => {
            let (query, json) = args.into_query();
            run_browse(&cfg, CollectionKind::IncompleteLeads, &query, json).await?;
        }
        Commands::Companies(args) => {
            let (query, json) = args.into_query();
            run_browse(&cfg, CollectionKind::Companies, &query, json).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
