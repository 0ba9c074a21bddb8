use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dota_ingest::config::IngestConfig;
use dota_ingest::ingest::{DEFAULT_MAX_PLAYER_MATCHES, IngestSummary, Ingestor};
use dota_ingest::logging::init_logging;
use dota_ingest::opendota::OpenDotaClient;
use dota_ingest::pagination::CursorOrder;
use dota_ingest::store::{self, Store};

/// Pull Dota 2 matches, players and chat from OpenDota into SQLite
#[derive(Parser)]
#[command(name = "dota_ingest", version)]
struct Cli {
    /// SQLite database file (env: DOTA_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// API base url (env: OPENDOTA_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in seconds, 0 disables it (env: OPENDOTA_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Create missing tables before ingesting
    #[arg(long, global = true)]
    init_schema: bool,

    /// Log filter, overridden by RUST_LOG (env: DOTA_INGEST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the professional match feed backwards, 100 matches per round
    Pro {
        #[arg(long, default_value_t = 1)]
        rounds: usize,

        /// Ordering used to pick the next page cursor
        #[arg(long, value_enum, default_value_t = CursorOrder::Lexicographic)]
        cursor_order: CursorOrder,
    },
    /// Ingest the recent match history of one account
    Player {
        account_id: i64,

        /// Number of most recent matches to process, 0 for all
        #[arg(long, default_value_t = DEFAULT_MAX_PLAYER_MATCHES)]
        max_matches: i64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = IngestConfig::from_env();
    if let Some(db) = cli.db {
        cfg.db_path = db;
    }
    if let Some(url) = cli.api_url {
        cfg.api_url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        cfg.timeout_secs = secs;
    }
    if let Some(level) = cli.log_level {
        cfg.log_level = level;
    }
    init_logging(&cfg.log_level)?;

    let source = OpenDotaClient::from_config(&cfg)?;
    let conn = store::open_db(&cfg.db_path)?;
    if cli.init_schema {
        store::init_schema(&conn)?;
    }
    let mut store = Store::begin(conn)?;
    info!(db = %cfg.db_path.display(), api = %cfg.api_url, "fetching started");

    let mut ingestor = Ingestor::new(&source, &mut store);
    match cli.command {
        Command::Pro {
            rounds,
            cursor_order,
        } => ingestor.process_pro_matches(rounds, cursor_order),
        Command::Player {
            account_id,
            max_matches,
        } => ingestor.process_player(account_id, max_matches)?,
    }
    let summary = ingestor.finish();

    store.commit()?;
    if cli.json {
        let json =
            serde_json::to_string_pretty(&summary).context("serialize ingest summary")?;
        println!("{json}");
    } else {
        print_summary(&cfg, &summary);
    }
    Ok(())
}

fn print_summary(cfg: &IngestConfig, summary: &IngestSummary) {
    println!("Ingest complete");
    println!("DB: {}", cfg.db_path.display());
    println!(
        "Started: {}  Finished: {}",
        summary.started_at,
        summary.finished_at.as_deref().unwrap_or("n/a")
    );
    if summary.rounds_total > 0 {
        println!(
            "Rounds: {}/{}",
            summary.rounds_total - summary.rounds_failed,
            summary.rounds_total
        );
    }
    println!(
        "A total of {} of {} matches was added.",
        summary.matches_added, summary.matches_attempted
    );
    if summary.suppressed_writes > 0 {
        println!("Suppressed writes: {}", summary.suppressed_writes);
    }
    if !summary.errors.is_empty() {
        println!("Errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }
}
