use clap::Parser;
use parts_counter::Config;
use parts_counter::db::Db;
use parts_counter::ingest::{CalamineGridReader, Pipeline, SqliteStore};
use std::path::PathBuf;
use std::time::Instant;
use anyhow::{Context, Result};

#[derive(Parser, Debug)]
#[command(name = "parts-counter")]
#[command(about = "Store parts-counter production logs (*.xlsx) and archive the processed files")]
struct Args {
    /// Path to config.toml (defaults to $PARTS_COUNTER_CONFIG, then ./config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration is loaded before the logger so its log_level can act as the default filter
    let config = Config::load(args.config.as_deref());

    let default_level = config
        .as_ref()
        .map(|c| c.logging.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", default_level)
    ).init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            log::error!("Error loading configuration: {:#}", e);
            return Err(e);
        }
    };

    log::info!("Starting parts-counter ingestion");
    log::info!("Source: {}", config.source_dir().display());
    log::info!("Archive: {}", config.archive_root().display());
    log::info!("Error: {}", config.error_root().display());
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());
    db.ensure_schema()
        .with_context(|| format!("Failed to prepare database {}", config.db_path().display()))?;

    let start = Instant::now();
    let pipeline = Pipeline::new(&config, CalamineGridReader, SqliteStore::new(db));
    let report = match pipeline.run() {
        Ok(report) => report,
        Err(e) if e.is_fatal() => {
            log::error!("Configuration error, nothing processed: {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e).context("Batch aborted"),
    };

    if report.discovered == 0 {
        return Ok(());
    }

    log::info!("=== Ingestion Complete ===");
    log::info!("Files discovered: {}", report.discovered);
    log::info!("Files processed: success: {}, errors: {}", report.succeeded, report.failed);
    log::info!("Summaries stored: {}", report.summaries_saved);
    log::info!("Breakdown rows stored: {}", report.breakdowns_saved);
    log::info!("Time: {:?}", start.elapsed());

    if report.move_failures > 0 {
        log::warn!(
            "{} file(s) could not be moved and are still in {}",
            report.move_failures,
            config.source_dir().display()
        );
    }
    if report.failed > 0 {
        log::warn!("Some files failed to ingest. See {} and the logs above.", config.error_root().display());
    }

    Ok(())
}
