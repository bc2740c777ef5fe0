//! Army Sync
//!
//! Pulls the army export from the web application and merges it into the
//! document store, one watermark-bounded increment per run.

mod cli;
mod config;
mod db;
mod errors;
mod models;
mod source;
mod sync;
mod transform;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use config::Config;
use db::Repository;
use errors::SyncError;
use source::ExportClient;
use sync::{RunMode, SyncEngine, SyncReport};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    match run(&config).await {
        Ok(report) => {
            log_summary(&config, &report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = e.error_code(), "Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging; `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn run(config: &Config) -> Result<SyncReport, SyncError> {
    tracing::info!("Opening document store: {:?}", config.db_path);
    let pool = db::init_database(&config.db_path).await?;
    let repo = Repository::new(pool);

    let client = ExportClient::new(config.export_url(), config.fetch_timeout)?;
    tracing::info!("Fetching armies from: {}", client.url());
    let snapshot = client.fetch_armies().await?;

    tracing::debug!("Using {} hero link ids", config.hero_ids.len());
    let report = SyncEngine::new(config, &repo).run(snapshot).await?;

    if report.mode == RunMode::DryRun {
        println!("{}", serde_json::to_string_pretty(&report.preview)?);
    }
    if report.mode == RunMode::Synced {
        let stored = repo.count_documents(&config.collection).await?;
        tracing::debug!("Collection '{}' holds {} documents", config.collection, stored);
    }

    Ok(report)
}

fn log_summary(config: &Config, report: &SyncReport) {
    match report.mode {
        RunMode::Initialized => tracing::info!(
            "Watermark initialized from {} armies; nothing uploaded",
            report.fetched
        ),
        RunMode::DryRun => tracing::info!(
            "Dry run complete. Total armies available: {}, pending: {}",
            report.fetched,
            report.pending
        ),
        RunMode::Synced => tracing::info!(
            "Uploaded {}/{} armies to collection '{}'. Skipped: {}. Failed: {}. Unreadable: {}.",
            report.uploaded,
            report.fetched,
            config.collection,
            report.skipped,
            report.failed,
            report.rejected
        ),
    }

    match &report.watermark {
        Some(wm) => tracing::info!("Watermark: time={} id={}", wm.raw_timestamp, wm.last_id),
        None => tracing::info!("Watermark: none"),
    }
}
