//! Configuration module for the army sync tool.
//!
//! Values come from command-line flags, which fall back to `ARMY_SYNC_*`
//! environment variables (a `.env` file is honored) and then to defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::errors::SyncError;
use crate::models::parse_timestamp;

/// Mapping from hero name to the numeric id the game uses in army links.
///
/// Loaded once at startup and handed to the transform; must stay in step with
/// the ids the web frontend uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeroIds(BTreeMap<String, i64>);

impl Default for HeroIds {
    fn default() -> Self {
        Self::from_pairs([
            ("Barbarian King", 0),
            ("Archer Queen", 1),
            ("Grand Warden", 2),
            ("Royal Champion", 4),
            ("Minion Prince", 6),
        ])
    }
}

impl HeroIds {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(name, id)| (name.to_string(), id))
                .collect(),
        )
    }

    /// Load a `{"Hero Name": id}` JSON file.
    pub fn from_file(path: &Path) -> Result<Self, SyncError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Failed to read hero ids {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            SyncError::Config(format!("Invalid hero ids {}: {}", path.display(), e))
        })
    }

    pub fn get(&self, hero: &str) -> Option<i64> {
        self.0.get(hero).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root URL of the web application serving the export
    pub base_url: String,
    /// Path to the SQLite file backing the document store
    pub db_path: PathBuf,
    /// Collection army documents are written to
    pub collection: String,
    /// Transform and print a preview without writing
    pub dry_run: bool,
    /// Inclusive lower bound used when no stored watermark exists
    pub since: Option<DateTime<Utc>>,
    /// Local file mirroring the latest synced timestamp
    pub state_file: Option<PathBuf>,
    /// Skip documents whose stored `updatedTime` is not older
    pub skip_not_newer: bool,
    /// Keep the watermark in the destination store
    pub remote_watermark: bool,
    pub watermark_collection: String,
    pub watermark_doc: String,
    /// Only record the current frontier, write nothing else
    pub init_watermark: bool,
    /// Documents per committed batch
    pub batch_size: usize,
    /// Pause after each intermediate commit
    pub batch_pause: Duration,
    /// Timeout for the export request
    pub fetch_timeout: Duration,
    pub hero_ids: HeroIds,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            db_path: PathBuf::from("./data/armies.sqlite"),
            collection: "armies".to_string(),
            dry_run: false,
            since: None,
            state_file: Some(PathBuf::from(".sync_state.txt")),
            skip_not_newer: false,
            remote_watermark: true,
            watermark_collection: "migration".to_string(),
            watermark_doc: "cocarmies".to_string(),
            init_watermark: false,
            batch_size: 400,
            batch_pause: Duration::from_millis(100),
            fetch_timeout: Duration::from_secs(30),
            hero_ids: HeroIds::default(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Build and validate configuration from parsed command-line arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, SyncError> {
        if cli.batch_size == 0 {
            return Err(SyncError::Config(
                "--batch-size must be at least 1".to_string(),
            ));
        }

        let since = match cli.since.as_deref() {
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                SyncError::Config(format!("--since is not an ISO-8601 timestamp: {}", raw))
            })?),
            None => None,
        };

        let hero_ids = match cli.hero_ids.as_deref() {
            Some(path) => HeroIds::from_file(path)?,
            None => HeroIds::default(),
        };

        Ok(Self {
            base_url: cli.base_url,
            db_path: cli.db_path,
            collection: cli.collection,
            dry_run: cli.dry_run,
            since,
            state_file: cli.state_file,
            skip_not_newer: cli.skip_not_newer,
            // An explicit --remote-watermark beats the env fallback of its negation
            remote_watermark: cli.remote_watermark || !cli.no_remote_watermark,
            watermark_collection: cli.watermark_collection,
            watermark_doc: cli.watermark_doc,
            init_watermark: cli.init_watermark,
            batch_size: cli.batch_size,
            batch_pause: Duration::from_millis(cli.batch_pause_ms),
            fetch_timeout: Duration::from_secs(cli.fetch_timeout_secs),
            hero_ids,
            log_level: cli.log_level,
            log_json: cli.log_json,
        })
    }

    /// Full URL of the army export endpoint.
    pub fn export_url(&self) -> String {
        format!("{}/api/export/armies", self.base_url.trim_end_matches('/'))
    }
}
