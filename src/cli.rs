use std::path::PathBuf;

use clap::Parser;

/// Sync exported armies from the web application into the document store.
#[derive(Debug, Parser)]
#[command(name = "army-sync", version, about)]
pub struct Cli {
    /// Root URL of the web application, e.g. http://localhost:5173
    #[arg(long, env = "ARMY_SYNC_BASE_URL", default_value = "http://localhost:5173")]
    pub base_url: String,

    /// SQLite file backing the destination document store.
    #[arg(long, env = "ARMY_SYNC_DB_PATH", default_value = "./data/armies.sqlite")]
    pub db_path: PathBuf,

    /// Collection army documents are written to.
    #[arg(long, env = "ARMY_SYNC_COLLECTION", default_value = "armies")]
    pub collection: String,

    /// Print the first few transformed documents instead of writing.
    #[arg(long, env = "ARMY_SYNC_DRY_RUN")]
    pub dry_run: bool,

    /// Only sync armies updated at or after this ISO time (e.g. 2024-07-01T00:00:00Z)
    /// when no stored watermark exists.
    #[arg(long, env = "ARMY_SYNC_SINCE")]
    pub since: Option<String>,

    /// Local file holding the latest synced timestamp.
    #[arg(long, env = "ARMY_SYNC_STATE_FILE", default_value = ".sync_state.txt")]
    pub state_file: Option<PathBuf>,

    /// Skip documents whose stored updatedTime is not older than the export's.
    #[arg(long, env = "ARMY_SYNC_SKIP_NOT_NEWER")]
    pub skip_not_newer: bool,

    /// Keep the watermark in the destination store (the default).
    #[arg(long, overrides_with = "no_remote_watermark")]
    pub remote_watermark: bool,

    /// Keep the watermark in a local file only instead of the destination store.
    #[arg(long, env = "ARMY_SYNC_NO_REMOTE_WATERMARK", overrides_with = "remote_watermark")]
    pub no_remote_watermark: bool,

    /// Collection holding the watermark document.
    #[arg(long, env = "ARMY_SYNC_WATERMARK_COLLECTION", default_value = "migration")]
    pub watermark_collection: String,

    /// Id of the watermark document.
    #[arg(long, env = "ARMY_SYNC_WATERMARK_DOC", default_value = "cocarmies")]
    pub watermark_doc: String,

    /// Record the current export frontier as the watermark without writing any armies.
    #[arg(long, env = "ARMY_SYNC_INIT_WATERMARK")]
    pub init_watermark: bool,

    /// Documents per committed batch.
    #[arg(long, env = "ARMY_SYNC_BATCH_SIZE", default_value_t = 400)]
    pub batch_size: usize,

    /// Pause after each intermediate batch commit, in milliseconds.
    #[arg(long, env = "ARMY_SYNC_BATCH_PAUSE_MS", default_value_t = 100)]
    pub batch_pause_ms: u64,

    /// Timeout for the export request, in seconds.
    #[arg(long, env = "ARMY_SYNC_FETCH_TIMEOUT_SECS", default_value_t = 30)]
    pub fetch_timeout_secs: u64,

    /// JSON file mapping hero names to link ids; built-in mapping when absent.
    #[arg(long, env = "ARMY_SYNC_HERO_IDS")]
    pub hero_ids: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, env = "ARMY_SYNC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ARMY_SYNC_LOG_JSON")]
    pub log_json: bool,
}
