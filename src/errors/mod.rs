//! Error handling module for the army sync tool.
//!
//! Provides the central error type and the stable error codes reported in logs.

use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const FETCH_ERROR: &str = "FETCH_ERROR";
    pub const WATERMARK_UNAVAILABLE: &str = "WATERMARK_UNAVAILABLE";
    pub const RECORD_ERROR: &str = "RECORD_ERROR";
    pub const BATCH_COMMIT_ERROR: &str = "BATCH_COMMIT_ERROR";
    pub const WATERMARK_PERSIST_ERROR: &str = "WATERMARK_PERSIST_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const JSON_ERROR: &str = "JSON_ERROR";
    pub const IO_ERROR: &str = "IO_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
}

/// Sync error type.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The export endpoint answered with a non-200 status or an unusable body
    #[error("fetch failed: {0}")]
    Fetch(String),
    /// No persisted watermark and no explicit lower bound
    #[error("watermark unavailable: {0}")]
    WatermarkUnavailable(String),
    /// A single record could not be transformed or enqueued
    #[error("record {id}: {message}")]
    Record { id: i64, message: String },
    /// A batch of writes could not be committed
    #[error("batch commit failed after {processed} records: {message}")]
    BatchCommit { processed: usize, message: String },
    /// The watermark could not be written after a successful run
    #[error("watermark persist failed: {0}")]
    WatermarkPersist(String),
    /// Destination database error
    #[error("database error: {0}")]
    Database(String),
    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(String),
    /// Local file error
    #[error("I/O error: {0}")]
    Io(String),
    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::Fetch(_) => codes::FETCH_ERROR,
            SyncError::WatermarkUnavailable(_) => codes::WATERMARK_UNAVAILABLE,
            SyncError::Record { .. } => codes::RECORD_ERROR,
            SyncError::BatchCommit { .. } => codes::BATCH_COMMIT_ERROR,
            SyncError::WatermarkPersist(_) => codes::WATERMARK_PERSIST_ERROR,
            SyncError::Database(_) => codes::DATABASE_ERROR,
            SyncError::Json(_) => codes::JSON_ERROR,
            SyncError::Io(_) => codes::IO_ERROR,
            SyncError::Config(_) => codes::CONFIG_ERROR,
        }
    }

    /// Whether this error ends the run.
    ///
    /// Record and watermark-persist failures are counted or warned about, everything else aborts.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            SyncError::Record { .. } | SyncError::WatermarkPersist(_)
        )
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        SyncError::Database(err.to_string())
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("HTTP error: {:?}", err);
        SyncError::Fetch(err.to_string())
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        SyncError::Json(err.to_string())
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        SyncError::Io(err.to_string())
    }
}
