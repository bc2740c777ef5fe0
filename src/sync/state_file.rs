//! Local watermark file holding a single ISO timestamp.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::errors::SyncError;
use crate::models::parse_timestamp;

/// Read the timestamp stored in `path`.
///
/// A missing, empty or unreadable file yields `None`; only the last two are
/// worth a warning.
pub async fn load(path: &Path) -> Option<DateTime<Utc>> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read state file '{}': {}", path.display(), e);
            return None;
        }
    };

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = parse_timestamp(raw);
    if parsed.is_none() {
        tracing::warn!(
            "State file '{}' holds an unparsable timestamp: {}",
            path.display(),
            raw
        );
    }
    parsed
}

/// Overwrite `path` with `timestamp`.
pub async fn save(path: &Path, timestamp: &str) -> Result<(), SyncError> {
    tokio::fs::write(path, timestamp).await.map_err(|e| {
        SyncError::WatermarkPersist(format!(
            "Failed to write state file '{}': {}",
            path.display(),
            e
        ))
    })?;
    tracing::info!("Saved watermark to state file: {} -> {}", path.display(), timestamp);
    Ok(())
}
