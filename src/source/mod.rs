//! Client for the web application's army export endpoint.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::SyncError;
use crate::models::{parse_timestamp, Army};

/// An export entry that could not be read as an army.
#[derive(Debug)]
pub struct RejectedEntry {
    /// `id` of the entry, -1 when it has none
    pub id: i64,
    /// Updated time, else created time, when either parses
    pub timestamp: Option<DateTime<Utc>>,
    pub error: SyncError,
}

impl RejectedEntry {
    fn from_value(value: &Value, error: serde_json::Error) -> Self {
        let id = value.get("id").and_then(Value::as_i64).unwrap_or(-1);
        let timestamp = ["updatedTime", "createdTime"]
            .into_iter()
            .filter_map(|key| value.get(key).and_then(Value::as_str))
            .find_map(parse_timestamp);

        Self {
            id,
            timestamp,
            error: SyncError::Record {
                id,
                message: format!("unreadable export entry: {}", error),
            },
        }
    }
}

/// Everything one export request returned.
#[derive(Debug, Default)]
pub struct ExportSnapshot {
    pub armies: Vec<Army>,
    pub rejected: Vec<RejectedEntry>,
}

impl ExportSnapshot {
    /// Decode raw export entries, setting aside the ones that are not armies.
    pub fn from_values(values: Vec<Value>) -> Self {
        let mut snapshot = Self::default();
        for value in values {
            match Army::deserialize(&value) {
                Ok(army) => snapshot.armies.push(army),
                Err(e) => snapshot.rejected.push(RejectedEntry::from_value(&value, e)),
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.armies.len() + self.rejected.len()
    }
}

/// HTTP client for `GET /api/export/armies`.
pub struct ExportClient {
    client: reqwest::Client,
    url: String,
}

impl ExportClient {
    /// Create a client for the given export URL.
    ///
    /// The timeout covers the whole request, body included.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("army-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the full army export.
    pub async fn fetch_armies(&self) -> Result<ExportSnapshot, SyncError> {
        tracing::debug!("HTTP GET {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SyncError::Fetch(format!(
                "GET {} failed with status {}",
                self.url, status
            )));
        }

        let raw = response.text().await?;
        let body: Value = serde_json::from_str(&raw).map_err(|_| {
            let preview: String = raw.chars().take(200).collect();
            SyncError::Fetch(format!("Invalid JSON from {}: {}", self.url, preview))
        })?;

        match body {
            Value::Array(values) => Ok(ExportSnapshot::from_values(values)),
            _ => Err(SyncError::Fetch(format!(
                "Export from {} is not a JSON array",
                self.url
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_sets_aside_bad_entries() {
        let snapshot = ExportSnapshot::from_values(vec![
            json!({"id": 1, "name": "ok"}),
            json!({"id": 2, "units": "not a list", "updatedTime": "2024-03-01T00:00:00Z"}),
            json!({"name": "no id", "createdTime": "garbage"}),
        ]);

        assert_eq!(snapshot.armies.len(), 1);
        assert_eq!(snapshot.rejected.len(), 2);
        assert_eq!(snapshot.len(), 3);

        let first = &snapshot.rejected[0];
        assert_eq!(first.id, 2);
        assert_eq!(first.timestamp, parse_timestamp("2024-03-01T00:00:00Z"));
        assert!(matches!(first.error, SyncError::Record { id: 2, .. }));

        let second = &snapshot.rejected[1];
        assert_eq!(second.id, -1);
        assert!(second.timestamp.is_none());
        assert!(matches!(second.error, SyncError::Record { id: -1, .. }));
    }
}
