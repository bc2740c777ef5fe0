//! Document repository.
//!
//! Single writes merge into the stored body: nested objects merge key by key,
//! any other value replaces what was there. Batched writes carry bodies that
//! the caller has already merged (see [`merge_documents`]) and replace the
//! stored row as is, so a commit never depends on what is already stored.

use std::future::Future;

use chrono::Utc;
use serde_json::Value;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::errors::SyncError;

/// A document waiting in a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub collection: String,
    pub id: String,
    pub document: Value,
}

/// Writes committed together or not at all.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    writes: Vec<PendingWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an upsert of the complete `document` at `collection/id`.
    pub fn set(&mut self, collection: &str, id: &str, document: Value) {
        self.writes.push(PendingWrite {
            collection: collection.to_string(),
            id: id.to_string(),
            document,
        });
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Destination of a sync run.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document, `None` if it does not exist.
    fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Value>, SyncError>> + Send;

    /// Merge a single document into the store.
    fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> impl Future<Output = Result<(), SyncError>> + Send;

    /// Apply all writes of a batch atomically and return how many were written.
    fn commit_batch(
        &self,
        batch: WriteBatch,
    ) -> impl Future<Output = Result<usize, SyncError>> + Send;
}

/// Merge `patch` into `target`.
pub fn merge_documents(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_documents(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

/// SQLite-backed document store.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Number of documents in a collection.
    pub async fn count_documents(&self, collection: &str) -> Result<i64, SyncError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents WHERE collection = ?")
            .bind(collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }
}

impl DocumentStore for Repository {
    async fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, SyncError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: String = row.get("body");
                Ok(Some(serde_json::from_str(&body)?))
            }
            None => Ok(None),
        }
    }

    async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: Value,
    ) -> Result<(), SyncError> {
        let mut tx = self.pool.begin().await?;
        merge_in_tx(&mut tx, collection, id, document).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<usize, SyncError> {
        let count = batch.len();
        if count == 0 {
            return Ok(0);
        }

        // Use a transaction for atomicity
        let mut tx = self.pool.begin().await?;
        for write in batch.writes {
            upsert_in_tx(&mut tx, &write.collection, &write.id, &write.document).await?;
        }
        tx.commit().await?;

        Ok(count)
    }
}

async fn merge_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    id: &str,
    document: Value,
) -> Result<(), SyncError> {
    let existing = sqlx::query("SELECT body FROM documents WHERE collection = ? AND id = ?")
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    let body = match existing {
        Some(row) => {
            let stored: String = row.get("body");
            let mut merged: Value = serde_json::from_str(&stored)?;
            merge_documents(&mut merged, document);
            merged
        }
        None => document,
    };

    upsert_in_tx(tx, collection, id, &body).await
}

async fn upsert_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &str,
    id: &str,
    body: &Value,
) -> Result<(), SyncError> {
    sqlx::query(
        r#"INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)
           ON CONFLICT(collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at"#,
    )
    .bind(collection)
    .bind(id)
    .bind(serde_json::to_string(body)?)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
