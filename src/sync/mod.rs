//! Watermark-gated sync driver.
//!
//! A run goes fetch → filter → transform → batch upsert → advance watermark,
//! strictly in sequence. Writes are merge-upserts keyed by army id, so a run
//! interrupted between batches can simply be repeated.
//!
//! Without a stored watermark the driver refuses to sync unless the operator
//! supplies a lower bound or initializes the watermark first.

pub mod state_file;

use serde_json::Value;

use crate::config::Config;
use crate::db::{merge_documents, DocumentStore, WriteBatch};
use crate::errors::SyncError;
use crate::models::{parse_timestamp, Army, ArmyDocument, SyncCursor, Watermark, WatermarkMarker};
use crate::source::ExportSnapshot;
use crate::transform::transform_army;

/// Documents shown by a dry run.
pub const PREVIEW_SIZE: usize = 3;

/// What a run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Only the watermark was recorded
    Initialized,
    /// Documents were transformed for preview, nothing written
    DryRun,
    /// Documents were written
    Synced,
}

/// Totals reported at the end of a run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub mode: RunMode,
    /// Entries returned by the export
    pub fetched: usize,
    /// Armies left after watermark filtering
    pub pending: usize,
    pub uploaded: usize,
    /// Armies not written because the stored copy was at least as new
    pub skipped: usize,
    /// Armies that could not be written, unreadable export entries still ahead of the cursor included
    pub failed: usize,
    /// Export entries that could not be read as armies, whatever their position
    pub rejected: usize,
    /// Batches committed
    pub commits: usize,
    /// Watermark in force after the run
    pub watermark: Option<Watermark>,
    /// Transformed documents, dry runs only
    pub preview: Vec<ArmyDocument>,
}

impl SyncReport {
    fn new(mode: RunMode, fetched: usize) -> Self {
        Self {
            mode,
            fetched,
            pending: 0,
            uploaded: 0,
            skipped: 0,
            failed: 0,
            rejected: 0,
            commits: 0,
            watermark: None,
            preview: Vec::new(),
        }
    }
}

/// Outcome of preparing one army for writing.
enum Staged {
    Queued,
    Skipped,
}

/// Sync driver bound to one configuration and one destination.
pub struct SyncEngine<'a, S: DocumentStore> {
    config: &'a Config,
    store: &'a S,
}

impl<'a, S: DocumentStore> SyncEngine<'a, S> {
    pub fn new(config: &'a Config, store: &'a S) -> Self {
        Self { config, store }
    }

    /// Run once against an export snapshot.
    pub async fn run(&self, snapshot: ExportSnapshot) -> Result<SyncReport, SyncError> {
        let fetched = snapshot.len();
        tracing::info!("Fetched {} armies", fetched);

        if self.config.init_watermark {
            return self.initialize(&snapshot.armies, fetched).await;
        }

        let cursor = self.resolve_cursor().await?;
        let pending: Vec<&Army> = snapshot
            .armies
            .iter()
            .filter(|army| cursor.admits(army))
            .collect();

        match &cursor {
            SyncCursor::Watermark(wm) => tracing::info!(
                "Filtered by watermark time={} id>{}, remaining {}/{}",
                wm.raw_timestamp,
                wm.last_id,
                pending.len(),
                snapshot.armies.len()
            ),
            SyncCursor::Since(since) => tracing::info!(
                "Filtered by since={}, remaining {}/{}",
                since.to_rfc3339(),
                pending.len(),
                snapshot.armies.len()
            ),
        }

        if self.config.dry_run {
            let mut report = SyncReport::new(RunMode::DryRun, fetched);
            report.pending = pending.len();
            report.watermark = cursor.watermark().cloned();
            report.preview = pending
                .iter()
                .take(PREVIEW_SIZE)
                .map(|army| transform_army(army, &self.config.hero_ids))
                .collect();
            tracing::info!(
                "Dry-run mode: previewing {} of {} pending armies",
                report.preview.len(),
                report.pending
            );
            return Ok(report);
        }

        let mut report = SyncReport::new(RunMode::Synced, fetched);
        report.rejected = snapshot.rejected.len();
        for rejected in &snapshot.rejected {
            if cursor.admits_at(rejected.timestamp, rejected.id) {
                tracing::error!("Skipping export entry: {}", rejected.error);
                report.failed += 1;
            } else if rejected.timestamp.is_none() {
                tracing::warn!("Ignoring export entry without a usable timestamp: {}", rejected.error);
            } else {
                tracing::debug!("Ignoring already synced export entry: {}", rejected.error);
            }
        }

        self.upload(&pending, &mut report).await?;
        self.advance_watermark(&cursor, &pending, &mut report).await;

        Ok(report)
    }

    /// Record the export's current frontier as the watermark, writing nothing else.
    async fn initialize(&self, armies: &[Army], fetched: usize) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(RunMode::Initialized, fetched);

        let Some(watermark) = Watermark::from_armies(armies) else {
            tracing::warn!("Export has no timestamped armies; watermark left untouched");
            return Ok(report);
        };

        if self.config.remote_watermark {
            let mut marker = WatermarkMarker::new(&watermark);
            marker.note =
                Some("Initialized without uploading. Future runs will sync newer only.".to_string());
            self.store
                .set_document(
                    &self.config.watermark_collection,
                    &self.config.watermark_doc,
                    serde_json::to_value(&marker)?,
                )
                .await?;
            tracing::info!(
                "Initialized watermark at {}/{}: time={} id={}",
                self.config.watermark_collection,
                self.config.watermark_doc,
                watermark.raw_timestamp,
                watermark.last_id
            );
        } else {
            let path = self.config.state_file.as_deref().ok_or_else(|| {
                SyncError::Config(
                    "A state file is required to initialize without a remote watermark"
                        .to_string(),
                )
            })?;
            state_file::save(path, &watermark.raw_timestamp).await?;
        }

        report.watermark = Some(watermark);
        Ok(report)
    }

    /// Work out the lower bound for this run.
    ///
    /// Remote mode: stored marker, then `--since`. Local mode: `--since`, then
    /// the state file. Nothing at all is an error.
    async fn resolve_cursor(&self) -> Result<SyncCursor, SyncError> {
        if self.config.remote_watermark {
            if let Some(watermark) = self.load_remote_watermark().await {
                return Ok(SyncCursor::Watermark(watermark));
            }
            if let Some(since) = self.config.since {
                return Ok(SyncCursor::Since(since));
            }
            return Err(SyncError::WatermarkUnavailable(format!(
                "no watermark at {}/{}; create it with --init-watermark or provide --since",
                self.config.watermark_collection, self.config.watermark_doc
            )));
        }

        if let Some(since) = self.config.since {
            return Ok(SyncCursor::Since(since));
        }
        if let Some(path) = self.config.state_file.as_deref() {
            if let Some(since) = state_file::load(path).await {
                tracing::info!("Loaded watermark from state file: {}", path.display());
                return Ok(SyncCursor::Since(since));
            }
        }
        Err(SyncError::WatermarkUnavailable(
            "no state file watermark; create it with --init-watermark or provide --since"
                .to_string(),
        ))
    }

    async fn load_remote_watermark(&self) -> Option<Watermark> {
        let collection = &self.config.watermark_collection;
        let doc = &self.config.watermark_doc;

        let value = match self.store.get_document(collection, doc).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                tracing::info!("No watermark stored at {}/{}", collection, doc);
                return None;
            }
            Err(e) => {
                tracing::error!("Failed to load watermark {}/{}: {}", collection, doc, e);
                return None;
            }
        };

        let marker: WatermarkMarker = match serde_json::from_value(value) {
            Ok(marker) => marker,
            Err(e) => {
                tracing::error!("Malformed watermark {}/{}: {}", collection, doc, e);
                return None;
            }
        };

        let watermark = marker.watermark();
        match &watermark {
            Some(wm) => tracing::info!(
                "Loaded watermark {}/{}: time={} id={}",
                collection,
                doc,
                wm.raw_timestamp,
                wm.last_id
            ),
            None => tracing::warn!(
                "Watermark {}/{} has no usable lastUpdatedTime",
                collection,
                doc
            ),
        }
        watermark
    }

    /// Transform and write pending armies in batches.
    ///
    /// Per-army failures are counted; a failed commit ends the run.
    async fn upload(&self, pending: &[&Army], report: &mut SyncReport) -> Result<(), SyncError> {
        report.pending = pending.len();
        let total = pending.len();
        let mut batch = WriteBatch::new();

        for (idx, army) in pending.iter().enumerate() {
            match self.stage(army, &mut batch).await {
                Ok(Staged::Queued) => report.uploaded += 1,
                Ok(Staged::Skipped) => report.skipped += 1,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    tracing::error!("Failed to enqueue army id={}: {}", army.id, e);
                }
            }

            if batch.len() >= self.config.batch_size {
                let size = self.commit(std::mem::take(&mut batch), idx + 1).await?;
                report.commits += 1;
                tracing::info!(
                    "Committed a batch of {} documents (progress: {}/{})",
                    size,
                    idx + 1,
                    total
                );
                if !self.config.batch_pause.is_zero() {
                    tokio::time::sleep(self.config.batch_pause).await;
                }
            }
        }

        if !batch.is_empty() {
            let size = self.commit(batch, total).await?;
            report.commits += 1;
            tracing::info!(
                "Committed final batch of {} documents (uploaded: {}/{}, failed: {})",
                size,
                report.uploaded,
                total,
                report.failed
            );
        }

        Ok(())
    }

    async fn commit(&self, batch: WriteBatch, processed: usize) -> Result<usize, SyncError> {
        self.store.commit_batch(batch).await.map_err(|e| {
            tracing::error!("Batch commit failed after {} processed: {}", processed, e);
            SyncError::BatchCommit {
                processed,
                message: e.to_string(),
            }
        })
    }

    /// Transform an army and queue its merged body.
    ///
    /// The stored copy is read and merged here, so an unreadable stored body
    /// fails only this army.
    async fn stage(&self, army: &Army, batch: &mut WriteBatch) -> Result<Staged, SyncError> {
        let record_error = |message: String| SyncError::Record {
            id: army.id,
            message,
        };

        let doc = transform_army(army, &self.config.hero_ids);
        let doc_id = doc.doc_id();

        let existing = self
            .store
            .get_document(&self.config.collection, &doc_id)
            .await
            .map_err(|e| match e {
                SyncError::Json(message) => {
                    record_error(format!("stored document is unreadable: {}", message))
                }
                other => other,
            })?;

        if self.config.skip_not_newer && !is_newer_than(&doc, existing.as_ref()) {
            tracing::debug!("Skip not newer id={}", doc_id);
            return Ok(Staged::Skipped);
        }

        let value = serde_json::to_value(&doc).map_err(|e| record_error(e.to_string()))?;
        let body = match existing {
            Some(mut stored) => {
                merge_documents(&mut stored, value);
                stored
            }
            None => value,
        };
        batch.set(&self.config.collection, &doc_id, body);
        Ok(Staged::Queued)
    }

    /// Persist the new frontier. Failures here are warnings: the data is already written.
    async fn advance_watermark(&self, cursor: &SyncCursor, pending: &[&Army], report: &mut SyncReport) {
        let Some(reached) = Watermark::from_armies(pending.iter().copied()) else {
            report.watermark = cursor.watermark().cloned();
            return;
        };

        if let Some(path) = self.config.state_file.as_deref() {
            if let Err(e) = state_file::save(path, &reached.raw_timestamp).await {
                tracing::warn!("{}", e);
            }
        }

        let watermark = match cursor.watermark() {
            Some(previous) => previous.clone().advance(reached),
            None => reached,
        };

        if self.config.remote_watermark {
            let mut marker = WatermarkMarker::new(&watermark);
            marker.uploaded = Some(report.uploaded);
            marker.failed = Some(report.failed);

            let persisted = match serde_json::to_value(&marker) {
                Ok(value) => {
                    self.store
                        .set_document(
                            &self.config.watermark_collection,
                            &self.config.watermark_doc,
                            value,
                        )
                        .await
                }
                Err(e) => Err(e.into()),
            };

            match persisted {
                Ok(()) => tracing::info!(
                    "Updated watermark: time={} id={}",
                    watermark.raw_timestamp,
                    watermark.last_id
                ),
                Err(e) => {
                    let e = SyncError::WatermarkPersist(e.to_string());
                    tracing::warn!("{}", e);
                }
            }
        }

        report.watermark = Some(watermark);
    }
}

/// Whether `doc` should overwrite the stored copy.
///
/// Anything that prevents a comparison counts as newer.
fn is_newer_than(doc: &ArmyDocument, existing: Option<&Value>) -> bool {
    let stored = existing
        .and_then(|existing| existing.get("updatedTime"))
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let incoming = doc.updated_time.as_deref().and_then(parse_timestamp);

    match (stored, incoming) {
        (Some(stored), Some(incoming)) => incoming > stored,
        _ => true,
    }
}
