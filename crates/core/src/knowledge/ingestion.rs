//! Bounded background ingestion of uploaded files.
//!
//! Uploads enqueue a file id and return. A dispatcher task drains the queue and
//! runs at most `workers` ingestions at a time; each holds a semaphore permit
//! until it finishes. A file id that is already queued or running is not
//! enqueued again, and the `pending -> processing` claim in the repository
//! keeps a file from being ingested twice even across restarts.

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

use super::chunker::chunk_text;
use super::file_store::FileStore;
use super::knowledge_constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_INGEST_QUEUE_CAPACITY, DEFAULT_INGEST_WORKERS,
};
use super::knowledge_model::NewKnowledgeChunk;
use super::knowledge_traits::KnowledgeRepositoryTrait;
use crate::errors::{Error, Result};

#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Maximum number of files ingested concurrently.
    pub workers: usize,
    pub queue_capacity: usize,
    /// Chunk length in code points.
    pub chunk_size: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_INGEST_WORKERS,
            queue_capacity: DEFAULT_INGEST_QUEUE_CAPACITY,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Handle to the ingestion workers. Cloning shares the same queue.
#[derive(Clone)]
pub struct IngestionPool {
    tx: mpsc::Sender<String>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl IngestionPool {
    /// Spawns the dispatcher on the current Tokio runtime.
    pub fn start(
        repository: Arc<dyn KnowledgeRepositoryTrait>,
        file_store: Arc<dyn FileStore>,
        config: IngestionConfig,
    ) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(config.queue_capacity.max(1));
        let in_flight = Arc::new(Mutex::new(HashSet::new()));
        let semaphore = Arc::new(Semaphore::new(config.workers.max(1)));
        let ingestor = Arc::new(Ingestor {
            repository,
            file_store,
            chunk_size: config.chunk_size,
        });

        let in_flight_bg = in_flight.clone();
        tokio::spawn(async move {
            while let Some(file_id) = rx.recv().await {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        warn!("Ingestion semaphore closed, stopping dispatcher");
                        break;
                    }
                };
                let ingestor = ingestor.clone();
                let entry = InFlightEntry {
                    set: in_flight_bg.clone(),
                    file_id,
                };
                tokio::spawn(async move {
                    let _permit = permit;
                    ingestor.run(&entry.file_id).await;
                });
            }
            debug!("Ingestion queue closed");
        });

        info!(
            "Ingestion pool started with {} workers",
            config.workers.max(1)
        );
        Self { tx, in_flight }
    }

    /// Queues `file_id`. Returns false when it is already queued or running.
    pub async fn schedule(&self, file_id: &str) -> Result<bool> {
        if !lock(&self.in_flight).insert(file_id.to_string()) {
            debug!("File {} is already scheduled for ingestion", file_id);
            return Ok(false);
        }
        if self.tx.send(file_id.to_string()).await.is_err() {
            lock(&self.in_flight).remove(file_id);
            return Err(Error::Unexpected("Ingestion queue is closed".to_string()));
        }
        Ok(true)
    }

    /// Number of files queued or being ingested.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Removes a file id from the in-flight set when dropped, also when the
/// worker holding it panics.
struct InFlightEntry {
    set: Arc<Mutex<HashSet<String>>>,
    file_id: String,
}

impl Drop for InFlightEntry {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.file_id);
    }
}

fn lock(set: &Mutex<HashSet<String>>) -> std::sync::MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The per-file pipeline: claim, read, chunk, persist.
struct Ingestor {
    repository: Arc<dyn KnowledgeRepositoryTrait>,
    file_store: Arc<dyn FileStore>,
    chunk_size: usize,
}

impl Ingestor {
    async fn run(&self, file_id: &str) {
        match self.ingest(file_id).await {
            Ok(Some(chunks)) => info!("Ingested file {} into {} chunks", file_id, chunks),
            Ok(None) => debug!("File {} was not pending, skipping", file_id),
            Err(e) => {
                error!("Ingestion of file {} failed: {}", file_id, e);
                if let Err(mark_err) = self.repository.mark_failed(file_id).await {
                    error!("Failed to mark file {} as failed: {}", file_id, mark_err);
                }
            }
        }
    }

    async fn ingest(&self, file_id: &str) -> Result<Option<usize>> {
        if !self.repository.claim_for_processing(file_id).await? {
            return Ok(None);
        }

        let file = self.repository.get_file(file_id)?;
        let bytes = self.file_store.read(&file.file_path).await?;
        let text = String::from_utf8_lossy(&bytes);
        let pieces = chunk_text(&text, self.chunk_size);
        let chunks = NewKnowledgeChunk::from_pieces(&file.file_name, pieces);

        let stored = self.repository.complete_ingestion(file_id, chunks).await?;
        Ok(Some(stored))
    }
}
