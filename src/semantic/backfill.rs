//! Embedding generation for stored entries that have none yet.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::semantic::embeddings::EmbeddingProvider;
use crate::semantic::preprocess::entry_text;
use crate::vocabulary::{StoreError, VocabularyEntry, VocabularyStore};

/// Default pause between provider calls.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(100);

/// Embeddings held in memory before the store is flushed.
pub const FLUSH_EVERY: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    /// Entries without an embedding when the run started.
    pub total: usize,
    /// Entries attempted.
    pub processed: usize,
    pub embedded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum BackfillError {
    #[error("entry {0} not found")]
    NotFound(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct EmbeddingBackfill {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VocabularyStore>,
    throttle: Duration,
}

impl EmbeddingBackfill {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VocabularyStore>) -> Self {
        Self {
            provider,
            store,
            throttle: DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Embed every entry lacking a vector, one at a time.
    ///
    /// Individual failures are counted, not returned; only failing to list
    /// the pending entries aborts the run. Store writes are flushed every
    /// [`FLUSH_EVERY`] embeddings and at the end.
    pub fn run(&self) -> Result<BackfillReport, StoreError> {
        let started = Instant::now();
        let pending = self.store.unembedded()?;

        let mut report = BackfillReport {
            total: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            log::info!("All entries already have embeddings");
            return Ok(report);
        }

        log::info!(
            "Generating embeddings for {} entries with {}",
            pending.len(),
            self.provider.name()
        );

        if let Err(err) = self.store.set_deferred(true) {
            log::warn!("Writing every embedding immediately, deferral failed: {err}");
        }
        let mut unflushed = 0;

        for (idx, entry) in pending.iter().enumerate() {
            if idx > 0 && !self.throttle.is_zero() {
                std::thread::sleep(self.throttle);
            }

            report.processed += 1;
            if self.embed_entry(entry) {
                report.embedded += 1;
                unflushed += 1;
            } else {
                report.failed += 1;
            }

            if unflushed >= FLUSH_EVERY {
                match self.store.flush() {
                    Ok(()) => unflushed = 0,
                    Err(err) => log::warn!("Failed to save {unflushed} embeddings: {err}"),
                }
            }

            if report.processed % 50 == 0 {
                log::info!("{}/{} entries processed", report.processed, report.total);
            }
        }

        if let Err(err) = self.store.set_deferred(false) {
            log::error!("Failed to save {unflushed} embeddings: {err}");
            report.embedded -= unflushed;
            report.failed += unflushed;
        }

        report.elapsed = started.elapsed();
        log::info!(
            "backfill finished: total={} processed={} embedded={} failed={} in {:?}",
            report.total,
            report.processed,
            report.embedded,
            report.failed,
            report.elapsed
        );

        Ok(report)
    }

    /// (Re)generate the embedding of a single entry.
    ///
    /// `Ok(false)` means the provider or the store write failed; the entry is
    /// left as it was.
    pub fn embed_one(&self, id: u64) -> Result<bool, BackfillError> {
        let entry = self.store.get(id)?.ok_or(BackfillError::NotFound(id))?;
        Ok(self.embed_entry(&entry))
    }

    fn embed_entry(&self, entry: &VocabularyEntry) -> bool {
        let text = entry_text(entry);

        let embedding = match self.provider.embed(&text) {
            Ok(embedding) => embedding,
            Err(err) => {
                log::warn!("Failed to generate embedding for {entry}: {err}");
                return false;
            }
        };

        match self.store.update_embedding(entry.id, &embedding) {
            Ok(_) => {
                log::debug!("Embedded {entry} ({} dimensions)", embedding.len());
                true
            }
            Err(err) => {
                log::error!("Failed to store embedding for {entry}: {err}");
                false
            }
        }
    }
}
