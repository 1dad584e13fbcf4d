use std::{fmt::Display, sync::Arc};

use serde::Serialize;
use serde_json::Value;

use crate::import::candidate::{describe, Candidate, CandidateError};
use crate::semantic::uniqueness::{UniquenessChecker, UniquenessError, Verdict};
use crate::vocabulary::{StoreError, VocabularyEntry, VocabularyStore};

/// Accepted words held in memory before the store is flushed.
pub const FLUSH_EVERY: usize = 100;

/// Counters for one `import_batch` run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportBatchStats {
    pub total_processed: usize,
    pub added: usize,
    pub exact_duplicates: usize,
    pub similarity_rejected: usize,
    pub errors: usize,
}

impl ImportBatchStats {
    /// Every processed candidate landed in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.total_processed
            == self.added + self.exact_duplicates + self.similarity_rejected + self.errors
    }
}

impl Display for ImportBatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rule = "=".repeat(50);
        writeln!(f, "{rule}")?;
        writeln!(f, "IMPORT STATISTICS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total processed: {}", self.total_processed)?;
        writeln!(f, "Words added: {}", self.added)?;
        writeln!(f, "Exact duplicates: {}", self.exact_duplicates)?;
        writeln!(f, "Similarity rejected: {}", self.similarity_rejected)?;
        writeln!(f, "Errors: {}", self.errors)?;
        write!(f, "{rule}")
    }
}

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error("malformed candidate: {0}")]
    Candidate(#[from] CandidateError),

    #[error(transparent)]
    Uniqueness(#[from] UniquenessError),

    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

enum Outcome {
    Added(VocabularyEntry),
    ExactDuplicate,
    SimilarityRejected,
}

/// Runs the uniqueness checker over a batch and persists what passes.
///
/// Existing entries are read once, on construction. Accepted candidates are
/// appended, so later candidates in the same run see earlier acceptances.
pub struct BulkImportPipeline {
    checker: UniquenessChecker,
    store: Arc<dyn VocabularyStore>,
    arena: Vec<VocabularyEntry>,
}

impl BulkImportPipeline {
    pub fn new(
        checker: UniquenessChecker,
        store: Arc<dyn VocabularyStore>,
    ) -> Result<Self, StoreError> {
        let arena = store.all()?;
        log::info!("Loaded {} existing words", arena.len());

        Ok(Self {
            checker,
            store,
            arena,
        })
    }

    pub fn checker(&self) -> &UniquenessChecker {
        &self.checker
    }

    /// Entries the next candidate will be checked against.
    pub fn known_entries(&self) -> &[VocabularyEntry] {
        &self.arena
    }

    /// Import every record, never aborting on a single failure.
    ///
    /// Store writes are deferred and flushed every [`FLUSH_EVERY`] additions
    /// and once at the end. Additions the final flush fails to save count as
    /// errors.
    pub fn import_batch(&mut self, candidates: &[Value]) -> ImportBatchStats {
        let span = tracing::info_span!(
            "import_batch",
            candidates = candidates.len(),
            threshold = self.checker.threshold()
        );
        let _guard = span.enter();

        let mut stats = ImportBatchStats::default();
        let mut unflushed = 0;

        if let Err(err) = self.store.set_deferred(true) {
            log::warn!("Writing every word immediately, deferral failed: {err}");
        }

        for raw in candidates.iter() {
            stats.total_processed += 1;

            match self.import_one(raw) {
                Ok(Outcome::Added(entry)) => {
                    log::info!("Added: {entry}");
                    self.arena.push(entry);
                    stats.added += 1;
                    unflushed += 1;
                }
                Ok(Outcome::ExactDuplicate) => stats.exact_duplicates += 1,
                Ok(Outcome::SimilarityRejected) => stats.similarity_rejected += 1,
                Err(err) => {
                    log::error!("Error processing word {}: {err}", describe(raw));
                    stats.errors += 1;
                }
            }

            if unflushed >= FLUSH_EVERY {
                match self.store.flush() {
                    Ok(()) => unflushed = 0,
                    // still pending, retried by the next flush
                    Err(err) => log::warn!("Failed to save {unflushed} added words: {err}"),
                }
            }

            debug_assert!(stats.is_balanced());
        }

        if let Err(err) = self.store.set_deferred(false) {
            log::error!("Failed to save {unflushed} added words: {err}");
            stats.added -= unflushed;
            stats.errors += unflushed;
        }
        debug_assert!(stats.is_balanced());

        log::info!(
            "import finished: total_processed={} added={} exact_duplicates={} \
             similarity_rejected={} errors={}",
            stats.total_processed,
            stats.added,
            stats.exact_duplicates,
            stats.similarity_rejected,
            stats.errors
        );

        stats
    }

    fn import_one(&self, raw: &Value) -> Result<Outcome, ItemError> {
        let candidate = Candidate::from_value(raw)?;

        match self.checker.evaluate(&candidate, &self.arena)? {
            Verdict::ExactDuplicate { existing_id } => {
                log::debug!("Exact duplicate of #{existing_id}: {candidate}");
                Ok(Outcome::ExactDuplicate)
            }
            Verdict::TooSimilar {
                existing_id,
                similarity,
            } => {
                log::warn!(
                    "Similarity rejected: {candidate} ({similarity:.4} with #{existing_id})"
                );
                Ok(Outcome::SimilarityRejected)
            }
            Verdict::Unique | Verdict::Unverified { .. } => {
                let entry = self.store.create(candidate.into())?;
                Ok(Outcome::Added(entry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_balance() {
        let mut stats = ImportBatchStats::default();
        assert!(stats.is_balanced());

        stats.total_processed = 3;
        stats.added = 1;
        stats.errors = 1;
        assert!(!stats.is_balanced());

        stats.similarity_rejected = 1;
        assert!(stats.is_balanced());
    }

    #[test]
    fn test_stats_report() {
        let stats = ImportBatchStats {
            total_processed: 4,
            added: 2,
            exact_duplicates: 1,
            similarity_rejected: 0,
            errors: 1,
        };

        let report = stats.to_string();
        assert!(report.contains("Total processed: 4"));
        assert!(report.contains("Words added: 2"));
        assert!(report.contains("Exact duplicates: 1"));
        assert!(report.contains("Similarity rejected: 0"));
        assert!(report.contains("Errors: 1"));
    }
}
