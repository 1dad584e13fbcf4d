//! Duplicate detection for vocabulary candidates.
//!
//! A candidate is checked in three stages, cheapest first:
//! 1. exact (writing, reading, gloss) match against existing entries
//! 2. structural match: same writing and reading, different gloss
//! 3. gloss similarity via embeddings, only for structural matches
//!
//! Stage 2 finding nothing is enough to admit the candidate, so embeddings
//! are only requested for the (rare) homograph case.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::import::Candidate;
use crate::semantic::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::semantic::preprocess::normalize_gloss;
use crate::semantic::vector::cosine_similarity;
use crate::vocabulary::VocabularyEntry;

/// Default gloss similarity at which two entries count as the same concept.
///
/// Near-paraphrases ("cat" / "a cat") land above it, related words
/// ("cat" / "kitten") below.
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.985;

/// What to do when the embedding provider can't answer during the semantic stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFailurePolicy {
    /// Skip the comparison and admit the candidate if nothing else rejects it.
    /// Possible duplicates get in while the provider is degraded.
    #[default]
    Allow,
    /// Fail the check; the caller decides what a failed check means.
    Reject,
}

/// Outcome of a uniqueness check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// No entry shares writing and reading, or every gloss is far enough apart.
    Unique,
    /// Admitted, but `skipped` structural matches could not be compared.
    Unverified { skipped: usize },
    /// Same writing, reading and gloss as an existing entry.
    ExactDuplicate { existing_id: u64 },
    /// Same writing and reading, gloss similarity at or above the threshold.
    TooSimilar { existing_id: u64, similarity: f32 },
}

impl Verdict {
    pub fn is_unique(&self) -> bool {
        matches!(self, Verdict::Unique | Verdict::Unverified { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UniquenessError {
    #[error("similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("could not embed gloss {gloss:?}: {source}")]
    Provider {
        gloss: String,
        #[source]
        source: EmbeddingError,
    },
}

pub fn validate_threshold(threshold: f32) -> Result<f32, UniquenessError> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(UniquenessError::InvalidThreshold(threshold))
    }
}

pub struct UniquenessChecker {
    provider: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    on_provider_failure: ProviderFailurePolicy,
}

impl UniquenessChecker {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            on_provider_failure: ProviderFailurePolicy::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Result<Self, UniquenessError> {
        self.set_threshold(threshold)?;
        Ok(self)
    }

    pub fn with_failure_policy(mut self, policy: ProviderFailurePolicy) -> Self {
        self.on_provider_failure = policy;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), UniquenessError> {
        self.threshold = validate_threshold(threshold)?;
        Ok(())
    }

    /// Whether `candidate` may be admitted next to `existing`.
    ///
    /// A check that fails under [`ProviderFailurePolicy::Reject`] counts as not unique.
    pub fn is_unique(&self, candidate: &Candidate, existing: &[VocabularyEntry]) -> bool {
        match self.evaluate(candidate, existing) {
            Ok(verdict) => verdict.is_unique(),
            Err(err) => {
                log::warn!("Uniqueness check failed for {candidate}: {err}");
                false
            }
        }
    }

    /// Run the staged check and report which stage decided.
    pub fn evaluate(
        &self,
        candidate: &Candidate,
        existing: &[VocabularyEntry],
    ) -> Result<Verdict, UniquenessError> {
        let writing = candidate.writing.trim();
        let reading = candidate.reading.trim();
        let gloss = normalize_gloss(&candidate.meaning);

        let structural = existing
            .iter()
            .filter(|e| e.writing.trim() == writing && e.reading.trim() == reading)
            .collect::<Vec<_>>();

        if let Some(exact) = structural
            .iter()
            .find(|e| normalize_gloss(&e.meaning) == gloss)
        {
            log::info!("Exact duplicate found: {candidate} matches {exact}");
            return Ok(Verdict::ExactDuplicate {
                existing_id: exact.id,
            });
        }

        if structural.is_empty() {
            log::debug!("No entries with same writing and reading: {candidate}");
            return Ok(Verdict::Unique);
        }

        self.semantic_stage(candidate, &structural)
    }

    fn semantic_stage(
        &self,
        candidate: &Candidate,
        matches: &[&VocabularyEntry],
    ) -> Result<Verdict, UniquenessError> {
        let candidate_embedding = match self.provider.embed(candidate.meaning.trim()) {
            Ok(embedding) => embedding,
            Err(err) => {
                self.degrade(&candidate.meaning, err)?;
                log::warn!("Admitting {candidate} without similarity check");
                return Ok(Verdict::Unverified {
                    skipped: matches.len(),
                });
            }
        };

        let mut skipped = 0;
        for existing in matches {
            let existing_embedding = match self.provider.embed(existing.meaning.trim()) {
                Ok(embedding) => embedding,
                Err(err) => {
                    self.degrade(&existing.meaning, err)?;
                    skipped += 1;
                    continue;
                }
            };

            let similarity = match cosine_similarity(&candidate_embedding, &existing_embedding) {
                Ok(similarity) => similarity,
                Err(err) => {
                    log::warn!("Cannot compare {candidate} with {existing}: {err}");
                    skipped += 1;
                    continue;
                }
            };

            log::debug!(
                "Gloss similarity {:?} vs {:?}: {similarity:.4} (threshold {})",
                candidate.meaning,
                existing.meaning,
                self.threshold
            );

            if similarity >= self.threshold {
                log::info!(
                    "Rejected {candidate}: similarity {similarity:.4} with {existing}"
                );
                return Ok(Verdict::TooSimilar {
                    existing_id: existing.id,
                    similarity,
                });
            }
        }

        if skipped > 0 {
            log::warn!("Admitting {candidate} with {skipped} comparison(s) skipped");
            Ok(Verdict::Unverified { skipped })
        } else {
            Ok(Verdict::Unique)
        }
    }

    /// Apply the failure policy to a provider error.
    fn degrade(&self, gloss: &str, err: EmbeddingError) -> Result<(), UniquenessError> {
        log::warn!(
            "Failed to embed gloss {gloss:?} with {}: {err}",
            self.provider.name()
        );

        match self.on_provider_failure {
            ProviderFailurePolicy::Allow => Ok(()),
            ProviderFailurePolicy::Reject => Err(UniquenessError::Provider {
                gloss: gloss.to_string(),
                source: err,
            }),
        }
    }
}
