//! Ranking of stored entries by semantic closeness to a query.
//!
//! Only entries that already carry an embedding take part; search never
//! embeds stored entries on the fly. Every failure degrades to fewer (or no)
//! results instead of an error.

use std::sync::Arc;

use serde::Serialize;

use crate::semantic::embeddings::EmbeddingProvider;
use crate::semantic::vector::cosine_similarity;
use crate::vocabulary::{VocabularyEntry, VocabularyStore};

/// A ranked entry.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub entry: VocabularyEntry,
    pub score: f32,
}

pub struct SemanticSearchEngine {
    provider: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VocabularyStore>,
}

impl SemanticSearchEngine {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, store: Arc<dyn VocabularyStore>) -> Self {
        Self { provider, store }
    }

    /// Return at most `limit` embedded entries, highest similarity first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query_embedding = match self.provider.embed(query) {
            Ok(embedding) => embedding,
            Err(err) => {
                log::warn!("Failed to embed query {query:?}: {err}");
                return vec![];
            }
        };

        let entries = match self.store.embedded() {
            Ok(entries) => entries,
            Err(err) => {
                log::error!("Failed to read embedded entries: {err}");
                return vec![];
            }
        };

        let mut hits = entries
            .into_iter()
            .filter_map(|entry| {
                let stored = entry.embedding.as_ref()?;
                let embedding = match stored.decode() {
                    Ok(embedding) => embedding,
                    Err(err) => {
                        log::warn!("Skipping {entry}: undecodable embedding: {err}");
                        return None;
                    }
                };

                // vectors from another model can't be compared
                if embedding.len() != query_embedding.len() {
                    log::debug!(
                        "Skipping {entry}: {} dimensions, query has {}",
                        embedding.len(),
                        query_embedding.len()
                    );
                    return None;
                }

                let score = cosine_similarity(&query_embedding, &embedding).ok()?;
                Some(SearchHit { entry, score })
            })
            .collect::<Vec<_>>();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);

        log::debug!("{} hits for {query:?}", hits.len());

        hits
    }
}
