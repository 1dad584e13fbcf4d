//! Embedding-backed duplicate detection and search.
//!
//! Architecture:
//! - `embeddings`: provider trait and the Ollama HTTP client
//! - `vector`: cosine similarity
//! - `preprocess`: gloss normalization and entry embedding text
//! - `uniqueness`: staged duplicate check used by the importer
//! - `search`: ranking of embedded entries
//! - `backfill`: embedding generation for stored entries

pub mod backfill;
pub mod embeddings;
pub mod preprocess;
pub mod search;
pub mod uniqueness;
pub mod vector;

pub use backfill::{BackfillError, BackfillReport, EmbeddingBackfill};
pub use embeddings::{EmbeddingProvider, OllamaProvider};
pub use search::SemanticSearchEngine;
pub use uniqueness::{UniquenessChecker, UniquenessError};
