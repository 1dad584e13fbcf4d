//! Embedding provider interface and the Ollama HTTP client.
//!
//! Provides a blocking interface for generating embeddings:
//! - One request per text, no batching
//! - Every request bounded by a timeout
//! - Tolerant response parsing (`embedding` first, then `embeddings[0]`)
//! - Dimensionality discovered from the first successful response

use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default embedding endpoint (local Ollama)
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434/api/embed";

/// Default embedding model name
pub const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Error type for embedding operations
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("No 'embedding' or 'embeddings' key in response")]
    MissingEmbedding,
}

/// Something that turns text into a fixed-length vector.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Human readable provider/model name, used in logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embedding: Option<Vec<f32>>,
    #[serde(default)]
    embeddings: Option<Vec<Vec<f32>>>,
}

/// Parse a provider response body.
///
/// Some server versions answer with a single `embedding` vector, newer ones
/// with an `embeddings` list; both are accepted, in that order.
pub fn parse_embedding_response(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbedResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

    let embedding = match (response.embedding, response.embeddings) {
        (Some(embedding), _) => embedding,
        (None, Some(embeddings)) => embeddings
            .into_iter()
            .next()
            .ok_or(EmbeddingError::MissingEmbedding)?,
        (None, None) => return Err(EmbeddingError::MissingEmbedding),
    };

    if embedding.is_empty() {
        return Err(EmbeddingError::MalformedResponse(
            "embedding vector is empty".to_string(),
        ));
    }

    Ok(embedding)
}

/// Blocking client for an Ollama-compatible `/api/embed` endpoint.
pub struct OllamaProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    /// Known once a request has succeeded.
    dimensions: OnceLock<usize>,
}

impl OllamaProvider {
    /// Create a provider whose every request is bounded by `timeout`.
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            dimensions: OnceLock::new(),
        })
    }
}

impl EmbeddingProvider for OllamaProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let embedding = parse_embedding_response(&body).map_err(|err| {
            log::error!("{err} for {text:?}. response: {body:?}");
            err
        })?;

        let dimensions = *self.dimensions.get_or_init(|| {
            log::info!(
                "Model '{}' produces {}-dimensional embeddings",
                self.model,
                embedding.len()
            );
            embedding.len()
        });
        if dimensions != embedding.len() {
            log::warn!(
                "Model '{}' returned {} dimensions, expected {}",
                self.model,
                embedding.len(),
                dimensions
            );
        }

        Ok(embedding)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
