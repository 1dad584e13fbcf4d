use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::semantic::embeddings::{EmbeddingError, EmbeddingProvider};
use crate::vocabulary::{BackendCsv, EntryCreate, StoreError, VocabularyEntry, VocabularyStore};

mod pipeline;

/// Provider answering from a fixed text -> vector table.
///
/// Unknown texts fail the way an unreachable service would.
#[derive(Default)]
pub struct StubProvider {
    vectors: HashMap<String, Vec<f32>>,
    calls: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for StubProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| EmbeddingError::Status {
                status: 404,
                body: format!("no stub vector for {text:?}"),
            })
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Provider that fails every call.
#[derive(Default)]
pub struct FailingProvider {
    calls: AtomicUsize,
}

impl FailingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FailingProvider {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(EmbeddingError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Store that reads fine but can't write.
#[derive(Default)]
pub struct ReadOnlyStore {
    entries: Vec<VocabularyEntry>,
}

impl ReadOnlyStore {
    pub fn new(entries: Vec<VocabularyEntry>) -> Self {
        Self { entries }
    }
}

fn read_only() -> StoreError {
    StoreError::IO(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "read-only store",
    ))
}

impl VocabularyStore for ReadOnlyStore {
    fn create(&self, _entry: EntryCreate) -> Result<VocabularyEntry, StoreError> {
        Err(read_only())
    }

    fn all(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self.entries.clone())
    }

    fn get(&self, id: u64) -> Result<Option<VocabularyEntry>, StoreError> {
        Ok(self.entries.iter().find(|e| e.id == id).cloned())
    }

    fn update_embedding(
        &self,
        _id: u64,
        _embedding: &[f32],
    ) -> Result<VocabularyEntry, StoreError> {
        Err(read_only())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        Err(read_only())
    }
}

pub fn entry(id: u64, writing: &str, reading: &str, meaning: &str) -> VocabularyEntry {
    VocabularyEntry {
        id,
        writing: writing.to_string(),
        reading: reading.to_string(),
        meaning: meaning.to_string(),
        ..Default::default()
    }
}

pub fn word(writing: &str, reading: &str, meaning: &str) -> EntryCreate {
    EntryCreate {
        writing: writing.to_string(),
        reading: reading.to_string(),
        meaning: meaning.to_string(),
        ..Default::default()
    }
}

pub fn fresh_store() -> (Arc<BackendCsv>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = BackendCsv::load(tmp.path().join("vocabulary.csv")).unwrap();
    (Arc::new(store), tmp)
}
