use chrono::{DateTime, Utc};
use csv::StringRecord;
use serde::Serialize;
use std::{
    fmt::Display,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
    time::Instant,
};

/// An embedding as persisted alongside its entry: a JSON array of floats.
///
/// Kept in serialized form until a consumer decodes it, so one corrupt value
/// only affects the entry that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEmbedding(String);

impl StoredEmbedding {
    pub fn encode(vector: &[f32]) -> Result<Self, serde_json::Error> {
        serde_json::to_string(vector).map(Self)
    }

    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Vec<f32>, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VocabularyEntry {
    pub id: u64,

    pub writing: String,
    pub reading: String,
    pub meaning: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,

    #[serde(skip)]
    pub embedding: Option<StoredEmbedding>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VocabularyEntry {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }
}

impl Display for VocabularyEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} {} ({}) - {}",
            self.id, self.writing, self.reading, self.meaning
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryCreate {
    pub writing: String,
    pub reading: String,
    pub meaning: String,
    pub level: Option<String>,
    pub part_of_speech: Option<String>,
    pub example: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entry {0} not found")]
    NotFound(u64),

    #[error("entry already exists at id {0}")]
    AlreadyExists(u64),

    #[error("corrupt record at line {line}: {message}")]
    Corrupt { line: u64, message: String },

    #[error("store lock poisoned")]
    Poisoned,

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("embedding serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persistent vocabulary storage.
pub trait VocabularyStore: Send + Sync {
    fn create(&self, entry: EntryCreate) -> Result<VocabularyEntry, StoreError>;
    fn all(&self) -> Result<Vec<VocabularyEntry>, StoreError>;
    fn get(&self, id: u64) -> Result<Option<VocabularyEntry>, StoreError>;
    fn update_embedding(&self, id: u64, embedding: &[f32]) -> Result<VocabularyEntry, StoreError>;

    /// Remove every entry, returning how many were removed.
    fn clear(&self) -> Result<usize, StoreError>;

    /// While deferred, `create` and `update_embedding` only change memory;
    /// changes reach disk on `flush`. Turning deferral off flushes.
    fn set_deferred(&self, _deferred: bool) -> Result<(), StoreError> {
        Ok(())
    }

    /// Persist changes held back by deferral.
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Entries that carry a stored embedding.
    fn embedded(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self.all()?.into_iter().filter(|e| e.has_embedding()).collect())
    }

    /// Entries still waiting for an embedding.
    fn unembedded(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self.all()?.into_iter().filter(|e| !e.has_embedding()).collect())
    }
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<VocabularyEntry>>>,
    path: PathBuf,
    deferred: Arc<AtomicBool>,
    dirty: Arc<AtomicBool>,
    saves: Arc<AtomicUsize>,
}

const CSV_HEADERS: [&str; 10] = [
    "id",
    "writing",
    "reading",
    "meaning",
    "level",
    "part_of_speech",
    "example",
    "embedding",
    "created_at",
    "updated_at",
];

fn field<'r>(record: &'r StringRecord, idx: usize) -> Result<&'r str, StoreError> {
    record.get(idx).ok_or_else(|| StoreError::Corrupt {
        line: record.position().map(|p| p.line()).unwrap_or_default(),
        message: format!("missing column {}", CSV_HEADERS[idx]),
    })
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn timestamp(record: &StringRecord, idx: usize) -> Result<DateTime<Utc>, StoreError> {
    let value = field(record, idx)?;
    if value.is_empty() {
        return Ok(DateTime::<Utc>::default());
    }

    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| StoreError::Corrupt {
            line: record.position().map(|p| p.line()).unwrap_or_default(),
            message: format!("bad {}: {err}", CSV_HEADERS[idx]),
        })
}

impl BackendCsv {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new vocabulary store at {}", path.display());
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(path)?;

        let mut entries = vec![];
        for record in csv_reader.records() {
            let record = record?;
            let id = field(&record, 0)?
                .parse::<u64>()
                .map_err(|err| StoreError::Corrupt {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    message: format!("bad id: {err}"),
                })?;

            let entry = VocabularyEntry {
                id,
                writing: field(&record, 1)?.to_string(),
                reading: field(&record, 2)?.to_string(),
                meaning: field(&record, 3)?.to_string(),
                level: optional(field(&record, 4)?),
                part_of_speech: optional(field(&record, 5)?),
                example: optional(field(&record, 6)?),
                embedding: optional(field(&record, 7)?).map(StoredEmbedding::from_raw),
                created_at: timestamp(&record, 8)?,
                updated_at: timestamp(&record, 9)?,
            };

            entries.push(entry);
        }

        log::debug!(
            "took {}ms to read {} entries",
            now.elapsed().as_micros() as f64 / 1000.0,
            entries.len()
        );

        Ok(BackendCsv {
            list: Arc::new(RwLock::new(entries)),
            path: path.to_path_buf(),
            ..Default::default()
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the file has been rewritten.
    #[cfg(test)]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn read_list(&self) -> Result<RwLockReadGuard<'_, Vec<VocabularyEntry>>, StoreError> {
        self.list.read().map_err(|_| StoreError::Poisoned)
    }

    fn write_list(&self) -> Result<RwLockWriteGuard<'_, Vec<VocabularyEntry>>, StoreError> {
        self.list.write().map_err(|_| StoreError::Poisoned)
    }

    /// Write the given entries to a temp file and move it over the store.
    fn save(&self, entries: &[VocabularyEntry]) -> Result<(), StoreError> {
        let mut temp_path = self.path.clone().into_os_string();
        temp_path.push("-tmp");
        let temp_path = PathBuf::from(temp_path);

        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for entry in entries.iter() {
            csv_wrt.write_record([
                entry.id.to_string().as_str(),
                entry.writing.as_str(),
                entry.reading.as_str(),
                entry.meaning.as_str(),
                entry.level.as_deref().unwrap_or_default(),
                entry.part_of_speech.as_deref().unwrap_or_default(),
                entry.example.as_deref().unwrap_or_default(),
                entry
                    .embedding
                    .as_ref()
                    .map(|e| e.as_str())
                    .unwrap_or_default(),
                entry.created_at.to_rfc3339().as_str(),
                entry.updated_at.to_rfc3339().as_str(),
            ])?;
        }
        csv_wrt.flush()?;
        drop(csv_wrt);

        std::fs::rename(&temp_path, &self.path)?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Save unless deferred, in which case the change is only marked pending.
    fn commit(&self, entries: &[VocabularyEntry]) -> Result<(), StoreError> {
        if self.deferred.load(Ordering::SeqCst) {
            self.dirty.store(true, Ordering::SeqCst);
            return Ok(());
        }
        self.save(entries)
    }
}

impl VocabularyStore for BackendCsv {
    fn create(&self, entry_create: EntryCreate) -> Result<VocabularyEntry, StoreError> {
        let mut entries = self.write_list()?;

        // mirrors the (writing, reading, meaning) unique key of the word table
        if let Some(existing) = entries.iter().find(|e| {
            e.writing == entry_create.writing
                && e.reading == entry_create.reading
                && e.meaning == entry_create.meaning
        }) {
            return Err(StoreError::AlreadyExists(existing.id));
        }

        let id = entries.iter().map(|e| e.id + 1).max().unwrap_or(0);
        let now = Utc::now();

        let entry = VocabularyEntry {
            id,
            writing: entry_create.writing,
            reading: entry_create.reading,
            meaning: entry_create.meaning,
            level: entry_create.level,
            part_of_speech: entry_create.part_of_speech,
            example: entry_create.example,
            embedding: None,
            created_at: now,
            updated_at: now,
        };

        entries.push(entry.clone());
        if let Err(err) = self.commit(&entries) {
            entries.pop();
            return Err(err);
        }

        Ok(entry)
    }

    fn all(&self) -> Result<Vec<VocabularyEntry>, StoreError> {
        Ok(self.read_list()?.clone())
    }

    fn get(&self, id: u64) -> Result<Option<VocabularyEntry>, StoreError> {
        Ok(self.read_list()?.iter().find(|e| e.id == id).cloned())
    }

    fn update_embedding(&self, id: u64, embedding: &[f32]) -> Result<VocabularyEntry, StoreError> {
        let stored = StoredEmbedding::encode(embedding)?;
        let mut entries = self.write_list()?;

        let idx = entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let previous = entries[idx].clone();
        entries[idx].embedding = Some(stored);
        entries[idx].updated_at = Utc::now();

        if let Err(err) = self.commit(&entries) {
            entries[idx] = previous;
            return Err(err);
        }

        Ok(entries[idx].clone())
    }

    fn clear(&self) -> Result<usize, StoreError> {
        let mut entries = self.write_list()?;
        let count = entries.len();

        self.save(&[])?;
        entries.clear();
        self.dirty.store(false, Ordering::SeqCst);

        Ok(count)
    }

    fn set_deferred(&self, deferred: bool) -> Result<(), StoreError> {
        if deferred {
            self.deferred.store(true, Ordering::SeqCst);
            return Ok(());
        }

        self.deferred.store(false, Ordering::SeqCst);
        self.flush()
    }

    fn flush(&self) -> Result<(), StoreError> {
        let entries = self.read_list()?;
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(err) = self.save(&entries) {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(err);
        }
        log::debug!("flushed {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }
}
