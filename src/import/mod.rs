//! Bulk import of level word lists.

pub mod candidate;
pub mod pipeline;
pub mod source;

pub use candidate::Candidate;
pub use pipeline::{BulkImportPipeline, ImportBatchStats};
pub use source::{load_level, JlptLevel, LevelSelector};
