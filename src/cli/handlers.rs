use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::{
    cli::commands::{CheckCommand, EmbedCommand, ImportCommand, SearchCommand, ThresholdCommand},
    config::Config,
    vocabulary::VocabularyStore,
};

use super::types::LevelArg;

pub fn handle_import(
    level: LevelArg,
    clear: bool,
    yes: bool,
    data_dir: Option<PathBuf>,
    threshold: Option<f32>,
    config: &Config,
    store: Arc<dyn VocabularyStore>,
) -> Result<()> {
    let import_command = ImportCommand::new(level, clear, yes, data_dir, threshold)?;
    import_command
        .execute(config, store)
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}

pub fn handle_embed(
    word_id: Option<u64>,
    config: &Config,
    store: Arc<dyn VocabularyStore>,
) -> Result<()> {
    let embed_command = EmbedCommand::new(word_id)?;
    embed_command
        .execute(config, store)
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}

pub fn handle_search(
    query: String,
    limit: Option<usize>,
    config: &Config,
    store: Arc<dyn VocabularyStore>,
) -> Result<()> {
    let search_command = SearchCommand::new(query, limit)?;
    search_command
        .execute(config, store)
        .map_err(|e| anyhow::anyhow!(e))
}

pub fn handle_check(
    writing: String,
    reading: String,
    meaning: String,
    threshold: Option<f32>,
    quiet: bool,
    config: &Config,
    store: Arc<dyn VocabularyStore>,
) -> Result<()> {
    let check_command = CheckCommand::new(writing, reading, meaning, threshold, quiet)?;
    check_command
        .execute(config, store)
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e))
}

pub fn handle_threshold(value: Option<f32>, config: &mut Config) -> Result<()> {
    let threshold_command = ThresholdCommand::new(value)?;
    threshold_command
        .execute(config)
        .map_err(|e| anyhow::anyhow!(e))
}
