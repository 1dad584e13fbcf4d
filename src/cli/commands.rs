use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use inquire::error::InquireResult;
use serde_json::json;

use crate::{
    app::{AppFactory, Workload},
    cli::{
        errors::{CliError, CliResult},
        types::LevelArg,
        validation::*,
    },
    config::Config,
    import::{load_level, Candidate, ImportBatchStats, LevelSelector},
    semantic::BackfillReport,
    storage::BackendLocal,
    vocabulary::VocabularyStore,
};

/// Command for importing level word lists
#[derive(Debug, Clone)]
pub struct ImportCommand {
    pub levels: LevelSelector,
    pub clear: bool,
    pub yes: bool,
    pub data_dir: Option<PathBuf>,
    pub threshold: Option<f32>,
}

impl ImportCommand {
    pub fn new(
        level: LevelArg,
        clear: bool,
        yes: bool,
        data_dir: Option<PathBuf>,
        threshold: Option<f32>,
    ) -> CliResult<Self> {
        validate_threshold_arg(threshold)?;

        Ok(Self {
            levels: level.into(),
            clear,
            yes,
            data_dir,
            threshold,
        })
    }

    /// Returns `None` when the user declined to clear the store.
    pub fn execute(
        self,
        config: &Config,
        store: Arc<dyn VocabularyStore>,
    ) -> CliResult<Option<ImportBatchStats>> {
        let data_dir = self.data_dir.unwrap_or_else(|| config.data_dir());
        validate_data_dir(&data_dir)?;

        if self.clear {
            if !self.yes {
                match inquire::prompt_confirmation(
                    "This will delete ALL existing words. Are you sure?",
                ) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => {
                        println!("Import cancelled.");
                        return Ok(None);
                    }
                    InquireResult::Err(err) => {
                        return Err(CliError::invalid_input(err.to_string()));
                    }
                }
            }

            let removed = store.clear()?;
            println!("{removed} existing words cleared.");
        }

        let mut pipeline = AppFactory::create_pipeline(config, store, self.threshold)?;
        println!("Similarity threshold: {}", pipeline.checker().threshold());
        println!("Loaded {} existing words.", pipeline.known_entries().len());

        let sources = BackendLocal::new(&data_dir)
            .map_err(|err| CliError::storage(format!("{}: {err}", data_dir.display())))?;

        let mut records = vec![];
        for level in self.levels.levels() {
            println!("Processing JLPT {level}...");
            match load_level(&sources, level) {
                Ok(Some(mut level_records)) => records.append(&mut level_records),
                Ok(None) => {
                    log::warn!("No word file found for {level} in {}", data_dir.display());
                    println!("No word file found for {level}");
                }
                Err(err) => log::error!("Skipping {level}: {err}"),
            }
        }

        let stats = pipeline.import_batch(&records);
        println!("{stats}");

        Ok(Some(stats))
    }
}

/// Command for generating missing embeddings
#[derive(Debug, Clone)]
pub struct EmbedCommand {
    pub word_id: Option<u64>,
}

impl EmbedCommand {
    pub fn new(word_id: Option<u64>) -> CliResult<Self> {
        Ok(Self { word_id })
    }

    pub fn execute(
        self,
        config: &Config,
        store: Arc<dyn VocabularyStore>,
    ) -> CliResult<BackfillReport> {
        if let Some(id) = self.word_id {
            let started = Instant::now();
            let backfill = AppFactory::create_backfill(config, store, Workload::Interactive)?;
            if !backfill.embed_one(id)? {
                return Err(CliError::provider(format!(
                    "Failed to generate embedding for word {id}"
                )));
            }
            println!("Generated embedding for word {id}");
            return Ok(BackfillReport {
                total: 1,
                processed: 1,
                embedded: 1,
                failed: 0,
                elapsed: started.elapsed(),
            });
        }

        let backfill = AppFactory::create_backfill(config, store, Workload::Batch)?;
        let report = backfill.run()?;

        if report.total == 0 {
            println!("All words already have embeddings.");
            return Ok(report);
        }

        println!(
            "Processed: {}, embedded: {}, failed: {} ({:.1}s)",
            report.processed,
            report.embedded,
            report.failed,
            report.elapsed.as_secs_f64()
        );
        if report.failed > 0 {
            println!(
                "Warning: {} embeddings failed. Is the embedding service running at {}?",
                report.failed, config.embeddings.endpoint
            );
        }

        Ok(report)
    }
}

/// Command for semantic search
#[derive(Debug, Clone)]
pub struct SearchCommand {
    pub query: String,
    pub limit: Option<usize>,
}

impl SearchCommand {
    pub fn new(query: String, limit: Option<usize>) -> CliResult<Self> {
        validate_query(&query)?;
        validate_limit(limit)?;

        Ok(Self { query, limit })
    }

    pub fn execute(self, config: &Config, store: Arc<dyn VocabularyStore>) -> CliResult<()> {
        let limit = self.limit.unwrap_or(config.search.default_limit);
        let engine = AppFactory::create_search(config, store)?;

        let hits = engine.search(&self.query, limit);
        println!("{}", serde_json::to_string_pretty(&hits)?);
        Ok(())
    }
}

/// Command for checking a single word without saving it
#[derive(Debug, Clone)]
pub struct CheckCommand {
    pub candidate: Candidate,
    pub threshold: Option<f32>,
    pub quiet: bool,
}

impl CheckCommand {
    pub fn new(
        writing: String,
        reading: String,
        meaning: String,
        threshold: Option<f32>,
        quiet: bool,
    ) -> CliResult<Self> {
        validate_threshold_arg(threshold)?;

        let candidate = Candidate::from_value(&json!({
            "writing": writing,
            "reading": reading,
            "meaning": meaning,
        }))
        .map_err(|err| CliError::validation("word", err.to_string()))?;

        Ok(Self {
            candidate,
            threshold,
            quiet,
        })
    }

    /// Returns whether the word would be admitted.
    pub fn execute(self, config: &Config, store: Arc<dyn VocabularyStore>) -> CliResult<bool> {
        let provider = AppFactory::create_provider(config, Workload::Interactive)?;
        let checker = AppFactory::create_checker(config, provider, self.threshold)?;

        let existing = store.all()?;
        if self.quiet {
            let unique = checker.is_unique(&self.candidate, &existing);
            println!("{unique}");
            return Ok(unique);
        }

        let verdict = checker.evaluate(&self.candidate, &existing)?;
        println!("{}", serde_json::to_string_pretty(&verdict)?);
        Ok(verdict.is_unique())
    }
}

/// Command for reading or persisting the similarity threshold
#[derive(Debug, Clone)]
pub struct ThresholdCommand {
    pub value: Option<f32>,
}

impl ThresholdCommand {
    pub fn new(value: Option<f32>) -> CliResult<Self> {
        validate_threshold_arg(value)?;
        Ok(Self { value })
    }

    pub fn execute(self, config: &mut Config) -> CliResult<()> {
        match self.value {
            None => println!("{}", config.uniqueness.similarity_threshold),
            Some(value) => {
                config.uniqueness.similarity_threshold = value;
                config.save()?;
                println!("Similarity threshold set to {value}");
            }
        }
        Ok(())
    }
}
