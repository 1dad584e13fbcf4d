use crate::{
    config::Config,
    import::BulkImportPipeline,
    semantic::{
        EmbeddingBackfill, EmbeddingProvider, OllamaProvider, SemanticSearchEngine,
        UniquenessChecker,
    },
    vocabulary::{BackendCsv, VocabularyStore},
};
use anyhow::{Context, Result};
use homedir::my_home;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Which request timeout a provider is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    /// import and full backfill
    Batch,
    /// search, single-entry embed, check
    Interactive,
}

/// Application factory for creating and configuring application components
pub struct AppFactory;

impl AppFactory {
    /// Get application paths, creating the base directory if needed
    pub fn get_paths() -> Result<AppPaths> {
        let base_path = Self::get_base_path()?;
        let vocabulary_path = base_path.join("vocabulary.csv");

        std::fs::create_dir_all(&base_path)
            .context("Failed to create application base directory")?;

        Ok(AppPaths {
            base_path,
            vocabulary_path,
        })
    }

    fn get_base_path() -> Result<PathBuf> {
        if let Ok(base_path) = std::env::var("KOTOBA_BASE_PATH") {
            return Ok(PathBuf::from(base_path));
        }

        let home = my_home()
            .ok()
            .flatten()
            .context("Could not determine home directory")?;
        Ok(home.join(".local/share/kotoba"))
    }

    pub fn create_config(paths: &AppPaths) -> Result<Config> {
        Config::load_with(&paths.base_path).context("Failed to load config.yaml")
    }

    pub fn create_store(paths: &AppPaths) -> Result<Arc<dyn VocabularyStore>> {
        let store = BackendCsv::load(&paths.vocabulary_path).with_context(|| {
            format!(
                "Failed to open vocabulary store {}",
                paths.vocabulary_path.display()
            )
        })?;
        log::debug!("Using vocabulary store {}", store.path().display());
        Ok(Arc::new(store))
    }

    pub fn create_provider(
        config: &Config,
        workload: Workload,
    ) -> Result<Arc<dyn EmbeddingProvider>> {
        let emb = &config.embeddings;
        let timeout_secs = match workload {
            Workload::Batch => emb.batch_timeout_secs,
            Workload::Interactive => emb.interactive_timeout_secs,
        };

        log::debug!(
            "Using embedding model '{}' at {} (timeout {timeout_secs}s)",
            emb.model,
            emb.endpoint
        );

        let provider = OllamaProvider::new(
            &emb.endpoint,
            &emb.model,
            Duration::from_secs(timeout_secs),
        )
        .context("Failed to build embedding client")?;
        Ok(Arc::new(provider))
    }

    /// Checker configured from `config`, with an optional per-run threshold
    pub fn create_checker(
        config: &Config,
        provider: Arc<dyn EmbeddingProvider>,
        threshold: Option<f32>,
    ) -> Result<UniquenessChecker> {
        let threshold = threshold.unwrap_or(config.uniqueness.similarity_threshold);
        let checker = UniquenessChecker::new(provider)
            .with_threshold(threshold)?
            .with_failure_policy(config.uniqueness.on_provider_failure);
        Ok(checker)
    }

    pub fn create_pipeline(
        config: &Config,
        store: Arc<dyn VocabularyStore>,
        threshold: Option<f32>,
    ) -> Result<BulkImportPipeline> {
        let provider = Self::create_provider(config, Workload::Batch)?;
        let checker = Self::create_checker(config, provider, threshold)?;
        Ok(BulkImportPipeline::new(checker, store)?)
    }

    pub fn create_backfill(
        config: &Config,
        store: Arc<dyn VocabularyStore>,
        workload: Workload,
    ) -> Result<EmbeddingBackfill> {
        let provider = Self::create_provider(config, workload)?;
        Ok(EmbeddingBackfill::new(provider, store)
            .with_throttle(Duration::from_millis(config.backfill.throttle_ms)))
    }

    pub fn create_search(
        config: &Config,
        store: Arc<dyn VocabularyStore>,
    ) -> Result<SemanticSearchEngine> {
        let provider = Self::create_provider(config, Workload::Interactive)?;
        Ok(SemanticSearchEngine::new(provider, store))
    }
}

/// Application paths structure
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_path: PathBuf,
    pub vocabulary_path: PathBuf,
}
