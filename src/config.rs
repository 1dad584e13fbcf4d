use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{
    semantic::{
        embeddings::{DEFAULT_ENDPOINT, DEFAULT_MODEL},
        uniqueness::{validate_threshold, ProviderFailurePolicy, DEFAULT_SIMILARITY_THRESHOLD},
    },
    storage::{self, StorageManager},
};

const CONFIG_FILE: &str = "config.yaml";

/// Timeout for import and backfill requests
const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 600;
/// Timeout for search, single-entry embed and check requests
const DEFAULT_INTERACTIVE_TIMEOUT_SECS: u64 = 120;
const DEFAULT_THROTTLE_MS: u64 = 100;
const DEFAULT_SEARCH_LIMIT: usize = 10;

/// Embedding provider connection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,

    #[serde(default = "default_interactive_timeout_secs")]
    pub interactive_timeout_secs: u64,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            batch_timeout_secs: DEFAULT_BATCH_TIMEOUT_SECS,
            interactive_timeout_secs: DEFAULT_INTERACTIVE_TIMEOUT_SECS,
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_batch_timeout_secs() -> u64 {
    DEFAULT_BATCH_TIMEOUT_SECS
}

fn default_interactive_timeout_secs() -> u64 {
    DEFAULT_INTERACTIVE_TIMEOUT_SECS
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniquenessConfig {
    /// Gloss similarity [0.0, 1.0] at which a homograph is rejected
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// What to do when the provider is down during a similarity check
    #[serde(default)]
    pub on_provider_failure: ProviderFailurePolicy,
}

impl Default for UniquenessConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            on_provider_failure: ProviderFailurePolicy::default(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    DEFAULT_SIMILARITY_THRESHOLD
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Pause between embedding requests in milliseconds
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_THROTTLE_MS,
        }
    }
}

fn default_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Directory holding `{level}-words.ts|json`; `<base>/data` when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

fn default_search_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub uniqueness: UniquenessConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        let emb = &self.embeddings;
        if emb.endpoint.trim().is_empty() {
            bail!("embeddings.endpoint cannot be empty");
        }
        if emb.model.trim().is_empty() {
            bail!("embeddings.model cannot be empty");
        }
        if emb.batch_timeout_secs == 0 {
            bail!("embeddings.batch_timeout_secs must be greater than 0");
        }
        if emb.interactive_timeout_secs == 0 {
            bail!("embeddings.interactive_timeout_secs must be greater than 0");
        }

        validate_threshold(self.uniqueness.similarity_threshold)
            .context("uniqueness.similarity_threshold")?;

        if self.search.default_limit == 0 {
            bail!("search.default_limit must be greater than 0");
        }

        Ok(())
    }

    pub fn load_with(base_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base_path = base_path.as_ref();
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to open {}", base_path.display()))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            log::info!("Writing default config to {}", base_path.join(CONFIG_FILE).display());
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    /// Directory the importer reads level files from.
    pub fn data_dir(&self) -> PathBuf {
        self.import
            .data_dir
            .clone()
            .unwrap_or_else(|| self.base_path.join("data"))
    }
}
