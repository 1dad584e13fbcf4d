use thiserror::Error;

use crate::semantic::{BackfillError, UniquenessError};
use crate::vocabulary::StoreError;

/// Domain-specific errors for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage operation failed: {message}")]
    Storage { message: String },

    #[error("Embedding provider failed: {message}")]
    Provider { message: String },
}

impl CliError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a provider error
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        Self::Configuration {
            message: format!("{err:#}"),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<BackfillError> for CliError {
    fn from(err: BackfillError) -> Self {
        match err {
            BackfillError::NotFound(id) => {
                Self::validation("word-id", format!("word {id} not found"))
            }
            BackfillError::Store(err) => err.into(),
        }
    }
}

impl From<UniquenessError> for CliError {
    fn from(err: UniquenessError) -> Self {
        match err {
            UniquenessError::InvalidThreshold(_) => Self::validation("threshold", err.to_string()),
            UniquenessError::Provider { .. } => Self::provider(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput {
            message: format!("JSON error: {}", err),
        }
    }
}
