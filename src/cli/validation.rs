use std::path::Path;

use crate::cli::errors::{CliError, CliResult};
use crate::semantic::uniqueness::validate_threshold;

/// Validates an optional threshold override
pub fn validate_threshold_arg(threshold: Option<f32>) -> CliResult<()> {
    if let Some(threshold) = threshold {
        validate_threshold(threshold)?;
    }
    Ok(())
}

/// Validates a search query
pub fn validate_query(query: &str) -> CliResult<()> {
    if query.trim().is_empty() {
        return Err(CliError::validation("query", "Query cannot be empty"));
    }

    if query.chars().count() > 1000 {
        return Err(CliError::validation(
            "query",
            "Query cannot exceed 1000 characters",
        ));
    }

    Ok(())
}

/// Validates a result limit
pub fn validate_limit(limit: Option<usize>) -> CliResult<()> {
    if limit == Some(0) {
        return Err(CliError::validation("limit", "Limit must be greater than 0"));
    }
    Ok(())
}

/// Validates that the import directory exists
pub fn validate_data_dir(data_dir: &Path) -> CliResult<()> {
    if !data_dir.is_dir() {
        return Err(CliError::validation(
            "data-dir",
            format!("{} is not a directory", data_dir.display()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_threshold_arg() {
        assert!(validate_threshold_arg(None).is_ok());
        assert!(validate_threshold_arg(Some(0.0)).is_ok());
        assert!(validate_threshold_arg(Some(0.985)).is_ok());
        assert!(validate_threshold_arg(Some(1.0)).is_ok());
        assert!(validate_threshold_arg(Some(1.01)).is_err());
        assert!(validate_threshold_arg(Some(-0.5)).is_err());
        assert!(validate_threshold_arg(Some(f32::INFINITY)).is_err());
    }

    #[test]
    fn test_validate_query() {
        assert!(validate_query("water").is_ok());
        assert!(validate_query("水").is_ok());
        assert!(validate_query("").is_err());
        assert!(validate_query("   ").is_err());
        assert!(validate_query(&"a".repeat(1001)).is_err());
    }

    #[test]
    fn test_validate_limit() {
        assert!(validate_limit(None).is_ok());
        assert!(validate_limit(Some(5)).is_ok());
        assert!(validate_limit(Some(0)).is_err());
    }

    #[test]
    fn test_validate_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_data_dir(dir.path()).is_ok());
        assert!(validate_data_dir(&dir.path().join("missing")).is_err());
    }
}
