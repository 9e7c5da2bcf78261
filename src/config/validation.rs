//! Checks run on a loaded configuration before any comparison starts.

use super::types::{AppConfig, ExcludesConfig, ReportSettings};
use crate::diff::DeltaOptions;

// ============================================================================
// Errors
// ============================================================================

/// One rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Dotted path of the offending field, e.g. `report.top_n`
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Trait
// ============================================================================

/// Implemented by every configuration section.
pub trait Validatable {
    /// All problems found; empty when the section is usable.
    fn validate(&self) -> Vec<ConfigError>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Sections
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.delta.validate());
        errors.extend(self.report.validate());
        errors.extend(self.excludes.validate());
        errors
    }
}

impl Validatable for DeltaOptions {
    fn validate(&self) -> Vec<ConfigError> {
        Vec::new()
    }
}

impl Validatable for ReportSettings {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.top_n == 0 {
            errors.push(ConfigError {
                field: "report.top_n".to_string(),
                message: "must list at least one node".to_string(),
            });
        }
        errors
    }
}

impl Validatable for ExcludesConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(path) = &self.file {
            if !path.is_file() {
                errors.push(ConfigError {
                    field: "excludes.file".to_string(),
                    message: format!("{} does not exist or is not a file", path.display()),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(AppConfig::default().is_valid());
    }

    #[test]
    fn test_zero_top_n() {
        let config = AppConfig::builder().top_n(0).build();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "report.top_n");
    }

    #[test]
    fn test_missing_excludes_file() {
        let config = AppConfig::builder()
            .excludes_file(Some(PathBuf::from("/nonexistent/excludes.json")))
            .build();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("excludes.file: "));
    }

    #[test]
    fn test_existing_excludes_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = AppConfig::builder()
            .excludes_file(Some(file.path().to_path_buf()))
            .build();
        assert!(config.is_valid());
    }
}
