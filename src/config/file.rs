//! Discovery and loading of `.catalog-delta.yaml` files.

use super::defaults::ConfigPreset;
use super::types::{AppConfig, ConfigOverrides};
use super::validation::Validatable;
use crate::error::{PreviewError, Result};
use std::path::{Path, PathBuf};

// ============================================================================
// Discovery
// ============================================================================

/// File names tried in each searched directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".catalog-delta.yaml",
    ".catalog-delta.yml",
    "catalog-delta.yaml",
    "catalog-delta.yml",
];

/// Locate the configuration file.
///
/// An explicit path wins when it exists; otherwise the working directory,
/// `~/.config/catalog-delta/` and the home directory are searched in turn.
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Some(path) = std::env::current_dir()
        .ok()
        .and_then(|cwd| find_config_in_dir(&cwd))
    {
        return Some(path);
    }

    if let Some(path) =
        dirs::config_dir().and_then(|dir| find_config_in_dir(&dir.join("catalog-delta")))
    {
        return Some(path);
    }

    dirs::home_dir().and_then(|home| find_config_in_dir(&home))
}

fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

// ============================================================================
// Loading
// ============================================================================

/// Failure to read a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Parse one YAML configuration file.
pub fn load_config_file(path: &Path) -> std::result::Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load the discovered file, falling back to defaults when there is none or
/// it cannot be parsed. Also returns the path that was loaded.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Command-line layering
// ============================================================================

impl AppConfig {
    /// Layer command-line values over this (file) configuration.
    ///
    /// Every value that was given replaces the file value, even when it
    /// equals the built-in default.
    pub fn merge(&mut self, overrides: &ConfigOverrides) {
        self.delta.skip_tags |= overrides.skip_tags;
        self.delta.verbose_diff |= overrides.verbose_diff;
        self.delta.diff_string_numeric |= overrides.diff_string_numeric;
        self.delta.diff_array_value |= overrides.diff_array_value;
        self.report.no_color |= overrides.no_color;

        if let Some(top_n) = overrides.top_n {
            self.report.top_n = top_n;
        }
        if let Some(format) = overrides.format {
            self.report.format = format;
        }
        if overrides.excludes_file.is_some() {
            self.excludes.file.clone_from(&overrides.excludes_file);
        }
    }
}

/// Build the effective configuration for one invocation.
///
/// A named preset replaces file discovery. Command-line overrides are
/// applied last and the result is validated.
pub fn resolve_config(
    explicit_path: Option<&Path>,
    preset: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<AppConfig> {
    let mut config = match preset {
        Some(name) => {
            let preset = ConfigPreset::from_name(name).ok_or_else(|| {
                let known: Vec<&str> = ConfigPreset::all().iter().map(ConfigPreset::name).collect();
                PreviewError::config(format!(
                    "unknown preset '{name}' (expected one of {})",
                    known.join(", ")
                ))
            })?;
            AppConfig::from_preset(preset)
        }
        None => {
            let (config, loaded_from) = load_or_default(explicit_path);
            if let Some(path) = loaded_from {
                tracing::debug!(path = %path.display(), "loaded configuration");
            }
            config
        }
    };
    config.merge(overrides);

    let errors = config.validate();
    if errors.is_empty() {
        Ok(config)
    } else {
        let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
        Err(PreviewError::config(messages.join("; ")))
    }
}

// ============================================================================
// Example
// ============================================================================

/// Commented YAML holding the default configuration.
#[must_use]
pub fn generate_example_config() -> String {
    format!(
        r"# catalog-delta configuration
# Place this file at .catalog-delta.yaml in your working directory or ~/.config/catalog-delta/

{}",
        serde_yaml::to_string(&AppConfig::default()).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{ReportFormat, DEFAULT_TOP_N};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_dotfile_preferred_in_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("catalog-delta.yml"), "{}").unwrap();
        std::fs::write(dir.path().join(".catalog-delta.yaml"), "{}").unwrap();
        let found = find_config_in_dir(dir.path()).unwrap();
        assert!(found.ends_with(".catalog-delta.yaml"));
    }

    #[test]
    fn test_empty_dir_has_no_config() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_in_dir(dir.path()).is_none());
    }

    #[test]
    fn test_load_sections() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "delta:\n  skip_tags: true\nreport:\n  top_n: 5\nexcludes:\n  file: rules.json"
        )
        .unwrap();
        let config = load_config_file(file.path()).unwrap();
        assert!(config.delta.skip_tags);
        assert_eq!(config.report.top_n, 5);
        assert_eq!(config.excludes.file, Some(PathBuf::from("rules.json")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config_file(Path::new("/nonexistent/.catalog-delta.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_load_config_rejects_bad_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "report:\n  format: sarif").unwrap();
        assert!(matches!(
            load_config_file(file.path()),
            Err(ConfigFileError::Parse(_))
        ));
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig::builder().top_n(5).skip_tags(true).build();
        let overrides = ConfigOverrides {
            format: Some(ReportFormat::Json),
            verbose_diff: true,
            ..ConfigOverrides::default()
        };
        base.merge(&overrides);
        assert_eq!(base.report.top_n, 5);
        assert_eq!(base.report.format, ReportFormat::Json);
        assert!(base.delta.skip_tags);
        assert!(base.delta.verbose_diff);
    }

    #[test]
    fn test_flag_equal_to_default_overrides_file() {
        let mut file = AppConfig::builder()
            .top_n(20)
            .format(ReportFormat::Json)
            .build();
        let overrides = ConfigOverrides {
            top_n: Some(DEFAULT_TOP_N),
            format: Some(ReportFormat::Text),
            ..ConfigOverrides::default()
        };
        file.merge(&overrides);
        assert_eq!(file.report.top_n, DEFAULT_TOP_N);
        assert_eq!(file.report.format, ReportFormat::Text);
    }

    #[test]
    fn test_resolve_config_layers_flags_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "report:\n  top_n: 20\n  format: json").unwrap();

        let kept = resolve_config(Some(file.path()), None, &ConfigOverrides::default()).unwrap();
        assert_eq!(kept.report.top_n, 20);
        assert_eq!(kept.report.format, ReportFormat::Json);

        let overrides = ConfigOverrides {
            top_n: Some(DEFAULT_TOP_N),
            ..ConfigOverrides::default()
        };
        let resolved = resolve_config(Some(file.path()), None, &overrides).unwrap();
        assert_eq!(resolved.report.top_n, DEFAULT_TOP_N);
        assert_eq!(resolved.report.format, ReportFormat::Json);
    }

    #[test]
    fn test_resolve_config_rejects_unknown_preset() {
        let err = resolve_config(None, Some("paranoid"), &ConfigOverrides::default()).unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)), "{err:?}");
        assert!(err.to_string().contains("paranoid"), "{err}");
    }

    #[test]
    fn test_resolve_config_reports_invalid_values() {
        let overrides = ConfigOverrides {
            top_n: Some(0),
            ..ConfigOverrides::default()
        };
        let err = resolve_config(None, Some("strict"), &overrides).unwrap_err();
        assert!(matches!(err, PreviewError::Config(_)), "{err:?}");
        assert!(err.to_string().contains("report.top_n"), "{err}");
    }

    #[test]
    fn test_example_holds_defaults() {
        let example = generate_example_config();
        assert!(example.contains("catalog-delta"));
        assert!(example.contains("top_n: 10"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let file = NamedTempFile::new().unwrap();
        let found = discover_config_file(Some(file.path()));
        assert_eq!(found.as_deref(), Some(file.path()));
    }
}
