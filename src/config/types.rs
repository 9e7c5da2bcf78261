//! Configuration types for catalog-delta operations.

use crate::diff::DeltaOptions;
use crate::reports::{ReportFormat, DEFAULT_TOP_N};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// Command-line values are layered over file values with [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Comparison flags
    pub delta: DeltaOptions,
    /// Report rendering
    pub report: ReportSettings,
    /// Exclusion rules
    pub excludes: ExcludesConfig,
}

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub const fn delta_options(mut self, options: DeltaOptions) -> Self {
        self.config.delta = options;
        self
    }

    pub const fn skip_tags(mut self, skip: bool) -> Self {
        self.config.delta.skip_tags = skip;
        self
    }

    pub const fn verbose_diff(mut self, verbose: bool) -> Self {
        self.config.delta.verbose_diff = verbose;
        self
    }

    pub const fn top_n(mut self, top_n: usize) -> Self {
        self.config.report.top_n = top_n;
        self
    }

    pub const fn format(mut self, format: ReportFormat) -> Self {
        self.config.report.format = format;
        self
    }

    pub const fn no_color(mut self, no_color: bool) -> Self {
        self.config.report.no_color = no_color;
        self
    }

    pub fn excludes_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.excludes.file = file;
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Command-line overrides
// ============================================================================

/// Values given on the command line, layered over a loaded [`AppConfig`]
/// with [`AppConfig::merge`].
///
/// `None` means the flag was not passed, so the file value stays. Boolean
/// flags can only switch a setting on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub skip_tags: bool,
    pub verbose_diff: bool,
    pub diff_string_numeric: bool,
    pub diff_array_value: bool,
    pub no_color: bool,
    pub top_n: Option<usize>,
    pub format: Option<ReportFormat>,
    pub excludes_file: Option<PathBuf>,
}

// ============================================================================
// Section types
// ============================================================================

/// Report rendering settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportSettings {
    /// Number of nodes listed in the `top_ten` section
    pub top_n: usize,
    /// Output format
    pub format: ReportFormat,
    /// Disable ANSI colors
    pub no_color: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            format: ReportFormat::default(),
            no_color: false,
        }
    }
}

/// Where exclusion rules come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExcludesConfig {
    /// JSON rule file, relative to the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}
