//! Configuration for catalog-delta.
//!
//! - Type-safe configuration structures
//! - Validation of configuration values
//! - Named presets
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Configuration File
//!
//! Place a `.catalog-delta.yaml` file in the working directory or
//! `~/.config/catalog-delta/`:
//!
//! ```yaml
//! delta:
//!   skip_tags: false
//!   diff_string_numeric: true
//! report:
//!   top_n: 10
//!   format: text
//! excludes:
//!   file: excludes.json
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{ConfigPreset, VERBOSE_TOP_N};
pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    resolve_config, ConfigFileError, CONFIG_FILE_NAMES,
};
pub use types::{AppConfig, AppConfigBuilder, ConfigOverrides, ExcludesConfig, ReportSettings};
pub use validation::{ConfigError, Validatable};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// This schema documents all configuration options that can be set in
/// `.catalog-delta.yaml` config files.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}
