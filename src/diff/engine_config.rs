//! Configuration types for the delta engine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Options controlling how two catalogs are compared.
///
/// All flags default to `false`, which gives the lenient comparison: tags are
/// compared, numeric strings equal the numbers they denote, and a one-element
/// array equals its element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeltaOptions {
    /// Leave the synthesized `tags` attribute out of the comparison
    pub skip_tags: bool,
    /// Keep full attribute sets on added and missing resources
    pub verbose_diff: bool,
    /// Treat a numeric string and a number as different values
    pub diff_string_numeric: bool,
    /// Treat a one-element array and its element as different values
    pub diff_array_value: bool,
}

impl DeltaOptions {
    /// Strict comparison: no string/numeric or array/value leniency.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            skip_tags: false,
            verbose_diff: false,
            diff_string_numeric: true,
            diff_array_value: true,
        }
    }
}

/// Identity of one comparison: which host, when, and from which files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaContext {
    pub node_name: String,
    pub timestamp: DateTime<Utc>,
    pub baseline_catalog: Option<String>,
    pub preview_catalog: Option<String>,
}

impl DeltaContext {
    /// Context for `node_name`, stamped with the current time.
    pub fn new(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            timestamp: Utc::now(),
            baseline_catalog: None,
            preview_catalog: None,
        }
    }

    /// Use a fixed timestamp.
    #[must_use]
    pub const fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Record the source paths of both catalogs.
    #[must_use]
    pub fn with_catalog_paths(
        mut self,
        baseline: impl Into<String>,
        preview: impl Into<String>,
    ) -> Self {
        self.baseline_catalog = Some(baseline.into());
        self.preview_catalog = Some(preview.into());
        self
    }
}
