//! Named configuration presets.

use super::types::AppConfig;
use crate::diff::DeltaOptions;

// ============================================================================
// Presets
// ============================================================================

/// Comparison presets selectable with `--preset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Lenient value comparison
    Default,
    /// No string/numeric or array/value leniency
    Strict,
    /// Keep attribute sets of added and missing resources, longer node list
    Verbose,
}

impl ConfigPreset {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Strict => "strict",
            Self::Verbose => "verbose",
        }
    }

    /// Case-insensitive lookup; `lenient` and `exact` are accepted aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "lenient" => Some(Self::Default),
            "strict" | "exact" => Some(Self::Strict),
            "verbose" => Some(Self::Verbose),
            _ => None,
        }
    }

    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Numeric strings equal numbers and one-element arrays equal their element",
            Self::Strict => "Every value is compared exactly as written",
            Self::Verbose => "Full attribute sets on one-sided resources and 25 nodes in the report",
        }
    }

    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Strict, Self::Verbose]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset construction
// ============================================================================

impl AppConfig {
    /// Configuration equivalent to passing the preset on the command line.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Strict => Self::strict_preset(),
            ConfigPreset::Verbose => Self::verbose_preset(),
        }
    }

    #[must_use]
    pub fn strict_preset() -> Self {
        Self::builder().delta_options(DeltaOptions::strict()).build()
    }

    #[must_use]
    pub fn verbose_preset() -> Self {
        Self::builder()
            .verbose_diff(true)
            .top_n(VERBOSE_TOP_N)
            .build()
    }
}

/// Node list length of the verbose preset.
pub const VERBOSE_TOP_N: usize = 25;

// ============================================================================
// Tests
// ============================================================================
