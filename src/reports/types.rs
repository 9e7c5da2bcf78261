//! Report type definitions.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Indented human-readable text
    #[default]
    Text,
    /// Structured JSON output
    Json,
    /// Brief summary output (single deltas only)
    Summary,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Summary => write!(f, "summary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_match_serde() {
        for format in [ReportFormat::Text, ReportFormat::Json, ReportFormat::Summary] {
            let serialized = serde_json::to_value(format).unwrap();
            assert_eq!(serialized, serde_json::json!(format.to_string()));
        }
    }
}
