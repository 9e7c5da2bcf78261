//! JSON rendering of a single delta.

use super::{DeltaReporter, ReportFormat};
use crate::diff::CatalogDelta;
use crate::error::{PreviewError, ReportErrorKind, Result};

/// JSON delta reporter
#[derive(Debug, Clone, Copy)]
pub struct JsonReporter {
    /// Pretty print output
    pretty: bool,
}

impl JsonReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: true }
    }

    /// Set pretty printing
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaReporter for JsonReporter {
    fn render(&self, delta: &CatalogDelta) -> Result<String> {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(delta)
        } else {
            serde_json::to_string(delta)
        };
        rendered.map_err(|e| {
            PreviewError::report(
                format!("serializing delta for {}", delta.node_name),
                ReportErrorKind::JsonSerialization(e.to_string()),
            )
        })
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }
}
