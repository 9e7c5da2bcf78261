//! Report generation for deltas and overviews.
//!
//! A single [`CatalogDelta`] is rendered by a [`DeltaReporter`]:
//! - JSON: the delta document itself
//! - Summary: compact counts for the shell
//! - Text: one finding per line
//!
//! A fleet-wide [`Overview`](crate::overview::Overview) is aggregated by
//! [`Report`] into [`ReportData`], which serializes to JSON or renders as
//! indented text.

mod aggregate;
mod json;
mod summary;
mod text;
mod types;

pub use aggregate::{
    issue_key, AttributeRow, Bucket, Changes, CompilationErrors, EdgeRow, LogRow, NodeRank,
    Report, ReportData, ResourceRow, ResourceTypeChanges, Stats, DEFAULT_TOP_N,
};
pub use json::JsonReporter;
pub use summary::{DeltaSummaryReporter, DeltaTableReporter};
pub use text::{render as render_text, render_summary};
pub use types::ReportFormat;

use crate::diff::CatalogDelta;
use crate::error::Result;
use std::io::Write;

/// Renders one host's delta.
pub trait DeltaReporter {
    /// Render the delta as a string.
    fn render(&self, delta: &CatalogDelta) -> Result<String>;

    /// Render and write to `writer`, followed by a newline.
    fn write_to(&self, delta: &CatalogDelta, writer: &mut dyn Write) -> Result<()> {
        let rendered = self.render(delta)?;
        writeln!(writer, "{rendered}")?;
        Ok(())
    }

    /// The format this reporter produces.
    fn format(&self) -> ReportFormat;
}

/// Create a delta reporter for the given format.
#[must_use]
pub fn create_reporter(format: ReportFormat, use_color: bool) -> Box<dyn DeltaReporter> {
    match format {
        ReportFormat::Summary => {
            if use_color {
                Box::new(DeltaSummaryReporter::new())
            } else {
                Box::new(DeltaSummaryReporter::new().no_color())
            }
        }
        ReportFormat::Text => {
            if use_color {
                Box::new(DeltaTableReporter::new())
            } else {
                Box::new(DeltaTableReporter::new().no_color())
            }
        }
        ReportFormat::Json => Box::new(JsonReporter::new()),
    }
}
